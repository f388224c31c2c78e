//! Catalog lookup boundary and its in-memory implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use thiserror::Error;

use brewery_catalog::{Beer, BeerId, Category, CategoryId};
use brewery_core::DomainError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("beer {0} not found")]
    NotFound(BeerId),

    #[error("category {0} not found")]
    UnknownCategory(CategoryId),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the catalog, as needed by the stock engine.
pub trait CatalogLookup: Send + Sync {
    fn resolve(&self, beer_id: BeerId) -> Result<Beer, CatalogError>;

    /// Beers with an expiration date on or before `date`, ordered by that date.
    fn expiring_on_or_before(&self, date: NaiveDate) -> Result<Vec<Beer>, CatalogError>;
}

impl<C> CatalogLookup for Arc<C>
where
    C: CatalogLookup + ?Sized,
{
    fn resolve(&self, beer_id: BeerId) -> Result<Beer, CatalogError> {
        (**self).resolve(beer_id)
    }

    fn expiring_on_or_before(&self, date: NaiveDate) -> Result<Vec<Beer>, CatalogError> {
        (**self).expiring_on_or_before(date)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    categories: BTreeMap<CategoryId, Category>,
    beers: BTreeMap<BeerId, Beer>,
}

/// In-memory catalog of categories and beers.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

fn poisoned() -> CatalogError {
    CatalogError::Unavailable("lock poisoned".to_string())
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_category(&self, category: Category) -> Result<(), CatalogError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let id = category.id_typed();
        if state.categories.contains_key(&id) {
            return Err(CatalogError::AlreadyExists(format!("category {id}")));
        }
        state.categories.insert(id, category);
        Ok(())
    }

    pub fn category(&self, category_id: CategoryId) -> Result<Option<Category>, CatalogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.categories.get(&category_id).cloned())
    }

    pub fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.categories.values().cloned().collect())
    }

    /// Register a beer. Its category must already be in the catalog.
    pub fn insert_beer(&self, beer: Beer) -> Result<(), CatalogError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if !state.categories.contains_key(&beer.category_id()) {
            return Err(CatalogError::UnknownCategory(beer.category_id()));
        }
        let id = beer.id_typed();
        if state.beers.contains_key(&id) {
            return Err(CatalogError::AlreadyExists(format!("beer {id}")));
        }
        state.beers.insert(id, beer);
        Ok(())
    }

    pub fn update_price(&self, beer_id: BeerId, price: u64) -> Result<Beer, CatalogError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let slot = state
            .beers
            .get_mut(&beer_id)
            .ok_or(CatalogError::NotFound(beer_id))?;
        *slot = slot.with_price(price)?;
        Ok(slot.clone())
    }

    pub fn remove_beer(&self, beer_id: BeerId) -> Result<Beer, CatalogError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state
            .beers
            .remove(&beer_id)
            .ok_or(CatalogError::NotFound(beer_id))
    }

    pub fn list(&self) -> Result<Vec<Beer>, CatalogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.beers.values().cloned().collect())
    }
}

impl CatalogLookup for InMemoryCatalog {
    fn resolve(&self, beer_id: BeerId) -> Result<Beer, CatalogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        state
            .beers
            .get(&beer_id)
            .cloned()
            .ok_or(CatalogError::NotFound(beer_id))
    }

    fn expiring_on_or_before(&self, date: NaiveDate) -> Result<Vec<Beer>, CatalogError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut expiring: Vec<Beer> = state
            .beers
            .values()
            .filter(|beer| beer.expiration_date().is_some_and(|d| d <= date))
            .cloned()
            .collect();
        expiring.sort_by_key(|beer| (beer.expiration_date(), beer.id_typed()));
        Ok(expiring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewery_core::EntityId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn catalog_with_category() -> (InMemoryCatalog, CategoryId) {
        let catalog = InMemoryCatalog::new();
        let category_id = CategoryId::new(EntityId::new());
        catalog
            .insert_category(Category::new(category_id, "Lager").unwrap())
            .unwrap();
        (catalog, category_id)
    }

    fn beer(category_id: CategoryId, name: &str, expires: Option<NaiveDate>) -> Beer {
        Beer::new(BeerId::new(EntityId::new()), name, category_id, 500, expires).unwrap()
    }

    #[test]
    fn beer_requires_known_category() {
        let catalog = InMemoryCatalog::new();
        let category_id = CategoryId::new(EntityId::new());
        let err = catalog.insert_beer(beer(category_id, "Pils", None)).unwrap_err();
        assert_eq!(err, CatalogError::UnknownCategory(category_id));
    }

    #[test]
    fn resolve_and_remove() {
        let (catalog, category_id) = catalog_with_category();
        let pils = beer(category_id, "Pils", None);
        let id = pils.id_typed();
        catalog.insert_beer(pils.clone()).unwrap();

        assert_eq!(catalog.resolve(id).unwrap(), pils);
        assert!(matches!(catalog.insert_beer(pils), Err(CatalogError::AlreadyExists(_))));

        catalog.remove_beer(id).unwrap();
        assert_eq!(catalog.resolve(id).unwrap_err(), CatalogError::NotFound(id));
    }

    #[test]
    fn update_price_validates_and_persists() {
        let (catalog, category_id) = catalog_with_category();
        let pils = beer(category_id, "Pils", None);
        let id = pils.id_typed();
        catalog.insert_beer(pils).unwrap();

        assert_eq!(catalog.update_price(id, 900).unwrap().price(), 900);
        assert_eq!(catalog.resolve(id).unwrap().price(), 900);

        match catalog.update_price(id, 0) {
            Err(CatalogError::Domain(DomainError::Validation(_))) => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn expiring_on_or_before_filters_and_orders_by_date() {
        let (catalog, category_id) = catalog_with_category();
        let late = beer(category_id, "Late", Some(date(2026, 10, 20)));
        let early = beer(category_id, "Early", Some(date(2026, 10, 1)));
        let never = beer(category_id, "Never", None);
        let beyond = beer(category_id, "Beyond", Some(date(2026, 11, 1)));
        for b in [&late, &early, &never, &beyond] {
            catalog.insert_beer(b.clone()).unwrap();
        }

        let expiring = catalog.expiring_on_or_before(date(2026, 10, 20)).unwrap();
        let names: Vec<&str> = expiring.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["Early", "Late"]);
    }
}
