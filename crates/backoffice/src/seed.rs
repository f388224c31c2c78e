//! JSON seed files for the in-memory back-office.
//!
//! ```json
//! {
//!   "categories": ["Lager", "Stout"],
//!   "beers": [
//!     { "name": "Helles", "category": "Lager", "price": 450,
//!       "expiration_date": "2026-11-01", "quantity": 120 }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use brewery_catalog::{Beer, BeerId, Category, CategoryId};
use brewery_core::EntityId;
use brewery_infra::BreweryServices;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Seed {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub beers: Vec<SeedBeer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedBeer {
    pub name: String,
    /// Category name; must be listed under `categories`.
    pub category: String,
    pub price: u64,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub beers: usize,
    pub units: i64,
}

impl Seed {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("malformed seed file")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Register every category and beer, opening stock at the seeded quantity.
    pub fn apply(&self, services: &BreweryServices) -> anyhow::Result<SeedSummary> {
        let mut category_ids: HashMap<&str, CategoryId> = HashMap::new();
        for name in &self.categories {
            if category_ids.contains_key(name.as_str()) {
                bail!("category '{name}' is listed twice");
            }
            let id = CategoryId::new(EntityId::new());
            let category = Category::new(id, name.as_str())
                .with_context(|| format!("invalid category '{name}'"))?;
            services.catalog.insert_category(category)?;
            category_ids.insert(name.as_str(), id);
        }

        let mut units = 0i64;
        for beer in &self.beers {
            let Some(&category_id) = category_ids.get(beer.category.as_str()) else {
                bail!(
                    "beer '{}' references unknown category '{}'",
                    beer.name,
                    beer.category
                );
            };
            let entry = Beer::new(
                BeerId::new(EntityId::new()),
                beer.name.as_str(),
                category_id,
                beer.price,
                beer.expiration_date,
            )
            .with_context(|| format!("invalid beer '{}'", beer.name))?;

            services
                .register_beer(entry, beer.quantity)
                .with_context(|| format!("failed to open stock for '{}'", beer.name))?;
            units = units.saturating_add(beer.quantity);
        }

        let summary = SeedSummary {
            categories: category_ids.len(),
            beers: self.beers.len(),
            units,
        };
        info!(
            categories = summary.categories,
            beers = summary.beers,
            units = summary.units,
            "seed applied"
        );
        Ok(summary)
    }
}
