//! Expiry rules for catalog items.

use chrono::{Days, NaiveDate};

use crate::beer::Beer;

/// Decides whether a beer is expired (or about to be) on a reference date.
///
/// A beer is expired when its expiration date is **on or before** the
/// reference date: the expiration day itself already counts as expired.
/// Beers without an expiration date never expire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    warning_window_days: u32,
}

impl ExpiryPolicy {
    pub const DEFAULT_WARNING_WINDOW_DAYS: u32 = 7;

    pub fn new(warning_window_days: u32) -> Self {
        Self {
            warning_window_days,
        }
    }

    pub fn warning_window_days(&self) -> u32 {
        self.warning_window_days
    }

    pub fn is_expired(&self, beer: &Beer, reference_date: NaiveDate) -> bool {
        beer.expiration_date()
            .is_some_and(|expires| expires <= reference_date)
    }

    /// Not yet expired, but expiring within the warning window.
    pub fn is_near_expiry(&self, beer: &Beer, reference_date: NaiveDate) -> bool {
        if self.is_expired(beer, reference_date) {
            return false;
        }
        beer.expiration_date()
            .is_some_and(|expires| expires <= self.warning_horizon(reference_date))
    }

    /// Last date (inclusive) covered by the warning window.
    pub fn warning_horizon(&self, reference_date: NaiveDate) -> NaiveDate {
        reference_date
            .checked_add_days(Days::new(u64::from(self.warning_window_days)))
            .unwrap_or(NaiveDate::MAX)
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WARNING_WINDOW_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beer::BeerId;
    use crate::category::CategoryId;
    use brewery_core::EntityId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn beer_expiring(expiration_date: Option<NaiveDate>) -> Beer {
        Beer::new(
            BeerId::new(EntityId::new()),
            "Weizen",
            CategoryId::new(EntityId::new()),
            800,
            expiration_date,
        )
        .unwrap()
    }

    #[test]
    fn expiration_day_itself_counts_as_expired() {
        let policy = ExpiryPolicy::default();
        let beer = beer_expiring(Some(date(2026, 10, 16)));

        assert!(policy.is_expired(&beer, date(2026, 10, 16)));
        assert!(policy.is_expired(&beer, date(2026, 10, 17)));
        assert!(!policy.is_expired(&beer, date(2026, 10, 15)));
    }

    #[test]
    fn beers_without_expiration_never_expire() {
        let policy = ExpiryPolicy::default();
        let beer = beer_expiring(None);

        assert!(!policy.is_expired(&beer, NaiveDate::MAX));
        assert!(!policy.is_near_expiry(&beer, date(2026, 1, 1)));
    }

    #[test]
    fn near_expiry_covers_warning_window_only() {
        let policy = ExpiryPolicy::new(7);
        let today = date(2026, 10, 16);

        assert!(policy.is_near_expiry(&beer_expiring(Some(date(2026, 10, 17))), today));
        assert!(policy.is_near_expiry(&beer_expiring(Some(date(2026, 10, 23))), today));
        assert!(!policy.is_near_expiry(&beer_expiring(Some(date(2026, 10, 24))), today));
        // Already expired is not "near" expiry.
        assert!(!policy.is_near_expiry(&beer_expiring(Some(today)), today));
    }

    #[test]
    fn warning_horizon_saturates_at_max_date() {
        let policy = ExpiryPolicy::new(30);
        assert_eq!(policy.warning_horizon(NaiveDate::MAX), NaiveDate::MAX);
    }
}
