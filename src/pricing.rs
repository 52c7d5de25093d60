//! Pluggable per-showtime seat pricing.

use crate::types::{Money, SeatCode, ShowtimeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Prices a single seat for a showtime.
///
/// The hold service sums the per-seat prices to compute a hold's amount;
/// the amount is snapshotted into the hold and never recomputed.
pub trait PricingRule: Send + Sync {
    /// Price of `seat` for `showtime` in minor units
    fn price(&self, showtime: &ShowtimeId, seat: &SeatCode) -> Money;
}

/// Flat per-seat price regardless of showtime or seat.
#[derive(Clone, Copy, Debug)]
pub struct FlatRate {
    per_seat: Money,
}

impl FlatRate {
    /// Create a flat-rate rule
    #[must_use]
    pub const fn new(per_seat: Money) -> Self {
        Self { per_seat }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(per_seat: Money) -> Arc<dyn PricingRule> {
        Arc::new(Self::new(per_seat))
    }
}

impl PricingRule for FlatRate {
    fn price(&self, _showtime: &ShowtimeId, _seat: &SeatCode) -> Money {
        self.per_seat
    }
}

/// Per-showtime price overrides with a flat fallback.
#[derive(Clone, Debug)]
pub struct PerShowtime {
    overrides: HashMap<ShowtimeId, Money>,
    fallback: Money,
}

impl PerShowtime {
    /// Create a rule with the given overrides and fallback price
    #[must_use]
    pub fn new(overrides: HashMap<ShowtimeId, Money>, fallback: Money) -> Self {
        Self { overrides, fallback }
    }
}

impl PricingRule for PerShowtime {
    fn price(&self, showtime: &ShowtimeId, _seat: &SeatCode) -> Money {
        self.overrides.get(showtime).copied().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn per_showtime_falls_back() {
        let premium = ShowtimeId::new();
        let regular = ShowtimeId::new();
        let rule = PerShowtime::new(
            HashMap::from([(premium, Money::from_minor(120_000))]),
            Money::from_minor(60_000),
        );
        let seat = SeatCode::parse("A1").unwrap();
        assert_eq!(rule.price(&premium, &seat), Money::from_minor(120_000));
        assert_eq!(rule.price(&regular, &seat), Money::from_minor(60_000));
    }
}
