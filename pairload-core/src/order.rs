use crate::WorkloadError;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::ops::RangeInclusive;

/// Identity assigned by the database to an order.
pub type OrderId = i64;

/// Business values of one order and its fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub account_id: i64,
    pub symbol: String,
    pub shares: u32,
    pub cost: Decimal,
}

impl OrderRequest {
    pub fn new(
        account_id: i64,
        symbol: impl Into<String>,
        shares: u32,
        cost: Decimal,
    ) -> Result<Self, WorkloadError> {
        let request = Self {
            account_id,
            symbol: symbol.into(),
            shares,
            cost,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), WorkloadError> {
        if self.shares == 0 {
            return Err(WorkloadError::InvalidRequest(
                "shares must be a positive integer".into(),
            ));
        }
        if self.cost <= Decimal::ZERO {
            return Err(WorkloadError::InvalidRequest(format!(
                "cost must be positive, found {}",
                self.cost
            )));
        }
        if self.cost.normalize().scale() > 2 {
            return Err(WorkloadError::InvalidRequest(format!(
                "cost must have at most two fractional digits, found {}",
                self.cost
            )));
        }
        if self.symbol.is_empty() {
            return Err(WorkloadError::InvalidRequest("symbol is empty".into()));
        }
        Ok(())
    }

    /// Price per share of the fill.
    pub fn price(&self) -> Decimal {
        price_per_share(self.cost, self.shares)
    }
}

/// `cost / shares` rounded to cents, midpoints to the even neighbour.
pub fn price_per_share(cost: Decimal, shares: u32) -> Decimal {
    (cost / Decimal::from(shares)).round_dp(2)
}

/// Endless stream of randomized order requests.
///
/// Bound it with [`Iterator::take`] to get a fixed number of operations.
#[derive(Debug)]
pub struct RandomOrders {
    pub account_id: i64,
    pub symbol: String,
    pub shares: RangeInclusive<u32>,
    /// Cost range in cents.
    pub cost_cents: RangeInclusive<i64>,
    rng: StdRng,
}

impl RandomOrders {
    pub fn new(account_id: i64, symbol: impl Into<String>) -> Self {
        Self {
            account_id,
            symbol: symbol.into(),
            shares: 50..=200,
            cost_cents: 100_00..=500_00,
            rng: StdRng::from_entropy(),
        }
    }
    /// Shares must be at least one, `start <= end`.
    pub fn with_shares(mut self, shares: RangeInclusive<u32>) -> Result<Self, WorkloadError> {
        if *shares.start() == 0 || shares.start() > shares.end() {
            return Err(WorkloadError::InvalidRequest(format!(
                "shares must be a non empty range of positive integers, found {}..={}",
                shares.start(),
                shares.end()
            )));
        }
        self.shares = shares;
        Ok(self)
    }
    /// Costs are rounded down to cents, the lowest must be at least one cent.
    pub fn with_cost(mut self, low: Decimal, high: Decimal) -> Result<Self, WorkloadError> {
        let cents = |v: Decimal| (v * Decimal::ONE_HUNDRED).trunc().to_i64();
        match (cents(low), cents(high)) {
            (Some(l), Some(h)) if l > 0 && l <= h => {
                self.cost_cents = l..=h;
                Ok(self)
            }
            _ => Err(WorkloadError::InvalidRequest(format!(
                "cost must be a non empty range of positive amounts, found {}..={}",
                low, high
            ))),
        }
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Default for RandomOrders {
    fn default() -> Self {
        Self::new(1, "ORCL")
    }
}

impl Iterator for RandomOrders {
    type Item = OrderRequest;

    fn next(&mut self) -> Option<Self::Item> {
        let shares = self.rng.gen_range(self.shares.clone());
        let cents = self.rng.gen_range(self.cost_cents.clone());
        Some(OrderRequest {
            account_id: self.account_id,
            symbol: self.symbol.clone(),
            shares,
            cost: Decimal::new(cents, 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_rounding() {
        assert_eq!(price_per_share(dec!(100.00), 3), dec!(33.33));
        assert_eq!(price_per_share(dec!(200.00), 3), dec!(66.67));
        assert_eq!(price_per_share(dec!(238.98), 100), dec!(2.39));
        assert_eq!(price_per_share(dec!(500.00), 200), dec!(2.50));
        assert_eq!(price_per_share(dec!(7.00), 1), dec!(7.00));
    }

    #[test]
    fn price_midpoints_to_even() {
        assert_eq!(price_per_share(dec!(0.25), 2), dec!(0.12));
        assert_eq!(price_per_share(dec!(0.35), 2), dec!(0.18));
        assert_eq!(price_per_share(dec!(1.05), 2), dec!(0.52));
        assert_eq!(price_per_share(dec!(1.15), 2), dec!(0.58));
    }

    #[test]
    fn validation() {
        assert!(OrderRequest::new(1, "ORCL", 100, dec!(238.98)).is_ok());
        assert!(matches!(
            OrderRequest::new(1, "ORCL", 0, dec!(238.98)),
            Err(WorkloadError::InvalidRequest(..))
        ));
        assert!(OrderRequest::new(1, "ORCL", 10, dec!(0)).is_err());
        assert!(OrderRequest::new(1, "ORCL", 10, dec!(-5.00)).is_err());
        assert!(OrderRequest::new(1, "ORCL", 10, dec!(1.005)).is_err());
        assert!(OrderRequest::new(1, "ORCL", 10, dec!(1.500)).is_ok());
        assert!(OrderRequest::new(1, "", 10, dec!(1.50)).is_err());
    }

    #[test]
    fn random_orders_within_bounds() {
        let orders = RandomOrders::default().with_seed(7).take(500).collect::<Vec<_>>();
        assert_eq!(orders.len(), 500);
        for order in &orders {
            assert_eq!(order.account_id, 1);
            assert_eq!(order.symbol, "ORCL");
            assert!((50..=200).contains(&order.shares));
            assert!(order.cost >= dec!(100.00) && order.cost <= dec!(500.00));
            assert_eq!(order.cost.scale(), 2);
            order.validate().expect("Random order should be valid");
        }
    }

    #[test]
    fn random_orders_seeded() {
        let first = RandomOrders::default().with_seed(42).take(20).collect::<Vec<_>>();
        let second = RandomOrders::default().with_seed(42).take(20).collect::<Vec<_>>();
        assert_eq!(first, second);
    }

    #[test]
    fn random_orders_custom_ranges() {
        let mut orders = RandomOrders::new(9, "CRDB")
            .with_shares(3..=3)
            .and_then(|o| o.with_cost(dec!(100.00), dec!(100.00)))
            .expect("Valid ranges");
        let order = orders.next().unwrap();
        assert_eq!(order.shares, 3);
        assert_eq!(order.cost, dec!(100.00));
        assert_eq!(order.price(), dec!(33.33));
    }

    #[test]
    fn random_orders_reject_ranges() {
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = 5..=3;
        assert!(matches!(
            RandomOrders::default().with_shares(inverted),
            Err(WorkloadError::InvalidRequest(..))
        ));
        assert!(RandomOrders::default().with_shares(0..=10).is_err());
        assert!(RandomOrders::default().with_cost(dec!(5.00), dec!(1.00)).is_err());
        assert!(RandomOrders::default().with_cost(dec!(0.00), dec!(1.00)).is_err());
        assert!(RandomOrders::default().with_cost(dec!(-1.00), dec!(1.00)).is_err());
        assert!(RandomOrders::default().with_cost(dec!(0.01), dec!(0.01)).is_ok());
    }
}
