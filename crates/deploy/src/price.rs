//! Tiered mint pricing.

use alloy_core::{dyn_abi::DynSolValue, primitives::U256};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A price tier: from `mint_count` cumulative mints onward, each mint costs `price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePeriod {
    #[serde(alias = "mintcount")]
    pub mint_count: U256,
    pub price: U256,
}

impl PricePeriod {
    pub fn new(mint_count: u64, price: U256) -> Self {
        Self {
            mint_count: U256::from(mint_count),
            price,
        }
    }

    /// ABI value of the `(uint256 mintCount, uint256 price)` struct.
    pub fn to_abi(&self) -> DynSolValue {
        DynSolValue::Tuple(vec![
            DynSolValue::Uint(self.mint_count, 256),
            DynSolValue::Uint(self.price, 256),
        ])
    }
}

/// Non-empty price tiers with strictly increasing mint counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PricePeriod>", into = "Vec<PricePeriod>")]
pub struct PriceSchedule {
    periods: Vec<PricePeriod>,
}

impl PriceSchedule {
    pub fn new(periods: Vec<PricePeriod>) -> Result<Self> {
        anyhow::ensure!(!periods.is_empty(), "Price schedule needs at least one period");

        for window in periods.windows(2) {
            anyhow::ensure!(
                window[0].mint_count < window[1].mint_count,
                "Price periods must have strictly increasing mint counts ({} is followed by {})",
                window[0].mint_count,
                window[1].mint_count
            );
        }

        Ok(Self { periods })
    }

    pub fn periods(&self) -> &[PricePeriod] {
        &self.periods
    }

    /// Unit price after `mint_count` cumulative mints.
    ///
    /// The price of a tier holds from its threshold until the next threshold is
    /// reached. Counts below the first threshold use the first tier, counts past
    /// the last threshold use the last tier.
    pub fn current_price(&self, mint_count: U256) -> U256 {
        let reached = self
            .periods
            .partition_point(|period| period.mint_count <= mint_count);
        self.periods[reached.saturating_sub(1)].price
    }

    /// ABI value of the `PricePeriod[]` constructor argument.
    pub fn to_abi(&self) -> DynSolValue {
        DynSolValue::Array(self.periods.iter().map(PricePeriod::to_abi).collect())
    }
}

impl TryFrom<Vec<PricePeriod>> for PriceSchedule {
    type Error = anyhow::Error;

    fn try_from(periods: Vec<PricePeriod>) -> Result<Self> {
        Self::new(periods)
    }
}

impl From<PriceSchedule> for Vec<PricePeriod> {
    fn from(schedule: PriceSchedule) -> Self {
        schedule.periods
    }
}
