//! Ether amounts and blockchain timestamps.

use alloy_core::primitives::U256;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};

/// Number of wei in one ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Seconds in one day.
pub const DAYS: u32 = 24 * 60 * 60;

/// Whole ether amount expressed in wei.
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(WEI_PER_ETHER)
}

/// Current unix timestamp in seconds.
pub fn now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Unix timestamp of midnight UTC on the given calendar day, as stored on chain.
///
/// `month` and `day` are 1-based.
pub fn utc_blockchain_date(year: i32, month: u32, day: u32) -> Result<u32> {
    let timestamp = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .with_context(|| format!("Invalid calendar date {year}-{month:02}-{day:02}"))?
        .and_utc()
        .timestamp();

    u32::try_from(timestamp)
        .with_context(|| format!("Date {year}-{month:02}-{day:02} does not fit in a uint32 timestamp"))
}
