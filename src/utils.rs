//! Utility functions for amounts, delays and display formatting.
//!
//! This module provides helper functions for:
//! - Randomized amounts and delays
//! - Ether formatting
//! - Block time formatting

use std::time::Duration;

use alloy::primitives::U256;
use alloy_primitives::utils::{format_units, parse_ether};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use rand::Rng;

use crate::error::{Result, WalletError};

/// Decimal places kept when randomizing amounts
pub const AMOUNT_DECIMALS: usize = 8;

/// Picks a random ether amount in `[min, max)` rounded to [`AMOUNT_DECIMALS`] places.
///
/// # Returns
/// * `Result<U256>` - The amount in wei
pub fn random_amount<R: Rng>(rng: &mut R, min: f64, max: f64) -> Result<U256> {
    let value = if max > min {
        rng.random_range(min..max)
    } else {
        min
    };
    let rounded = format!("{:.*}", AMOUNT_DECIMALS, value);
    parse_ether(&rounded)
        .map_err(|e| WalletError::InvalidEnvVar(format!("Amount {} is not valid ether: {}", rounded, e)))
}

/// Picks a random delay between `min` and `max`, both inclusive, at millisecond resolution.
pub fn random_delay<R: Rng>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms <= min_ms {
        return min;
    }
    Duration::from_millis(rng.random_range(min_ms..=max_ms))
}

/// Formats a delay as "N minutes and M seconds", dropping zero parts.
pub fn format_delay(delay: Duration) -> String {
    let total_seconds = delay.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    let mut parts = Vec::new();
    if minutes > 0 {
        parts.push(format!("{} minute{}", minutes, if minutes != 1 { "s" } else { "" }));
    }
    if seconds > 0 {
        parts.push(format!("{} second{}", seconds, if seconds != 1 { "s" } else { "" }));
    }
    parts.join(" and ")
}

/// Formats a wei value as ether with a fixed number of decimals.
pub fn format_ether_fixed(value: U256, decimals: usize) -> String {
    let ether = format_units(value, "ether")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or_default();
    format!("{:.*}", decimals, ether)
}

/// Formats a block timestamp like "3:07 PM · Oct 19, 2026" in the given UTC offset.
pub fn format_block_time(timestamp: u64, utc_offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    match DateTime::from_timestamp(timestamp as i64, 0) {
        Some(utc) => utc
            .with_timezone(&offset)
            .format("%-I:%M %p · %b %-d, %Y")
            .to_string(),
        None => format!("block time {}", timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn delay_formatting() {
        assert_eq!(format_delay(Duration::from_secs(65)), "1 minute and 5 seconds");
        assert_eq!(format_delay(Duration::from_secs(30)), "30 seconds");
        assert_eq!(format_delay(Duration::from_secs(120)), "2 minutes");
        assert_eq!(format_delay(Duration::from_secs(61)), "1 minute and 1 second");
        assert_eq!(format_delay(Duration::from_millis(299_999)), "4 minutes and 59 seconds");
    }

    #[test]
    fn random_delay_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let min = Duration::from_secs(30);
        let max = Duration::from_secs(300);
        for _ in 0..1000 {
            let delay = random_delay(&mut rng, min, max);
            assert!(delay >= min && delay <= max);
        }
        assert_eq!(random_delay(&mut rng, max, min), max);
    }

    #[test]
    fn random_delay_saturates_huge_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let min = Duration::from_secs(u64::MAX / 1000 - 1);
        let delay = random_delay(&mut rng, min, Duration::MAX);
        assert!(delay >= min);
    }

    #[test]
    fn random_amount_rounds_to_eight_decimals() {
        let mut rng = StdRng::seed_from_u64(5);
        let lower = parse_ether("0.0001").unwrap();
        let upper = parse_ether("0.0005").unwrap();
        let step = U256::from(10u64).pow(U256::from(10));
        for _ in 0..200 {
            let amount = random_amount(&mut rng, 0.0001, 0.0005).unwrap();
            assert!(amount >= lower && amount <= upper);
            assert_eq!(amount % step, U256::ZERO);
        }
    }

    #[test]
    fn random_amount_with_equal_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        let amount = random_amount(&mut rng, 0.25, 0.25).unwrap();
        assert_eq!(amount, parse_ether("0.25").unwrap());
    }

    #[test]
    fn ether_fixed_formatting() {
        let value = parse_ether("1.5").unwrap();
        assert_eq!(format_ether_fixed(value, 8), "1.50000000");
        assert_eq!(format_ether_fixed(U256::ZERO, 10), "0.0000000000");
    }

    #[test]
    fn block_time_in_manila() {
        // 2024-01-01T00:00:00Z
        assert_eq!(format_block_time(1_704_067_200, 8), "8:00 AM · Jan 1, 2024");
        assert_eq!(format_block_time(1_704_067_200, 0), "12:00 AM · Jan 1, 2024");
    }
}
