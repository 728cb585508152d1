//! Randomized interleaving of deposit and withdraw steps.
//!
//! This module builds the ordered list of steps an interleaved run executes,
//! limiting how many steps of the same kind may follow each other.

use rand::Rng;

use crate::{
    error::{Result, WalletError},
    types::TxKind,
};

/// Maximum number of consecutive steps of one kind while the other kind still has quota
pub const MAX_STREAK: usize = 3;

/// Generates a randomized sequence holding exactly `deposit_count` deposits and
/// `withdraw_count` withdrawals.
///
/// At each position a kind is picked uniformly among the eligible ones. A kind is
/// ineligible when it was just picked [`MAX_STREAK`] times in a row and the other
/// kind still has quota left.
///
/// # Arguments
/// * `rng` - Source of randomness
/// * `deposit_count` - Number of deposits, at least 1
/// * `withdraw_count` - Number of withdrawals, at least 1
///
/// # Returns
/// * `Result<Vec<TxKind>>` - The sequence, or `InvalidCount` if either count is zero
pub fn generate_sequence<R: Rng>(
    rng: &mut R,
    deposit_count: usize,
    withdraw_count: usize,
) -> Result<Vec<TxKind>> {
    if deposit_count == 0 {
        return Err(WalletError::InvalidCount(
            "The number of deposit transactions must be greater than 0".to_string(),
        ));
    }
    if withdraw_count == 0 {
        return Err(WalletError::InvalidCount(
            "The number of withdrawal transactions must be greater than 0".to_string(),
        ));
    }

    let mut deposits_left = deposit_count;
    let mut withdraws_left = withdraw_count;
    let mut sequence = Vec::with_capacity(deposit_count + withdraw_count);
    let mut last: Option<TxKind> = None;
    let mut streak = 0;

    while deposits_left > 0 || withdraws_left > 0 {
        let mut choices = Vec::with_capacity(2);
        for (kind, left, other_left) in [
            (TxKind::Deposit, deposits_left, withdraws_left),
            (TxKind::Withdraw, withdraws_left, deposits_left),
        ] {
            if left == 0 {
                continue;
            }
            let capped = last == Some(kind) && streak == MAX_STREAK;
            if !capped || other_left == 0 {
                choices.push(kind);
            }
        }

        // Not reachable under the streak rule.
        if choices.is_empty() {
            if deposits_left > 0 {
                choices.push(TxKind::Deposit);
            } else {
                choices.push(TxKind::Withdraw);
            }
        }

        let pick = choices[rng.random_range(0..choices.len())];
        sequence.push(pick);
        match pick {
            TxKind::Deposit => deposits_left -= 1,
            TxKind::Withdraw => withdraws_left -= 1,
        }

        if last == Some(pick) {
            streak += 1;
        } else {
            last = Some(pick);
            streak = 1;
        }
    }

    Ok(sequence)
}

/// Renders a sequence as space separated `D`/`W` tokens.
pub fn format_sequence(sequence: &[TxKind]) -> String {
    sequence
        .iter()
        .map(|kind| kind.token().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of the longest run of identical kinds.
pub fn longest_streak(sequence: &[TxKind]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut last = None;
    for kind in sequence {
        if last == Some(*kind) {
            current += 1;
        } else {
            last = Some(*kind);
            current = 1;
        }
        longest = longest.max(current);
    }
    longest
}
