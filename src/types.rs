//! Core type definitions for wrap/unwrap steps.
//!
//! This module contains the transaction kinds, the report a single step emits,
//! and the summary accumulated over a run.

use alloy::primitives::{TxHash, U256};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The two transaction types the cycler knows how to send.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    /// Wrap native currency into WETH via `deposit()`
    Deposit,
    /// Unwrap WETH back into native currency via `withdraw(uint256)`
    Withdraw,
}

impl TxKind {
    /// Single-letter token used when printing a sequence
    pub fn token(&self) -> char {
        match self {
            TxKind::Deposit => 'D',
            TxKind::Withdraw => 'W',
        }
    }

    /// Argument passed to a child process for this kind
    pub fn as_arg(&self) -> &'static str {
        match self {
            TxKind::Deposit => "deposit",
            TxKind::Withdraw => "withdraw",
        }
    }

    pub fn other(&self) -> TxKind {
        match self {
            TxKind::Deposit => TxKind::Withdraw,
            TxKind::Withdraw => TxKind::Deposit,
        }
    }

    /// Human label, e.g. "Wrap ETH (Deposit)"
    pub fn label(&self) -> &'static str {
        match self {
            TxKind::Deposit => "Wrap ETH (Deposit)",
            TxKind::Withdraw => "Unwrap ETH (Withdraw)",
        }
    }
}

impl Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Deposit => write!(f, "Deposit"),
            TxKind::Withdraw => write!(f, "Withdrawal"),
        }
    }
}

/// Log verbosity selected on the command line, shared with child processes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
    Quiet,
}

impl Verbosity {
    /// `quiet` wins when both flags are set
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Global flag that reproduces this verbosity in a child invocation
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            Verbosity::Normal => None,
            Verbosity::Verbose => Some("--verbose"),
            Verbosity::Quiet => Some("--quiet"),
        }
    }
}

/// Structured record a single step emits when it finishes.
/// A child process prints exactly one of these as its final stdout line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepReport {
    Success {
        kind: TxKind,
        /// Amount wrapped or unwrapped, in wei
        amount: U256,
        /// gas_used * effective_gas_price, in wei
        fee: U256,
        /// WETH balance after the step landed
        weth_balance: U256,
        /// Native balance after the step landed
        eth_balance: U256,
        tx_hash: TxHash,
        block_number: u64,
        /// The withdraw took the entire remaining WETH balance
        #[serde(default)]
        drained: bool,
    },
    Skipped {
        kind: TxKind,
        reason: String,
    },
    Failed {
        kind: TxKind,
        message: String,
    },
}

impl StepReport {
    /// Process exit code a child uses after emitting this report
    pub fn exit_code(&self) -> u8 {
        match self {
            StepReport::Failed { .. } => 1,
            _ => 0,
        }
    }
}

/// Totals accumulated over a run.
/// Only the owner of a run mutates it, once per finished step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total_deposited: U256,
    pub total_withdrawn: U256,
    pub deposit_fees: U256,
    pub withdraw_fees: U256,
    /// Latest WETH balance reported by a successful step
    pub weth_balance: Option<U256>,
    /// Latest native balance reported by a successful step
    pub eth_balance: Option<U256>,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one step report into the totals
    pub fn record(&mut self, report: &StepReport) {
        match report {
            StepReport::Success {
                kind,
                amount,
                fee,
                weth_balance,
                eth_balance,
                ..
            } => {
                match kind {
                    TxKind::Deposit => {
                        self.total_deposited += *amount;
                        self.deposit_fees += *fee;
                    }
                    TxKind::Withdraw => {
                        self.total_withdrawn += *amount;
                        self.withdraw_fees += *fee;
                    }
                }
                self.weth_balance = Some(*weth_balance);
                self.eth_balance = Some(*eth_balance);
                self.succeeded += 1;
            }
            StepReport::Skipped { .. } => self.skipped += 1,
            StepReport::Failed { .. } => self.failed += 1,
        }
    }

    /// Counts a step whose runner failed before any report was produced
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    pub fn total_fees(&self) -> U256 {
        self.deposit_fees + self.withdraw_fees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(kind: TxKind, amount: u64, fee: u64, weth: u64, eth: u64) -> StepReport {
        StepReport::Success {
            kind,
            amount: U256::from(amount),
            fee: U256::from(fee),
            weth_balance: U256::from(weth),
            eth_balance: U256::from(eth),
            tx_hash: TxHash::ZERO,
            block_number: 1,
            drained: false,
        }
    }

    #[test]
    fn record_splits_totals_by_kind() {
        let mut summary = RunSummary::new();
        summary.record(&success(TxKind::Deposit, 100, 3, 100, 900));
        summary.record(&success(TxKind::Deposit, 50, 2, 150, 850));
        summary.record(&success(TxKind::Withdraw, 70, 4, 80, 910));

        assert_eq!(summary.total_deposited, U256::from(150));
        assert_eq!(summary.deposit_fees, U256::from(5));
        assert_eq!(summary.total_withdrawn, U256::from(70));
        assert_eq!(summary.withdraw_fees, U256::from(4));
        assert_eq!(summary.total_fees(), U256::from(9));
        assert_eq!(summary.weth_balance, Some(U256::from(80)));
        assert_eq!(summary.eth_balance, Some(U256::from(910)));
        assert_eq!(summary.succeeded, 3);
    }

    #[test]
    fn skips_and_failures_leave_totals_untouched() {
        let mut summary = RunSummary::new();
        summary.record(&success(TxKind::Deposit, 10, 1, 10, 90));
        summary.record(&StepReport::Skipped {
            kind: TxKind::Withdraw,
            reason: "No WETH balance available.".to_string(),
        });
        summary.record(&StepReport::Failed {
            kind: TxKind::Deposit,
            message: "insufficient funds".to_string(),
        });
        summary.record_failure();

        assert_eq!(summary.total_deposited, U256::from(10));
        assert_eq!(summary.total_withdrawn, U256::ZERO);
        assert_eq!(summary.weth_balance, Some(U256::from(10)));
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.completed(), 4);
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let report = StepReport::Failed {
            kind: TxKind::Withdraw,
            message: "boom".to_string(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("\"kind\":\"withdraw\""));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn kind_tokens() {
        assert_eq!(TxKind::Deposit.token(), 'D');
        assert_eq!(TxKind::Withdraw.token(), 'W');
        assert_eq!(TxKind::Deposit.other(), TxKind::Withdraw);
        assert_eq!(TxKind::Withdraw.to_string(), "Withdrawal");
    }

    #[test]
    fn verbosity_flags() {
        assert_eq!(Verbosity::from_flags(false, false).flag(), None);
        assert_eq!(Verbosity::from_flags(true, false).flag(), Some("--verbose"));
        assert_eq!(Verbosity::from_flags(false, true).flag(), Some("--quiet"));
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
    }
}
