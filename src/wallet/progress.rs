use alloy::primitives::{TxHash, U256};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{info, info_span, warn};

use crate::{
    types::{RunSummary, TxKind},
    utils::{format_block_time, format_delay, format_ether_fixed},
};

use super::Config;

/// Decimals shown for amounts and balances
const AMOUNT_PRECISION: usize = 8;
/// Decimals shown for fees
const FEE_PRECISION: usize = 10;

/// Manages waiting between steps and the terminal report of each step and run
#[derive(Debug, Clone)]
pub struct ProgressManager {
    config: Config,
}

/// Values shown after a step landed
pub struct StepDisplay<'a> {
    pub kind: TxKind,
    pub index: Option<usize>,
    pub amount: U256,
    pub hash: &'a TxHash,
    pub block_number: u64,
    pub timestamp: Option<u64>,
    pub weth_balance: U256,
    pub eth_balance: U256,
}

impl ProgressManager {
    /// Creates a new ProgressManager
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Sleeps for `delay`, ticking a progress bar once per second
    pub async fn wait_with_progress(&self, delay: Duration) {
        wait_with_progress(delay).await
    }

    /// Prints the details of a step that landed on chain
    pub fn print_step_success(&self, step: &StepDisplay<'_>) {
        let verb = match step.kind {
            TxKind::Deposit => "wrap (deposit)",
            TxKind::Withdraw => "unwrap (withdrawal)",
        };
        let when = step
            .timestamp
            .map(|ts| format_block_time(ts, self.config.utc_offset_hours))
            .unwrap_or_else(|| "unknown time".to_string());
        let prefix = step.index.map(|i| format!("{}. ", i + 1)).unwrap_or_default();

        println!(
            "\n{}{} ETH {} success @ {} with Block # {}",
            prefix,
            format_ether_fixed(step.amount, AMOUNT_PRECISION).bright_red(),
            verb,
            when.bright_yellow(),
            step.block_number.to_string().green()
        );
        println!("\n   Transaction hash: {}", step.hash.to_string().bright_cyan());
        println!(
            "   Transaction details -> {}",
            format!("{}{}", self.config.explorer_tx_url, step.hash)
                .bright_blue()
                .bold()
        );
        println!(
            "\nTotal WETH balance: {} WETH",
            format_ether_fixed(step.weth_balance, AMOUNT_PRECISION).bright_magenta()
        );
        println!(
            "Total ETH balance: {} ETH",
            format_ether_fixed(step.eth_balance, AMOUNT_PRECISION).bright_green()
        );
    }

    /// Prints the totals of a single-kind batch with freshly queried balances
    pub fn print_batch_summary(
        &self,
        kind: TxKind,
        summary: &RunSummary,
        weth_balance: Option<U256>,
        eth_balance: Option<U256>,
    ) {
        let span = info_span!("batch_summary", %kind);
        let _guard = span.enter();

        let (moved, fees, label) = match kind {
            TxKind::Deposit => (summary.total_deposited, summary.deposit_fees, "deposit"),
            TxKind::Withdraw => (summary.total_withdrawn, summary.withdraw_fees, "withdrawal"),
        };

        println!(
            "\n{}",
            format!("All {} Transactions Completed.", kind.label()).bright_blue()
        );
        println!(
            "\nOverall ETH {}: {} ETH",
            label,
            format_ether_fixed(moved, AMOUNT_PRECISION).bright_red()
        );
        println!(
            "Overall Txn fee spent: {} ETH",
            format_ether_fixed(fees, FEE_PRECISION).bright_yellow()
        );
        println!(
            "\nOverall WETH balance: {} WETH",
            display_balance(weth_balance).bright_magenta()
        );
        println!(
            "Overall ETH balance: {} ETH",
            display_balance(eth_balance).bright_green()
        );

        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch completed"
        );
    }
}

/// Sleeps for `delay`, ticking a progress bar once per second
pub async fn wait_with_progress(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    println!(
        "\nWaiting for {} before processing the next transaction.\n",
        format_delay(delay)
    );

    let total_seconds = delay.as_secs() + u64::from(delay.subsec_nanos() > 0);
    let bar = ProgressBar::new(total_seconds);
    bar.set_style(
        ProgressStyle::with_template("Waiting [{bar:40}] {percent}% | {pos}/{len} seconds")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█░"),
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately.
    ticker.tick().await;
    for _ in 0..total_seconds {
        ticker.tick().await;
        bar.inc(1);
    }
    bar.finish_and_clear();
}

/// Prints the overall summary of an orchestrated run
pub fn print_run_summary(summary: &RunSummary) {
    let span = info_span!("run_summary");
    let _guard = span.enter();

    println!("\n==================================================");
    println!("\n{}", "----------Overall Transaction Summary----------".bright_blue());
    println!(
        "Total ETH Deposited: {} ETH",
        format_ether_fixed(summary.total_deposited, AMOUNT_PRECISION).bright_green()
    );
    println!(
        "Total ETH Withdrawn: {} ETH",
        format_ether_fixed(summary.total_withdrawn, AMOUNT_PRECISION).bright_red()
    );
    println!(
        "Total ETH Deposit Txn Fees: {} ETH",
        format_ether_fixed(summary.deposit_fees, FEE_PRECISION).bright_yellow()
    );
    println!(
        "Total ETH Withdrawal Txn Fees: {} ETH",
        format_ether_fixed(summary.withdraw_fees, FEE_PRECISION).bright_yellow()
    );
    println!(
        "Final WETH Balance: {} WETH",
        display_balance(summary.weth_balance).bright_magenta()
    );
    println!(
        "Final ETH Balance: {} ETH",
        display_balance(summary.eth_balance).bright_green()
    );
    println!("\n==================================================");

    info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Run completed"
    );
    if summary.failed > 0 {
        warn!(failed = summary.failed, "Some transactions failed");
    }
}

fn display_balance(balance: Option<U256>) -> String {
    balance
        .map(|b| format_ether_fixed(b, AMOUNT_PRECISION))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_balance_display() {
        assert_eq!(display_balance(None), "unknown");
        assert_eq!(display_balance(Some(U256::ZERO)), "0.00000000");
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let start = std::time::Instant::now();
        wait_with_progress(Duration::ZERO).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_covers_whole_seconds() {
        let start = tokio::time::Instant::now();
        wait_with_progress(Duration::from_millis(2500)).await;
        assert_eq!(start.elapsed().as_secs(), 3);
    }
}
