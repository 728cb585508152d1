use alloy::primitives::U256;
use colored::Colorize;
use tracing::{error, info, info_span, Instrument};

use crate::{
    error::{Result, WalletError},
    types::{RunSummary, StepReport, TxKind},
    utils::{random_amount, random_delay},
};

use super::{
    progress::{ProgressManager, StepDisplay},
    transaction::TransactionManager,
    Config,
};

/// Reason reported when a withdrawal finds nothing to unwrap
pub const NO_WETH_BALANCE: &str = "No WETH balance available.";

/// Manages execution of wrap/unwrap steps
pub struct ExecutionManager {
    config: Config,
}

impl ExecutionManager {
    /// Creates a new ExecutionManager
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn pick_amount(&self, kind: TxKind) -> Result<U256> {
        let range = self.config.amount_range(kind);
        random_amount(&mut rand::rng(), range.min, range.max)
    }

    /// Executes one wrap or unwrap and prints its outcome.
    ///
    /// A withdrawal with no WETH balance is reported as skipped. A withdrawal whose
    /// random amount reaches the balance unwraps the whole balance and is marked drained.
    pub async fn execute_step(
        &self,
        kind: TxKind,
        index: Option<usize>,
        transaction_manager: &TransactionManager,
        progress_manager: &ProgressManager,
    ) -> Result<StepReport> {
        let span = info_span!("step", %kind, index = index.map(|i| i + 1));
        self.send_step(kind, index, transaction_manager, progress_manager)
            .instrument(span)
            .await
    }

    async fn send_step(
        &self,
        kind: TxKind,
        index: Option<usize>,
        transaction_manager: &TransactionManager,
        progress_manager: &ProgressManager,
    ) -> Result<StepReport> {
        let mut amount = self.pick_amount(kind)?;
        let mut drained = false;

        if kind == TxKind::Withdraw {
            let weth_balance = transaction_manager.get_weth_balance().await?;
            if weth_balance.is_zero() {
                println!("{}", "No WETH balance available. Skipping withdrawal.".bright_red());
                info!("Withdrawal skipped, WETH balance is zero");
                return Ok(StepReport::Skipped {
                    kind,
                    reason: NO_WETH_BALANCE.to_string(),
                });
            }
            if weth_balance <= amount {
                amount = weth_balance;
                drained = true;
            }
        }

        let landed = transaction_manager.build_and_send(kind, amount).await?;

        let weth_balance = transaction_manager.get_weth_balance().await?;
        let eth_balance = transaction_manager.get_eth_balance().await?;

        progress_manager.print_step_success(&StepDisplay {
            kind,
            index,
            amount,
            hash: &landed.hash,
            block_number: landed.block_number,
            timestamp: landed.timestamp,
            weth_balance,
            eth_balance,
        });

        Ok(StepReport::Success {
            kind,
            amount,
            fee: landed.fee,
            weth_balance,
            eth_balance,
            tx_hash: landed.hash,
            block_number: landed.block_number,
            drained,
        })
    }

    /// Runs `count` steps of one kind in this process.
    ///
    /// Failed steps are logged and the batch moves on. A withdraw batch ends early
    /// once the WETH balance is empty or was fully unwrapped.
    pub async fn run_batch(
        &self,
        kind: TxKind,
        count: usize,
        transaction_manager: &TransactionManager,
        progress_manager: &ProgressManager,
    ) -> Result<RunSummary> {
        if count == 0 {
            return Err(WalletError::InvalidCount(format!(
                "The number of {} transactions must be greater than 0",
                kind.to_string().to_lowercase()
            )));
        }

        let mut summary = RunSummary::new();
        for index in 0..count {
            let finished = match self
                .execute_step(kind, Some(index), transaction_manager, progress_manager)
                .await
            {
                Ok(report) => {
                    summary.record(&report);
                    batch_exhausted(&report)
                }
                Err(e) => {
                    error!(%kind, step = index + 1, error = %e, "Step failed");
                    eprintln!("{}", format!("Error during {}: {}", kind.label(), e).red());
                    summary.record_failure();
                    false
                }
            };

            if finished || index + 1 >= count {
                break;
            }

            let delay = random_delay(&mut rand::rng(), self.config.min_delay, self.config.max_delay);
            progress_manager.wait_with_progress(delay).await;
        }

        let weth_balance = transaction_manager.get_weth_balance().await.ok();
        let eth_balance = transaction_manager.get_eth_balance().await.ok();
        progress_manager.print_batch_summary(kind, &summary, weth_balance, eth_balance);

        Ok(summary)
    }
}

/// Whether a report means no further withdrawals can do anything
fn batch_exhausted(report: &StepReport) -> bool {
    match report {
        StepReport::Skipped { .. } => true,
        StepReport::Success { drained, .. } => *drained,
        StepReport::Failed { .. } => false,
    }
}
