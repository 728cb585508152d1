//! Orchestration of isolated wrap/unwrap steps.
//!
//! An interleaved run executes one step per sequence element, each in its own
//! child process. The child reports its outcome as a single marker-prefixed JSON
//! line on stdout and exits. Only the orchestrator mutates the run summary.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use colored::Colorize;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{error, info, warn};

use crate::{
    error::{Result, WalletError},
    types::{RunSummary, StepReport, TxKind, Verbosity},
    utils::random_delay,
    wallet::{progress::wait_with_progress, WalletManager},
};

/// Prefix marking the report line a child prints before exiting
pub const REPORT_MARKER: &str = "@@weth-cycler-report@@";

/// Renders a report as the line a child prints to stdout.
pub fn encode_report(report: &StepReport) -> Result<String> {
    let json = serde_json::to_string(report)
        .map_err(|e| WalletError::ReportError(format!("Failed to encode report: {}", e)))?;
    Ok(format!("{} {}", REPORT_MARKER, json))
}

/// Parses a stdout line from a child.
///
/// # Returns
/// * `Ok(None)` - The line is ordinary output
/// * `Ok(Some(report))` - The line carried a report
/// * `Err(_)` - The line carried a marker but the payload was malformed
pub fn parse_report_line(line: &str) -> Result<Option<StepReport>> {
    let Some(payload) = line.trim_end().strip_prefix(REPORT_MARKER) else {
        return Ok(None);
    };
    serde_json::from_str(payload.trim())
        .map(Some)
        .map_err(|e| WalletError::ReportError(format!("Malformed report line: {}", e)))
}

/// Executes one step in isolation and hands back its report
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step(&self, kind: TxKind) -> Result<StepReport>;
}

/// Command for `program` with the verbosity flag placed before any subcommand
fn child_command(program: &Path, verbosity: Verbosity) -> Command {
    let mut command = Command::new(program);
    command.args(verbosity.flag());
    command
}

/// Runs each step as a child process of the current executable
pub struct ProcessStepRunner {
    program: PathBuf,
    verbosity: Verbosity,
}

impl ProcessStepRunner {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            verbosity: Verbosity::Normal,
        }
    }

    /// Runner re-invoking the running binary
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Children log at `verbosity` instead of their default level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

#[async_trait]
impl StepRunner for ProcessStepRunner {
    async fn run_step(&self, kind: TxKind) -> Result<StepReport> {
        let mut child = child_command(&self.program, self.verbosity)
            .arg("step")
            .arg(kind.as_arg())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                WalletError::OrchestrationError(format!(
                    "Error executing {} step: {}",
                    kind.as_arg(),
                    e
                ))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            WalletError::OrchestrationError("Child stdout was not captured".to_string())
        })?;

        let mut report = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_report_line(&line) {
                Ok(Some(parsed)) => report = Some(parsed),
                Ok(None) => println!("{}", line),
                Err(e) => warn!(error = %e, "Ignoring malformed child report"),
            }
        }

        let status = child.wait().await?;
        Ok(report.unwrap_or_else(|| missing_report(kind, status)))
    }
}

fn missing_report(kind: TxKind, status: ExitStatus) -> StepReport {
    StepReport::Failed {
        kind,
        message: format!("Step exited with {} without reporting", status),
    }
}

/// Runs a sequence of steps one at a time with randomized pauses in between
pub struct Orchestrator<R> {
    runner: R,
    min_delay: Duration,
    max_delay: Duration,
}

impl<R: StepRunner> Orchestrator<R> {
    pub fn new(runner: R, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            runner,
            min_delay,
            max_delay,
        }
    }

    /// Executes every element of `sequence` and returns the accumulated summary.
    ///
    /// Failures are logged and counted; they never stop the sequence.
    pub async fn execute(&self, sequence: &[TxKind]) -> RunSummary {
        let mut summary = RunSummary::new();
        let total = sequence.len();

        for (index, kind) in sequence.iter().enumerate() {
            println!(
                "\n-------------------------------------------------------------------------------------------------------------------"
            );
            println!(
                "Transaction {}/{}: Executing {} Transaction",
                (index + 1).to_string().bright_white(),
                total,
                kind
            );

            match self.runner.run_step(*kind).await {
                Ok(report) => {
                    if let StepReport::Failed { message, .. } = &report {
                        error!(step = index + 1, %kind, %message, "Step reported an error");
                    }
                    summary.record(&report);
                }
                Err(e) => {
                    error!(step = index + 1, %kind, error = %e, "Step could not be run");
                    summary.record_failure();
                }
            }

            if index + 1 < total {
                let delay = random_delay(&mut rand::rng(), self.min_delay, self.max_delay);
                info!(
                    next = index + 2,
                    delay_secs = delay.as_secs(),
                    "Waiting before next step"
                );
                wait_with_progress(delay).await;
            }
        }

        println!("All transactions completed.");
        summary
    }
}

/// Entry point of a child step: runs the step, prints the report line and
/// returns the exit code to terminate with.
pub async fn run_child_step(manager: Result<WalletManager>, kind: TxKind) -> u8 {
    let report = match manager {
        Ok(manager) => match manager.execute_step(kind, None).await {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{}", format!("Error during {}: {}", kind.label(), e).red());
                StepReport::Failed {
                    kind,
                    message: e.to_string(),
                }
            }
        },
        Err(e) => {
            eprintln!("{}", format!("Error preparing {}: {}", kind.label(), e).red());
            StepReport::Failed {
                kind,
                message: e.to_string(),
            }
        }
    };

    match encode_report(&report) {
        Ok(line) => println!("{}", line),
        Err(e) => {
            error!(error = %e, "Failed to emit step report");
            return 1;
        }
    }
    report.exit_code()
}

/// Runs a full batch of `first` then a full batch of the other kind, each in a
/// child process sharing this terminal, pausing `pause` in between.
pub async fn run_sequential(
    program: PathBuf,
    first: TxKind,
    deposit_count: usize,
    withdraw_count: usize,
    pause: Duration,
    verbosity: Verbosity,
) -> Result<()> {
    if deposit_count == 0 || withdraw_count == 0 {
        return Err(WalletError::InvalidCount(
            "Both transaction counts must be greater than 0".to_string(),
        ));
    }
    let count_for = |kind: TxKind| match kind {
        TxKind::Deposit => deposit_count,
        TxKind::Withdraw => withdraw_count,
    };

    run_batch_process(&program, verbosity, first, count_for(first)).await?;

    println!("\nPreparing the next transaction. Please wait...");
    tokio::time::sleep(pause).await;

    let second = first.other();
    run_batch_process(&program, verbosity, second, count_for(second)).await
}

async fn run_batch_process(
    program: &Path,
    verbosity: Verbosity,
    kind: TxKind,
    count: usize,
) -> Result<()> {
    let status = child_command(program, verbosity)
        .arg(kind.as_arg())
        .arg("--count")
        .arg(count.to_string())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| {
            WalletError::OrchestrationError(format!("Error executing {} batch: {}", kind.as_arg(), e))
        })?;

    if !status.success() {
        warn!(%kind, %status, "Batch process exited unsuccessfully");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{TxHash, U256};

    #[test]
    fn report_line_roundtrip() {
        let report = StepReport::Success {
            kind: TxKind::Deposit,
            amount: U256::from(123_000u64),
            fee: U256::from(21u64),
            weth_balance: U256::from(500u64),
            eth_balance: U256::from(10u64),
            tx_hash: TxHash::repeat_byte(0xab),
            block_number: 77,
            drained: false,
        };
        let line = encode_report(&report).unwrap();
        assert!(line.starts_with(REPORT_MARKER));
        assert_eq!(parse_report_line(&line).unwrap(), Some(report));
    }

    #[test]
    fn ordinary_lines_are_not_reports() {
        assert_eq!(parse_report_line("Total WETH balance: 1.0 WETH").unwrap(), None);
        assert_eq!(parse_report_line("").unwrap(), None);
    }

    #[test]
    fn malformed_report_is_an_error() {
        let line = format!("{} {{not json", REPORT_MARKER);
        assert!(matches!(
            parse_report_line(&line),
            Err(WalletError::ReportError(_))
        ));
    }

    #[tokio::test]
    async fn child_setup_failure_reports_error() {
        let code = run_child_step(
            Err(WalletError::EnvVarNotFound("RPC_URL".to_string())),
            TxKind::Deposit,
        )
        .await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn sequential_rejects_zero_counts() {
        let result = run_sequential(
            PathBuf::from("/nonexistent"),
            TxKind::Deposit,
            0,
            2,
            Duration::ZERO,
            Verbosity::Normal,
        )
        .await;
        assert!(matches!(result, Err(WalletError::InvalidCount(_))));
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    // Scripts are written and run from a single test; a script still open for
    // writing in another thread makes exec fail with ETXTBSY.
    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_reads_child_reports() {
        let dir = tempfile::tempdir().unwrap();

        let reporting = write_script(
            dir.path(),
            "reporting.sh",
            &format!(
                "echo \"checking balance\"\necho '{} {{\"status\":\"skipped\",\"kind\":\"withdraw\",\"reason\":\"'\"$*\"'\"}}'\nexit 0",
                REPORT_MARKER
            ),
        );
        let report = ProcessStepRunner::new(reporting)
            .with_verbosity(Verbosity::Quiet)
            .run_step(TxKind::Withdraw)
            .await
            .unwrap();
        assert_eq!(
            report,
            StepReport::Skipped {
                kind: TxKind::Withdraw,
                reason: "--quiet step withdraw".to_string(),
            }
        );

        let silent = write_script(dir.path(), "silent.sh", "echo \"sending\"\nexit 3");
        let report = ProcessStepRunner::new(silent)
            .run_step(TxKind::Deposit)
            .await
            .unwrap();
        match report {
            StepReport::Failed { kind, message } => {
                assert_eq!(kind, TxKind::Deposit);
                assert!(message.contains("exited with"), "{}", message);
            }
            other => panic!("expected a failed report, got {:?}", other),
        }

        let result = ProcessStepRunner::new(dir.path().join("missing.sh"))
            .run_step(TxKind::Deposit)
            .await;
        assert!(matches!(result, Err(WalletError::OrchestrationError(_))));
    }
}
