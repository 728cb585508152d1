//! weth-cycler - randomized WETH wrap/unwrap automation.
//!
//! Without a subcommand an interactive menu asks which run to perform.
//!
//! ```bash
//! # Wrap 5 times with random amounts and delays
//! weth-cycler deposit --count 5
//!
//! # Unwrap 3 times, then wrap 2 times
//! weth-cycler sequential --first withdraw --deposits 2 --withdraws 3
//!
//! # Randomly interleave 4 wraps and 4 unwraps
//! weth-cycler interleave --deposits 4 --withdraws 4
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weth_cycler::{
    generate_sequence,
    menu::{Menu, MenuChoice},
    orchestrator::{run_child_step, run_sequential},
    sequence::{format_sequence, longest_streak},
    wallet::progress::print_run_summary,
    Config, Orchestrator, ProcessStepRunner, TxKind, Verbosity, WalletManager,
};

/// Randomized WETH wrap/unwrap automation
#[derive(Parser)]
#[command(name = "weth-cycler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Wrap ETH (deposit) repeatedly
    Deposit {
        /// Number of transactions (default: DEPOSIT_TX_COUNT)
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Unwrap WETH (withdraw) repeatedly
    Withdraw {
        /// Number of transactions (default: WITHDRAW_TX_COUNT)
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Run all of one kind, pause, then all of the other kind
    Sequential {
        /// Kind to run first
        #[arg(short, long, value_enum, default_value = "deposit")]
        first: TxKind,

        /// Number of deposits (default: DEPOSIT_TX_COUNT)
        #[arg(short, long)]
        deposits: Option<usize>,

        /// Number of withdrawals (default: WITHDRAW_TX_COUNT)
        #[arg(short, long)]
        withdraws: Option<usize>,
    },

    /// Run deposits and withdrawals in a random interleaved order
    Interleave {
        /// Number of deposits (default: DEPOSIT_TX_COUNT)
        #[arg(short, long)]
        deposits: Option<usize>,

        /// Number of withdrawals (default: WITHDRAW_TX_COUNT)
        #[arg(short, long)]
        withdraws: Option<usize>,
    },

    /// Execute a single step and report it on stdout
    #[command(hide = true)]
    Step {
        #[arg(value_enum)]
        kind: TxKind,
    },
}

fn setup_logging(verbosity: Verbosity) -> Option<WorkerGuard> {
    let filter = match verbosity {
        Verbosity::Quiet => EnvFilter::new("error"),
        Verbosity::Verbose => EnvFilter::new("debug"),
        Verbosity::Normal => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        }
    };

    let log_dir = dotenv::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let (file_layer, guard) = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("weth-cycler")
        .filename_suffix("log")
        .build(&log_dir)
    {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let _guard = setup_logging(verbosity);

    match run(cli.command, verbosity).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Run aborted");
            eprintln!("{}", format!("Error: {}", e).red());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Option<Commands>, verbosity: Verbosity) -> eyre::Result<ExitCode> {
    let command = match command {
        Some(command) => command,
        None => match tokio::task::spawn_blocking(|| Menu::stdio().prompt()).await? {
            Ok(MenuChoice::Batch { kind, count }) => match kind {
                TxKind::Deposit => Commands::Deposit { count: Some(count) },
                TxKind::Withdraw => Commands::Withdraw { count: Some(count) },
            },
            Ok(MenuChoice::Sequential {
                first,
                deposit_count,
                withdraw_count,
            }) => Commands::Sequential {
                first,
                deposits: Some(deposit_count),
                withdraws: Some(withdraw_count),
            },
            Ok(MenuChoice::Interleave {
                deposit_count,
                withdraw_count,
            }) => Commands::Interleave {
                deposits: Some(deposit_count),
                withdraws: Some(withdraw_count),
            },
            Ok(MenuChoice::Exit) => return Ok(ExitCode::SUCCESS),
            Err(rejection) => {
                println!("{}", rejection.message());
                return Ok(ExitCode::FAILURE);
            }
        },
    };

    match command {
        Commands::Step { kind } => {
            let manager = match Config::from_env() {
                Ok(config) => WalletManager::connect(config).await,
                Err(e) => Err(e),
            };
            Ok(ExitCode::from(run_child_step(manager, kind).await))
        }
        Commands::Deposit { count } => run_batch(TxKind::Deposit, count).await,
        Commands::Withdraw { count } => run_batch(TxKind::Withdraw, count).await,
        Commands::Sequential {
            first,
            deposits,
            withdraws,
        } => {
            let config = Config::from_env()?;
            let deposits = deposits.unwrap_or(config.deposit_tx_count);
            let withdraws = withdraws.unwrap_or(config.withdraw_tx_count);
            info!(%first, deposits, withdraws, "Starting sequential run");

            run_sequential(
                std::env::current_exe()?,
                first,
                deposits,
                withdraws,
                config.sequential_pause,
                verbosity,
            )
            .await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Interleave {
            deposits,
            withdraws,
        } => {
            let config = Config::from_env()?;
            let deposits = deposits.unwrap_or(config.deposit_tx_count);
            let withdraws = withdraws.unwrap_or(config.withdraw_tx_count);

            let sequence = generate_sequence(&mut rand::rng(), deposits, withdraws)?;
            println!("\nRandom Transaction Sequence: {}", format_sequence(&sequence));
            info!(
                deposits,
                withdraws,
                longest_streak = longest_streak(&sequence),
                "Starting interleaved run"
            );

            let orchestrator = Orchestrator::new(
                ProcessStepRunner::current_exe()?.with_verbosity(verbosity),
                config.min_delay,
                config.max_delay,
            );
            let summary = orchestrator.execute(&sequence).await;
            print_run_summary(&summary);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_batch(kind: TxKind, count: Option<usize>) -> eyre::Result<ExitCode> {
    let config = Config::from_env()?;
    let count = count.unwrap_or(config.default_count(kind));

    let manager = WalletManager::connect(config).await?;
    info!(wallet = %manager.address(), %kind, count, "Starting batch");

    println!(
        "\n==================================================\n{} Transaction Started!",
        kind.label()
    );
    manager.run_batch(kind, count).await?;
    Ok(ExitCode::SUCCESS)
}
