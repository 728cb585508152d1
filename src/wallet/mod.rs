pub mod execution;
pub mod progress;
pub mod transaction;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::Address,
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use core::fmt;
use std::{sync::Arc, time::Duration};

use crate::{
    error::{Result, WalletError},
    types::{RunSummary, StepReport, TxKind},
};

use self::{
    execution::ExecutionManager, progress::ProgressManager, transaction::TransactionManager,
};

const DEFAULT_GAS_LIMIT: u64 = 100_000;
const DEFAULT_EXPLORER_TX_URL: &str = "https://base.blockscout.com/tx/";
const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;
/// Upper bound for any configured delay or pause
pub const MAX_CONFIGURED_DELAY_SECS: u64 = 86_400;

/// Inclusive bounds for a randomized ether amount
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

/// Configuration for wrap/unwrap runs loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub rpc_url: String,
    private_key: String,
    /// Address of the WETH contract
    pub weth_address: Address,
    pub gas_limit: u64,
    pub deposit_amount: AmountRange,
    pub withdraw_amount: AmountRange,
    /// Default count for deposit batches
    pub deposit_tx_count: usize,
    /// Default count for withdraw batches
    pub withdraw_tx_count: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Pause between the two halves of a sequential run
    pub sequential_pause: Duration,
    /// Prefix a transaction hash is appended to for an explorer link
    pub explorer_tx_url: String,
    /// Offset used when printing block times
    pub utc_offset_hours: i32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("weth_address", &self.weth_address)
            .field("gas_limit", &self.gas_limit)
            .field("deposit_amount", &self.deposit_amount)
            .field("withdraw_amount", &self.withdraw_amount)
            .field("deposit_tx_count", &self.deposit_tx_count)
            .field("withdraw_tx_count", &self.withdraw_tx_count)
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .field("sequential_pause", &self.sequential_pause)
            .field("explorer_tx_url", &self.explorer_tx_url)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .finish()
    }
}

impl Config {
    /// Creates a new Config instance by loading values from environment variables.
    /// This should be called only once during startup.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds a Config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| WalletError::EnvVarNotFound(key.to_string()))
        };

        let rpc_url = required("RPC_URL")?;
        let private_key = required("WALLET_PRIVATEKEY")?;
        let weth_address = required("WETH_CA")?.parse::<Address>().map_err(|_| {
            WalletError::InvalidEnvVar("WETH_CA must be a valid address".to_string())
        })?;

        let gas_limit = parse_or(&lookup, "GAS_LIMIT", DEFAULT_GAS_LIMIT)?;
        let deposit_amount = amount_range(
            &lookup,
            "DEPOSIT_RANDOM_AMOUNT_MIN",
            "DEPOSIT_RANDOM_AMOUNT_MAX",
        )?;
        let withdraw_amount = amount_range(
            &lookup,
            "WITHDRAW_RANDOM_AMOUNT_MIN",
            "WITHDRAW_RANDOM_AMOUNT_MAX",
        )?;

        let deposit_tx_count = parse_or(&lookup, "DEPOSIT_TX_COUNT", 1usize)?;
        let withdraw_tx_count = parse_or(&lookup, "WITHDRAW_TX_COUNT", 1usize)?;

        let min_delay = delay_secs(&lookup, "MIN_DELAY_SECS", 30)?;
        let max_delay = delay_secs(&lookup, "MAX_DELAY_SECS", 300)?;
        if min_delay > max_delay {
            return Err(WalletError::InvalidEnvVar(
                "MIN_DELAY_SECS must not exceed MAX_DELAY_SECS".to_string(),
            ));
        }
        let sequential_pause = delay_secs(&lookup, "SEQUENTIAL_PAUSE_SECS", 60)?;

        let explorer_tx_url =
            lookup("EXPLORER_TX_URL").unwrap_or_else(|| DEFAULT_EXPLORER_TX_URL.to_string());
        let utc_offset_hours =
            parse_or(&lookup, "DISPLAY_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(WalletError::InvalidEnvVar(
                "DISPLAY_UTC_OFFSET_HOURS must be between -12 and 14".to_string(),
            ));
        }

        Ok(Self {
            rpc_url,
            private_key,
            weth_address,
            gas_limit,
            deposit_amount,
            withdraw_amount,
            deposit_tx_count,
            withdraw_tx_count,
            min_delay,
            max_delay,
            sequential_pause,
            explorer_tx_url,
            utc_offset_hours,
        })
    }

    /// Parses the configured private key into a local signer
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        self.private_key
            .trim_start_matches("0x")
            .parse::<PrivateKeySigner>()
            .map_err(|_| {
                WalletError::InvalidEnvVar("WALLET_PRIVATEKEY is not a valid key".to_string())
            })
    }

    pub fn amount_range(&self, kind: TxKind) -> AmountRange {
        match kind {
            TxKind::Deposit => self.deposit_amount,
            TxKind::Withdraw => self.withdraw_amount,
        }
    }

    pub fn default_count(&self, kind: TxKind) -> usize {
        match kind {
            TxKind::Deposit => self.deposit_tx_count,
            TxKind::Withdraw => self.withdraw_tx_count,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v
            .parse::<T>()
            .map_err(|_| WalletError::InvalidEnvVar(format!("{} has an invalid value: {}", key, v))),
        _ => Ok(default),
    }
}

fn delay_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default)?;
    if secs > MAX_CONFIGURED_DELAY_SECS {
        return Err(WalletError::InvalidEnvVar(format!(
            "{} must not exceed {} seconds",
            key, MAX_CONFIGURED_DELAY_SECS
        )));
    }
    Ok(Duration::from_secs(secs))
}

fn amount_range<F>(lookup: &F, min_key: &str, max_key: &str) -> Result<AmountRange>
where
    F: Fn(&str) -> Option<String>,
{
    let parse = |key: &str| -> Result<f64> {
        let raw = lookup(key).ok_or_else(|| WalletError::EnvVarNotFound(key.to_string()))?;
        let value = raw.trim().parse::<f64>().map_err(|_| {
            WalletError::InvalidEnvVar(format!("{} must be a number", key))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(WalletError::InvalidEnvVar(format!(
                "{} must be a non-negative number",
                key
            )));
        }
        Ok(value)
    };

    let min = parse(min_key)?;
    let max = parse(max_key)?;
    if min > max {
        return Err(WalletError::InvalidEnvVar(format!(
            "{} must not exceed {}",
            min_key, max_key
        )));
    }
    Ok(AmountRange { min, max })
}

/// Manages the wallet, its provider and the execution of wrap/unwrap steps
pub struct WalletManager {
    pub provider: Arc<dyn Provider<Ethereum>>,
    pub config: Config,
    transaction_manager: TransactionManager,
    progress_manager: ProgressManager,
    execution_manager: ExecutionManager,
}

impl WalletManager {
    /// Connects to the configured RPC endpoint and creates a WalletManager
    ///
    /// # Arguments
    /// * `config` - Loaded configuration
    ///
    /// # Returns
    /// * `Result<Self>` - New WalletManager instance or error
    pub async fn connect(config: Config) -> Result<Self> {
        let signer = config.signer()?;
        let wallet = EthereumWallet::new(signer);

        let provider: Arc<dyn Provider<Ethereum>> = Arc::new(
            ProviderBuilder::new()
                .connect(&config.rpc_url)
                .await
                .map_err(|e| WalletError::ProviderError(format!("Failed to connect: {}", e)))?,
        );

        Ok(Self::new(provider, wallet, config))
    }

    /// Creates a WalletManager on top of an existing provider
    pub fn new(provider: Arc<dyn Provider<Ethereum>>, wallet: EthereumWallet, config: Config) -> Self {
        let transaction_manager =
            TransactionManager::new(provider.clone(), wallet, config.clone());
        let progress_manager = ProgressManager::new(config.clone());
        let execution_manager = ExecutionManager::new(config.clone());

        Self {
            provider,
            config,
            transaction_manager,
            progress_manager,
            execution_manager,
        }
    }

    /// Address of the signing wallet
    pub fn address(&self) -> Address {
        self.transaction_manager.address()
    }

    /// Executes a single wrap or unwrap step and prints its outcome
    pub async fn execute_step(&self, kind: TxKind, index: Option<usize>) -> Result<StepReport> {
        self.execution_manager
            .execute_step(kind, index, &self.transaction_manager, &self.progress_manager)
            .await
    }

    /// Runs `count` steps of one kind in this process with randomized delays
    pub async fn run_batch(&self, kind: TxKind, count: usize) -> Result<RunSummary> {
        self.execution_manager
            .run_batch(kind, count, &self.transaction_manager, &self.progress_manager)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("RPC_URL", "http://127.0.0.1:8545"),
            (
                "WALLET_PRIVATEKEY",
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            ),
            ("WETH_CA", "0x4200000000000000000000000000000000000006"),
            ("DEPOSIT_RANDOM_AMOUNT_MIN", "0.0001"),
            ("DEPOSIT_RANDOM_AMOUNT_MAX", "0.0005"),
            ("WITHDRAW_RANDOM_AMOUNT_MIN", "0.0001"),
            ("WITHDRAW_RANDOM_AMOUNT_MAX", "0.0003"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(config.min_delay, Duration::from_secs(30));
        assert_eq!(config.max_delay, Duration::from_secs(300));
        assert_eq!(config.sequential_pause, Duration::from_secs(60));
        assert_eq!(config.utc_offset_hours, 8);
        assert_eq!(config.explorer_tx_url, DEFAULT_EXPLORER_TX_URL);
        assert_eq!(config.default_count(TxKind::Withdraw), 1);
        assert_eq!(config.amount_range(TxKind::Withdraw).max, 0.0003);
    }

    #[test]
    fn signer_parses_and_debug_redacts() {
        let config = load(&base_env()).unwrap();
        let signer = config.signer().unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
        let debug = format!("{:?}", config);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("ac0974bec39a17e3"));
    }

    #[test]
    fn missing_required_var() {
        let mut env = base_env();
        env.remove("WETH_CA");
        assert!(matches!(load(&env), Err(WalletError::EnvVarNotFound(key)) if key == "WETH_CA"));
    }

    #[test]
    fn inverted_amount_bounds_rejected() {
        let mut env = base_env();
        env.insert("DEPOSIT_RANDOM_AMOUNT_MIN", "0.01");
        env.insert("DEPOSIT_RANDOM_AMOUNT_MAX", "0.001");
        assert!(matches!(load(&env), Err(WalletError::InvalidEnvVar(_))));
    }

    #[test]
    fn invalid_numbers_rejected() {
        let mut env = base_env();
        env.insert("GAS_LIMIT", "lots");
        assert!(matches!(load(&env), Err(WalletError::InvalidEnvVar(_))));

        let mut env = base_env();
        env.insert("MIN_DELAY_SECS", "400");
        assert!(matches!(load(&env), Err(WalletError::InvalidEnvVar(_))));
    }

    #[test]
    fn overrides_are_read() {
        let mut env = base_env();
        env.insert("GAS_LIMIT", "60000");
        env.insert("DEPOSIT_TX_COUNT", "7");
        env.insert("MIN_DELAY_SECS", "0");
        env.insert("MAX_DELAY_SECS", "0");
        env.insert("DISPLAY_UTC_OFFSET_HOURS", "-5");
        let config = load(&env).unwrap();
        assert_eq!(config.gas_limit, 60_000);
        assert_eq!(config.default_count(TxKind::Deposit), 7);
        assert_eq!(config.max_delay, Duration::ZERO);
        assert_eq!(config.utc_offset_hours, -5);
    }

    #[test]
    fn oversized_delays_rejected() {
        for key in ["MIN_DELAY_SECS", "MAX_DELAY_SECS", "SEQUENTIAL_PAUSE_SECS"] {
            let mut env = base_env();
            env.insert("MIN_DELAY_SECS", "0");
            env.insert(key, "18446744073709551615");
            assert!(
                matches!(load(&env), Err(WalletError::InvalidEnvVar(msg)) if msg.contains(key)),
                "{} accepted",
                key
            );
        }

        let mut env = base_env();
        env.insert("MAX_DELAY_SECS", "86400");
        env.insert("SEQUENTIAL_PAUSE_SECS", "86400");
        let config = load(&env).unwrap();
        assert_eq!(config.max_delay, Duration::from_secs(MAX_CONFIGURED_DELAY_SECS));
    }
}
