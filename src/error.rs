use alloy::primitives::TxHash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid environment variable value: {0}")]
    InvalidEnvVar(String),

    #[error("Transaction error: {0}")]
    TransactionError(String, Option<TxHash>),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Invalid transaction count: {0}")]
    InvalidCount(String),

    #[error("Step report error: {0}")]
    ReportError(String),

    #[error("Orchestration error: {0}")]
    OrchestrationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WalletError>;
