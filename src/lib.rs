pub mod error;
pub mod menu;
pub mod orchestrator;
pub mod sequence;
pub mod types;
pub mod utils;
pub mod wallet;

pub use error::{Result, WalletError};
pub use orchestrator::{Orchestrator, ProcessStepRunner, StepRunner};
pub use sequence::generate_sequence;
pub use types::{RunSummary, StepReport, TxKind, Verbosity};
pub use wallet::{Config, WalletManager};
