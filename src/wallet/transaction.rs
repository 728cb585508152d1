use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{utils::format_units, Address, Bytes, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, WalletError},
    types::TxKind,
};

use super::Config;

sol! {
    interface IWETH9 {
        function balanceOf(address owner) external view returns (uint256 balance);
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}

/// What a landed transaction cost and where it landed
#[derive(Debug, Clone)]
pub struct LandedTransaction {
    pub hash: TxHash,
    pub block_number: u64,
    /// Block timestamp in seconds, when the block could be fetched
    pub timestamp: Option<u64>,
    /// gas_used * effective_gas_price, in wei
    pub fee: U256,
}

/// Manages transaction building and sending against the WETH contract
pub struct TransactionManager {
    provider: Arc<dyn Provider<Ethereum>>,
    wallet: EthereumWallet,
    config: Config,
}

impl TransactionManager {
    /// Creates a new TransactionManager
    pub fn new(provider: Arc<dyn Provider<Ethereum>>, wallet: EthereumWallet, config: Config) -> Self {
        Self {
            provider,
            wallet,
            config,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.default_signer().address()
    }

    /// Gets the native balance of the wallet
    pub async fn get_eth_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.address())
            .await
            .map_err(|e| WalletError::ProviderError(format!("Failed to get ETH balance: {}", e)))
    }

    /// Gets the WETH balance of the wallet through an `eth_call` to `balanceOf`
    pub async fn get_weth_balance(&self) -> Result<U256> {
        let call = IWETH9::balanceOfCall {
            owner: self.address(),
        };
        let request = TransactionRequest::default()
            .with_to(self.config.weth_address)
            .with_input(call.abi_encode());

        let output = self
            .provider
            .call(request)
            .await
            .map_err(|e| WalletError::ProviderError(format!("Failed to call balanceOf: {}", e)))?;

        IWETH9::balanceOfCall::abi_decode_returns(&output, true)
            .map(|ret| ret.balance)
            .map_err(|e| {
                WalletError::ProviderError(format!("Failed to decode balanceOf result: {}", e))
            })
    }

    /// Builds a transaction request for a wrap or unwrap of `amount` wei
    pub async fn build_transaction(&self, kind: TxKind, amount: U256) -> Result<TransactionRequest> {
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| WalletError::ProviderError(format!("Failed to get gas price: {}", e)))?;

        let nonce = self
            .provider
            .get_transaction_count(self.address())
            .await
            .map_err(|e| WalletError::ProviderError(format!("Failed to get nonce: {}", e)))?;

        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| WalletError::ProviderError(format!("Failed to get chain ID: {}", e)))?;

        let (value, input): (U256, Bytes) = match kind {
            TxKind::Deposit => (amount, IWETH9::depositCall {}.abi_encode().into()),
            TxKind::Withdraw => (U256::ZERO, IWETH9::withdrawCall { wad: amount }.abi_encode().into()),
        };

        self.ensure_affordable(value, gas_price).await?;

        Ok(TransactionRequest::default()
            .with_from(self.address())
            .with_to(self.config.weth_address)
            .with_value(value)
            .with_input(input)
            .with_gas_limit(self.config.gas_limit)
            .with_gas_price(gas_price)
            .with_nonce(nonce)
            .with_chain_id(chain_id))
    }

    /// Fails early when the native balance cannot cover value plus the worst-case gas cost
    async fn ensure_affordable(&self, value: U256, gas_price: u128) -> Result<()> {
        let balance = self.get_eth_balance().await?;
        let max_gas_cost = U256::from(gas_price) * U256::from(self.config.gas_limit);
        let required = value + max_gas_cost;

        if balance < required {
            warn!(
                balance = %format_units(balance, "ether").unwrap_or_default(),
                required = %format_units(required, "ether").unwrap_or_default(),
                wallet = %self.address(),
                "Insufficient balance"
            );
            return Err(WalletError::InsufficientBalance(format!(
                "{} < {} for wallet: {}",
                balance,
                required,
                self.address()
            )));
        }
        Ok(())
    }

    /// Signs, sends and waits for a transaction, without retry logic
    pub async fn send_transaction(&self, tx: TransactionRequest) -> Result<LandedTransaction> {
        let tx_envelope = tx.clone().build(&self.wallet).await.map_err(|e| {
            WalletError::TransactionError(format!("Failed to build transaction: {}", e), None)
        })?;
        let hash = *tx_envelope.tx_hash();

        debug!(
            value = %format_units(tx.value.unwrap_or_default(), "ether").unwrap_or_default(),
            gas_price = ?tx.gas_price,
            gas_limit = ?tx.gas,
            %hash,
            "Sending transaction"
        );

        let start = tokio::time::Instant::now();
        let receipt = self
            .provider
            .send_tx_envelope(tx_envelope)
            .await
            .map_err(|e| classify_send_error(e.to_string(), hash))?
            .get_receipt()
            .await
            .map_err(|e| {
                WalletError::TransactionError(
                    format!("Failed to get transaction receipt: {}", e),
                    Some(hash),
                )
            })?;

        if !receipt.status() {
            return Err(WalletError::TransactionError(
                "Transaction reverted".to_string(),
                Some(receipt.transaction_hash),
            ));
        }

        let block_number = receipt.block_number.ok_or_else(|| {
            WalletError::TransactionError(
                "Receipt is missing a block number".to_string(),
                Some(receipt.transaction_hash),
            )
        })?;
        let fee = U256::from(receipt.gas_used) * U256::from(receipt.effective_gas_price);
        let timestamp = self.get_block_timestamp(block_number).await;

        self.log_transaction_success(receipt.transaction_hash, start.elapsed(), fee);

        Ok(LandedTransaction {
            hash: receipt.transaction_hash,
            block_number,
            timestamp,
            fee,
        })
    }

    /// Looks up the timestamp of a block; a failed lookup only degrades the printed output
    async fn get_block_timestamp(&self, block_number: u64) -> Option<u64> {
        match self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number))
            .await
        {
            Ok(Some(block)) => Some(block.header.timestamp),
            Ok(None) => None,
            Err(e) => {
                warn!(block_number, error = %e, "Failed to fetch block");
                None
            }
        }
    }

    fn log_transaction_success(&self, hash: TxHash, duration: Duration, fee: U256) {
        info!(
            %hash,
            elapsed = ?duration,
            fee = %format_units(fee, "ether").unwrap_or_default(),
            "Transaction landed"
        );
    }

    /// Builds and sends a wrap or unwrap of `amount` wei
    pub async fn build_and_send(&self, kind: TxKind, amount: U256) -> Result<LandedTransaction> {
        let tx = self.build_transaction(kind, amount).await?;
        self.send_transaction(tx).await
    }
}

/// Maps a node rejection to the error taxonomy; out-of-funds errors are reported as such
fn classify_send_error(message: String, hash: TxHash) -> WalletError {
    if message.to_lowercase().contains("insufficient funds") {
        WalletError::InsufficientBalance(message)
    } else {
        WalletError::TransactionError(format!("Failed to send transaction: {}", message), Some(hash))
    }
}
