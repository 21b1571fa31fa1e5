use crate::amount::parse_amount;
use crate::contracts::{IERC20, ISwapRouter};
use crate::models::{
    ClassifiedTransaction, SwapDetails, TransactionKind, TransferDetails, lowercase_address,
};
use crate::optimistic::HistoryCache;
use crate::rpc::{ReceiptInfo, RpcClient};
use crate::tokens::{SupportedTokens, TokenConfig};
use alloy::sol_types::SolCall;
use alloy_primitives::aliases::{I24, U160};
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Substring the wallet provider puts in the error detail when the paymaster
/// refuses to sponsor a transaction.
const GAS_SPONSORSHIP_MARKER: &str = "gas sponsoring policies";

const SWAP_TICK_SPACING: i32 = 10;
const SWAP_DEADLINE: Duration = Duration::from_secs(10 * 60);

/// Failure reported by the wallet provider when sending a transaction.
#[derive(Debug, Error)]
#[error("{details}")]
pub struct SendTransactionError {
    pub details: String,
}

impl SendTransactionError {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("transaction blocked by gas sponsorship policy")]
    GasSponsorshipPolicyBlock,

    #[error("transaction failed: {0}")]
    TransactionFailed(String),
}

impl SubmitError {
    /// Stable identifier the UI maps to a localized message.
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::GasSponsorshipPolicyBlock => "GAS_SPONSORSHIP_POLICY_BLOCK",
            SubmitError::TransactionFailed(_) => "TRANSACTION_FAILED",
        }
    }

    fn from_send(err: SendTransactionError) -> Self {
        if err.details.contains(GAS_SPONSORSHIP_MARKER) {
            SubmitError::GasSponsorshipPolicyBlock
        } else {
            SubmitError::TransactionFailed(err.details)
        }
    }

    fn from_other(err: anyhow::Error) -> Self {
        SubmitError::TransactionFailed(format!("{err:#}"))
    }
}

/// The signed-in smart wallet. Key management and gas sponsorship live
/// behind this boundary.
#[async_trait]
pub trait WalletSession: Send + Sync {
    fn address(&self) -> Address;

    async fn send_transaction(&self, to: Address, data: Bytes)
    -> Result<B256, SendTransactionError>;
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn wait_for_transaction_receipt(&self, hash: B256) -> anyhow::Result<ReceiptInfo>;

    async fn block_timestamp(&self, block_number: u64) -> anyhow::Result<u64>;
}

#[async_trait]
impl ChainReader for RpcClient {
    async fn wait_for_transaction_receipt(&self, hash: B256) -> anyhow::Result<ReceiptInfo> {
        RpcClient::wait_for_transaction_receipt(self, hash).await
    }

    async fn block_timestamp(&self, block_number: u64) -> anyhow::Result<u64> {
        self.get_block_timestamp(block_number).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub hash: B256,
    pub block_hash: B256,
    pub block_number: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
    /// Quoted output, shown in the optimistic entry until the real amount is
    /// indexed. Falls back to `amount_out_minimum`.
    pub expected_amount_out: Option<U256>,
    pub sqrt_price_limit_x96: U160,
    /// Defaults to the wallet's own address.
    pub recipient: Option<Address>,
}

/// Sends transfers and swaps from the wallet and, once mined, shows them in
/// the account's cached history ahead of the indexers.
pub struct Submitter<W, C> {
    wallet: W,
    chain: C,
    tokens: SupportedTokens,
    swap_router: Option<Address>,
    cache: HistoryCache,
}

impl<W: WalletSession, C: ChainReader> Submitter<W, C> {
    pub fn new(
        wallet: W,
        chain: C,
        tokens: SupportedTokens,
        swap_router: Option<Address>,
        cache: HistoryCache,
    ) -> Self {
        Self {
            wallet,
            chain,
            tokens,
            swap_router,
            cache,
        }
    }

    pub fn account(&self) -> Address {
        self.wallet.address()
    }

    pub async fn transfer(
        &self,
        token: &TokenConfig,
        to: Address,
        amount: U256,
    ) -> Result<SubmittedTransaction, SubmitError> {
        let data = IERC20::transferCall { to, amount }.abi_encode();
        let hash = self.send(token.address, data.into()).await?;
        let submitted = self.confirm(hash).await?;

        let account = self.account();
        let record = ClassifiedTransaction {
            hash: format!("{:?}", submitted.hash),
            block_hash: format!("{:?}", submitted.block_hash),
            timestamp: submitted.timestamp,
            kind: TransactionKind::Outgoing(TransferDetails {
                from: lowercase_address(&account),
                to: lowercase_address(&to),
                value: amount.to_string(),
                token_symbol: token.symbol.clone(),
                token_decimals: token.decimals,
            }),
            is_optimistic: true,
        };
        self.cache.record_optimistic(&account, record);

        info!(
            "Sent {} {} to {} in {:?}",
            amount, token.symbol, to, submitted.hash
        );
        Ok(submitted)
    }

    /// Like [`transfer`](Self::transfer), for an amount as typed by the user.
    pub async fn transfer_input(
        &self,
        token: &TokenConfig,
        to: Address,
        input: &str,
    ) -> Result<SubmittedTransaction, SubmitError> {
        let amount = parse_amount(input, token.decimals).map_err(SubmitError::from_other)?;
        self.transfer(token, to, amount).await
    }

    /// Approves the router for `amount_in`, then swaps through it.
    pub async fn swap(&self, request: SwapRequest) -> Result<SubmittedTransaction, SubmitError> {
        let router = self.swap_router.ok_or_else(|| {
            SubmitError::TransactionFailed("swap router address not configured".to_string())
        })?;
        let account = self.account();

        let approve = IERC20::approveCall {
            spender: router,
            amount: request.amount_in,
        }
        .abi_encode();
        let approve_hash = self.send(request.token_in, approve.into()).await?;
        self.chain
            .wait_for_transaction_receipt(approve_hash)
            .await
            .map_err(SubmitError::from_other)?;
        info!("Router approval confirmed in {:?}", approve_hash);

        let tick_spacing = I24::try_from(SWAP_TICK_SPACING)
            .map_err(|e| SubmitError::TransactionFailed(e.to_string()))?;
        let deadline = chrono::Utc::now().timestamp().max(0) as u64 + SWAP_DEADLINE.as_secs();

        let swap = ISwapRouter::exactInputSingleCall {
            params: ISwapRouter::ExactInputSingleParams {
                tokenIn: request.token_in,
                tokenOut: request.token_out,
                tickSpacing: tick_spacing,
                recipient: request.recipient.unwrap_or(account),
                deadline: U256::from(deadline),
                amountIn: request.amount_in,
                amountOutMinimum: request.amount_out_minimum,
                sqrtPriceLimitX96: request.sqrt_price_limit_x96,
            },
        }
        .abi_encode();
        let hash = self.send(router, swap.into()).await?;
        let submitted = self.confirm(hash).await?;

        let decimals_of = |address: &Address| {
            self.tokens
                .by_contract(address)
                .map(|token| token.decimals)
                .unwrap_or(18)
        };
        let record = ClassifiedTransaction::swap(
            format!("{:?}", submitted.hash),
            format!("{:?}", submitted.block_hash),
            submitted.timestamp,
            SwapDetails {
                token_in: self.tokens.symbol_of(&request.token_in),
                token_out: self.tokens.symbol_of(&request.token_out),
                amount_in: request.amount_in.to_string(),
                amount_out: request
                    .expected_amount_out
                    .unwrap_or(request.amount_out_minimum)
                    .to_string(),
                token_in_decimals: decimals_of(&request.token_in),
                token_out_decimals: decimals_of(&request.token_out),
            },
        );
        self.cache.record_optimistic(&account, record);

        info!("Swap confirmed in {:?}", submitted.hash);
        Ok(submitted)
    }

    async fn send(&self, to: Address, data: Bytes) -> Result<B256, SubmitError> {
        self.wallet.send_transaction(to, data).await.map_err(|e| {
            let err = SubmitError::from_send(e);
            match &err {
                SubmitError::GasSponsorshipPolicyBlock => {
                    warn!("Transaction to {} blocked by gas sponsorship policy", to)
                }
                SubmitError::TransactionFailed(reason) => {
                    error!("Transaction to {} failed: {}", to, reason)
                }
            }
            err
        })
    }

    async fn confirm(&self, hash: B256) -> Result<SubmittedTransaction, SubmitError> {
        let receipt = self
            .chain
            .wait_for_transaction_receipt(hash)
            .await
            .map_err(SubmitError::from_other)?;
        let timestamp = self
            .chain
            .block_timestamp(receipt.block_number)
            .await
            .map_err(SubmitError::from_other)?;

        Ok(SubmittedTransaction {
            hash,
            block_hash: receipt.block_hash,
            block_number: receipt.block_number,
            timestamp,
        })
    }
}
