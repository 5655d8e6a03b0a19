//! Core data model for fill batches.
//!
//! Everything here is constructed fresh per build call and discarded once the
//! caller has the final transaction; there is no persistence layer.

use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use eyre::{eyre, Result};

use crate::order::{OrderKind, SignedOrder};

// ============================================
// EXECUTION ENTRIES
// ============================================

/// One call the aggregation contract will make: a module address, opaque
/// calldata, and the native value forwarded with it.
///
/// Ordering is significant. Earlier entries may produce outputs (wrapped
/// currency, escrowed assets) that later entries consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionInfo {
    pub module: Address,
    pub data: Bytes,
    pub value: U256,
}

/// A marketplace or referrer fee attached to a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fee {
    pub recipient: Address,
    pub amount: U256,
}

impl Fee {
    pub fn new(recipient: Address, amount: U256) -> Self {
        Self { recipient, amount }
    }

    /// Module contracts reject zero-recipient entries, and zero-amount
    /// entries are pure calldata waste, so both are dropped before encoding.
    pub fn is_chargeable(&self) -> bool {
        !self.amount.is_zero() && self.recipient != Address::ZERO
    }
}

// ============================================
// FILL DETAILS
// ============================================

/// Which token standard the asset lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Erc721,
    Erc1155,
}

/// One listing the caller wants to buy.
#[derive(Debug, Clone)]
pub struct ListingDetail {
    pub contract_kind: ContractKind,
    pub contract: Address,
    pub token_id: U256,
    /// Units to fill; only meaningful for partially fillable orders.
    /// Defaults to 1.
    pub amount: Option<U256>,
    /// Presentment currency of this listing; zero address is native ETH.
    pub currency: Address,
    /// Fees attached to this detail alone.
    pub fees: Vec<Fee>,
    pub order: SignedOrder,
}

impl ListingDetail {
    pub fn kind(&self) -> OrderKind {
        self.order.kind
    }

    pub fn fill_amount(&self) -> U256 {
        self.amount.unwrap_or_else(|| U256::from(1))
    }
}

/// One bid/offer the caller wants to accept (selling into it).
#[derive(Debug, Clone)]
pub struct BidDetail {
    pub contract_kind: ContractKind,
    pub contract: Address,
    pub token_id: U256,
    pub amount: Option<U256>,
    pub fees: Vec<Fee>,
    pub order: SignedOrder,
}

impl BidDetail {
    pub fn kind(&self) -> OrderKind {
        self.order.kind
    }

    pub fn fill_amount(&self) -> U256 {
        self.amount.unwrap_or_else(|| U256::from(1))
    }
}

// ============================================
// FILL OPTIONS
// ============================================

/// Caller policy for one build invocation. Explicit struct, validated once at
/// the boundary; nothing is read ambiently inside the build.
#[derive(Debug, Clone)]
pub struct FillOptions {
    /// Batch-wide fees, spread proportionally across protocol groups.
    pub global_fees: Vec<Fee>,

    /// `true` asks every module for best-effort semantics: fill what can be
    /// filled, refund the rest. `false` reverts the whole batch on any
    /// individual failure.
    pub partial: bool,

    /// Force the aggregator wrapper even when a uniform batch could fill
    /// directly on its own protocol.
    pub force_router: bool,

    /// Skip details whose calldata generation fails (only honored for kinds
    /// whose generation is itself fallible) instead of failing the build.
    pub skip_errors: bool,

    /// Explicit slack on top of a quoted swap input, in basis points. This is
    /// the only sanctioned overpayment; anything unspent is refunded.
    pub swap_slack_bps: u64,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            global_fees: Vec::new(),
            partial: false,
            force_router: false,
            skip_errors: false,
            swap_slack_bps: 50,
        }
    }
}

// ============================================
// BUILD OUTPUTS
// ============================================

/// A fill transaction ready for signing and submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl FillTransaction {
    /// Estimate gas for this transaction via the provider.
    pub async fn estimate_gas(&self, rpc_url: &str, from: Address) -> Result<u64> {
        let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?);

        let tx = TransactionRequest::default()
            .from(from)
            .to(self.to)
            .input(self.data.clone().into())
            .value(self.value);

        let gas = provider
            .estimate_gas(tx)
            .await
            .map_err(|e| eyre!("Gas estimation failed: {}", e))?;

        Ok(gas as u64)
    }

    /// Convert to a TransactionRequest for signing.
    pub fn to_transaction_request(
        &self,
        from: Address,
        nonce: u64,
        gas_limit: u64,
        gas_price: u128,
    ) -> TransactionRequest {
        TransactionRequest::default()
            .from(from)
            .to(self.to)
            .input(self.data.clone().into())
            .value(self.value)
            .nonce(nonce)
            .gas_limit(gas_limit)
            .max_fee_per_gas(gas_price)
            .max_priority_fee_per_gas(gas_price / 10)
    }
}

/// Result of building an aggregated batch fill.
#[derive(Debug, Clone)]
pub struct BatchFill {
    pub tx: FillTransaction,

    /// Parallel to the input details: `true` iff that detail landed in some
    /// emitted execution entry.
    pub success: Vec<bool>,

    /// Indices of details skipped under the skip-on-error policy, for the
    /// caller to retry or drop.
    pub errored: Vec<usize>,
}

/// Result of building a single bid fill.
#[derive(Debug, Clone)]
pub struct BidFill {
    pub tx: FillTransaction,

    /// `true` when the fill goes straight to the protocol with no router
    /// indirection.
    pub direct: bool,
}
