//! Build-time error taxonomy.
//!
//! Everything here is raised while *synthesizing* a fill transaction, never
//! while executing one. On-chain partial-failure handling is a runtime policy
//! (`revertIfIncomplete`) encoded into module calldata, so it has no variant
//! in this enum.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::order::OrderKind;

/// Errors raised while building a fill transaction.
#[derive(Debug, Error)]
pub enum BuildError {
    /// More than one order of a kind whose integration predates the modular
    /// router. These kinds can only be filled one at a time, directly.
    #[error("sweeping multiple {0} orders is not supported")]
    UnsupportedSweep(OrderKind),

    /// Fee entries were attached to a fill on a kind whose direct integration
    /// has nowhere to put them.
    #[error("fees are not supported when filling {0} orders")]
    FeesNotSupported(OrderKind),

    /// No branch of the assembler covers this kind for the requested
    /// operation.
    #[error("unsupported exchange kind: {0}")]
    UnsupportedKind(OrderKind),

    /// No module contract is registered for this kind on the configured
    /// chain.
    #[error("no module registered for {kind} orders on chain {chain_id}")]
    MissingModule { kind: OrderKind, chain_id: u64 },

    /// A detail's presentment currency differs from the requested settlement
    /// currency.
    #[error("currency mismatch: order is priced in {presented}, batch settles in {requested}")]
    CurrencyMismatch {
        presented: Address,
        requested: Address,
    },

    /// No viable exact-output single-hop route between the two assets.
    #[error("no single-hop route from {token_in} to {token_out} for exact output {amount_out}")]
    NoSwapRoute {
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    },

    /// An off-chain orderbook / co-signing service failed or returned
    /// malformed data.
    #[error("orderbook request failed: {0}")]
    Orderbook(String),

    /// An on-chain read (counter, nonce, decimals) failed.
    #[error("on-chain read failed: {0}")]
    ChainRead(String),

    /// A synthesized order or permit signature did not recover to its
    /// supposed signer.
    #[error("signature does not recover to {expected}")]
    BadSignature { expected: Address },

    /// The injected signer refused or failed to sign.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A price or fee computation overflowed 256 bits.
    #[error("payment amount computation overflowed")]
    Overflow,

    /// The caller passed an empty batch.
    #[error("cannot build a fill for an empty batch")]
    EmptyBatch,

    /// No contract registry exists for the configured chain.
    #[error("no contract registry for chain {0}")]
    UnsupportedChain(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_kind() {
        let err = BuildError::UnsupportedSweep(OrderKind::CryptoPunks);
        assert!(err.to_string().contains("cryptopunks"));

        let err = BuildError::FeesNotSupported(OrderKind::Blur);
        assert!(err.to_string().contains("blur"));
    }
}
