//! Approval avoidance.
//!
//! Filling a bid means the asset leaves the taker, and the taker has not
//! granted the router any operator approval. Two ways to move the asset
//! without one:
//!
//! (a) a matched pair of orders on a protocol with atomic order matching -
//!     a real order offering the asset with the router module as sole
//!     consideration recipient, plus a zero-offer mirror order from the
//!     receiver, submitted together through `matchOrders`;
//! (b) a signed batch allowance (permit-style): a one-time, time-boxed
//!     transfer set attached as the first execution entry ahead of the
//!     real fills.
//!
//! Both need a fresh counter/nonce read before construction, and both are
//! verified (signature recovers to the owner) before being trusted.

use alloy_primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, SolCall, SolValue};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::addresses::AddressBook;
use crate::error::BuildError;
use crate::onchain::ChainReader;
use crate::router::calldata::{BatchPermit, IPermitModule, ISeaportExchange, TransferItem};
use crate::types::{ContractKind, ExecutionInfo};

// ============================================
// SOLIDITY TYPES
// ============================================

sol! {
    /// Compact escrow order shape used for digesting and matching. The
    /// real order offers the asset and names the receiver as its sole
    /// consideration recipient; the mirror offers nothing.
    #[derive(Debug)]
    struct EscrowOrder {
        address offerer;
        address token;
        uint256 identifier;
        uint256 amount;
        address recipient;
        uint256 counter;
    }
}

/// How long a synthesized permit stays valid.
const PERMIT_TTL_SECS: u64 = 10 * 60;

// ============================================
// ORDER SIGNER
// ============================================

/// Signs digests of synthesized escrow orders and permits on behalf of the
/// asset owner.
#[async_trait]
pub trait OrderSigner: Send + Sync {
    fn signer_address(&self) -> Address;
    async fn sign_digest(&self, digest: B256) -> Result<Signature, BuildError>;
}

#[async_trait]
impl OrderSigner for PrivateKeySigner {
    fn signer_address(&self) -> Address {
        Signer::address(self)
    }

    async fn sign_digest(&self, digest: B256) -> Result<Signature, BuildError> {
        self.sign_hash(&digest)
            .await
            .map_err(|e| BuildError::Signing(e.to_string()))
    }
}

// ============================================
// ESCROW TOKENS
// ============================================

/// One asset to move into custody.
#[derive(Debug, Clone)]
pub struct EscrowToken {
    pub contract: Address,
    pub token_id: U256,
    pub amount: U256,
    pub kind: ContractKind,
    /// Where the asset lands (the module that will consume it).
    pub recipient: Address,
}

/// Which synthesis strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowStrategy {
    MatchedPair,
    Permit,
}

// ============================================
// STRATEGY (a): MATCHED ORDER PAIR
// ============================================

/// Synthesize a `matchOrders` execution entry that moves every token from
/// `giver` into its recipient's custody with no standing approval.
pub async fn synthesize_matched_pair(
    chain: &dyn ChainReader,
    signer: &dyn OrderSigner,
    giver: Address,
    tokens: &[EscrowToken],
    book: &AddressBook,
) -> Result<ExecutionInfo, BuildError> {
    if tokens.is_empty() {
        return Err(BuildError::EmptyBatch);
    }

    let counter = chain.seaport_counter(giver).await?;

    let real_orders: Vec<EscrowOrder> = tokens
        .iter()
        .map(|t| EscrowOrder {
            offerer: giver,
            token: t.contract,
            identifier: t.token_id,
            amount: t.amount,
            recipient: t.recipient,
            counter,
        })
        .collect();

    // Sign every real order's digest; independent orders sign concurrently.
    let signatures = try_join_all(
        real_orders
            .iter()
            .map(|order| signer.sign_digest(escrow_digest(order))),
    )
    .await?;

    let mut encoded_orders: Vec<Bytes> = Vec::with_capacity(tokens.len() * 2);
    for (order, signature) in real_orders.iter().zip(&signatures) {
        verify_recovers_to(signature, escrow_digest(order), giver)?;

        let mirror = EscrowOrder {
            offerer: order.recipient,
            token: order.token,
            identifier: order.identifier,
            amount: U256::ZERO,
            recipient: order.recipient,
            counter: U256::ZERO,
        };

        encoded_orders.push(encode_signed(order, Some(signature)));
        encoded_orders.push(encode_signed(&mirror, None));
    }

    // Pair up consecutive (real, mirror) orders.
    let fulfillments: Vec<(U256, U256)> = (0..tokens.len())
        .map(|i| (U256::from(2 * i), U256::from(2 * i + 1)))
        .collect();

    debug!(
        "synthesized matched pair for {} token(s) from {}",
        tokens.len(),
        giver
    );

    let data = ISeaportExchange::matchOrdersCall {
        orders: encoded_orders,
        fulfillments: Bytes::from(fulfillments.abi_encode()),
    }
    .abi_encode();

    Ok(ExecutionInfo {
        module: book.seaport_exchange,
        data: Bytes::from(data),
        value: U256::ZERO,
    })
}

fn escrow_digest(order: &EscrowOrder) -> B256 {
    keccak256(order.abi_encode())
}

fn encode_signed(order: &EscrowOrder, signature: Option<&Signature>) -> Bytes {
    let sig_bytes = signature
        .map(|s| Bytes::from(s.as_bytes().to_vec()))
        .unwrap_or_default();
    (order.clone(), sig_bytes).abi_encode().into()
}

// ============================================
// STRATEGY (b): SIGNED BATCH PERMIT
// ============================================

/// Synthesize a one-time transfer permit covering every token, to run as the
/// first execution entry ahead of the fills that consume the assets.
pub async fn synthesize_permit(
    chain: &dyn ChainReader,
    signer: &dyn OrderSigner,
    giver: Address,
    tokens: &[EscrowToken],
    book: &AddressBook,
) -> Result<ExecutionInfo, BuildError> {
    if tokens.is_empty() {
        return Err(BuildError::EmptyBatch);
    }

    let nonce = chain.permit_nonce(giver).await?;

    let deadline = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() + PERMIT_TTL_SECS)
        .unwrap_or(PERMIT_TTL_SECS);

    let items: Vec<TransferItem> = tokens
        .iter()
        .map(|t| TransferItem {
            token: t.contract,
            tokenId: t.token_id,
            amount: t.amount,
            recipient: t.recipient,
        })
        .collect();

    let permit = BatchPermit {
        giver,
        nonce,
        deadline: U256::from(deadline),
        items,
    };

    let digest = keccak256(permit.abi_encode());
    let signature = signer.sign_digest(digest).await?;
    verify_recovers_to(&signature, digest, giver)?;

    debug!(
        "synthesized transfer permit for {} token(s), nonce {}, deadline {}",
        tokens.len(),
        nonce,
        deadline
    );

    let data = IPermitModule::transferWithPermitCall {
        permit,
        signature: Bytes::from(signature.as_bytes().to_vec()),
    }
    .abi_encode();

    Ok(ExecutionInfo {
        module: book.permit_module,
        data: Bytes::from(data),
        value: U256::ZERO,
    })
}

fn verify_recovers_to(
    signature: &Signature,
    digest: B256,
    expected: Address,
) -> Result<(), BuildError> {
    let recovered = signature
        .recover_address_from_prehash(&digest)
        .map_err(|_| BuildError::BadSignature { expected })?;

    if recovered != expected {
        return Err(BuildError::BadSignature { expected });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    struct StubChain;

    #[async_trait]
    impl ChainReader for StubChain {
        async fn seaport_counter(&self, _maker: Address) -> Result<U256, BuildError> {
            Ok(U256::from(3))
        }
        async fn zeroex_nonce(&self, _maker: Address) -> Result<U256, BuildError> {
            Ok(U256::ZERO)
        }
        async fn permit_nonce(&self, _owner: Address) -> Result<U256, BuildError> {
            Ok(U256::from(9))
        }
        async fn token_decimals(&self, _token: Address) -> Result<u8, BuildError> {
            Ok(18)
        }
    }

    fn token(recipient: Address) -> EscrowToken {
        EscrowToken {
            contract: Address::repeat_byte(0x33),
            token_id: U256::from(7),
            amount: U256::from(1),
            kind: ContractKind::Erc721,
            recipient,
        }
    }

    #[tokio::test]
    async fn test_permit_roundtrips_and_recovers() {
        let book = AddressBook::mainnet();
        let signer = PrivateKeySigner::random();
        let giver = signer.signer_address();

        let entry = synthesize_permit(&StubChain, &signer, giver, &[token(book.seaport_module)], &book)
            .await
            .unwrap();

        assert_eq!(entry.module, book.permit_module);
        assert_eq!(entry.value, U256::ZERO);

        let call = IPermitModule::transferWithPermitCall::abi_decode(&entry.data).unwrap();
        assert_eq!(call.permit.giver, giver);
        assert_eq!(call.permit.nonce, U256::from(9));
        assert_eq!(call.permit.items.len(), 1);
        assert_eq!(call.permit.items[0].recipient, book.seaport_module);

        // The embedded signature must recover to the giver.
        let digest = keccak256(call.permit.abi_encode());
        let sig = Signature::try_from(call.signature.as_ref()).unwrap();
        assert_eq!(sig.recover_address_from_prehash(&digest).unwrap(), giver);
    }

    #[tokio::test]
    async fn test_foreign_signer_is_rejected() {
        let book = AddressBook::mainnet();
        let signer = PrivateKeySigner::random();
        let not_the_giver = Address::repeat_byte(0x99);

        let err = synthesize_permit(&StubChain, &signer, not_the_giver, &[token(book.seaport_module)], &book)
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::BadSignature { .. }));
    }

    #[tokio::test]
    async fn test_matched_pair_shape() {
        let book = AddressBook::mainnet();
        let signer = PrivateKeySigner::random();
        let giver = signer.signer_address();

        let tokens = [token(book.seaport_module), token(book.looksrare_module)];
        let entry = synthesize_matched_pair(&StubChain, &signer, giver, &tokens, &book)
            .await
            .unwrap();

        assert_eq!(entry.module, book.seaport_exchange);

        let call = ISeaportExchange::matchOrdersCall::abi_decode(&entry.data).unwrap();
        // One real + one mirror order per token.
        assert_eq!(call.orders.len(), 4);

        // Real orders carry the fresh counter and a signature; mirrors are
        // zero-offer and unsigned.
        let (real, real_sig) = <(EscrowOrder, Bytes)>::abi_decode(&call.orders[0]).unwrap();
        assert_eq!(real.offerer, giver);
        assert_eq!(real.counter, U256::from(3));
        assert_eq!(real_sig.len(), 65);

        let (mirror, mirror_sig) = <(EscrowOrder, Bytes)>::abi_decode(&call.orders[1]).unwrap();
        assert_eq!(mirror.amount, U256::ZERO);
        assert_eq!(mirror.offerer, book.seaport_module);
        assert!(mirror_sig.is_empty());
    }

    #[tokio::test]
    async fn test_empty_token_set_is_rejected() {
        let book = AddressBook::mainnet();
        let signer = PrivateKeySigner::random();
        let err = synthesize_permit(&StubChain, &signer, signer.signer_address(), &[], &book)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptyBatch));
    }
}
