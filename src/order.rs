//! Order facade - the protocol-agnostic view of an already-built, signed
//! exchange order.
//!
//! Order construction, hashing and signature validation all happen upstream.
//! By the time an order reaches the router it is an opaque payload plus the
//! handful of numbers the aggregation logic needs: settlement price, fillable
//! quantity, maker and currency. Everything protocol-specific is behind the
//! `kind` tag.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use std::str::FromStr;

use crate::error::BuildError;

// ============================================
// ORDER KINDS
// ============================================

/// Every exchange protocol the router knows how to fill.
///
/// The enum is closed on purpose: adding a protocol forces every `match` in
/// the assembler and the group builders to be revisited at compile time.
/// ZeroExV4 splits by asset standard because the two encodings (and their
/// rounding rules) differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    Seaport,
    LooksRare,
    X2Y2,
    ZeroExV4Erc721,
    ZeroExV4Erc1155,
    Zora,
    Rarible,
    Sudoswap,
    Foundation,
    CryptoPunks,
    Forward,
    Universe,
    Element,
    Blur,
    Manifold,
    Infinity,
    Nftx,
}

impl OrderKind {
    pub const ALL: [OrderKind; 17] = [
        OrderKind::Seaport,
        OrderKind::LooksRare,
        OrderKind::X2Y2,
        OrderKind::ZeroExV4Erc721,
        OrderKind::ZeroExV4Erc1155,
        OrderKind::Zora,
        OrderKind::Rarible,
        OrderKind::Sudoswap,
        OrderKind::Foundation,
        OrderKind::CryptoPunks,
        OrderKind::Forward,
        OrderKind::Universe,
        OrderKind::Element,
        OrderKind::Blur,
        OrderKind::Manifold,
        OrderKind::Infinity,
        OrderKind::Nftx,
    ];

    /// Whether this kind can be routed through an aggregation module at all.
    ///
    /// The four direct-only kinds predate the modular router: at most one
    /// order per transaction, no fee entries.
    pub fn is_aggregatable(&self) -> bool {
        !matches!(
            self,
            OrderKind::CryptoPunks | OrderKind::Manifold | OrderKind::Infinity | OrderKind::Blur
        )
    }

    /// The one kind whose native exchange both batches multiple orders and
    /// carries per-fill fee entries. A uniform batch of this kind skips the
    /// router entirely, since the wrapper would add gas for nothing.
    pub fn is_natively_batchable(&self) -> bool {
        matches!(self, OrderKind::Seaport)
    }

    /// Kinds whose per-order calldata generation can itself fail at build
    /// time (external co-signing, custody release). Only these honor the
    /// skip-on-error policy; for everything else generation is infallible and
    /// a failure means the whole build is wrong.
    pub fn has_fallible_generation(&self) -> bool {
        matches!(
            self,
            OrderKind::X2Y2 | OrderKind::ZeroExV4Erc721 | OrderKind::ZeroExV4Erc1155
        )
    }

    /// Bids on these kinds fill directly on the protocol with no router
    /// indirection.
    pub fn fills_bid_directly(&self) -> bool {
        matches!(self, OrderKind::CryptoPunks | OrderKind::Blur)
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderKind::Seaport => "seaport",
            OrderKind::LooksRare => "looks-rare",
            OrderKind::X2Y2 => "x2y2",
            OrderKind::ZeroExV4Erc721 => "zeroex-v4-erc721",
            OrderKind::ZeroExV4Erc1155 => "zeroex-v4-erc1155",
            OrderKind::Zora => "zora",
            OrderKind::Rarible => "rarible",
            OrderKind::Sudoswap => "sudoswap",
            OrderKind::Foundation => "foundation",
            OrderKind::CryptoPunks => "cryptopunks",
            OrderKind::Forward => "forward",
            OrderKind::Universe => "universe",
            OrderKind::Element => "element",
            OrderKind::Blur => "blur",
            OrderKind::Manifold => "manifold",
            OrderKind::Infinity => "infinity",
            OrderKind::Nftx => "nftx",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderKind::ALL
            .iter()
            .copied()
            .find(|k| k.to_string() == s.to_lowercase())
            .ok_or_else(|| format!("unknown order kind: {}", s))
    }
}

// ============================================
// ORDER FLAGS
// ============================================

/// Per-order oddities that do not fit the common facade surface.
#[derive(Debug, Clone, Default)]
pub struct OrderFlags {
    /// ZeroExV4 orders held by an off-chain custodian must be released
    /// through the custody API before they become fillable on-chain.
    pub cb_custodied: bool,

    /// ZeroExV4 charges its order fees on top of the stated price rather
    /// than embedding them in it, so the payable amount is price + this.
    pub additive_fee: U256,
}

// ============================================
// SIGNED ORDER
// ============================================

/// An already-built, already-signed exchange order in its protocol-native
/// encoding, plus the fields the aggregation logic reads polymorphically.
#[derive(Debug, Clone)]
pub struct SignedOrder {
    pub kind: OrderKind,
    pub maker: Address,
    /// Settlement currency; the zero address is native ETH.
    pub currency: Address,
    /// Settlement price for filling the entire order.
    pub price: U256,
    /// Total fillable quantity. 1 for anything that is not partially
    /// fillable.
    pub quantity: U256,
    /// The protocol's own ABI encoding of the order, signature included.
    pub raw: Bytes,
    pub flags: OrderFlags,
}

impl SignedOrder {
    pub fn new(
        kind: OrderKind,
        maker: Address,
        currency: Address,
        price: U256,
        quantity: U256,
        raw: Bytes,
    ) -> Self {
        Self {
            kind,
            maker,
            currency,
            price,
            quantity,
            raw,
            flags: OrderFlags::default(),
        }
    }

    pub fn settlement_price(&self) -> U256 {
        self.price
    }

    pub fn fillable_amount(&self) -> U256 {
        self.quantity
    }

    pub fn raw_encoded(&self) -> Bytes {
        self.raw.clone()
    }

    /// Hash identifying this order towards off-chain services.
    pub fn order_hash(&self) -> B256 {
        keccak256(&self.raw)
    }

    /// Settlement price for filling `fill` units out of `quantity`.
    ///
    /// Floor division everywhere except ZeroExV4 ERC1155, where the per-unit
    /// price rounds up: paying a wei too much beats an on-chain revert for
    /// underpayment.
    pub fn price_for_fill(&self, fill: U256) -> Result<U256, BuildError> {
        if self.quantity <= U256::from(1) || fill >= self.quantity {
            return Ok(self.price);
        }
        match self.kind {
            OrderKind::ZeroExV4Erc1155 => {
                let unit = ceil_div(self.price, self.quantity).ok_or(BuildError::Overflow)?;
                unit.checked_mul(fill).ok_or(BuildError::Overflow)
            }
            _ => mul_div_floor(self.price, fill, self.quantity).ok_or(BuildError::Overflow),
        }
    }

    /// A zero-consideration counter order from `taker`, used by protocols
    /// whose fill entry point takes both sides of the match.
    pub fn build_matching_counter_order(&self, taker: Address) -> Bytes {
        (taker, self.maker, self.price, self.order_hash())
            .abi_encode()
            .into()
    }
}

// ============================================
// INTEGER HELPERS
// ============================================

pub(crate) fn mul_div_floor(a: U256, b: U256, d: U256) -> Option<U256> {
    if d.is_zero() {
        return None;
    }
    a.checked_mul(b).map(|x| x / d)
}

pub(crate) fn ceil_div(a: U256, d: U256) -> Option<U256> {
    if d.is_zero() {
        return None;
    }
    a.checked_add(d - U256::from(1)).map(|x| x / d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(kind: OrderKind, price: u64, quantity: u64) -> SignedOrder {
        SignedOrder::new(
            kind,
            Address::repeat_byte(0x11),
            Address::ZERO,
            U256::from(price),
            U256::from(quantity),
            Bytes::from(vec![0xaa, 0xbb]),
        )
    }

    #[test]
    fn test_full_fill_pays_full_price() {
        let o = order(OrderKind::Seaport, 1000, 1);
        assert_eq!(o.price_for_fill(U256::from(1)).unwrap(), U256::from(1000));
    }

    #[test]
    fn test_partial_fill_floors() {
        // 1000 wei over 3 units, fill 1 => floor(1000/3) = 333
        let o = order(OrderKind::Seaport, 1000, 3);
        assert_eq!(o.price_for_fill(U256::from(1)).unwrap(), U256::from(333));
    }

    #[test]
    fn test_erc1155_unit_price_rounds_up() {
        // 1000 wei over 3 units => unit price ceil(1000/3) = 334, fill 2 => 668
        let o = order(OrderKind::ZeroExV4Erc1155, 1000, 3);
        assert_eq!(o.price_for_fill(U256::from(2)).unwrap(), U256::from(668));
    }

    #[test]
    fn test_overfill_clamps_to_full_price() {
        let o = order(OrderKind::Seaport, 1000, 3);
        assert_eq!(o.price_for_fill(U256::from(5)).unwrap(), U256::from(1000));
    }

    #[test]
    fn test_kind_roundtrips_through_strings() {
        for kind in OrderKind::ALL {
            let parsed: OrderKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("opensea".parse::<OrderKind>().is_err());
    }

    #[test]
    fn test_direct_only_kinds() {
        assert!(!OrderKind::CryptoPunks.is_aggregatable());
        assert!(!OrderKind::Blur.is_aggregatable());
        assert!(OrderKind::Seaport.is_aggregatable());
        assert!(OrderKind::Seaport.is_natively_batchable());
        assert!(!OrderKind::LooksRare.is_natively_batchable());
    }
}
