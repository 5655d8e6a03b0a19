//! Contract address book.
//!
//! Per-chain registry of the aggregation router, the per-protocol modules it
//! dispatches to, and the few exchanges that are filled directly. Only
//! mainnet is wired in; other chains come in through config overrides.

use alloy_primitives::{address, Address};

use crate::order::OrderKind;

/// Native currency sentinel. ETH is "the zero address" throughout.
pub const NATIVE_ETH: Address = Address::ZERO;

/// Wrapped ether (mainnet).
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

// ============================================
// DIRECTLY-FILLED EXCHANGES (Ethereum Mainnet)
// ============================================

/// Seaport 1.5
const SEAPORT_EXCHANGE: Address = address!("00000000000000adc04c56bf30ac9d3c0aaf14dc");

/// The original CryptoPunks market
const CRYPTOPUNKS_MARKET: Address = address!("b47e3cd837ddf8e4c57f05d70ab865de6e193bbb");

/// Blur exchange
const BLUR_EXCHANGE: Address = address!("000000000000ad05ccc4f10045630fb830b95127");

/// Manifold marketplace
const MANIFOLD_MARKET: Address = address!("3a3548e060be10c2614d0a4cb0c03cc9093fd799");

/// Infinity exchange
const INFINITY_EXCHANGE: Address = address!("bada5551b2f08d3959329b2ff8d0a7cc8be26324");

// ============================================
// ROUTER + MODULES (Ethereum Mainnet)
// ============================================

const ROUTER: Address = address!("178a86d36d89c7fdebea90b739605da7b131ff6a");
const SEAPORT_MODULE: Address = address!("20794ef7693441799a3f38fcc22a12b3e04b9572");
const LOOKSRARE_MODULE: Address = address!("385df8cbc196f5f780367f3cdc96af072a916f7e");
const X2Y2_MODULE: Address = address!("613d3c588f6b8f89302b463f8f19f7241b2857e2");
const ZEROEX_V4_MODULE: Address = address!("8162beec776442afd262b672730bb5d0d8af16a1");
const ELEMENT_MODULE: Address = address!("ef82b43719dd13ba33ef7d93e6f0d1f690eea5b2");
const RARIBLE_MODULE: Address = address!("a29d7914cd525dea9afad0dceec6f49404476486");
const UNIVERSE_MODULE: Address = address!("709a3c94c24a14274aa12d9384b2e5fcc66d3513");
const ZORA_MODULE: Address = address!("982b49de82a3ea5b8c42895482d9dd9bfefadf82");
const FOUNDATION_MODULE: Address = address!("5c8a351d4ff680203e05af56cb9d748898c7b39a");
const SUDOSWAP_MODULE: Address = address!("79abbfb55a6eb495da36f2da05b4ef6de229cbb2");
const NFTX_MODULE: Address = address!("27fbedb0997eed5be6a27ea28a587898354d4e04");
const FORWARD_MODULE: Address = address!("5c603b2ca47dfbeee47f77de18b87b4ffbecb3c5");
const SWAP_MODULE: Address = address!("c624f56cd13bc747a2dd7daffd1e2161029a1385");
const PERMIT_MODULE: Address = address!("482e4d362c8a2ea19e07b7234a14084a7d740b42");

/// Everything the assembler needs to address one chain.
#[derive(Debug, Clone)]
pub struct AddressBook {
    pub chain_id: u64,
    pub router: Address,
    pub weth: Address,

    // Modules behind the router
    pub seaport_module: Address,
    pub looksrare_module: Address,
    pub x2y2_module: Address,
    pub zeroex_v4_module: Address,
    pub element_module: Address,
    pub rarible_module: Address,
    pub universe_module: Address,
    pub zora_module: Address,
    pub foundation_module: Address,
    pub sudoswap_module: Address,
    pub nftx_module: Address,
    pub forward_module: Address,
    pub swap_module: Address,
    pub permit_module: Address,

    // Exchanges filled without router indirection
    pub seaport_exchange: Address,
    pub cryptopunks_market: Address,
    pub blur_exchange: Address,
    pub manifold_market: Address,
    pub infinity_exchange: Address,
}

impl AddressBook {
    pub fn mainnet() -> Self {
        Self {
            chain_id: 1,
            router: ROUTER,
            weth: WETH,
            seaport_module: SEAPORT_MODULE,
            looksrare_module: LOOKSRARE_MODULE,
            x2y2_module: X2Y2_MODULE,
            zeroex_v4_module: ZEROEX_V4_MODULE,
            element_module: ELEMENT_MODULE,
            rarible_module: RARIBLE_MODULE,
            universe_module: UNIVERSE_MODULE,
            zora_module: ZORA_MODULE,
            foundation_module: FOUNDATION_MODULE,
            sudoswap_module: SUDOSWAP_MODULE,
            nftx_module: NFTX_MODULE,
            forward_module: FORWARD_MODULE,
            swap_module: SWAP_MODULE,
            permit_module: PERMIT_MODULE,
            seaport_exchange: SEAPORT_EXCHANGE,
            cryptopunks_market: CRYPTOPUNKS_MARKET,
            blur_exchange: BLUR_EXCHANGE,
            manifold_market: MANIFOLD_MARKET,
            infinity_exchange: INFINITY_EXCHANGE,
        }
    }

    pub fn for_chain(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Self::mainnet()),
            _ => None,
        }
    }

    /// The router module handling listings/bids of this kind, if the kind is
    /// aggregatable at all.
    pub fn module_for(&self, kind: OrderKind) -> Option<Address> {
        match kind {
            OrderKind::Seaport => Some(self.seaport_module),
            OrderKind::LooksRare => Some(self.looksrare_module),
            OrderKind::X2Y2 => Some(self.x2y2_module),
            OrderKind::ZeroExV4Erc721 | OrderKind::ZeroExV4Erc1155 => Some(self.zeroex_v4_module),
            OrderKind::Element => Some(self.element_module),
            OrderKind::Rarible => Some(self.rarible_module),
            OrderKind::Universe => Some(self.universe_module),
            OrderKind::Zora => Some(self.zora_module),
            OrderKind::Foundation => Some(self.foundation_module),
            OrderKind::Sudoswap => Some(self.sudoswap_module),
            OrderKind::Nftx => Some(self.nftx_module),
            OrderKind::Forward => Some(self.forward_module),
            OrderKind::CryptoPunks
            | OrderKind::Blur
            | OrderKind::Manifold
            | OrderKind::Infinity => None,
        }
    }

    /// The protocol's own exchange contract, for kinds filled directly.
    pub fn exchange_for(&self, kind: OrderKind) -> Option<Address> {
        match kind {
            OrderKind::Seaport => Some(self.seaport_exchange),
            OrderKind::CryptoPunks => Some(self.cryptopunks_market),
            OrderKind::Blur => Some(self.blur_exchange),
            OrderKind::Manifold => Some(self.manifold_market),
            OrderKind::Infinity => Some(self.infinity_exchange),
            _ => None,
        }
    }
}
