//! The Sweeper - NFT marketplace fill aggregation.
//!
//! Takes a heterogeneous batch of marketplace orders (listings and bids
//! across Seaport, LooksRare, X2Y2, ZeroExV4 and a dozen other protocols)
//! and synthesizes the minimal set of atomic on-chain calls that fills all
//! of them through a single aggregating entry point: grouping by protocol,
//! computing exact payment totals and fee distribution, choosing between a
//! direct single-protocol fast path and the aggregated path, and working
//! around token approvals the caller never wants to grant.
//!
//! The crate holds no funds and no keys, performs no persistence, and never
//! submits anything: it is a function from "desired fills" to one
//! transaction's worth of calldata.

pub mod addresses;
pub mod config;
pub mod error;
pub mod onchain;
pub mod order;
pub mod orderbook;
pub mod router;
pub mod types;

pub use addresses::{AddressBook, NATIVE_ETH, WETH};
pub use config::Config;
pub use error::BuildError;
pub use order::{OrderFlags, OrderKind, SignedOrder};
pub use router::swap::{RoutePlanner, SwapRoute, UniswapV3Planner};
pub use router::transfer::{EscrowStrategy, EscrowToken, OrderSigner};
pub use router::Router;
pub use types::{
    BatchFill, BidDetail, BidFill, ContractKind, ExecutionInfo, Fee, FillOptions, FillTransaction,
    ListingDetail,
};
