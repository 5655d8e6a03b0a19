//! Solidity interfaces for the aggregation router, its protocol modules, and
//! the token hooks used for approval-less bid fills.
//!
//! Modules all speak the same convention: a single-order and a multi-order
//! accept function taking the protocol's native order encoding, a trailing
//! params struct `{fillTo, refundTo, revertIfIncomplete, amount}`, and a
//! trailing fee array. Anything left of `amount` after the module spends is
//! refunded to `refundTo`.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::types::{ExecutionInfo, Fee};

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// One call the aggregation contract makes, in order.
    #[derive(Debug)]
    struct Execution {
        address module;
        bytes data;
        uint256 value;
    }

    /// Trailing params for listing fills.
    #[derive(Debug)]
    struct ListingParams {
        address fillTo;
        address refundTo;
        bool revertIfIncomplete;
        uint256 amount;
    }

    /// Trailing params for bid fills (no payable amount; payment comes from
    /// the bid's escrowed funds).
    #[derive(Debug)]
    struct OfferParams {
        address fillTo;
        address refundTo;
        bool revertIfIncomplete;
    }

    /// Fee entry appended to every module call.
    #[derive(Debug)]
    struct FeeEntry {
        address recipient;
        uint256 amount;
    }

    /// One item of a signed batch-transfer allowance.
    #[derive(Debug)]
    struct TransferItem {
        address token;
        uint256 tokenId;
        uint256 amount;
        address recipient;
    }

    /// A time-boxed, nonce'd batch-transfer allowance signed by the giver.
    #[derive(Debug)]
    struct BatchPermit {
        address giver;
        uint256 nonce;
        uint256 deadline;
        TransferItem[] items;
    }

    /// The aggregator's single public entry point.
    interface IAggregationRouter {
        function execute(Execution[] calldata executions) external payable;
    }

    /// Common surface of every protocol listing module.
    interface IListingModule {
        function acceptETHListing(
            bytes calldata order,
            ListingParams calldata params,
            FeeEntry[] calldata fees
        ) external payable;

        function acceptETHListings(
            bytes[] calldata orders,
            ListingParams calldata params,
            FeeEntry[] calldata fees
        ) external payable;

        function acceptERC20Listing(
            bytes calldata order,
            address currency,
            ListingParams calldata params,
            FeeEntry[] calldata fees
        ) external;

        function acceptERC20Listings(
            bytes[] calldata orders,
            address currency,
            ListingParams calldata params,
            FeeEntry[] calldata fees
        ) external;
    }

    /// Common surface of every protocol offer module.
    interface IOfferModule {
        function acceptOffer(
            bytes calldata order,
            OfferParams calldata params,
            FeeEntry[] calldata fees
        ) external;
    }

    /// One-time transfer module consuming signed batch allowances.
    interface IPermitModule {
        function transferWithPermit(
            BatchPermit calldata permit,
            bytes calldata signature
        ) external;
    }

    /// Safe-transfer entry points whose `data` payload is decoded and
    /// executed by the receiving contract.
    interface IERC721 {
        function safeTransferFrom(
            address from,
            address to,
            uint256 tokenId,
            bytes calldata data
        ) external;
    }

    interface IERC1155 {
        function safeTransferFrom(
            address from,
            address to,
            uint256 id,
            uint256 amount,
            bytes calldata data
        ) external;
    }

    /// Seaport's own fill and matching surface, used by the direct fast path
    /// and by synthesized escrow order pairs.
    interface ISeaportExchange {
        function fulfillBasicOrder(bytes calldata order) external payable;

        function fulfillAvailableOrders(
            bytes[] calldata orders,
            uint256 maximumFulfilled
        ) external payable;

        function matchOrders(
            bytes[] calldata orders,
            bytes calldata fulfillments
        ) external payable;
    }

    /// Direct-only integrations.
    interface ICryptoPunksMarket {
        function buyPunk(uint256 punkIndex) external payable;
        function acceptBidForPunk(uint256 punkIndex, uint256 minPrice) external;
    }

    interface IManifoldMarket {
        function purchase(uint256 listingId, uint256 count) external payable;
    }

    interface IInfinityExchange {
        function takeOrder(bytes calldata order) external payable;
    }

    interface IBlurExchange {
        function execute(bytes calldata sellOrder, bytes calldata buyOrder) external payable;
    }
}

// ============================================
// ENCODING HELPERS
// ============================================

impl From<&Fee> for FeeEntry {
    fn from(fee: &Fee) -> Self {
        FeeEntry {
            recipient: fee.recipient,
            amount: fee.amount,
        }
    }
}

pub(crate) fn fee_entries(fees: &[Fee]) -> Vec<FeeEntry> {
    fees.iter().map(FeeEntry::from).collect()
}

/// Standard trailing params for a listing fill: spend at most `amount`,
/// deliver and refund to the taker.
pub(crate) fn listing_params(taker: Address, revert_if_incomplete: bool, amount: U256) -> ListingParams {
    ListingParams {
        fillTo: taker,
        refundTo: taker,
        revertIfIncomplete: revert_if_incomplete,
        amount,
    }
}

pub(crate) fn offer_params(taker: Address, revert_if_incomplete: bool) -> OfferParams {
    OfferParams {
        fillTo: taker,
        refundTo: taker,
        revertIfIncomplete: revert_if_incomplete,
    }
}

/// Wrap an ordered execution list in the aggregator's `execute` call.
pub(crate) fn encode_execute(executions: &[ExecutionInfo]) -> Bytes {
    let entries: Vec<Execution> = executions
        .iter()
        .map(|e| Execution {
            module: e.module,
            data: e.data.clone(),
            value: e.value,
        })
        .collect();

    Bytes::from(IAggregationRouter::executeCall { executions: entries }.abi_encode())
}
