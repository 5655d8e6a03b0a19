//! Protocol group builders.
//!
//! Each builder takes one same-kind group of listing details and emits
//! exactly one execution entry: the protocol's single-order call for a group
//! of one, its batch call otherwise. Totals honor partial fills, fees come
//! from the distribution logic, and every module call carries the standard
//! trailing params struct so all modules speak the same refund contract.
//!
//! Two kinds need outside help before they can be encoded: X2Y2 orders need
//! a server-co-signed input per order, and custodied ZeroExV4 orders must be
//! released first. Those are the only per-item fallible steps in the build.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::addresses::{AddressBook, NATIVE_ETH};
use crate::error::BuildError;
use crate::order::OrderKind;
use crate::orderbook::OrderbookClient;
use crate::router::calldata::{
    fee_entries, listing_params, offer_params, IBlurExchange, ICryptoPunksMarket, IERC1155,
    IERC721, IInfinityExchange, IListingModule, IManifoldMarket, IOfferModule, ISeaportExchange,
};
use crate::router::fees;
use crate::types::{
    BidDetail, ContractKind, ExecutionInfo, Fee, FillOptions, FillTransaction, ListingDetail,
};

// ============================================
// GROUPING
// ============================================

/// A same-kind subsequence of the input batch, each member keeping its
/// original index so results scatter back into the caller's array.
pub(crate) struct ListingGroup<'a> {
    pub kind: OrderKind,
    pub members: Vec<(usize, &'a ListingDetail)>,
}

/// Partition a batch into per-kind groups, preserving input order both
/// across and within groups.
pub(crate) fn partition(details: &[ListingDetail]) -> Vec<ListingGroup<'_>> {
    let mut groups: Vec<ListingGroup> = Vec::new();
    for (index, detail) in details.iter().enumerate() {
        match groups.iter_mut().find(|g| g.kind == detail.kind()) {
            Some(group) => group.members.push((index, detail)),
            None => groups.push(ListingGroup {
                kind: detail.kind(),
                members: vec![(index, detail)],
            }),
        }
    }
    groups
}

/// What building one group produced: the entry (absent when every member was
/// skipped), which original indices it fills, and which were skipped.
pub(crate) struct GroupBuild {
    pub execution: Option<ExecutionInfo>,
    pub filled: Vec<usize>,
    pub skipped: Vec<usize>,
    /// Settlement currency this group spends, price + fees. Equal to the
    /// entry's value for native groups; for ERC20 groups it is what a prior
    /// currency leg must deliver.
    pub spend: U256,
}

/// Per-build inputs shared by every group builder.
pub(crate) struct BuildContext<'a> {
    pub taker: Address,
    pub batch_len: usize,
    pub options: &'a FillOptions,
    pub book: &'a AddressBook,
}

// ============================================
// GROUP DISPATCH
// ============================================

/// Build the execution entry for one group. The match is exhaustive: a new
/// kind will not compile until it is placed in a bucket here.
pub(crate) async fn build_group(
    group: &ListingGroup<'_>,
    ctx: &BuildContext<'_>,
    orderbook: &dyn OrderbookClient,
) -> Result<GroupBuild, BuildError> {
    match group.kind {
        OrderKind::Seaport
        | OrderKind::LooksRare
        | OrderKind::Zora
        | OrderKind::Rarible
        | OrderKind::Sudoswap
        | OrderKind::Foundation
        | OrderKind::Forward
        | OrderKind::Universe
        | OrderKind::Nftx => build_simple_listings(group, ctx),

        // Element buckets on its own; its module is distinct from ZeroExV4
        // even though the calldata shapes look alike.
        OrderKind::Element => build_simple_listings(group, ctx),

        OrderKind::X2Y2 => build_x2y2_listings(group, ctx, orderbook).await,

        OrderKind::ZeroExV4Erc721 | OrderKind::ZeroExV4Erc1155 => {
            build_zeroex_v4_listings(group, ctx, orderbook).await
        }

        // Direct-only kinds never reach group building; the assembler
        // special-cases them before partitioning.
        OrderKind::CryptoPunks | OrderKind::Manifold | OrderKind::Infinity | OrderKind::Blur => {
            Err(BuildError::UnsupportedSweep(group.kind))
        }
    }
}

// ============================================
// SHARED ENCODING
// ============================================

struct GroupTotals {
    total_price: U256,
    fees: Vec<Fee>,
    total_fees: U256,
    spend: U256,
}

fn group_totals(
    members: &[(usize, &ListingDetail)],
    ctx: &BuildContext<'_>,
) -> Result<GroupTotals, BuildError> {
    let mut total_price = U256::ZERO;
    for (_, detail) in members {
        let paid = detail.order.price_for_fill(detail.fill_amount())?;
        total_price = total_price.checked_add(paid).ok_or(BuildError::Overflow)?;
        // ZeroExV4 order fees sit on top of the stated price.
        total_price = total_price
            .checked_add(detail.order.flags.additive_fee)
            .ok_or(BuildError::Overflow)?;
    }

    let fees = fees::group_fees(
        members.len(),
        ctx.batch_len,
        &ctx.options.global_fees,
        members.iter().flat_map(|(_, d)| d.fees.iter()),
    )?;
    let total_fees = fees::total(&fees)?;
    let spend = total_price
        .checked_add(total_fees)
        .ok_or(BuildError::Overflow)?;

    Ok(GroupTotals {
        total_price,
        fees,
        total_fees,
        spend,
    })
}

/// Encode one module call for a group of already-prepared order payloads.
/// Group size picks between the single-order and batch entry points; the
/// currency picks between the payable and ERC20 shapes.
fn encode_listing_execution(
    module: Address,
    currency: Address,
    mut orders: Vec<Bytes>,
    ctx: &BuildContext<'_>,
    totals: &GroupTotals,
) -> ExecutionInfo {
    let params = listing_params(ctx.taker, !ctx.options.partial, totals.total_price);
    let fee_list = fee_entries(&totals.fees);
    let native = currency == NATIVE_ETH;

    let data = if native {
        if orders.len() == 1 {
            IListingModule::acceptETHListingCall {
                order: orders.remove(0),
                params,
                fees: fee_list,
            }
            .abi_encode()
        } else {
            IListingModule::acceptETHListingsCall {
                orders,
                params,
                fees: fee_list,
            }
            .abi_encode()
        }
    } else if orders.len() == 1 {
        IListingModule::acceptERC20ListingCall {
            order: orders.remove(0),
            currency,
            params,
            fees: fee_list,
        }
        .abi_encode()
    } else {
        IListingModule::acceptERC20ListingsCall {
            orders,
            currency,
            params,
            fees: fee_list,
        }
        .abi_encode()
    };

    // ERC20-settled fills carry no call value; payment flows from an
    // earlier escrow or swap leg.
    let value = if native { totals.spend } else { U256::ZERO };

    ExecutionInfo {
        module,
        data: Bytes::from(data),
        value,
    }
}

fn module_for(kind: OrderKind, ctx: &BuildContext<'_>) -> Result<Address, BuildError> {
    ctx.book.module_for(kind).ok_or(BuildError::MissingModule {
        kind,
        chain_id: ctx.book.chain_id,
    })
}

// ============================================
// BUILDERS
// ============================================

/// Builder for every kind whose raw order encoding is already complete: the
/// group's payloads go into the module call as-is.
fn build_simple_listings(
    group: &ListingGroup<'_>,
    ctx: &BuildContext<'_>,
) -> Result<GroupBuild, BuildError> {
    let module = module_for(group.kind, ctx)?;
    let totals = group_totals(&group.members, ctx)?;

    let orders: Vec<Bytes> = group
        .members
        .iter()
        .map(|(_, d)| d.order.raw_encoded())
        .collect();

    let currency = group.members[0].1.currency;
    let execution = encode_listing_execution(module, currency, orders, ctx, &totals);

    debug!(
        "{} group: {} order(s), price {}, fees {}",
        group.kind,
        group.members.len(),
        totals.total_price,
        totals.total_fees
    );

    Ok(GroupBuild {
        execution: Some(execution),
        filled: group.members.iter().map(|(i, _)| *i).collect(),
        skipped: Vec::new(),
        spend: totals.spend,
    })
}

/// X2Y2 orders fill with a fresh server-co-signed input per order. Inputs
/// for the whole group are fetched concurrently; a failed fetch skips that
/// member when the caller opted in, and fails the build otherwise.
async fn build_x2y2_listings(
    group: &ListingGroup<'_>,
    ctx: &BuildContext<'_>,
    orderbook: &dyn OrderbookClient,
) -> Result<GroupBuild, BuildError> {
    let module = module_for(group.kind, ctx)?;

    let fetched = join_all(group.members.iter().map(|(index, detail)| async move {
        let input = orderbook.sign_x2y2_input(&detail.order, ctx.taker).await;
        (*index, *detail, input)
    }))
    .await;

    let mut survivors: Vec<(usize, &ListingDetail)> = Vec::new();
    let mut orders: Vec<Bytes> = Vec::new();
    let mut skipped = Vec::new();

    for (index, detail, input) in fetched {
        match input {
            Ok(signed_input) => {
                survivors.push((index, detail));
                orders.push(signed_input);
            }
            Err(e) if ctx.options.skip_errors => {
                warn!("skipping x2y2 order at index {}: {}", index, e);
                skipped.push(index);
            }
            Err(e) => return Err(e),
        }
    }

    if survivors.is_empty() {
        return Ok(GroupBuild {
            execution: None,
            filled: Vec::new(),
            skipped,
            spend: U256::ZERO,
        });
    }

    let totals = group_totals(&survivors, ctx)?;
    let currency = survivors[0].1.currency;
    let execution = encode_listing_execution(module, currency, orders, ctx, &totals);

    Ok(GroupBuild {
        execution: Some(execution),
        filled: survivors.iter().map(|(i, _)| *i).collect(),
        skipped,
        spend: totals.spend,
    })
}

/// ZeroExV4 orders held by the off-chain custodian must be released before
/// they are fillable; releases for the group run concurrently. Release
/// failures follow the same skip policy as X2Y2 co-signing.
async fn build_zeroex_v4_listings(
    group: &ListingGroup<'_>,
    ctx: &BuildContext<'_>,
    orderbook: &dyn OrderbookClient,
) -> Result<GroupBuild, BuildError> {
    let module = module_for(group.kind, ctx)?;

    let released = join_all(group.members.iter().map(|(index, detail)| async move {
        let outcome = if detail.order.flags.cb_custodied {
            orderbook.release_cb_order(detail.order.order_hash()).await
        } else {
            Ok(())
        };
        (*index, *detail, outcome)
    }))
    .await;

    let mut survivors: Vec<(usize, &ListingDetail)> = Vec::new();
    let mut skipped = Vec::new();

    for (index, detail, outcome) in released {
        match outcome {
            Ok(()) => survivors.push((index, detail)),
            Err(e) if ctx.options.skip_errors => {
                warn!("skipping custodied order at index {}: {}", index, e);
                skipped.push(index);
            }
            Err(e) => return Err(e),
        }
    }

    if survivors.is_empty() {
        return Ok(GroupBuild {
            execution: None,
            filled: Vec::new(),
            skipped,
            spend: U256::ZERO,
        });
    }

    let totals = group_totals(&survivors, ctx)?;
    let orders: Vec<Bytes> = survivors.iter().map(|(_, d)| d.order.raw_encoded()).collect();
    let currency = survivors[0].1.currency;
    let execution = encode_listing_execution(module, currency, orders, ctx, &totals);

    Ok(GroupBuild {
        execution: Some(execution),
        filled: survivors.iter().map(|(i, _)| *i).collect(),
        skipped,
        spend: totals.spend,
    })
}

// ============================================
// DIRECT FILLS
// ============================================

/// Fill one listing straight on its protocol, for kinds that never go
/// through the router. No fee entries exist on these paths.
pub(crate) fn direct_listing_fill(
    detail: &ListingDetail,
    taker: Address,
    book: &AddressBook,
) -> Result<FillTransaction, BuildError> {
    let kind = detail.kind();
    let to = book
        .exchange_for(kind)
        .ok_or(BuildError::UnsupportedKind(kind))?;
    let price = detail.order.price_for_fill(detail.fill_amount())?;

    let data = match kind {
        OrderKind::CryptoPunks => ICryptoPunksMarket::buyPunkCall {
            punkIndex: detail.token_id,
        }
        .abi_encode(),

        OrderKind::Manifold => IManifoldMarket::purchaseCall {
            listingId: detail.token_id,
            count: detail.fill_amount(),
        }
        .abi_encode(),

        OrderKind::Infinity => IInfinityExchange::takeOrderCall {
            order: detail.order.raw_encoded(),
        }
        .abi_encode(),

        OrderKind::Blur => IBlurExchange::executeCall {
            sellOrder: detail.order.raw_encoded(),
            buyOrder: detail.order.build_matching_counter_order(taker),
        }
        .abi_encode(),

        _ => return Err(BuildError::UnsupportedKind(kind)),
    };

    Ok(FillTransaction {
        to,
        data: Bytes::from(data),
        value: price,
    })
}

/// Seaport's own fill transaction: the fast path for a uniform batch that
/// needs no cross-protocol composition. Single order uses the basic fill,
/// anything more goes through the best-effort batch fill.
pub(crate) fn direct_seaport_fill(
    details: &[ListingDetail],
    book: &AddressBook,
) -> Result<FillTransaction, BuildError> {
    let mut total = U256::ZERO;
    for detail in details {
        let paid = detail.order.price_for_fill(detail.fill_amount())?;
        total = total.checked_add(paid).ok_or(BuildError::Overflow)?;
    }

    let data = if details.len() == 1 {
        ISeaportExchange::fulfillBasicOrderCall {
            order: details[0].order.raw_encoded(),
        }
        .abi_encode()
    } else {
        ISeaportExchange::fulfillAvailableOrdersCall {
            orders: details.iter().map(|d| d.order.raw_encoded()).collect(),
            maximumFulfilled: U256::from(details.len()),
        }
        .abi_encode()
    };

    Ok(FillTransaction {
        to: book.seaport_exchange,
        data: Bytes::from(data),
        value: total,
    })
}

/// Accept a bid straight on its protocol.
pub(crate) fn direct_bid_fill(
    detail: &BidDetail,
    taker: Address,
    book: &AddressBook,
) -> Result<FillTransaction, BuildError> {
    let kind = detail.kind();
    let to = book
        .exchange_for(kind)
        .ok_or(BuildError::UnsupportedKind(kind))?;

    let data = match kind {
        OrderKind::CryptoPunks => ICryptoPunksMarket::acceptBidForPunkCall {
            punkIndex: detail.token_id,
            minPrice: detail.order.settlement_price(),
        }
        .abi_encode(),

        OrderKind::Blur => IBlurExchange::executeCall {
            sellOrder: detail.order.build_matching_counter_order(taker),
            buyOrder: detail.order.raw_encoded(),
        }
        .abi_encode(),

        _ => return Err(BuildError::UnsupportedKind(kind)),
    };

    Ok(FillTransaction {
        to,
        data: Bytes::from(data),
        value: U256::ZERO,
    })
}

/// The module-level accept-offer call for one bid, with the bid's share of
/// any global fees folded in.
fn accept_offer_data(
    detail: &BidDetail,
    taker: Address,
    batch_len: usize,
    options: &FillOptions,
) -> Result<Bytes, BuildError> {
    let fees = fees::group_fees(1, batch_len, &options.global_fees, detail.fees.iter())?;

    let data = IOfferModule::acceptOfferCall {
        order: detail.order.raw_encoded(),
        params: offer_params(taker, !options.partial),
        fees: fee_entries(&fees),
    }
    .abi_encode();

    Ok(Bytes::from(data))
}

/// Accept-offer execution entry for one bid inside an aggregated batch. The
/// asset is already in the module's custody by the time this runs (a permit
/// or escrow entry precedes it), so the call is bare.
pub(crate) fn module_bid_execution(
    detail: &BidDetail,
    taker: Address,
    batch_len: usize,
    options: &FillOptions,
    book: &AddressBook,
) -> Result<ExecutionInfo, BuildError> {
    let kind = detail.kind();
    let module = book.module_for(kind).ok_or(BuildError::MissingModule {
        kind,
        chain_id: book.chain_id,
    })?;

    Ok(ExecutionInfo {
        module,
        data: accept_offer_data(detail, taker, batch_len, options)?,
        value: U256::ZERO,
    })
}

/// Accept a bid through a router module without any standing approval: the
/// module's accept-offer call rides as the data payload of a safe transfer
/// from the taker, so the asset moves and the fill executes within one
/// sender-initiated call. The transaction's `to` is the NFT contract.
pub(crate) fn module_bid_fill(
    detail: &BidDetail,
    taker: Address,
    options: &FillOptions,
    book: &AddressBook,
) -> Result<FillTransaction, BuildError> {
    let kind = detail.kind();
    let module = book.module_for(kind).ok_or(BuildError::MissingModule {
        kind,
        chain_id: book.chain_id,
    })?;

    let inner = accept_offer_data(detail, taker, 1, options)?;

    let data = match detail.contract_kind {
        ContractKind::Erc721 => IERC721::safeTransferFromCall {
            from: taker,
            to: module,
            tokenId: detail.token_id,
            data: inner,
        }
        .abi_encode(),
        ContractKind::Erc1155 => IERC1155::safeTransferFromCall {
            from: taker,
            to: module,
            id: detail.token_id,
            amount: detail.fill_amount(),
            data: inner,
        }
        .abi_encode(),
    };

    Ok(FillTransaction {
        to: detail.contract,
        data: Bytes::from(data),
        value: U256::ZERO,
    })
}
