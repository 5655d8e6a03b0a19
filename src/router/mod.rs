//! The execution assembler.
//!
//! Turns a heterogeneous batch of desired fills into one transaction:
//! - direct-only kinds short-circuit to their own protocol (one order max,
//!   no fees),
//! - a uniform batch on the natively-batchable protocol bypasses the
//!   aggregator entirely (the wrapper would only add gas),
//! - everything else partitions into per-protocol groups, one execution
//!   entry each, optionally prefixed by a currency leg and approval-
//!   avoidance entries, wrapped in the aggregator's single `execute` call.
//!
//! The success vector is parallel to the input: an index is `true` iff that
//! detail landed in some emitted entry.

pub(crate) mod builders;
pub mod calldata;
pub mod fees;
pub mod swap;
pub mod transfer;

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::addresses::{AddressBook, NATIVE_ETH};
use crate::config::Config;
use crate::error::BuildError;
use crate::onchain::{ChainReader, RpcChainReader};
use crate::orderbook::{HttpOrderbookClient, OrderbookClient};
use crate::types::{BatchFill, BidDetail, BidFill, FillOptions, FillTransaction, ListingDetail};

use self::builders::BuildContext;
use self::swap::{RoutePlanner, UniswapV3Planner};
use self::transfer::{EscrowStrategy, EscrowToken, OrderSigner};

/// Builds fill transactions. One instance per chain; every build invocation
/// is independent and shares no mutable state with any other.
pub struct Router {
    book: AddressBook,
    chain: Arc<dyn ChainReader>,
    orderbook: Arc<dyn OrderbookClient>,
    planner: Arc<dyn RoutePlanner>,
}

impl Router {
    /// Wire up the default collaborators from configuration: RPC-backed
    /// chain reads, HTTP orderbook clients, Uniswap V3 route planning.
    pub fn from_config(config: &Config) -> Result<Self, BuildError> {
        let book = AddressBook::for_chain(config.chain_id)
            .ok_or(BuildError::UnsupportedChain(config.chain_id))?;

        let chain = Arc::new(RpcChainReader::new(config.rpc_url.clone(), &book));
        let orderbook = Arc::new(HttpOrderbookClient::new(
            config.x2y2_api_key.clone(),
            config.custody_api_key.clone(),
        ));
        let planner = Arc::new(UniswapV3Planner::new(config.rpc_url.clone()));

        Ok(Self::new(book, chain, orderbook, planner))
    }

    /// Explicit collaborators, for tests and non-default wiring.
    pub fn new(
        book: AddressBook,
        chain: Arc<dyn ChainReader>,
        orderbook: Arc<dyn OrderbookClient>,
        planner: Arc<dyn RoutePlanner>,
    ) -> Self {
        Self {
            book,
            chain,
            orderbook,
            planner,
        }
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    // ============================================
    // LISTINGS
    // ============================================

    /// Build one transaction filling every listing in the batch, settled in
    /// `currency` (zero address for native ETH), delivered to `taker`.
    pub async fn fill_listings(
        &self,
        details: &[ListingDetail],
        taker: Address,
        currency: Address,
        options: &FillOptions,
    ) -> Result<BatchFill, BuildError> {
        if details.is_empty() {
            return Err(BuildError::EmptyBatch);
        }

        // Direct-only kinds: one order max, fees impossible.
        if let Some(direct) = details.iter().find(|d| !d.kind().is_aggregatable()) {
            let kind = direct.kind();
            if details.len() > 1 {
                return Err(BuildError::UnsupportedSweep(kind));
            }
            if !options.global_fees.is_empty() || !details[0].fees.is_empty() {
                return Err(BuildError::FeesNotSupported(kind));
            }

            let tx = builders::direct_listing_fill(&details[0], taker, &self.book)?;
            info!("direct {} fill, value {}", kind, tx.value);
            return Ok(BatchFill {
                tx,
                success: vec![true],
                errored: Vec::new(),
            });
        }

        // Uniform batch on the natively-batchable protocol with nothing
        // cross-cutting: fill on the protocol itself, skip the aggregator.
        let uniform_batchable = details.iter().all(|d| d.kind().is_natively_batchable())
            && details.iter().all(|d| d.currency == currency)
            && currency == NATIVE_ETH;
        if uniform_batchable
            && !options.force_router
            && options.global_fees.is_empty()
            && details.iter().all(|d| d.fees.is_empty())
        {
            let tx = builders::direct_seaport_fill(details, &self.book)?;
            info!(
                "uniform batch of {} order(s) fills directly, value {}",
                details.len(),
                tx.value
            );
            return Ok(BatchFill {
                tx,
                success: vec![true; details.len()],
                errored: Vec::new(),
            });
        }

        // One settlement currency per batch, exactly.
        if let Some(bad) = details.iter().find(|d| d.currency != currency) {
            return Err(BuildError::CurrencyMismatch {
                presented: bad.currency,
                requested: currency,
            });
        }

        let groups = builders::partition(details);
        debug!(
            "partitioned {} detail(s) into {} group(s)",
            details.len(),
            groups.len()
        );

        let ctx = BuildContext {
            taker,
            batch_len: details.len(),
            options,
            book: &self.book,
        };

        let mut success = vec![false; details.len()];
        let mut errored = Vec::new();
        let mut fills = Vec::new();
        let mut erc20_needed = U256::ZERO;

        for group in &groups {
            let build = builders::build_group(group, &ctx, self.orderbook.as_ref()).await?;

            // Each group marks its own members, nobody else's.
            for index in &build.filled {
                success[*index] = true;
            }
            errored.extend(build.skipped);

            if let Some(execution) = build.execution {
                if execution.value.is_zero() && currency != NATIVE_ETH {
                    erc20_needed = erc20_needed
                        .checked_add(build.spend)
                        .ok_or(BuildError::Overflow)?;
                }
                fills.push(execution);
            }
        }

        if fills.is_empty() {
            return Err(BuildError::EmptyBatch);
        }

        // A non-native settlement currency needs one leg ahead of the fills
        // that consume its output.
        let mut executions = Vec::new();
        if currency != NATIVE_ETH {
            let leg = swap::plan_currency_leg(
                self.planner.as_ref(),
                NATIVE_ETH,
                currency,
                erc20_needed,
                self.book.router,
                taker,
                options.swap_slack_bps,
                &self.book,
            )
            .await?;
            executions.push(leg);
        }
        executions.extend(fills);

        let mut value = U256::ZERO;
        for execution in &executions {
            value = value
                .checked_add(execution.value)
                .ok_or(BuildError::Overflow)?;
        }

        let tx = FillTransaction {
            to: self.book.router,
            data: calldata::encode_execute(&executions),
            value,
        };

        info!(
            "aggregated fill: {} execution(s), value {}, {} skipped",
            executions.len(),
            value,
            errored.len()
        );

        Ok(BatchFill {
            tx,
            success,
            errored,
        })
    }

    // ============================================
    // BIDS
    // ============================================

    /// Build one transaction accepting a single bid. Kinds with a direct
    /// integration fill on the protocol; everything else rides a safe
    /// transfer into the module, so no standing approval ever exists.
    pub async fn fill_bid(
        &self,
        detail: &BidDetail,
        taker: Address,
        options: &FillOptions,
    ) -> Result<BidFill, BuildError> {
        if detail.kind().fills_bid_directly() {
            let tx = builders::direct_bid_fill(detail, taker, &self.book)?;
            return Ok(BidFill { tx, direct: true });
        }

        let tx = builders::module_bid_fill(detail, taker, options, &self.book)?;
        Ok(BidFill { tx, direct: false })
    }

    /// Build one transaction accepting several bids at once. A signed batch
    /// permit moves every asset into its module's custody as the first
    /// entry; the accept-offer entries follow.
    pub async fn fill_bids(
        &self,
        details: &[BidDetail],
        taker: Address,
        signer: &dyn OrderSigner,
        options: &FillOptions,
    ) -> Result<BatchFill, BuildError> {
        if details.is_empty() {
            return Err(BuildError::EmptyBatch);
        }
        if let Some(direct) = details.iter().find(|d| !d.kind().is_aggregatable()) {
            return Err(BuildError::UnsupportedSweep(direct.kind()));
        }

        let tokens = details
            .iter()
            .map(|d| {
                let module = self.book.module_for(d.kind()).ok_or(BuildError::MissingModule {
                    kind: d.kind(),
                    chain_id: self.book.chain_id,
                })?;
                Ok(EscrowToken {
                    contract: d.contract,
                    token_id: d.token_id,
                    amount: d.fill_amount(),
                    kind: d.contract_kind,
                    recipient: module,
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let permit =
            transfer::synthesize_permit(self.chain.as_ref(), signer, taker, &tokens, &self.book)
                .await?;

        let mut executions = vec![permit];
        for detail in details {
            executions.push(builders::module_bid_execution(
                detail,
                taker,
                details.len(),
                options,
                &self.book,
            )?);
        }

        let tx = FillTransaction {
            to: self.book.router,
            data: calldata::encode_execute(&executions),
            value: U256::ZERO,
        };

        info!("aggregated bid fill: {} bid(s) behind one permit", details.len());

        Ok(BatchFill {
            tx,
            success: vec![true; details.len()],
            errored: Vec::new(),
        })
    }

    /// Synthesize a standalone approval-avoidance entry, for callers that
    /// splice their own execution lists together.
    pub async fn plan_approval_avoidance(
        &self,
        strategy: EscrowStrategy,
        signer: &dyn OrderSigner,
        giver: Address,
        tokens: &[EscrowToken],
    ) -> Result<crate::types::ExecutionInfo, BuildError> {
        match strategy {
            EscrowStrategy::MatchedPair => {
                transfer::synthesize_matched_pair(
                    self.chain.as_ref(),
                    signer,
                    giver,
                    tokens,
                    &self.book,
                )
                .await
            }
            EscrowStrategy::Permit => {
                transfer::synthesize_permit(self.chain.as_ref(), signer, giver, tokens, &self.book)
                    .await
            }
        }
    }
}

pub use self::swap::SwapRoute;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderFlags, OrderKind, SignedOrder};
    use crate::types::{ContractKind, Fee};
    use alloy_primitives::{Bytes, B256};
    use alloy_signer_local::PrivateKeySigner;
    use alloy_sol_types::SolCall;
    use async_trait::async_trait;

    use super::calldata::{
        IAggregationRouter, IERC721, IListingModule, IOfferModule, IPermitModule,
    };

    // ============================================
    // STUB COLLABORATORS
    // ============================================

    struct StubChain;

    #[async_trait]
    impl ChainReader for StubChain {
        async fn seaport_counter(&self, _maker: Address) -> Result<U256, BuildError> {
            Ok(U256::from(1))
        }
        async fn zeroex_nonce(&self, _maker: Address) -> Result<U256, BuildError> {
            Ok(U256::ZERO)
        }
        async fn permit_nonce(&self, _owner: Address) -> Result<U256, BuildError> {
            Ok(U256::from(4))
        }
        async fn token_decimals(&self, _token: Address) -> Result<u8, BuildError> {
            Ok(18)
        }
    }

    /// Orderbook stub: co-signing fails for orders priced at exactly 666,
    /// custody release fails for the configured hash.
    struct StubOrderbook {
        fail_release: Option<B256>,
    }

    impl StubOrderbook {
        fn ok() -> Self {
            Self { fail_release: None }
        }
    }

    #[async_trait]
    impl OrderbookClient for StubOrderbook {
        async fn sign_x2y2_input(
            &self,
            order: &SignedOrder,
            _taker: Address,
        ) -> Result<Bytes, BuildError> {
            if order.price == U256::from(666) {
                return Err(BuildError::Orderbook("co-signing refused".to_string()));
            }
            let mut input = vec![0x51];
            input.extend_from_slice(&order.raw);
            Ok(Bytes::from(input))
        }

        async fn release_cb_order(&self, order_hash: B256) -> Result<(), BuildError> {
            if self.fail_release == Some(order_hash) {
                return Err(BuildError::Orderbook("custody refused".to_string()));
            }
            Ok(())
        }
    }

    struct StubPlanner;

    #[async_trait]
    impl RoutePlanner for StubPlanner {
        async fn plan_exact_output(
            &self,
            _token_in: Address,
            _token_out: Address,
            amount_out: U256,
        ) -> Result<SwapRoute, BuildError> {
            Ok(SwapRoute {
                pool: Address::repeat_byte(0x77),
                pool_fee: 3000,
                quoted_input: amount_out,
            })
        }
    }

    fn router() -> Router {
        Router::new(
            AddressBook::mainnet(),
            Arc::new(StubChain),
            Arc::new(StubOrderbook::ok()),
            Arc::new(StubPlanner),
        )
    }

    const TAKER: Address = Address::repeat_byte(0x44);

    fn eth(n: u64, d: u64) -> U256 {
        // n/d ether in wei
        U256::from(n) * U256::from(10u64).pow(U256::from(18)) / U256::from(d)
    }

    fn listing(kind: OrderKind, price: U256) -> ListingDetail {
        ListingDetail {
            contract_kind: ContractKind::Erc721,
            contract: Address::repeat_byte(0x33),
            token_id: U256::from(7),
            amount: None,
            currency: NATIVE_ETH,
            fees: vec![],
            order: SignedOrder::new(
                kind,
                Address::repeat_byte(0x11),
                NATIVE_ETH,
                price,
                U256::from(1),
                Bytes::from(price.to_be_bytes::<32>().to_vec()),
            ),
        }
    }

    fn bid(kind: OrderKind) -> BidDetail {
        BidDetail {
            contract_kind: ContractKind::Erc721,
            contract: Address::repeat_byte(0x33),
            token_id: U256::from(7),
            amount: None,
            fees: vec![],
            order: SignedOrder::new(
                kind,
                Address::repeat_byte(0x11),
                crate::addresses::WETH,
                U256::from(5000),
                U256::from(1),
                Bytes::from(vec![0xbb; 8]),
            ),
        }
    }

    fn decode_executions(tx: &FillTransaction) -> Vec<crate::types::ExecutionInfo> {
        IAggregationRouter::executeCall::abi_decode(&tx.data)
            .unwrap()
            .executions
            .into_iter()
            .map(|e| crate::types::ExecutionInfo {
                module: e.module,
                data: e.data,
                value: e.value,
            })
            .collect()
    }

    // ============================================
    // LISTINGS
    // ============================================

    #[tokio::test]
    async fn test_uniform_batch_is_byte_identical_to_direct_fill() {
        let router = router();
        let details = vec![
            listing(OrderKind::Seaport, U256::from(1000)),
            listing(OrderKind::Seaport, U256::from(500)),
        ];

        let fill = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &FillOptions::default())
            .await
            .unwrap();

        let direct = builders::direct_seaport_fill(&details, router.address_book()).unwrap();
        assert_eq!(fill.tx, direct);
        assert_eq!(fill.tx.to, router.address_book().seaport_exchange);
        assert_eq!(fill.success, vec![true, true]);
    }

    #[tokio::test]
    async fn test_force_router_defeats_the_fast_path() {
        let router = router();
        let details = vec![listing(OrderKind::Seaport, U256::from(1000))];
        let options = FillOptions {
            force_router: true,
            ..Default::default()
        };

        let fill = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &options)
            .await
            .unwrap();

        assert_eq!(fill.tx.to, router.address_book().router);
        assert_eq!(fill.tx.value, U256::from(1000));
    }

    #[tokio::test]
    async fn test_single_protocol_batch_totals() {
        // 1.0 + 0.5 + 0.25 ETH on one batchable protocol, best effort:
        // one execution entry, value 1.75 ETH, everything successful.
        let router = router();
        let details = vec![
            listing(OrderKind::LooksRare, eth(1, 1)),
            listing(OrderKind::LooksRare, eth(1, 2)),
            listing(OrderKind::LooksRare, eth(1, 4)),
        ];
        let options = FillOptions {
            partial: true,
            ..Default::default()
        };

        let fill = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &options)
            .await
            .unwrap();

        assert_eq!(fill.tx.value, eth(7, 4));
        assert_eq!(fill.success, vec![true, true, true]);
        assert!(fill.errored.is_empty());

        let executions = decode_executions(&fill.tx);
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].value, eth(7, 4));

        let call =
            IListingModule::acceptETHListingsCall::abi_decode(&executions[0].data).unwrap();
        assert!(!call.params.revertIfIncomplete);
    }

    #[tokio::test]
    async fn test_mixed_batch_conserves_value_and_splits_fees() {
        let router = router();
        let details = vec![
            listing(OrderKind::LooksRare, U256::from(1000)),
            listing(OrderKind::Element, U256::from(2000)),
            listing(OrderKind::LooksRare, U256::from(3000)),
        ];
        let options = FillOptions {
            global_fees: vec![Fee::new(Address::repeat_byte(0x0f), U256::from(100))],
            ..Default::default()
        };

        let fill = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &options)
            .await
            .unwrap();

        let executions = decode_executions(&fill.tx);
        assert_eq!(executions.len(), 2);

        // Distributed global fee: floor(100*2/3) + floor(100*1/3) = 99.
        // Value = prices + distributed fees, and the transaction's value is
        // the sum of the entries'.
        let total: U256 = executions.iter().map(|e| e.value).fold(U256::ZERO, |a, b| a + b);
        assert_eq!(total, U256::from(6000 + 66 + 33));
        assert_eq!(fill.tx.value, total);
        assert_eq!(fill.success, vec![true, true, true]);
    }

    #[tokio::test]
    async fn test_direct_only_kind_with_fees_is_rejected() {
        let router = router();
        let details = vec![listing(OrderKind::CryptoPunks, U256::from(1000))];
        let options = FillOptions {
            global_fees: vec![Fee::new(Address::repeat_byte(0x0f), U256::from(1))],
            ..Default::default()
        };

        let err = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::FeesNotSupported(OrderKind::CryptoPunks)));
    }

    #[tokio::test]
    async fn test_direct_only_kind_cannot_be_swept() {
        let router = router();
        let details = vec![
            listing(OrderKind::CryptoPunks, U256::from(1000)),
            listing(OrderKind::Seaport, U256::from(500)),
        ];

        let err = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &FillOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedSweep(OrderKind::CryptoPunks)));
    }

    #[tokio::test]
    async fn test_single_direct_only_listing_fills_on_the_protocol() {
        let router = router();
        let details = vec![listing(OrderKind::CryptoPunks, U256::from(1000))];

        let fill = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &FillOptions::default())
            .await
            .unwrap();

        assert_eq!(fill.tx.to, router.address_book().cryptopunks_market);
        assert_eq!(fill.success, vec![true]);
    }

    #[tokio::test]
    async fn test_currency_mismatch_is_rejected() {
        let router = router();
        let mut weth_listing = listing(OrderKind::LooksRare, U256::from(1000));
        weth_listing.currency = crate::addresses::WETH;
        let details = vec![listing(OrderKind::Element, U256::from(500)), weth_listing];

        let err = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &FillOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::CurrencyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_erc20_settlement_gets_a_currency_leg_first() {
        let router = router();
        let weth = crate::addresses::WETH;
        let mut detail = listing(OrderKind::LooksRare, U256::from(10_000));
        detail.currency = weth;
        detail.order.currency = weth;

        let fill = router
            .fill_listings(&[detail], TAKER, weth, &FillOptions::default())
            .await
            .unwrap();

        let executions = decode_executions(&fill.tx);
        assert_eq!(executions.len(), 2);
        // The wrap leg runs first and carries the whole spend; the fill
        // entry itself has no call value.
        assert_eq!(executions[0].module, router.address_book().swap_module);
        assert_eq!(executions[0].value, U256::from(10_000));
        assert_eq!(executions[1].value, U256::ZERO);
        assert_eq!(fill.tx.value, U256::from(10_000));
    }

    #[tokio::test]
    async fn test_skip_errors_keeps_the_rest_of_the_batch() {
        let router = router();
        let details = vec![
            listing(OrderKind::X2Y2, U256::from(1000)),
            listing(OrderKind::X2Y2, U256::from(666)), // stub refuses this one
            listing(OrderKind::LooksRare, U256::from(500)),
        ];
        let options = FillOptions {
            skip_errors: true,
            ..Default::default()
        };

        let fill = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &options)
            .await
            .unwrap();

        assert_eq!(fill.success, vec![true, false, true]);
        assert_eq!(fill.errored, vec![1]);
        // Skipped order's value never enters the transaction.
        assert_eq!(fill.tx.value, U256::from(1500));
    }

    #[tokio::test]
    async fn test_cosigning_failure_without_skip_fails_the_build() {
        let router = router();
        let details = vec![listing(OrderKind::X2Y2, U256::from(666))];

        let err = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &FillOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Orderbook(_)));
    }

    #[tokio::test]
    async fn test_custody_release_failure_honors_skip_policy() {
        let mut custodied = listing(OrderKind::ZeroExV4Erc721, U256::from(2000));
        custodied.order.flags = OrderFlags {
            cb_custodied: true,
            additive_fee: U256::ZERO,
        };
        let fail_hash = custodied.order.order_hash();

        let router = Router::new(
            AddressBook::mainnet(),
            Arc::new(StubChain),
            Arc::new(StubOrderbook {
                fail_release: Some(fail_hash),
            }),
            Arc::new(StubPlanner),
        );

        let details = vec![custodied, listing(OrderKind::ZeroExV4Erc721, U256::from(700))];
        let options = FillOptions {
            skip_errors: true,
            ..Default::default()
        };

        let fill = router
            .fill_listings(&details, TAKER, NATIVE_ETH, &options)
            .await
            .unwrap();

        assert_eq!(fill.success, vec![false, true]);
        assert_eq!(fill.errored, vec![0]);
        assert_eq!(fill.tx.value, U256::from(700));
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let router = router();
        let err = router
            .fill_listings(&[], TAKER, NATIVE_ETH, &FillOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptyBatch));
    }

    // ============================================
    // BIDS
    // ============================================

    #[tokio::test]
    async fn test_bid_fill_rides_a_safe_transfer() {
        let router = router();
        let detail = bid(OrderKind::Seaport);

        let fill = router
            .fill_bid(&detail, TAKER, &FillOptions::default())
            .await
            .unwrap();

        assert!(!fill.direct);
        // The transaction targets the NFT contract, not the router.
        assert_eq!(fill.tx.to, detail.contract);
        assert_eq!(fill.tx.value, U256::ZERO);

        // safeTransferFrom(taker, module, id, data) whose payload is the
        // module-level accept-offer call.
        let outer = IERC721::safeTransferFromCall::abi_decode(&fill.tx.data).unwrap();
        assert_eq!(outer.from, TAKER);
        assert_eq!(outer.to, router.address_book().seaport_module);
        assert_eq!(outer.tokenId, U256::from(7));

        let inner = IOfferModule::acceptOfferCall::abi_decode(&outer.data).unwrap();
        assert_eq!(inner.params.fillTo, TAKER);
        assert!(inner.params.revertIfIncomplete);
    }

    #[tokio::test]
    async fn test_direct_bid_kind_skips_the_router() {
        let router = router();
        let detail = bid(OrderKind::CryptoPunks);

        let fill = router
            .fill_bid(&detail, TAKER, &FillOptions::default())
            .await
            .unwrap();

        assert!(fill.direct);
        assert_eq!(fill.tx.to, router.address_book().cryptopunks_market);
    }

    #[tokio::test]
    async fn test_batched_bids_lead_with_a_permit() {
        let router = router();
        let signer = PrivateKeySigner::random();
        let taker = signer.signer_address();
        let details = vec![bid(OrderKind::Seaport), bid(OrderKind::LooksRare)];

        let fill = router
            .fill_bids(&details, taker, &signer, &FillOptions::default())
            .await
            .unwrap();

        assert_eq!(fill.tx.to, router.address_book().router);
        assert_eq!(fill.tx.value, U256::ZERO);
        assert_eq!(fill.success, vec![true, true]);

        let executions = decode_executions(&fill.tx);
        assert_eq!(executions.len(), 3);
        assert_eq!(executions[0].module, router.address_book().permit_module);

        let permit = IPermitModule::transferWithPermitCall::abi_decode(&executions[0].data)
            .unwrap()
            .permit;
        assert_eq!(permit.giver, taker);
        assert_eq!(permit.items.len(), 2);
        assert_eq!(permit.items[0].recipient, router.address_book().seaport_module);
        assert_eq!(permit.items[1].recipient, router.address_book().looksrare_module);

        assert_eq!(executions[1].module, router.address_book().seaport_module);
        assert_eq!(executions[2].module, router.address_book().looksrare_module);
    }

    #[tokio::test]
    async fn test_standalone_escrow_entry_targets_the_matching_exchange() {
        let router = router();
        let signer = PrivateKeySigner::random();
        let giver = signer.signer_address();
        let tokens = [EscrowToken {
            contract: Address::repeat_byte(0x33),
            token_id: U256::from(7),
            amount: U256::from(1),
            kind: ContractKind::Erc721,
            recipient: router.address_book().seaport_module,
        }];

        let entry = router
            .plan_approval_avoidance(EscrowStrategy::MatchedPair, &signer, giver, &tokens)
            .await
            .unwrap();

        assert_eq!(entry.module, router.address_book().seaport_exchange);
        assert_eq!(entry.value, U256::ZERO);
    }

    #[tokio::test]
    async fn test_batched_bids_reject_direct_only_kinds() {
        let router = router();
        let signer = PrivateKeySigner::random();
        let details = vec![bid(OrderKind::Blur)];

        let err = router
            .fill_bids(&details, TAKER, &signer, &FillOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedSweep(OrderKind::Blur)));
    }
}
