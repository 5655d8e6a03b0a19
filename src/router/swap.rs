//! Currency leg planning.
//!
//! When the settlement currency differs from what the caller presents, one
//! extra execution entry is prepended to obtain the needed output amount:
//! a wrap, an unwrap, or an exact-output single-hop swap. The swap route
//! itself comes from an injected planner; the only route shape accepted is
//! single pool, single hop - anything else must fail loudly rather than
//! silently underpay.

use alloy_primitives::{address, Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use tracing::debug;

use crate::addresses::{AddressBook, NATIVE_ETH};
use crate::error::BuildError;
use crate::types::ExecutionInfo;

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// Uniswap V3 QuoterV2 interface (exact output)
    #[derive(Debug)]
    interface IQuoterV2 {
        struct QuoteExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amount;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactOutputSingle(QuoteExactOutputSingleParams memory params)
            external
            returns (
                uint256 amountIn,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );
    }

    /// Uniswap V3 factory (for the single-pool constraint)
    interface IUniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }

    /// Swap module surface: wrap, unwrap, and exact-output single-hop swap.
    /// `value` on the swap call is the maximum input the caller will spend;
    /// anything unspent is refunded to `refundTo`.
    interface ISwapModule {
        struct ExactOutputParams {
            address tokenIn;
            address tokenOut;
            uint24 poolFee;
            uint256 amountOut;
            uint256 amountInMaximum;
            address recipient;
            address refundTo;
        }

        function wrap(address recipient) external payable;
        function unwrap(uint256 amount, address recipient) external;
        function ethToExactOutput(ExactOutputParams calldata params) external payable;
    }
}

/// Official Uniswap V3 QuoterV2 address on mainnet
const QUOTER_V2: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");

/// Uniswap V3 Factory
const UNISWAP_V3_FACTORY: Address = address!("1F98431c8aD98523631AE4a59f267346ea31F984");

/// Fee tiers probed for a viable single-hop pool, most liquid first
const FEE_TIERS: [u32; 3] = [3000, 500, 10000];

// ============================================
// ROUTE PLANNER
// ============================================

/// An exact-output route through exactly one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
    pub pool: Address,
    pub pool_fee: u32,
    /// Input the quoter says this output costs right now. Slack on top of
    /// this is the caller's decision, not the planner's.
    pub quoted_input: U256,
}

/// Finds an exact-output, single-pool, single-hop route.
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    async fn plan_exact_output(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Result<SwapRoute, BuildError>;
}

/// `RoutePlanner` over the official Uniswap V3 QuoterV2 via eth_call.
pub struct UniswapV3Planner {
    rpc_url: String,
}

impl UniswapV3Planner {
    pub fn new(rpc_url: String) -> Self {
        Self { rpc_url }
    }

    async fn call_contract(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, BuildError> {
        let provider = ProviderBuilder::new()
            .connect_http(
                self.rpc_url
                    .parse()
                    .map_err(|e| BuildError::ChainRead(format!("bad rpc url: {}", e)))?,
            );

        let tx = TransactionRequest::default().to(to).input(calldata.into());

        let result = provider
            .call(tx)
            .await
            .map_err(|e| BuildError::ChainRead(format!("eth_call failed: {}", e)))?;

        Ok(result.to_vec())
    }

    async fn pool_for(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Address, BuildError> {
        let calldata = IUniswapV3Factory::getPoolCall {
            tokenA: token_a,
            tokenB: token_b,
            fee: fee.try_into().map_err(|_| BuildError::Overflow)?,
        }
        .abi_encode();

        let output = self.call_contract(UNISWAP_V3_FACTORY, calldata).await?;

        IUniswapV3Factory::getPoolCall::abi_decode_returns(&output)
            .map_err(|e| BuildError::ChainRead(format!("bad getPool response: {}", e)))
    }

    async fn quote_exact_output(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
        fee: u32,
    ) -> Result<U256, BuildError> {
        let params = IQuoterV2::QuoteExactOutputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            amount: amount_out,
            fee: fee.try_into().map_err(|_| BuildError::Overflow)?,
            sqrtPriceLimitX96: alloy_primitives::Uint::<160, 3>::ZERO,
        };

        let calldata = IQuoterV2::quoteExactOutputSingleCall { params }.abi_encode();
        let output = self.call_contract(QUOTER_V2, calldata).await?;

        let decoded = IQuoterV2::quoteExactOutputSingleCall::abi_decode_returns(&output)
            .map_err(|e| BuildError::ChainRead(format!("bad quoter response: {}", e)))?;

        Ok(decoded.amountIn)
    }
}

#[async_trait]
impl RoutePlanner for UniswapV3Planner {
    async fn plan_exact_output(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Result<SwapRoute, BuildError> {
        for fee in FEE_TIERS {
            let pool = match self.pool_for(token_in, token_out, fee).await {
                Ok(pool) if pool != Address::ZERO => pool,
                _ => continue,
            };

            match self
                .quote_exact_output(token_in, token_out, amount_out, fee)
                .await
            {
                Ok(quoted_input) => {
                    debug!(
                        "single-hop route {} -> {} via {:?} (fee {}), input {}",
                        token_in, token_out, pool, fee, quoted_input
                    );
                    return Ok(SwapRoute {
                        pool,
                        pool_fee: fee,
                        quoted_input,
                    });
                }
                Err(e) => {
                    debug!("fee tier {} unusable: {}", fee, e);
                    continue;
                }
            }
        }

        Err(BuildError::NoSwapRoute {
            token_in,
            token_out,
            amount_out,
        })
    }
}

// ============================================
// CURRENCY LEG
// ============================================

/// Build the one execution entry that turns what the caller presents into
/// what the fills consume. Runs before every entry that spends its output.
pub async fn plan_currency_leg(
    planner: &dyn RoutePlanner,
    from: Address,
    to: Address,
    exact_output: U256,
    recipient: Address,
    refund_to: Address,
    slack_bps: u64,
    book: &AddressBook,
) -> Result<ExecutionInfo, BuildError> {
    // Native -> wrapped: a deposit, value carries the amount.
    if from == NATIVE_ETH && to == book.weth {
        let data = ISwapModule::wrapCall { recipient }.abi_encode();
        return Ok(ExecutionInfo {
            module: book.swap_module,
            data: Bytes::from(data),
            value: exact_output,
        });
    }

    // Wrapped -> native: a withdrawal, no value.
    if from == book.weth && to == NATIVE_ETH {
        let data = ISwapModule::unwrapCall {
            amount: exact_output,
            recipient,
        }
        .abi_encode();
        return Ok(ExecutionInfo {
            module: book.swap_module,
            data: Bytes::from(data),
            value: U256::ZERO,
        });
    }

    // Genuine cross-asset swap: exact output, single pool, single hop. The
    // entry's value is the most the caller will spend; the module refunds
    // the unspent remainder.
    let quote_in = if from == NATIVE_ETH { book.weth } else { from };
    let route = planner.plan_exact_output(quote_in, to, exact_output).await?;

    let slack = route
        .quoted_input
        .checked_mul(U256::from(slack_bps))
        .ok_or(BuildError::Overflow)?
        / U256::from(10_000);
    let amount_in_maximum = route
        .quoted_input
        .checked_add(slack)
        .ok_or(BuildError::Overflow)?;

    let params = ISwapModule::ExactOutputParams {
        tokenIn: quote_in,
        tokenOut: to,
        poolFee: route.pool_fee.try_into().map_err(|_| BuildError::Overflow)?,
        amountOut: exact_output,
        amountInMaximum: amount_in_maximum,
        recipient,
        refundTo: refund_to,
    };

    let data = ISwapModule::ethToExactOutputCall { params }.abi_encode();

    Ok(ExecutionInfo {
        module: book.swap_module,
        data: Bytes::from(data),
        value: if from == NATIVE_ETH {
            amount_in_maximum
        } else {
            U256::ZERO
        },
    })
}
