//! On-chain reads the build depends on: protocol counters and nonces for
//! synthesized orders, token decimals for display.
//!
//! Reads go through `eth_call` against the configured RPC endpoint. All of
//! them are read-only and order-independent, so callers are free to issue
//! them concurrently.

use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use tracing::debug;

use crate::addresses::AddressBook;
use crate::error::BuildError;

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// Seaport counter, folded into every order digest.
    interface ISeaportCounter {
        function getCounter(address offerer) external view returns (uint256 counter);
    }

    /// ZeroExV4 per-maker hash nonce.
    interface IZeroExV4Nonces {
        function getHashNonce(address maker) external view returns (uint256 nonce);
    }

    /// Permit module replay protection.
    interface IPermitNonces {
        function nonces(address owner) external view returns (uint256 nonce);
    }

    interface IERC20Metadata {
        function decimals() external view returns (uint8);
    }
}

// ============================================
// CHAIN READER
// ============================================

/// Read-only chain state the build suspends on.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current Seaport counter for `maker`; fresh counters are required
    /// before constructing any escrow order.
    async fn seaport_counter(&self, maker: Address) -> Result<U256, BuildError>;

    /// Current ZeroExV4 hash nonce for `maker`.
    async fn zeroex_nonce(&self, maker: Address) -> Result<U256, BuildError>;

    /// Permit module nonce for `owner`.
    async fn permit_nonce(&self, owner: Address) -> Result<U256, BuildError>;

    /// ERC20 decimals, for human-readable amounts only.
    async fn token_decimals(&self, token: Address) -> Result<u8, BuildError>;
}

/// `ChainReader` backed by an HTTP RPC endpoint.
pub struct RpcChainReader {
    rpc_url: String,
    seaport_exchange: Address,
    zeroex_exchange: Address,
    permit_module: Address,
}

/// ZeroExV4 exchange proxy (mainnet), read for hash nonces.
const ZEROEX_EXCHANGE: Address =
    alloy_primitives::address!("def1c0ded9bec7f1a1670819833240f027b25eff");

impl RpcChainReader {
    pub fn new(rpc_url: String, book: &AddressBook) -> Self {
        Self {
            rpc_url,
            seaport_exchange: book.seaport_exchange,
            zeroex_exchange: ZEROEX_EXCHANGE,
            permit_module: book.permit_module,
        }
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
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn seaport_counter(&self, maker: Address) -> Result<U256, BuildError> {
        let calldata = ISeaportCounter::getCounterCall { offerer: maker }.abi_encode();
        let output = self.call_contract(self.seaport_exchange, calldata).await?;

        let counter = ISeaportCounter::getCounterCall::abi_decode_returns(&output)
            .map_err(|e| BuildError::ChainRead(format!("bad counter response: {}", e)))?;

        debug!("seaport counter for {}: {}", maker, counter);
        Ok(counter)
    }

    async fn zeroex_nonce(&self, maker: Address) -> Result<U256, BuildError> {
        let calldata = IZeroExV4Nonces::getHashNonceCall { maker }.abi_encode();
        let output = self.call_contract(self.zeroex_exchange, calldata).await?;

        IZeroExV4Nonces::getHashNonceCall::abi_decode_returns(&output)
            .map_err(|e| BuildError::ChainRead(format!("bad nonce response: {}", e)))
    }

    async fn permit_nonce(&self, owner: Address) -> Result<U256, BuildError> {
        let calldata = IPermitNonces::noncesCall { owner }.abi_encode();
        let output = self.call_contract(self.permit_module, calldata).await?;

        IPermitNonces::noncesCall::abi_decode_returns(&output)
            .map_err(|e| BuildError::ChainRead(format!("bad nonce response: {}", e)))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, BuildError> {
        let calldata = IERC20Metadata::decimalsCall {}.abi_encode();
        let output = self.call_contract(token, calldata).await?;

        IERC20Metadata::decimalsCall::abi_decode_returns(&output)
            .map_err(|e| BuildError::ChainRead(format!("bad decimals response: {}", e)))
    }
}
