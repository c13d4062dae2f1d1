//! Authoritative nonce reads from the strategy manager contract.

use crate::error::{Result, RpcError};
use crate::utils::config::ChainConfig;
use crate::utils::error::compact_error_message;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::http::Http;
use alloy::transports::{RpcError as TransportRpcError, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const RPC_ERR_MAX_LEN: usize = 260;

pub type HttpProvider = RootProvider<Http<Client>>;

alloy::sol! {
    interface IStrategyManager {
        function getAgentNonce(address agent) external view returns (uint256 nonce);
    }
}

/// Where the reconciler reads the authoritative counter from.
#[async_trait]
pub trait NonceSource: Send + Sync {
    async fn agent_nonce(&self, agent: Address) -> Result<U256>;
}

pub struct ContractNonceSource {
    provider: HttpProvider,
    contract: Address,
    timeout_ms: u64,
}

impl ContractNonceSource {
    pub fn new(rpc_url: &str, contract: Address, timeout_ms: u64) -> Result<Self> {
        let url = rpc_url.parse::<reqwest::Url>().map_err(|e| RpcError::InvalidUrl {
            url: rpc_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            contract,
            timeout_ms,
        })
    }

    pub fn from_config(chain: &ChainConfig) -> Result<Self> {
        Self::new(&chain.rpc_url, chain.contract_address, chain.rpc_call_timeout_ms)
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Connectivity probe; any failure here means the endpoint is unusable.
    pub async fn chain_id(&self) -> Result<u64> {
        let chain_id = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            self.provider.get_chain_id(),
        )
        .await
        .map_err(|_| RpcError::Timeout {
            method: "eth_chainId".to_string(),
            waited_ms: self.timeout_ms,
        })?
        .map_err(|err| {
            RpcError::Unreachable(compact_error_message(&err.to_string(), RPC_ERR_MAX_LEN))
        })?;
        Ok(chain_id)
    }

    async fn eth_call(&self, input: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default()
            .with_to(self.contract)
            .with_input(input);
        let raw = tokio::time::timeout(
            Duration::from_millis(self.timeout_ms),
            self.provider.call(&request),
        )
        .await
        .map_err(|_| RpcError::Timeout {
            method: "eth_call".to_string(),
            waited_ms: self.timeout_ms,
        })?
        .map_err(|err| classify_transport_error(self.contract, err))?;
        Ok(raw)
    }
}

#[async_trait]
impl NonceSource for ContractNonceSource {
    async fn agent_nonce(&self, agent: Address) -> Result<U256> {
        let call = IStrategyManager::getAgentNonceCall { agent };
        let raw = self.eth_call(Bytes::from(call.abi_encode())).await?;
        let decoded =
            <IStrategyManager::getAgentNonceCall as SolCall>::abi_decode_returns(raw.as_ref(), true)
                .map_err(|err| {
                    RpcError::CallFailed(format!(
                        "getAgentNonce({agent:#x}) returned undecodable data from {:#x} ({} bytes): {err}",
                        self.contract,
                        raw.len()
                    ))
                })?;
        tracing::debug!("getAgentNonce({agent:#x}) = {}", decoded.nonce);
        Ok(decoded.nonce)
    }
}

/// JSON-RPC error responses mean the node answered (revert, bad params); anything else
/// means we never got a usable answer.
fn classify_transport_error(contract: Address, err: TransportError) -> RpcError {
    match err {
        TransportRpcError::ErrorResp(payload) => RpcError::CallFailed(format!(
            "eth_call to {contract:#x} rejected: {}",
            compact_error_message(&payload.to_string(), RPC_ERR_MAX_LEN)
        )),
        TransportRpcError::DeserError { err, .. } => RpcError::CallFailed(format!(
            "eth_call to {contract:#x} returned an unreadable response: {err}"
        )),
        other => RpcError::Unreachable(compact_error_message(&other.to_string(), RPC_ERR_MAX_LEN)),
    }
}
