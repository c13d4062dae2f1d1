use crate::error::{ConfigError, Result};
use crate::utils::constants::{
    DEFAULT_RECONCILE_PAGE_SIZE, DEFAULT_RPC_CALL_TIMEOUT_MS, DEFAULT_STORE_NAME,
    DEFAULT_STORE_URI,
};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Everything the maintenance binaries read from the environment, resolved once at startup.
/// Chain settings stay raw here; `chain()` validates them for the tools that need them.
#[derive(Clone)]
pub struct Config {
    pub store_uri: String,
    pub store_name: String,
    pub rpc_url: Option<String>,
    signing_key: Option<String>,
    pub contract_address: Option<String>,
    pub rpc_call_timeout_ms: u64,
    pub reconcile_page_size: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store_uri", &self.store_uri)
            .field("store_name", &self.store_name)
            .field("rpc_url", &self.rpc_url)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("contract_address", &self.contract_address)
            .field("rpc_call_timeout_ms", &self.rpc_call_timeout_ms)
            .field("reconcile_page_size", &self.reconcile_page_size)
            .finish()
    }
}

/// Validated chain-side settings for the nonce reconciler.
#[derive(Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    pub rpc_call_timeout_ms: u64,
    signer: PrivateKeySigner,
}

impl ChainConfig {
    /// The agent whose nonce is reconciled: the address of the configured signing key.
    pub fn agent_address(&self) -> Address {
        self.signer.address()
    }
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("rpc_call_timeout_ms", &self.rpc_call_timeout_ms)
            .field("agent", &self.agent_address())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_http_url(name: &str, raw: &str) -> Result<()> {
    let parsed = raw.parse::<reqwest::Url>().map_err(|e| {
        ConfigError::InvalidConfig(format!("{name} must be a valid URL, got `{raw}`: {e}"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidConfig(format!(
            "{name} must use http(s) scheme, got `{other}`"
        ))
        .into()),
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_uri =
            non_empty(lookup("STORE_URI")).unwrap_or_else(|| DEFAULT_STORE_URI.to_string());
        let store_name =
            non_empty(lookup("STORE_NAME")).unwrap_or_else(|| DEFAULT_STORE_NAME.to_string());
        if store_name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidConfig(format!(
                "STORE_NAME must be a bare name, got `{store_name}`"
            ))
            .into());
        }

        let rpc_call_timeout_ms = match non_empty(lookup("RPC_CALL_TIMEOUT_MS")) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|v| (250..=60_000).contains(v))
                .ok_or_else(|| {
                    ConfigError::InvalidConfig(format!(
                        "RPC_CALL_TIMEOUT_MS must be within 250..=60000, got `{raw}`"
                    ))
                })?,
            None => DEFAULT_RPC_CALL_TIMEOUT_MS,
        };

        let reconcile_page_size = match non_empty(lookup("RECONCILE_PAGE_SIZE")) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidConfig(format!(
                        "RECONCILE_PAGE_SIZE must be a positive integer, got `{raw}`"
                    ))
                })?,
            None => DEFAULT_RECONCILE_PAGE_SIZE,
        };

        Ok(Self {
            store_uri,
            store_name,
            rpc_url: non_empty(lookup("RPC_URL")),
            signing_key: non_empty(lookup("PRIVATE_KEY")),
            contract_address: non_empty(lookup("STRATEGY_MANAGER_ADDRESS")),
            rpc_call_timeout_ms,
            reconcile_page_size,
        })
    }

    /// Resolve the SQLite file backing the store. `STORE_URI` is a directory (optionally
    /// written as `sqlite://<dir>`) or a direct path to a `.db` file.
    pub fn store_path(&self) -> Result<PathBuf> {
        let raw = self.store_uri.trim();
        let location = match raw.split_once("://") {
            Some(("sqlite", rest)) => rest,
            Some((scheme, _)) => {
                return Err(ConfigError::InvalidConfig(format!(
                    "STORE_URI scheme `{scheme}` is not supported (use a path or sqlite://<path>)"
                ))
                .into())
            }
            None => raw,
        };
        if location.is_empty() {
            return Err(ConfigError::InvalidConfig("STORE_URI must not be empty".to_string()).into());
        }

        let path = PathBuf::from(location);
        if path.extension().is_some_and(|ext| ext == "db") {
            return Ok(path);
        }
        Ok(path.join(format!("{}.db", self.store_name)))
    }

    pub fn chain(&self) -> Result<ChainConfig> {
        let rpc_url = self
            .rpc_url
            .clone()
            .ok_or_else(|| ConfigError::MissingConfig("RPC_URL must be set".to_string()))?;
        validate_http_url("RPC_URL", &rpc_url)?;

        let raw_key = self
            .signing_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingConfig("PRIVATE_KEY must be set".to_string()))?;
        if !crate::utils::hex::is_hex_of_len(raw_key, 32) {
            return Err(ConfigError::InvalidConfig(
                "PRIVATE_KEY must be 32 bytes of hex (optionally 0x-prefixed)".to_string(),
            )
            .into());
        }
        let signer = PrivateKeySigner::from_str(crate::utils::hex::clean_hex(raw_key))
            .map_err(|e| ConfigError::InvalidConfig(format!("PRIVATE_KEY is not a valid key: {e}")))?;

        let raw_contract = self.contract_address.as_deref().ok_or_else(|| {
            ConfigError::MissingConfig("STRATEGY_MANAGER_ADDRESS must be set".to_string())
        })?;
        let contract_address = Address::from_str(raw_contract.trim()).map_err(|e| {
            ConfigError::InvalidConfig(format!(
                "STRATEGY_MANAGER_ADDRESS must be a 0x-prefixed address, got `{raw_contract}`: {e}"
            ))
        })?;

        Ok(ChainConfig {
            rpc_url,
            contract_address,
            rpc_call_timeout_ms: self.rpc_call_timeout_ms,
            signer,
        })
    }
}
