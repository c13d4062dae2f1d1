use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpsError>;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("chain error: {0}")]
    Net(#[from] RpcError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl OpsError {
    /// True when either endpoint could not be reached at all. Callers abort on these
    /// before anything is written.
    pub fn is_connectivity_failure(&self) -> bool {
        match self {
            OpsError::Net(err) => matches!(
                err,
                RpcError::InvalidUrl { .. } | RpcError::Unreachable(_) | RpcError::Timeout { .. }
            ),
            OpsError::Store(err) => matches!(err, StoreError::Unavailable(_)),
            OpsError::Config(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("rpc `{method}` timed out after {waited_ms}ms")]
    Timeout { method: String, waited_ms: u64 },
    #[error("contract call failed: {0}")]
    CallFailed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{context} failed: {reason}")]
    Query { context: String, reason: String },
    #[error("corrupt value in {context}: {reason}")]
    Corrupt { context: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingConfig(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        let unreachable: OpsError = RpcError::Unreachable("connection refused".into()).into();
        assert!(unreachable.is_connectivity_failure());

        let store_down: OpsError = StoreError::Unavailable("disk gone".into()).into();
        assert!(store_down.is_connectivity_failure());

        let reverted: OpsError = RpcError::CallFailed("execution reverted".into()).into();
        assert!(!reverted.is_connectivity_failure());

        let missing: OpsError = ConfigError::MissingConfig("RPC_URL must be set".into()).into();
        assert!(!missing.is_connectivity_failure());
        assert_eq!(
            missing.to_string(),
            "config error: missing required configuration: RPC_URL must be set"
        );
    }
}
