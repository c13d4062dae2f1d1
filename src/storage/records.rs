use alloy::primitives::{Address, U256};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Unknown labels are treated as `Medium`.
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub index: u32,
    pub address: Address,
    pub name: String,
    pub protocol: String,
    pub active: bool,
    /// Basis points; 2500 is a quarter of the vault.
    pub allocation_bps: u32,
    pub risk_level: RiskLevel,
    pub created_at_ms: u64,
}

impl Strategy {
    pub fn allocation_percent(&self) -> f64 {
        f64::from(self.allocation_bps) / 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSample {
    pub strategy_address: Address,
    pub timestamp_ms: u64,
    pub total_value: f64,
    pub apy: f64,
    pub volume_24h: f64,
    pub users: u32,
}

/// Cached copy of an agent's on-chain nonce. One row per agent, overwritten on every sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceRecord {
    pub agent: Address,
    pub nonce: U256,
    pub synced_at_ms: u64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Submitted,
    Expired,
    Other(String),
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Submitted => "submitted",
            RecommendationStatus::Expired => "expired",
            RecommendationStatus::Other(raw) => raw.as_str(),
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value.trim() {
            "pending" => Self::Pending,
            "submitted" => Self::Submitted,
            "expired" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A signed recommendation as stored. `nonce_raw` is kept verbatim so a malformed value can
/// still be reported; `nonce()` is the parsed form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: i64,
    pub status: RecommendationStatus,
    pub nonce_raw: String,
    pub signer: Option<String>,
    pub signature: String,
    pub submitted: bool,
    pub payload: Value,
    pub timestamp_ms: u64,
    pub reason: Option<String>,
    pub expired_at_ms: Option<u64>,
}

impl Recommendation {
    pub fn nonce(&self) -> Option<U256> {
        parse_nonce(&self.nonce_raw)
    }
}

/// The two columns the stale sweep needs. Decoding nothing else keeps one damaged row from
/// hiding the rest of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalePending {
    pub id: i64,
    pub nonce_raw: String,
}

impl StalePending {
    pub fn nonce(&self) -> Option<U256> {
        parse_nonce(&self.nonce_raw)
    }
}

#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub status: RecommendationStatus,
    pub nonce: U256,
    pub signer: Option<Address>,
    pub signature: String,
    pub submitted: bool,
    pub payload: Value,
    pub timestamp_ms: u64,
}

impl NewRecommendation {
    pub fn pending(nonce: U256, signature: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            status: RecommendationStatus::Pending,
            nonce,
            signer: None,
            signature: signature.into(),
            submitted: false,
            payload: Value::Object(Default::default()),
            timestamp_ms,
        }
    }
}

pub(crate) fn parse_nonce(raw: &str) -> Option<U256> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    U256::from_str_radix(trimmed, 10).ok()
}
