/// A strategy is ready for prediction with at least this many samples in the readiness window.
pub const READY_MIN_RECORDS: u64 = 10;

/// Readiness window, in days.
pub const READY_WINDOW_DAYS: i64 = 30;

/// Short window shown next to the readiness window in the debug report.
pub const RECENT_WINDOW_DAYS: i64 = 7;

pub const DAY_MS: u64 = 86_400_000;

/// Seeding floors; generated values never drop below these.
pub const MIN_TOTAL_VALUE: f64 = 10_000.0;
pub const MIN_APY: f64 = 0.0;

/// Written to `agent_nonces.source` when the cached counter is copied from chain.
pub const NONCE_SOURCE_BLOCKCHAIN: &str = "blockchain";

pub const DEFAULT_STORE_URI: &str = "./data";
pub const DEFAULT_STORE_NAME: &str = "defi_strategies";
pub const DEFAULT_RPC_CALL_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RECONCILE_PAGE_SIZE: usize = 256;
