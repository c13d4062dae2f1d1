use crate::error::{Result, StoreError};
use crate::storage::records::{PerformanceSample, RiskLevel, Strategy};
use alloy::primitives::Address;
use rusqlite::ffi::ErrorCode;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub(crate) const COLLECTIONS: [&str; 4] = ["strategies", "performance", "recommendations", "agent_nonces"];

const MAX_LOCK_RETRIES: u32 = 6;
const BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StrategyCounts {
    pub total: u64,
    pub active: u64,
}

impl StrategyCounts {
    pub fn inactive(self) -> u64 {
        self.total.saturating_sub(self.active)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupCounts {
    pub strategies: u64,
    pub performance: u64,
    pub recommendations: u64,
    pub nonces: u64,
}

/// Handle to the strategy store. Cheap to clone; every call opens its own connection.
#[derive(Debug, Clone)]
pub struct StrategyDb {
    path: PathBuf,
}

impl StrategyDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let db = Self { path };
        db.ping()?;
        db.ensure_schema()?;
        Ok(db)
    }

    /// Open a store that must already exist. Nothing is created, so a mistyped location
    /// is reported as unavailable instead of turning into a fresh empty store.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StoreError::Unavailable(format!("no store at {}", path.display())).into());
        }
        let db = Self { path };
        db.ping()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Round-trip a trivial query; any failure here is a connectivity failure.
    pub fn ping(&self) -> Result<()> {
        self.with_connection("ping", |conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .map(|_| ())
            .map_err(|err| match err {
                crate::error::OpsError::Store(StoreError::Query { reason, .. }) => {
                    StoreError::Unavailable(reason).into()
                }
                other => other,
            })
    }

    fn ensure_schema(&self) -> Result<()> {
        self.with_connection("ensure_schema", |conn| {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS strategies (
                    idx INTEGER NOT NULL,
                    address TEXT NOT NULL,
                    name TEXT NOT NULL,
                    protocol TEXT NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    allocation_bps INTEGER NOT NULL DEFAULT 0,
                    risk_level TEXT NOT NULL DEFAULT 'medium',
                    created_at_ms INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS performance (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    strategy_address TEXT NOT NULL,
                    timestamp_ms INTEGER NOT NULL,
                    total_value REAL NOT NULL,
                    apy REAL NOT NULL,
                    volume_24h REAL NOT NULL,
                    users INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recommendations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    status TEXT NOT NULL,
                    nonce TEXT NOT NULL,
                    signer TEXT,
                    signature TEXT NOT NULL,
                    submitted INTEGER NOT NULL DEFAULT 0,
                    payload_json TEXT NOT NULL DEFAULT '{}',
                    timestamp_ms INTEGER NOT NULL,
                    reason TEXT,
                    expired_at_ms INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_recommendations_status_id ON recommendations(status, id);
                CREATE INDEX IF NOT EXISTS idx_recommendations_timestamp ON recommendations(timestamp_ms);

                CREATE TABLE IF NOT EXISTS agent_nonces (
                    agent TEXT PRIMARY KEY NOT NULL,
                    nonce TEXT NOT NULL,
                    synced_at_ms INTEGER NOT NULL,
                    source TEXT NOT NULL
                );
                "#,
            )
        })
    }

    /// Lookup indexes for the strategy and performance collections.
    pub fn ensure_indexes(&self) -> Result<()> {
        self.with_connection("ensure_indexes", |conn| {
            conn.execute_batch(
                r#"
                CREATE INDEX IF NOT EXISTS idx_strategies_address ON strategies(address);
                CREATE INDEX IF NOT EXISTS idx_strategies_active ON strategies(active);
                CREATE INDEX IF NOT EXISTS idx_strategies_idx ON strategies(idx);
                CREATE INDEX IF NOT EXISTS idx_performance_strategy ON performance(strategy_address);
                CREATE INDEX IF NOT EXISTS idx_performance_timestamp ON performance(timestamp_ms DESC);
                CREATE INDEX IF NOT EXISTS idx_performance_strategy_timestamp
                    ON performance(strategy_address, timestamp_ms DESC);
                "#,
            )
        })
    }

    /// Row count per collection, in a fixed order.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, u64)>> {
        self.with_connection("table_counts", |conn| {
            let mut out = Vec::with_capacity(COLLECTIONS.len());
            for table in COLLECTIONS {
                let count: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
                out.push((table, to_u64(count)));
            }
            Ok(out)
        })
    }

    pub fn strategy_counts(&self) -> Result<StrategyCounts> {
        self.with_connection("strategy_counts", |conn| {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN active = 1 THEN 1 ELSE 0 END), 0) FROM strategies",
                [],
                |row| {
                    Ok(StrategyCounts {
                        total: to_u64(row.get(0)?),
                        active: to_u64(row.get(1)?),
                    })
                },
            )
        })
    }

    pub fn strategies_by_index(&self) -> Result<Vec<Strategy>> {
        self.query_strategies("strategies_by_index", "ORDER BY idx ASC")
    }

    pub fn active_strategies(&self) -> Result<Vec<Strategy>> {
        self.query_strategies("active_strategies", "WHERE active = 1 ORDER BY idx ASC")
    }

    fn query_strategies(&self, context: &str, tail: &str) -> Result<Vec<Strategy>> {
        let sql = format!(
            "SELECT idx, address, name, protocol, active, allocation_bps, risk_level, created_at_ms FROM strategies {tail}"
        );
        self.with_connection(context, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], strategy_from_row)?;
            let strategies = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(strategies)
        })
    }

    pub fn insert_strategies(&self, strategies: &[Strategy]) -> Result<usize> {
        self.with_connection("insert_strategies", |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO strategies (idx, address, name, protocol, active, allocation_bps, risk_level, created_at_ms)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for strategy in strategies {
                    stmt.execute(params![
                        strategy.index,
                        format!("{:#x}", strategy.address),
                        strategy.name,
                        strategy.protocol,
                        strategy.active,
                        strategy.allocation_bps,
                        strategy.risk_level.as_str(),
                        to_i64(strategy.created_at_ms),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(strategies.len())
        })
    }

    pub fn clear_strategies(&self) -> Result<u64> {
        self.delete_all("strategies")
    }

    pub fn insert_performance(&self, samples: &[PerformanceSample]) -> Result<usize> {
        self.with_connection("insert_performance", |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO performance (strategy_address, timestamp_ms, total_value, apy, volume_24h, users)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for sample in samples {
                    stmt.execute(params![
                        format!("{:#x}", sample.strategy_address),
                        to_i64(sample.timestamp_ms),
                        sample.total_value,
                        sample.apy,
                        sample.volume_24h,
                        sample.users,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(samples.len())
        })
    }

    pub fn clear_performance(&self) -> Result<u64> {
        self.delete_all("performance")
    }

    pub fn performance_total(&self) -> Result<u64> {
        self.with_connection("performance_total", |conn| {
            conn.query_row("SELECT COUNT(*) FROM performance", [], |row| row.get::<_, i64>(0))
        })
        .map(to_u64)
    }

    /// Samples for one strategy, optionally only those at or after `since_ms`.
    pub fn performance_count(&self, address: Address, since_ms: Option<u64>) -> Result<u64> {
        let address_hex = format!("{address:#x}");
        let since = since_ms.map(to_i64).unwrap_or(i64::MIN);
        self.with_connection("performance_count", |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM performance WHERE strategy_address = ?1 AND timestamp_ms >= ?2",
                params![address_hex, since],
                |row| row.get::<_, i64>(0),
            )
        })
        .map(to_u64)
    }

    pub fn latest_performance_ms(&self, address: Address) -> Result<Option<u64>> {
        let address_hex = format!("{address:#x}");
        let latest = self.with_connection("latest_performance_ms", |conn| {
            conn.query_row(
                "SELECT MAX(timestamp_ms) FROM performance WHERE strategy_address = ?1",
                params![address_hex],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
        })?;
        Ok(latest.flatten().map(to_u64))
    }

    /// Empty every collection.
    pub fn cleanup(&self) -> Result<CleanupCounts> {
        Ok(CleanupCounts {
            strategies: self.delete_all("strategies")?,
            performance: self.delete_all("performance")?,
            recommendations: self.delete_all("recommendations")?,
            nonces: self.delete_all("agent_nonces")?,
        })
    }

    fn delete_all(&self, table: &'static str) -> Result<u64> {
        self.with_connection("delete_all", |conn| conn.execute(&format!("DELETE FROM {table}"), []))
            .map(|n| n as u64)
    }

    pub(crate) fn with_connection<T, F>(&self, context: &str, mut op: F) -> Result<T>
    where
        F: FnMut(&mut Connection) -> rusqlite::Result<T>,
    {
        let mut last_err = String::new();

        for attempt in 1..=MAX_LOCK_RETRIES {
            let mut conn = Connection::open(&self.path).map_err(|e| {
                StoreError::Unavailable(format!("failed to open {}: {e}", self.path.display()))
            })?;
            conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
                .map_err(|e| StoreError::Unavailable(format!("failed to set busy timeout: {e}")))?;

            match op(&mut conn) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_err = err.to_string();
                    if is_sqlite_locked_error(&err) && attempt < MAX_LOCK_RETRIES {
                        tracing::debug!("{context} hit a locked database (attempt {attempt}), retrying");
                        continue;
                    }
                    if matches!(err, rusqlite::Error::FromSqlConversionFailure(..)) {
                        return Err(StoreError::Corrupt {
                            context: context.to_string(),
                            reason: last_err,
                        }
                        .into());
                    }
                    return Err(StoreError::Query {
                        context: format!("{context} on {}", self.path.display()),
                        reason: last_err,
                    }
                    .into());
                }
            }
        }

        Err(StoreError::Query {
            context: format!("{context} on {}", self.path.display()),
            reason: format!("still locked after {MAX_LOCK_RETRIES} attempt(s): {last_err}"),
        }
        .into())
    }
}

fn strategy_from_row(row: &Row<'_>) -> rusqlite::Result<Strategy> {
    let address_raw: String = row.get(1)?;
    let address = Address::from_str(address_raw.trim()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let risk_raw: String = row.get(6)?;
    Ok(Strategy {
        index: row.get(0)?,
        address,
        name: row.get(2)?,
        protocol: row.get(3)?,
        active: row.get(4)?,
        allocation_bps: row.get(5)?,
        risk_level: RiskLevel::from_db(&risk_raw),
        created_at_ms: to_u64(row.get(7)?),
    })
}

fn is_sqlite_locked_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        }
        _ => {
            let msg = err.to_string().to_ascii_lowercase();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
    }
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) fn temp_db_path(prefix: &str) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("{prefix}_{nanos}_{seq}.db"))
    }

    fn strategy(index: u32, byte: u8, active: bool) -> Strategy {
        Strategy {
            index,
            address: Address::from([byte; 20]),
            name: format!("Strategy {index}"),
            protocol: "Aave".to_string(),
            active,
            allocation_bps: 2_500,
            risk_level: RiskLevel::Low,
            created_at_ms: 1_000,
        }
    }

    #[test]
    fn test_open_creates_schema_and_counts_start_empty() {
        let path = temp_db_path("strategy_db_open");
        let db = StrategyDb::open(&path).expect("db open");
        let counts = db.table_counts().expect("counts");
        assert_eq!(
            counts,
            vec![
                ("strategies", 0),
                ("performance", 0),
                ("recommendations", 0),
                ("agent_nonces", 0)
            ]
        );
        db.ensure_indexes().expect("indexes");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_open_existing_never_creates() {
        let dir = temp_db_path("strategy_db_missing_dir").with_extension("");
        let path = dir.join("defi_strategies.db");
        let err = StrategyDb::open_existing(&path).expect_err("missing store");
        assert!(err.is_connectivity_failure(), "{err}");
        assert!(!dir.exists());

        let real = temp_db_path("strategy_db_existing");
        StrategyDb::open(&real).expect("create");
        let db = StrategyDb::open_existing(&real).expect("reopen");
        assert_eq!(db.strategy_counts().expect("counts"), StrategyCounts::default());
        let _ = std::fs::remove_file(real);
    }

    #[test]
    fn test_strategies_round_trip_and_active_filter() {
        let path = temp_db_path("strategy_db_strategies");
        let db = StrategyDb::open(&path).expect("db open");
        db.insert_strategies(&[strategy(1, 0x22, false), strategy(0, 0x11, true)])
            .expect("insert");

        let all = db.strategies_by_index().expect("all");
        assert_eq!(all.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(all[0], strategy(0, 0x11, true));

        let active = db.active_strategies().expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(
            db.strategy_counts().expect("counts"),
            StrategyCounts { total: 2, active: 1 }
        );
        assert_eq!(db.clear_strategies().expect("clear"), 2);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_performance_windows_and_latest() {
        let path = temp_db_path("strategy_db_performance");
        let db = StrategyDb::open(&path).expect("db open");
        let addr = Address::from([0x33; 20]);
        let samples: Vec<_> = [100u64, 200, 300]
            .into_iter()
            .map(|ts| PerformanceSample {
                strategy_address: addr,
                timestamp_ms: ts,
                total_value: 100_000.0,
                apy: 0.1,
                volume_24h: 60_000.0,
                users: 150,
            })
            .collect();
        db.insert_performance(&samples).expect("insert");

        assert_eq!(db.performance_total().expect("total"), 3);
        assert_eq!(db.performance_count(addr, None).expect("all"), 3);
        assert_eq!(db.performance_count(addr, Some(200)).expect("window"), 2);
        assert_eq!(db.latest_performance_ms(addr).expect("latest"), Some(300));
        assert_eq!(
            db.latest_performance_ms(Address::from([0x44; 20])).expect("none"),
            None
        );

        let cleaned = db.cleanup().expect("cleanup");
        assert_eq!(cleaned.performance, 3);
        assert_eq!(db.performance_total().expect("total"), 0);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_open_reports_unavailable_for_unusable_path() {
        let blocker = temp_db_path("strategy_db_blocker");
        std::fs::write(&blocker, b"not a directory").expect("write blocker");
        // The parent "directory" is a regular file, so the store can never be created.
        let err = StrategyDb::open(blocker.join("store.db")).expect_err("parent is a file");
        assert!(err.is_connectivity_failure(), "unexpected error: {err}");
        let _ = std::fs::remove_file(blocker);
    }
}
