//! `agent_nonces` and `recommendations`: the two collections the nonce reconciler writes.

use crate::error::{Result, StoreError};
use crate::storage::records::{
    parse_nonce, NewRecommendation, NonceRecord, Recommendation, RecommendationStatus,
    StalePending,
};
use crate::storage::strategy_db::{to_i64, to_u64, StrategyDb};
use alloy::primitives::{Address, U256};
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;

const RECOMMENDATION_COLUMNS: &str =
    "id, status, nonce, signer, signature, submitted, payload_json, timestamp_ms, reason, expired_at_ms";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RecommendationCounts {
    pub total: u64,
    pub pending: u64,
    pub submitted: u64,
}

impl StrategyDb {
    pub fn nonce_record(&self, agent: Address) -> Result<Option<NonceRecord>> {
        let agent_hex = format!("{agent:#x}");
        let raw = self.with_connection("nonce_record", |conn| {
            conn.query_row(
                "SELECT nonce, synced_at_ms, source FROM agent_nonces WHERE agent = ?1 LIMIT 1",
                params![agent_hex],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
        })?;

        let Some((nonce_raw, synced_at_ms, source)) = raw else {
            return Ok(None);
        };
        let nonce = parse_nonce(&nonce_raw).ok_or_else(|| StoreError::Corrupt {
            context: format!("agent_nonces[{agent_hex}]"),
            reason: format!("nonce `{nonce_raw}` is not a decimal uint256"),
        })?;
        Ok(Some(NonceRecord {
            agent,
            nonce,
            synced_at_ms: to_u64(synced_at_ms),
            source,
        }))
    }

    /// Insert or overwrite the cached nonce for `record.agent`.
    pub fn upsert_nonce(&self, record: &NonceRecord) -> Result<()> {
        let agent_hex = format!("{:#x}", record.agent);
        let nonce = record.nonce.to_string();
        self.with_connection("upsert_nonce", |conn| {
            conn.execute(
                "INSERT INTO agent_nonces (agent, nonce, synced_at_ms, source)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(agent) DO UPDATE SET
                    nonce = excluded.nonce,
                    synced_at_ms = excluded.synced_at_ms,
                    source = excluded.source",
                params![agent_hex, nonce, to_i64(record.synced_at_ms), record.source],
            )
        })?;
        Ok(())
    }

    pub fn insert_recommendation(&self, rec: &NewRecommendation) -> Result<i64> {
        let signer = rec.signer.map(|addr| format!("{addr:#x}"));
        let payload = rec.payload.to_string();
        let nonce = rec.nonce.to_string();
        self.with_connection("insert_recommendation", |conn| {
            conn.execute(
                "INSERT INTO recommendations (status, nonce, signer, signature, submitted, payload_json, timestamp_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    rec.status.as_str(),
                    nonce,
                    signer,
                    rec.signature,
                    rec.submitted,
                    payload,
                    to_i64(rec.timestamp_ms),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn recommendation(&self, id: i64) -> Result<Option<Recommendation>> {
        let sql = format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE id = ?1");
        self.with_connection("recommendation", |conn| {
            conn.query_row(&sql, params![id], recommendation_from_row)
                .optional()
        })
    }

    /// One page of `pending` recommendations whose nonce differs from `current`, strictly
    /// after `after_id`, in id order. Callers walk the set by feeding back the last id seen.
    pub fn stale_pending_page(
        &self,
        current: U256,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<StalePending>> {
        let current = current.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_connection("stale_pending_page", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, nonce FROM recommendations
                 WHERE status = 'pending' AND nonce != ?1 AND id > ?2
                 ORDER BY id ASC LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![current, after_id, limit], |row| {
                Ok(StalePending {
                    id: row.get(0)?,
                    nonce_raw: row.get(1)?,
                })
            })?;
            let page = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(page)
        })
    }

    /// Move one recommendation from `pending` to `expired`. Returns `false` when the row is
    /// gone or no longer pending, so a concurrent run cannot overwrite a newer status.
    pub fn expire_recommendation(&self, id: i64, reason: &str, expired_at_ms: u64) -> Result<bool> {
        let changed = self.with_connection("expire_recommendation", |conn| {
            conn.execute(
                "UPDATE recommendations
                 SET status = 'expired', reason = ?2, expired_at_ms = ?3
                 WHERE id = ?1 AND status = 'pending'",
                params![id, reason, to_i64(expired_at_ms)],
            )
        })?;
        Ok(changed > 0)
    }

    pub fn recommendation_counts(&self) -> Result<RecommendationCounts> {
        self.with_connection("recommendation_counts", |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN submitted = 1 THEN 1 ELSE 0 END), 0)
                 FROM recommendations",
                [],
                |row| {
                    Ok(RecommendationCounts {
                        total: to_u64(row.get(0)?),
                        pending: to_u64(row.get(1)?),
                        submitted: to_u64(row.get(2)?),
                    })
                },
            )
        })
    }

    /// Newest first.
    pub fn recent_recommendations(&self, limit: usize) -> Result<Vec<Recommendation>> {
        let sql = format!(
            "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations ORDER BY timestamp_ms DESC, id DESC LIMIT ?1"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_connection("recent_recommendations", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], recommendation_from_row)?;
            let recent = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(recent)
        })
    }
}

fn recommendation_from_row(row: &Row<'_>) -> rusqlite::Result<Recommendation> {
    let status: String = row.get(1)?;
    let payload_raw: String = row.get(6)?;
    // Written by the external signer; unreadable JSON is surfaced verbatim as a string.
    let payload = serde_json::from_str(&payload_raw).unwrap_or(Value::String(payload_raw));
    Ok(Recommendation {
        id: row.get(0)?,
        status: RecommendationStatus::from_db(&status),
        nonce_raw: row.get(2)?,
        signer: row.get(3)?,
        signature: row.get(4)?,
        submitted: row.get(5)?,
        payload,
        timestamp_ms: to_u64(row.get(7)?),
        reason: row.get(8)?,
        expired_at_ms: row.get::<_, Option<i64>>(9)?.map(to_u64),
    })
}
