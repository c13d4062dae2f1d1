use crate::error::Result;
use crate::nonce::source::NonceSource;
use crate::storage::{NonceRecord, StalePending, StrategyDb};
use crate::utils::clock::now_ms;
use crate::utils::constants::{DEFAULT_RECONCILE_PAGE_SIZE, NONCE_SOURCE_BLOCKCHAIN};
use alloy::primitives::{Address, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Cached and on-chain counters already matched; nothing was written.
    InSync,
    /// The cached counter was missing or different and has been overwritten.
    Resynced,
    /// Some stale recommendations could not be expired. The cached counter is left as it
    /// was so the next run sweeps again.
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredRecommendation {
    pub id: i64,
    pub old_nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedExpiry {
    pub id: i64,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub agent: Address,
    pub onchain: U256,
    pub cached: Option<U256>,
    pub outcome: ReconcileOutcome,
    pub expired: Vec<ExpiredRecommendation>,
    pub failed: Vec<FailedExpiry>,
}

impl ReconcileReport {
    /// Distance between the two counters, with a missing cache counted as zero.
    pub fn difference(&self) -> U256 {
        let cached = self.cached.unwrap_or(U256::ZERO);
        if cached >= self.onchain {
            cached - self.onchain
        } else {
            self.onchain - cached
        }
    }
}

pub fn mismatch_reason(old_nonce: &str, onchain: U256) -> String {
    format!("Nonce mismatch (had {old_nonce}, blockchain is {onchain})")
}

/// Brings the cached nonce of one agent back in line with the contract and expires every
/// pending recommendation signed against another nonce.
pub struct NonceReconciler<S> {
    source: S,
    db: StrategyDb,
    page_size: usize,
}

impl<S: NonceSource> NonceReconciler<S> {
    pub fn new(source: S, db: StrategyDb) -> Self {
        Self {
            source,
            db,
            page_size: DEFAULT_RECONCILE_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Every read that can fail on connectivity happens before the first write, so an
    /// unreachable store or chain leaves both collections untouched. The cached counter is
    /// written last and only after every stale pending recommendation is expired; until then
    /// it keeps differing from the chain and a re-run repeats the sweep.
    pub async fn reconcile(&self, agent: Address) -> Result<ReconcileReport> {
        self.db.ping()?;
        let onchain = self.source.agent_nonce(agent).await?;
        let cached = self.db.nonce_record(agent)?.map(|record| record.nonce);

        let mut report = ReconcileReport {
            agent,
            onchain,
            cached,
            outcome: ReconcileOutcome::InSync,
            expired: Vec::new(),
            failed: Vec::new(),
        };

        // A missing record never equals a chain value, so first runs always write.
        if cached == Some(onchain) {
            tracing::info!("nonce for {agent:#x} already in sync at {onchain}");
            return Ok(report);
        }

        self.expire_stale_pending(onchain, &mut report)?;

        if !report.failed.is_empty() {
            report.outcome = ReconcileOutcome::Incomplete;
            tracing::warn!(
                "{} stale recommendation(s) still pending; cached nonce for {agent:#x} left unchanged",
                report.failed.len()
            );
            return Ok(report);
        }

        self.db.upsert_nonce(&NonceRecord {
            agent,
            nonce: onchain,
            synced_at_ms: now_ms(),
            source: NONCE_SOURCE_BLOCKCHAIN.to_string(),
        })?;
        report.outcome = ReconcileOutcome::Resynced;
        tracing::info!(
            "cached nonce for {agent:#x} set to {onchain} (was {})",
            cached.map(|n| n.to_string()).unwrap_or_else(|| "unset".to_string())
        );
        Ok(report)
    }

    fn expire_stale_pending(&self, onchain: U256, report: &mut ReconcileReport) -> Result<()> {
        let mut after_id = 0i64;
        loop {
            let page = self.db.stale_pending_page(onchain, after_id, self.page_size)?;
            tracing::debug!("stale pending page after id {after_id}: {} row(s)", page.len());
            let Some(last) = page.last() else {
                break;
            };
            after_id = last.id;
            let exhausted = page.len() < self.page_size;

            for rec in &page {
                self.expire_one(rec, onchain, report);
            }
            if exhausted {
                break;
            }
        }
        Ok(())
    }

    fn expire_one(&self, rec: &StalePending, onchain: U256, report: &mut ReconcileReport) {
        let old_nonce = match rec.nonce() {
            // Same value written in a non-canonical form; it is not stale.
            Some(parsed) if parsed == onchain => return,
            Some(parsed) => parsed.to_string(),
            None => rec.nonce_raw.clone(),
        };
        let reason = mismatch_reason(&old_nonce, onchain);

        match self.db.expire_recommendation(rec.id, &reason, now_ms()) {
            Ok(true) => {
                tracing::info!("recommendation {} expired: {reason}", rec.id);
                report.expired.push(ExpiredRecommendation {
                    id: rec.id,
                    old_nonce,
                });
            }
            Ok(false) => {
                tracing::debug!("recommendation {} left pending state before expiry", rec.id);
            }
            Err(err) => {
                tracing::warn!("failed to expire recommendation {}: {err}", rec.id);
                report.failed.push(FailedExpiry {
                    id: rec.id,
                    error: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(onchain: u64, cached: Option<u64>) -> ReconcileReport {
        ReconcileReport {
            agent: Address::ZERO,
            onchain: U256::from(onchain),
            cached: cached.map(U256::from),
            outcome: ReconcileOutcome::Resynced,
            expired: Vec::new(),
            failed: Vec::new(),
        }
    }

    #[test]
    fn test_difference_is_absolute_and_treats_missing_as_zero() {
        assert_eq!(report(7, Some(5)).difference(), U256::from(2u64));
        assert_eq!(report(5, Some(7)).difference(), U256::from(2u64));
        assert_eq!(report(3, None).difference(), U256::from(3u64));
    }

    #[test]
    fn test_mismatch_reason_names_both_counters() {
        assert_eq!(
            mismatch_reason("5", U256::from(7u64)),
            "Nonce mismatch (had 5, blockchain is 7)"
        );
    }
}
