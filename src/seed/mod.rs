//! Development data for the strategy store.

pub mod args;
pub mod generator;

use crate::error::Result;
use crate::report::{active_readiness, Readiness};
use crate::storage::{CleanupCounts, Strategy, StrategyDb};
use rand::Rng;

pub use generator::{generate_performance, sample_strategies, WalkParams, MAX_SAMPLE_STRATEGIES};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExistingData {
    pub strategies: u64,
    pub active: u64,
    pub performance: u64,
}

impl ExistingData {
    pub fn is_empty(&self) -> bool {
        self.strategies == 0 && self.performance == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub rows: Vec<Readiness>,
}

impl Verification {
    /// Ready only when there is at least one active strategy and every active strategy
    /// has enough recent samples.
    pub fn all_ready(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.ready)
    }
}

pub struct Seeder {
    db: StrategyDb,
}

impl Seeder {
    pub fn new(db: StrategyDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &StrategyDb {
        &self.db
    }

    pub fn check_existing(&self) -> Result<ExistingData> {
        let counts = self.db.strategy_counts()?;
        Ok(ExistingData {
            strategies: counts.total,
            active: counts.active,
            performance: self.db.performance_total()?,
        })
    }

    pub fn create_strategies(&self, count: usize, clear: bool, now_ms: u64) -> Result<Vec<Strategy>> {
        if clear {
            let removed = self.db.clear_strategies()?;
            tracing::info!("cleared {removed} existing strategies");
        }
        let strategies = sample_strategies(count, now_ms);
        self.db.insert_strategies(&strategies)?;
        Ok(strategies)
    }

    /// Insert a fresh walk for each strategy; returns `(strategy index, samples written)`.
    pub fn populate_performance<R: Rng + ?Sized>(
        &self,
        strategies: &[Strategy],
        days: u32,
        clear: bool,
        now_ms: u64,
        rng: &mut R,
    ) -> Result<Vec<(u32, usize)>> {
        if clear {
            let removed = self.db.clear_performance()?;
            tracing::info!("cleared {removed} existing performance records");
        }
        let mut written = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            let samples = generate_performance(strategy, days, now_ms, rng);
            let n = self.db.insert_performance(&samples)?;
            written.push((strategy.index, n));
        }
        Ok(written)
    }

    pub fn ensure_indexes(&self) -> Result<()> {
        self.db.ensure_indexes()
    }

    pub fn verify(&self, now_ms: u64) -> Result<Verification> {
        Ok(Verification {
            rows: active_readiness(&self.db, now_ms)?,
        })
    }

    pub fn cleanup(&self) -> Result<CleanupCounts> {
        self.db.cleanup()
    }
}
