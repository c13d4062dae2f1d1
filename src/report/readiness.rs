use crate::error::Result;
use crate::storage::{Strategy, StrategyDb};
use crate::utils::clock::days_ago_ms;
use crate::utils::constants::{READY_MIN_RECORDS, READY_WINDOW_DAYS, RECENT_WINDOW_DAYS};

/// How much recent performance data one strategy has.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Readiness {
    pub index: u32,
    pub name: String,
    pub total: u64,
    pub last_30d: u64,
    pub last_7d: u64,
    pub latest_ms: Option<u64>,
    pub ready: bool,
}

pub fn is_ready(last_30d: u64) -> bool {
    last_30d >= READY_MIN_RECORDS
}

pub fn readiness(db: &StrategyDb, strategy: &Strategy, now_ms: u64) -> Result<Readiness> {
    let last_30d = db.performance_count(
        strategy.address,
        Some(days_ago_ms(now_ms, READY_WINDOW_DAYS)),
    )?;
    Ok(Readiness {
        index: strategy.index,
        name: strategy.name.clone(),
        total: db.performance_count(strategy.address, None)?,
        last_30d,
        last_7d: db.performance_count(
            strategy.address,
            Some(days_ago_ms(now_ms, RECENT_WINDOW_DAYS)),
        )?,
        latest_ms: db.latest_performance_ms(strategy.address)?,
        ready: is_ready(last_30d),
    })
}

/// Readiness of every active strategy, by index.
pub fn active_readiness(db: &StrategyDb, now_ms: u64) -> Result<Vec<Readiness>> {
    db.active_strategies()?
        .iter()
        .map(|strategy| readiness(db, strategy, now_ms))
        .collect()
}
