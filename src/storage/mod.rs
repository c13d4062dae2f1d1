pub mod nonce_ledger;
pub mod records;
pub mod strategy_db;

pub use nonce_ledger::RecommendationCounts;
pub use records::{
    NewRecommendation, NonceRecord, PerformanceSample, Recommendation, RecommendationStatus,
    RiskLevel, StalePending, Strategy,
};
pub use strategy_db::{CleanupCounts, StrategyCounts, StrategyDb};
