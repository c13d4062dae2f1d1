//! Synthetic strategies and daily performance walks.

use crate::storage::{PerformanceSample, RiskLevel, Strategy};
use crate::utils::clock::days_ago_ms;
use crate::utils::constants::{MIN_APY, MIN_TOTAL_VALUE};
use alloy::primitives::{address, Address};
use rand::Rng;
use rand_distr::StandardNormal;

const EVENT_PROBABILITY: f64 = 0.05;
const EVENT_DIP: f64 = -0.03;
const EVENT_SPIKE: f64 = 0.04;

/// Drift and noise of the daily random walk for one risk level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    pub daily_return: f64,
    pub daily_volatility: f64,
    pub trend: f64,
}

impl WalkParams {
    pub fn for_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Low => Self {
                daily_return: 0.0003,
                daily_volatility: 0.005,
                trend: 0.0001,
            },
            RiskLevel::Medium => Self {
                daily_return: 0.0008,
                daily_volatility: 0.015,
                trend: 0.0002,
            },
            RiskLevel::High => Self {
                daily_return: 0.0015,
                daily_volatility: 0.030,
                trend: 0.0005,
            },
        }
    }
}

struct Template {
    address: Address,
    name: &'static str,
    protocol: &'static str,
    risk_level: RiskLevel,
    age_days: i64,
}

const TEMPLATES: [Template; 4] = [
    Template {
        address: address!("1234567890123456789012345678901234567890"),
        name: "Conservative Yield Strategy",
        protocol: "Compound",
        risk_level: RiskLevel::Low,
        age_days: 90,
    },
    Template {
        address: address!("2345678901234567890123456789012345678901"),
        name: "Balanced DeFi Strategy",
        protocol: "Aave",
        risk_level: RiskLevel::Medium,
        age_days: 85,
    },
    Template {
        address: address!("3456789012345678901234567890123456789012"),
        name: "Aggressive Growth Strategy",
        protocol: "Curve",
        risk_level: RiskLevel::High,
        age_days: 80,
    },
    Template {
        address: address!("4567890123456789012345678901234567890123"),
        name: "Stable Farming Strategy",
        protocol: "Yearn",
        risk_level: RiskLevel::Low,
        age_days: 75,
    },
];

pub const MAX_SAMPLE_STRATEGIES: usize = TEMPLATES.len();

/// The fixed sample strategies, each active with an equal 25% allocation.
pub fn sample_strategies(count: usize, now_ms: u64) -> Vec<Strategy> {
    TEMPLATES
        .iter()
        .take(count)
        .enumerate()
        .map(|(index, t)| Strategy {
            index: index as u32,
            address: t.address,
            name: t.name.to_string(),
            protocol: t.protocol.to_string(),
            active: true,
            allocation_bps: 2_500,
            risk_level: t.risk_level,
            created_at_ms: days_ago_ms(now_ms, t.age_days),
        })
        .collect()
}

/// One sample per day for the last `days` days, oldest first, ending today.
pub fn generate_performance<R: Rng + ?Sized>(
    strategy: &Strategy,
    days: u32,
    now_ms: u64,
    rng: &mut R,
) -> Vec<PerformanceSample> {
    let params = WalkParams::for_risk(strategy.risk_level);
    let mut value: f64 = rng.gen_range(95_000.0..105_000.0);
    let mut out = Vec::with_capacity(days as usize);

    for i in 0..days {
        let z: f64 = rng.sample(StandardNormal);
        let daily_return = params.daily_return + params.daily_volatility * z;
        let trend = params.trend * (f64::from(i) / f64::from(days));

        value *= 1.0 + daily_return + trend;
        if rng.gen_bool(EVENT_PROBABILITY) {
            let impact = if rng.gen_bool(0.5) { EVENT_DIP } else { EVENT_SPIKE };
            value *= 1.0 + impact;
        }

        let apy = (daily_return + trend) * 365.0;
        out.push(PerformanceSample {
            strategy_address: strategy.address,
            timestamp_ms: days_ago_ms(now_ms, i64::from(days - i - 1)),
            total_value: value.max(MIN_TOTAL_VALUE),
            apy: apy.max(MIN_APY),
            volume_24h: rng.gen_range(50_000.0..200_000.0),
            users: rng.gen_range(100..=1_000),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::DAY_MS;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const NOW: u64 = 1_709_296_200_000;

    #[test]
    fn test_sample_strategies_truncate_and_age() {
        let all = sample_strategies(10, NOW);
        assert_eq!(all.len(), MAX_SAMPLE_STRATEGIES);
        assert_eq!(all[2].protocol, "Curve");
        assert_eq!(all[2].risk_level, RiskLevel::High);
        assert_eq!(all[0].created_at_ms, NOW - 90 * DAY_MS);
        assert!(all.iter().all(|s| s.active && s.allocation_bps == 2_500));

        let two = sample_strategies(2, NOW);
        assert_eq!(two.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_performance_is_daily_and_ends_today() {
        let strategy = &sample_strategies(1, NOW)[0];
        let mut rng = StdRng::seed_from_u64(7);
        let samples = generate_performance(strategy, 35, NOW, &mut rng);

        assert_eq!(samples.len(), 35);
        assert_eq!(samples[0].timestamp_ms, NOW - 34 * DAY_MS);
        assert_eq!(samples[34].timestamp_ms, NOW);
        assert!(samples
            .windows(2)
            .all(|w| w[1].timestamp_ms - w[0].timestamp_ms == DAY_MS));
        assert!(samples.iter().all(|s| s.strategy_address == strategy.address));
    }

    #[test]
    fn test_generated_values_stay_positive_and_in_range() {
        for (seed, strategy) in sample_strategies(4, NOW).iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(seed as u64);
            for sample in generate_performance(strategy, 400, NOW, &mut rng) {
                assert!(sample.total_value >= MIN_TOTAL_VALUE);
                assert!(sample.apy >= 0.0);
                assert!((50_000.0..200_000.0).contains(&sample.volume_24h));
                assert!((100..=1_000).contains(&sample.users));
            }
        }
    }

    #[test]
    fn test_same_seed_same_walk() {
        let strategy = &sample_strategies(3, NOW)[2];
        let a = generate_performance(strategy, 10, NOW, &mut StdRng::seed_from_u64(42));
        let b = generate_performance(strategy, 10, NOW, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_days_is_empty() {
        let strategy = &sample_strategies(1, NOW)[0];
        assert!(generate_performance(strategy, 0, NOW, &mut StdRng::seed_from_u64(1)).is_empty());
    }
}
