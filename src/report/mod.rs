//! Read-only health report over the strategy store.

pub mod readiness;

use crate::error::{Result, StoreError};
use crate::storage::{
    Recommendation, RecommendationCounts, Strategy, StrategyCounts, StrategyDb,
};
use crate::utils::clock::{format_date, format_minute};
use crate::utils::constants::{READY_MIN_RECORDS, READY_WINDOW_DAYS};
use crate::utils::hex::ellipsize;
use serde::Serialize;
use std::fmt::{self, Write as _};

pub use readiness::{active_readiness, is_ready, readiness, Readiness};

const RECENT_RECOMMENDATIONS: usize = 5;
const RULE_WIDTH: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    NoStrategies,
    NoActiveStrategies,
    NoPerformanceData,
    NoReadyStrategies,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::NoStrategies => write!(f, "No strategies in database"),
            Issue::NoActiveStrategies => {
                write!(f, "No active strategies (all marked as inactive)")
            }
            Issue::NoPerformanceData => write!(f, "No performance data in database"),
            Issue::NoReadyStrategies => write!(
                f,
                "No strategies have enough recent performance data (need >={READY_MIN_RECORDS} records)"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub collections: Vec<(&'static str, u64)>,
    pub strategy_counts: StrategyCounts,
    pub strategies: Vec<Strategy>,
    pub performance_total: u64,
    pub readiness: Vec<Readiness>,
    pub recommendation_counts: RecommendationCounts,
    pub recent: Vec<Recommendation>,
    pub issues: Vec<Issue>,
}

impl DiagnosticReport {
    pub fn ready_count(&self) -> usize {
        self.readiness.iter().filter(|r| r.ready).count()
    }
}

pub fn diagnose(counts: StrategyCounts, performance_total: u64, readiness: &[Readiness]) -> Vec<Issue> {
    let mut issues = Vec::new();
    if counts.total == 0 {
        issues.push(Issue::NoStrategies);
    } else if counts.active == 0 {
        issues.push(Issue::NoActiveStrategies);
    }

    if performance_total == 0 {
        issues.push(Issue::NoPerformanceData);
    } else if counts.active > 0 && !readiness.iter().any(|r| r.ready) {
        issues.push(Issue::NoReadyStrategies);
    }
    issues
}

pub fn build_report(db: &StrategyDb, now_ms: u64) -> Result<DiagnosticReport> {
    let collections = db.table_counts()?;
    let strategy_counts = db.strategy_counts()?;
    let strategies = db.strategies_by_index()?;
    let performance_total = db.performance_total()?;
    let readiness = active_readiness(db, now_ms)?;
    let recommendation_counts = db.recommendation_counts()?;
    let recent = db.recent_recommendations(RECENT_RECOMMENDATIONS)?;
    let issues = diagnose(strategy_counts, performance_total, &readiness);

    Ok(DiagnosticReport {
        collections,
        strategy_counts,
        strategies,
        performance_total,
        readiness,
        recommendation_counts,
        recent,
        issues,
    })
}

fn section(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}\n{title}\n{rule}");
}

/// Machine-readable form of the report, for piping into other tooling.
pub fn render_json(report: &DiagnosticReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(|err| {
        StoreError::Corrupt {
            context: "diagnostic report".to_string(),
            reason: err.to_string(),
        }
        .into()
    })
}

pub fn render(report: &DiagnosticReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Collections in database:");
    if report.collections.iter().all(|(_, n)| *n == 0) {
        let _ = writeln!(out, "   (all empty)");
    }
    for (name, count) in &report.collections {
        let _ = writeln!(out, "   - {name}: {count} documents");
    }
    let _ = writeln!(out);

    section(&mut out, "STRATEGIES");
    let counts = report.strategy_counts;
    let _ = writeln!(out, "Total strategies: {}", counts.total);
    let _ = writeln!(out, "Active: {} | Inactive: {}\n", counts.active, counts.inactive());
    if report.strategies.is_empty() {
        let _ = writeln!(out, "No strategies found in database!");
    } else {
        let _ = writeln!(
            out,
            "{:<6} | {:<30} | {:<23} | {:<6} | {:>10}",
            "Index", "Name", "Address", "Active", "Allocation"
        );
        for s in &report.strategies {
            let _ = writeln!(
                out,
                "{:<6} | {:<30} | {:<23} | {:<6} | {:>9.1}%",
                s.index,
                s.name.chars().take(30).collect::<String>(),
                ellipsize(&s.address.to_string(), 20),
                if s.active { "yes" } else { "no" },
                s.allocation_percent()
            );
        }
    }
    let _ = writeln!(out);

    section(&mut out, "PERFORMANCE DATA");
    let _ = writeln!(out, "Total performance records: {}\n", report.performance_total);
    if report.performance_total == 0 {
        let _ = writeln!(out, "No performance data found!");
    } else if report.readiness.is_empty() {
        let _ = writeln!(out, "No active strategies found!");
    } else {
        let _ = writeln!(
            out,
            "{:<6} | {:<25} | {:>6} | {:>8} | {:>7} | {:<10} | {:<6}",
            "Index", "Strategy", "Total", "Last 30d", "Last 7d", "Latest", "Ready?"
        );
        for r in &report.readiness {
            let _ = writeln!(
                out,
                "{:<6} | {:<25} | {:>6} | {:>8} | {:>7} | {:<10} | {:<6}",
                r.index,
                r.name.chars().take(25).collect::<String>(),
                r.total,
                r.last_30d,
                r.last_7d,
                r.latest_ms.map(format_date).unwrap_or_else(|| "N/A".to_string()),
                if r.ready { "yes" } else { "no" }
            );
        }
        let _ = writeln!(
            out,
            "\nRequirements for prediction:\n   - Need >={READY_MIN_RECORDS} records in last {READY_WINDOW_DAYS} days per strategy\n   - Need at least 1 active strategy"
        );
        let _ = writeln!(
            out,
            "\n   {}/{} strategies are ready",
            report.ready_count(),
            report.readiness.len()
        );
    }
    let _ = writeln!(out);

    section(&mut out, "RECOMMENDATIONS");
    let rc = report.recommendation_counts;
    let _ = writeln!(
        out,
        "Total: {} | Pending: {} | Submitted: {}",
        rc.total, rc.pending, rc.submitted
    );
    if !report.recent.is_empty() {
        let _ = writeln!(out, "\nRecent recommendations:");
        let _ = writeln!(
            out,
            "{:<16} | {:<18} | {:<10} | {:<9} | {:<23}",
            "Timestamp", "Signer", "Status", "Submitted", "Signature"
        );
        for rec in &report.recent {
            let _ = writeln!(
                out,
                "{:<16} | {:<18} | {:<10} | {:<9} | {:<23}",
                format_minute(rec.timestamp_ms),
                ellipsize(rec.signer.as_deref().unwrap_or("N/A"), 15),
                rec.status.as_str(),
                if rec.submitted { "yes" } else { "no" },
                ellipsize(&rec.signature, 20)
            );
        }
    }
    let _ = writeln!(out);

    section(&mut out, "DIAGNOSIS");
    if report.issues.is_empty() {
        let _ = writeln!(out, "Database looks good! Prediction runs should succeed.");
    } else {
        let _ = writeln!(out, "Issues found:");
        for (i, issue) in report.issues.iter().enumerate() {
            let _ = writeln!(out, "   {}. {issue}", i + 1);
        }
        let _ = writeln!(out, "\nSolution:\n   Run: seed_store\n   This will create test data for development");
    }
    let _ = write!(out, "{}", "=".repeat(RULE_WIDTH));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_row(ready: bool) -> Readiness {
        Readiness {
            index: 0,
            name: "s".to_string(),
            total: 12,
            last_30d: if ready { 12 } else { 3 },
            last_7d: 3,
            latest_ms: Some(1),
            ready,
        }
    }

    #[test]
    fn test_diagnose_empty_store() {
        let issues = diagnose(StrategyCounts::default(), 0, &[]);
        assert_eq!(issues, vec![Issue::NoStrategies, Issue::NoPerformanceData]);
    }

    #[test]
    fn test_diagnose_inactive_only() {
        let issues = diagnose(StrategyCounts { total: 2, active: 0 }, 40, &[]);
        assert_eq!(issues, vec![Issue::NoActiveStrategies]);
    }

    #[test]
    fn test_diagnose_requires_one_ready_strategy() {
        let counts = StrategyCounts { total: 2, active: 2 };
        assert_eq!(
            diagnose(counts, 10, &[ready_row(false), ready_row(false)]),
            vec![Issue::NoReadyStrategies]
        );
        assert!(diagnose(counts, 10, &[ready_row(false), ready_row(true)]).is_empty());
    }

    #[test]
    fn test_json_report_names_issues() {
        let report = DiagnosticReport {
            collections: vec![("strategies", 0)],
            strategy_counts: StrategyCounts::default(),
            strategies: Vec::new(),
            performance_total: 0,
            readiness: Vec::new(),
            recommendation_counts: RecommendationCounts::default(),
            recent: Vec::new(),
            issues: vec![Issue::NoStrategies],
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_json(&report).expect("json")).expect("parse");
        assert_eq!(value["issues"][0], "no_strategies");
        assert_eq!(value["collections"][0][0], "strategies");
    }

    #[test]
    fn test_issue_text_mentions_threshold() {
        assert!(Issue::NoReadyStrategies.to_string().contains(">=10"));
    }
}
