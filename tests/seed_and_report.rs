mod common;

use alloy::primitives::U256;
use common::{cleanup, fresh_db};
use rand::rngs::StdRng;
use rand::SeedableRng;
use yield_ops::report::{build_report, render, Issue};
use yield_ops::seed::Seeder;
use yield_ops::storage::{NewRecommendation, RecommendationStatus};
use yield_ops::utils::clock::days_ago_ms;

const NOW_MS: u64 = 1_760_000_000_000;

#[test]
fn test_empty_store_reports_missing_data() {
    let (db, path) = fresh_db("report_empty");
    let report = build_report(&db, NOW_MS).expect("report");

    assert_eq!(report.issues, vec![Issue::NoStrategies, Issue::NoPerformanceData]);
    assert!(report.readiness.is_empty());

    let text = render(&report);
    assert!(text.contains("(all empty)"));
    assert!(text.contains("No strategies found in database!"));
    assert!(text.contains("Run: seed_store"));
    cleanup(&path);
}

#[test]
fn test_seeded_store_is_ready() {
    let (db, path) = fresh_db("seed_ready");
    let seeder = Seeder::new(db.clone());
    let mut rng = StdRng::seed_from_u64(7);

    assert!(seeder.check_existing().expect("existing").is_empty());
    let strategies = seeder.create_strategies(4, true, NOW_MS).expect("strategies");
    let written = seeder
        .populate_performance(&strategies, 35, true, NOW_MS, &mut rng)
        .expect("performance");
    seeder.ensure_indexes().expect("indexes");

    assert_eq!(written, vec![(0, 35), (1, 35), (2, 35), (3, 35)]);
    let existing = seeder.check_existing().expect("existing");
    assert_eq!((existing.strategies, existing.active, existing.performance), (4, 4, 140));

    let verification = seeder.verify(NOW_MS).expect("verify");
    assert!(verification.all_ready());
    for row in &verification.rows {
        assert_eq!(row.total, 35);
        assert_eq!(row.last_30d, 31);
        assert_eq!(row.last_7d, 8);
        assert_eq!(row.latest_ms, Some(NOW_MS));
    }

    let report = build_report(&db, NOW_MS).expect("report");
    assert!(report.issues.is_empty());
    assert_eq!(report.ready_count(), 4);
    let text = render(&report);
    assert!(text.contains("4/4 strategies are ready"));
    assert!(text.contains("Database looks good!"));
    cleanup(&path);
}

#[test]
fn test_reseed_without_clear_appends() {
    let (db, path) = fresh_db("seed_append");
    let seeder = Seeder::new(db);
    let mut rng = StdRng::seed_from_u64(11);

    let first = seeder.create_strategies(2, false, NOW_MS).expect("first");
    seeder
        .populate_performance(&first, 5, false, NOW_MS, &mut rng)
        .expect("first walk");
    let second = seeder.create_strategies(2, false, NOW_MS).expect("second");
    seeder
        .populate_performance(&second, 5, false, NOW_MS, &mut rng)
        .expect("second walk");

    let existing = seeder.check_existing().expect("existing");
    assert_eq!(existing.strategies, 4);
    assert_eq!(existing.performance, 20);

    seeder.create_strategies(2, true, NOW_MS).expect("recreate");
    let existing = seeder.check_existing().expect("existing");
    assert_eq!(existing.strategies, 2);
    // Performance is cleared separately from strategies.
    assert_eq!(existing.performance, 20);
    cleanup(&path);
}

#[test]
fn test_short_history_is_not_ready() {
    let (db, path) = fresh_db("seed_short");
    let seeder = Seeder::new(db.clone());
    let mut rng = StdRng::seed_from_u64(3);

    let strategies = seeder.create_strategies(1, true, NOW_MS).expect("strategies");
    seeder
        .populate_performance(&strategies, 9, true, NOW_MS, &mut rng)
        .expect("performance");

    let verification = seeder.verify(NOW_MS).expect("verify");
    assert!(!verification.all_ready());
    let report = build_report(&db, NOW_MS).expect("report");
    assert_eq!(report.issues, vec![Issue::NoReadyStrategies]);
    cleanup(&path);
}

#[test]
fn test_old_history_falls_out_of_window() {
    let (db, path) = fresh_db("seed_old");
    let seeder = Seeder::new(db);
    let mut rng = StdRng::seed_from_u64(5);

    let strategies = seeder.create_strategies(1, true, NOW_MS).expect("strategies");
    let long_ago = days_ago_ms(NOW_MS, 60);
    seeder
        .populate_performance(&strategies, 20, true, long_ago, &mut rng)
        .expect("performance");

    let row = &seeder.verify(NOW_MS).expect("verify").rows[0];
    assert_eq!(row.total, 20);
    assert_eq!(row.last_30d, 0);
    assert!(!row.ready);
    cleanup(&path);
}

#[test]
fn test_report_lists_recent_recommendations_and_cleanup_empties_store() {
    let (db, path) = fresh_db("report_recs");
    let seeder = Seeder::new(db.clone());
    for ts in 1..=7u64 {
        let mut rec = NewRecommendation::pending(U256::from(ts), format!("0xsignature{ts}"), ts * 60_000);
        if ts % 3 == 0 {
            rec.status = RecommendationStatus::Submitted;
            rec.submitted = true;
        }
        db.insert_recommendation(&rec).expect("insert");
    }

    let report = build_report(&db, NOW_MS).expect("report");
    assert_eq!(report.recommendation_counts.total, 7);
    assert_eq!(report.recommendation_counts.pending, 5);
    assert_eq!(report.recommendation_counts.submitted, 2);
    assert_eq!(report.recent.len(), 5);
    assert_eq!(report.recent[0].timestamp_ms, 7 * 60_000);
    assert!(render(&report).contains("Recent recommendations:"));

    let removed = seeder.cleanup().expect("cleanup");
    assert_eq!(removed.recommendations, 7);
    assert!(db
        .table_counts()
        .expect("counts")
        .iter()
        .all(|(_, n)| *n == 0));
    cleanup(&path);
}
