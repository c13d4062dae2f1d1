#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use yield_ops::storage::StrategyDb;

pub fn temp_db_path(prefix: &str) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("{prefix}_{}_{nanos}_{seq}.db", std::process::id()))
}

pub fn fresh_db(prefix: &str) -> (StrategyDb, PathBuf) {
    let path = temp_db_path(prefix);
    let db = StrategyDb::open(&path).expect("open temp store");
    (db, path)
}

pub fn cleanup(path: &PathBuf) {
    let _ = std::fs::remove_file(path);
}
