//! Maintenance utilities for the yield-strategy store.
//!
//! - `nonce`: reconcile the cached agent nonce with the strategy manager contract and
//!   expire pending recommendations signed against a stale nonce (`sync_nonces`).
//! - `seed`: synthetic strategies and performance history for development (`seed_store`).
//! - `report`: read-only diagnosis of store contents (`debug_store`).

pub mod error;
pub mod nonce;
pub mod report;
pub mod seed;
pub mod storage;
pub mod utils;
