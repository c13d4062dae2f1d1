//! Cached-versus-chain nonce reconciliation.

pub mod reconciler;
pub mod source;

pub use reconciler::{
    mismatch_reason, ExpiredRecommendation, FailedExpiry, NonceReconciler, ReconcileOutcome,
    ReconcileReport,
};
pub use source::{ContractNonceSource, NonceSource};
