//! Template drift detection and reconciliation engine
//!
//! On each version upgrade the engine decides, per incoming template file,
//! whether it is user-owned (never touched), framework-owned (safe to
//! overwrite), or divergent on both sides (deferred to a human):
//! 1. Hashing - compact content digests as the "was this edited" proxy
//! 2. Planning - pseudo-three-way comparison against the hash ledger
//! 3. Executing - copy, skip, or defer, then rewrite the ledger

pub mod differ;
pub mod executor;
pub mod hash;
pub mod ledger;
pub mod patterns;
pub mod planner;
