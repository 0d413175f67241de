//! Pure domain logic for the egg-bank evaluation pipeline.
//!
//! Nothing in this crate performs I/O. Store adapters live in
//! `eggbank-db`, orchestration lives in `eggbank-pipeline`.

pub mod detection;
pub mod eligibility;
pub mod error;
pub mod evaluation_status;
pub mod journey;
pub mod maturity;
pub mod medical_history;
pub mod types;
