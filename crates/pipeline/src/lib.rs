//! Asynchronous batch evaluation pipeline.
//!
//! Leaves first:
//!
//! - [`inference`]: detection model adapter with a lazily loaded model
//! - [`frame`]: one frame through inference and the rule engine
//! - [`batch`]: a batch of frames, counters, status transitions
//! - [`eligibility`]: MII/MI roll-up into batch and egg-record aggregates
//! - [`orchestrator`]: start / re-evaluate entry points
//! - [`status`]: read-side progress view
//! - [`approval`], [`intake`]: human approval and frame upload/deletion
//! - [`queue`]: the task queue collaborator

pub mod approval;
pub mod batch;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod frame;
pub mod inference;
pub mod intake;
pub mod orchestrator;
pub mod queue;
pub mod status;

pub use error::PipelineError;
