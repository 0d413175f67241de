//! Worker process for queued evaluation tasks.
//!
//! - [`config`]: pool size, time limits and recycling
//! - [`execute`]: one task under soft and hard time limits
//! - [`runner`]: the claim loop over the `tasks` table

pub mod config;
pub mod execute;
pub mod runner;
