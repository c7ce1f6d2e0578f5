//! Chunk planning and per-chunk transfer.
//!
//! - [`planner`] - splits a resource into ordered byte ranges
//! - [`worker`] - downloads one chunk into its part artifact

pub mod planner;
pub mod worker;

pub use planner::{covers, plan_chunks, Chunk, ChunkState, ChunkStatus};
pub use worker::{Backoff, ChunkOutcome, ChunkWorker};
