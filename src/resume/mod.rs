//! Persisted per-chunk progress enabling restarts without re-downloading
//! finished chunks.
//!
//! - [`store`] - the [`ResumeStore`] contract and [`ResumeState`]
//! - [`json`] - durable JSON documents, one per job
//! - [`memory`] - in-process store for tests and throwaway jobs
//!
//! # Examples
//!
//! ```rust
//! use shardload::job::JobId;
//! use shardload::resume::{MemoryResumeStore, ResumeStore};
//!
//! # async fn example() -> shardload::Result<()> {
//! let store = MemoryResumeStore::new();
//! let state = store.load(&JobId::new("movie.mp4")).await?;
//! assert!(state.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod json;
pub mod memory;
pub mod store;

pub use json::JsonResumeStore;
pub use memory::MemoryResumeStore;
pub use store::{ChunkRecord, Layout, ResumeState, ResumeStore};
