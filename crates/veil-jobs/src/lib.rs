//! # veil-jobs
//!
//! Job lifecycle management for veil.
//!
//! This crate provides:
//! - An in-memory [`JobStore`] implementation behind the store trait
//! - An analysis worker consuming a bounded submission queue with a
//!   concurrency cap
//! - The per-job pipeline: transcription, ensemble analysis, result
//!   recording, and media cleanup
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use veil_jobs::{AnalysisPipeline, AnalysisWorker, MemoryJobStore, WorkerConfig};
//!
//! let store = Arc::new(MemoryJobStore::new());
//! let pipeline = AnalysisPipeline::new(store.clone(), transcription, analyzer);
//! let worker = AnalysisWorker::new(pipeline, WorkerConfig::from_env());
//! let queue = worker.queue();
//! let handle = worker.start();
//!
//! let job = store.create(Uuid::new_v4(), None, Some(path)).await?;
//! queue.submit(job.id).await?;
//! ```

pub mod pipeline;
pub mod store;
pub mod worker;

// Re-export core types
pub use veil_core::*;

pub use pipeline::AnalysisPipeline;
pub use store::MemoryJobStore;
pub use worker::{AnalysisWorker, JobQueue, WorkerConfig, WorkerEvent, WorkerHandle};
