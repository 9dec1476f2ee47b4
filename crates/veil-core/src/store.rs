//! Job store contract.
//!
//! The job table is the only mutable shared structure in the core. Keeping it
//! behind a trait lets a durable backend replace the in-memory table without
//! touching the reconciler or analyzer.

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Job, MediaAnalysis};

/// Repository of analysis jobs keyed by id.
///
/// Implementations must make each transition atomic from an observer's
/// perspective: `get`/`list` never see a partially updated job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in the `Queued` state.
    ///
    /// Fails with [`crate::Error::DuplicateJob`] if the id already exists.
    async fn create(
        &self,
        id: Uuid,
        original_filename: Option<String>,
        media_path: Option<PathBuf>,
    ) -> Result<Job>;

    /// Transition a queued job to `Processing`.
    async fn mark_processing(&self, id: Uuid) -> Result<()>;

    /// Transition a job to `Completed`, recording the analysis results and
    /// stamping `completed_at`. Overwrites any previous result fields.
    async fn complete(&self, id: Uuid, analysis: MediaAnalysis) -> Result<()>;

    /// Transition a job to `Failed`, recording the cause and stamping
    /// `completed_at`.
    async fn fail(&self, id: Uuid, error: &str) -> Result<()>;

    /// Get a job snapshot by id.
    async fn get(&self, id: Uuid) -> Result<Option<Job>>;

    /// List job snapshots, newest-created first.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Job>>;

    /// Total number of jobs in the table.
    async fn count(&self) -> Result<usize>;

    /// Delete a job record. Returns whether a job was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Claim the job's media path, leaving the job without one.
    ///
    /// The caller becomes responsible for deleting the file. At most one
    /// caller can ever receive the path for a given job.
    async fn take_media_path(&self, id: Uuid) -> Result<Option<PathBuf>>;
}
