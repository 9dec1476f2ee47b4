//! In-memory job store.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use veil_core::{Error, Job, JobStatus, JobStore, MediaAnalysis, Result};

/// In-memory job table keyed by id.
///
/// Every transition happens under the write lock, so readers always observe
/// a consistent job snapshot. Jobs live until explicitly deleted; there is no
/// automatic expiry.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(
        &self,
        id: Uuid,
        original_filename: Option<String>,
        media_path: Option<PathBuf>,
    ) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(Error::DuplicateJob(id));
        }
        let job = Job::new(id, original_filename, media_path);
        jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn mark_processing(&self, id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        job.status = JobStatus::Processing;
        Ok(())
    }

    async fn complete(&self, id: Uuid, analysis: MediaAnalysis) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        job.status = JobStatus::Completed;
        job.transcript = Some(analysis.transcript);
        job.pii_detected = Some(analysis.pii_detected);
        job.pii_segments = Some(analysis.pii_segments);
        job.summary = Some(analysis.summary);
        job.error = None;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, id: Uuid, error: &str) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&id).cloned())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        // Newest first; id as tie-break keeps the order deterministic
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        let jobs = self.jobs.read().await;
        Ok(jobs.len())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs.remove(&id).is_some())
    }

    async fn take_media_path(&self, id: Uuid) -> Result<Option<PathBuf>> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        Ok(job.media_path.take())
    }
}
