//! Analysis worker consuming the job submission queue.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Semaphore};
use tracing::{error, info, instrument};
use uuid::Uuid;

use veil_core::defaults::{
    ENV_JOB_MAX_CONCURRENT, ENV_JOB_WORKER_ENABLED, EVENT_BUS_CAPACITY, JOB_MAX_CONCURRENT,
    JOB_QUEUE_CAPACITY,
};
use veil_core::{Error, Result};

use crate::pipeline::AnalysisPipeline;

/// Configuration for the analysis worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of concurrently running pipelines.
    pub max_concurrent: usize,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: JOB_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `VEIL_JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `VEIL_JOB_MAX_CONCURRENT` | `4` | Max concurrent pipelines |
    pub fn from_env() -> Self {
        let enabled = std::env::var(ENV_JOB_WORKER_ENABLED)
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var(ENV_JOB_MAX_CONCURRENT)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(JOB_MAX_CONCURRENT)
            .max(1);

        Self {
            max_concurrent,
            enabled,
        }
    }

    /// Set maximum concurrent pipelines.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the analysis worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job's pipeline was started.
    JobStarted { job_id: Uuid },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid },
    /// A job failed.
    JobFailed { job_id: Uuid, error: String },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Submission side of the worker's job queue.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Uuid>,
}

impl JobQueue {
    /// Hand a created job to the worker.
    pub async fn submit(&self, job_id: Uuid) -> Result<()> {
        self.tx
            .send(job_id)
            .await
            .map_err(|_| Error::Internal("Job queue is closed".into()))
    }
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that runs one analysis pipeline per submitted job, any number of
/// jobs logically concurrent up to the configured cap.
pub struct AnalysisWorker {
    pipeline: Arc<AnalysisPipeline>,
    config: WorkerConfig,
    job_tx: mpsc::Sender<Uuid>,
    job_rx: mpsc::Receiver<Uuid>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl AnalysisWorker {
    pub fn new(pipeline: AnalysisPipeline, config: WorkerConfig) -> Self {
        let (job_tx, job_rx) = mpsc::channel(JOB_QUEUE_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            pipeline: Arc::new(pipeline),
            config,
            job_tx,
            job_rx,
            event_tx,
        }
    }

    /// Get the submission queue. Clones share the same channel.
    pub fn queue(&self) -> JobQueue {
        JobQueue {
            tx: self.job_tx.clone(),
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(self.run(shutdown_rx));

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the dispatch loop until shutdown or queue closure.
    #[instrument(skip(self, shutdown_rx), fields(subsystem = "jobs", component = "worker"))]
    async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Analysis worker is disabled, not starting");
            return;
        }

        info!(
            max_concurrent = self.config.max_concurrent,
            "Analysis worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Analysis worker received shutdown signal");
                    break;
                }
                submitted = self.job_rx.recv() => {
                    let Some(job_id) = submitted else {
                        info!("Job queue closed, stopping worker");
                        break;
                    };

                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };

                    let pipeline = self.pipeline.clone();
                    let event_tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        let _ = event_tx.send(WorkerEvent::JobStarted { job_id });
                        match pipeline.process(job_id).await {
                            Ok(()) => {
                                let _ = event_tx.send(WorkerEvent::JobCompleted { job_id });
                            }
                            Err(e) => {
                                error!(job_id = %job_id, error = %e, "Pipeline ended in failure");
                                let _ = event_tx.send(WorkerEvent::JobFailed {
                                    job_id,
                                    error: e.to_string(),
                                });
                            }
                        }
                    });
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Analysis worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent, JOB_MAX_CONCURRENT);
        assert!(config.enabled);
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::default()
            .with_max_concurrent(8)
            .with_enabled(false);

        assert_eq!(config.max_concurrent, 8);
        assert!(!config.enabled);
    }

    #[test]
    fn test_worker_config_chaining_order_independence() {
        let config1 = WorkerConfig::default()
            .with_enabled(false)
            .with_max_concurrent(10);
        let config2 = WorkerConfig::default()
            .with_max_concurrent(10)
            .with_enabled(false);

        assert_eq!(config1.max_concurrent, config2.max_concurrent);
        assert_eq!(config1.enabled, config2.enabled);
    }

    #[test]
    fn test_worker_event_variants() {
        let job_id = Uuid::new_v4();

        let event = WorkerEvent::JobFailed {
            job_id,
            error: "boom".to_string(),
        };
        match event {
            WorkerEvent::JobFailed { job_id: id, error } => {
                assert_eq!(id, job_id);
                assert_eq!(error, "boom");
            }
            _ => panic!("Wrong event variant"),
        }

        assert!(matches!(WorkerEvent::WorkerStarted, WorkerEvent::WorkerStarted));
        assert!(matches!(WorkerEvent::WorkerStopped, WorkerEvent::WorkerStopped));
    }

    #[test]
    fn test_worker_event_debug() {
        let event = WorkerEvent::JobStarted {
            job_id: Uuid::new_v4(),
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("JobStarted"));
    }
}
