//! Per-job analysis pipeline: transcription, ensemble detection, result
//! recording, and media cleanup.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use veil_core::{Error, JobStore, MediaAnalysis, Result};
use veil_detect::analyzer::SegmentAnalyzer;
use veil_detect::transcription::TranscriptionBackend;

/// Drives one job from `Queued` to a terminal state.
pub struct AnalysisPipeline {
    store: Arc<dyn JobStore>,
    transcription: Arc<dyn TranscriptionBackend>,
    analyzer: SegmentAnalyzer,
}

impl AnalysisPipeline {
    pub fn new(
        store: Arc<dyn JobStore>,
        transcription: Arc<dyn TranscriptionBackend>,
        analyzer: SegmentAnalyzer,
    ) -> Self {
        Self {
            store,
            transcription,
            analyzer,
        }
    }

    /// Process one submitted job to completion or failure.
    ///
    /// The job's media path is claimed up front, so this pipeline is the only
    /// owner of the file; it is deleted exactly once after the terminal
    /// transition, whichever path was taken. Returns `Err` when the job ended
    /// in `Failed` (the failure is already recorded in the store).
    #[instrument(
        skip(self),
        fields(subsystem = "jobs", component = "pipeline", op = "process")
    )]
    pub async fn process(&self, job_id: Uuid) -> Result<()> {
        let start = Instant::now();

        let media_path = match self.store.take_media_path(job_id).await? {
            Some(path) => path,
            None => {
                let msg = "No media attached to job";
                self.store.fail(job_id, msg).await?;
                return Err(Error::Internal(msg.to_string()));
            }
        };

        self.store.mark_processing(job_id).await?;
        info!(job_id = %job_id, "Processing analysis job");

        let outcome = self.run(&media_path).await;

        let result = match outcome {
            Ok(analysis) => {
                let entity_count = analysis.pii_detected.len();
                self.store.complete(job_id, analysis).await?;
                info!(
                    job_id = %job_id,
                    entity_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Analysis job completed"
                );
                Ok(())
            }
            Err(e) => {
                let cause = e.to_string();
                self.store.fail(job_id, &cause).await?;
                warn!(
                    job_id = %job_id,
                    error = %cause,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Analysis job failed"
                );
                Err(e)
            }
        };

        // Release the uploaded media exactly once, on either terminal path
        if let Err(e) = tokio::fs::remove_file(&media_path).await {
            debug!(
                error = %e,
                path = %media_path.display(),
                "Failed to remove media file"
            );
        }

        result
    }

    /// Transcribe the media file and analyze the transcript.
    async fn run(&self, media_path: &Path) -> Result<MediaAnalysis> {
        let media = tokio::fs::read(media_path)
            .await
            .map_err(|e| Error::Transcription(format!("Media unreadable: {}", e)))?;

        let mime_type = mime_for_path(media_path);
        let transcription = self.transcription.transcribe(&media, mime_type).await?;

        Ok(self
            .analyzer
            .analyze(&transcription.text, &transcription.segments)
            .await)
    }
}

/// Best-effort MIME type from the file extension; the transcription backend
/// sniffs the container anyway.
fn mime_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("aac") => "audio/aac",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        _ => "video/mp4",
    }
}
