//! Shared data models for veil: entity spans, transcript segments, reports,
//! summaries, and analysis jobs.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// One PII detection instance over a text unit.
///
/// Produced by a single detector; immutable. After reconciliation, a span
/// chosen as the representative of an overlap cluster carries the ensemble
/// metadata fields; standalone spans leave them unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySpan {
    /// Detector-defined label (e.g. "PERSON", "PHONE_NUMBER").
    pub kind: String,
    /// The matched substring.
    pub text: String,
    /// Confidence score, conventionally in [0, 1].
    pub confidence: f64,
    /// Half-open start offset into the analyzed text unit.
    pub start: usize,
    /// Half-open end offset into the analyzed text unit.
    pub end: usize,
    /// Identifier of the detector that produced this span.
    pub source: String,
    /// Sources of every cluster member this span represents (duplicates kept).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributing_sources: Option<Vec<String>>,
    /// Number of overlapping raw detections merged into this span.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement_count: Option<usize>,
    /// Arithmetic mean of the cluster members' confidences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_confidence: Option<f64>,
}

impl EntitySpan {
    /// Create a raw span with no ensemble metadata.
    pub fn new(
        kind: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
        start: usize,
        end: usize,
        source: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            confidence,
            start,
            end,
            source: source.into(),
            contributing_sources: None,
            agreement_count: None,
            average_confidence: None,
        }
    }
}

/// A time-aligned transcript chunk, as produced by the transcription backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Per-segment PII report. Only segments with at least one detection are
/// reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentReport {
    /// Human-readable range, `"M:SS -> M:SS"`.
    pub timestamp: String,
    /// Trimmed segment text.
    pub text: String,
    /// Reconciled detections within the segment.
    pub pii: Vec<EntitySpan>,
}

/// Aggregate statistics derived from a full-transcript report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub total_pii_items: usize,
    pub segments_with_pii: usize,
    /// Count of detections per kind.
    pub pii_types: HashMap<String, usize>,
    /// Deduplicated matched texts per kind, in first-seen order.
    pub unique_pii_by_type: HashMap<String, Vec<String>>,
    pub has_privacy_concerns: bool,
}

/// Complete result of analyzing one media file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaAnalysis {
    pub transcript: String,
    pub pii_detected: Vec<EntitySpan>,
    pub pii_segments: Vec<SegmentReport>,
    pub summary: Summary,
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether this status ends the job's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One tracked analysis request.
///
/// Result fields are populated only on transition to `Completed`; `error`
/// only on transition to `Failed`. `media_path` is the job's exclusive handle
/// on the uploaded media until the pipeline claims it for cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub original_filename: Option<String>,
    /// Temp-storage path of the uploaded media. Internal handle, never
    /// serialized.
    #[serde(skip)]
    pub media_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub transcript: Option<String>,
    pub pii_detected: Option<Vec<EntitySpan>>,
    pub pii_segments: Option<Vec<SegmentReport>>,
    pub summary: Option<Summary>,
    pub error: Option<String>,
}

impl Job {
    /// Create a freshly queued job.
    pub fn new(id: Uuid, original_filename: Option<String>, media_path: Option<PathBuf>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            original_filename,
            media_path,
            created_at: Utc::now(),
            completed_at: None,
            transcript: None,
            pii_detected: None,
            pii_segments: None,
            summary: None,
            error: None,
        }
    }
}
