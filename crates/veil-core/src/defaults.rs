//! Centralized default constants for the veil system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// DETECTION
// =============================================================================

/// Fixed confidence assigned to rule-based phone matches (no probabilistic
/// score is computed for them).
pub const PHONE_CONFIDENCE: f64 = 0.9;

/// Entity kind emitted by the phone heuristic.
pub const PHONE_KIND: &str = "PHONE_NUMBER";

/// Detector identifier of the phone heuristic.
pub const PHONE_DETECTOR_NAME: &str = "phone_heuristic";

/// Per-request timeout for NER sidecar calls, in seconds.
pub const DETECTOR_TIMEOUT_SECS: u64 = 30;

/// Env var holding the NER detector set as comma-separated `name=url` pairs.
pub const ENV_NER_DETECTORS: &str = "VEIL_NER_DETECTORS";

// =============================================================================
// TRANSCRIPTION
// =============================================================================

/// Env var for the Whisper-compatible transcription endpoint.
pub const ENV_WHISPER_BASE_URL: &str = "VEIL_WHISPER_BASE_URL";

/// Env var for the transcription model slug.
pub const ENV_WHISPER_MODEL: &str = "VEIL_WHISPER_MODEL";

/// Default transcription model slug.
pub const DEFAULT_WHISPER_MODEL: &str = "whisper-1";

/// Timeout for transcription requests, in seconds. Long to accommodate
/// full-length recordings.
pub const TRANSCRIBE_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// JOBS
// =============================================================================

/// Max analysis pipelines running concurrently.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Capacity of the job submission queue.
pub const JOB_QUEUE_CAPACITY: usize = 256;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 128;

/// Env var enabling/disabling the analysis worker.
pub const ENV_JOB_WORKER_ENABLED: &str = "VEIL_JOB_WORKER_ENABLED";

/// Env var overriding worker concurrency.
pub const ENV_JOB_MAX_CONCURRENT: &str = "VEIL_JOB_MAX_CONCURRENT";

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for job listings.
pub const PAGE_LIMIT: usize = 50;

/// Default page offset.
pub const PAGE_OFFSET: usize = 0;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP bind address.
pub const BIND_ADDR: &str = "0.0.0.0:8000";

/// Env var overriding the HTTP bind address.
pub const ENV_BIND_ADDR: &str = "VEIL_BIND_ADDR";

/// Maximum accepted upload size in bytes (512 MiB).
pub const UPLOAD_LIMIT_BYTES: usize = 512 * 1024 * 1024;

/// Default directory for spooled uploads awaiting analysis.
pub const UPLOAD_DIR: &str = "/tmp/veil/uploads";

/// Env var overriding the upload spool directory.
pub const ENV_UPLOAD_DIR: &str = "VEIL_UPLOAD_DIR";
