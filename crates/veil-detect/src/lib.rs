//! # veil-detect
//!
//! Detection layer for veil:
//! - Pluggable entity detector trait
//! - Remote NER sidecar client
//! - Rule-based phone number heuristic
//! - Ensemble reconciler merging overlapping detections
//! - Segment analyzer building full and per-segment PII reports
//! - Transcription backend for audio/video-to-text

pub mod analyzer;
pub mod detector;
pub mod phone;
pub mod pool;
pub mod reconcile;
pub mod remote;
pub mod transcription;

// Mock detectors for deterministic tests
#[cfg(test)]
pub mod mock;

// Re-export core types
pub use veil_core::*;

pub use analyzer::SegmentAnalyzer;
pub use detector::EntityDetector;
pub use phone::PhoneHeuristicDetector;
pub use pool::DetectorPool;
pub use reconcile::EnsembleReconciler;
pub use remote::RemoteNerDetector;
pub use transcription::{TranscriptionBackend, TranscriptionResult, WhisperBackend};
