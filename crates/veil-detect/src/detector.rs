//! Entity detector contract.

use async_trait::async_trait;
use veil_core::{EntitySpan, Result};

/// A PII detector over a text unit.
///
/// Detectors are invoked independently and must not mutate shared state.
/// Every returned span's `source` must be the detector's own [`name`].
/// A detector may fail; the ensemble reconciler absorbs per-detector
/// failures, so an error here never aborts an analysis.
///
/// [`name`]: EntityDetector::name
#[async_trait]
pub trait EntityDetector: Send + Sync {
    /// Stable identifier of this detector (used as the span `source`).
    fn name(&self) -> &str;

    /// Detect PII spans in `text`.
    async fn detect(&self, text: &str) -> Result<Vec<EntitySpan>>;

    /// Check if the detector is available.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
