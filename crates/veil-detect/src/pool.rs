//! Detector pool: the explicitly constructed, immutable set of detectors the
//! reconciler runs for every text unit.

use std::sync::Arc;

use tracing::{info, warn};

use veil_core::defaults::ENV_NER_DETECTORS;

use crate::detector::EntityDetector;
use crate::phone::PhoneHeuristicDetector;
use crate::remote::RemoteNerDetector;

/// Immutable collection of entity detectors.
///
/// Constructed once at startup and shared by reference; there is no runtime
/// registration. Ownership is explicit rather than process-global state.
#[derive(Clone, Default)]
pub struct DetectorPool {
    detectors: Vec<Arc<dyn EntityDetector>>,
}

impl DetectorPool {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Add a detector.
    pub fn with_detector<D: EntityDetector + 'static>(mut self, detector: D) -> Self {
        self.detectors.push(Arc::new(detector));
        self
    }

    /// Add an already-shared detector.
    pub fn with_shared(mut self, detector: Arc<dyn EntityDetector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn detectors(&self) -> &[Arc<dyn EntityDetector>] {
        &self.detectors
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Build the pool from the environment.
    ///
    /// `VEIL_NER_DETECTORS` holds comma-separated `name=base_url` pairs; each
    /// becomes a [`RemoteNerDetector`]. Malformed entries are skipped with a
    /// warning. The phone heuristic is always included.
    pub fn from_env() -> Self {
        let mut pool = Self::new();

        if let Ok(spec) = std::env::var(ENV_NER_DETECTORS) {
            for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match entry.split_once('=') {
                    Some((name, url)) if !name.is_empty() && !url.is_empty() => {
                        info!(detector = name, url = url, "Registering NER detector");
                        pool = pool.with_detector(RemoteNerDetector::new(
                            name.trim().to_string(),
                            url.trim().to_string(),
                        ));
                    }
                    _ => {
                        warn!(entry = entry, "Skipping malformed NER detector entry");
                    }
                }
            }
        }

        pool.with_detector(PhoneHeuristicDetector::new())
    }
}
