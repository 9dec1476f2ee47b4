//! Mock detectors for deterministic tests.

use async_trait::async_trait;

use veil_core::{EntitySpan, Error, Result};

use crate::detector::EntityDetector;

/// Detector returning a fixed set of spans regardless of input, with each
/// span's `source` rewritten to the mock's name.
pub struct StaticDetector {
    name: String,
    spans: Vec<EntitySpan>,
}

impl StaticDetector {
    pub fn new(name: impl Into<String>, spans: Vec<EntitySpan>) -> Self {
        Self {
            name: name.into(),
            spans,
        }
    }
}

#[async_trait]
impl EntityDetector for StaticDetector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detect(&self, _text: &str) -> Result<Vec<EntitySpan>> {
        Ok(self
            .spans
            .iter()
            .cloned()
            .map(|mut s| {
                s.source = self.name.clone();
                s
            })
            .collect())
    }
}

/// Detector that always fails.
pub struct FailingDetector {
    name: String,
}

impl FailingDetector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl EntityDetector for FailingDetector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detect(&self, _text: &str) -> Result<Vec<EntitySpan>> {
        Err(Error::Detection(format!("{} is down", self.name)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }
}
