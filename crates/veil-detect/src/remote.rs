//! Remote NER detector client.
//!
//! Talks to a token-classification sidecar (one per model in the ensemble)
//! over HTTP. The sidecar contract is `POST {base_url}/extract` with
//! `{text, threshold?}` returning `{entities: [{label, text, score, start,
//! end}]}`, and `GET {base_url}/health` for liveness.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use veil_core::defaults::DETECTOR_TIMEOUT_SECS;
use veil_core::{EntitySpan, Error, Result};

use crate::detector::EntityDetector;

/// HTTP client for one NER sidecar.
pub struct RemoteNerDetector {
    name: String,
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
    threshold: Option<f64>,
}

impl RemoteNerDetector {
    pub fn new(name: String, base_url: String) -> Self {
        Self {
            name,
            base_url,
            client: reqwest::Client::new(),
            timeout_secs: DETECTOR_TIMEOUT_SECS,
            threshold: None,
        }
    }

    /// Set a minimum score below which the sidecar drops entities.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// Request payload for the sidecar `/extract` endpoint.
#[derive(Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<f64>,
}

/// One entity as returned by the sidecar.
#[derive(Deserialize)]
struct WireEntity {
    label: String,
    text: String,
    score: f64,
    start: usize,
    end: usize,
}

/// Response payload of the sidecar `/extract` endpoint.
#[derive(Deserialize)]
struct ExtractResponse {
    entities: Vec<WireEntity>,
}

/// Health check response from the sidecar.
#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[async_trait]
impl EntityDetector for RemoteNerDetector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detect(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let url = format!("{}/extract", self.base_url);

        let request = ExtractRequest {
            text,
            threshold: self.threshold,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Detection(format!("{} request failed: {}", self.name, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Detection(format!(
                "{} returned {}: {}",
                self.name, status, body
            )));
        }

        let result: ExtractResponse = response.json().await.map_err(|e| {
            Error::Detection(format!("Failed to parse {} response: {}", self.name, e))
        })?;

        Ok(result
            .entities
            .into_iter()
            .map(|e| EntitySpan::new(e.label, e.text, e.score, e.start, e.end, &self.name))
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => {
                if resp.status().is_success() {
                    if let Ok(health) = resp.json::<HealthResponse>().await {
                        if health.status == "healthy" {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }
}
