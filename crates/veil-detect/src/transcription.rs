//! Transcription backend trait and Whisper-compatible implementation.

use async_trait::async_trait;
use serde::Deserialize;

use veil_core::defaults::{
    DEFAULT_WHISPER_MODEL, ENV_WHISPER_BASE_URL, ENV_WHISPER_MODEL, TRANSCRIBE_TIMEOUT_SECS,
};
use veil_core::{Error, Result, Segment};

/// Result of media transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    /// Full transcribed text.
    pub text: String,
    /// Timestamped segments in original order.
    pub segments: Vec<Segment>,
}

/// Backend for transcribing uploaded media.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe media bytes.
    ///
    /// Unreadable or unsupported media surfaces as
    /// [`Error::Transcription`].
    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<TranscriptionResult>;

    /// Check if the transcription backend is available.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible Whisper backend (works with Speaches/faster-whisper-server).
pub struct WhisperBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl WhisperBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: TRANSCRIBE_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    /// Returns None if `VEIL_WHISPER_BASE_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(ENV_WHISPER_BASE_URL).ok()?;
        if base_url.is_empty() {
            return None;
        }
        let model = std::env::var(ENV_WHISPER_MODEL)
            .unwrap_or_else(|_| DEFAULT_WHISPER_MODEL.to_string());
        Some(Self::new(base_url, model))
    }
}

/// OpenAI Whisper API response format.
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
}

#[derive(Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[async_trait]
impl TranscriptionBackend for WhisperBackend {
    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<TranscriptionResult> {
        let url = format!("{}/v1/audio/transcriptions", self.base_url);

        // Determine file extension from MIME type
        let ext = match mime_type {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" => "wav",
            "audio/ogg" => "ogg",
            "audio/flac" => "flac",
            "audio/aac" => "aac",
            "audio/webm" | "video/webm" => "webm",
            "video/quicktime" => "mov",
            "video/x-matroska" => "mkv",
            _ => "mp4",
        };

        let file_part = reqwest::multipart::Part::bytes(media.to_vec())
            .file_name(format!("media.{}", ext))
            .mime_str(mime_type)
            .map_err(|e| Error::Transcription(format!("Failed to create multipart: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("Transcription request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transcription(format!(
                "Whisper API returned {}: {}",
                status, body
            )));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            Error::Transcription(format!("Failed to parse whisper response: {}", e))
        })?;

        let segments = result
            .segments
            .unwrap_or_default()
            .into_iter()
            .map(|s| Segment {
                start_secs: s.start,
                end_secs: s.end,
                text: s.text,
            })
            .collect();

        Ok(TranscriptionResult {
            text: result.text,
            segments,
        })
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
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
