use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

use crate::models::WhisperResponse;

/// Files above this size are likely to be rejected by the transcription
/// service (its documented cap is 25 MB).
const UPLOAD_WARN_BYTES: u64 = 24 * 1024 * 1024;

/// Configuration for the transcription service client
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// API key (from OPENAI_API_KEY env var)
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl TranscriberConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;

        Ok(Self {
            api_key,
            model: "whisper-1".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }
}

/// Client for the speech-to-text service.
pub struct Transcriber {
    client: Client,
    config: TranscriberConfig,
}

impl Transcriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Transcribe a media file into timestamped segments plus the
    /// plain-text rendering.
    pub async fn transcribe(&self, media: &Path) -> Result<WhisperResponse> {
        let bytes = tokio::fs::read(media)
            .await
            .with_context(|| format!("failed to read media file {media:?}"))?;
        if bytes.len() as u64 > UPLOAD_WARN_BYTES {
            warn!(
                "{:?} is {:.1} MB; the transcription service may reject it",
                media,
                bytes.len() as f64 / (1024.0 * 1024.0)
            );
        }

        let file_name = media
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        let form = Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .part("file", Part::bytes(bytes).file_name(file_name));

        info!("transcribing {:?}", media);
        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .context("failed to send transcription request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("transcription service error: {status} - {body}");
        }

        let transcription: WhisperResponse = response
            .json()
            .await
            .context("failed to parse transcription response")?;

        info!(
            "transcribed {:.1}s of audio into {} segments",
            transcription.duration,
            transcription.segments.len()
        );
        Ok(transcription)
    }
}
