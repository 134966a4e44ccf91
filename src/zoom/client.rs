use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ArchiveError;
use crate::models::{CanonicalRecording, RecordingsPage, ZoomMeeting};

/// Configuration for the recording provider's API
#[derive(Debug, Clone)]
pub struct ZoomConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Email or user id whose cloud recordings are queried
    pub user_id: String,
    pub base_url: String,
    pub auth_url: String,
}

impl ZoomConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name).with_context(|| format!("{name} environment variable not set"))
        };

        Ok(Self {
            account_id: var("ZOOM_ACCOUNT_ID")?,
            client_id: var("ZOOM_CLIENT_ID")?,
            client_secret: var("ZOOM_CLIENT_SECRET")?,
            user_id: var("ZOOM_USER_ID")?,
            base_url: "https://api.zoom.us/v2".to_string(),
            auth_url: "https://zoom.us/oauth/token".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the recording provider: canonical listing plus retrieval.
pub struct ZoomClient {
    client: Client,
    config: ZoomConfig,
    token: tokio::sync::OnceCell<String>,
}

impl ZoomClient {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            token: tokio::sync::OnceCell::new(),
        }
    }

    /// Fetch (once) the account-credentials OAuth token.
    async fn access_token(&self) -> Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let url = format!(
                    "{}?grant_type=account_credentials&account_id={}",
                    self.config.auth_url, self.config.account_id
                );
                let response = self
                    .client
                    .post(&url)
                    .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                    .header("content-type", "application/x-www-form-urlencoded")
                    .send()
                    .await
                    .context("failed to request access token")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!("token request failed: {status} - {body}");
                }

                let token: TokenResponse = response
                    .json()
                    .await
                    .context("failed to parse token response")?;
                debug!("obtained provider access token");
                Ok::<String, anyhow::Error>(token.access_token)
            })
            .await?;
        Ok(token)
    }

    /// List every cloud recording whose start falls inside [from, to].
    ///
    /// The provider caps one query at roughly a month, so the range is
    /// walked in 30-day chunks, each chunk paged through to the end.
    pub async fn list_recordings(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CanonicalRecording>> {
        let token = self.access_token().await?.to_string();
        let mut recordings = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut chunk_start = from;
        while chunk_start <= to {
            let chunk_end = (chunk_start + Duration::days(29)).min(to);
            debug!("listing recordings {} to {}", chunk_start, chunk_end);

            let mut next_page_token: Option<String> = None;
            loop {
                let url = format!(
                    "{}/users/{}/recordings",
                    self.config.base_url, self.config.user_id
                );
                let mut request = self
                    .client
                    .get(&url)
                    .bearer_auth(&token)
                    .query(&[
                        ("from", chunk_start.format("%Y-%m-%d").to_string()),
                        ("to", chunk_end.format("%Y-%m-%d").to_string()),
                        ("page_size", "300".to_string()),
                    ]);
                if let Some(page_token) = &next_page_token {
                    request = request.query(&[("next_page_token", page_token)]);
                }

                let response = request
                    .send()
                    .await
                    .context("failed to list recordings")?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    anyhow::bail!("recording listing failed: {status} - {body}");
                }

                let page: RecordingsPage = response
                    .json()
                    .await
                    .context("failed to parse recording listing")?;

                for meeting in &page.meetings {
                    if seen.insert(meeting.uuid.clone()) {
                        recordings.push(meeting.to_canonical());
                    }
                }

                match page.next_page_token.filter(|t| !t.is_empty()) {
                    Some(token) => next_page_token = Some(token),
                    None => break,
                }
            }

            chunk_start = chunk_end + Duration::days(1);
        }

        info!("provider returned {} recordings", recordings.len());
        Ok(recordings)
    }

    /// Fetch one meeting's recording metadata by canonical identifier.
    pub async fn fetch_meeting(&self, uuid: &str) -> Result<ZoomMeeting> {
        let token = self.access_token().await?.to_string();
        let url = format!(
            "{}/meetings/{}/recordings",
            self.config.base_url,
            encode_uuid(uuid)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .context("failed to fetch meeting recordings")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ArchiveError::RecordingNotFound {
                uuid: uuid.to_string(),
            }
            .into());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Retrieval {
                uuid: uuid.to_string(),
                reason: format!("{status} - {body}"),
            }
            .into());
        }

        response
            .json()
            .await
            .context("failed to parse meeting recordings")
    }

    /// Download the preferred media file for a recording, returning the
    /// local path. The file is streamed to `<dir>/<file_stem>.<ext>`.
    pub async fn download_by_uuid(
        &self,
        uuid: &str,
        dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf> {
        let meeting = self.fetch_meeting(uuid).await?;
        let (variant, file) =
            meeting
                .preferred_file()
                .ok_or_else(|| ArchiveError::Retrieval {
                    uuid: uuid.to_string(),
                    reason: "no downloadable media variant".to_string(),
                })?;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create directory {dir:?}"))?;
        let path = dir.join(format!("{file_stem}.{}", variant.extension()));

        // Download URLs want the token as a query parameter
        let separator = if file.download_url.contains('?') { '&' } else { '?' };
        let token = self.access_token().await?;
        let url = format!("{}{}access_token={}", file.download_url, separator, token);

        info!("downloading {} ({}) to {:?}", uuid, variant, path);
        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to start download")?;
        if !response.status().is_success() {
            return Err(ArchiveError::Retrieval {
                uuid: uuid.to_string(),
                reason: format!("download failed: {}", response.status()),
            }
            .into());
        }

        let mut out = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("failed to create file {path:?}"))?;
        let mut downloaded: u64 = 0;
        while let Some(chunk) = response.chunk().await.context("download interrupted")? {
            out.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write {path:?}"))?;
            downloaded += chunk.len() as u64;
        }
        out.flush().await?;

        info!("downloaded {:.1} MB", downloaded as f64 / (1024.0 * 1024.0));
        Ok(path)
    }
}

/// Canonical identifiers starting with '/' or containing '//' must be
/// double URL-encoded in the request path; everything else is encoded once.
fn encode_uuid(uuid: &str) -> String {
    if uuid.starts_with('/') || uuid.contains("//") {
        percent_encode(&percent_encode(uuid))
    } else {
        percent_encode(uuid)
    }
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
