use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::FetchError;

const MAX_BACKOFF_MS: u64 = 10_000;

/// Exponential backoff: 500ms, 1s, 2s, ... capped at 10s
fn backoff_ms(attempt: u32) -> u64 {
    (1u64 << attempt.min(20)).saturating_mul(500).min(MAX_BACKOFF_MS)
}

fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// Map a non-success status to a user-facing error
fn status_error(status: StatusCode) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound,
        StatusCode::FORBIDDEN => FetchError::Forbidden,
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        _ => FetchError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error").to_string(),
        },
    }
}

/// Downloads playlist text from remote sources
pub struct PlaylistFetcher {
    client: Client,
    max_retries: u32,
    max_m3u_size_mb: usize,
}

impl PlaylistFetcher {
    pub fn new(
        user_agent: &str,
        timeout_ms: u64,
        max_retries: u32,
        max_m3u_size_mb: usize,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(timeout_ms))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            max_retries,
            max_m3u_size_mb,
        })
    }

    fn max_bytes(&self) -> u64 {
        (self.max_m3u_size_mb as u64) * 1024 * 1024
    }

    fn check_size(&self, bytes: u64) -> Result<(), FetchError> {
        if bytes > self.max_bytes() {
            return Err(FetchError::TooLarge {
                size_mb: bytes_to_mb(bytes),
                limit_mb: self.max_m3u_size_mb,
            });
        }
        Ok(())
    }

    async fn send_once(&self, url: &str) -> Result<Response, FetchError> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(status_error(resp.status()));
        }

        if let Some(len) = resp.content_length() {
            self.check_size(len)?;
        }

        Ok(resp)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Response, FetchError> {
        let mut attempt = 0;

        loop {
            match self.send_once(url).await {
                Ok(resp) => return Ok(resp),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let backoff = backoff_ms(attempt);
                    attempt += 1;
                    tracing::warn!(
                        fetch_retry = attempt,
                        reason = %err,
                        backoff_ms = backoff,
                        "retrying playlist fetch"
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Download a playlist body, enforcing the size limit while streaming
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self.fetch_with_retry(url).await?;

        if let Some(len) = response.content_length() {
            tracing::info!("Playlist size: {:.2} MB", bytes_to_mb(len));
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            body.extend_from_slice(&chunk);
            self.check_size(body.len() as u64)?;
        }

        Ok(body)
    }
}
