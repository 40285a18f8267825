use crate::ingest::IngestError;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

// FSIS rejects requests that don't look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Capped exponential backoff with random jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub max_backoff: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            max_jitter: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_backoff);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        capped + Duration::from_millis(jitter)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, IngestError>
    where
        F: FnMut() -> Result<T, IngestError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let start = Instant::now();
            match op() {
                Ok(value) => {
                    tracing::debug!(what, attempt, elapsed = ?start.elapsed(), "fetch succeeded");
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(IngestError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(what, attempt, error = %e, ?delay, "fetch failed, retrying");
                    std::thread::sleep(delay);
                }
            }
        }
    }
}

pub struct FeedClient {
    client: Client,
    retry: RetryPolicy,
}

impl FeedClient {
    pub fn new(retry: RetryPolicy) -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| IngestError::Network(e.to_string()))?;

        Ok(Self { client, retry })
    }

    /// GET `url` and decode the JSON body, retrying transient failures.
    pub fn get_json<T: DeserializeOwned>(&self, url: &url::Url) -> Result<T, IngestError> {
        self.retry.run(url.as_str(), || self.try_get_json(url))
    }

    fn try_get_json<T: DeserializeOwned>(&self, url: &url::Url) -> Result<T, IngestError> {
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|e| IngestError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| IngestError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(IngestError::Http {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| IngestError::JsonParse(e.to_string()))
    }
}
