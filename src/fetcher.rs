use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::settings::Settings;

const REFERER_URL: &str = "https://sutian.moe.edu.tw/";
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of dictionary pages for a headword.
///
/// Failing to get a page is an error; a page with no examples is not.
pub trait Fetcher {
    fn fetch(&self, word: &str) -> Result<String, FetchError>;
}

/// Blocking client for the MOE Taiwanese dictionary search page.
pub struct SutianClient {
    client: Client,
    base_url: String,
    lookup_mode: String,
    user_agents: Vec<String>,
    next_agent: AtomicUsize,
    max_retries: u32,
    backoff: Duration,
}

impl SutianClient {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"));
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        let user_agents = if settings.user_agents.is_empty() {
            vec![FALLBACK_USER_AGENT.to_string()]
        } else {
            settings.user_agents.clone()
        };

        Ok(SutianClient {
            client,
            base_url: settings.base_url.clone(),
            lookup_mode: settings.lookup_mode.clone(),
            user_agents,
            next_agent: AtomicUsize::new(0),
            max_retries: settings.max_retries,
            backoff: Duration::from_millis(settings.backoff_ms),
        })
    }

    /// Round-robin over the configured agents.
    fn next_user_agent(&self) -> &str {
        let i = self.next_agent.fetch_add(1, Ordering::Relaxed);
        &self.user_agents[i % self.user_agents.len()]
    }
}

impl Fetcher for SutianClient {
    fn fetch(&self, word: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            let start = Instant::now();
            let response = self
                .client
                .get(&self.base_url)
                .query(&[("lui", self.lookup_mode.as_str()), ("tsha", word)])
                .header(USER_AGENT, self.next_user_agent())
                .send()?;
            let status = response.status();
            debug!("GET {} -> {} in {}ms", word, status, start.elapsed().as_millis());

            if status.is_success() {
                return Ok(response.text()?);
            }
            if !is_retryable(status) || attempt >= self.max_retries {
                return Err(FetchError::Status(status.as_u16()));
            }

            let backoff = backoff_delay(self.backoff, attempt);
            warn!(
                "{} on {} (attempt {}/{}), backing off {:.1}s",
                status,
                word,
                attempt + 1,
                self.max_retries,
                backoff.as_secs_f64()
            );
            std::thread::sleep(backoff);
            attempt += 1;
        }
    }
}

/// `base * 2^attempt`, saturating instead of overflowing on large retry counts.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

/// Reads `<dir>/<word>.html`, for offline runs against saved pages.
pub struct HtmlDirFetcher {
    dir: PathBuf,
}

impl HtmlDirFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        HtmlDirFetcher { dir: dir.into() }
    }
}

impl Fetcher for HtmlDirFetcher {
    fn fetch(&self, word: &str) -> Result<String, FetchError> {
        let path = self.dir.join(format!("{}.html", word));
        Ok(std::fs::read_to_string(path)?)
    }
}
