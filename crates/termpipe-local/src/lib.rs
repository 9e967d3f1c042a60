use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termpipe_core::{Error, Result};

pub mod capability;
pub mod config;
pub mod extract;
pub mod keywords;
pub mod links;
pub mod mapper;
pub mod oracle;
pub mod pipeline;
pub mod rank;
pub mod resolver;
pub mod scrape;

/// Markup shorter than this is treated as a failed fetch rather than a page.
pub const MIN_MARKUP_BYTES: usize = 100;

/// Default per-request timeout. Homepage probes use a tighter one and the
/// primary article a looser one; see the pipeline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_MAX_BYTES: usize = 2_000_000;
const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// One browser-shaped header profile.
#[derive(Debug, Clone, Copy)]
pub struct BrowserProfile {
    pub headers: &'static [(&'static str, &'static str)],
}

const BROWSER_PROFILES: &[BrowserProfile] = &[
    BrowserProfile {
        headers: &[
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Connection", "keep-alive"),
            ("Upgrade-Insecure-Requests", "1"),
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "none"),
            ("Sec-Fetch-User", "?1"),
            ("Cache-Control", "max-age=0"),
        ],
    },
    BrowserProfile {
        headers: &[
            (
                "User-Agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
            ),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Connection", "keep-alive"),
        ],
    },
    BrowserProfile {
        headers: &[
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
            ),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.5"),
            ("Connection", "keep-alive"),
        ],
    },
];

/// Source of the browser identity used for the next request.
///
/// Injected into [`PageFetcher`] so tests can pin a deterministic sequence
/// instead of sharing a mutable counter.
pub trait IdentityPool: Send + Sync {
    fn next_profile(&self) -> BrowserProfile;
}

/// Round-robin over the built-in profiles, advanced once per request.
#[derive(Debug, Default)]
pub struct RotatingIdentities {
    counter: AtomicUsize,
}

impl IdentityPool for RotatingIdentities {
    fn next_profile(&self) -> BrowserProfile {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        BROWSER_PROFILES[n % BROWSER_PROFILES.len()]
    }
}

/// Always the same profile; test helper.
#[derive(Debug, Clone, Copy)]
pub struct PinnedIdentity(pub usize);

impl IdentityPool for PinnedIdentity {
    fn next_profile(&self) -> BrowserProfile {
        BROWSER_PROFILES[self.0 % BROWSER_PROFILES.len()]
    }
}

/// Single-attempt page fetcher with rotating browser identity and a fixed
/// politeness delay before every request. No retries, no caching.
#[derive(Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    identities: Arc<dyn IdentityPool>,
    delay: Duration,
    max_bytes: usize,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        Self::with_identities(Arc::new(RotatingIdentities::default()))
    }

    pub fn with_identities(identities: Arc<dyn IdentityPool>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            identities,
            delay: DEFAULT_DELAY,
            max_bytes: DEFAULT_MAX_BYTES,
        })
    }

    /// Override the politeness delay (tests use zero).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fetch raw markup. Distinct errors for bad URL, HTTP status, timeout,
    /// transport failure, and markup under [`MIN_MARKUP_BYTES`].
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let profile = self.identities.next_profile();
        let mut rb = self.client.get(parsed).timeout(timeout);
        for (k, v) in profile.headers {
            rb = rb.header(*k, *v);
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                Error::Timeout(url.to_string())
            } else {
                Error::Fetch(format!("{url}: {e}"))
            }
        };

        let resp = rb.send().await.map_err(map_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_err)?;
            if bytes.len().saturating_add(chunk.len()) > self.max_bytes {
                let can_take = self.max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.len() < MIN_MARKUP_BYTES {
            return Err(Error::ThinPage {
                url: url.to_string(),
                bytes: bytes.len(),
            });
        }
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Tolerant variant for callsites where a dead page only reduces
    /// coverage: failures are logged and become empty markup.
    pub async fn fetch_or_empty(&self, url: &str, timeout: Duration) -> String {
        match self.fetch(url, timeout).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("fetch degraded to empty: {e}");
                String::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;
    use termpipe_core::{Error, Oracle, OracleRequest, Result};

    /// Replays canned completions in order; `Err` entries simulate transport
    /// failures. Exhaustion is an error so tests notice extra calls.
    pub struct ScriptedOracle {
        responses: Mutex<std::vec::IntoIter<Result<String>>>,
    }

    impl ScriptedOracle {
        pub fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter()),
            }
        }

        pub fn ok(responses: &[&str]) -> Self {
            Self::new(responses.iter().map(|s| Ok(s.to_string())).collect())
        }
    }

    #[async_trait::async_trait]
    impl Oracle for ScriptedOracle {
        async fn complete(&self, _req: &OracleRequest) -> Result<String> {
            self.responses
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .next()
                .unwrap_or_else(|| Err(Error::Oracle("script exhausted".to_string())))
        }
    }
}
