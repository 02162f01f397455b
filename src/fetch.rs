//! HTTP transport: retrying fetch, charset fallback decoding, and the
//! browser-profile session used for the bot-shielded source.
//!
//! # Retry policy
//!
//! Every listing/detail fetch runs under a fixed budget of 3 attempts with a
//! linearly increasing backoff (1s base, +1s per attempt). Connection-phase
//! timeouts are the exception: a host that is slow to even accept a
//! connection is unlikely to recover within the request's lifetime, so those
//! fail immediately without retry.
//!
//! # Decoding
//!
//! Community sites mis-declare their encodings routinely. Bytes are decoded
//! through an ordered fallback chain that always terminates in a lossy but
//! successful decode; a decoding problem is never surfaced to callers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use curl::easy::{Easy2, Handler, List, WriteError};
use encoding_rs::{EUC_KR, Encoding, UTF_8, WINDOWS_1252};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Desktop Chrome user agent presented on every request.
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANG_KO: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

/// Overall per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Connection-establishment timeout, deliberately short.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Transport failure taxonomy.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("connect timeout")]
    ConnectTimeout,
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("browser transport failed: {0}")]
    Browser(#[from] curl::Error),
    #[error("browser session unavailable")]
    Session,
    #[error("retries exhausted")]
    Unavailable,
}

/// Explicit retry/backoff parameters threaded into every transport call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of attempts before the fetch is reported unavailable.
    pub attempts: u32,
    /// Backoff before retry N is `base_backoff + N seconds`.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// Build the shared HTTP client with the crawl header profile and timeouts.
pub fn build_client() -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANG_KO));
    Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}

/// Fetch a page and decode it to text under the default retry policy.
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, FetchError> {
    fetch_html_with(client, url, &RetryPolicy::default()).await
}

/// Fetch a page with an explicit retry policy.
///
/// Transient failures are retried with increasing backoff; connect timeouts
/// abort immediately. Exhausting the budget yields [`FetchError::Unavailable`].
#[instrument(level = "debug", skip_all, fields(%url))]
pub async fn fetch_html_with(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    for attempt in 0..policy.attempts {
        match try_fetch(client, url).await {
            Ok(html) => return Ok(html),
            Err(FetchError::ConnectTimeout) => {
                warn!(%url, "connect timeout; skipping retries");
                return Err(FetchError::ConnectTimeout);
            }
            Err(e) => {
                warn!(%url, attempt = attempt + 1, error = %e, "fetch attempt failed");
            }
        }
        sleep(policy.base_backoff + Duration::from_secs(attempt as u64)).await;
    }
    Err(FetchError::Unavailable)
}

async fn try_fetch(client: &Client, url: &str) -> Result<String, FetchError> {
    let resp = client.get(url).send().await.map_err(classify)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let declared = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_from_content_type);
    let bytes = resp.bytes().await.map_err(classify)?;
    Ok(decode_html(url, &bytes, declared.as_deref()))
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_connect() {
        FetchError::ConnectTimeout
    } else {
        FetchError::Network(e)
    }
}

/// Pull the `charset` parameter out of a Content-Type header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            part[..part.len().min(8)]
                .eq_ignore_ascii_case("charset=")
                .then(|| part[8..].trim_matches('"').to_string())
        })
        .find(|c| !c.is_empty())
}

/// Decode response bytes to text using per-host hints and a fallback chain.
///
/// - `mlbpark.donga.com` declares UTF-8 but ships broken byte runs, so it is
///   decoded as UTF-8 with replacement instead of strict.
/// - `humoruniv.com` is EUC-KR regardless of what it declares.
/// - Everyone else: declared charset, then UTF-8, then EUC-KR, then a
///   Windows-1252 pass that cannot fail.
pub fn decode_html(url: &str, bytes: &[u8], declared: Option<&str>) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default();

    if host.ends_with("mlbpark.donga.com") {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    if host.ends_with("humoruniv.com") {
        for encoding in [EUC_KR, UTF_8] {
            if let Some(text) = decode_strict(encoding, bytes) {
                return text;
            }
        }
        if let Some(text) = declared
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .and_then(|enc| decode_strict(enc, bytes))
        {
            return text;
        }
        let (text, _, _) = EUC_KR.decode(bytes);
        return text.into_owned();
    }

    if let Some(text) = declared
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .and_then(|enc| decode_strict(enc, bytes))
    {
        return text;
    }
    for encoding in [UTF_8, EUC_KR] {
        if let Some(text) = decode_strict(encoding, bytes) {
            return text;
        }
    }
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    (!had_errors).then(|| text.into_owned())
}

// ---------------------------------------------------------------------------
// Browser-profile session
// ---------------------------------------------------------------------------

struct Collector(Vec<u8>);

impl Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.0.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Client-hint headers matching the pinned Chrome profile.
const BROWSER_HEADERS: &[&str] = &[
    "sec-ch-ua: \"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\"",
    "sec-ch-ua-mobile: ?0",
    "sec-ch-ua-platform: \"macOS\"",
    "sec-fetch-dest: document",
    "sec-fetch-mode: navigate",
    "sec-fetch-site: none",
    "sec-fetch-user: ?1",
    "upgrade-insecure-requests: 1",
];

/// A libcurl session presenting a browser fingerprint, with cookies persisted
/// across requests on a single reused handle.
///
/// fmkorea sits behind bot mitigation that rejects plain HTTP clients; it
/// accepts a consistent browser-like header profile paired with a cookie
/// session. The handle is not safe for concurrent use, so the internal mutex
/// serializes callers, and the blocking transfer runs on the blocking pool so
/// it never stalls the other sources' tasks.
#[derive(Clone)]
pub struct BrowserSession {
    handle: Arc<Mutex<Easy2<Collector>>>,
}

impl BrowserSession {
    /// Construct the session handle. One instance is shared for the lifetime
    /// of the process and reused across crawl runs.
    pub fn new() -> Result<Self, FetchError> {
        let mut easy = Easy2::new(Collector(Vec::new()));
        easy.useragent(DESKTOP_UA)?;
        let mut headers = List::new();
        headers.append(&format!("accept: {ACCEPT_HTML}"))?;
        headers.append(&format!("accept-language: {ACCEPT_LANG_KO}"))?;
        for header in BROWSER_HEADERS {
            headers.append(header)?;
        }
        easy.http_headers(headers)?;
        // Empty path enables the in-memory cookie engine without a backing file.
        easy.cookie_file("")?;
        easy.follow_location(true)?;
        easy.timeout(Duration::from_secs(30))?;
        easy.accept_encoding("")?;
        Ok(Self {
            handle: Arc::new(Mutex::new(easy)),
        })
    }

    /// Fetch and decode one page through the session.
    ///
    /// The transfer itself runs via `spawn_blocking`; concurrent callers are
    /// serialized on the session mutex.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let handle = Arc::clone(&self.handle);
        let request_url = url.to_string();
        let (bytes, status, content_type) = tokio::task::spawn_blocking(
            move || -> Result<(Vec<u8>, u32, Option<String>), FetchError> {
                let mut easy = handle.lock().map_err(|_| FetchError::Session)?;
                easy.get_mut().0.clear();
                easy.url(&request_url)?;
                easy.perform()?;
                let status = easy.response_code()?;
                let content_type = easy.content_type()?.map(str::to_owned);
                let bytes = std::mem::take(&mut easy.get_mut().0);
                Ok((bytes, status, content_type))
            },
        )
        .await
        .map_err(|_| FetchError::Session)??;

        if status != 200 {
            info!(%url, status, "browser session fetch rejected");
            return Err(FetchError::Status(status as u16));
        }
        debug!(%url, bytes = bytes.len(), "browser session fetch ok");
        let declared = content_type.as_deref().and_then(charset_from_content_type);
        Ok(decode_html(url, &bytes, declared.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/html; charset=euc-kr"),
            Some("euc-kr".to_string())
        );
        assert_eq!(
            charset_from_content_type("text/html; Charset=\"UTF-8\""),
            Some("UTF-8".to_string())
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn test_decode_falls_back_to_legacy_charset() {
        // "웃대" in EUC-KR; invalid as UTF-8.
        let bytes: &[u8] = &[0xBF, 0xF4, 0xB4, 0xEB];
        let decoded = decode_html("https://example.com/board", bytes, Some("utf-8"));
        assert_eq!(decoded, "웃대");
    }

    #[test]
    fn test_decode_latin1_terminal_fallback_never_fails() {
        // Invalid in UTF-8 and in EUC-KR (lone 0x80 lead byte at end).
        let bytes: &[u8] = &[0x41, 0xFF, 0xFE, 0x80];
        let decoded = decode_html("https://example.com/", bytes, None);
        assert!(decoded.starts_with('A'));
        assert_eq!(decoded.chars().count(), 4);
    }

    #[test]
    fn test_decode_mlbpark_hint_is_lossy_utf8() {
        let bytes: &[u8] = &[0xED, 0x95, 0x9C, 0xFF]; // "한" + broken byte
        let decoded = decode_html(
            "https://mlbpark.donga.com/mp/b.php?b=bullpen",
            bytes,
            Some("utf-8"),
        );
        assert!(decoded.starts_with('한'));
        assert!(decoded.contains('\u{FFFD}'));
    }

    #[test]
    fn test_decode_humoruniv_hint_prefers_euc_kr() {
        let bytes: &[u8] = &[0xC0, 0xAF, 0xB8, 0xD3]; // "유머" in EUC-KR
        let decoded = decode_html(
            "https://web.humoruniv.com/board/humor/list.html",
            bytes,
            Some("utf-8"),
        );
        assert_eq!(decoded, "유머");
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.base_backoff, Duration::from_secs(1));
    }
}
