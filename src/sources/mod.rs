//! Knowledge-base clients and shared HTTP utilities for the six upstream
//! sources the Evidence Aggregator fans out to (`spec.md` §4.2).

use std::borrow::Cow;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use http_cache_reqwest::{CACacheManager, Cache, CacheMode, CacheOptions, HttpCache, HttpCacheOptions};
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::warn;

use crate::error::TumorboardError;

pub mod curated_assertion;
pub mod curated_biomarker;
pub mod drug_label;
pub mod harmonized_kb;
pub(crate) mod rate_limit;
pub mod variant_annotation;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

tokio::task_local! {
    static NO_CACHE: bool;
}

pub(crate) async fn with_no_cache<R, F>(no_cache: bool, fut: F) -> R
where
    F: Future<Output = R>,
{
    NO_CACHE.scope(no_cache, fut).await
}

pub(crate) fn apply_cache_mode(req: RequestBuilder) -> RequestBuilder {
    match NO_CACHE.try_with(|v| *v) {
        Ok(true) => req.with_extension(CacheMode::NoStore),
        _ => req,
    }
}

/// Every client's base URL is overridable via an environment variable,
/// falling back to the literal default (`SPEC_FULL.md` §3).
pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    std::env::var(env_var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Cow::Owned)
        .unwrap_or_else(|| Cow::Borrowed(default))
}

pub(crate) fn ncbi_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn append_ncbi_api_key(req: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    if let Some(key) = api_key {
        return req.query(&[("api_key", key)]);
    }
    req
}

fn parse_retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// `spec.md` §4.2: base 1s, factor 2, cap 10s, with jitter.
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(10);

fn retry_sleep_duration(attempt: u32, retry_after_floor: Option<Duration>) -> Duration {
    let backoff_ms = RETRY_BASE
        .as_millis()
        .saturating_mul(2_u128.saturating_pow(attempt)) as u64;
    let capped = Duration::from_millis(backoff_ms).min(RETRY_CAP);
    // Deterministic-enough jitter: vary by up to 20% using the attempt count
    // itself so retries of the same call don't all land on the same instant.
    let jitter_ms = (capped.as_millis() as u64 / 5).saturating_mul(u64::from(attempt % 3)) / 3;
    let jittered = capped.saturating_add(Duration::from_millis(jitter_ms));
    match retry_after_floor {
        Some(floor) if floor > jittered => floor,
        _ => jittered,
    }
}

/// Returns a shared HTTP client with retry and caching middleware. Every KB
/// client shares this one pooled client (`spec.md` §5).
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, TumorboardError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let mut default_headers = HeaderMap::new();
    default_headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-stale=86400"));

    let base_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("tumorboard-core/", env!("CARGO_PKG_VERSION")))
        .default_headers(default_headers)
        .build()
        .map_err(TumorboardError::HttpClientInit)?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    let cache_path = crate::utils::download::tumorboard_cache_dir().join("http-cacache");
    std::fs::create_dir_all(&cache_path)?;

    let cache_options = HttpCacheOptions {
        cache_options: Some(CacheOptions {
            shared: true,
            ..CacheOptions::default()
        }),
        ..HttpCacheOptions::default()
    };

    let client = ClientBuilder::new(base_client)
        .with(Cache(HttpCache {
            mode: CacheMode::Default,
            manager: CACacheManager { path: cache_path },
            options: cache_options,
        }))
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(rate_limit::RateLimitMiddleware::new())
        .build();

    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT.get().cloned().ok_or_else(|| TumorboardError::Transport {
            source_name: "http-client".into(),
            message: "shared HTTP client initialization race".into(),
        }),
    }
}

/// Retry wrapper for requests built fresh on every attempt (used by clients
/// that need 429 `Retry-After` handling beyond what the middleware provides).
pub(crate) async fn retry_send<F, Fut>(
    source_name: &str,
    max_retries: u32,
    build_request: F,
) -> Result<reqwest::Response, TumorboardError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let total_attempts = max_retries.saturating_add(1);
    let mut last_http_err: Option<reqwest::Error> = None;
    let mut last_server_status: Option<reqwest::StatusCode> = None;

    for attempt in 0..total_attempts {
        let mut retry_after_floor = None;
        match build_request().await {
            Ok(resp)
                if resp.status().is_server_error()
                    || resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
            {
                let status = resp.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    retry_after_floor = parse_retry_after_header(resp.headers());
                }
                last_server_status = Some(status);
            }
            Ok(resp) => return Ok(resp),
            Err(err) => {
                if err.is_timeout() || err.is_connect() {
                    last_http_err = Some(err);
                } else {
                    return Err(TumorboardError::Http(err));
                }
            }
        }

        if attempt + 1 < total_attempts {
            tokio::time::sleep(retry_sleep_duration(attempt, retry_after_floor)).await;
        }
    }

    if let Some(status) = last_server_status {
        return Err(TumorboardError::Transport {
            source_name: source_name.to_string(),
            message: format!("HTTP {status} after {total_attempts} attempts"),
        });
    }
    if let Some(err) = last_http_err {
        return Err(TumorboardError::Http(err));
    }
    Err(TumorboardError::Transport {
        source_name: source_name.to_string(),
        message: format!("all retry attempts exhausted after {total_attempts} attempts"),
    })
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);

    let truncated: &str = if full.len() > ERROR_BODY_MAX_BYTES {
        let mut end = ERROR_BODY_MAX_BYTES;
        while end > 0 && !full.is_char_boundary(end) {
            end -= 1;
        }
        &full[..end]
    } else {
        full.as_ref()
    };

    let mut s = truncated.trim().replace(['\n', '\r', '\t'], " ");
    if full.len() > ERROR_BODY_MAX_BYTES {
        s.push_str(" …");
    }
    s
}

pub(crate) fn ensure_json_content_type(
    source_name: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), TumorboardError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let raw = match content_type.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            warn!(source = source_name, "response content-type header was not valid UTF-8");
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let media_type = raw.split(';').next().map(str::trim).unwrap_or_default().to_ascii_lowercase();
    let is_html = matches!(media_type.as_str(), "text/html" | "application/xhtml+xml");
    if is_html {
        return Err(TumorboardError::Parse {
            source_name: source_name.to_string(),
            message: format!("unexpected HTML response (content-type: {raw}): {}", body_excerpt(body)),
        });
    }

    let is_json = media_type == "application/json" || media_type == "text/json" || media_type.ends_with("+json");
    if !is_json {
        warn!(source = source_name, content_type = raw, "unexpected non-JSON content type; attempting JSON parse");
    }

    Ok(())
}

pub(crate) async fn read_limited_body(mut resp: reqwest::Response, source_name: &str) -> Result<Vec<u8>, TumorboardError> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = resp.chunk().await? {
        let next_len = body.len().saturating_add(chunk.len());
        if next_len > DEFAULT_MAX_BODY_BYTES {
            return Err(TumorboardError::Transport {
                source_name: source_name.to_string(),
                message: format!("response body exceeded {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn ensure_json_content_type_rejects_html() {
        let err = ensure_json_content_type(
            "drug-label",
            Some(&HeaderValue::from_static("text/html; charset=utf-8")),
            b"<html><body>upstream error</body></html>",
        )
        .expect_err("html should be rejected");
        let msg = err.to_string();
        assert!(msg.contains("drug-label"));
        assert!(msg.contains("HTML"));
    }

    #[test]
    fn ensure_json_content_type_accepts_json() {
        assert!(
            ensure_json_content_type(
                "drug-label",
                Some(&HeaderValue::from_static("application/json; charset=utf-8")),
                b"{\"ok\":true}",
            )
            .is_ok()
        );
    }

    #[test]
    fn retry_sleep_duration_uses_retry_after_as_floor() {
        assert_eq!(retry_sleep_duration(0, Some(Duration::from_secs(5))), Duration::from_secs(5));
    }

    #[test]
    fn retry_sleep_duration_caps_at_ten_seconds() {
        assert!(retry_sleep_duration(10, None) <= Duration::from_millis(10_000 + 10_000 / 5));
    }

    #[tokio::test]
    async fn retry_send_retries_on_too_many_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/retry"))
            .and(query_param("attempt", "0"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/retry"))
            .and(query_param("attempt", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/retry", server.uri());
        let attempts = Arc::new(AtomicUsize::new(0));
        let resp = retry_send("test-source", 2, {
            let client = client.clone();
            let url = url.clone();
            let attempts = attempts.clone();
            move || {
                let client = client.clone();
                let url = url.clone();
                let attempts = attempts.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    client.get(&url).query(&[("attempt", attempt.to_string())]).send().await
                }
            }
        })
        .await
        .expect("retry_send should retry on 429");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
