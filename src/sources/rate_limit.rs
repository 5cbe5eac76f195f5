use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use http::Extensions;
use reqwest::Url;
use reqwest_middleware::{Middleware, Next};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

#[derive(Clone, Debug)]
pub(crate) struct RateLimitPolicy {
    pub key: &'static str,
    pub prefix: Cow<'static, str>,
    pub min_interval: Duration,
}

#[derive(Debug)]
pub(crate) struct RateLimiter {
    policies: Vec<RateLimitPolicy>,
    default_min_interval: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub(crate) fn from_env() -> Self {
        // NCBI_API_KEY enables the higher E-utilities request budget (10 req/sec).
        let has_ncbi_api_key = crate::sources::ncbi_api_key().is_some();
        let policies = vec![
            policy(
                "variant-annotation",
                "TUMORBOARD_VARIANT_ANNOTATION_BASE",
                "https://myvariant.info/v1",
                Duration::from_millis(200),
            ),
            policy(
                "curated-kb",
                "TUMORBOARD_CURATED_KB_BASE",
                "https://civicdb.org/api/graphql",
                Duration::from_millis(334),
            ),
            policy(
                "curated-assertion",
                "TUMORBOARD_CURATED_ASSERTION_BASE",
                "https://civicdb.org/api/graphql",
                Duration::from_millis(334),
            ),
            policy(
                "ncbi-eutils",
                "TUMORBOARD_NCBI_EUTILS_BASE",
                "https://eutils.ncbi.nlm.nih.gov/entrez/eutils",
                ncbi_eutils_min_interval(has_ncbi_api_key),
            ),
            policy(
                "drug-label",
                "TUMORBOARD_DRUG_LABEL_BASE",
                "https://api.fda.gov/drug",
                Duration::from_millis(250),
            ),
            policy(
                "curated-biomarker",
                "TUMORBOARD_CURATED_BIOMARKER_URL",
                "https://www.cancergenomeinterpreter.org/data/biomarkers/cgi_biomarkers_latest.tsv",
                Duration::from_millis(250),
            ),
            policy(
                "harmonized-kb",
                "TUMORBOARD_HARMONIZED_KB_BASE",
                "https://search.cancervariants.org/api/v1",
                Duration::from_millis(334),
            ),
            policy(
                "tumor-ontology",
                "TUMORBOARD_TUMOR_ONTOLOGY_BASE",
                "https://oncotree.mskcc.org/api",
                Duration::from_millis(200),
            ),
        ];
        Self::new(policies, Duration::from_millis(100))
    }

    pub(crate) fn new(policies: Vec<RateLimitPolicy>, default_min_interval: Duration) -> Self {
        Self {
            policies,
            default_min_interval,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_key_and_interval(&self, url: &Url) -> (String, Duration) {
        let full = url.as_str();

        if let Some(policy) = self
            .policies
            .iter()
            .filter(|p| full.starts_with(p.prefix.as_ref()))
            .max_by_key(|p| p.prefix.len())
        {
            return (format!("policy:{}", policy.key), policy.min_interval);
        }

        let origin = format!(
            "{}://{}",
            url.scheme(),
            url.host_str().unwrap_or("unknown-host")
        );
        (format!("default:{origin}"), self.default_min_interval)
    }

    pub(crate) async fn wait_for_url(&self, url: &Url) {
        let (key, min_interval) = self.resolve_key_and_interval(url);
        loop {
            let now = Instant::now();
            let mut map = self.last_seen.lock().await;
            let wait_until = map.get(&key).map(|last| *last + min_interval);

            match wait_until {
                Some(target) if target > now => {
                    drop(map);
                    sleep_until(target).await;
                }
                _ => {
                    map.insert(key, now);
                    return;
                }
            }
        }
    }

    #[cfg(test)]
    fn resolve_key_for_str(&self, raw: &str) -> Option<String> {
        let url = Url::parse(raw).ok()?;
        Some(self.resolve_key_and_interval(&url).0)
    }
}

fn ncbi_eutils_min_interval(has_ncbi_api_key: bool) -> Duration {
    if has_ncbi_api_key {
        Duration::from_millis(100)
    } else {
        Duration::from_millis(334)
    }
}

fn policy(
    key: &'static str,
    env_var: &'static str,
    default_prefix: &'static str,
    min_interval: Duration,
) -> RateLimitPolicy {
    RateLimitPolicy {
        key,
        prefix: crate::sources::env_base(default_prefix, env_var),
        min_interval,
    }
}

static GLOBAL_RATE_LIMITER: OnceLock<Arc<RateLimiter>> = OnceLock::new();

pub(crate) fn global_limiter() -> Arc<RateLimiter> {
    GLOBAL_RATE_LIMITER
        .get_or_init(|| Arc::new(RateLimiter::from_env()))
        .clone()
}

#[derive(Clone, Debug)]
pub(crate) struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub(crate) fn new() -> Self {
        Self {
            limiter: global_limiter(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        self.limiter.wait_for_url(req.url()).await;
        next.run(req, extensions).await
    }
}

pub(crate) async fn wait_for_url_str(raw: &str) {
    if let Ok(url) = Url::parse(raw) {
        global_limiter().wait_for_url(&url).await;
    }
}
