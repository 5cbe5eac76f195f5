//! Tumor-type resolution and the shared tumor-match predicate consulted by
//! every KB client (`spec.md` §4.2 Tumor-ontology client, §4.5.1).
//!
//! `resolve()` is OncoTree-backed (MSK's cancer classification API) and
//! memoizes the full catalogue in-process for the engine run's lifetime;
//! `tumor_matches` is pure and needs no network access, so it is consulted
//! synchronously wherever evidence is filtered by tumor type.

use std::borrow::Cow;
use std::sync::OnceLock;

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::error::TumorboardError;
use crate::utils::constants::TUMOR_TYPE_MAPPINGS;

const TUMOR_ONTOLOGY_BASE: &str = "https://oncotree.mskcc.org/api";
const TUMOR_ONTOLOGY_BASE_ENV: &str = "TUMORBOARD_TUMOR_ONTOLOGY_BASE";
const SOURCE_NAME: &str = "tumor-ontology";

#[derive(Debug, Clone, Deserialize)]
struct TumorType {
    code: String,
    name: String,
}

pub struct TumorOntologyClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    catalogue: OnceCell<Vec<TumorType>>,
}

impl TumorOntologyClient {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(TUMOR_ONTOLOGY_BASE, TUMOR_ONTOLOGY_BASE_ENV),
            catalogue: OnceCell::new(),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, TumorboardError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            catalogue: OnceCell::new(),
        })
    }

    async fn all_tumor_types(&self) -> &[TumorType] {
        let fetched = self
            .catalogue
            .get_or_init(|| async {
                match self.fetch_all_tumor_types().await {
                    Ok(types) => types,
                    Err(err) => {
                        tracing::warn!(source = SOURCE_NAME, error = %err, "tumor ontology catalogue fetch failed; resolve() will fall back to raw input");
                        Vec::new()
                    }
                }
            })
            .await;
        fetched.as_slice()
    }

    async fn fetch_all_tumor_types(&self) -> Result<Vec<TumorType>, TumorboardError> {
        let url = format!("{}/tumorTypes", self.base.as_ref().trim_end_matches('/'));
        let resp = crate::sources::apply_cache_mode(self.client.get(&url)).send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, SOURCE_NAME).await?;

        if !status.is_success() {
            return Err(TumorboardError::Transport {
                source_name: SOURCE_NAME.to_string(),
                message: format!("HTTP {status}: {}", crate::sources::body_excerpt(&bytes)),
            });
        }
        crate::sources::ensure_json_content_type(SOURCE_NAME, content_type.as_ref(), &bytes)?;
        serde_json::from_slice(&bytes).map_err(|source| TumorboardError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: source.to_string(),
        })
    }

    /// Resolves free-form user input to a standardized tumor-type name
    /// (`spec.md` §4.2, `SPEC_FULL.md` §5's `resolve_tumor_type` supplement).
    ///
    /// Handles three input shapes: an exact OncoTree code (`"NSCLC"`), a
    /// `"CODE - Full Name"` pair, or free-form text that isn't a known code
    /// at all (returned unchanged — it may already be a full name the
    /// downstream KBs will match against directly).
    pub async fn resolve(&self, user_input: &str) -> String {
        let trimmed = user_input.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        if let Some((_, name)) = trimmed.split_once(" - ") {
            return name.trim().to_string();
        }

        let upper = trimmed.to_ascii_uppercase();
        let types = self.all_tumor_types().await;
        if let Some(found) = types.iter().find(|t| t.code.to_ascii_uppercase() == upper) {
            return found.name.clone();
        }

        trimmed.to_string()
    }
}

fn synonym_key(text: &str) -> Option<&'static str> {
    static NEEDLES: OnceLock<Vec<(&'static str, Vec<&'static str>)>> = OnceLock::new();
    let needles = NEEDLES.get_or_init(|| {
        TUMOR_TYPE_MAPPINGS
            .iter()
            .map(|(key, synonyms)| (*key, synonyms.to_vec()))
            .collect()
    });
    let lower = text.to_ascii_lowercase();
    needles
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| lower.contains(s)))
        .map(|(key, _)| *key)
}

/// Whether `candidate_disease` (as surfaced by a KB record) should be
/// considered a match for `resolved_tumor_type` (as resolved by
/// [`TumorOntologyClient::resolve`] or passed through raw). Matches on exact
/// case-insensitive equality, substring containment in either direction, or
/// shared tumor-synonym-table membership (`spec.md` §4.5.1).
pub fn tumor_matches(resolved_tumor_type: &str, candidate_disease: &str) -> bool {
    let query = resolved_tumor_type.trim();
    let candidate = candidate_disease.trim();
    if query.is_empty() || candidate.is_empty() {
        return false;
    }

    let query_lower = query.to_ascii_lowercase();
    let candidate_lower = candidate.to_ascii_lowercase();

    if query_lower == candidate_lower {
        return true;
    }
    if candidate_lower.contains(&query_lower) || query_lower.contains(&candidate_lower) {
        return true;
    }

    match (synonym_key(&query_lower), synonym_key(&candidate_lower)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
