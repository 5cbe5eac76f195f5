//! Curated-assertion client (`spec.md` §4.2): fetches accepted AMP/ASCO/CAP
//! assertions for a molecular profile from the curated-KB's GraphQL API.
//!
//! The upstream `ampLevel` field is a single compound string such as
//! `"TIER_I_LEVEL_A"`. The tier token is not safe to recover with ordered
//! substring checks — `"TIER_I"` is itself a prefix of `"TIER_II"`,
//! `"TIER_III"`, and `"TIER_IV"` — so this splits on the literal `"_LEVEL_"`
//! separator instead.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::entities::evidence::PredictiveAssertion;
use crate::error::TumorboardError;

const CURATED_ASSERTION_BASE: &str = "https://civicdb.org/api/graphql";
const CURATED_ASSERTION_BASE_ENV: &str = "TUMORBOARD_CURATED_ASSERTION_BASE";
const SOURCE_NAME: &str = "curated-assertion";

const ASSERTIONS_QUERY: &str = r#"
query($name: String!, $first: Int!) {
  assertions(molecularProfileName: $name, status: ACCEPTED, first: $first) {
    nodes {
      name
      assertionType
      assertionDirection
      ampLevel
      significance
      status
      molecularProfile { name }
      disease { displayName }
      therapies { name }
      fdaCompanionTest
      nccnGuideline
      summary
      description
    }
  }
}
"#;

pub struct CuratedAssertionClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl CuratedAssertionClient {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(CURATED_ASSERTION_BASE, CURATED_ASSERTION_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, TumorboardError> {
        Ok(Self { client: crate::sources::shared_client()?, base: Cow::Owned(base) })
    }

    /// Fetches accepted assertions for `"{gene} {variant}"`, falling back to
    /// the gene-level `"{gene} MUTATION"` profile when nothing is found.
    pub async fn fetch_assertions(&self, gene: &str, variant: &str) -> Result<Vec<PredictiveAssertion>, TumorboardError> {
        let specific = format!("{gene} {variant}");
        let assertions = self.query(&specific, 25).await?;
        if !assertions.is_empty() {
            return Ok(assertions);
        }
        self.query(&format!("{gene} MUTATION"), 25).await
    }

    async fn query(&self, molecular_profile_name: &str, first: usize) -> Result<Vec<PredictiveAssertion>, TumorboardError> {
        let body = GraphQlRequest { query: ASSERTIONS_QUERY, variables: serde_json::json!({"name": molecular_profile_name, "first": first}) };
        let req = self.client.post(self.base.as_ref()).json(&body);
        let resp = crate::sources::apply_cache_mode(req).send().await?;
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

        let parsed: GraphQlResponse<AssertionsData> = serde_json::from_slice(&bytes).map_err(|source| TumorboardError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: source.to_string(),
        })?;

        if let Some(errors) = parsed.errors {
            let message = errors.into_iter().filter_map(|e| e.message).collect::<Vec<_>>().join("; ");
            if !message.is_empty() {
                return Err(TumorboardError::Parse { source_name: SOURCE_NAME.to_string(), message });
            }
        }

        let nodes = parsed.data.map(|d| d.assertions.nodes).unwrap_or_default();
        Ok(nodes.into_iter().map(AssertionNode::into_predictive_assertion).collect())
    }
}

/// Splits a compound `"TIER_I_LEVEL_A"`-shaped string into `(tier, level)`.
/// Returns `None` for anything that doesn't contain the `"_LEVEL_"`
/// separator rather than guessing.
fn split_amp_level(raw: &str) -> (Option<String>, Option<String>) {
    match raw.split_once("_LEVEL_") {
        Some((tier, level)) if !tier.is_empty() && !level.is_empty() => (Some(tier.to_string()), Some(level.to_string())),
        _ => (None, None),
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssertionsData {
    assertions: AssertionConnection,
}

#[derive(Debug, Default, Deserialize)]
struct AssertionConnection {
    #[serde(default)]
    nodes: Vec<AssertionNode>,
}

#[derive(Debug, Deserialize)]
struct AssertionNode {
    name: String,
    #[serde(rename = "assertionType")]
    assertion_type: String,
    #[serde(rename = "assertionDirection")]
    assertion_direction: String,
    #[serde(rename = "ampLevel")]
    amp_level: Option<String>,
    significance: String,
    status: String,
    #[serde(rename = "molecularProfile")]
    molecular_profile: NameNode,
    disease: Option<DiseaseNode>,
    #[serde(default)]
    therapies: Vec<NameNode>,
    #[serde(rename = "fdaCompanionTest")]
    fda_companion_test: Option<bool>,
    #[serde(rename = "nccnGuideline")]
    nccn_guideline: Option<String>,
    summary: Option<String>,
    description: Option<String>,
}

impl AssertionNode {
    fn into_predictive_assertion(self) -> PredictiveAssertion {
        let (amp_tier, amp_level_letter) = self.amp_level.as_deref().map(split_amp_level).unwrap_or((None, None));
        PredictiveAssertion {
            name: self.name,
            amp_tier,
            amp_level_letter,
            assertion_type: self.assertion_type,
            assertion_direction: self.assertion_direction,
            significance: self.significance,
            status: self.status,
            molecular_profile: self.molecular_profile.name,
            disease: self.disease.map(|d| d.display_name).unwrap_or_default(),
            therapies: self.therapies.into_iter().map(|t| t.name).collect(),
            fda_companion_test: self.fda_companion_test,
            nccn_guideline: self.nccn_guideline,
            description: self.description.or(self.summary),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NameNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DiseaseNode {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn split_amp_level_separates_tier_and_letter() {
        assert_eq!(split_amp_level("TIER_I_LEVEL_A"), (Some("TIER_I".to_string()), Some("A".to_string())));
        assert_eq!(split_amp_level("TIER_III_LEVEL_C"), (Some("TIER_III".to_string()), Some("C".to_string())));
    }

    #[test]
    fn split_amp_level_does_not_mistake_tier_i_for_a_prefix_of_tier_iv() {
        let (tier, _) = split_amp_level("TIER_IV_LEVEL_D");
        assert_eq!(tier.as_deref(), Some("TIER_IV"));
        assert_ne!(tier.as_deref(), Some("TIER_I"));
    }

    #[test]
    fn split_amp_level_returns_none_for_unrecognized_format() {
        assert_eq!(split_amp_level("UNKNOWN"), (None, None));
    }

    #[tokio::test]
    async fn fetch_assertions_falls_back_to_gene_level_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("BRAF V600Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"assertions": {"nodes": []}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("BRAF MUTATION"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"assertions": {"nodes": [{
                    "name": "AID7",
                    "assertionType": "PREDICTIVE",
                    "assertionDirection": "SUPPORTS",
                    "ampLevel": "TIER_I_LEVEL_A",
                    "significance": "SENSITIVITYRESPONSE",
                    "status": "ACCEPTED",
                    "molecularProfile": {"name": "BRAF MUTATION"},
                    "disease": {"displayName": "Melanoma"},
                    "therapies": [{"name": "Dabrafenib"}],
                    "fdaCompanionTest": true,
                    "nccnGuideline": null,
                    "summary": "Sensitive in melanoma",
                    "description": null
                }]}}
            })))
            .mount(&server)
            .await;

        let client = CuratedAssertionClient::new_for_test(format!("{}/", server.uri())).unwrap();
        let out = client.fetch_assertions("BRAF", "V600Z").await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amp_tier.as_deref(), Some("TIER_I"));
        assert_eq!(out[0].amp_level_letter.as_deref(), Some("A"));
        assert_eq!(out[0].description.as_deref(), Some("Sensitive in melanoma"));
    }
}
