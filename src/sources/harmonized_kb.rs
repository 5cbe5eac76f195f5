//! Harmonized-KB client (`spec.md` §4.2): queries a VICC MetaKB-style
//! associations endpoint with a Lucene `GENE AND VARIANT` query and excludes
//! resistance hits that are attributable to a secondary/compound mutation
//! rather than the queried variant itself.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use crate::entities::evidence::HarmonizedAssertion;
use crate::error::TumorboardError;
use crate::preprocessor::low_quality_filter::filter_low_quality_minority_signals;
use crate::tumor_ontology::tumor_matches;
use crate::utils::query::escape_lucene_value;

const HARMONIZED_KB_BASE: &str = "https://search.cancervariants.org/api/v1";
const HARMONIZED_KB_BASE_ENV: &str = "TUMORBOARD_HARMONIZED_KB_BASE";
const SOURCE_NAME: &str = "harmonized-kb";
const DEFAULT_SIZE: usize = 50;

pub struct HarmonizedKbClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

#[derive(Debug, Default, Deserialize)]
struct AssociationsResponse {
    #[serde(default)]
    hits: HitsWrapper,
}

#[derive(Debug, Default, Deserialize)]
struct HitsWrapper {
    #[serde(default)]
    hits: Vec<Value>,
}

impl HarmonizedKbClient {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self { client: crate::sources::shared_client()?, base: crate::sources::env_base(HARMONIZED_KB_BASE, HARMONIZED_KB_BASE_ENV) })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, TumorboardError> {
        Ok(Self { client: crate::sources::shared_client()?, base: Cow::Owned(base) })
    }

    /// Fetches harmonized associations for `(gene, variant)`, optionally
    /// filtered to `tumor_type`, excluding resistance entries that the
    /// description attributes to a secondary mutation.
    pub async fn fetch_associations(&self, gene: &str, variant: &str, tumor_type: Option<&str>) -> Result<Vec<HarmonizedAssertion>, TumorboardError> {
        let query = build_query(gene, variant);
        let url = format!("{}/associations", self.base.as_ref().trim_end_matches('/'));
        let req = self.client.get(&url).query(&[("q", query.as_str()), ("size", &DEFAULT_SIZE.to_string())]);
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

        let parsed: AssociationsResponse = serde_json::from_slice(&bytes).map_err(|source| TumorboardError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: source.to_string(),
        })?;

        let parsed_associations: Vec<HarmonizedAssertion> = parsed.hits.hits.iter().filter_map(parse_association).collect();

        // Low-quality-minority filtering runs over the full, unfiltered set
        // before tumor-type narrowing, mirroring the original's
        // `filter_low_quality_minority_signals(assertions)` signature, which
        // takes no `tumor_type` parameter.
        let associations = filter_low_quality_minority_signals(&parsed_associations)
            .into_iter()
            .filter(|assoc| match tumor_type {
                Some(t) if !t.trim().is_empty() => assoc.disease.as_deref().map(|d| tumor_matches(t, d)).unwrap_or(false),
                _ => true,
            })
            .filter(|assoc| !is_compound_mutation_resistance(assoc, variant))
            .collect();

        Ok(associations)
    }
}

fn build_query(gene: &str, variant: &str) -> String {
    let clean_variant = variant.replace("p.", "").to_ascii_uppercase();
    format!("{} AND {}", escape_lucene_value(&gene.to_ascii_uppercase()), escape_lucene_value(&clean_variant))
}

fn parse_association(hit: &Value) -> Option<HarmonizedAssertion> {
    let association = hit.get("association").cloned().unwrap_or(Value::Null);

    let mut gene = String::new();
    let mut variant_from_name = None;
    if let Some(features) = hit.get("features").and_then(Value::as_array) {
        for feature in features {
            if let Some(symbol) = feature.get("geneSymbol").and_then(Value::as_str) {
                gene = symbol.to_string();
            }
            if let Some(name) = feature.get("name").and_then(Value::as_str) {
                if !gene.is_empty() && name.contains(&gene) {
                    variant_from_name = Some(name.replace(&gene, "").trim().to_string());
                }
            }
        }
    }

    let disease = hit.get("diseases").and_then(Value::as_str).map(str::to_string).filter(|s| !s.is_empty());

    let drugs: Vec<String> = hit
        .get("drugs")
        .and_then(Value::as_str)
        .map(|s| s.replace(',', " ").split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let evidence_level = hit.get("evidence_label").and_then(Value::as_str).unwrap_or_default().to_string();
    let response_type = association.get("response_type").and_then(Value::as_str).unwrap_or_default().to_string();

    let mut source = "harmonized-kb".to_string();
    if let Some(evidence_list) = association.get("evidence").and_then(Value::as_array) {
        for ev in evidence_list {
            if let Some(source_name) = ev.pointer("/evidenceType/sourceName").and_then(Value::as_str) {
                source = source_name.to_ascii_lowercase();
                break;
            }
        }
    }

    let description = association.get("description").and_then(Value::as_str).map(str::to_string).filter(|s| !s.is_empty());

    Some(HarmonizedAssertion {
        gene: if gene.is_empty() { variant_from_name.clone().unwrap_or_default() } else { gene },
        variant: variant_from_name.unwrap_or_default(),
        disease,
        drugs,
        evidence_level,
        response_type,
        source,
        description,
    })
}

/// Excludes resistance associations whose description attributes the
/// resistance to a secondary/compound mutation rather than the queried
/// variant (`examples/original_source` VICC client's compound-mutation
/// heuristic).
fn is_compound_mutation_resistance(assoc: &HarmonizedAssertion, variant: &str) -> bool {
    if variant.trim().is_empty() || !assoc.is_resistance() {
        return false;
    }
    let Some(description) = assoc.description.as_deref() else { return false };
    let desc_lower = description.to_ascii_lowercase();
    let variant_lower = variant.to_ascii_lowercase();
    let gene_lower = assoc.gene.to_ascii_lowercase();

    let indicators = [
        "secondary mutation".to_string(),
        "acquired mutation".to_string(),
        format!("harboring {variant_lower} and "),
        if gene_lower.is_empty() { String::new() } else { format!("{variant_lower} and {gene_lower}") },
        "developed resistance".to_string(),
        "resistance developed".to_string(),
    ];

    indicators.iter().any(|indicator| !indicator.is_empty() && desc_lower.contains(indicator.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn build_query_strips_p_prefix_and_escapes() {
        assert_eq!(build_query("BRAF", "p.v600e"), "BRAF AND V600E");
    }

    #[test]
    fn is_compound_mutation_resistance_detects_secondary_mutation_language() {
        let assoc = HarmonizedAssertion {
            gene: "KIT".into(),
            variant: "V560D".into(),
            disease: Some("GIST".into()),
            drugs: vec![],
            evidence_level: "B".into(),
            response_type: "Resistant".into(),
            source: "civic".into(),
            description: Some("Patients harboring V560D and a secondary mutation developed resistance to imatinib.".into()),
        };
        assert!(is_compound_mutation_resistance(&assoc, "V560D"));
    }

    #[test]
    fn is_compound_mutation_resistance_ignores_direct_resistance() {
        let assoc = HarmonizedAssertion {
            gene: "EGFR".into(),
            variant: "T790M".into(),
            disease: Some("NSCLC".into()),
            drugs: vec![],
            evidence_level: "A".into(),
            response_type: "Resistant".into(),
            source: "civic".into(),
            description: Some("T790M directly confers resistance to first-generation EGFR inhibitors.".into()),
        };
        assert!(!is_compound_mutation_resistance(&assoc, "T790M"));
    }

    #[tokio::test]
    async fn fetch_associations_filters_by_tumor_type_and_excludes_compound_resistance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/associations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hits": {"hits": [
                    {
                        "features": [{"geneSymbol": "BRAF", "name": "BRAF V600E"}],
                        "diseases": "Melanoma",
                        "drugs": "Vemurafenib",
                        "evidence_label": "A",
                        "association": {"response_type": "Sensitivity", "description": "Sensitive to vemurafenib."}
                    },
                    {
                        "features": [{"geneSymbol": "BRAF", "name": "BRAF V600E"}],
                        "diseases": "Colorectal Cancer",
                        "drugs": "Vemurafenib",
                        "evidence_label": "B",
                        "association": {"response_type": "Sensitivity", "description": "Sensitive in CRC."}
                    },
                    {
                        "features": [{"geneSymbol": "BRAF", "name": "BRAF V600E"}],
                        "diseases": "Melanoma",
                        "drugs": "Vemurafenib",
                        "evidence_label": "B",
                        "association": {"response_type": "Resistant", "description": "V600E and a secondary mutation developed resistance."}
                    }
                ]}
            })))
            .mount(&server)
            .await;

        let client = HarmonizedKbClient::new_for_test(server.uri()).unwrap();
        let out = client.fetch_associations("BRAF", "V600E", Some("Melanoma")).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_sensitivity());
    }
}
