//! Variant-annotation client (`spec.md` §4.2): a MyVariant.info-style lookup
//! that aggregates ClinVar/COSMIC/CIViC-shaped annotations for one
//! `(gene, variant)` pair, falling back through a curated-KB GraphQL query
//! and finally NCBI E-utilities when the primary lookup comes back empty.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use crate::entities::evidence::{ClinicalSignificanceRecord, Evidence, SomaticCatalogueRecord, VariantAnnotationRecord};
use crate::error::TumorboardError;

const VARIANT_ANNOTATION_BASE: &str = "https://myvariant.info/v1";
const VARIANT_ANNOTATION_BASE_ENV: &str = "TUMORBOARD_VARIANT_ANNOTATION_BASE";
const CURATED_KB_BASE: &str = "https://civicdb.org/api/graphql";
const CURATED_KB_BASE_ENV: &str = "TUMORBOARD_CURATED_KB_BASE";
const NCBI_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const NCBI_EUTILS_BASE_ENV: &str = "TUMORBOARD_NCBI_EUTILS_BASE";
const SOURCE_NAME: &str = "variant-annotation";

pub struct VariantAnnotationClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    curated_kb_base: Cow<'static, str>,
    ncbi_eutils_base: Cow<'static, str>,
}

#[derive(Debug, Deserialize)]
struct MyVariantResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    hits: Vec<Value>,
}

impl VariantAnnotationClient {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(VARIANT_ANNOTATION_BASE, VARIANT_ANNOTATION_BASE_ENV),
            curated_kb_base: crate::sources::env_base(CURATED_KB_BASE, CURATED_KB_BASE_ENV),
            ncbi_eutils_base: crate::sources::env_base(NCBI_EUTILS_BASE, NCBI_EUTILS_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String, curated_kb_base: String, ncbi_eutils_base: String) -> Result<Self, TumorboardError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
            curated_kb_base: Cow::Owned(curated_kb_base),
            ncbi_eutils_base: Cow::Owned(ncbi_eutils_base),
        })
    }

    /// Fetches the aggregated annotation bundle for `(gene, variant)`,
    /// trying three query forms before degrading to the curated-KB and
    /// NCBI fallbacks (`spec.md` §4.2).
    pub async fn fetch_evidence(&self, gene: &str, variant: &str) -> Result<Evidence, TumorboardError> {
        let protein_notation = if variant.starts_with("p.") {
            variant.to_string()
        } else {
            format!("p.{variant}")
        };

        let mut result = self.query(&format!("{gene} {protein_notation}")).await?;
        if result.total == 0 {
            tracing::debug!(source = SOURCE_NAME, gene, variant, "form 1 empty, trying gene:variant");
            result = self.query(&format!("{gene}:{variant}")).await?;
        }
        if result.total == 0 {
            tracing::debug!(source = SOURCE_NAME, gene, variant, "form 2 empty, trying gene variant");
            result = self.query(&format!("{gene} {variant}")).await?;
        }

        if result.hits.is_empty() {
            tracing::debug!(source = SOURCE_NAME, gene, variant, "primary lookup empty, falling back to curated-KB and NCBI");
            let civic_fallback = self.fetch_curated_kb_fallback(gene, variant).await.unwrap_or_default();
            let clinvar_fallback = self.fetch_ncbi_clinvar_fallback(gene, variant).await.unwrap_or_default();

            let mut evidence = Evidence::empty(format!("{gene}:{variant}"), gene, variant);
            evidence.variant_annotations = civic_fallback;
            if let Some(record) = clinvar_fallback {
                evidence.clinvar_id = Some(record.variant_id);
                evidence.clinvar_clinical_significance = record.clinical_significance;
                evidence.clinvar_accession = record.accession;
            }
            return Ok(evidence);
        }

        let mut evidence = self.extract_from_hit(&result.hits[0], gene, variant);

        if evidence.variant_annotations.is_empty() {
            let civic_fallback = self.fetch_curated_kb_fallback(gene, variant).await.unwrap_or_default();
            if !civic_fallback.is_empty() {
                evidence.variant_annotations = civic_fallback;
            }
        }
        if evidence.clinvar_id.is_none() && evidence.clinvar_clinical_significance.is_none() {
            if let Some(record) = self.fetch_ncbi_clinvar_fallback(gene, variant).await.unwrap_or(None) {
                evidence.clinvar_id = Some(record.variant_id);
                evidence.clinvar_clinical_significance = record.clinical_significance;
                evidence.clinvar_accession = record.accession;
            }
        }

        Ok(evidence)
    }

    async fn query(&self, q: &str) -> Result<MyVariantResponse, TumorboardError> {
        let url = format!("{}/query", self.base.as_ref().trim_end_matches('/'));
        let fields = "civic,clinvar,cosmic,dbsnp,cadd,entrezgene,hgvs,snpeff,dbnsfp,gnomad_exome";
        let req = self.client.get(&url).query(&[("q", q), ("fields", fields)]);
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
        serde_json::from_slice(&bytes).map_err(|source| TumorboardError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: source.to_string(),
        })
    }

    fn extract_from_hit(&self, hit: &Value, gene: &str, variant: &str) -> Evidence {
        let variant_id = hit.get("_id").and_then(Value::as_str).unwrap_or(variant).to_string();

        let cosmic_id = first_of(hit.get("cosmic")).and_then(|c| c.get("cosmic_id")).and_then(Value::as_str).map(str::to_string);

        let ncbi_gene_id = hit
            .get("entrezgene")
            .map(value_to_string)
            .or_else(|| first_of(hit.get("dbsnp")).and_then(|d| d.get("gene")).and_then(|g| g.get("geneid")).map(value_to_string));

        let dbsnp_id = first_of(hit.get("dbsnp")).and_then(|d| d.get("rsid")).and_then(Value::as_str).map(|rsid| {
            if rsid.starts_with("rs") { rsid.to_string() } else { format!("rs{rsid}") }
        });

        let first_clinvar = first_of(hit.get("clinvar"));
        let clinvar_id = first_clinvar.and_then(|c| c.get("variant_id")).map(value_to_string);
        let first_rcv = first_clinvar.and_then(|c| c.get("rcv")).and_then(first_of);
        let clinvar_clinical_significance = first_rcv.and_then(|r| r.get("clinical_significance")).and_then(Value::as_str).map(str::to_string);
        let clinvar_accession = first_rcv.and_then(|r| r.get("accession")).and_then(Value::as_str).map(str::to_string);

        let mut hgvs_genomic = None;
        let mut hgvs_protein = None;
        let mut hgvs_transcript = None;
        if let Some(id) = hit.get("_id").and_then(Value::as_str) {
            if id.starts_with("chr") || id.starts_with("NC_") {
                hgvs_genomic = Some(id.to_string());
            }
        }
        for h in as_list(hit.get("hgvs")) {
            let Some(s) = h.as_str() else { continue };
            if s.starts_with("chr") || s.starts_with("NC_") {
                hgvs_genomic = Some(s.to_string());
            } else if s.contains(":p.") && hgvs_protein.is_none() {
                hgvs_protein = Some(s.to_string());
            } else if s.contains(":c.") && hgvs_transcript.is_none() {
                hgvs_transcript = Some(s.to_string());
            }
        }

        let snpeff_ann = first_of(hit.get("snpeff").and_then(|s| s.get("ann")));
        let snpeff_effect = snpeff_ann.and_then(|a| a.get("effect")).and_then(Value::as_str).map(str::to_string);
        let transcript_id = snpeff_ann.and_then(|a| a.get("feature_id")).and_then(Value::as_str).map(str::to_string);
        let transcript_consequence = snpeff_effect.clone();

        let polyphen2_prediction = hit
            .get("dbnsfp")
            .and_then(|d| d.get("polyphen2"))
            .and_then(|p| p.get("hdiv"))
            .and_then(|h| h.get("pred"))
            .and_then(first_str);

        let cadd_score = hit
            .get("dbnsfp")
            .and_then(|d| d.get("cadd"))
            .and_then(|c| c.get("phred"))
            .and_then(Value::as_f64)
            .or_else(|| hit.get("cadd").and_then(|c| c.get("phred")).and_then(Value::as_f64));

        let gnomad_exome_af = hit.get("gnomad_exome").and_then(|g| g.get("af")).and_then(|a| a.get("af")).and_then(Value::as_f64);

        let alphamissense = hit.get("dbnsfp").and_then(|d| d.get("alphamissense"));
        let alphamissense_score = alphamissense.and_then(|a| a.get("score")).and_then(first_f64);
        let alphamissense_prediction = alphamissense.and_then(|a| a.get("pred")).and_then(first_str);

        let variant_annotations = parse_civic_value(hit.get("civic"));
        let clinical_significance_records = parse_clinvar_value(hit.get("clinvar"));
        let somatic_catalogue_records = parse_cosmic_value(hit.get("cosmic"));

        Evidence {
            variant_id,
            gene: gene.to_string(),
            variant: variant.to_string(),
            cosmic_id,
            ncbi_gene_id,
            dbsnp_id,
            clinvar_id,
            clinvar_clinical_significance,
            clinvar_accession,
            hgvs_genomic,
            hgvs_protein,
            hgvs_transcript,
            snpeff_effect,
            polyphen2_prediction,
            cadd_score,
            gnomad_exome_af,
            alphamissense_score,
            alphamissense_prediction,
            transcript_id,
            transcript_consequence,
            variant_annotations,
            clinical_significance_records,
            somatic_catalogue_records,
            drug_label_records: Vec::new(),
            curated_biomarker_records: Vec::new(),
            harmonized_assertions: Vec::new(),
            predictive_assertions: Vec::new(),
        }
    }

    /// Queries the gene- and codon-level molecular profiles for direct
    /// evidence items when the primary lookup has nothing (`spec.md` §4.2).
    async fn fetch_curated_kb_fallback(&self, gene: &str, variant: &str) -> Result<Vec<VariantAnnotationRecord>, TumorboardError> {
        let gene = gene.to_ascii_uppercase();
        let variant_clean = variant.trim().to_ascii_uppercase();

        let mut mp_names = vec![format!("{gene} {variant_clean}")];
        if let Some(codon) = codon_level(&variant_clean) {
            if codon != variant_clean {
                mp_names.push(format!("{gene} {codon}"));
            }
        }
        mp_names.push(format!("{gene} MUTATION"));

        let query = r#"
        query($name: String!) {
          molecularProfiles(name: $name) {
            nodes {
              evidenceItems {
                nodes {
                  evidenceType
                  evidenceLevel
                  evidenceDirection
                  significance
                  description
                  disease { name }
                  therapies { name }
                  source { sourceType }
                }
              }
            }
          }
        }
        "#;

        let mut records = Vec::new();
        for mp_name in mp_names {
            let body = serde_json::json!({"query": query, "variables": {"name": mp_name}});
            let url = self.curated_kb_base.as_ref();
            let resp = crate::sources::apply_cache_mode(self.client.post(url).json(&body)).send().await?;
            if !resp.status().is_success() {
                continue;
            }
            let bytes = crate::sources::read_limited_body(resp, SOURCE_NAME).await?;
            let Ok(data) = serde_json::from_slice::<Value>(&bytes) else { continue };
            let profiles = data.pointer("/data/molecularProfiles/nodes").and_then(Value::as_array).cloned().unwrap_or_default();
            for profile in profiles {
                let items = profile.pointer("/evidenceItems/nodes").and_then(Value::as_array).cloned().unwrap_or_default();
                for item in items {
                    records.push(VariantAnnotationRecord {
                        evidence_type: item.get("evidenceType").and_then(Value::as_str).map(str::to_string),
                        evidence_level: item.get("evidenceLevel").and_then(Value::as_str).map(str::to_string),
                        evidence_direction: item.get("evidenceDirection").and_then(Value::as_str).map(str::to_string),
                        clinical_significance: item.get("significance").and_then(Value::as_str).map(str::to_string),
                        disease: item.get("disease").and_then(|d| d.get("name")).and_then(Value::as_str).map(str::to_string),
                        drugs: item
                            .get("therapies")
                            .and_then(Value::as_array)
                            .map(|a| a.iter().filter_map(|t| t.get("name").and_then(Value::as_str)).map(str::to_string).collect())
                            .unwrap_or_default(),
                        description: item.get("description").and_then(Value::as_str).map(str::to_string),
                        source: item.get("source").and_then(|s| s.get("sourceType")).and_then(Value::as_str).map(str::to_string),
                        rating: None,
                    });
                }
            }
        }
        Ok(records)
    }

    async fn fetch_ncbi_clinvar_fallback(&self, gene: &str, variant: &str) -> Result<Option<ClinvarFallback>, TumorboardError> {
        let base = self.ncbi_eutils_base.as_ref().trim_end_matches('/');
        let search_term = format!("{gene}[gene] AND {variant}");
        let search_url = format!("{base}/esearch.fcgi");
        let api_key = crate::sources::ncbi_api_key();
        let req = crate::sources::append_ncbi_api_key(
            self.client.get(&search_url).query(&[("db", "clinvar"), ("term", &search_term), ("retmode", "json"), ("retmax", "1")]),
            api_key.as_deref(),
        );
        let resp = crate::sources::apply_cache_mode(req).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let bytes = crate::sources::read_limited_body(resp, SOURCE_NAME).await?;
        let Ok(search_data) = serde_json::from_slice::<Value>(&bytes) else { return Ok(None) };
        let id_list = search_data.pointer("/esearchresult/idlist").and_then(Value::as_array).cloned().unwrap_or_default();
        let Some(variant_id) = id_list.first().and_then(Value::as_str) else { return Ok(None) };

        let summary_url = format!("{base}/esummary.fcgi");
        let req = crate::sources::append_ncbi_api_key(
            self.client.get(&summary_url).query(&[("db", "clinvar"), ("id", variant_id), ("retmode", "json")]),
            api_key.as_deref(),
        );
        let resp = crate::sources::apply_cache_mode(req).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let bytes = crate::sources::read_limited_body(resp, SOURCE_NAME).await?;
        let Ok(summary_data) = serde_json::from_slice::<Value>(&bytes) else { return Ok(None) };
        let result = summary_data.pointer(&format!("/result/{variant_id}"));
        let clinical_significance =
            result.and_then(|r| r.pointer("/clinical_significance/description")).and_then(Value::as_str).map(str::to_string);
        let accession = result.and_then(|r| r.get("accession")).and_then(Value::as_str).map(str::to_string);

        if clinical_significance.is_none() && accession.is_none() {
            return Ok(None);
        }
        Ok(Some(ClinvarFallback { variant_id: variant_id.to_string(), clinical_significance, accession }))
    }
}

struct ClinvarFallback {
    variant_id: String,
    clinical_significance: Option<String>,
    accession: Option<String>,
}

fn codon_level(variant_clean: &str) -> Option<String> {
    let re = regex_codon();
    let caps = re.captures(variant_clean)?;
    Some(format!("{}{}", &caps[1], &caps[2]))
}

fn regex_codon() -> &'static regex::Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^([A-Z])(\d+)[A-Z]*$").expect("valid regex"))
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn first_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Array(a) => a.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn first_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(_) => v.as_f64(),
        Value::Array(a) => a.first().and_then(Value::as_f64),
        _ => None,
    }
}

/// MyVariant nests single-valued fields as either a bare object or a
/// single-element array depending on the underlying source; this picks the
/// first element either way.
fn first_of(v: Option<&Value>) -> Option<&Value> {
    match v? {
        Value::Array(a) => a.first(),
        other @ Value::Object(_) => Some(other),
        _ => None,
    }
}

fn as_list(v: Option<&Value>) -> Vec<&Value> {
    match v {
        Some(Value::Array(a)) => a.iter().collect(),
        Some(other @ (Value::String(_) | Value::Object(_))) => vec![other],
        _ => Vec::new(),
    }
}

/// Tolerant of both the legacy `evidence_items` shape and the newer
/// `molecularProfiles`-nested shape MyVariant can return for CIViC data.
fn parse_civic_value(v: Option<&Value>) -> Vec<VariantAnnotationRecord> {
    let mut out = Vec::new();
    for item in as_list(v) {
        if let Some(profiles) = item.get("molecularProfiles").and_then(Value::as_array) {
            for mp in profiles {
                let Some(items) = mp.get("evidenceItems").and_then(Value::as_array) else { continue };
                for ev in items {
                    out.push(VariantAnnotationRecord {
                        evidence_type: ev.get("evidenceType").and_then(Value::as_str).map(str::to_string),
                        evidence_level: ev.get("evidenceLevel").and_then(Value::as_str).map(str::to_string),
                        evidence_direction: ev.get("evidenceDirection").and_then(Value::as_str).map(str::to_string),
                        clinical_significance: ev.get("significance").and_then(Value::as_str).map(str::to_string),
                        disease: ev.get("disease").and_then(|d| d.get("name")).and_then(Value::as_str).map(str::to_string),
                        drugs: ev
                            .get("therapies")
                            .and_then(Value::as_array)
                            .map(|a| a.iter().filter_map(|t| t.get("name").and_then(Value::as_str)).map(str::to_string).collect())
                            .unwrap_or_default(),
                        description: ev.get("description").and_then(Value::as_str).map(str::to_string),
                        source: ev.get("source").and_then(|s| s.get("name")).and_then(Value::as_str).map(str::to_string),
                        rating: ev.get("rating").and_then(Value::as_i64),
                    });
                }
            }
        } else if let Some(items) = item.get("evidence_items").and_then(Value::as_array) {
            for ev in items {
                out.push(VariantAnnotationRecord {
                    evidence_type: ev.get("evidence_type").and_then(Value::as_str).map(str::to_string),
                    evidence_level: ev.get("evidence_level").and_then(Value::as_str).map(str::to_string),
                    evidence_direction: ev.get("evidence_direction").and_then(Value::as_str).map(str::to_string),
                    clinical_significance: ev.get("clinical_significance").and_then(Value::as_str).map(str::to_string),
                    disease: ev.get("disease").and_then(|d| d.get("name")).and_then(Value::as_str).map(str::to_string),
                    drugs: ev
                        .get("drugs")
                        .and_then(Value::as_array)
                        .map(|a| a.iter().filter_map(|t| t.get("name").and_then(Value::as_str)).map(str::to_string).collect())
                        .unwrap_or_default(),
                    description: ev.get("description").and_then(Value::as_str).map(str::to_string),
                    source: ev.get("source").and_then(|s| s.get("name")).and_then(Value::as_str).map(str::to_string),
                    rating: ev.get("rating").and_then(Value::as_i64),
                });
            }
        } else {
            out.push(VariantAnnotationRecord {
                evidence_type: item.get("evidence_type").and_then(Value::as_str).map(str::to_string),
                evidence_level: item.get("evidence_level").and_then(Value::as_str).map(str::to_string),
                evidence_direction: item.get("evidence_direction").and_then(Value::as_str).map(str::to_string),
                clinical_significance: item.get("clinical_significance").and_then(Value::as_str).map(str::to_string),
                disease: item.get("disease").and_then(Value::as_str).map(str::to_string),
                drugs: item.get("drugs").and_then(Value::as_array).map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect()).unwrap_or_default(),
                description: item.get("description").and_then(Value::as_str).map(str::to_string),
                source: item.get("source").and_then(Value::as_str).map(str::to_string),
                rating: item.get("rating").and_then(Value::as_i64),
            });
        }
    }
    out
}

fn parse_clinvar_value(v: Option<&Value>) -> Vec<ClinicalSignificanceRecord> {
    as_list(v)
        .into_iter()
        .map(|item| {
            let clinical_significance = match item.get("clinical_significance") {
                Some(Value::Array(a)) => Some(a.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", ")),
                Some(Value::String(s)) => Some(s.clone()),
                _ => None,
            };
            let conditions = match item.get("conditions") {
                Some(Value::Array(a)) => a
                    .iter()
                    .map(|c| c.get("name").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| c.to_string()))
                    .collect(),
                Some(obj @ Value::Object(_)) => vec![obj.get("name").and_then(Value::as_str).unwrap_or_default().to_string()],
                _ => Vec::new(),
            };
            ClinicalSignificanceRecord {
                clinical_significance,
                review_status: item.get("review_status").and_then(Value::as_str).map(str::to_string),
                conditions,
                last_evaluated: item.get("last_evaluated").and_then(Value::as_str).map(str::to_string),
                variation_id: item.get("variation_id").map(value_to_string),
            }
        })
        .collect()
}

fn parse_cosmic_value(v: Option<&Value>) -> Vec<SomaticCatalogueRecord> {
    as_list(v)
        .into_iter()
        .map(|item| SomaticCatalogueRecord {
            mutation_id: item.get("mutation_id").and_then(Value::as_str).map(str::to_string),
            primary_site: item.get("primary_site").and_then(Value::as_str).map(str::to_string),
            site_subtype: item.get("site_subtype").and_then(Value::as_str).map(str::to_string),
            primary_histology: item.get("primary_histology").and_then(Value::as_str).map(str::to_string),
            histology_subtype: item.get("histology_subtype").and_then(Value::as_str).map(str::to_string),
            sample_count: item.get("sample_count").and_then(Value::as_i64),
            mutation_somatic_status: item.get("mutation_somatic_status").and_then(Value::as_str).map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_evidence_uses_first_successful_query_form() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("q", "BRAF p.V600E"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 1,
                "hits": [{"_id": "chr7:g.140453136A>T", "entrezgene": 673}]
            })))
            .mount(&server)
            .await;

        let client = VariantAnnotationClient::new_for_test(server.uri(), "http://unused.invalid".into(), "http://unused.invalid".into()).unwrap();
        let evidence = client.fetch_evidence("BRAF", "V600E").await.unwrap();
        assert_eq!(evidence.ncbi_gene_id.as_deref(), Some("673"));
    }

    #[tokio::test]
    async fn fetch_evidence_falls_through_query_forms_when_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("q", "KRAS p.G12D"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 0, "hits": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("q", "KRAS:G12D"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 0, "hits": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("q", "KRAS G12D"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 1,
                "hits": [{"_id": "myvariant:1", "cosmic": {"cosmic_id": "COSM123"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"molecularProfiles": {"nodes": []}}}))).mount(&server).await;

        let client = VariantAnnotationClient::new_for_test(server.uri(), server.uri(), "http://unused.invalid".into()).unwrap();
        let evidence = client.fetch_evidence("KRAS", "G12D").await.unwrap();
        assert_eq!(evidence.cosmic_id.as_deref(), Some("COSM123"));
    }

    #[test]
    fn codon_level_strips_trailing_alt_letters() {
        assert_eq!(codon_level("V600E"), Some("V600".to_string()));
        assert_eq!(codon_level("Q61"), Some("Q61".to_string()));
    }

    #[test]
    fn parse_civic_value_handles_legacy_and_new_shapes() {
        let legacy = serde_json::json!({
            "evidence_items": [{"evidence_type": "Predictive", "clinical_significance": "Sensitivity", "drugs": [{"name": "Vemurafenib"}]}]
        });
        let legacy_out = parse_civic_value(Some(&legacy));
        assert_eq!(legacy_out.len(), 1);
        assert_eq!(legacy_out[0].drugs, vec!["Vemurafenib"]);

        let newer = serde_json::json!({
            "molecularProfiles": [{"evidenceItems": [{"evidenceType": "PREDICTIVE", "significance": "SENSITIVITYRESPONSE", "therapies": [{"name": "Dabrafenib"}]}]}]
        });
        let newer_out = parse_civic_value(Some(&newer));
        assert_eq!(newer_out.len(), 1);
        assert_eq!(newer_out[0].drugs, vec!["Dabrafenib"]);
    }
}
