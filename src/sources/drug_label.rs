//! Drug-label client (`spec.md` §4.2): mines FDA prescribing-information
//! text (`/drug/label.json`) for gene/variant mentions and derives
//! tumor-specific line-of-therapy and approval-type context from the
//! matched indication passage.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::OnceLock;

use serde::Deserialize;
use serde_json::Value;

use crate::entities::evidence::{ApprovalType, FdaApproval, LineOfTherapy};
use crate::error::TumorboardError;
use crate::utils::constants::gene_aliases;

const DRUG_LABEL_BASE: &str = "https://api.fda.gov/drug";
const DRUG_LABEL_BASE_ENV: &str = "TUMORBOARD_DRUG_LABEL_BASE";
const SOURCE_NAME: &str = "drug-label";
const MAX_APPROVALS: usize = 10;

pub struct DrugLabelClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<Value>,
}

impl DrugLabelClient {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(DRUG_LABEL_BASE, DRUG_LABEL_BASE_ENV),
            api_key: std::env::var("OPENFDA_API_KEY").ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String, api_key: Option<String>) -> Result<Self, TumorboardError> {
        Ok(Self { client: crate::sources::shared_client()?, base: Cow::Owned(base), api_key })
    }

    /// Finds FDA label text mentioning `(gene, variant)` and derives
    /// `tumor_type`-specific line-of-therapy and approval context for each
    /// hit (`spec.md` §4.2, `examples/original_source` FDA client).
    pub async fn fetch_approvals(&self, gene: &str, variant: &str, tumor_type: &str) -> Result<Vec<FdaApproval>, TumorboardError> {
        let gene_upper = gene.to_ascii_uppercase();
        let genes_to_search = gene_aliases(&gene_upper);

        let variant_clean = clean_variant(variant);

        let mut seen = HashSet::new();
        let mut raw_results = Vec::new();

        if let Some(variant_clean) = variant_clean.as_deref() {
            let mut search_variants = vec![variant_clean.to_string()];
            if let Some(codon_x) = codon_x_pattern(variant_clean) {
                search_variants.push(codon_x);
            }

            for search_gene in &genes_to_search {
                for search_var in &search_variants {
                    let query = format!("{search_gene} AND {search_var}");
                    let results = self.query_label(&query, 15).await.unwrap_or_default();
                    for r in results {
                        let brand = first_openfda_field(&r, "brand_name");
                        if let Some(brand) = brand.filter(|b| !b.is_empty()) {
                            if seen.insert(brand) {
                                raw_results.push(r);
                            }
                        }
                    }
                }
            }
        }

        if raw_results.is_empty() {
            for search_gene in &genes_to_search {
                let query = format!("indications_and_usage:{search_gene}");
                let results = self.query_label(&query, 15).await.unwrap_or_default();
                for r in results {
                    let brand = first_openfda_field(&r, "brand_name");
                    if let Some(brand) = brand.filter(|b| !b.is_empty()) {
                        if seen.insert(brand) {
                            raw_results.push(r);
                        }
                    }
                }
            }
        }

        raw_results.truncate(MAX_APPROVALS);

        Ok(raw_results.into_iter().filter_map(|r| parse_label_record(&r, variant_clean.as_deref(), tumor_type)).collect())
    }

    async fn query_label(&self, search_query: &str, limit: usize) -> Result<Vec<Value>, TumorboardError> {
        let url = format!("{}/label.json", self.base.as_ref().trim_end_matches('/'));
        let mut req = self.client.get(&url).query(&[("search", search_query), ("limit", &limit.to_string())]);
        if let Some(key) = self.api_key.as_deref() {
            req = req.query(&[("api_key", key)]);
        }
        let resp = crate::sources::apply_cache_mode(req).send().await?;
        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(Vec::new());
        }
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, SOURCE_NAME).await?;

        if !status.is_success() {
            return Err(TumorboardError::Transport {
                source_name: SOURCE_NAME.to_string(),
                message: format!("HTTP {status}: {}", crate::sources::body_excerpt(&bytes)),
            });
        }
        crate::sources::ensure_json_content_type(SOURCE_NAME, content_type.as_ref(), &bytes)?;
        let parsed: LabelResponse = serde_json::from_slice(&bytes).map_err(|source| TumorboardError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: source.to_string(),
        })?;
        Ok(parsed.results)
    }
}

fn clean_variant(variant: &str) -> Option<String> {
    let upper = variant.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    for prefix in ["P.", "C.", "G."] {
        if let Some(stripped) = upper.strip_prefix(prefix) {
            return Some(stripped.to_string());
        }
    }
    Some(upper)
}

fn codon_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^([A-Z])(\d+)([A-Z])$").expect("valid regex"))
}

/// FDA labels often describe a whole variant class with an `X` wildcard
/// (e.g. `"G719X"` covers `G719S`/`G719A`/`G719C`).
fn codon_x_pattern(variant_clean: &str) -> Option<String> {
    let caps = codon_regex().captures(variant_clean)?;
    Some(format!("{}{}X", &caps[1], &caps[2]))
}

fn first_openfda_field(record: &Value, field: &str) -> Option<String> {
    record.pointer(&format!("/openfda/{field}")).and_then(|v| match v {
        Value::Array(a) => a.first().and_then(Value::as_str).map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    })
}

fn joined_text_field(record: &Value, field: &str) -> Option<String> {
    match record.get(field) {
        Some(Value::Array(a)) => {
            let joined = a.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn parse_label_record(record: &Value, variant_clean: Option<&str>, tumor_type: &str) -> Option<FdaApproval> {
    let brand_name = first_openfda_field(record, "brand_name");
    let generic_name = first_openfda_field(record, "generic_name");
    if brand_name.is_none() && generic_name.is_none() {
        return None;
    }

    let indications_and_usage = joined_text_field(record, "indications_and_usage").unwrap_or_default();
    let clinical_studies = joined_text_field(record, "clinical_studies");

    let mut variant_in_indications = false;
    if let Some(variant) = variant_clean {
        variant_in_indications = indications_and_usage.to_ascii_uppercase().contains(variant);
    }

    let mut clinical_studies_excerpt = None;
    if let (Some(variant), Some(clinical_text)) = (variant_clean, clinical_studies.as_deref()) {
        let clinical_upper = clinical_text.to_ascii_uppercase();
        let mut patterns = vec![variant.to_string()];
        if let Some(codon_x) = codon_x_pattern(variant) {
            patterns.push(codon_x);
        }
        for pattern in &patterns {
            if let Some(idx) = clinical_upper.find(pattern.as_str()) {
                let start = idx.saturating_sub(100);
                let end = (idx + 200).min(clinical_text.len());
                let start = floor_char_boundary(clinical_text, start);
                let end = floor_char_boundary(clinical_text, end);
                let mut snippet = clinical_text[start..end].trim().to_string();
                if start > 0 {
                    snippet = format!("...{snippet}");
                }
                if end < clinical_text.len() {
                    snippet.push_str("...");
                }
                clinical_studies_excerpt = Some(format!("Clinical studies mention {pattern} (variant class includes {variant}): {snippet}"));
                break;
            }
        }
    }
    let variant_in_clinical_studies = clinical_studies_excerpt.is_some();

    let derived = parse_indication_for_tumor(&indications_and_usage, tumor_type);

    Some(FdaApproval {
        brand_name: brand_name.clone().unwrap_or_default(),
        generic_name: generic_name.unwrap_or_else(|| brand_name.unwrap_or_default()),
        indications_and_usage: truncate_chars(&indications_and_usage, 2500),
        clinical_studies: clinical_studies.map(|s| truncate_chars(&s, 2500)),
        variant_in_indications,
        variant_in_clinical_studies,
        clinical_studies_excerpt,
        tumor_match: derived.tumor_match,
        line_of_therapy: derived.line_of_therapy,
        approval_type: derived.approval_type,
        indication_excerpt: derived.indication_excerpt,
    })
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn truncate_chars(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    s[..floor_char_boundary(s, max_bytes)].to_string()
}

struct DerivedIndication {
    tumor_match: bool,
    line_of_therapy: LineOfTherapy,
    approval_type: ApprovalType,
    indication_excerpt: String,
}

const TUMOR_KEYWORDS: &[(&str, &[&str])] = &[
    ("colorectal", &["colorectal", "colon", "rectal", "crc", "mcrc"]),
    ("melanoma", &["melanoma"]),
    ("lung", &["lung", "nsclc", "non-small cell"]),
    ("breast", &["breast"]),
    ("thyroid", &["thyroid", "atc", "anaplastic thyroid"]),
];

const NEXT_SECTION_MARKERS: &[&str] = &[
    "non-small cell lung cancer",
    "nsclc)",
    "melanoma \u{2022}",
    "breast cancer",
    "thyroid cancer",
    "limitations of use",
    "1.1 braf",
    "1.2 braf",
    "1.3 braf",
    "1.4 ",
];

const LATER_LINE_PHRASES: &[&str] = &[
    "after prior therapy",
    "after progression",
    "following progression",
    "following recurrence",
    "second-line",
    "second line",
    "third-line",
    "third line",
    "previously treated",
    "refractory",
    "who have failed",
    "after failure",
    "following prior",
    "disease progression",
];

const FIRST_LINE_PHRASES: &[&str] =
    &["first-line", "first line", "frontline", "initial treatment", "treatment-naive", "previously untreated"];

const ACCELERATED_PHRASES: &[&str] =
    &["accelerated approval", "approved under accelerated", "contingent upon verification", "confirmatory trial"];

/// Locates the indication passage for `tumor_type` and classifies its
/// line-of-therapy and approval-type framing (`examples/original_source`
/// FDA evidence model's `parse_indication_for_tumor`).
fn parse_indication_for_tumor(indication: &str, tumor_type: &str) -> DerivedIndication {
    if indication.is_empty() || tumor_type.trim().is_empty() {
        return DerivedIndication {
            tumor_match: false,
            line_of_therapy: LineOfTherapy::Unspecified,
            approval_type: ApprovalType::Unspecified,
            indication_excerpt: String::new(),
        };
    }

    let indication_lower = indication.to_ascii_lowercase();
    let tumor_lower = tumor_type.to_ascii_lowercase();

    let tumor_keys: Vec<&str> = TUMOR_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| tumor_lower.contains(kw)))
        .map(|(_, keywords)| keywords.to_vec())
        .unwrap_or_else(|| vec![tumor_lower.as_str()]);

    let mut matched_section = String::new();
    let mut tumor_match = false;

    for kw in &tumor_keys {
        if let Some(idx) = indication_lower.find(kw) {
            tumor_match = true;
            let start = floor_char_boundary(indication, idx.saturating_sub(50));
            let mut end = indication.len();
            let search_from = idx + kw.len() + 100;
            for marker in NEXT_SECTION_MARKERS {
                if search_from < indication_lower.len() {
                    if let Some(rel) = indication_lower[search_from..].find(marker) {
                        let next_idx = search_from + rel;
                        if next_idx > idx && next_idx < end {
                            end = next_idx;
                        }
                    }
                }
            }
            let end = floor_char_boundary(indication, end);
            matched_section = indication[start..end].to_string();
            break;
        }
    }

    if !tumor_match {
        return DerivedIndication {
            tumor_match: false,
            line_of_therapy: LineOfTherapy::Unspecified,
            approval_type: ApprovalType::Unspecified,
            indication_excerpt: String::new(),
        };
    }

    let matched_lower = matched_section.to_ascii_lowercase();

    let mut line_of_therapy = LineOfTherapy::Unspecified;
    if LATER_LINE_PHRASES.iter().any(|p| matched_lower.contains(p)) {
        line_of_therapy = LineOfTherapy::LaterLine;
    } else if FIRST_LINE_PHRASES.iter().any(|p| matched_lower.contains(p)) {
        line_of_therapy = LineOfTherapy::FirstLine;
    }

    let approval_type =
        if ACCELERATED_PHRASES.iter().any(|p| matched_lower.contains(p)) { ApprovalType::Accelerated } else { ApprovalType::Full };

    DerivedIndication { tumor_match: true, line_of_therapy, approval_type, indication_excerpt: truncate_chars(&matched_section, 300) }
}
