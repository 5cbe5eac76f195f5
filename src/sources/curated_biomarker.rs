//! Curated-biomarker client (`spec.md` §4.2, §4.3): downloads and caches the
//! Cancer Genome Interpreter biomarkers TSV, then filters it by the
//! alteration-pattern DSL (`crate::dsl`) and tumor type.

use std::time::Duration;

use crate::dsl;
use crate::entities::evidence::CuratedBiomarker;
use crate::error::TumorboardError;
use crate::tumor_ontology::tumor_matches;

const CURATED_BIOMARKER_URL: &str = "https://www.cancergenomeinterpreter.org/data/biomarkers/cgi_biomarkers_latest.tsv";
const CURATED_BIOMARKER_URL_ENV: &str = "TUMORBOARD_CURATED_BIOMARKER_URL";
const SOURCE_NAME: &str = "curated-biomarker";
const CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct CuratedBiomarkerClient {
    client: reqwest_middleware::ClientWithMiddleware,
    url: std::borrow::Cow<'static, str>,
}

struct BiomarkerRow {
    gene: String,
    alteration: String,
    drug: String,
    drug_status: String,
    association: String,
    evidence_level: String,
    tumor_type: String,
    tumor_type_full: String,
}

impl CuratedBiomarkerClient {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            url: crate::sources::env_base(CURATED_BIOMARKER_URL, CURATED_BIOMARKER_URL_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(url: String) -> Result<Self, TumorboardError> {
        Ok(Self { client: crate::sources::shared_client()?, url: std::borrow::Cow::Owned(url) })
    }

    /// Returns every TSV row whose `Alteration` pattern matches
    /// `(gene, variant)` and whose `Primary Tumor type` matches
    /// `tumor_type` (when given).
    pub async fn fetch_biomarkers(&self, gene: &str, variant: &str, tumor_type: Option<&str>) -> Result<Vec<CuratedBiomarker>, TumorboardError> {
        let tsv = self.load_tsv().await?;
        let gene_upper = gene.trim().to_ascii_uppercase();

        let matches = parse_rows(&tsv)
            .into_iter()
            .filter(|row| row.gene.to_ascii_uppercase() == gene_upper)
            .filter(|row| dsl::matches(&row.alteration, gene, variant))
            .filter(|row| match tumor_type {
                Some(t) if !t.trim().is_empty() => tumor_matches(t, &row.tumor_type) || tumor_matches(t, &row.tumor_type_full),
                _ => true,
            })
            .map(|row| {
                let fda_approved = is_fda_approved(&row.drug_status, &row.evidence_level);
                CuratedBiomarker {
                    gene: row.gene,
                    alteration_pattern: row.alteration,
                    drug: row.drug,
                    drug_status: row.drug_status,
                    association: row.association,
                    evidence_level: row.evidence_level,
                    tumor_type: row.tumor_type,
                    tumor_type_full: (!row.tumor_type_full.is_empty()).then_some(row.tumor_type_full),
                    fda_approved,
                }
            })
            .collect();

        Ok(matches)
    }

    async fn load_tsv(&self) -> Result<String, TumorboardError> {
        let path = crate::utils::download::cache_path(self.url.as_ref(), "tsv");
        if crate::utils::download::cache_is_valid(&path, CACHE_MAX_AGE) {
            if let Ok(contents) = tokio::fs::read_to_string(&path).await {
                return Ok(contents);
            }
        }

        match self.download().await {
            Ok(contents) => {
                crate::utils::download::save_atomic(&path, contents.as_bytes()).await?;
                Ok(contents)
            }
            Err(err) => match tokio::fs::read_to_string(&path).await {
                Ok(stale) => {
                    tracing::warn!(source = SOURCE_NAME, error = %err, "download failed; falling back to stale cache");
                    Ok(stale)
                }
                Err(_) => Err(err),
            },
        }
    }

    async fn download(&self) -> Result<String, TumorboardError> {
        let resp = crate::sources::apply_cache_mode(self.client.get(self.url.as_ref())).send().await?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, SOURCE_NAME).await?;
        if !status.is_success() {
            return Err(TumorboardError::CacheDownload { message: format!("HTTP {status} fetching curated biomarker TSV") });
        }
        String::from_utf8(bytes).map_err(|_| TumorboardError::CacheDownload { message: "curated biomarker TSV was not valid UTF-8".into() })
    }
}

fn is_fda_approved(drug_status: &str, evidence_level: &str) -> bool {
    let evidence_upper = evidence_level.to_ascii_uppercase();
    drug_status.eq_ignore_ascii_case("approved") && (evidence_upper.contains("FDA") || evidence_upper == "NCCN GUIDELINES" || evidence_upper == "NCCN/CGC GUIDELINES")
}

fn parse_rows(tsv: &str) -> Vec<BiomarkerRow> {
    let mut lines = tsv.lines();
    let Some(header_line) = lines.next() else { return Vec::new() };
    let headers: Vec<&str> = header_line.split('\t').collect();

    let col_index = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let gene_idx = col_index("Gene");
    let alteration_idx = col_index("Alteration");
    let drug_idx = col_index("Drug");
    let drug_status_idx = col_index("Drug status");
    let association_idx = col_index("Association");
    let evidence_level_idx = col_index("Evidence level");
    let tumor_type_idx = col_index("Primary Tumor type");
    let tumor_type_full_idx = col_index("Primary Tumor type full name");

    lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            let field = |idx: Option<usize>| idx.and_then(|i| fields.get(i)).map(|s| s.trim().to_string()).unwrap_or_default();
            BiomarkerRow {
                gene: field(gene_idx),
                alteration: field(alteration_idx),
                drug: field(drug_idx),
                drug_status: field(drug_status_idx),
                association: field(association_idx),
                evidence_level: field(evidence_level_idx),
                tumor_type: field(tumor_type_idx),
                tumor_type_full: field(tumor_type_full_idx),
            }
        })
        .collect()
}
