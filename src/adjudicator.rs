//! The LLM Adjudicator (`spec.md` §4.7): assembles the fixed system prompt
//! and the per-variant user prompt, sends a JSON-constrained chat-completion
//! request, and validates the reply against the required-field schema
//! before building an `Assessment`.

use std::borrow::Cow;

use serde_json::Value;

use crate::entities::assessment::{Assessment, RecommendedTherapy, Tier};
use crate::entities::evidence::Evidence;
use crate::error::TumorboardError;

const LLM_BASE: &str = "https://api.openai.com/v1";
const LLM_BASE_ENV: &str = "TUMORBOARD_LLM_BASE";
const LLM_API_KEY_ENV: &str = "TUMORBOARD_LLM_API_KEY";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 2000;

/// The fixed system prompt every assessment request carries
/// (`examples/original_source` `llm/prompts.py`'s `ACTIONABILITY_SYSTEM_PROMPT`).
const ACTIONABILITY_SYSTEM_PROMPT: &str = r#"You are an expert molecular tumor board pathologist specializing in the AMP/ASCO/CAP clinical actionability framework for somatic cancer variants.

Your task is to classify a single somatic point mutation into one of four tiers:

- Tier I: Strong clinical significance. FDA-approved therapy exists FOR this specific variant in this specific tumor type, or professional guidelines (NCCN) explicitly recommend a therapy based on this biomarker.
- Tier II: Potential clinical significance. Evidence from clinical trials, case studies, or preclinical data suggests actionability, but there is no FDA approval for this exact variant/tumor-type pairing. This also covers known resistance markers that exclude an otherwise-indicated therapy.
- Tier III: Unknown clinical significance. The variant is biologically plausible but lacks strong clinical evidence of actionability in any tumor type, or the only available evidence is investigational.
- Tier IV: Benign or likely benign. No plausible oncogenic or therapeutic relevance.

DECISION FRAMEWORK:
1. Is there an FDA-approved therapy FOR this variant in THIS tumor type? → Tier I.
2. Is there an FDA-approved therapy for this variant in a DIFFERENT tumor type, or strong trial/guideline evidence without FDA approval? → Tier II.
3. Is this variant a resistance marker that excludes an otherwise-available therapy? → Tier II (resistance is still actionable information).
4. Is the only evidence investigational, preclinical, or prognostic/diagnostic without any therapeutic implication? → Tier III.
5. Is there no credible evidence of oncogenic or therapeutic relevance at all? → Tier IV.

CORE PRINCIPLES:
1. Evidence from reputable knowledge bases (ClinVar, COSMIC, CIViC, OncoKB, CGI) should anchor your reasoning; do not invent evidence that was not provided.
2. Tumor-type specificity matters: evidence in an unrelated tumor type is weaker support than an exact match.
3. A resistance marker is still clinically actionable — classify it by what it rules OUT, not by the absence of a sensitivity signal.
4. When sensitivity and resistance evidence conflict, weigh tumor-type match, evidence level, and the proportion of each signal before deciding.
5. Prefer the most specific, most recent, and highest-evidence-level source when sources disagree.

CONFIDENCE SCORING:
- 0.9-1.0: Multiple concordant high-level sources (e.g. FDA label plus Level A curated evidence) with no conflicts.
- 0.7-0.89: A single strong source, or multiple moderate sources in agreement.
- 0.5-0.69: Mixed or sparse evidence requiring inference.
- Below 0.5: Largely speculative, evidence is thin or contradictory.

You must respond with STRICTLY VALID JSON ONLY, matching this schema exactly:

{
  "tier": "Tier I" | "Tier II" | "Tier III" | "Tier IV" | "Unknown",
  "confidence_score": <float between 0.0 and 1.0>,
  "summary": "<one or two sentence plain-language summary>",
  "rationale": "<detailed clinical reasoning citing the evidence provided>",
  "evidence_strength": "<strong | moderate | weak>",
  "clinical_trials_available": <true | false>,
  "recommended_therapies": [
    {
      "drug_name": "<string>",
      "evidence_level": "<string>",
      "approval_status": "<string>",
      "clinical_context": "<string>"
    }
  ],
  "references": ["<string>"]
}

CRITICAL REMINDERS:
- Respond with JSON ONLY. No markdown fences, no prose before or after the object.
- Every field in the schema is required, even when empty (use [] or "" as appropriate).
- Do not fabricate FDA approvals, trial results, or guideline citations not present in the evidence provided."#;

/// Renders the per-variant user prompt
/// (`examples/original_source` `llm/prompts.py`'s `ACTIONABILITY_USER_PROMPT`).
fn build_user_prompt(gene: &str, variant: &str, tumor_type: Option<&str>, evidence_summary: &str) -> String {
    let tumor_display = match tumor_type.filter(|t| !t.trim().is_empty()) {
        Some(t) => Cow::Borrowed(t),
        None => Cow::Borrowed("Unspecified (pan-cancer assessment)"),
    };
    format!(
        "Assess the following somatic variant:\n\n\
         Gene: {gene}\n\
         Variant: {variant}\n\
         Tumor Type: {tumor_display}\n\n\
         Evidence Summary:\n\
         {evidence_summary}\n\n\
         Provide your expert assessment as strictly valid JSON only, matching the schema described in the system prompt."
    )
}

/// Abstraction over whatever chat-completion backend answers adjudication
/// requests, so the engine and the validator can be exercised against a
/// stub without a live LLM endpoint.
#[async_trait::async_trait]
pub trait Adjudicator: Send + Sync {
    async fn assess(
        &self,
        gene: &str,
        variant: &str,
        tumor_type: Option<&str>,
        evidence: &Evidence,
        evidence_summary: &str,
    ) -> Result<Assessment, TumorboardError>;
}

/// Chat-completion request/response shapes, minimal subset of the OpenAI
/// chat-completions schema.
#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Models known to accept OpenAI's `response_format: {"type":"json_object"}`
/// constraint (`examples/original_source` `llm/service.py`'s `openai_json_models`).
const JSON_MODE_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"];

/// HTTP-backed adjudicator talking to an OpenAI-compatible chat-completions
/// endpoint (`spec.md` §4.7, §6).
pub struct HttpAdjudicator {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: String,
    model: String,
    temperature: f64,
}

impl HttpAdjudicator {
    pub fn new(model: impl Into<String>, temperature: f64) -> Result<Self, TumorboardError> {
        let api_key = std::env::var(LLM_API_KEY_ENV).ok().filter(|v| !v.trim().is_empty()).ok_or_else(|| {
            TumorboardError::ApiKeyRequired { api: "llm".to_string(), env_var: LLM_API_KEY_ENV.to_string() }
        })?;
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(LLM_BASE, LLM_BASE_ENV),
            api_key,
            model: model.into(),
            temperature,
        })
    }

    pub fn with_default_model() -> Result<Self, TumorboardError> {
        Self::new(DEFAULT_MODEL, 0.1)
    }

    fn strip_markdown_fences(content: &str) -> &str {
        let trimmed = content.trim();
        let Some(fenced) = trimmed.strip_prefix("```") else { return trimmed };
        let fenced = fenced.strip_prefix("json").unwrap_or(fenced);
        fenced.strip_suffix("```").unwrap_or(fenced).trim()
    }
}

#[async_trait::async_trait]
impl Adjudicator for HttpAdjudicator {
    async fn assess(
        &self,
        gene: &str,
        variant: &str,
        tumor_type: Option<&str>,
        evidence: &Evidence,
        evidence_summary: &str,
    ) -> Result<Assessment, TumorboardError> {
        let user_prompt = build_user_prompt(gene, variant, tumor_type, evidence_summary);
        let messages = vec![
            ChatMessage { role: "system", content: ACTIONABILITY_SYSTEM_PROMPT },
            ChatMessage { role: "user", content: &user_prompt },
        ];

        let response_format = JSON_MODE_MODELS
            .contains(&self.model.as_str())
            .then(|| serde_json::json!({"type": "json_object"}));

        let request = ChatRequest { model: &self.model, messages, temperature: self.temperature, max_tokens: MAX_TOKENS, response_format };

        let url = format!("{}/chat/completions", self.base.as_ref().trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, "llm").await?;

        if !status.is_success() {
            return Err(TumorboardError::AdjudicationError {
                message: format!("HTTP {status}"),
                raw_reply: crate::sources::body_excerpt(&bytes),
            });
        }

        let parsed: ChatResponse = serde_json::from_slice(&bytes).map_err(|err| TumorboardError::AdjudicationError {
            message: format!("malformed chat-completion envelope: {err}"),
            raw_reply: crate::sources::body_excerpt(&bytes),
        })?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| TumorboardError::AdjudicationError {
                message: "chat-completion response had no choices".to_string(),
                raw_reply: crate::sources::body_excerpt(&bytes),
            })?;

        build_assessment(gene, variant, tumor_type, evidence, content)
    }
}

/// Parses the LLM's JSON reply (after stripping any markdown fence) and
/// builds an `Assessment`, requiring `tier`, `confidence_score`, `summary`,
/// and `rationale` per the response schema.
fn build_assessment(
    gene: &str,
    variant: &str,
    tumor_type: Option<&str>,
    evidence: &Evidence,
    raw_content: &str,
) -> Result<Assessment, TumorboardError> {
    let stripped = HttpAdjudicator::strip_markdown_fences(raw_content);
    let data: Value = serde_json::from_str(stripped).map_err(|err| TumorboardError::AdjudicationError {
        message: format!("reply was not valid JSON: {err}"),
        raw_reply: raw_content.to_string(),
    })?;

    let tier_str = data.get("tier").and_then(Value::as_str).ok_or_else(|| TumorboardError::AdjudicationError {
        message: "missing required field `tier`".to_string(),
        raw_reply: raw_content.to_string(),
    })?;
    let tier = match tier_str {
        "Tier I" => Tier::I,
        "Tier II" => Tier::II,
        "Tier III" => Tier::III,
        "Tier IV" => Tier::IV,
        _ => Tier::Unknown,
    };

    let confidence = data
        .get("confidence_score")
        .and_then(Value::as_f64)
        .ok_or_else(|| TumorboardError::AdjudicationError {
            message: "missing required field `confidence_score`".to_string(),
            raw_reply: raw_content.to_string(),
        })?;

    let summary = data
        .get("summary")
        .and_then(Value::as_str)
        .ok_or_else(|| TumorboardError::AdjudicationError {
            message: "missing required field `summary`".to_string(),
            raw_reply: raw_content.to_string(),
        })?
        .to_string();

    let rationale = data
        .get("rationale")
        .and_then(Value::as_str)
        .ok_or_else(|| TumorboardError::AdjudicationError {
            message: "missing required field `rationale`".to_string(),
            raw_reply: raw_content.to_string(),
        })?
        .to_string();

    let evidence_strength = data.get("evidence_strength").and_then(Value::as_str).unwrap_or("moderate").to_string();
    let clinical_trials_available = data.get("clinical_trials_available").and_then(Value::as_bool).unwrap_or(false);

    let recommended_therapies = data
        .get("recommended_therapies")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_recommended_therapy).collect())
        .unwrap_or_default();

    let references = data
        .get("references")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Assessment {
        gene: gene.to_string(),
        variant: variant.to_string(),
        tumor_type: tumor_type.filter(|t| !t.trim().is_empty()).map(str::to_string),
        tier,
        confidence,
        summary,
        rationale,
        evidence_strength,
        recommended_therapies,
        references,
        clinical_trials_available,
        cosmic_id: evidence.cosmic_id.clone(),
        ncbi_gene_id: evidence.ncbi_gene_id.clone(),
        dbsnp_id: evidence.dbsnp_id.clone(),
        clinvar_id: evidence.clinvar_id.clone(),
        clinvar_clinical_significance: evidence.clinvar_clinical_significance.clone(),
        clinvar_accession: evidence.clinvar_accession.clone(),
        hgvs_genomic: evidence.hgvs_genomic.clone(),
        hgvs_protein: evidence.hgvs_protein.clone(),
        hgvs_transcript: evidence.hgvs_transcript.clone(),
        snpeff_effect: evidence.snpeff_effect.clone(),
        polyphen2_prediction: evidence.polyphen2_prediction.clone(),
        cadd_score: evidence.cadd_score,
        gnomad_exome_af: evidence.gnomad_exome_af,
        alphamissense_score: evidence.alphamissense_score,
        alphamissense_prediction: evidence.alphamissense_prediction.clone(),
    })
}

fn parse_recommended_therapy(value: &Value) -> Option<RecommendedTherapy> {
    Some(RecommendedTherapy {
        drug_name: value.get("drug_name").and_then(Value::as_str)?.to_string(),
        evidence_level: value.get("evidence_level").and_then(Value::as_str).unwrap_or_default().to_string(),
        approval_status: value.get("approval_status").and_then(Value::as_str).unwrap_or_default().to_string(),
        clinical_context: value.get("clinical_context").and_then(Value::as_str).unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::evidence::Evidence;

    #[test]
    fn build_user_prompt_falls_back_to_pan_cancer_label() {
        let prompt = build_user_prompt("BRAF", "V600E", None, "no evidence");
        assert!(prompt.contains("Unspecified (pan-cancer assessment)"));
    }

    #[test]
    fn strip_markdown_fences_removes_json_fence() {
        let content = "```json\n{\"tier\": \"Tier I\"}\n```";
        assert_eq!(HttpAdjudicator::strip_markdown_fences(content), "{\"tier\": \"Tier I\"}");
    }

    #[test]
    fn strip_markdown_fences_passes_through_plain_json() {
        let content = "{\"tier\": \"Tier I\"}";
        assert_eq!(HttpAdjudicator::strip_markdown_fences(content), content);
    }

    #[test]
    fn build_assessment_requires_tier_and_summary_fields() {
        let evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        let err = build_assessment("BRAF", "V600E", Some("Melanoma"), &evidence, "{\"summary\": \"ok\"}").unwrap_err();
        assert!(matches!(err, TumorboardError::AdjudicationError { .. }));
    }

    #[test]
    fn build_assessment_parses_a_complete_reply() {
        let evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        let reply = serde_json::json!({
            "tier": "Tier I",
            "confidence_score": 0.95,
            "summary": "FDA-approved therapy available.",
            "rationale": "Vemurafenib is approved for BRAF V600E melanoma.",
            "evidence_strength": "strong",
            "clinical_trials_available": true,
            "recommended_therapies": [{"drug_name": "vemurafenib", "evidence_level": "A", "approval_status": "FDA-approved", "clinical_context": "first-line"}],
            "references": ["PMID:12345"]
        })
        .to_string();
        let assessment = build_assessment("BRAF", "V600E", Some("Melanoma"), &evidence, &reply).unwrap();
        assert_eq!(assessment.tier, Tier::I);
        assert_eq!(assessment.recommended_therapies.len(), 1);
    }

    #[test]
    fn unrecognized_tier_string_degrades_to_unknown() {
        let evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        let reply = serde_json::json!({
            "tier": "Tier V",
            "confidence_score": 0.2,
            "summary": "s",
            "rationale": "r",
        })
        .to_string();
        let assessment = build_assessment("BRAF", "V600E", None, &evidence, &reply).unwrap();
        assert_eq!(assessment.tier, Tier::Unknown);
    }
}
