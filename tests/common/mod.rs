//! Shared scaffolding for the end-to-end scenario tests: every knowledge
//! base and the LLM adjudicator are redirected to an unreachable address by
//! default, and a scenario mounts a wiremock server only for the sources it
//! actually wants to exercise. Each scenario file is its own test binary, so
//! these env var writes never race another scenario's.

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const UNREACHABLE: &str = "http://127.0.0.1:1";

/// Points every source client and the tumor-ontology client at an
/// unreachable address and supplies a dummy LLM API key. Call first, then
/// override individual bases with [`set_base`].
pub fn reset_env() {
    // SAFETY: this test binary is single-threaded with respect to env vars;
    // no other code in this process reads them concurrently.
    unsafe {
        std::env::set_var("TUMORBOARD_VARIANT_ANNOTATION_BASE", UNREACHABLE);
        std::env::set_var("TUMORBOARD_CURATED_KB_BASE", UNREACHABLE);
        std::env::set_var("TUMORBOARD_NCBI_EUTILS_BASE", UNREACHABLE);
        std::env::set_var("TUMORBOARD_DRUG_LABEL_BASE", UNREACHABLE);
        std::env::set_var("TUMORBOARD_HARMONIZED_KB_BASE", UNREACHABLE);
        std::env::set_var("TUMORBOARD_CURATED_ASSERTION_BASE", UNREACHABLE);
        std::env::set_var("TUMORBOARD_CURATED_BIOMARKER_URL", UNREACHABLE);
        std::env::set_var("TUMORBOARD_TUMOR_ONTOLOGY_BASE", UNREACHABLE);
        std::env::set_var("TUMORBOARD_LLM_API_KEY", "test-key");
    }
}

pub fn set_base(env_var: &str, base: &str) {
    // SAFETY: see reset_env.
    unsafe {
        std::env::set_var(env_var, base);
    }
}

/// Mounts the chat-completions endpoint, requiring the rendered user prompt
/// to carry `hint_needle` (the tier-hint text the preprocessor should have
/// derived from the mocked evidence) before handing back `reply_json`. A
/// scenario whose evidence fixtures don't actually produce that hint will
/// see an unmatched request, a 404, and an `AdjudicationError` instead of an
/// `Assessment` - the mock doubles as a check on the deterministic pipeline.
pub async fn mount_llm(server: &MockServer, hint_needle: &str, reply_json: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(hint_needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": reply_json.to_string()}}]
        })))
        .mount(server)
        .await;
}

pub fn canned_reply(tier: &str, summary: &str, therapies: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "tier": tier,
        "confidence_score": 0.85,
        "summary": summary,
        "rationale": summary,
        "evidence_strength": "strong",
        "clinical_trials_available": false,
        "recommended_therapies": therapies,
        "references": []
    })
}
