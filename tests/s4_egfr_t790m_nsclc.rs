//! End-to-end: EGFR T790M is the textbook first/second-generation TKI
//! resistance mutation, but it is itself the on-label indication for a
//! third-generation inhibitor. An FDA label naming T790M directly in NSCLC
//! must reach Tier I, not the Tier II resistance-marker path.

mod common;

use tumorboard_core::engine::Engine;
use tumorboard_core::entities::assessment::Tier;
use tumorboard_core::entities::variant::VariantInput;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn egfr_t790m_nsclc_reaches_tier_i_not_resistance_only() {
    common::reset_env();

    let drug_label_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/label.json"))
        .and(query_param("search", "EGFR AND T790M"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "openfda": {"brand_name": ["TAGRISSO"], "generic_name": ["osimertinib"]},
                "indications_and_usage": [
                    "TAGRISSO is indicated for the treatment of patients with metastatic non-small cell lung cancer (NSCLC) whose tumors have the EGFR T790M mutation, as detected by an FDA-approved test, who have progressed on or after EGFR tyrosine kinase inhibitor therapy."
                ]
            }]
        })))
        .mount(&drug_label_server)
        .await;

    let llm_server = MockServer::start().await;
    common::mount_llm(
        &llm_server,
        "TIER I INDICATOR: FDA-approved therapy FOR this variant in this tumor type.",
        common::canned_reply(
            "Tier I",
            "Osimertinib is FDA-approved specifically for EGFR T790M NSCLC.",
            serde_json::json!([{"drug_name": "osimertinib", "evidence_level": "FDA", "approval_status": "approved", "clinical_context": "post-TKI progression"}]),
        ),
    )
    .await;

    common::set_base("TUMORBOARD_DRUG_LABEL_BASE", &drug_label_server.uri());
    common::set_base("TUMORBOARD_LLM_BASE", &llm_server.uri());

    let engine = Engine::new().unwrap();
    let input = VariantInput { gene: "EGFR".into(), variant: "T790M".into(), tumor_type: Some("NSCLC".into()) };
    let assessment = engine.assess_variant(&input).await.unwrap();

    assert_eq!(assessment.tier, Tier::I);
    assert_ne!(assessment.tier, Tier::II);
}
