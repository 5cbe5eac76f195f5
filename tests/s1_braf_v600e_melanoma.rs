//! End-to-end: an FDA-approved therapy naming the exact variant in the
//! exact tumor type drives a Tier I assessment.

mod common;

use tumorboard_core::engine::Engine;
use tumorboard_core::entities::assessment::Tier;
use tumorboard_core::entities::variant::VariantInput;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn braf_v600e_melanoma_reaches_tier_i() {
    common::reset_env();

    let drug_label_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/label.json"))
        .and(query_param("search", "BRAF AND V600E"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "openfda": {"brand_name": ["ZELBORAF"], "generic_name": ["vemurafenib"]},
                "indications_and_usage": [
                    "ZELBORAF is indicated for the treatment of patients with unresectable or metastatic melanoma with BRAF V600E mutation as detected by an FDA-approved test."
                ],
                "clinical_studies": [
                    "Efficacy was demonstrated in a randomized trial of previously untreated BRAF V600E mutation-positive melanoma patients."
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
            "Vemurafenib is FDA-approved for BRAF V600E melanoma.",
            serde_json::json!([{"drug_name": "vemurafenib", "evidence_level": "FDA", "approval_status": "approved", "clinical_context": "first-line"}]),
        ),
    )
    .await;

    common::set_base("TUMORBOARD_DRUG_LABEL_BASE", &drug_label_server.uri());
    common::set_base("TUMORBOARD_LLM_BASE", &llm_server.uri());

    let engine = Engine::new().unwrap();
    let input = VariantInput { gene: "BRAF".into(), variant: "V600E".into(), tumor_type: Some("Melanoma".into()) };
    let assessment = engine.assess_variant(&input).await.unwrap();

    assert_eq!(assessment.tier, Tier::I);
    assert_eq!(assessment.recommended_therapies.len(), 1);
    assert_eq!(assessment.recommended_therapies[0].drug_name, "vemurafenib");
}
