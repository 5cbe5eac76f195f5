//! End-to-end: BRAF G469A falls outside the V600 approval class, so a
//! V600E-specific FDA label in the same tumor type must not count as
//! coverage for it. Level B harmonized sensitivity evidence with no FDA
//! approval instead drives a Tier II (never Tier I) assessment.

mod common;

use tumorboard_core::engine::Engine;
use tumorboard_core::entities::assessment::Tier;
use tumorboard_core::entities::variant::VariantInput;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn braf_g469a_melanoma_reaches_tier_ii_never_tier_i() {
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
                ]
            }]
        })))
        .mount(&drug_label_server)
        .await;

    let harmonized_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/associations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hits": {"hits": [{
                "features": [{"geneSymbol": "BRAF", "name": "BRAF G469A"}],
                "diseases": "Melanoma",
                "drugs": "Trametinib",
                "evidence_label": "B",
                "association": {"response_type": "Sensitivity", "description": "Case reports of response to MEK inhibition in BRAF G469A melanoma."}
            }]}
        })))
        .mount(&harmonized_server)
        .await;

    let llm_server = MockServer::start().await;
    common::mount_llm(
        &llm_server,
        "TIER II/III: Strong evidence but no FDA approval - evaluate trial data and guidelines.",
        common::canned_reply(
            "Tier II",
            "No FDA approval covers BRAF G469A specifically; Level B evidence supports MEK inhibition.",
            serde_json::json!([{"drug_name": "trametinib", "evidence_level": "B", "approval_status": "off-label", "clinical_context": "case reports"}]),
        ),
    )
    .await;

    common::set_base("TUMORBOARD_DRUG_LABEL_BASE", &drug_label_server.uri());
    common::set_base("TUMORBOARD_HARMONIZED_KB_BASE", &harmonized_server.uri());
    common::set_base("TUMORBOARD_LLM_BASE", &llm_server.uri());

    let engine = Engine::new().unwrap();
    let input = VariantInput { gene: "BRAF".into(), variant: "G469A".into(), tumor_type: Some("Melanoma".into()) };
    let assessment = engine.assess_variant(&input).await.unwrap();

    assert_eq!(assessment.tier, Tier::II);
    assert_ne!(assessment.tier, Tier::I);
}
