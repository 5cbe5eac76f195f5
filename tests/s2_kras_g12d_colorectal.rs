//! End-to-end: an FDA-approved anti-EGFR resistance marker with no
//! targeted therapy of its own drives a Tier II assessment, and the tier
//! hint names the excluded drugs.

mod common;

use tumorboard_core::engine::Engine;
use tumorboard_core::entities::assessment::Tier;
use tumorboard_core::entities::variant::VariantInput;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const BIOMARKER_TSV: &str = "Gene\tAlteration\tDrug\tDrug status\tAssociation\tEvidence level\tPrimary Tumor type\tPrimary Tumor type full name\nKRAS\tG12.\tCetuximab\tApproved\tResistant\tFDA guidelines\tCRC\tColorectal Cancer\nKRAS\tG12.\tPanitumumab\tApproved\tResistant\tFDA guidelines\tCRC\tColorectal Cancer\n";

#[tokio::test]
async fn kras_g12d_colorectal_reaches_tier_ii_via_resistance_marker() {
    common::reset_env();

    let biomarker_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BIOMARKER_TSV))
        .mount(&biomarker_server)
        .await;

    let llm_server = MockServer::start().await;
    common::mount_llm(
        &llm_server,
        "TIER II INDICATOR: Resistance marker that EXCLUDES Cetuximab, Panitumumab",
        common::canned_reply(
            "Tier II",
            "KRAS G12D confers resistance to anti-EGFR antibodies, excluding cetuximab and panitumumab.",
            serde_json::json!([]),
        ),
    )
    .await;

    common::set_base("TUMORBOARD_CURATED_BIOMARKER_URL", &biomarker_server.uri());
    common::set_base("TUMORBOARD_LLM_BASE", &llm_server.uri());

    let engine = Engine::new().unwrap();
    let input = VariantInput { gene: "KRAS".into(), variant: "G12D".into(), tumor_type: Some("Colorectal Cancer".into()) };
    let assessment = engine.assess_variant(&input).await.unwrap();

    assert_eq!(assessment.tier, Tier::II);
    assert!(assessment.summary.to_ascii_lowercase().contains("cetuximab"));
}
