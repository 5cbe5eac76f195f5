//! End-to-end: KRAS in pancreatic cancer is a known investigational-only
//! pair with no therapeutic evidence mocked at all, driving a Tier III
//! assessment even though the same variant reaches Tier II in colorectal
//! cancer.

mod common;

use tumorboard_core::engine::Engine;
use tumorboard_core::entities::assessment::Tier;
use tumorboard_core::entities::variant::VariantInput;

#[tokio::test]
async fn kras_g12d_pancreatic_reaches_tier_iii_as_investigational_only() {
    common::reset_env();

    let llm_server = wiremock::MockServer::start().await;
    common::mount_llm(
        &llm_server,
        "TIER III INDICATOR: Known investigational-only (no approved therapy exists).",
        common::canned_reply(
            "Tier III",
            "KRAS G12D in pancreatic cancer has only investigational evidence; no approved targeted therapy exists.",
            serde_json::json!([]),
        ),
    )
    .await;

    common::set_base("TUMORBOARD_LLM_BASE", &llm_server.uri());

    let engine = Engine::new().unwrap();
    let input = VariantInput { gene: "KRAS".into(), variant: "G12D".into(), tumor_type: Some("Pancreatic Cancer".into()) };
    let assessment = engine.assess_variant(&input).await.unwrap();

    assert_eq!(assessment.tier, Tier::III);
}
