//! End-to-end: TP53 is investigational-only in every tumor type (the `"*"`
//! wildcard pair), so a hotspot mutation with no evidence mocked at all
//! still resolves deterministically to Tier III rather than erroring out.

mod common;

use tumorboard_core::engine::Engine;
use tumorboard_core::entities::assessment::Tier;
use tumorboard_core::entities::variant::VariantInput;

#[tokio::test]
async fn tp53_r273h_breast_reaches_tier_iii_via_wildcard_investigational_pair() {
    common::reset_env();

    let llm_server = wiremock::MockServer::start().await;
    common::mount_llm(
        &llm_server,
        "TIER III INDICATOR: Known investigational-only (no approved therapy exists).",
        common::canned_reply(
            "Tier III",
            "TP53 mutations remain investigational across tumor types, including breast cancer.",
            serde_json::json!([]),
        ),
    )
    .await;

    common::set_base("TUMORBOARD_LLM_BASE", &llm_server.uri());

    let engine = Engine::new().unwrap();
    let input = VariantInput { gene: "TP53".into(), variant: "R273H".into(), tumor_type: Some("Breast Cancer".into()) };
    let assessment = engine.assess_variant(&input).await.unwrap();

    assert_eq!(assessment.tier, Tier::III);
}
