//! The Validator (`spec.md` §4.9): runs the Engine over a gold-standard set
//! with bounded concurrency and folds the results into a per-tier confusion
//! matrix, mirroring
//! `examples/original_source/src/tumorboard/validation/validator.py`'s
//! `Semaphore`-gated `asyncio.gather(..., return_exceptions=True)` loop.

use futures::stream::{self, StreamExt};

use crate::engine::Engine;
use crate::entities::validation::{GoldStandardEntry, ValidationMetrics, ValidationResult};
use crate::entities::variant::VariantInput;

/// Default cap on in-flight `Engine::assess_variant` calls (`spec.md` §4.9).
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

const MAX_CONCURRENT_ENV: &str = "TUMORBOARD_VALIDATOR_MAX_CONCURRENT";

fn max_concurrent_from_env(default: usize) -> usize {
    std::env::var(MAX_CONCURRENT_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Runs every gold-standard entry through `engine`, at most `max_concurrent`
/// in flight at once, and returns the full per-entry results alongside the
/// folded confusion-matrix metrics.
///
/// A failing entry (unsupported variant type, adjudication failure, ...)
/// never aborts the run (`spec.md` §7, §8 I-9 batch independence): it is
/// recorded as an incorrect, zero-confidence, `"Unknown"`-predicted result
/// rather than propagated.
pub async fn validate(
    engine: &Engine,
    gold_standard: &[GoldStandardEntry],
    max_concurrent: usize,
) -> (Vec<ValidationResult>, ValidationMetrics) {
    let max_concurrent = if max_concurrent == 0 {
        max_concurrent_from_env(DEFAULT_MAX_CONCURRENT)
    } else {
        max_concurrent
    };

    tracing::info!(count = gold_standard.len(), max_concurrent, "starting validation run");

    let results: Vec<ValidationResult> = stream::iter(gold_standard.iter().map(|entry| validate_single(engine, entry)))
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    let metrics = ValidationMetrics::calculate(&results);
    tracing::info!(
        total = metrics.total_cases,
        correct = metrics.correct_predictions,
        accuracy = metrics.accuracy,
        "validation run complete"
    );
    (results, metrics)
}

/// Same as [`validate`] but with the spec's default concurrency (3).
pub async fn validate_default(engine: &Engine, gold_standard: &[GoldStandardEntry]) -> (Vec<ValidationResult>, ValidationMetrics) {
    validate(engine, gold_standard, max_concurrent_from_env(DEFAULT_MAX_CONCURRENT)).await
}

async fn validate_single(engine: &Engine, entry: &GoldStandardEntry) -> ValidationResult {
    let input = VariantInput {
        gene: entry.gene.clone(),
        variant: entry.variant.clone(),
        tumor_type: (!entry.tumor_type.trim().is_empty()).then(|| entry.tumor_type.clone()),
    };

    match engine.assess_variant(&input).await {
        Ok(assessment) => {
            let predicted_tier = assessment.tier.as_str().to_string();
            let is_correct = predicted_tier == entry.expected_tier;
            ValidationResult {
                gene: entry.gene.clone(),
                variant: entry.variant.clone(),
                tumor_type: entry.tumor_type.clone(),
                expected_tier: entry.expected_tier.clone(),
                predicted_tier,
                is_correct,
                confidence_score: assessment.confidence,
                assessment: Some(assessment),
            }
        }
        Err(err) => {
            tracing::warn!(gene = entry.gene, variant = entry.variant, error = %err, "validation entry failed, recording as incorrect");
            ValidationResult {
                gene: entry.gene.clone(),
                variant: entry.variant.clone(),
                tumor_type: entry.tumor_type.clone(),
                expected_tier: entry.expected_tier.clone(),
                predicted_tier: "Unknown".to_string(),
                is_correct: false,
                confidence_score: 0.0,
                assessment: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::assessment::{Assessment, Tier};
    use crate::entities::evidence::Evidence;
    use crate::error::TumorboardError;

    struct StubAdjudicator {
        tier: Tier,
        fail_on: &'static str,
    }

    #[async_trait::async_trait]
    impl crate::adjudicator::Adjudicator for StubAdjudicator {
        async fn assess(
            &self,
            gene: &str,
            variant: &str,
            tumor_type: Option<&str>,
            evidence: &Evidence,
            _evidence_summary: &str,
        ) -> Result<Assessment, TumorboardError> {
            if gene == self.fail_on {
                return Err(TumorboardError::AdjudicationError {
                    message: "stub failure".into(),
                    raw_reply: String::new(),
                });
            }
            Ok(Assessment {
                gene: gene.to_string(),
                variant: variant.to_string(),
                tumor_type: tumor_type.map(str::to_string),
                tier: self.tier,
                confidence: 0.8,
                summary: "stub".into(),
                rationale: "stub".into(),
                evidence_strength: "moderate".into(),
                recommended_therapies: Vec::new(),
                references: Vec::new(),
                clinical_trials_available: false,
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
    }

    fn set_unreachable_bases() {
        // SAFETY: single-threaded test, no other code reads these vars concurrently.
        unsafe {
            std::env::set_var("TUMORBOARD_VARIANT_ANNOTATION_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_DRUG_LABEL_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_CURATED_KB_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_HARMONIZED_KB_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_NCBI_EUTILS_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_TUMOR_ONTOLOGY_BASE", "http://127.0.0.1:1");
        }
    }

    fn entry(gene: &str, expected_tier: &str) -> GoldStandardEntry {
        GoldStandardEntry {
            gene: gene.to_string(),
            variant: "V600E".to_string(),
            tumor_type: "Melanoma".to_string(),
            expected_tier: expected_tier.to_string(),
            notes: None,
            references: Vec::new(),
        }
    }

    #[tokio::test]
    async fn validate_conserves_the_confusion_matrix_and_tracks_failures_as_incorrect() {
        set_unreachable_bases();
        let engine = Engine::with_adjudicator(Box::new(StubAdjudicator { tier: Tier::I, fail_on: "FAIL" })).unwrap();

        let gold = vec![entry("BRAF", "Tier I"), entry("KRAS", "Tier II"), entry("FAIL", "Tier I")];
        let (results, metrics) = validate(&engine, &gold, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(metrics.total_cases, 3);
        // BRAF: predicted Tier I == expected Tier I -> correct.
        // KRAS: predicted Tier I != expected Tier II -> incorrect.
        // FAIL: adjudication error -> predicted Unknown != expected Tier I -> incorrect.
        assert_eq!(metrics.correct_predictions, 1);

        let total_tp: u32 = metrics.tier_metrics.values().map(|m| m.true_positives).sum();
        let total_fn: u32 = metrics.tier_metrics.values().map(|m| m.false_negatives).sum();
        let total_fp: u32 = metrics.tier_metrics.values().map(|m| m.false_positives).sum();
        assert_eq!(total_tp + total_fn, metrics.total_cases);
        assert_eq!(total_tp + total_fp, metrics.total_cases);

        let failed = results.iter().find(|r| r.gene == "FAIL").unwrap();
        assert_eq!(failed.predicted_tier, "Unknown");
        assert!(!failed.is_correct);
    }

    #[tokio::test]
    async fn validate_default_uses_spec_default_concurrency() {
        set_unreachable_bases();
        let engine = Engine::with_adjudicator(Box::new(StubAdjudicator { tier: Tier::III, fail_on: "" })).unwrap();
        let gold = vec![entry("TP53", "Tier III")];
        let (results, metrics) = validate_default(&engine, &gold).await;
        assert_eq!(results.len(), 1);
        assert_eq!(metrics.correct_predictions, 1);
    }
}
