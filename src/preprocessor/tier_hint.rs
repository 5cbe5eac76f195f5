//! The priority-ordered tier hint cascade (`spec.md` §4.5.7): a plain-text
//! recommendation the prompt builder hands the adjudicator. This never
//! decides the final tier itself — it's guidance the LLM is free to
//! override when the narrative evidence disagrees.

use crate::entities::evidence::Evidence;
use crate::preprocessor::investigational::is_investigational_only;
use crate::preprocessor::resistance::{
    has_fda_for_variant_in_tumor, is_prognostic_or_diagnostic_only, is_resistance_marker_without_targeted_therapy,
};

/// Walks the seven-step cascade in priority order and returns the first
/// matching indicator string, falling back to a generic "evaluate evidence"
/// note when nothing fires.
pub fn get_tier_hint(evidence: &Evidence, tumor_type: Option<&str>) -> String {
    let gene = evidence.gene.as_str();
    let variant = evidence.variant.as_str();

    if is_investigational_only(gene, tumor_type) {
        return "TIER III INDICATOR: Known investigational-only (no approved therapy exists).".to_string();
    }

    if has_fda_for_variant_in_tumor(evidence, gene, variant, tumor_type) {
        return "TIER I INDICATOR: FDA-approved therapy FOR this variant in this tumor type.".to_string();
    }

    if let Some(drugs_excluded) = is_resistance_marker_without_targeted_therapy(evidence, gene, variant, tumor_type) {
        let drugs_str = if drugs_excluded.is_empty() { "standard therapy".to_string() } else { drugs_excluded.join(", ") };
        return format!("TIER II INDICATOR: Resistance marker that EXCLUDES {drugs_str} (no FDA-approved therapy FOR this variant).");
    }

    if is_prognostic_or_diagnostic_only(evidence, tumor_type) {
        return "TIER III INDICATOR: Prognostic/diagnostic only - no therapeutic impact.".to_string();
    }

    let has_off_label_approval = evidence.drug_label_records.iter().any(|a| !a.tumor_match);
    if has_off_label_approval {
        return "TIER II INDICATOR: FDA-approved therapy exists in different tumor type (off-label potential).".to_string();
    }

    let has_strong_non_fda_evidence = evidence
        .predictive_assertions
        .iter()
        .any(|a| a.is_accepted() && a.amp_tier.as_deref() == Some("TIER_I"))
        || evidence
            .harmonized_assertions
            .iter()
            .any(|a| a.evidence_level.eq_ignore_ascii_case("A") || a.evidence_level.eq_ignore_ascii_case("B"));
    if has_strong_non_fda_evidence {
        return "TIER II/III: Strong evidence but no FDA approval - evaluate trial data and guidelines.".to_string();
    }

    "TIER III: Investigational/emerging evidence only.".to_string()
}
