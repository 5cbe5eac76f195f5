//! Resistance-marker and FDA-coverage checks (`spec.md` §4.5.3, §4.5.4):
//! whether an FDA-approved therapy exists for this variant in this tumor
//! type, whether the variant is instead a resistance marker that excludes
//! therapy, and whether the only evidence available is prognostic/diagnostic.

use crate::entities::evidence::{Evidence, FdaApproval};
use crate::preprocessor::approval_class::variant_matches_approval_class;
use crate::preprocessor::investigational::is_investigational_only;
use crate::preprocessor::stats::{compute_evidence_stats, DominantSignal};
use crate::tumor_ontology::tumor_matches;

const WILDTYPE_PATTERNS: &[&str] = &[
    "wild-type",
    "wild type",
    "wildtype",
    "mutation-negative",
    "without mutation",
    "negative for mutations",
    "no mutation",
];

/// True when `approval`'s indication text requires the gene to be
/// wild-type/mutation-negative, i.e. the approval does NOT cover the
/// mutated variant being assessed.
pub fn check_fda_requires_wildtype(approval: &FdaApproval) -> bool {
    check_fda_requires_wildtype_text(&approval.indications_and_usage.to_ascii_lowercase())
}

/// Text-level wild-type/mutation-negative check shared with
/// [`variant_matches_approval_class`](crate::preprocessor::approval_class::variant_matches_approval_class)'s
/// default (non-gene-specific) rule.
pub fn check_fda_requires_wildtype_text(lowercased_text: &str) -> bool {
    WILDTYPE_PATTERNS.iter().any(|p| lowercased_text.contains(p))
}

const MAX_EXCLUDED_DRUGS: usize = 5;

/// Whether an FDA-approved therapy exists for this exact variant in this
/// tumor type, walking drug labels, Level A harmonized assertions, Tier I
/// curated assertions, and FDA-approved curated biomarkers in that order.
pub fn has_fda_for_variant_in_tumor(evidence: &Evidence, gene: &str, variant: &str, tumor_type: Option<&str>) -> bool {
    if is_investigational_only(gene, tumor_type) {
        return false;
    }

    for approval in &evidence.drug_label_records {
        if !approval.tumor_match {
            continue;
        }
        if approval.variant_in_indications {
            return true;
        }
        if variant_matches_approval_class(gene, variant, &approval.indications_and_usage) {
            return true;
        }
    }

    if let Some(t) = tumor_type.filter(|t| !t.trim().is_empty()) {
        for assertion in &evidence.harmonized_assertions {
            if assertion.evidence_level.eq_ignore_ascii_case("A")
                && assertion
                    .disease
                    .as_deref()
                    .map(|d| tumor_matches(t, d))
                    .unwrap_or(false)
            {
                let mentions_variant = assertion
                    .description
                    .as_deref()
                    .map(|d| {
                        let lower = d.to_ascii_lowercase();
                        lower.contains(&variant.to_ascii_lowercase()) || lower.contains(&gene.to_ascii_lowercase())
                    })
                    .unwrap_or(false);
                if mentions_variant {
                    return true;
                }
            }
        }
    }

    for assertion in &evidence.predictive_assertions {
        if assertion.amp_tier.as_deref() != Some("TIER_I") {
            continue;
        }
        if !assertion.assertion_type.eq_ignore_ascii_case("predictive") || !assertion.is_accepted() {
            continue;
        }
        if let Some(t) = tumor_type.filter(|t| !t.trim().is_empty()) {
            if !tumor_matches(t, &assertion.disease) {
                continue;
            }
        }
        if assertion.is_sensitivity() {
            return true;
        }
        if assertion.is_resistance() && !assertion.therapies.is_empty() {
            return true;
        }
    }

    for biomarker in &evidence.curated_biomarker_records {
        if !biomarker.fda_approved || biomarker.is_resistance() {
            continue;
        }
        if let Some(t) = tumor_type.filter(|t| !t.trim().is_empty()) {
            let disease = biomarker.tumor_type_full.as_deref().unwrap_or(&biomarker.tumor_type);
            if !tumor_matches(t, disease) {
                continue;
            }
        }
        return true;
    }

    false
}

/// Whether this variant is a resistance marker with no corresponding
/// FDA-approved therapy for this variant/tumor, returning the (capped,
/// deduplicated) list of drugs it excludes when true.
pub fn is_resistance_marker_without_targeted_therapy(
    evidence: &Evidence,
    gene: &str,
    variant: &str,
    tumor_type: Option<&str>,
) -> Option<Vec<String>> {
    if has_fda_for_variant_in_tumor(evidence, gene, variant, tumor_type) {
        return None;
    }

    let stats = compute_evidence_stats(evidence, tumor_type);
    let is_resistance_dominant = matches!(stats.dominant_signal, DominantSignal::ResistanceOnly | DominantSignal::ResistanceDominant)
        || stats.resistance_count >= 3;
    if stats.resistance_count == 0 || !is_resistance_dominant {
        return None;
    }

    let mut drugs_excluded = Vec::new();
    let mut push_drug = |drug: &str| {
        let drug = drug.trim();
        if !drug.is_empty() && !drugs_excluded.iter().any(|d: &String| d.eq_ignore_ascii_case(drug)) {
            drugs_excluded.push(drug.to_string());
        }
    };

    for approval in &evidence.drug_label_records {
        if approval.tumor_match && check_fda_requires_wildtype(approval) {
            let name = if approval.brand_name.is_empty() { &approval.generic_name } else { &approval.brand_name };
            push_drug(name);
        }
    }
    for biomarker in &evidence.curated_biomarker_records {
        if !biomarker.fda_approved || !biomarker.is_resistance() {
            continue;
        }
        if let Some(t) = tumor_type.filter(|t| !t.trim().is_empty()) {
            let disease = biomarker.tumor_type_full.as_deref().unwrap_or(&biomarker.tumor_type);
            if !tumor_matches(t, disease) {
                continue;
            }
        }
        push_drug(&biomarker.drug);
    }
    for assertion in &evidence.harmonized_assertions {
        if !assertion.is_resistance() {
            continue;
        }
        if let Some(t) = tumor_type.filter(|t| !t.trim().is_empty()) {
            if assertion.disease.as_deref().map(|d| !tumor_matches(t, d)).unwrap_or(true) {
                continue;
            }
        }
        for drug in &assertion.drugs {
            push_drug(drug);
        }
    }
    for assertion in &evidence.predictive_assertions {
        if !assertion.is_resistance() {
            continue;
        }
        if let Some(t) = tumor_type.filter(|t| !t.trim().is_empty()) {
            if !tumor_matches(t, &assertion.disease) {
                continue;
            }
        }
        for drug in &assertion.therapies {
            push_drug(drug);
        }
    }

    if drugs_excluded.is_empty() {
        return None;
    }
    drugs_excluded.truncate(MAX_EXCLUDED_DRUGS);
    Some(drugs_excluded)
}

/// Whether this variant's only clinical relevance is prognostic or
/// diagnostic, i.e. there's no sensitivity/resistance predictive signal at
/// all but there is at least one non-predictive record.
pub fn is_prognostic_or_diagnostic_only(evidence: &Evidence, tumor_type: Option<&str>) -> bool {
    let stats = compute_evidence_stats(evidence, tumor_type);
    if stats.sensitivity_count > 0 || stats.resistance_count > 0 {
        return false;
    }

    let has_predictive_assertion = evidence
        .predictive_assertions
        .iter()
        .any(|a| a.assertion_type.eq_ignore_ascii_case("predictive") && a.is_accepted());
    if has_predictive_assertion {
        return false;
    }

    let has_prognostic_or_diagnostic = evidence.predictive_assertions.iter().any(|a| {
        a.is_accepted()
            && (a.assertion_type.eq_ignore_ascii_case("prognostic") || a.assertion_type.eq_ignore_ascii_case("diagnostic"))
    }) || evidence
        .variant_annotations
        .iter()
        .any(|a| a.evidence_type.as_deref().map(|t| t.eq_ignore_ascii_case("prognostic") || t.eq_ignore_ascii_case("diagnostic")).unwrap_or(false));

    has_prognostic_or_diagnostic
}
