//! Assembles the full evidence block handed to the adjudicator: the
//! preprocessor's tier-guidance header, the drug-level aggregation summary,
//! and a compact per-source detail listing (`spec.md` §4.6).

use crate::entities::evidence::{ApprovalType, Evidence, LineOfTherapy};
use crate::preprocessor::drug_aggregation::format_drug_aggregation_summary;
use crate::preprocessor::format_evidence_summary_header;

/// Builds the evidence text the user prompt embeds, in the order the
/// adjudicator expects: tier-guidance header, drug aggregation, then the
/// compact per-source listing.
pub fn build_evidence_summary(evidence: &Evidence, tumor_type: Option<&str>) -> String {
    let header = format_evidence_summary_header(evidence, tumor_type);
    let drug_summary = format_drug_aggregation_summary(evidence, tumor_type);
    let details = summary_compact(evidence, tumor_type);
    format!("{header}{drug_summary}{details}")
}

fn line_of_therapy_label(lot: LineOfTherapy) -> &'static str {
    match lot {
        LineOfTherapy::FirstLine => "FIRST-LINE",
        LineOfTherapy::LaterLine => "LATER-LINE",
        LineOfTherapy::Unspecified => "UNSPECIFIED",
    }
}

fn approval_type_label(at: ApprovalType) -> &'static str {
    match at {
        ApprovalType::Full => "FULL",
        ApprovalType::Accelerated => "ACCELERATED",
        ApprovalType::Unspecified => "UNSPECIFIED",
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Per-source compact detail listing: FDA approvals, CGI-style curated
/// biomarkers, curated (AMP-tier) assertions, and a one-line ClinVar note
/// (`examples/original_source` evidence model's `summary_compact`).
pub fn summary_compact(evidence: &Evidence, tumor_type: Option<&str>) -> String {
    let mut lines = vec![format!("Evidence for {} {}:\n", evidence.gene, evidence.variant)];

    if !evidence.drug_label_records.is_empty() {
        lines.push(format!("FDA Approved Drugs ({}):", evidence.drug_label_records.len()));
        for approval in evidence.drug_label_records.iter().take(5) {
            let drug = if !approval.brand_name.is_empty() { approval.brand_name.as_str() } else { approval.generic_name.as_str() };

            match tumor_type.filter(|t| !t.trim().is_empty()) {
                Some(t) if approval.tumor_match || approval.variant_in_clinical_studies => {
                    let line_info =
                        if approval.tumor_match { line_of_therapy_label(approval.line_of_therapy) } else { "UNSPECIFIED" };
                    let approval_info =
                        if approval.tumor_match { approval_type_label(approval.approval_type) } else { "UNSPECIFIED" };
                    let variant_note = if approval.variant_in_clinical_studies { " *** VARIANT EXPLICITLY IN FDA LABEL ***" } else { "" };

                    lines.push(format!("  \u{2022} {drug} [FOR {}]{variant_note}:", t.to_ascii_uppercase()));
                    lines.push(format!("      Line of therapy: {line_info}"));
                    lines.push(format!("      Approval type: {approval_info}"));

                    if let Some(excerpt) = approval.clinical_studies_excerpt.as_deref() {
                        lines.push(format!("      {}...", truncate_chars(excerpt, 400)));
                    } else {
                        lines.push(format!("      Excerpt: {}...", truncate_chars(&approval.indication_excerpt, 200)));
                    }
                }
                Some(_) => {
                    lines.push(format!("  \u{2022} {drug} [OTHER INDICATIONS]: {}...", truncate_chars(&approval.indications_and_usage, 300)));
                }
                None => {
                    lines.push(format!("  \u{2022} {drug}: {}...", truncate_chars(&approval.indications_and_usage, 800)));
                }
            }
        }
        lines.push(String::new());
    }

    let approved_biomarkers: Vec<_> = evidence.curated_biomarker_records.iter().filter(|b| b.fda_approved).collect();
    if !approved_biomarkers.is_empty() {
        let resistance_approved: Vec<_> = approved_biomarkers.iter().filter(|b| b.is_resistance()).collect();
        let sensitivity_approved: Vec<_> = approved_biomarkers.iter().filter(|b| !b.is_resistance()).collect();

        if !resistance_approved.is_empty() {
            lines.push(format!("CGI FDA-APPROVED RESISTANCE MARKERS ({}):", resistance_approved.len()));
            lines.push("  *** THESE VARIANTS EXCLUDE USE OF FDA-APPROVED THERAPIES ***".to_string());
            for b in resistance_approved.iter().take(5) {
                let tumor_type_display = if b.tumor_type.is_empty() { "solid tumors" } else { &b.tumor_type };
                lines.push(format!("  \u{2022} {} [{}] in {tumor_type_display} - Evidence: {}", b.drug, b.association.to_ascii_uppercase(), b.evidence_level));
            }
            lines.push("  \u{2192} This variant causes RESISTANCE to the above drug(s), making it Tier II actionable as a NEGATIVE biomarker.".to_string());
            lines.push(String::new());
        }

        if !sensitivity_approved.is_empty() {
            lines.push(format!("CGI FDA-Approved Sensitivity Biomarkers ({}):", sensitivity_approved.len()));
            for b in sensitivity_approved.iter().take(5) {
                let tumor_type_display = if b.tumor_type.is_empty() { "solid tumors" } else { &b.tumor_type };
                lines.push(format!("  \u{2022} {} [{}] in {tumor_type_display} - Evidence: {}", b.drug, b.association, b.evidence_level));
            }
            lines.push(String::new());
        }
    }

    if !evidence.predictive_assertions.is_empty() {
        let predictive_tier_i: Vec<_> = evidence
            .predictive_assertions
            .iter()
            .filter(|a| a.amp_tier.as_deref() == Some("TIER_I") && a.assertion_type.eq_ignore_ascii_case("predictive"))
            .collect();
        let predictive_tier_ii: Vec<_> = evidence
            .predictive_assertions
            .iter()
            .filter(|a| a.amp_tier.as_deref() == Some("TIER_II") && a.assertion_type.eq_ignore_ascii_case("predictive"))
            .collect();
        let prognostic: Vec<_> = evidence.predictive_assertions.iter().filter(|a| a.assertion_type.eq_ignore_ascii_case("prognostic")).collect();

        if !predictive_tier_i.is_empty() {
            lines.push(format!("CURATED PREDICTIVE TIER I ASSERTIONS ({}):", predictive_tier_i.len()));
            lines.push("  *** EXPERT-CURATED - THERAPY ACTIONABLE ***".to_string());
            for a in predictive_tier_i.iter().take(5) {
                let therapies = if a.therapies.is_empty() { "N/A".to_string() } else { a.therapies.join(", ") };
                let fda_note = if a.fda_companion_test == Some(true) { " [FDA Companion Test]" } else { "" };
                let nccn_note = a.nccn_guideline.as_deref().map(|g| format!(" [NCCN: {g}]")).unwrap_or_default();
                lines.push(format!("  \u{2022} {}: {therapies} [{}]{fda_note}{nccn_note}", a.molecular_profile, a.significance));
                lines.push(format!("      AMP Level: {}, Disease: {}", a.amp_level_letter.as_deref().unwrap_or("N/A"), a.disease));
            }
            lines.push(String::new());
        }

        if !predictive_tier_ii.is_empty() {
            lines.push(format!("Curated Predictive Tier II Assertions ({}):", predictive_tier_ii.len()));
            for a in predictive_tier_ii.iter().take(3) {
                let therapies = if a.therapies.is_empty() { "N/A".to_string() } else { a.therapies.join(", ") };
                lines.push(format!("  \u{2022} {}: {therapies} [{}]", a.molecular_profile, a.significance));
            }
            lines.push(String::new());
        }

        if !prognostic.is_empty() {
            lines.push(format!("CURATED PROGNOSTIC Assertions ({}):", prognostic.len()));
            lines.push("  *** PROGNOSTIC ONLY - indicates outcome, NOT therapy actionability ***".to_string());
            for a in prognostic.iter().take(3) {
                lines.push(format!("  \u{2022} {}: {} in {}", a.molecular_profile, a.significance, a.disease));
                if let Some(tier) = a.amp_tier.as_deref() {
                    lines.push(format!("      (Prognostic {tier} - does NOT imply Tier I/II for therapy)"));
                }
            }
            lines.push(String::new());
        }
    }

    if let Some(sig) = evidence.clinvar_clinical_significance.as_deref() {
        lines.push(format!("ClinVar: {sig}"));
        lines.push(String::new());
    }

    if lines.len() > 1 {
        lines.join("\n")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::evidence::{ApprovalType, Evidence, FdaApproval, LineOfTherapy};

    #[test]
    fn empty_evidence_has_no_compact_summary() {
        let evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        assert_eq!(summary_compact(&evidence, Some("Melanoma")), "");
    }

    #[test]
    fn build_evidence_summary_concatenates_all_three_blocks() {
        let mut evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        evidence.drug_label_records.push(FdaApproval {
            brand_name: "Zelborafib".into(),
            generic_name: "vemurafenib".into(),
            indications_and_usage: "for BRAF V600E-mutation-positive melanoma".into(),
            clinical_studies: None,
            variant_in_indications: true,
            variant_in_clinical_studies: false,
            clinical_studies_excerpt: None,
            tumor_match: true,
            line_of_therapy: LineOfTherapy::FirstLine,
            approval_type: ApprovalType::Full,
            indication_excerpt: "for BRAF V600E-mutation-positive melanoma".into(),
        });
        let summary = build_evidence_summary(&evidence, Some("Melanoma"));
        assert!(summary.contains("EVIDENCE SUMMARY"));
        assert!(summary.contains("Evidence for BRAF V600E"));
    }
}
