//! The deterministic core of the pipeline (`spec.md` §4.5): a set of pure
//! functions over `Evidence` and an optional tumor type. Nothing here talks
//! to the network or decides the final tier — it only computes a hint and
//! the structured numbers the PromptBuilder renders.

pub mod approval_class;
pub mod drug_aggregation;
pub mod investigational;
pub mod low_quality_filter;
pub mod resistance;
pub mod stats;
pub mod tier_hint;

use crate::entities::evidence::Evidence;

/// The `"=== EVIDENCE SUMMARY (Pre-processed) ==="` banner: tier guidance,
/// sensitivity/resistance breakdown, FDA approval line-of-therapy context,
/// and any detected conflicts. This is the first of the three blocks the
/// PromptBuilder assembles (`spec.md` §4.6 part 1).
pub fn format_evidence_summary_header(evidence: &Evidence, tumor_type: Option<&str>) -> String {
    let mut lines = Vec::new();
    let bar = "=".repeat(60);

    lines.push(bar.clone());
    lines.push("EVIDENCE SUMMARY (Pre-processed)".to_string());
    lines.push(bar.clone());
    lines.push(String::new());

    let hint = tier_hint::get_tier_hint(evidence, tumor_type);
    lines.push("*** TIER CLASSIFICATION GUIDANCE ***".to_string());
    lines.push(hint);
    lines.push(bar.clone());
    lines.push(String::new());

    let stats = stats::compute_evidence_stats(evidence, tumor_type);
    let total = stats.sensitivity_count + stats.resistance_count;
    if total > 0 {
        let sens_pct = (stats.sensitivity_count as f64 / total as f64) * 100.0;
        let res_pct = (stats.resistance_count as f64 / total as f64) * 100.0;

        let sens_levels = stats
            .sensitivity_by_level
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(", ");
        let res_levels = stats
            .resistance_by_level
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(", ");

        lines.push(format!(
            "Sensitivity entries: {} ({sens_pct:.0}%) - Levels: {}",
            stats.sensitivity_count,
            if sens_levels.is_empty() { "none".to_string() } else { sens_levels }
        ));
        lines.push(format!(
            "Resistance entries: {} ({res_pct:.0}%) - Levels: {}",
            stats.resistance_count,
            if res_levels.is_empty() { "none".to_string() } else { res_levels }
        ));

        let interpretation = match stats.dominant_signal {
            stats::DominantSignal::SensitivityOnly => {
                Some("INTERPRETATION: All evidence shows sensitivity. No resistance signals.".to_string())
            }
            stats::DominantSignal::ResistanceOnly => {
                Some("INTERPRETATION: All evidence shows resistance. This is a RESISTANCE MARKER.".to_string())
            }
            stats::DominantSignal::SensitivityDominant => Some(format!(
                "INTERPRETATION: Sensitivity evidence strongly predominates ({sens_pct:.0}%). Minor resistance signals likely context-specific."
            )),
            stats::DominantSignal::ResistanceDominant => Some(format!(
                "INTERPRETATION: Resistance evidence strongly predominates ({res_pct:.0}%). Minor sensitivity signals likely context-specific."
            )),
            stats::DominantSignal::Mixed => {
                Some("INTERPRETATION: Mixed signals - carefully evaluate tumor type and drug contexts below.".to_string())
            }
            stats::DominantSignal::None => None,
        };
        if let Some(interpretation) = interpretation {
            lines.push(interpretation);
        }
    } else {
        lines.push("No sensitivity/resistance evidence found in databases.".to_string());
    }

    if let Some(tumor_type) = tumor_type.filter(|t| !t.trim().is_empty()) {
        if !evidence.drug_label_records.is_empty() {
            let mut later_line = Vec::new();
            let mut first_line = Vec::new();
            for approval in &evidence.drug_label_records {
                if !approval.tumor_match {
                    continue;
                }
                let drug = if approval.brand_name.is_empty() { &approval.generic_name } else { &approval.brand_name };
                match approval.line_of_therapy {
                    crate::entities::evidence::LineOfTherapy::LaterLine => {
                        let accel_note = matches!(approval.approval_type, crate::entities::evidence::ApprovalType::Accelerated)
                            .then_some(" (ACCELERATED)")
                            .unwrap_or("");
                        later_line.push(format!("{drug}{accel_note}"));
                    }
                    crate::entities::evidence::LineOfTherapy::FirstLine => first_line.push(drug.clone()),
                    crate::entities::evidence::LineOfTherapy::Unspecified => {}
                }
            }

            if !later_line.is_empty() && first_line.is_empty() {
                lines.push(String::new());
                lines.push("FDA APPROVAL CONTEXT:".to_string());
                lines.push(format!("  FDA-APPROVED FOR THIS BIOMARKER (later-line): {}", later_line.join(", ")));
                lines.push("  → IMPORTANT: Later-line FDA approval is STILL Tier I if the biomarker IS the therapeutic indication.".to_string());
            } else if !first_line.is_empty() {
                lines.push(String::new());
                lines.push(format!("FDA FIRST-LINE APPROVAL: {} → Strong Tier I signal", first_line.join(", ")));
            }
        }
        let _ = tumor_type;
    }

    if !stats.conflicts.is_empty() {
        lines.push(String::new());
        lines.push("CONFLICTS DETECTED:".to_string());
        for conflict in stats.conflicts.iter().take(5) {
            lines.push(format!(
                "  - {}: SENSITIVITY in {} ({} entries) vs RESISTANCE in {} ({} entries)",
                conflict.drug,
                conflict.sensitivity_context,
                conflict.sensitivity_count,
                conflict.resistance_context,
                conflict.resistance_count
            ));
        }
    }

    lines.push(bar);
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::evidence::Evidence;

    #[test]
    fn header_reports_no_evidence_when_bundle_is_empty() {
        let evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        let header = format_evidence_summary_header(&evidence, Some("Melanoma"));
        assert!(header.contains("No sensitivity/resistance evidence found"));
        assert!(header.contains("TIER CLASSIFICATION GUIDANCE"));
    }
}
