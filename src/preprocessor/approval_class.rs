//! Gene-specific "does this FDA indication apply to this variant" rules
//! (`spec.md` §4.5.2). This is the single source of truth for whether an
//! approval's indication text actually covers the queried variant, as
//! opposed to merely naming the same gene. Deliberately branchy per-gene
//! logic rather than a data table: each gene's approval language groups
//! variants differently and the grouping itself is the domain knowledge.

use crate::preprocessor::resistance::check_fda_requires_wildtype_text;

/// True when `indication`'s text, read for `gene`/`variant`, actually
/// covers the queried variant rather than merely mentioning the gene.
pub fn variant_matches_approval_class(gene: &str, variant: &str, indication: &str) -> bool {
    let gene_lower = gene.to_ascii_lowercase();
    let variant_upper = variant.to_ascii_uppercase();
    let indication_lower = indication.to_ascii_lowercase();

    let exclusion_patterns = [
        "wild-type".to_string(),
        "wild type".to_string(),
        "wildtype".to_string(),
        format!("{gene_lower}-negative"),
        "without mutations".to_string(),
    ];
    if exclusion_patterns.iter().any(|p| indication_lower.contains(p.as_str())) {
        return false;
    }

    match gene_lower.as_str() {
        "braf" => {
            const V600_VARIANTS: &[&str] = &["V600E", "V600K", "V600D", "V600R"];
            indication_lower.contains("v600") && V600_VARIANTS.iter().any(|v| variant_upper.contains(v))
        }
        "kras" | "nras" => {
            if indication_lower.contains("g12c") {
                variant_upper.contains("G12C")
            } else {
                indication_lower.contains(&format!("{gene_lower} mutation"))
                    || indication_lower.contains(&format!("{gene_lower} mutated"))
                    || indication_lower.contains(&format!("{gene_lower} positive"))
                    || indication_lower.contains(&format!("{gene_lower}-positive"))
            }
        }
        "kit" => {
            if indication_lower.contains(&variant.to_ascii_lowercase()) {
                return true;
            }
            if let Some(exon) = kit_exon(&variant_upper) {
                if indication_lower.contains(&format!("exon {exon}")) {
                    return true;
                }
            }
            indication_lower.contains("kit-positive") || indication_lower.contains("kit mutated") || indication_lower.contains("kit-mutated")
        }
        "egfr" => {
            const COMMON: &[&str] = &["L858R", "EXON 19 DEL", "EXON19DEL"];
            const UNCOMMON: &[&str] = &["G719A", "G719C", "G719S", "L861Q", "S768I"];
            const RESISTANCE: &[&str] = &["T790M", "C797S"];

            let is_common = COMMON.iter().any(|m| variant_upper.contains(m));
            let is_uncommon = UNCOMMON.iter().any(|m| variant_upper.contains(m));
            let is_resistance = RESISTANCE.iter().any(|m| variant_upper.contains(m));

            (is_common && (indication_lower.contains("l858r") || indication_lower.contains("exon 19 del")))
                || (is_uncommon && (indication_lower.contains("uncommon") || indication_lower.contains("g719") || indication_lower.contains("l861q") || indication_lower.contains("s768i")))
                || (is_resistance && (indication_lower.contains("t790m") || indication_lower.contains("c797s") || indication_lower.contains("resistance")))
        }
        _ => !check_fda_requires_wildtype_text(&indication_lower) && indication_lower.contains(&gene_lower),
    }
}

/// The KIT exon a hotspot substitution falls in, used by `spec.md` §4.5.2's
/// gene-specific KIT rule to decide whether two different-looking variant
/// strings are in the same actionable class.
pub fn kit_exon(variant_upper: &str) -> Option<u8> {
    const EXON_MAP: &[(&str, u8)] = &[("V560D", 9), ("V559D", 9), ("D816V", 17), ("D816H", 17), ("D816Y", 17)];
    EXON_MAP.iter().find(|(v, _)| variant_upper.contains(v)).map(|(_, exon)| *exon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braf_matches_v600_family_when_indication_mentions_v600() {
        assert!(variant_matches_approval_class("BRAF", "V600E", "for BRAF V600E-mutation-positive melanoma"));
        assert!(variant_matches_approval_class("BRAF", "V600K", "for BRAF V600 mutation-positive melanoma"));
        assert!(!variant_matches_approval_class("BRAF", "D594G", "for BRAF V600E-mutation-positive melanoma"));
    }

    #[test]
    fn braf_does_not_match_without_v600_mention() {
        assert!(!variant_matches_approval_class("BRAF", "V600E", "for BRAF fusion-positive tumors"));
    }

    #[test]
    fn ras_matches_hotspot_codons() {
        assert!(variant_matches_approval_class("KRAS", "G12C", "for KRAS G12C-mutated NSCLC"));
        assert!(variant_matches_approval_class("NRAS", "Q61R", "for NRAS mutated melanoma"));
        assert!(!variant_matches_approval_class("KRAS", "A146T", "for KRAS G12C-mutated NSCLC"));
    }

    #[test]
    fn kit_matches_known_exon_hotspots() {
        assert!(variant_matches_approval_class("KIT", "V560D", "for KIT exon 9 mutated GIST"));
        assert!(variant_matches_approval_class("KIT", "D816V", "for KIT exon 17 mutated GIST"));
        assert!(!variant_matches_approval_class("KIT", "K642E", "for KIT exon 9 mutated GIST"));
    }

    #[test]
    fn egfr_matches_all_three_classes() {
        assert!(variant_matches_approval_class("EGFR", "L858R", "for EGFR exon 19 deletion or L858R NSCLC"));
        assert!(variant_matches_approval_class("EGFR", "G719A", "for EGFR uncommon mutations"));
        assert!(variant_matches_approval_class("EGFR", "T790M", "for EGFR T790M resistance mutation"));
    }

    #[test]
    fn exclusion_patterns_override_any_gene() {
        assert!(!variant_matches_approval_class("BRAF", "V600E", "for BRAF wild-type melanoma"));
        assert!(!variant_matches_approval_class("KIT", "V560D", "for KIT-negative GIST"));
    }

    #[test]
    fn unknown_gene_defaults_to_permissive_gene_mention() {
        assert!(variant_matches_approval_class("PIK3CA", "H1047R", "for PIK3CA-mutated breast cancer"));
        assert!(!variant_matches_approval_class("PIK3CA", "H1047R", "for metastatic breast cancer"));
    }
}
