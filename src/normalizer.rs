//! Pure `(gene, variant) -> NormalizedVariant` classification (`spec.md` §4.1).
//!
//! No I/O, no async — this module is consulted synchronously by the
//! Preprocessor and the KB clients alike, so its regexes are compiled once
//! behind `OnceLock` rather than per call.

use std::sync::OnceLock;

use regex::Regex;

use crate::entities::variant::{NormalizedVariant, ProteinChange, VariantType};
use crate::error::TumorboardError;
use crate::utils::constants::three_to_one;

/// Any of these substrings anywhere in the raw variant string reject it
/// outright before classification even runs (`spec.md` §8 invariant 3) —
/// these describe structural events this system is explicitly out of scope
/// for (`spec.md` §1 Non-goals).
const STRUCTURAL_REJECT_MARKERS: &[&str] = &[
    "fusion",
    "amplification",
    "rearrangement",
    "overexpression",
    "exon 14 skipping",
    "truncating",
];

fn one_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z*])(\d+)([A-Z*])$").expect("valid regex"))
}

fn three_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([A-Za-z]{3})(\d+)([A-Za-z]{3})$").expect("valid regex")
    })
}

fn hgvs_protein_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^p\.([A-Za-z]{1,3})(\d+)([A-Za-z]{1,3})$").expect("valid regex")
    })
}

fn frameshift_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)fs(\*|\bter\b|x)?\d*").expect("valid regex"))
}

fn splice_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(splice|[+-]\d+[a-z]|ivs\d+)").expect("valid regex")
    })
}

fn deletion_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)del(?!ins)").expect("valid regex"))
}

fn delins_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)delins").expect("valid regex"))
}

fn insertion_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ins").expect("valid regex"))
}

fn duplication_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)dup").expect("valid regex"))
}

fn nonsense_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z]{1,3}\d+(\*|ter|x)$").expect("valid regex")
    })
}

fn one_letter(three: &str) -> Option<char> {
    if three.len() == 1 {
        return three.chars().next().filter(|c| c.is_ascii_alphabetic() || *c == '*');
    }
    three_to_one(three)
}

fn three_letter(one: char) -> Option<&'static str> {
    crate::utils::constants::AMINO_ACID_3TO1
        .iter()
        .find(|(_, c)| *c == one.to_ascii_uppercase())
        .map(|(three, _)| *three)
}

fn build_protein_change(ref_code: &str, position: u32, alt_code: &str) -> Option<ProteinChange> {
    let ref_aa = one_letter(ref_code)?;
    let alt_aa = one_letter(alt_code)?;
    let ref_three = three_letter(ref_aa)?;
    let alt_three = three_letter(alt_aa)?;
    let short_form = format!("{ref_aa}{position}{alt_aa}");
    Some(ProteinChange {
        ref_aa,
        position,
        alt_aa,
        short_form: short_form.clone(),
        hgvs: format!("p.{short_form}"),
        long_form: format!(
            "p.{}{position}{}",
            titlecase(ref_three),
            titlecase(alt_three)
        ),
    })
}

fn titlecase(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

fn parse_protein_change(raw: &str) -> Option<ProteinChange> {
    let stripped = raw.strip_prefix("p.").unwrap_or(raw);

    if let Some(caps) = one_letter_re().captures(stripped) {
        let position: u32 = caps[2].parse().ok()?;
        return build_protein_change(&caps[1], position, &caps[3]);
    }
    if let Some(caps) = three_letter_re().captures(stripped) {
        let position: u32 = caps[2].parse().ok()?;
        return build_protein_change(&caps[1], position, &caps[3]);
    }
    if let Some(caps) = hgvs_protein_re().captures(raw) {
        let position: u32 = caps[2].parse().ok()?;
        return build_protein_change(&caps[1], position, &caps[3]);
    }
    None
}

/// Ordered classification cascade. Each arm's predicate is checked in turn;
/// the first match wins. Frameshift must be checked before deletion because
/// a frameshift's HGVS notation (`L747fs`) can itself contain `del` in
/// upstream forms like `185delAGfs*16`.
fn classify(raw: &str, has_protein_change: bool) -> VariantType {
    let lower = raw.to_ascii_lowercase();

    if lower.contains("fusion") {
        return VariantType::Fusion;
    }
    if lower.contains("amplification") || lower.contains("amp") && lower.contains("copy") {
        return VariantType::Amplification;
    }
    if lower.contains("truncat") || lower.contains("exon 14 skipping") {
        return VariantType::Truncating;
    }
    if splice_re().is_match(raw) {
        return VariantType::Splice;
    }
    if frameshift_re().is_match(raw) {
        return VariantType::Frameshift;
    }
    if delins_re().is_match(raw) {
        return VariantType::Deletion;
    }
    if deletion_re().is_match(raw) {
        return VariantType::Deletion;
    }
    if insertion_re().is_match(raw) {
        return VariantType::Insertion;
    }
    if duplication_re().is_match(raw) {
        return VariantType::Duplication;
    }
    if nonsense_re().is_match(raw) {
        return VariantType::Nonsense;
    }
    if has_protein_change {
        return VariantType::Missense;
    }
    VariantType::Unknown
}

/// Classifies and canonicalizes a `(gene, variant)` pair, rejecting variant
/// types outside `{missense, nonsense, insertion, deletion, frameshift}`
/// (`spec.md` §3, §4.1).
pub fn normalize(gene: &str, variant: &str) -> Result<NormalizedVariant, TumorboardError> {
    let gene_upper = gene.to_ascii_uppercase();
    let trimmed = variant.trim();
    let lower = trimmed.to_ascii_lowercase();

    if STRUCTURAL_REJECT_MARKERS.iter().any(|m| lower.contains(m)) {
        let variant_type = classify(trimmed, false);
        return Err(TumorboardError::UnsupportedVariantType {
            variant: trimmed.to_string(),
            classified_type: variant_type.as_str().to_string(),
        });
    }

    let protein_change = parse_protein_change(trimmed);
    let variant_type = classify(trimmed, protein_change.is_some());

    if !variant_type.is_accepted() {
        return Err(TumorboardError::UnsupportedVariantType {
            variant: trimmed.to_string(),
            classified_type: variant_type.as_str().to_string(),
        });
    }

    let variant_normalized = protein_change
        .as_ref()
        .map(|pc| pc.short_form.clone())
        .unwrap_or_else(|| trimmed.to_string());

    Ok(NormalizedVariant {
        gene: gene_upper,
        variant_original: trimmed.to_string(),
        variant_normalized,
        variant_type,
        protein_change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_letter_missense_parses() {
        let v = normalize("BRAF", "V600E").unwrap();
        let pc = v.protein_change.unwrap();
        assert_eq!(pc.short_form, "V600E");
        assert_eq!(pc.position, 600);
        assert_eq!(pc.hgvs, "p.V600E");
        assert_eq!(pc.long_form, "p.Val600Glu");
        assert_eq!(v.variant_type, VariantType::Missense);
    }

    #[test]
    fn three_letter_missense_matches_one_letter_canonical_form() {
        let from_one = normalize("BRAF", "V600E").unwrap();
        let from_three = normalize("BRAF", "Val600Glu").unwrap();
        let from_hgvs = normalize("BRAF", "p.V600E").unwrap();
        let from_hgvs_long = normalize("BRAF", "p.Val600Glu").unwrap();
        for other in [&from_three, &from_hgvs, &from_hgvs_long] {
            assert_eq!(other.variant_normalized, from_one.variant_normalized);
            assert_eq!(
                other.protein_change.as_ref().unwrap().position,
                600
            );
        }
    }

    #[test]
    fn gene_is_uppercased() {
        let v = normalize("braf", "V600E").unwrap();
        assert_eq!(v.gene, "BRAF");
    }

    #[test]
    fn frameshift_containing_del_is_classified_frameshift_not_deletion() {
        let v = normalize("EGFR", "L747fs").unwrap();
        assert_eq!(v.variant_type, VariantType::Frameshift);
    }

    #[test]
    fn plain_deletion_is_classified_deletion() {
        let v = normalize("EGFR", "185delAG").unwrap();
        assert_eq!(v.variant_type, VariantType::Deletion);
    }

    #[test]
    fn delins_is_classified_deletion() {
        let v = normalize("EGFR", "L747_P753delinsS").unwrap();
        assert_eq!(v.variant_type, VariantType::Deletion);
    }

    #[test]
    fn nonsense_stop_gain_is_rejected_only_if_unaccepted() {
        let v = normalize("TP53", "R213*").unwrap();
        assert_eq!(v.variant_type, VariantType::Nonsense);
    }

    #[test]
    fn structural_variant_strings_are_rejected() {
        for raw in [
            "EML4-ALK fusion",
            "ERBB2 amplification",
            "BCR-ABL1 rearrangement",
            "EGFR overexpression",
            "EGFR exon 14 skipping",
            "MET truncating mutation",
        ] {
            let err = normalize("GENE", raw).unwrap_err();
            assert!(matches!(err, TumorboardError::UnsupportedVariantType { .. }));
        }
    }

    #[test]
    fn idempotent_on_canonical_form() {
        let once = normalize("BRAF", "V600E").unwrap();
        let twice = normalize(&once.gene, &once.variant_normalized).unwrap();
        assert_eq!(once.variant_normalized, twice.variant_normalized);
        assert_eq!(once.variant_type, twice.variant_type);
    }
}
