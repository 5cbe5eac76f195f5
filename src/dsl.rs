//! The curated-biomarker `Alteration` column DSL (`spec.md` §4.3): a compact
//! syntax mixing exact variants, comma-separated lists, codon wildcards, and
//! whole-gene wildcards, matched case-insensitively with any `p.` prefix
//! stripped.

use std::sync::OnceLock;

use regex::Regex;

fn variant_position_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z*])(\d+)([A-Z*])$").expect("valid regex"))
}

fn codon_wildcard_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z])(\d+)\.$").expect("valid regex"))
}

fn position_wildcard_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\.(\d+)\.$").expect("valid regex"))
}

fn strip_and_upper(s: &str) -> String {
    s.trim()
        .strip_prefix("p.")
        .or_else(|| s.trim().strip_prefix("P."))
        .unwrap_or(s.trim())
        .to_ascii_uppercase()
}

/// One `(gene, element)` pair produced by splitting a pattern on commas; the
/// gene prefix on each element is optional and inherits the most recently
/// seen explicit gene (`spec.md` §4.3).
struct Element {
    gene: String,
    spec: String,
}

fn parse_pattern(pattern: &str) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut current_gene = String::new();
    for raw_token in pattern.split(',') {
        let token = raw_token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some((gene, spec)) = token.split_once(':') {
            current_gene = gene.trim().to_ascii_uppercase();
            elements.push(Element {
                gene: current_gene.clone(),
                spec: spec.trim().to_string(),
            });
        } else {
            elements.push(Element {
                gene: current_gene.clone(),
                spec: token.to_string(),
            });
        }
    }
    elements
}

fn element_matches(spec: &str, variant: &str) -> bool {
    let spec_clean = strip_and_upper(spec);
    let variant_clean = strip_and_upper(variant);

    if spec_clean == "." {
        return true;
    }

    if let Some(caps) = position_wildcard_re().captures(&spec_clean) {
        let spec_position = &caps[1];
        if let Some(var_caps) = variant_position_re().captures(&variant_clean) {
            return &var_caps[2] == spec_position;
        }
        return false;
    }

    if let Some(caps) = codon_wildcard_re().captures(&spec_clean) {
        let spec_ref = &caps[1];
        let spec_position = &caps[2];
        if let Some(var_caps) = variant_position_re().captures(&variant_clean) {
            return &var_caps[1] == spec_ref && &var_caps[2] == spec_position;
        }
        return false;
    }

    spec_clean == variant_clean
}

/// Returns whether `(gene, variant)` is matched by a curated-biomarker
/// `alteration_pattern` string.
pub fn matches(pattern: &str, gene: &str, variant: &str) -> bool {
    let gene_upper = gene.trim().to_ascii_uppercase();
    parse_pattern(pattern)
        .into_iter()
        .any(|el| (el.gene.is_empty() || el.gene == gene_upper) && element_matches(&el.spec, variant))
}
