//! Gene/tumor-type pairs known to have investigational-only evidence with
//! no approved therapy, so the tier hint doesn't overstate Tier II potential.

use crate::utils::constants::INVESTIGATIONAL_ONLY_PAIRS;

/// True when `gene`/`tumor_type` is a known investigational-only pair
/// (`"*"` in the table matches any tumor type).
pub fn is_investigational_only(gene: &str, tumor_type: Option<&str>) -> bool {
    let gene_lower = gene.to_ascii_lowercase();
    let Some(tumor_type) = tumor_type.filter(|t| !t.trim().is_empty()) else {
        return false;
    };
    let tumor_lower = tumor_type.to_ascii_lowercase();

    INVESTIGATIONAL_ONLY_PAIRS.iter().any(|(pair_gene, pair_tumor)| {
        *pair_gene == gene_lower && (*pair_tumor == "*" || tumor_lower.contains(pair_tumor))
    })
}
