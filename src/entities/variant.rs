use serde::{Deserialize, Serialize};

/// The raw `(gene, variant, tumor_type?)` triple the Engine receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantInput {
    pub gene: String,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,
}

/// The mutually-exclusive variant-type classification produced by the
/// Normalizer's ordered pattern cascade (`spec.md` §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantType {
    Fusion,
    Amplification,
    Truncating,
    Splice,
    Frameshift,
    Deletion,
    Insertion,
    Duplication,
    Nonsense,
    Missense,
    Unknown,
}

impl VariantType {
    /// Only these classify as the point mutations (SNPs and small indels)
    /// this system is scoped to assess (`spec.md` §1, §4.1.4).
    pub fn is_accepted(self) -> bool {
        matches!(
            self,
            VariantType::Missense
                | VariantType::Nonsense
                | VariantType::Insertion
                | VariantType::Deletion
                | VariantType::Frameshift
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariantType::Fusion => "fusion",
            VariantType::Amplification => "amplification",
            VariantType::Truncating => "truncating",
            VariantType::Splice => "splice",
            VariantType::Frameshift => "frameshift",
            VariantType::Deletion => "deletion",
            VariantType::Insertion => "insertion",
            VariantType::Duplication => "duplication",
            VariantType::Nonsense => "nonsense",
            VariantType::Missense => "missense",
            VariantType::Unknown => "unknown",
        }
    }
}

/// A successfully parsed protein-level change, in every notation the
/// Normalizer can produce from any accepted input form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProteinChange {
    pub ref_aa: char,
    pub position: u32,
    pub alt_aa: char,
    /// e.g. `V600E`
    pub short_form: String,
    /// e.g. `p.V600E`
    pub hgvs: String,
    /// e.g. `p.Val600Glu`
    pub long_form: String,
}

/// The output of `normalizer::normalize` (`spec.md` §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedVariant {
    pub gene: String,
    pub variant_original: String,
    /// Canonical one-letter form when a protein-change parse succeeds;
    /// otherwise the stripped input string.
    pub variant_normalized: String,
    pub variant_type: VariantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_change: Option<ProteinChange>,
}
