use serde::{Deserialize, Serialize};

/// The AMP/ASCO/CAP clinical-actionability tier (`spec.md` §1, §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "Tier I")]
    I,
    #[serde(rename = "Tier II")]
    II,
    #[serde(rename = "Tier III")]
    III,
    #[serde(rename = "Tier IV")]
    IV,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Tier {
    /// Ordinal distance used by the Validator's tier-distance metric
    /// (`spec.md` §4.9, §8 invariant I-8): 0 for an exact match, up to 3
    /// between Tier I and Tier IV. `Unknown` on either side is undefined
    /// distance and is the caller's responsibility to special-case.
    pub fn ordinal(self) -> Option<u8> {
        match self {
            Tier::I => Some(0),
            Tier::II => Some(1),
            Tier::III => Some(2),
            Tier::IV => Some(3),
            Tier::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::I => "Tier I",
            Tier::II => "Tier II",
            Tier::III => "Tier III",
            Tier::IV => "Tier IV",
            Tier::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single therapy line in the LLM's recommendation list (`spec.md` §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedTherapy {
    pub drug_name: String,
    pub evidence_level: String,
    pub approval_status: String,
    pub clinical_context: String,
}

/// The final adjudicated output, merged with every cross-reference field
/// carried over from the `Evidence` bundle so downstream consumers never
/// need to join back against it (`spec.md` §4.7, §6's exact JSON schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub gene: String,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type: Option<String>,

    pub tier: Tier,
    pub confidence: f64,
    pub summary: String,
    pub rationale: String,
    pub evidence_strength: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommended_therapies: Vec<RecommendedTherapy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    pub clinical_trials_available: bool,

    // Cross-reference fields passed through verbatim from `Evidence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cosmic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ncbi_gene_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbsnp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinvar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinvar_clinical_significance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinvar_accession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgvs_genomic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgvs_protein: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgvs_transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snpeff_effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyphen2_prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadd_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gnomad_exome_af: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphamissense_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphamissense_prediction: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_serializes_to_spec_strings() {
        assert_eq!(serde_json::to_string(&Tier::I).unwrap(), "\"Tier I\"");
        assert_eq!(serde_json::to_string(&Tier::Unknown).unwrap(), "\"Unknown\"");
    }

    #[test]
    fn tier_ordinal_spans_zero_to_three() {
        assert_eq!(Tier::I.ordinal(), Some(0));
        assert_eq!(Tier::IV.ordinal(), Some(3));
        assert_eq!(Tier::Unknown.ordinal(), None);
    }
}
