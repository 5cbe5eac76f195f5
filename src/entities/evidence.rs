use serde::{Deserialize, Serialize};

/// One predictive/prognostic/diagnostic record surfaced by the
/// variant-annotation client (MyVariant-style direct hit, or its curated-KB
/// GraphQL fallback). Tolerant of whichever of the two upstream response
/// shapes produced it (`spec.md` §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantAnnotationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_significance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drugs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

impl VariantAnnotationRecord {
    pub fn is_sensitivity(&self) -> bool {
        self.clinical_significance
            .as_deref()
            .map(|s| {
                let upper = s.to_ascii_uppercase();
                upper.contains("SENSITIV") || upper.contains("RESPONSE")
            })
            .unwrap_or(false)
    }

    pub fn is_resistance(&self) -> bool {
        self.clinical_significance
            .as_deref()
            .map(|s| s.to_ascii_uppercase().contains("RESIST"))
            .unwrap_or(false)
    }
}

/// A ClinVar-style clinical-significance record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalSignificanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_significance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
}

/// A COSMIC-style somatic-mutation catalogue record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SomaticCatalogueRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_histology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histology_subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_somatic_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineOfTherapy {
    FirstLine,
    LaterLine,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalType {
    Full,
    Accelerated,
    Unspecified,
}

/// A drug-label hit, carrying both the raw indication text and the derived
/// fields `spec.md` §3 names (`tumor_match`, `line_of_therapy`,
/// `approval_type`, `indication_excerpt`), computed purely over
/// `(indication, tumor_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FdaApproval {
    pub brand_name: String,
    pub generic_name: String,
    pub indications_and_usage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_studies: Option<String>,
    pub variant_in_indications: bool,
    pub variant_in_clinical_studies: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_studies_excerpt: Option<String>,
    pub tumor_match: bool,
    pub line_of_therapy: LineOfTherapy,
    pub approval_type: ApprovalType,
    pub indication_excerpt: String,
}

/// One row from the curated-biomarker TSV (`spec.md` §4.2, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedBiomarker {
    pub gene: String,
    pub alteration_pattern: String,
    pub drug: String,
    pub drug_status: String,
    pub association: String,
    pub evidence_level: String,
    pub tumor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tumor_type_full: Option<String>,
    pub fda_approved: bool,
}

impl CuratedBiomarker {
    pub fn is_sensitivity(&self) -> bool {
        self.association.eq_ignore_ascii_case("responsive")
    }

    pub fn is_resistance(&self) -> bool {
        self.association.eq_ignore_ascii_case("resistant")
    }
}

/// A harmonized-KB association: OncoKB-style evidence level plus a derived
/// AMP tier (`spec.md` §3 "harmonized_assertions").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonizedAssertion {
    pub gene: String,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drugs: Vec<String>,
    pub evidence_level: String,
    pub response_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HarmonizedAssertion {
    pub fn is_sensitivity(&self) -> bool {
        let upper = self.response_type.to_ascii_uppercase();
        upper.contains("SENSITIV") || upper.contains("RESPONS") || upper.contains("SUPPORT")
    }

    pub fn is_resistance(&self) -> bool {
        self.response_type.to_ascii_uppercase().contains("RESIST")
    }
}

/// A curated AMP-tier assertion (`spec.md` §4.2 curated-assertion client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictiveAssertion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp_level_letter: Option<String>,
    pub assertion_type: String,
    pub assertion_direction: String,
    pub significance: String,
    pub status: String,
    pub molecular_profile: String,
    pub disease: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub therapies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fda_companion_test: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nccn_guideline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PredictiveAssertion {
    pub fn is_sensitivity(&self) -> bool {
        let upper = self.significance.to_ascii_uppercase();
        upper.contains("SENSITIV") || upper.contains("RESPONSE")
    }

    pub fn is_resistance(&self) -> bool {
        self.significance.to_ascii_uppercase().contains("RESIST")
    }

    pub fn is_accepted(&self) -> bool {
        self.status.eq_ignore_ascii_case("accepted")
    }
}

/// The aggregated evidence bundle the Evidence Aggregator returns
/// (`spec.md` §3). Immutable once constructed — the Preprocessor only reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub variant_id: String,
    pub gene: String,
    pub variant: String,

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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_consequence: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_annotations: Vec<VariantAnnotationRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clinical_significance_records: Vec<ClinicalSignificanceRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub somatic_catalogue_records: Vec<SomaticCatalogueRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drug_label_records: Vec<FdaApproval>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curated_biomarker_records: Vec<CuratedBiomarker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub harmonized_assertions: Vec<HarmonizedAssertion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predictive_assertions: Vec<PredictiveAssertion>,
}

impl Evidence {
    /// A minimal bundle for a gene/variant pair with no source data
    /// (used when every KB fetch degrades to empty).
    pub fn empty(variant_id: impl Into<String>, gene: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            variant_id: variant_id.into(),
            gene: gene.into(),
            variant: variant.into(),
            cosmic_id: None,
            ncbi_gene_id: None,
            dbsnp_id: None,
            clinvar_id: None,
            clinvar_clinical_significance: None,
            clinvar_accession: None,
            hgvs_genomic: None,
            hgvs_protein: None,
            hgvs_transcript: None,
            snpeff_effect: None,
            polyphen2_prediction: None,
            cadd_score: None,
            gnomad_exome_af: None,
            alphamissense_score: None,
            alphamissense_prediction: None,
            transcript_id: None,
            transcript_consequence: None,
            variant_annotations: Vec::new(),
            clinical_significance_records: Vec::new(),
            somatic_catalogue_records: Vec::new(),
            drug_label_records: Vec::new(),
            curated_biomarker_records: Vec::new(),
            harmonized_assertions: Vec::new(),
            predictive_assertions: Vec::new(),
        }
    }
}
