//! Evidence Aggregator (`spec.md` §4.3): fans a normalized `(gene, variant,
//! tumor_type)` triple out across the five knowledge-base clients
//! concurrently, merging whatever comes back and degrading individual
//! failures to empty results rather than failing the whole assessment
//! (`spec.md` §5 gather-with-exceptions).

use crate::entities::evidence::Evidence;
use crate::error::TumorboardError;
use crate::sources::curated_assertion::CuratedAssertionClient;
use crate::sources::curated_biomarker::CuratedBiomarkerClient;
use crate::sources::drug_label::DrugLabelClient;
use crate::sources::harmonized_kb::HarmonizedKbClient;
use crate::sources::variant_annotation::VariantAnnotationClient;

/// Holds one client per knowledge base. Constructed once per `Engine` and
/// reused across every variant it assesses.
pub struct Aggregator {
    variant_annotation: VariantAnnotationClient,
    drug_label: DrugLabelClient,
    curated_biomarker: CuratedBiomarkerClient,
    harmonized_kb: HarmonizedKbClient,
    curated_assertion: CuratedAssertionClient,
}

impl Aggregator {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self {
            variant_annotation: VariantAnnotationClient::new()?,
            drug_label: DrugLabelClient::new()?,
            curated_biomarker: CuratedBiomarkerClient::new()?,
            harmonized_kb: HarmonizedKbClient::new()?,
            curated_assertion: CuratedAssertionClient::new()?,
        })
    }

    /// Fetches and merges evidence for `(gene, variant)`, optionally
    /// restricted to `tumor_type`. Each client's failure is logged and
    /// degraded to an empty result; only a `variant-annotation` failure
    /// starts from a wholly empty `Evidence` bundle, since it owns the
    /// identity/cross-reference fields the others don't carry.
    pub async fn aggregate(&self, gene: &str, variant: &str, tumor_type: Option<&str>) -> Evidence {
        let tumor_type_owned = tumor_type.unwrap_or_default().to_string();

        let (base, drug_labels, biomarkers, harmonized, assertions) = tokio::join!(
            self.variant_annotation.fetch_evidence(gene, variant),
            self.drug_label.fetch_approvals(gene, variant, &tumor_type_owned),
            self.curated_biomarker.fetch_biomarkers(gene, variant, tumor_type),
            self.harmonized_kb.fetch_associations(gene, variant, tumor_type),
            self.curated_assertion.fetch_assertions(gene, variant),
        );

        let mut evidence = base.unwrap_or_else(|err| {
            tracing::warn!(source = "variant-annotation", gene, variant, error = %err, "evidence fetch failed");
            Evidence::empty(format!("{gene}:{variant}"), gene, variant)
        });

        evidence.drug_label_records = drug_labels.unwrap_or_else(|err| {
            tracing::warn!(source = "drug-label", gene, variant, error = %err, "evidence fetch failed");
            Vec::new()
        });
        evidence.curated_biomarker_records = biomarkers.unwrap_or_else(|err| {
            tracing::warn!(source = "curated-biomarker", gene, variant, error = %err, "evidence fetch failed");
            Vec::new()
        });
        evidence.harmonized_assertions = harmonized.unwrap_or_else(|err| {
            tracing::warn!(source = "harmonized-kb", gene, variant, error = %err, "evidence fetch failed");
            Vec::new()
        });
        evidence.predictive_assertions = assertions.unwrap_or_else(|err| {
            tracing::warn!(source = "curated-assertion", gene, variant, error = %err, "evidence fetch failed");
            Vec::new()
        });

        evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aggregate_degrades_to_empty_evidence_when_every_source_is_unreachable() {
        // SAFETY: single-threaded test, no other code reads these vars concurrently.
        unsafe {
            std::env::set_var("TUMORBOARD_VARIANT_ANNOTATION_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_DRUG_LABEL_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_CURATED_KB_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_HARMONIZED_KB_BASE", "http://127.0.0.1:1");
            std::env::set_var("TUMORBOARD_NCBI_EUTILS_BASE", "http://127.0.0.1:1");
        }

        let aggregator = Aggregator::new().unwrap();
        let evidence = aggregator.aggregate("BRAF", "V600E", Some("Melanoma")).await;
        assert_eq!(evidence.gene, "BRAF");
        assert_eq!(evidence.variant, "V600E");
    }
}
