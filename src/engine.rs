//! The Assessment Engine (`spec.md` §4.8): wires normalization, tumor-type
//! resolution, evidence aggregation, and adjudication into the single
//! `(gene, variant, tumor_type) -> Assessment` pipeline, plus a
//! gather-with-exceptions batch variant.

use crate::adjudicator::{Adjudicator, HttpAdjudicator};
use crate::aggregator::Aggregator;
use crate::entities::assessment::Assessment;
use crate::entities::variant::VariantInput;
use crate::error::TumorboardError;
use crate::normalizer::normalize;
use crate::prompt_builder::build_evidence_summary;
use crate::tumor_ontology::TumorOntologyClient;

/// Owns one of each client and the adjudicator; constructed once per run and
/// reused across every variant it assesses.
pub struct Engine {
    tumor_ontology: TumorOntologyClient,
    aggregator: Aggregator,
    adjudicator: Box<dyn Adjudicator>,
}

impl Engine {
    pub fn new() -> Result<Self, TumorboardError> {
        Ok(Self {
            tumor_ontology: TumorOntologyClient::new()?,
            aggregator: Aggregator::new()?,
            adjudicator: Box::new(HttpAdjudicator::with_default_model()?),
        })
    }

    /// Swaps in a different adjudicator, e.g. a fixture-backed stub in tests
    /// or the Validator's batch runs.
    pub fn with_adjudicator(adjudicator: Box<dyn Adjudicator>) -> Result<Self, TumorboardError> {
        Ok(Self {
            tumor_ontology: TumorOntologyClient::new()?,
            aggregator: Aggregator::new()?,
            adjudicator,
        })
    }

    /// Assesses a single variant: normalize, validate variant type, resolve
    /// tumor type, aggregate evidence, adjudicate.
    pub async fn assess_variant(&self, input: &VariantInput) -> Result<Assessment, TumorboardError> {
        let normalized = normalize(&input.gene, &input.variant)?;

        let resolved_tumor_type = match input.tumor_type.as_deref() {
            Some(t) if !t.trim().is_empty() => Some(self.tumor_ontology.resolve(t).await),
            _ => None,
        };

        let evidence = self
            .aggregator
            .aggregate(&normalized.gene, &normalized.variant_normalized, resolved_tumor_type.as_deref())
            .await;
        let evidence_summary = build_evidence_summary(&evidence, resolved_tumor_type.as_deref());

        self.adjudicator
            .assess(&normalized.gene, &input.variant, resolved_tumor_type.as_deref(), &evidence, &evidence_summary)
            .await
    }

    /// Assesses every variant concurrently, logging and dropping individual
    /// failures rather than failing the whole batch (`spec.md` §4.8).
    pub async fn batch_assess(&self, inputs: &[VariantInput]) -> Vec<Assessment> {
        let results = futures::future::join_all(inputs.iter().map(|input| self.assess_variant(input))).await;

        results
            .into_iter()
            .filter_map(|result| match result {
                Ok(assessment) => Some(assessment),
                Err(err) => {
                    tracing::warn!(error = %err, "batch assessment failed for a variant");
                    None
                }
            })
            .collect()
    }
}
