//! The shared data model: inputs, the normalized variant, the aggregated
//! evidence bundle, the LLM assessment, and the validation bookkeeping types.

pub mod assessment;
pub mod evidence;
pub mod validation;
pub mod variant;

pub use assessment::{Assessment, RecommendedTherapy, Tier};
pub use evidence::{
    CuratedBiomarker, Evidence, FdaApproval, HarmonizedAssertion, PredictiveAssertion,
};
pub use validation::{GoldStandardEntry, TierMetrics, ValidationMetrics, ValidationResult};
pub use variant::{NormalizedVariant, ProteinChange, VariantInput, VariantType};
