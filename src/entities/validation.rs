use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::assessment::Assessment;

/// One labeled case from a gold-standard dataset (`spec.md` §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldStandardEntry {
    pub gene: String,
    pub variant: String,
    pub tumor_type: String,
    pub expected_tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

/// Either bare-list or `{"entries": [...]}` gold-standard file shapes
/// (`spec.md` §4.9, carried from `original_source/validation/validator.py`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GoldStandardFile {
    List(Vec<GoldStandardEntry>),
    Wrapped { entries: Vec<GoldStandardEntry> },
}

impl GoldStandardFile {
    pub fn into_entries(self) -> Vec<GoldStandardEntry> {
        match self {
            GoldStandardFile::List(entries) => entries,
            GoldStandardFile::Wrapped { entries } => entries,
        }
    }
}

/// The sentinel tier distance used when either side of the comparison is
/// `"Unknown"`, making an ordinal distance meaningless (`spec.md` §8, I-8).
pub const UNKNOWN_TIER_DISTANCE: u32 = 999;

fn tier_order(tier: &str) -> Option<i32> {
    match tier {
        "Tier I" => Some(0),
        "Tier II" => Some(1),
        "Tier III" => Some(2),
        "Tier IV" => Some(3),
        _ => None,
    }
}

/// The outcome of running a single gold-standard entry through the Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub gene: String,
    pub variant: String,
    pub tumor_type: String,
    pub expected_tier: String,
    pub predicted_tier: String,
    pub is_correct: bool,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
}

impl ValidationResult {
    /// Ordinal tier distance (0-3), or [`UNKNOWN_TIER_DISTANCE`] when either
    /// the expected or predicted tier is unrecognized/`"Unknown"`.
    pub fn tier_distance(&self) -> u32 {
        match (tier_order(&self.expected_tier), tier_order(&self.predicted_tier)) {
            (Some(expected), Some(predicted)) => (expected - predicted).unsigned_abs(),
            _ => UNKNOWN_TIER_DISTANCE,
        }
    }
}

/// Per-tier confusion-matrix counts and derived precision/recall/F1
/// (`spec.md` §4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierMetrics {
    pub tier: String,
    pub true_positives: u32,
    pub false_positives: u32,
    pub false_negatives: u32,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

impl TierMetrics {
    pub fn new(tier: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            ..Default::default()
        }
    }

    pub fn calculate(&mut self) {
        let tp = self.true_positives as f64;
        let fp = self.false_positives as f64;
        let fn_ = self.false_negatives as f64;
        self.precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        self.recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
        self.f1_score = if self.precision + self.recall > 0.0 {
            2.0 * self.precision * self.recall / (self.precision + self.recall)
        } else {
            0.0
        };
    }
}

/// Aggregate validation metrics across a full gold-standard run, including
/// per-tier confusion matrices and a failure-analysis log (`spec.md` §4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub total_cases: u32,
    pub correct_predictions: u32,
    pub accuracy: f64,
    pub average_confidence: f64,
    pub tier_metrics: HashMap<String, TierMetrics>,
    pub failure_analysis: Vec<serde_json::Value>,
}

const ALL_TIERS: &[&str] = &["Tier I", "Tier II", "Tier III", "Tier IV"];

impl ValidationMetrics {
    pub fn new() -> Self {
        let tier_metrics = ALL_TIERS
            .iter()
            .map(|t| (t.to_string(), TierMetrics::new(*t)))
            .collect();
        Self {
            tier_metrics,
            ..Default::default()
        }
    }

    /// Folds one result's confusion-matrix contribution in: a true positive
    /// on the expected tier when correct, otherwise a false negative on the
    /// expected tier and a false positive on the predicted tier.
    pub fn add_result(&mut self, result: &ValidationResult) {
        self.total_cases += 1;
        if result.is_correct {
            self.correct_predictions += 1;
            self.tier_metrics
                .entry(result.expected_tier.clone())
                .or_insert_with(|| TierMetrics::new(result.expected_tier.clone()))
                .true_positives += 1;
        } else {
            self.tier_metrics
                .entry(result.expected_tier.clone())
                .or_insert_with(|| TierMetrics::new(result.expected_tier.clone()))
                .false_negatives += 1;
            // The predicted tier is not necessarily one of the four canonical
            // tiers seeded in `new` — a failed/unparseable adjudication
            // predicts "Unknown" — so every incorrect prediction must still
            // land an FP somewhere to preserve confusion-matrix conservation
            // (`spec.md` §8, I-7: ΣTP + ΣFP == total_cases).
            self.tier_metrics
                .entry(result.predicted_tier.clone())
                .or_insert_with(|| TierMetrics::new(result.predicted_tier.clone()))
                .false_positives += 1;
            self.failure_analysis.push(serde_json::json!({
                "gene": result.gene,
                "variant": result.variant,
                "tumor_type": result.tumor_type,
                "expected_tier": result.expected_tier,
                "predicted_tier": result.predicted_tier,
                "tier_distance": result.tier_distance(),
                "summary": result
                    .assessment
                    .as_ref()
                    .map(|a| a.summary.chars().take(200).collect::<String>())
                    .unwrap_or_default(),
            }));
        }
    }

    pub fn calculate(results: &[ValidationResult]) -> Self {
        let mut metrics = Self::new();
        let mut confidence_sum = 0.0;
        for result in results {
            metrics.add_result(result);
            confidence_sum += result.confidence_score;
        }
        metrics.accuracy = if metrics.total_cases > 0 {
            metrics.correct_predictions as f64 / metrics.total_cases as f64
        } else {
            0.0
        };
        metrics.average_confidence = if !results.is_empty() {
            confidence_sum / results.len() as f64
        } else {
            0.0
        };
        for tier_metric in metrics.tier_metrics.values_mut() {
            tier_metric.calculate();
        }
        metrics
    }

    /// Human-readable text report, mirroring
    /// `original_source/models/validation.py`'s `to_report` (`SPEC_FULL.md` §5).
    pub fn to_report(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Validation Report ===\n");
        out.push_str(&format!("Total cases: {}\n", self.total_cases));
        out.push_str(&format!("Correct: {}\n", self.correct_predictions));
        out.push_str(&format!("Accuracy: {:.1}%\n", self.accuracy * 100.0));
        out.push_str(&format!(
            "Average confidence: {:.2}\n\n",
            self.average_confidence
        ));
        out.push_str("Per-tier metrics:\n");
        for tier in ALL_TIERS {
            if let Some(m) = self.tier_metrics.get(*tier) {
                out.push_str(&format!(
                    "  {:<10} precision={:.2} recall={:.2} f1={:.2} (tp={} fp={} fn={})\n",
                    tier, m.precision, m.recall, m.f1_score, m.true_positives, m.false_positives, m.false_negatives
                ));
            }
        }
        if !self.failure_analysis.is_empty() {
            out.push_str(&format!("\nFailures ({}):\n", self.failure_analysis.len()));
            for failure in &self.failure_analysis {
                out.push_str(&format!("  {failure}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(expected: &str, predicted: &str, correct: bool) -> ValidationResult {
        ValidationResult {
            gene: "BRAF".into(),
            variant: "V600E".into(),
            tumor_type: "melanoma".into(),
            expected_tier: expected.into(),
            predicted_tier: predicted.into(),
            is_correct: correct,
            confidence_score: 0.9,
            assessment: None,
        }
    }

    #[test]
    fn tier_distance_exact_match_is_zero() {
        assert_eq!(result("Tier I", "Tier I", true).tier_distance(), 0);
    }

    #[test]
    fn tier_distance_spans_full_range() {
        assert_eq!(result("Tier I", "Tier IV", false).tier_distance(), 3);
    }

    #[test]
    fn tier_distance_unknown_is_sentinel() {
        assert_eq!(
            result("Unknown", "Tier I", false).tier_distance(),
            UNKNOWN_TIER_DISTANCE
        );
    }

    #[test]
    fn add_result_updates_confusion_matrix() {
        let mut metrics = ValidationMetrics::new();
        metrics.add_result(&result("Tier I", "Tier I", true));
        metrics.add_result(&result("Tier I", "Tier II", false));
        assert_eq!(metrics.tier_metrics["Tier I"].true_positives, 1);
        assert_eq!(metrics.tier_metrics["Tier I"].false_negatives, 1);
        assert_eq!(metrics.tier_metrics["Tier II"].false_positives, 1);
        assert_eq!(metrics.failure_analysis.len(), 1);
    }

    #[test]
    fn add_result_records_a_false_positive_for_an_unknown_predicted_tier() {
        let mut metrics = ValidationMetrics::new();
        metrics.add_result(&result("Tier I", "Unknown", false));
        assert_eq!(metrics.tier_metrics["Unknown"].false_positives, 1);
        let total_tp: u32 = metrics.tier_metrics.values().map(|m| m.true_positives).sum();
        let total_fp: u32 = metrics.tier_metrics.values().map(|m| m.false_positives).sum();
        assert_eq!(total_tp + total_fp, metrics.total_cases);
    }

    #[test]
    fn gold_standard_file_accepts_both_shapes() {
        let as_list = r#"[{"gene":"BRAF","variant":"V600E","tumor_type":"melanoma","expected_tier":"Tier I"}]"#;
        let as_wrapped = r#"{"entries":[{"gene":"BRAF","variant":"V600E","tumor_type":"melanoma","expected_tier":"Tier I"}]}"#;
        let list: GoldStandardFile = serde_json::from_str(as_list).unwrap();
        let wrapped: GoldStandardFile = serde_json::from_str(as_wrapped).unwrap();
        assert_eq!(list.into_entries().len(), 1);
        assert_eq!(wrapped.into_entries().len(), 1);
    }
}
