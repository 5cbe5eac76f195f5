//! Aggregate sensitivity/resistance counts across every evidence source, and
//! detect per-drug conflicts where one context reports sensitivity and
//! another reports resistance (`spec.md` §4.5.5).

use std::collections::BTreeMap;

use crate::entities::evidence::Evidence;
use crate::tumor_ontology::tumor_matches;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DominantSignal {
    SensitivityOnly,
    ResistanceOnly,
    SensitivityDominant,
    ResistanceDominant,
    Mixed,
    #[default]
    None,
}

#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub drug: String,
    pub sensitivity_context: String,
    pub sensitivity_count: usize,
    pub resistance_context: String,
    pub resistance_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EvidenceStats {
    pub sensitivity_count: usize,
    pub resistance_count: usize,
    pub sensitivity_by_level: BTreeMap<String, usize>,
    pub resistance_by_level: BTreeMap<String, usize>,
    pub dominant_signal: DominantSignal,
    pub conflicts: Vec<ConflictRecord>,
}

struct DrugSignal {
    display_name: String,
    sensitivity_contexts: BTreeMap<String, usize>,
    resistance_contexts: BTreeMap<String, usize>,
}

/// Computes sensitivity/resistance totals, per-level breakdowns, the
/// dominant signal classification (80% thresholds), and any cross-source
/// drug-level conflicts, all restricted to `tumor_type` when given.
pub fn compute_evidence_stats(evidence: &Evidence, tumor_type: Option<&str>) -> EvidenceStats {
    let tumor_type = tumor_type.filter(|t| !t.trim().is_empty());

    let mut sensitivity_count = 0usize;
    let mut resistance_count = 0usize;
    let mut sensitivity_by_level: BTreeMap<String, usize> = BTreeMap::new();
    let mut resistance_by_level: BTreeMap<String, usize> = BTreeMap::new();
    let mut drug_signals: BTreeMap<String, DrugSignal> = BTreeMap::new();

    // Drugs are grouped case-folded (`spec.md` §4.5.5) so "Vemurafenib" and
    // "vemurafenib" from different sources land in the same conflict bucket.
    let mut record_drug_signal = |drug: &str, context: &str, is_sensitivity: bool| {
        let key = drug.to_ascii_lowercase();
        let entry = drug_signals.entry(key).or_insert_with(|| DrugSignal {
            display_name: drug.to_string(),
            sensitivity_contexts: BTreeMap::new(),
            resistance_contexts: BTreeMap::new(),
        });
        let bucket = if is_sensitivity { &mut entry.sensitivity_contexts } else { &mut entry.resistance_contexts };
        *bucket.entry(context.to_string()).or_insert(0) += 1;
    };

    for assertion in &evidence.harmonized_assertions {
        if let Some(t) = tumor_type {
            if assertion.disease.as_deref().map(|d| !tumor_matches(t, d)).unwrap_or(true) {
                continue;
            }
        }
        let context = assertion.disease.clone().unwrap_or_else(|| "unspecified".to_string());
        if assertion.is_sensitivity() {
            sensitivity_count += 1;
            *sensitivity_by_level.entry(assertion.evidence_level.clone()).or_insert(0) += 1;
            for drug in &assertion.drugs {
                record_drug_signal(drug, &context, true);
            }
        } else if assertion.is_resistance() {
            resistance_count += 1;
            *resistance_by_level.entry(assertion.evidence_level.clone()).or_insert(0) += 1;
            for drug in &assertion.drugs {
                record_drug_signal(drug, &context, false);
            }
        }
    }

    for assertion in &evidence.predictive_assertions {
        if !assertion.assertion_type.eq_ignore_ascii_case("predictive") {
            continue;
        }
        if let Some(t) = tumor_type {
            if !tumor_matches(t, &assertion.disease) {
                continue;
            }
        }
        let level = assertion.amp_tier.clone().unwrap_or_else(|| "UNKNOWN".to_string());
        if assertion.is_sensitivity() {
            sensitivity_count += 1;
            *sensitivity_by_level.entry(level).or_insert(0) += 1;
            for drug in &assertion.therapies {
                record_drug_signal(drug, &assertion.disease, true);
            }
        } else if assertion.is_resistance() {
            resistance_count += 1;
            *resistance_by_level.entry(level).or_insert(0) += 1;
            for drug in &assertion.therapies {
                record_drug_signal(drug, &assertion.disease, false);
            }
        }
    }

    for biomarker in &evidence.curated_biomarker_records {
        if let Some(t) = tumor_type {
            let disease = biomarker.tumor_type_full.as_deref().unwrap_or(&biomarker.tumor_type);
            if !tumor_matches(t, disease) {
                continue;
            }
        }
        let context = biomarker.tumor_type_full.clone().unwrap_or_else(|| biomarker.tumor_type.clone());
        if biomarker.is_sensitivity() {
            sensitivity_count += 1;
            *sensitivity_by_level.entry(biomarker.evidence_level.clone()).or_insert(0) += 1;
            record_drug_signal(&biomarker.drug, &context, true);
        } else if biomarker.is_resistance() {
            resistance_count += 1;
            *resistance_by_level.entry(biomarker.evidence_level.clone()).or_insert(0) += 1;
            record_drug_signal(&biomarker.drug, &context, false);
        }
    }

    let total = sensitivity_count + resistance_count;
    let dominant_signal = if total == 0 {
        DominantSignal::None
    } else if resistance_count == 0 {
        DominantSignal::SensitivityOnly
    } else if sensitivity_count == 0 {
        DominantSignal::ResistanceOnly
    } else {
        let sens_frac = sensitivity_count as f64 / total as f64;
        let res_frac = resistance_count as f64 / total as f64;
        if sens_frac >= 0.8 {
            DominantSignal::SensitivityDominant
        } else if res_frac >= 0.8 {
            DominantSignal::ResistanceDominant
        } else {
            DominantSignal::Mixed
        }
    };

    let mut conflicts = Vec::new();
    for signal in drug_signals.values() {
        if signal.sensitivity_contexts.is_empty() || signal.resistance_contexts.is_empty() {
            continue;
        }
        let (sens_context, sens_count) =
            signal.sensitivity_contexts.iter().max_by_key(|(_, c)| **c).map(|(k, v)| (k.clone(), *v)).unwrap();
        let (res_context, res_count) =
            signal.resistance_contexts.iter().max_by_key(|(_, c)| **c).map(|(k, v)| (k.clone(), *v)).unwrap();
        conflicts.push(ConflictRecord {
            drug: signal.display_name.clone(),
            sensitivity_context: sens_context,
            sensitivity_count: sens_count,
            resistance_context: res_context,
            resistance_count: res_count,
        });
    }

    EvidenceStats {
        sensitivity_count,
        resistance_count,
        sensitivity_by_level,
        resistance_by_level,
        dominant_signal,
        conflicts,
    }
}
