//! Per-drug rollup across the harmonized-KB and curated-assertion sources:
//! for each drug named in either source, tallies sensitivity vs. resistance
//! counts/levels and derives a single net signal (`spec.md` §4.5.6).

use std::collections::BTreeMap;

use crate::entities::evidence::Evidence;
use crate::tumor_ontology::tumor_matches;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetSignal {
    Sensitive,
    Resistant,
    Mixed,
}

impl NetSignal {
    fn as_str(self) -> &'static str {
        match self {
            NetSignal::Sensitive => "SENSITIVE",
            NetSignal::Resistant => "RESISTANT",
            NetSignal::Mixed => "MIXED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrugAggregate {
    pub drug: String,
    pub sensitivity_count: usize,
    pub resistance_count: usize,
    pub sensitivity_levels: Vec<String>,
    pub resistance_levels: Vec<String>,
    pub diseases: Vec<String>,
    pub best_level: String,
    pub net_signal: NetSignal,
}

#[derive(Default)]
struct Tally {
    sensitivity_count: usize,
    resistance_count: usize,
    sensitivity_levels: Vec<String>,
    resistance_levels: Vec<String>,
    diseases: Vec<String>,
}

fn level_priority(level: &str) -> u8 {
    match level.to_ascii_uppercase().as_str() {
        "A" | "TIER_I" => 0,
        "B" | "TIER_II" => 1,
        "C" | "TIER_III" => 2,
        "D" | "TIER_IV" => 3,
        _ => 4,
    }
}

fn best_of(levels: &[String]) -> String {
    levels.iter().min_by_key(|l| level_priority(l)).cloned().unwrap_or_else(|| "N/A".to_string())
}

/// Groups predictive evidence by drug name and computes each drug's net
/// sensitivity/resistance signal, sorted by best evidence level then by
/// total supporting-entry count (descending).
pub fn aggregate_evidence_by_drug(evidence: &Evidence, tumor_type: Option<&str>) -> Vec<DrugAggregate> {
    let tumor_type = tumor_type.filter(|t| !t.trim().is_empty());
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();

    for assertion in &evidence.harmonized_assertions {
        if let Some(t) = tumor_type {
            if assertion.disease.as_deref().map(|d| !tumor_matches(t, d)).unwrap_or(true) {
                continue;
            }
        }
        let disease = assertion.disease.clone().unwrap_or_default();
        for drug in &assertion.drugs {
            let tally = tallies.entry(drug.clone()).or_default();
            if assertion.is_sensitivity() {
                tally.sensitivity_count += 1;
                tally.sensitivity_levels.push(assertion.evidence_level.clone());
            } else if assertion.is_resistance() {
                tally.resistance_count += 1;
                tally.resistance_levels.push(assertion.evidence_level.clone());
            }
            if !disease.is_empty() && !tally.diseases.contains(&disease) {
                tally.diseases.push(disease.clone());
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
        for drug in &assertion.therapies {
            let tally = tallies.entry(drug.clone()).or_default();
            if assertion.is_sensitivity() {
                tally.sensitivity_count += 1;
                tally.sensitivity_levels.push(level.clone());
            } else if assertion.is_resistance() {
                tally.resistance_count += 1;
                tally.resistance_levels.push(level.clone());
            }
            if !assertion.disease.is_empty() && !tally.diseases.contains(&assertion.disease) {
                tally.diseases.push(assertion.disease.clone());
            }
        }
    }

    let mut aggregates: Vec<DrugAggregate> = tallies
        .into_iter()
        .map(|(drug, tally)| {
            let net_signal = if tally.sensitivity_count > 0 && tally.resistance_count == 0 {
                NetSignal::Sensitive
            } else if tally.sensitivity_count > 0 && tally.sensitivity_count >= tally.resistance_count * 3 {
                NetSignal::Sensitive
            } else if tally.resistance_count > 0 && tally.sensitivity_count == 0 {
                NetSignal::Resistant
            } else if tally.resistance_count > 0 && tally.resistance_count >= tally.sensitivity_count * 3 {
                NetSignal::Resistant
            } else {
                NetSignal::Mixed
            };

            let mut all_levels = tally.sensitivity_levels.clone();
            all_levels.extend(tally.resistance_levels.clone());
            let best_level = best_of(&all_levels);

            DrugAggregate {
                drug,
                sensitivity_count: tally.sensitivity_count,
                resistance_count: tally.resistance_count,
                sensitivity_levels: tally.sensitivity_levels,
                resistance_levels: tally.resistance_levels,
                diseases: tally.diseases,
                best_level,
                net_signal,
            }
        })
        .collect();

    aggregates.sort_by(|a, b| {
        level_priority(&a.best_level)
            .cmp(&level_priority(&b.best_level))
            .then((b.sensitivity_count + b.resistance_count).cmp(&(a.sensitivity_count + a.resistance_count)))
    });

    aggregates
}

/// Renders the top 10 drug aggregates as a report block (`spec.md` §4.6).
pub fn format_drug_aggregation_summary(evidence: &Evidence, tumor_type: Option<&str>) -> String {
    let aggregates = aggregate_evidence_by_drug(evidence, tumor_type);
    if aggregates.is_empty() {
        return String::new();
    }

    let mut lines = vec![String::new(), "DRUG-LEVEL EVIDENCE AGGREGATION:".to_string()];
    for (idx, agg) in aggregates.iter().take(10).enumerate() {
        let sens_str = if agg.sensitivity_count > 0 {
            format!("{} sensitivity", agg.sensitivity_count)
        } else {
            "0 sensitivity".to_string()
        };
        let res_str = if agg.resistance_count > 0 {
            format!("{} resistance", agg.resistance_count)
        } else {
            "0 resistance".to_string()
        };
        lines.push(format!(
            "  {}. {}: {sens_str}, {res_str} \u{2192} {} [Level {}]",
            idx + 1,
            agg.drug,
            agg.net_signal.as_str(),
            agg.best_level
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::evidence::{Evidence, HarmonizedAssertion};

    fn assertion(drug: &str, disease: &str, level: &str, response_type: &str) -> HarmonizedAssertion {
        HarmonizedAssertion {
            gene: "BRAF".into(),
            variant: "V600E".into(),
            disease: Some(disease.into()),
            drugs: vec![drug.into()],
            evidence_level: level.into(),
            response_type: response_type.into(),
            source: "harmonized-kb".into(),
            description: None,
        }
    }

    #[test]
    fn pure_sensitivity_drug_nets_sensitive() {
        let mut evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        evidence.harmonized_assertions.push(assertion("vemurafenib", "Melanoma", "A", "Sensitivity"));
        let aggregates = aggregate_evidence_by_drug(&evidence, Some("Melanoma"));
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].net_signal, NetSignal::Sensitive);
    }

    #[test]
    fn mixed_signals_net_mixed_when_neither_dominates() {
        let mut evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        evidence.harmonized_assertions.push(assertion("drugx", "Melanoma", "B", "Sensitivity"));
        evidence.harmonized_assertions.push(assertion("drugx", "Melanoma", "B", "Resistant"));
        let aggregates = aggregate_evidence_by_drug(&evidence, Some("Melanoma"));
        assert_eq!(aggregates[0].net_signal, NetSignal::Mixed);
    }

    #[test]
    fn sensitivity_at_three_to_one_ratio_still_nets_sensitive() {
        let mut evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        for _ in 0..3 {
            evidence.harmonized_assertions.push(assertion("drugx", "Melanoma", "B", "Sensitivity"));
        }
        evidence.harmonized_assertions.push(assertion("drugx", "Melanoma", "B", "Resistant"));
        let aggregates = aggregate_evidence_by_drug(&evidence, Some("Melanoma"));
        assert_eq!(aggregates[0].net_signal, NetSignal::Sensitive);
    }

    #[test]
    fn format_summary_lists_drugs_with_arrow_notation() {
        let mut evidence = Evidence::empty("BRAF:V600E", "BRAF", "V600E");
        evidence.harmonized_assertions.push(assertion("vemurafenib", "Melanoma", "A", "Sensitivity"));
        let rendered = format_drug_aggregation_summary(&evidence, Some("Melanoma"));
        assert!(rendered.contains("vemurafenib"));
        assert!(rendered.contains("SENSITIVE"));
    }
}
