//! Drops a minority sensitivity/resistance signal from harmonized assertions
//! when the opposing side is both high-quality and numerically dominant
//! (`spec.md` §4.5.5). Operates only on `harmonized_assertions` — the other
//! sources don't carry a comparable evidence-level scale.

use crate::entities::evidence::HarmonizedAssertion;

const HIGH_QUALITY_LEVELS: &[&str] = &["A", "B"];
const LOW_QUALITY_LEVELS: &[&str] = &["C", "D"];
const MINORITY_CAP: usize = 2;

fn is_high_quality(level: &str) -> bool {
    HIGH_QUALITY_LEVELS.iter().any(|l| l.eq_ignore_ascii_case(level))
}

fn is_low_quality(level: &str) -> bool {
    LOW_QUALITY_LEVELS.iter().any(|l| l.eq_ignore_ascii_case(level))
}

/// Filters out a small, entirely low-quality minority signal (sensitivity or
/// resistance) when the opposite signal has at least one high-quality entry.
pub fn filter_low_quality_minority_signals(assertions: &[HarmonizedAssertion]) -> Vec<HarmonizedAssertion> {
    let sensitivity: Vec<&HarmonizedAssertion> = assertions.iter().filter(|a| a.is_sensitivity()).collect();
    let resistance: Vec<&HarmonizedAssertion> = assertions.iter().filter(|a| a.is_resistance()).collect();
    let neither: Vec<&HarmonizedAssertion> = assertions.iter().filter(|a| !a.is_sensitivity() && !a.is_resistance()).collect();

    let sensitivity_high_quality = sensitivity.iter().any(|a| is_high_quality(&a.evidence_level));
    let resistance_high_quality = resistance.iter().any(|a| is_high_quality(&a.evidence_level));

    let drop_resistance = sensitivity_high_quality
        && !resistance.is_empty()
        && resistance.len() <= MINORITY_CAP
        && resistance.iter().all(|a| is_low_quality(&a.evidence_level));

    let drop_sensitivity = resistance_high_quality
        && !sensitivity.is_empty()
        && sensitivity.len() <= MINORITY_CAP
        && sensitivity.iter().all(|a| is_low_quality(&a.evidence_level));

    let mut kept = Vec::with_capacity(assertions.len());
    if !drop_sensitivity {
        kept.extend(sensitivity.into_iter().cloned());
    }
    if !drop_resistance {
        kept.extend(resistance.into_iter().cloned());
    }
    kept.extend(neither.into_iter().cloned());
    kept
}
