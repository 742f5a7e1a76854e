// ==============================================================================
// significance.rs - Significance Engine
// ==============================================================================
// Description: Multiple-testing correction over a marker store snapshot
//              (Bonferroni alpha level, Benjamini-Hochberg FDR, extraction of
//              significant markers)
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================
// Algorithm (Benjamini-Hochberg):
//   1. Sort (marker_id, p_value) ascending by p_value, ties by marker_id
//   2. Critical value for 1-based rank i of N: c_i = q * i / N
//   3. PerRank: rejected_i = p_i < c_i
//      StepUp:  k = max { i : p_i <= c_i }, rejected_i = i <= k
//
// PerRank is the default and matches the toolkit's documented behaviour. It
// can leave a marker unrejected while a higher-ranked marker is rejected, which
// the classical step-up rule never does. Use StepUp for publication-grade FDR
// control.
// ==============================================================================

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    BhRule, DivisorStrategy, RankedDecision, SignificanceMethod, SIGNIFICANCE_LEVEL,
};
use crate::store::{MarkerStore, StoreError};

/// Errors that can occur during significance computations
#[derive(Error, Debug)]
pub enum SignificanceError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No association records found in the marker store")]
    DataNotFound,

    #[error("No markers passed the {0} significance threshold")]
    NoSignificantResults(String),

    #[error("Alpha level divisor resolved to zero ({0})")]
    Division(DivisorStrategy),

    #[error("Marker store error: {0}")]
    Store(#[from] StoreError),
}

/// Bonferroni-corrected significance level: 0.05 / divisor
///
/// # Returns
/// * `Ok(alpha)` - A value in (0, 0.05]
/// * `Err(SignificanceError::Division)` - The divisor resolved to zero
///
/// # Example
/// ```
/// use gwas_toolkit::models::DivisorStrategy;
/// use gwas_toolkit::significance::alpha_level;
/// use gwas_toolkit::store::MarkerStore;
///
/// let store = MarkerStore::in_memory().unwrap();
/// let alpha = alpha_level(&store, DivisorStrategy::FixedN(1_000_000)).unwrap();
/// assert!((alpha - 5e-8).abs() < 1e-20);
/// ```
pub fn alpha_level(store: &MarkerStore, divisor: DivisorStrategy) -> Result<f64, SignificanceError> {
    let tests = match divisor {
        DivisorStrategy::FixedN(n) => n,
        DivisorStrategy::ObservedBelowThreshold => store.count_below(SIGNIFICANCE_LEVEL)? as u64,
    };

    if tests == 0 {
        return Err(SignificanceError::Division(divisor));
    }

    let alpha = SIGNIFICANCE_LEVEL / tests as f64;
    debug!("Alpha level {} from {} tests ({})", alpha, tests, divisor);
    Ok(alpha)
}

/// Rank markers and compare each against its Benjamini-Hochberg critical value
///
/// The returned decisions are in rank order. The result depends only on
/// `(pairs, q, rule)`, not on the order of `pairs`.
pub fn ranked_decisions(
    pairs: &[(String, f64)],
    q: f64,
    rule: BhRule,
) -> Result<Vec<RankedDecision>, SignificanceError> {
    validate_bh_input(pairs, q)?;

    let mut sorted: Vec<&(String, f64)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let n = sorted.len() as f64;
    let mut decisions: Vec<RankedDecision> = sorted
        .into_iter()
        .enumerate()
        .map(|(idx, (marker_id, p_value))| {
            let rank = idx + 1;
            let critical_value = q * rank as f64 / n;
            RankedDecision {
                marker_id: marker_id.clone(),
                p_value: *p_value,
                rank,
                critical_value,
                rejected: *p_value < critical_value,
            }
        })
        .collect();

    if rule == BhRule::StepUp {
        let cutoff = decisions
            .iter()
            .rev()
            .find(|d| d.p_value <= d.critical_value)
            .map(|d| d.rank)
            .unwrap_or(0);
        for decision in &mut decisions {
            decision.rejected = decision.rank <= cutoff;
        }
    }

    Ok(decisions)
}

/// Benjamini-Hochberg procedure with the per-rank comparison
///
/// # Arguments
/// * `pairs` - (marker_id, p_value) pairs; ids unique, p-values in [0, 1]
/// * `q` - Target false discovery rate, 0 < q < 1
///
/// # Returns
/// * Mapping marker_id -> whether the null hypothesis is rejected
pub fn benjamini_hochberg(
    pairs: &[(String, f64)],
    q: f64,
) -> Result<HashMap<String, bool>, SignificanceError> {
    benjamini_hochberg_with_rule(pairs, q, BhRule::PerRank)
}

/// Benjamini-Hochberg procedure with an explicit comparison rule
pub fn benjamini_hochberg_with_rule(
    pairs: &[(String, f64)],
    q: f64,
    rule: BhRule,
) -> Result<HashMap<String, bool>, SignificanceError> {
    Ok(ranked_decisions(pairs, q, rule)?
        .into_iter()
        .map(|d| (d.marker_id, d.rejected))
        .collect())
}

/// Markers that are significant under `method`, in insertion order
///
/// # Returns
/// * `Err(SignificanceError::DataNotFound)` - The store is empty
/// * `Err(SignificanceError::NoSignificantResults)` - Nothing passed
pub fn significant_results(
    store: &MarkerStore,
    method: &SignificanceMethod,
) -> Result<Vec<String>, SignificanceError> {
    let pairs = store.marker_p_values()?;
    if pairs.is_empty() {
        return Err(SignificanceError::DataNotFound);
    }

    let significant: Vec<String> = match *method {
        SignificanceMethod::Bonferroni { divisor } => {
            let alpha = alpha_level(store, divisor)?;
            pairs
                .into_iter()
                .filter(|(_, p)| *p < alpha)
                .map(|(marker_id, _)| marker_id)
                .collect()
        }
        SignificanceMethod::BenjaminiHochberg { q, rule } => {
            let rejected = benjamini_hochberg_with_rule(&pairs, q, rule)?;
            pairs
                .into_iter()
                .filter(|(marker_id, _)| rejected.get(marker_id).copied().unwrap_or(false))
                .map(|(marker_id, _)| marker_id)
                .collect()
        }
    };

    if significant.is_empty() {
        return Err(SignificanceError::NoSignificantResults(method.to_string()));
    }

    info!("{} significant markers ({})", significant.len(), method);
    Ok(significant)
}

fn validate_bh_input(pairs: &[(String, f64)], q: f64) -> Result<(), SignificanceError> {
    if !(q > 0.0 && q < 1.0) {
        return Err(SignificanceError::InvalidParameter(format!(
            "q must satisfy 0 < q < 1, got {}",
            q
        )));
    }

    let mut seen = HashSet::with_capacity(pairs.len());
    for (marker_id, p_value) in pairs {
        if !(0.0..=1.0).contains(p_value) {
            return Err(SignificanceError::InvalidParameter(format!(
                "p-value for {} must be in [0, 1], got {}",
                marker_id, p_value
            )));
        }
        if !seen.insert(marker_id.as_str()) {
            return Err(SignificanceError::InvalidParameter(format!(
                "duplicate marker id: {}",
                marker_id
            )));
        }
    }

    Ok(())
}
