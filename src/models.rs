// ==============================================================================
// models.rs - GWAS Data Models
// ==============================================================================
// Description: Association records, significance decisions and correction
//              parameters shared by the ingestor, store and engine
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::significance::SignificanceError;

/// Nominal significance level before multiple-testing correction
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// One row of GWAS output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRecord {
    /// Marker identifier (e.g., "rs12345"), unique within a store
    #[serde(rename = "MarkerID")]
    pub marker_id: String,

    /// Chromosome label ("1"-"22", "X", ...), only used for grouping
    #[serde(rename = "Chromosome")]
    pub chromosome: String,

    /// Genomic coordinate (non-negative)
    #[serde(rename = "Location")]
    pub location: f64,

    /// Association p-value in [0, 1]
    #[serde(rename = "PValue")]
    pub p_value: f64,
}

impl AssociationRecord {
    pub fn new(
        marker_id: impl Into<String>,
        chromosome: impl Into<String>,
        location: f64,
        p_value: f64,
    ) -> Self {
        Self {
            marker_id: marker_id.into(),
            chromosome: chromosome.into(),
            location,
            p_value,
        }
    }
}

/// Outcome of the Benjamini-Hochberg procedure for one marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceDecision {
    pub marker_id: String,
    pub rejected_null: bool,
}

/// A Benjamini-Hochberg decision together with the ranking that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDecision {
    pub marker_id: String,
    pub p_value: f64,
    /// 1-based rank after sorting by (p_value, marker_id)
    pub rank: usize,
    /// q * rank / N
    pub critical_value: f64,
    pub rejected: bool,
}

impl From<&RankedDecision> for SignificanceDecision {
    fn from(decision: &RankedDecision) -> Self {
        Self {
            marker_id: decision.marker_id.clone(),
            rejected_null: decision.rejected,
        }
    }
}

/// How the Bonferroni divisor is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisorStrategy {
    /// Externally supplied number of tests
    FixedN(u64),
    /// Number of stored records with p_value < 0.05
    ObservedBelowThreshold,
}

impl FromStr for DivisorStrategy {
    type Err = SignificanceError;

    /// Accepts "observed" or a non-negative integer test count
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("observed") {
            return Ok(DivisorStrategy::ObservedBelowThreshold);
        }
        s.parse::<u64>()
            .map(DivisorStrategy::FixedN)
            .map_err(|_| {
                SignificanceError::InvalidParameter(format!(
                    "divisor must be 'observed' or a test count, got '{}'",
                    s
                ))
            })
    }
}

impl fmt::Display for DivisorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivisorStrategy::FixedN(n) => write!(f, "fixed_n({})", n),
            DivisorStrategy::ObservedBelowThreshold => write!(f, "observed_below_threshold"),
        }
    }
}

/// Comparison rule used once p-values are ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BhRule {
    /// Each rank is compared against its own critical value
    #[default]
    PerRank,
    /// Classical step-up: reject every rank up to the largest passing one
    StepUp,
}

/// Multiple-testing correction applied by `significant_results`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SignificanceMethod {
    Bonferroni { divisor: DivisorStrategy },
    BenjaminiHochberg { q: f64, rule: BhRule },
}

impl fmt::Display for SignificanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignificanceMethod::Bonferroni { divisor } => {
                write!(f, "Bonferroni (divisor: {})", divisor)
            }
            SignificanceMethod::BenjaminiHochberg { q, rule } => {
                write!(f, "Benjamini-Hochberg (q = {}, rule: {:?})", q, rule)
            }
        }
    }
}
