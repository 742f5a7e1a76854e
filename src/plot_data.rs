// ==============================================================================
// plot_data.rs - Manhattan and QQ Plot Series
// ==============================================================================
// Description: Plot-ready series derived from a marker store. Rendering is left
//              to the caller; these functions only compute coordinates.
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================
// Manhattan layout:
//   Chromosomes are laid side by side. Each chromosome's x offset is the sum of
//   the maximum locations of the chromosomes before it; its tick sits at the
//   midpoint of its bin. y = -log10(p), with p = 0 plotted at 1e-300.
// QQ layout:
//   For n p-values sorted ascending, point i (1-based) is
//   (expected = -log10(i / n), observed = -log10(p_i)).
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::significance::SignificanceError;
use crate::store::{neg_log10, MarkerStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManhattanPoint {
    /// Location within the chromosome
    pub location: f64,
    /// Location shifted by the chromosome offset
    pub x: f64,
    pub neg_log10_p: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromosomeSeries {
    pub chromosome: String,
    pub offset: f64,
    /// x position of the chromosome label
    pub tick: f64,
    pub points: Vec<ManhattanPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManhattanData {
    pub chromosomes: Vec<ChromosomeSeries>,
    /// -log10(alpha) when an alpha level was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance_line: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QqPoint {
    pub expected: f64,
    pub observed: f64,
}

/// Everything a renderer needs for both plot types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub manhattan: ManhattanData,
    pub qq: Vec<QqPoint>,
}

impl PlotData {
    pub fn from_store(store: &MarkerStore, alpha: Option<f64>) -> Result<Self, SignificanceError> {
        Ok(Self {
            manhattan: manhattan(store, alpha)?,
            qq: qq(&store.p_values()?)?,
        })
    }
}

/// Order chromosomes 1, 2, ..., 22 numerically, then X, Y, MT etc. lexically
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    let number = |c: &str| {
        c.trim_start_matches("chr")
            .trim_start_matches("Chr")
            .parse::<u64>()
            .ok()
    };

    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Manhattan plot series for every chromosome in the store
pub fn manhattan(store: &MarkerStore, alpha: Option<f64>) -> Result<ManhattanData, SignificanceError> {
    let mut by_chromosome: Vec<(String, Vec<(f64, f64)>)> =
        store.chromosome_points()?.into_iter().collect();
    if by_chromosome.is_empty() {
        return Err(SignificanceError::DataNotFound);
    }
    by_chromosome.sort_by(|a, b| compare_chromosomes(&a.0, &b.0));

    let mut offset = 0.0;
    let mut chromosomes = Vec::with_capacity(by_chromosome.len());

    for (chromosome, points) in by_chromosome {
        let max_location = points
            .iter()
            .map(|(location, _)| *location)
            .fold(0.0, f64::max);

        chromosomes.push(ChromosomeSeries {
            chromosome,
            offset,
            tick: offset + max_location / 2.0,
            points: points
                .into_iter()
                .map(|(location, neg_log10_p)| ManhattanPoint {
                    location,
                    x: location + offset,
                    neg_log10_p,
                })
                .collect(),
        });

        offset += max_location;
    }

    Ok(ManhattanData {
        chromosomes,
        significance_line: alpha.map(neg_log10),
    })
}

/// QQ plot points (expected vs observed -log10 p)
pub fn qq(p_values: &[f64]) -> Result<Vec<QqPoint>, SignificanceError> {
    if p_values.is_empty() {
        return Err(SignificanceError::DataNotFound);
    }

    let mut sorted = p_values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    Ok(sorted
        .into_iter()
        .enumerate()
        .map(|(idx, p)| QqPoint {
            expected: -((idx + 1) as f64 / n).log10(),
            observed: neg_log10(p),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssociationRecord;

    fn store_with(records: &[(&str, &str, f64, f64)]) -> MarkerStore {
        let mut store = MarkerStore::in_memory().unwrap();
        let records: Vec<AssociationRecord> = records
            .iter()
            .map(|(id, chr, loc, p)| AssociationRecord::new(*id, *chr, *loc, *p))
            .collect();
        store.insert_all(&records).unwrap();
        store
    }

    #[test]
    fn test_compare_chromosomes() {
        let mut chromosomes = vec!["X", "10", "2", "MT", "1", "chr3", "Y"];
        chromosomes.sort_by(|a, b| compare_chromosomes(a, b));
        assert_eq!(chromosomes, vec!["1", "2", "chr3", "10", "MT", "X", "Y"]);
    }

    #[test]
    fn test_manhattan_offsets_and_ticks() {
        let store = store_with(&[
            ("rs1", "2", 50.0, 0.1),
            ("rs2", "1", 100.0, 0.01),
            ("rs3", "1", 300.0, 0.001),
            ("rs4", "2", 200.0, 1.0),
        ]);

        let data = manhattan(&store, Some(0.05)).unwrap();
        assert_eq!(data.chromosomes.len(), 2);

        let chr1 = &data.chromosomes[0];
        assert_eq!(chr1.chromosome, "1");
        assert_eq!(chr1.offset, 0.0);
        assert_eq!(chr1.tick, 150.0);
        assert_eq!(chr1.points[1].x, 300.0);
        assert!((chr1.points[1].neg_log10_p - 3.0).abs() < 1e-12);

        let chr2 = &data.chromosomes[1];
        assert_eq!(chr2.offset, 300.0);
        assert_eq!(chr2.tick, 400.0);
        assert_eq!(chr2.points[0].x, 350.0);

        let line = data.significance_line.unwrap();
        assert!((line - 1.30103).abs() < 1e-5);
    }

    #[test]
    fn test_manhattan_empty_store() {
        let store = MarkerStore::in_memory().unwrap();
        assert!(matches!(
            manhattan(&store, None),
            Err(SignificanceError::DataNotFound)
        ));
    }

    #[test]
    fn test_qq_points() {
        let points = qq(&[0.1, 0.001, 1.0, 0.01]).unwrap();

        assert_eq!(points.len(), 4);
        // Smallest p pairs with expected -log10(1/4)
        assert!((points[0].expected - 0.25f64.log10().abs()).abs() < 1e-12);
        assert!((points[0].observed - 3.0).abs() < 1e-12);
        assert_eq!(points[3].expected, 0.0);
        assert_eq!(points[3].observed, 0.0);

        // Observed values decrease as p increases
        assert!(points.windows(2).all(|w| w[0].observed >= w[1].observed));
    }

    #[test]
    fn test_qq_empty() {
        assert!(matches!(qq(&[]), Err(SignificanceError::DataNotFound)));
    }

    #[test]
    fn test_plot_data_from_store() {
        let store = store_with(&[("rs1", "1", 10.0, 0.5), ("rs2", "X", 20.0, 0.0)]);
        let plots = PlotData::from_store(&store, None).unwrap();

        assert_eq!(plots.qq.len(), 2);
        assert!((plots.qq[0].observed - 300.0).abs() < 1e-9);
        assert_eq!(plots.manhattan.chromosomes[1].chromosome, "X");
        assert!(plots.manhattan.significance_line.is_none());
    }
}
