// ==============================================================================
// processor.rs - Analysis Session Pipeline
// ==============================================================================
// Description: Runs one GWAS significance analysis: validate input, ingest into
//              the marker store, apply the correction, write outputs
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::{AssociationRecord, RankedDecision, SignificanceMethod};
use crate::output::{self, AnalysisReport, ReportMetadata};
use crate::parsers::ingest_path;
use crate::plot_data::PlotData;
use crate::significance::{self, SignificanceError};
use crate::store::MarkerStore;
use crate::validator::InputValidator;

/// Resolved settings for one analysis session
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    pub delimiter: u8,
    pub method: SignificanceMethod,
    /// File-backed store location, recorded in the report
    pub database: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub table_path: Option<PathBuf>,
    pub plot_data_path: Option<PathBuf>,
}

impl AnalysisConfig {
    pub fn new(input: impl Into<PathBuf>, delimiter: u8, method: SignificanceMethod) -> Self {
        Self {
            input: input.into(),
            delimiter,
            method,
            database: None,
            report_path: None,
            table_path: None,
            plot_data_path: None,
        }
    }
}

struct Correction {
    alpha_level: Option<f64>,
    decisions: Vec<RankedDecision>,
    significant_markers: Vec<AssociationRecord>,
}

pub struct GwasProcessor {
    config: AnalysisConfig,
    validator: InputValidator,
}

impl GwasProcessor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            validator: InputValidator::new(),
        }
    }

    /// Main processing pipeline
    ///
    /// An analysis that finds no significant markers still succeeds: the
    /// report carries an empty marker list. Every other engine error aborts.
    pub fn process(&self, store: &mut MarkerStore) -> Result<AnalysisReport> {
        info!("Starting GWAS significance analysis: {:?}", self.config.input);
        info!("Correction: {}", self.config.method);

        // 1. Validate input file
        let validated = self
            .validator
            .validate(&self.config.input)
            .context("Input validation failed")?;

        // 2. Ingest into the marker store
        let committed = ingest_path(&self.config.input, self.config.delimiter, store)
            .with_context(|| format!("Failed to ingest {:?}", self.config.input))?;
        let total_markers = store.len()?;
        info!("Marker store holds {} records ({} new)", total_markers, committed);

        // 3. Apply the correction
        let Correction {
            alpha_level,
            decisions,
            significant_markers,
        } = self.apply_correction(store)?;

        let mut metadata = ReportMetadata::new(&self.config.input, self.config.delimiter);
        metadata.input_sha256 = Some(validated.hash_sha256);
        metadata.database = self
            .config
            .database
            .as_ref()
            .map(|p| p.display().to_string());

        let report = AnalysisReport {
            metadata,
            records_committed: committed,
            total_markers,
            method: self.config.method,
            alpha_level,
            decisions,
            significant_markers,
        };

        // 4. Write outputs
        self.write_outputs(store, &report)?;

        info!(
            "Analysis complete: {} of {} markers significant",
            report.significant_markers.len(),
            report.total_markers
        );
        Ok(report)
    }

    /// Alpha level or ranked decisions, plus the significant records in
    /// insertion order, from a single read of the store
    fn apply_correction(&self, store: &MarkerStore) -> Result<Correction> {
        let records = store.all()?;
        if records.is_empty() {
            return Err(SignificanceError::DataNotFound).context("Nothing to analyze");
        }

        let (alpha_level, decisions, significant_markers) = match self.config.method {
            SignificanceMethod::Bonferroni { divisor } => {
                let alpha = significance::alpha_level(store, divisor)
                    .context("Failed to compute alpha level")?;
                info!("Bonferroni alpha level: {:e}", alpha);

                let significant: Vec<_> = records.into_iter().filter(|r| r.p_value < alpha).collect();
                (Some(alpha), Vec::new(), significant)
            }
            SignificanceMethod::BenjaminiHochberg { q, rule } => {
                let pairs: Vec<(String, f64)> = records
                    .iter()
                    .map(|r| (r.marker_id.clone(), r.p_value))
                    .collect();
                let decisions = significance::ranked_decisions(&pairs, q, rule)
                    .context("Benjamini-Hochberg procedure failed")?;
                debug!("Ranked {} markers", decisions.len());

                let rejected: HashSet<&str> = decisions
                    .iter()
                    .filter(|d| d.rejected)
                    .map(|d| d.marker_id.as_str())
                    .collect();
                let significant = records
                    .into_iter()
                    .filter(|r| rejected.contains(r.marker_id.as_str()))
                    .collect();
                (None, decisions, significant)
            }
        };

        if significant_markers.is_empty() {
            warn!("No markers passed the {} threshold", self.config.method);
        }

        Ok(Correction {
            alpha_level,
            decisions,
            significant_markers,
        })
    }

    fn write_outputs(&self, store: &MarkerStore, report: &AnalysisReport) -> Result<()> {
        if let Some(path) = &self.config.report_path {
            output::write_json(report, path)?;
        }

        if let Some(path) = &self.config.table_path {
            output::write_significant_table(&report.significant_markers, path, self.config.delimiter)?;
        }

        if let Some(path) = &self.config.plot_data_path {
            self.write_plot_data(store, report.alpha_level, path)?;
        }

        Ok(())
    }

    fn write_plot_data(&self, store: &MarkerStore, alpha: Option<f64>, path: &Path) -> Result<()> {
        let plots = PlotData::from_store(store, alpha).context("Failed to build plot data")?;
        output::write_json(&plots, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BhRule, DivisorStrategy};
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn input_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const GWAS: &str = "\
MarkerID,Chromosome,Location,PValue
Marker1,1,100,0.001
Marker2,2,200,0.005
Marker3,3,300,0.0001
Marker4,3,400,0.6
";

    #[test]
    fn test_process_benjamini_hochberg() {
        let file = input_file(GWAS);
        let config = AnalysisConfig::new(
            file.path(),
            b',',
            SignificanceMethod::BenjaminiHochberg {
                q: 0.05,
                rule: BhRule::PerRank,
            },
        );
        let mut store = MarkerStore::in_memory().unwrap();

        let report = GwasProcessor::new(config).process(&mut store).unwrap();

        assert_eq!(report.records_committed, 4);
        assert_eq!(report.total_markers, 4);
        assert_eq!(report.decisions.len(), 4);
        assert!(report.alpha_level.is_none());
        assert_eq!(report.significant_ids(), vec!["Marker1", "Marker2", "Marker3"]);
        assert!(report.metadata.input_sha256.is_some());
    }

    #[test]
    fn test_process_bonferroni_writes_outputs() {
        let dir = tempdir().unwrap();
        let file = input_file(GWAS);
        let mut config = AnalysisConfig::new(
            file.path(),
            b',',
            SignificanceMethod::Bonferroni {
                divisor: DivisorStrategy::FixedN(10),
            },
        );
        config.report_path = Some(dir.path().join("report.json"));
        config.table_path = Some(dir.path().join("significant.csv"));
        config.plot_data_path = Some(dir.path().join("plots.json"));

        let mut store = MarkerStore::in_memory().unwrap();
        let report = GwasProcessor::new(config).process(&mut store).unwrap();

        // alpha = 0.005; Marker2 (p = 0.005) is not strictly below
        assert_eq!(report.significant_ids(), vec!["Marker1", "Marker3"]);
        assert!(dir.path().join("report.json").exists());
        assert!(dir.path().join("significant.csv").exists());

        let plots: PlotData = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("plots.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(plots.qq.len(), 4);
        assert_eq!(plots.manhattan.chromosomes.len(), 3);
        assert!(plots.manhattan.significance_line.is_some());
    }

    #[test]
    fn test_process_agrees_with_significant_results() {
        let methods = [
            SignificanceMethod::Bonferroni {
                divisor: DivisorStrategy::ObservedBelowThreshold,
            },
            SignificanceMethod::BenjaminiHochberg {
                q: 0.05,
                rule: BhRule::PerRank,
            },
            SignificanceMethod::BenjaminiHochberg {
                q: 0.05,
                rule: BhRule::StepUp,
            },
        ];
        let file = input_file(
            "MarkerID,Chromosome,Location,PValue\n\
             rs5,1,100,0.04\n\
             rs1,1,200,0.001\n\
             rs9,2,300,0.03\n\
             rs2,2,400,0.5\n\
             rs7,3,500,0.0005\n",
        );

        for method in methods {
            let mut store = MarkerStore::in_memory().unwrap();
            let report = GwasProcessor::new(AnalysisConfig::new(file.path(), b',', method))
                .process(&mut store)
                .unwrap();

            let expected = significance::significant_results(&store, &method).unwrap();
            assert_eq!(report.significant_ids(), expected, "{}", method);
        }
    }

    #[test]
    fn test_process_without_significant_markers() {
        let file = input_file("MarkerID,Chromosome,Location,PValue\nrs1,1,100,0.4\nrs2,1,200,0.9\n");
        let config = AnalysisConfig::new(
            file.path(),
            b',',
            SignificanceMethod::BenjaminiHochberg {
                q: 0.05,
                rule: BhRule::StepUp,
            },
        );
        let mut store = MarkerStore::in_memory().unwrap();

        let report = GwasProcessor::new(config).process(&mut store).unwrap();
        assert!(report.significant_markers.is_empty());
        assert_eq!(report.decisions.len(), 2);
    }

    #[test]
    fn test_process_observed_divisor_with_nothing_below_threshold() {
        let file = input_file("MarkerID,Chromosome,Location,PValue\nrs1,1,100,0.4\n");
        let config = AnalysisConfig::new(
            file.path(),
            b',',
            SignificanceMethod::Bonferroni {
                divisor: DivisorStrategy::ObservedBelowThreshold,
            },
        );
        let mut store = MarkerStore::in_memory().unwrap();

        let err = GwasProcessor::new(config).process(&mut store).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SignificanceError>(),
            Some(SignificanceError::Division(_))
        ));
    }

    #[test]
    fn test_process_malformed_input_keeps_store_empty() {
        let file = input_file("MarkerID,Chromosome,Location,PValue\nrs1,1,100,0.01\nrs2,1,200\n");
        let config = AnalysisConfig::new(
            file.path(),
            b',',
            SignificanceMethod::Bonferroni {
                divisor: DivisorStrategy::FixedN(2),
            },
        );
        let mut store = MarkerStore::in_memory().unwrap();

        assert!(GwasProcessor::new(config).process(&mut store).is_err());
        assert!(store.is_empty().unwrap());
    }
}
