// ==============================================================================
// output.rs - Analysis Report Output
// ==============================================================================
// Description: Serializes analysis results (JSON report, significant-marker
//              table, plot data) for downstream tools and renderers
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::models::{AssociationRecord, RankedDecision, SignificanceMethod};

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub run_id: Uuid,
    pub generated_at: String,
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_sha256: Option<String>,
    pub delimiter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl ReportMetadata {
    pub fn new(input_file: &Path, delimiter: u8) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            input_file: input_file.display().to_string(),
            input_sha256: None,
            delimiter: (delimiter as char).to_string(),
            database: None,
        }
    }
}

/// Complete result of one analysis session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,

    /// Records committed to the store by this run
    pub records_committed: usize,

    /// Records in the store when the engine ran
    pub total_markers: usize,

    pub method: SignificanceMethod,

    /// Bonferroni-corrected threshold (Bonferroni runs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_level: Option<f64>,

    /// Ranked Benjamini-Hochberg decisions (Benjamini-Hochberg runs only)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub decisions: Vec<RankedDecision>,

    /// Significant markers in insertion order
    pub significant_markers: Vec<AssociationRecord>,
}

impl AnalysisReport {
    pub fn significant_ids(&self) -> Vec<&str> {
        self.significant_markers
            .iter()
            .map(|r| r.marker_id.as_str())
            .collect()
    }
}

/// Write any serializable value as pretty-printed JSON
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    info!("Generating JSON output: {:?}", path);

    let file = File::create(path).context("Failed to create JSON output file")?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value).context("Failed to write JSON output")?;

    Ok(())
}

/// Write records with the MarkerID/Chromosome/Location/PValue header
///
/// The table can be fed straight back into the ingestor.
pub fn write_significant_table(
    records: &[AssociationRecord],
    path: &Path,
    delimiter: u8,
) -> Result<()> {
    info!("Generating significant-marker table: {:?}", path);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .context("Failed to create table output file")?;

    for record in records {
        writer
            .serialize(record)
            .context("Failed to write significant marker")?;
    }
    writer.flush().context("Failed to flush table output")?;

    info!("Table output complete: {} markers", records.len());
    Ok(())
}
