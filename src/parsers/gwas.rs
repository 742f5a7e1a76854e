// ==============================================================================
// gwas.rs - GWAS Output Parser
// ==============================================================================
// Description: Parses delimited GWAS association results into validated
//              records and loads them into a marker store
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================
// Format: Delimited text with a header naming (in any order) the columns
//   MarkerID,Chromosome,Location,PValue
//   rs548049170,1,69869,0.0012
//   "rs13328684","1","74792","0.53"
// Extra columns are ignored. Values may be wrapped in double quotes. Files
// ending in .gz are decompressed on the fly.
// ==============================================================================

use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::AssociationRecord;
use crate::store::{MarkerStore, StoreError};

pub const MARKER_ID_COLUMN: &str = "MarkerID";
pub const CHROMOSOME_COLUMN: &str = "Chromosome";
pub const LOCATION_COLUMN: &str = "Location";
pub const P_VALUE_COLUMN: &str = "PValue";

/// Errors that can occur while ingesting GWAS output
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Header is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Malformed record at row {row}: field '{field}' {reason}")]
    MalformedRecord {
        row: usize,
        field: String,
        reason: String,
    },

    #[error("Failed to store records: {0}")]
    Store(#[from] StoreError),
}

/// Positions of the required columns within a header line
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    marker_id: usize,
    chromosome: usize,
    location: usize,
    p_value: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, IngestError> {
        let names: Vec<&str> = headers.iter().map(strip_quotes).collect();
        let find = |column: &str| {
            names
                .iter()
                .position(|name| *name == column)
                .ok_or_else(|| IngestError::MissingColumn(column.to_string()))
        };

        Ok(Self {
            marker_id: find(MARKER_ID_COLUMN)?,
            chromosome: find(CHROMOSOME_COLUMN)?,
            location: find(LOCATION_COLUMN)?,
            p_value: find(P_VALUE_COLUMN)?,
        })
    }
}

/// Parser for delimited GWAS output files
#[derive(Debug, Clone)]
pub struct GwasOutputParser {
    /// Field delimiter (e.g., b',' or b'\t')
    pub delimiter: u8,
}

impl Default for GwasOutputParser {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl GwasOutputParser {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Parse and validate every row of `source`
    ///
    /// # Returns
    /// * `Ok(Vec<AssociationRecord>)` - All rows, in file order (duplicates kept)
    /// * `Err(IngestError::MalformedRecord)` - First invalid row (1-based data row)
    ///
    /// Blank lines are skipped and do not count as rows. Nothing is returned
    /// unless the whole input is valid.
    pub fn parse<R: Read>(&self, source: R) -> Result<Vec<AssociationRecord>, IngestError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(source);

        let columns = ColumnIndex::from_headers(reader.headers()?)?;
        debug!("Column layout: {:?}", columns);

        let mut records = Vec::new();
        let mut row = 0;

        for result in reader.records() {
            let raw = result?;
            if raw.iter().all(|field| strip_quotes(field).is_empty()) {
                continue;
            }

            row += 1;
            records.push(Self::parse_row(&raw, &columns, row)?);
        }

        Ok(records)
    }

    /// Parse a file, decompressing it first if the name ends in `.gz`
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<Vec<AssociationRecord>, IngestError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let is_gzip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        let source: Box<dyn Read> = if is_gzip {
            debug!("Reading gzip-compressed GWAS output: {:?}", path);
            Box::new(MultiGzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        self.parse(source)
    }

    fn parse_row(
        raw: &StringRecord,
        columns: &ColumnIndex,
        row: usize,
    ) -> Result<AssociationRecord, IngestError> {
        let marker_id = required(raw, columns.marker_id, MARKER_ID_COLUMN, row)?;
        let chromosome = required(raw, columns.chromosome, CHROMOSOME_COLUMN, row)?;

        let location = numeric(raw, columns.location, LOCATION_COLUMN, row)?;
        if !location.is_finite() || location < 0.0 {
            return Err(malformed(
                row,
                LOCATION_COLUMN,
                format!("must be a non-negative coordinate, got {}", location),
            ));
        }

        let p_value = numeric(raw, columns.p_value, P_VALUE_COLUMN, row)?;
        if !(0.0..=1.0).contains(&p_value) {
            return Err(malformed(
                row,
                P_VALUE_COLUMN,
                format!("must be in [0, 1] (clamp upstream values first), got {}", p_value),
            ));
        }

        Ok(AssociationRecord {
            marker_id: marker_id.to_string(),
            chromosome: chromosome.to_string(),
            location,
            p_value,
        })
    }
}

/// Parse `source` and commit its records to `store` in one transaction
///
/// # Returns
/// * Number of records committed; duplicates of an earlier row or of a marker
///   already in the store are skipped and not counted
///
/// On error the store is left exactly as it was before the call.
pub fn ingest<R: Read>(
    source: R,
    delimiter: u8,
    store: &mut MarkerStore,
) -> Result<usize, IngestError> {
    let records = GwasOutputParser::new(delimiter).parse(source)?;
    commit(records, store)
}

/// Like [`ingest`], reading from a (possibly gzip-compressed) file
pub fn ingest_path(
    path: impl AsRef<Path>,
    delimiter: u8,
    store: &mut MarkerStore,
) -> Result<usize, IngestError> {
    info!("Ingesting GWAS output: {:?}", path.as_ref());
    let records = GwasOutputParser::new(delimiter).parse_path(path)?;
    commit(records, store)
}

fn commit(records: Vec<AssociationRecord>, store: &mut MarkerStore) -> Result<usize, IngestError> {
    let parsed = records.len();
    let committed = store.insert_all(&records)?;
    info!(
        "Parsed {} records, committed {} ({} skipped as duplicates)",
        parsed,
        committed,
        parsed - committed
    );
    Ok(committed)
}

fn strip_quotes(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

fn malformed(row: usize, field: &str, reason: String) -> IngestError {
    IngestError::MalformedRecord {
        row,
        field: field.to_string(),
        reason,
    }
}

fn required<'r>(
    raw: &'r StringRecord,
    idx: usize,
    field: &str,
    row: usize,
) -> Result<&'r str, IngestError> {
    match raw.get(idx).map(strip_quotes) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(malformed(row, field, "is missing".to_string())),
    }
}

fn numeric(raw: &StringRecord, idx: usize, field: &str, row: usize) -> Result<f64, IngestError> {
    let value = required(raw, idx, field, row)?;
    value
        .parse::<f64>()
        .map_err(|_| malformed(row, field, format!("is not numeric: '{}'", value)))
}
