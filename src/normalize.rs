// ==============================================================================
// normalize.rs - P-value Normalization
// ==============================================================================
// Description: Pre-ingestion step that caps upstream p-values at 1
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================
// Some association tools emit p-values slightly above 1 (numerical error in
// permutation or score tests). They are clamped once, here, before ingestion;
// the ingestor and the engine reject anything outside [0, 1].
// ==============================================================================

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::parsers::gwas::P_VALUE_COLUMN;

/// Errors that can occur while normalizing a results file
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Header is missing required column '{0}'")]
    MissingColumn(String),
}

/// Cap a p-value at 1. Idempotent.
pub fn clamp_p_value(p_value: f64) -> f64 {
    if p_value > 1.0 {
        1.0
    } else {
        p_value
    }
}

/// Copy delimited GWAS output from `source` to `sink`, clamping the PValue column
///
/// Every other column, and any PValue that does not parse as a number, is
/// copied unchanged; the ingestor reports unparseable values.
///
/// # Returns
/// * Number of p-values that were clamped
pub fn normalize<R: Read, W: Write>(
    source: R,
    sink: W,
    delimiter: u8,
) -> Result<usize, NormalizeError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(sink);

    let headers = reader.headers()?.clone();
    let p_column = headers
        .iter()
        .position(|h| h.trim().trim_matches('"') == P_VALUE_COLUMN)
        .ok_or_else(|| NormalizeError::MissingColumn(P_VALUE_COLUMN.to_string()))?;
    writer.write_record(&headers)?;

    let mut clamped = 0;
    for result in reader.records() {
        let record = result?;
        let mut out = StringRecord::with_capacity(record.as_slice().len(), record.len());

        for (idx, field) in record.iter().enumerate() {
            let over_one = idx == p_column
                && field
                    .trim()
                    .trim_matches('"')
                    .parse::<f64>()
                    .map(|p| clamp_p_value(p) < p)
                    .unwrap_or(false);

            if over_one {
                clamped += 1;
                out.push_field("1");
            } else {
                out.push_field(field);
            }
        }

        writer.write_record(&out)?;
    }

    writer.flush()?;
    Ok(clamped)
}

/// File-to-file variant of [`normalize`]
pub fn normalize_path(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    delimiter: u8,
) -> Result<usize, NormalizeError> {
    let source = File::open(input.as_ref())?;
    let sink = File::create(output.as_ref())?;

    let clamped = normalize(source, sink, delimiter)?;
    info!(
        "Normalized {:?} -> {:?}: {} p-values clamped to 1",
        input.as_ref(),
        output.as_ref(),
        clamped
    );
    Ok(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::GwasOutputParser;

    fn run(contents: &str, delimiter: u8) -> (String, usize) {
        let mut out = Vec::new();
        let clamped = normalize(contents.as_bytes(), &mut out, delimiter).unwrap();
        (String::from_utf8(out).unwrap(), clamped)
    }

    #[test]
    fn test_clamp_p_value() {
        assert_eq!(clamp_p_value(1.7), 1.0);
        assert_eq!(clamp_p_value(0.3), 0.3);
        assert_eq!(clamp_p_value(1.0), 1.0);
        assert_eq!(clamp_p_value(0.0), 0.0);
    }

    #[test]
    fn test_clamp_is_idempotent() {
        for p in [0.0, 1e-12, 0.5, 1.0, 1.0000001, 3.0, 1e9] {
            assert_eq!(clamp_p_value(clamp_p_value(p)), clamp_p_value(p));
        }
    }

    #[test]
    fn test_normalize_clamps_only_p_value_column() {
        let contents = "\
MarkerID,Chromosome,Location,PValue
rs1,1,2.5,1.3
rs2,1,200,0.04
rs3,2,300,1
";
        let (output, clamped) = run(contents, b',');

        assert_eq!(clamped, 1);
        assert_eq!(
            output,
            "MarkerID,Chromosome,Location,PValue\nrs1,1,2.5,1\nrs2,1,200,0.04\nrs3,2,300,1\n"
        );
    }

    #[test]
    fn test_normalize_twice_is_a_no_op() {
        let contents = "MarkerID\tChromosome\tLocation\tPValue\nrs1\t1\t100\t7.5\n";
        let (first, clamped_first) = run(contents, b'\t');
        let (second, clamped_second) = run(&first, b'\t');

        assert_eq!(clamped_first, 1);
        assert_eq!(clamped_second, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalized_output_is_ingestible() {
        let contents = "MarkerID,Chromosome,Location,PValue\nrs1,1,100,1.02\nrs2,1,200,0.01\n";
        assert!(GwasOutputParser::default().parse(contents.as_bytes()).is_err());

        let (output, _) = run(contents, b',');
        let records = GwasOutputParser::default().parse(output.as_bytes()).unwrap();
        assert_eq!(records[0].p_value, 1.0);
    }

    #[test]
    fn test_unparseable_values_pass_through() {
        let contents = "MarkerID,Chromosome,Location,PValue\nrs1,1,100,NA\n";
        let (output, clamped) = run(contents, b',');
        assert_eq!(clamped, 0);
        assert!(output.ends_with("rs1,1,100,NA\n"));
    }

    #[test]
    fn test_missing_p_value_column() {
        let contents = "MarkerID,Chromosome,Location\nrs1,1,100\n";
        let mut out = Vec::new();
        assert!(matches!(
            normalize(contents.as_bytes(), &mut out, b','),
            Err(NormalizeError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = normalize_path(dir.path().join("absent.csv"), dir.path().join("out.csv"), b',');
        assert!(matches!(result, Err(NormalizeError::Io(_))));
    }
}
