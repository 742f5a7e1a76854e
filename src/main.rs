// ==============================================================================
// main.rs - GWAS Toolkit Entry Point
// ==============================================================================
// Description: Command-line entry point for p-value normalization and GWAS
//              significance analysis
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gwas_toolkit::models::{BhRule, DivisorStrategy, SignificanceMethod};
use gwas_toolkit::normalize::normalize_path;
use gwas_toolkit::processor::{AnalysisConfig, GwasProcessor};
use gwas_toolkit::store::MarkerStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clamp p-values above 1 so the file can be ingested
    Normalize {
        /// Raw GWAS output
        #[arg(short, long)]
        input: PathBuf,

        /// Normalized copy to write
        #[arg(short, long)]
        output: PathBuf,

        /// Field delimiter (use '\t' or "tab" for TSV)
        #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
        delimiter: u8,
    },

    /// Ingest GWAS output and report significant markers
    #[command(group(
        ArgGroup::new("correction")
            .required(true)
            .args(["bonferroni", "fdr"]),
    ))]
    Analyze {
        /// GWAS output (.csv, .tsv, .txt, optionally .gz)
        #[arg(short, long)]
        input: PathBuf,

        /// Field delimiter (use '\t' or "tab" for TSV)
        #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
        delimiter: u8,

        /// SQLite file to persist the marker store (in-memory when omitted)
        #[arg(long, env = "GWAS_DATABASE")]
        database: Option<PathBuf>,

        /// Bonferroni correction; divisor is "observed" or a test count
        #[arg(long, value_parser = parse_divisor)]
        bonferroni: Option<DivisorStrategy>,

        /// Benjamini-Hochberg correction at this false discovery rate
        #[arg(long)]
        fdr: Option<f64>,

        /// Use the classical step-up rule for Benjamini-Hochberg
        #[arg(long, requires = "fdr")]
        step_up: bool,

        /// Write the full analysis report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write significant markers as a delimited table
        #[arg(long)]
        table: Option<PathBuf>,

        /// Write Manhattan and QQ plot series as JSON
        #[arg(long)]
        plot_data: Option<PathBuf>,
    },
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        _ => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c as u8),
                _ => Err(format!("delimiter must be a single ASCII character, got '{}'", s)),
            }
        }
    }
}

fn parse_divisor(s: &str) -> Result<DivisorStrategy, String> {
    s.parse::<DivisorStrategy>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gwas_toolkit={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("GWAS Toolkit starting...");

    match args.command {
        Command::Normalize {
            input,
            output,
            delimiter,
        } => {
            let clamped = normalize_path(&input, &output, delimiter)
                .with_context(|| format!("Failed to normalize {:?}", input))?;
            println!("Clamped {} p-values; wrote {}", clamped, output.display());
            Ok(())
        }
        Command::Analyze {
            input,
            delimiter,
            database,
            bonferroni,
            fdr,
            step_up,
            report,
            table,
            plot_data,
        } => {
            let method = match (bonferroni, fdr) {
                (Some(divisor), _) => SignificanceMethod::Bonferroni { divisor },
                (None, Some(q)) => SignificanceMethod::BenjaminiHochberg {
                    q,
                    rule: if step_up { BhRule::StepUp } else { BhRule::PerRank },
                },
                (None, None) => anyhow::bail!("Either --bonferroni or --fdr must be given"),
            };

            let mut store = match &database {
                Some(path) => MarkerStore::open(path)
                    .with_context(|| format!("Failed to open marker store {:?}", path))?,
                None => MarkerStore::in_memory().context("Failed to create marker store")?,
            };

            let mut config = AnalysisConfig::new(input, delimiter, method);
            config.database = database;
            config.report_path = report;
            config.table_path = table;
            config.plot_data_path = plot_data;

            let report = GwasProcessor::new(config).process(&mut store)?;

            println!("Method: {}", report.method);
            if let Some(alpha) = report.alpha_level {
                println!("Alpha level: {:e}", alpha);
            }
            println!(
                "Significant markers: {} of {}",
                report.significant_markers.len(),
                report.total_markers
            );
            for record in &report.significant_markers {
                println!(
                    "  {}\tchr{}:{}\tp={:e}",
                    record.marker_id, record.chromosome, record.location, record.p_value
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_analyze_requires_a_correction() {
        assert!(Args::try_parse_from(["gwas-toolkit", "analyze", "-i", "gwas.csv"]).is_err());
        assert!(Args::try_parse_from([
            "gwas-toolkit", "analyze", "-i", "gwas.csv", "--bonferroni", "observed", "--fdr", "0.05",
        ])
        .is_err());

        let args = Args::try_parse_from([
            "gwas-toolkit", "analyze", "-i", "gwas.csv", "--fdr", "0.1", "--step-up",
        ])
        .unwrap();
        match args.command {
            Command::Analyze { fdr, step_up, .. } => {
                assert_eq!(fdr, Some(0.1));
                assert!(step_up);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_bonferroni_divisor_argument() {
        let args = Args::try_parse_from([
            "gwas-toolkit", "analyze", "-i", "gwas.csv", "--bonferroni", "1000000",
        ])
        .unwrap();
        match args.command {
            Command::Analyze { bonferroni, .. } => {
                assert_eq!(bonferroni, Some(DivisorStrategy::FixedN(1_000_000)));
            }
            _ => panic!("expected analyze"),
        }

        assert!(Args::try_parse_from([
            "gwas-toolkit", "analyze", "-i", "gwas.csv", "--bonferroni", "many",
        ])
        .is_err());
    }
}
