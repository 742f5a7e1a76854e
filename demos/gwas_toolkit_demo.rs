// ==============================================================================
// gwas_toolkit_demo.rs - Example of GWAS Toolkit Usage
// ==============================================================================
// Description: Demonstrates ingestion, Bonferroni and Benjamini-Hochberg
//              corrections, and significant-marker extraction
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

use gwas_toolkit::models::{BhRule, DivisorStrategy, SignificanceMethod};
use gwas_toolkit::parsers::ingest_path;
use gwas_toolkit::plot_data::PlotData;
use gwas_toolkit::significance::{alpha_level, ranked_decisions, significant_results};
use gwas_toolkit::store::MarkerStore;
use std::io::Write;
use tempfile::NamedTempFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== GWAS Toolkit Example ===\n");

    // Create a temporary CSV file with sample association results
    let mut temp_file = NamedTempFile::with_suffix(".csv")?;
    writeln!(temp_file, "MarkerID,Chromosome,Location,PValue")?;
    writeln!(temp_file, "rs548049170,1,69869,0.0012")?;
    writeln!(temp_file, "rs13328684,1,74792,0.53")?;
    writeln!(temp_file, "rs9283150,2,565508,0.00004")?;
    writeln!(temp_file, "rs116587930,2,727841,0.021")?;
    writeln!(temp_file, "rs3131972,3,752721,0.87")?;
    writeln!(temp_file, "rs12184325,3,754105,0.0009")?;
    writeln!(temp_file, "rs12567639,X,756268,0.31")?;
    temp_file.flush()?;

    // Parse the dataset into an in-memory store
    let mut store = MarkerStore::in_memory()?;
    let committed = ingest_path(temp_file.path(), b',', &mut store)?;
    println!("✓ Ingested {} records\n", committed);

    // Bonferroni alpha level, both divisor strategies
    let observed = alpha_level(&store, DivisorStrategy::ObservedBelowThreshold)?;
    let genome_wide = alpha_level(&store, DivisorStrategy::FixedN(1_000_000))?;
    println!("--- Alpha Levels ---");
    println!("Observed divisor:    {:e}", observed);
    println!("1,000,000 tests:     {:e}\n", genome_wide);

    // Benjamini-Hochberg ranking
    let pairs = store.marker_p_values()?;
    println!("--- Benjamini-Hochberg (q = 0.05) ---");
    println!("{:<5} {:<14} {:>10} {:>10} {:>9}", "Rank", "Marker", "P", "Critical", "Rejected");
    println!("{:-<52}", "");
    for decision in ranked_decisions(&pairs, 0.05, BhRule::PerRank)? {
        println!(
            "{:<5} {:<14} {:>10.2e} {:>10.2e} {:>9}",
            decision.rank,
            decision.marker_id,
            decision.p_value,
            decision.critical_value,
            decision.rejected
        );
    }
    println!();

    // Identifying significant markers
    for method in [
        SignificanceMethod::Bonferroni {
            divisor: DivisorStrategy::ObservedBelowThreshold,
        },
        SignificanceMethod::BenjaminiHochberg {
            q: 0.05,
            rule: BhRule::StepUp,
        },
    ] {
        match significant_results(&store, &method) {
            Ok(markers) => println!("{}: {}", method, markers.join(", ")),
            Err(e) => println!("{}: {}", method, e),
        }
    }
    println!();

    // Plot series for an external renderer
    let plots = PlotData::from_store(&store, Some(observed))?;
    println!("--- Manhattan Layout ---");
    for series in &plots.manhattan.chromosomes {
        println!(
            "chr{:<3} offset {:>10.0}  tick {:>10.0}  {} points",
            series.chromosome,
            series.offset,
            series.tick,
            series.points.len()
        );
    }
    println!("QQ points: {}", plots.qq.len());

    println!("\n=== Example Complete ===");
    Ok(())
}
