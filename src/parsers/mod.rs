// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for GWAS association result files
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

pub mod gwas;

pub use gwas::{ingest, ingest_path, GwasOutputParser, IngestError};
