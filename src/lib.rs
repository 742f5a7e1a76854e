// ==============================================================================
// lib.rs - GWAS Toolkit Library
// ==============================================================================
// Description: Library interface for GWAS significance determination modules
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

pub mod models;
pub mod store;
pub mod parsers;
pub mod significance;
pub mod normalize;
pub mod validator;
pub mod plot_data;
pub mod processor;
pub mod output;
