// ==============================================================================
// store.rs - Marker Store
// ==============================================================================
// Description: SQLite-backed store of association records for one analysis
//              session (insert-or-ignore on MarkerID, read-only accessors)
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================
// Schema:
//   gwas (MarkerID TEXT PRIMARY KEY, Chromosome TEXT, Location REAL, PValue REAL)
// Duplicate MarkerIDs are skipped (first write wins); schema violations fail.
// Rows are returned in insertion order (rowid). There is no UPDATE path: once a
// marker is stored its fields never change.
// ==============================================================================

use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::AssociationRecord;

/// Substitute for p = 0 when taking -log10
pub const MIN_PLOTTABLE_P_VALUE: f64 = 1e-300;

// Only a duplicate MarkerID is skipped; CHECK and NOT NULL violations
// (out-of-range or NaN p-values) still fail the statement.
const INSERT_RECORD: &str = "INSERT INTO gwas (MarkerID, Chromosome, Location, PValue)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(MarkerID) DO NOTHING";

/// Errors raised by the underlying SQLite database
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Association records of one analysis session
pub struct MarkerStore {
    conn: Connection,
}

impl MarkerStore {
    /// Create an empty store that lives only as long as this value
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Open (or create) a file-backed store, keeping any rows already present
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        info!("Opening marker store: {:?}", path.as_ref());
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS gwas (
                MarkerID TEXT PRIMARY KEY NOT NULL,
                Chromosome TEXT NOT NULL,
                Location REAL NOT NULL,
                PValue REAL NOT NULL CHECK (PValue >= 0.0 AND PValue <= 1.0)
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Insert one record, skipping it if the marker is already stored
    ///
    /// # Returns
    /// * `Ok(true)` - Record inserted
    /// * `Ok(false)` - A record with the same `marker_id` already exists
    /// * `Err(StoreError::Sqlite)` - The record violates the schema (p-value
    ///   outside [0, 1] or NaN)
    pub fn insert(&mut self, record: &AssociationRecord) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            INSERT_RECORD,
            params![
                record.marker_id,
                record.chromosome,
                record.location,
                record.p_value,
            ],
        )?;
        Ok(changed == 1)
    }

    /// Insert a batch of records in a single transaction
    ///
    /// Readers never observe part of the batch: either every new record is
    /// committed or, on error, none is. Duplicate markers (within the batch or
    /// against stored rows) are skipped and not counted.
    pub fn insert_all(&mut self, records: &[AssociationRecord]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut committed = 0;
        {
            let mut stmt = tx.prepare(INSERT_RECORD)?;

            for record in records {
                committed += stmt.execute(params![
                    record.marker_id,
                    record.chromosome,
                    record.location,
                    record.p_value,
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            "Committed {} of {} records ({} duplicates skipped)",
            committed,
            records.len(),
            records.len() - committed
        );
        Ok(committed)
    }

    /// All records in insertion order
    pub fn all(&self) -> Result<Vec<AssociationRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT MarkerID, Chromosome, Location, PValue FROM gwas ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AssociationRecord {
                marker_id: row.get(0)?,
                chromosome: row.get(1)?,
                location: row.get(2)?,
                p_value: row.get(3)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    /// Chromosome and location for each marker
    pub fn genomic_mapping(&self) -> Result<HashMap<String, (String, f64)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT MarkerID, Chromosome, Location FROM gwas")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                (row.get::<_, String>(1)?, row.get::<_, f64>(2)?),
            ))
        })?;

        let mut mapping = HashMap::new();
        for entry in rows {
            let (marker_id, position) = entry?;
            mapping.insert(marker_id, position);
        }
        Ok(mapping)
    }

    /// P-values of all records in insertion order
    pub fn p_values(&self) -> Result<Vec<f64>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT PValue FROM gwas ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, f64>(0))?;

        let mut p_values = Vec::new();
        for p in rows {
            p_values.push(p?);
        }
        Ok(p_values)
    }

    /// (marker_id, p_value) pairs in insertion order
    pub fn marker_p_values(&self) -> Result<Vec<(String, f64)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT MarkerID, PValue FROM gwas ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut pairs = Vec::new();
        for pair in rows {
            pairs.push(pair?);
        }
        Ok(pairs)
    }

    /// Per-chromosome (location, -log10 p) pairs, in insertion order within
    /// each chromosome
    pub fn chromosome_points(&self) -> Result<HashMap<String, Vec<(f64, f64)>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT Chromosome, Location, PValue FROM gwas ORDER BY rowid")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut points: HashMap<String, Vec<(f64, f64)>> = HashMap::new();
        for row in rows {
            let (chromosome, location, p_value) = row?;
            points
                .entry(chromosome)
                .or_default()
                .push((location, neg_log10(p_value)));
        }
        Ok(points)
    }

    /// Number of stored records
    pub fn len(&self) -> Result<usize, StoreError> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM gwas", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Number of records with p_value strictly below `threshold`
    pub fn count_below(&self, threshold: f64) -> Result<usize, StoreError> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM gwas WHERE PValue < ?1",
            params![threshold],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// -log10(p), with p = 0 mapped onto `MIN_PLOTTABLE_P_VALUE`
pub fn neg_log10(p_value: f64) -> f64 {
    let p = if p_value == 0.0 {
        MIN_PLOTTABLE_P_VALUE
    } else {
        p_value
    };
    -p.log10()
}
