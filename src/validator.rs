// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Validates GWAS output files before ingestion (size, type,
//              magic number, header line) and fingerprints them with SHA-256
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 0.1.0
// ==============================================================================

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024; // 2 GiB

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub file_name: String,
    pub extension: String,
    pub size: u64,
    pub compressed: bool,
    pub hash_sha256: String,
}

pub struct InputValidator {
    max_file_size: u64,
    allowed_types: HashMap<String, Vec<u8>>,
}

impl InputValidator {
    pub fn new() -> Self {
        let mut allowed_types = HashMap::new();

        // Plain delimited text (no magic number)
        for ext in ["csv", "tsv", "txt"] {
            allowed_types.insert(ext.to_string(), vec![]);
            allowed_types.insert(format!("{}.gz", ext), GZIP_MAGIC.to_vec());
        }

        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_types,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn validate(&self, path: &Path) -> Result<ValidatedInput> {
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path: {:?}", path))?
            .to_string_lossy()
            .to_string();

        info!("Validating input file: {}", file_name);

        // 1. Size check
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get file metadata for {:?}", path))?;
        let size = metadata.len();

        if size == 0 {
            anyhow::bail!("Input file is empty: {}", file_name);
        }
        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Extension check (allowlist)
        let ext = self.get_extension(&file_name)?;
        let expected_magic = self
            .allowed_types
            .get(&ext)
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", ext))?;
        debug!("Extension check passed: {}", ext);

        // 3. Magic number verification
        let compressed = !expected_magic.is_empty();
        if compressed {
            let actual_magic = self.read_magic_number(path)?;
            if !self.verify_magic_number(expected_magic, &actual_magic) {
                anyhow::bail!("Magic number mismatch for .{} file", ext);
            }
            debug!("Magic number check passed");
        }

        // 4. Header line present
        self.validate_header_line(path, compressed)?;
        debug!("Header check passed");

        // 5. Compute SHA-256 hash
        let hash = self.compute_sha256(path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedInput {
            file_name,
            extension: ext,
            size,
            compressed,
            hash_sha256: hash,
        })
    }

    fn get_extension(&self, filename: &str) -> Result<String> {
        let lower = filename.to_lowercase();

        // Compound extensions like .csv.gz
        if let Some(stem) = lower.strip_suffix(".gz") {
            let inner = stem
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .ok_or_else(|| anyhow::anyhow!("No file extension found before .gz"))?;
            return Ok(format!("{}.gz", inner));
        }

        lower
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .ok_or_else(|| anyhow::anyhow!("No file extension found"))
    }

    fn read_magic_number(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; 4];
        let n = file.read(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    fn verify_magic_number(&self, expected: &[u8], actual: &[u8]) -> bool {
        expected.len() <= actual.len()
            && expected.iter().zip(actual.iter()).all(|(e, a)| e == a)
    }

    fn validate_header_line(&self, path: &Path, compressed: bool) -> Result<()> {
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if compressed {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let first_line = reader
            .lines()
            .next()
            .ok_or_else(|| anyhow::anyhow!("File has no header line"))?
            .context("Failed to read header line")?;

        if first_line.trim().is_empty() {
            anyhow::bail!("Header line is blank");
        }

        Ok(())
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONTENTS: &str = "MarkerID,Chromosome,Location,PValue\nrs1,1,100,0.01\n";

    #[test]
    fn test_get_extension() {
        let validator = InputValidator::new();

        assert_eq!(validator.get_extension("results.csv").unwrap(), "csv");
        assert_eq!(validator.get_extension("Results.TSV").unwrap(), "tsv");
        assert_eq!(validator.get_extension("plink.assoc.txt.gz").unwrap(), "txt.gz");
        assert!(validator.get_extension("README").is_err());
    }

    #[test]
    fn test_validate_plain_file() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(CONTENTS.as_bytes()).unwrap();
        file.flush().unwrap();

        let validated = InputValidator::new().validate(file.path()).unwrap();
        assert_eq!(validated.extension, "csv");
        assert!(!validated.compressed);
        assert_eq!(validated.size, CONTENTS.len() as u64);
        assert_eq!(validated.hash_sha256.len(), 64);
    }

    #[test]
    fn test_validate_gzip_file() {
        let file = NamedTempFile::with_suffix(".csv.gz").unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        encoder.write_all(CONTENTS.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let validated = InputValidator::new().validate(file.path()).unwrap();
        assert_eq!(validated.extension, "csv.gz");
        assert!(validated.compressed);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let validator = InputValidator::new();

        // Plain text pretending to be gzip
        let mut fake_gz = NamedTempFile::with_suffix(".csv.gz").unwrap();
        fake_gz.write_all(CONTENTS.as_bytes()).unwrap();
        fake_gz.flush().unwrap();
        assert!(validator.validate(fake_gz.path()).is_err());

        // Disallowed extension
        let mut parquet = NamedTempFile::with_suffix(".parquet").unwrap();
        parquet.write_all(CONTENTS.as_bytes()).unwrap();
        parquet.flush().unwrap();
        assert!(validator.validate(parquet.path()).is_err());

        // Empty file
        let empty = NamedTempFile::with_suffix(".csv").unwrap();
        assert!(validator.validate(empty.path()).is_err());

        // Over the size limit
        let mut big = NamedTempFile::with_suffix(".csv").unwrap();
        big.write_all(CONTENTS.as_bytes()).unwrap();
        big.flush().unwrap();
        assert!(InputValidator::new()
            .with_max_file_size(8)
            .validate(big.path())
            .is_err());
    }

    #[test]
    fn test_hash_is_stable() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(CONTENTS.as_bytes()).unwrap();
        file.flush().unwrap();

        let validator = InputValidator::new();
        let first = validator.validate(file.path()).unwrap();
        let second = validator.validate(file.path()).unwrap();
        assert_eq!(first.hash_sha256, second.hash_sha256);
    }
}
