use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AvifloraError {
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("cache entry could not be encoded: {0}")]
    CacheEncode(String),

    #[error("species not found: {0}")]
    SpeciesNotFound(String),

    #[error("no enrichment record for species: {0}")]
    ProfileNotFound(String),

    #[error("export file not found at {0}, run `aviflora enrich` first")]
    ExportMissing(PathBuf),
}
