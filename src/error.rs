use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ResolverError {
    #[error("failed to open input table {path}: {message}")]
    InputOpen { path: PathBuf, message: String },

    #[error("failed to create output table {path}: {message}")]
    OutputOpen { path: PathBuf, message: String },

    #[error("failed to read input row: {0}")]
    TableRead(String),

    #[error("failed to write output row: {0}")]
    TableWrite(String),

    #[error("malformed species record at row {row}: expected {expected} fields, found {found}")]
    MalformedRecord {
        row: u64,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: column {column} is not valid UTF-8")]
    NonUtf8Field { row: u64, column: &'static str },

    #[error("invalid build number: {0}")]
    InvalidBuildNumber(String),

    #[error("invalid database name: {0:?}")]
    InvalidDatabaseName(String),

    #[error("FTP connection to {host} failed: {message}")]
    FtpConnect { host: String, message: String },

    #[error("FTP login as {user} failed: {message}")]
    FtpAuth { user: String, message: String },

    #[error("FTP listing of {path} failed: {message}")]
    FtpList { path: String, message: String },

    #[error("remote path not found: {0}")]
    RemotePathMissing(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    ConfigInvalid(String),
}

impl ResolverError {
    /// Errors that end the whole run rather than a single record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ResolverError::InputOpen { .. }
                | ResolverError::OutputOpen { .. }
                | ResolverError::TableRead(_)
                | ResolverError::TableWrite(_)
                | ResolverError::ConfigRead(_)
                | ResolverError::ConfigParse(_)
                | ResolverError::ConfigInvalid(_)
        )
    }
}
