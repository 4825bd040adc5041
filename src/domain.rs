use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ResolverError;

/// Columns in the species table. Order is fixed.
pub const FIELD_COUNT: usize = 16;

/// Position of `dbsnp_build_public`, the only column the resolver rewrites.
pub const BUILD_FIELD_INDEX: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatabaseName {
    type Err = ResolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized != "."
            && normalized != ".."
            && !normalized
                .chars()
                .any(|ch| ch == '/' || ch == '\\' || ch.is_whitespace() || ch.is_control());
        if !is_valid {
            return Err(ResolverError::InvalidDatabaseName(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildNumber(u32);

impl BuildNumber {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BuildNumber {
    type Err = ResolverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| ResolverError::InvalidBuildNumber(value.to_string()))
    }
}

/// What happened when resolving one record's build number.
#[derive(Debug)]
pub enum ResolutionOutcome {
    Resolved(BuildNumber),
    NotFound,
    Failed(ResolverError),
}

impl ResolutionOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ResolutionOutcome::Resolved(_) => OutcomeKind::Resolved,
            ResolutionOutcome::NotFound => OutcomeKind::NotFound,
            ResolutionOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    pub fn build(&self) -> Option<BuildNumber> {
        match self {
            ResolutionOutcome::Resolved(build) => Some(*build),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Resolved,
    NotFound,
    Failed,
    Malformed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Resolved => write!(f, "resolved"),
            OutcomeKind::NotFound => write!(f, "not_found"),
            OutcomeKind::Failed => write!(f, "failed"),
            OutcomeKind::Malformed => write!(f, "malformed"),
        }
    }
}

/// How a listing failure that the server reports as "file unavailable" is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingPathPolicy {
    /// Treat it like any other listing failure and retry.
    #[default]
    Retry,
    /// Stop immediately and report the record as not found.
    Skip,
}

/// Column names in table order.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "database_name",
    "submitted_tax_id",
    "species_tax_id",
    "dbsnp_build_public",
    "category",
    "reference_assembly_name",
    "reference_assembly",
    "genbank_assembly",
    "unclustered_ss_count",
    "ss_count",
    "rs_count",
    "ss_count_date",
    "rs_count_date",
    "in_public_date",
    "priority_ebi",
    "build_151_status",
];

/// Position of `database_name`, the remote directory key.
pub const DATABASE_NAME_INDEX: usize = 0;

/// One row of the species table. Columns are held as raw bytes; only the
/// database name and build columns are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesRecord {
    fields: [Vec<u8>; FIELD_COUNT],
    database_name: String,
    build: String,
}

impl SpeciesRecord {
    /// Builds a record from one table row. `row` is 1-based and only used for errors.
    pub fn from_fields(row: u64, fields: Vec<Vec<u8>>) -> Result<Self, ResolverError> {
        let fields: [Vec<u8>; FIELD_COUNT] =
            fields
                .try_into()
                .map_err(|rejected: Vec<Vec<u8>>| ResolverError::MalformedRecord {
                    row,
                    expected: FIELD_COUNT,
                    found: rejected.len(),
                })?;
        let database_name = decode_field(row, &fields, DATABASE_NAME_INDEX)?;
        let build = decode_field(row, &fields, BUILD_FIELD_INDEX)?;
        Ok(Self {
            fields,
            database_name,
            build,
        })
    }

    pub fn fields(&self) -> [&[u8]; FIELD_COUNT] {
        self.fields.each_ref().map(|field| field.as_slice())
    }

    /// Raw `database_name` column.
    pub fn database_name_field(&self) -> &str {
        &self.database_name
    }

    /// Raw `dbsnp_build_public` column.
    pub fn build_field(&self) -> &str {
        &self.build
    }

    pub fn database_name(&self) -> Result<DatabaseName, ResolverError> {
        self.database_name.parse()
    }

    /// Returns the record to write for `outcome`. Only a resolved build
    /// replaces `dbsnp_build_public`; every other column is copied byte for byte.
    pub fn merge(&self, outcome: &ResolutionOutcome) -> SpeciesRecord {
        let mut merged = self.clone();
        if let ResolutionOutcome::Resolved(build) = outcome {
            merged.build = build.to_string();
            merged.fields[BUILD_FIELD_INDEX] = merged.build.as_bytes().to_vec();
        }
        merged
    }
}

fn decode_field(
    row: u64,
    fields: &[Vec<u8>; FIELD_COUNT],
    index: usize,
) -> Result<String, ResolverError> {
    String::from_utf8(fields[index].clone()).map_err(|_| ResolverError::NonUtf8Field {
        row,
        column: FIELD_NAMES[index],
    })
}
