use std::sync::LazyLock;

use regex::Regex;

use crate::domain::BuildNumber;
use crate::remote::ListingEntry;

/// `b<build>_SNPContigLoc[_<chunk>...].bcp.gz`; chunk suffixes are ignored.
pub const SNP_CONTIG_LOC_PATTERN: &str = r"^b(?P<build>\d{3})_SNPContigLoc(_\d+)*\.bcp\.gz$";

static SNP_CONTIG_LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SNP_CONTIG_LOC_PATTERN).unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Build numbers in listing order.
    pub candidates: Vec<BuildNumber>,
    /// Captures that matched the pattern but did not parse as a build number.
    pub rejected: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub fn extract_builds(entries: &[ListingEntry]) -> Extraction {
    let mut extraction = Extraction::default();
    for entry in entries {
        let Some(captures) = SNP_CONTIG_LOC.captures(&entry.name) else {
            continue;
        };
        let Some(raw) = captures.name("build") else {
            continue;
        };
        match raw.as_str().parse::<BuildNumber>() {
            Ok(build) => extraction.candidates.push(build),
            Err(_) => extraction.rejected.push(raw.as_str().to_string()),
        }
    }
    extraction
}
