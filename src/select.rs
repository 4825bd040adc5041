use crate::domain::{BuildNumber, ResolutionOutcome};
use crate::extract::Extraction;

/// Highest candidate, or `None` when there are none.
pub fn select_build(candidates: &[BuildNumber]) -> Option<BuildNumber> {
    candidates.iter().copied().max()
}

pub fn outcome_for(extraction: &Extraction) -> ResolutionOutcome {
    match select_build(&extraction.candidates) {
        Some(build) => ResolutionOutcome::Resolved(build),
        None => ResolutionOutcome::NotFound,
    }
}
