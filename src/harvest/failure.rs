//! Failure of a harvest run, with the partial results it produced.

use std::fmt;

use crate::harvest::HarvestState;
use crate::models::ResultCollection;
use crate::sources::HarvestError;

/// A harvest that stopped before reaching `Done`
#[derive(Debug)]
pub struct HarvestFailure {
    /// What went wrong
    pub error: HarvestError,
    /// State the run was in when it failed
    pub state: HarvestState,
    /// Records collected from pages that completed before the failure
    pub partial: ResultCollection,
}

impl HarvestFailure {
    pub fn new(error: HarvestError, state: HarvestState, partial: ResultCollection) -> Self {
        Self {
            error,
            state,
            partial,
        }
    }

    /// Offset of the request that was in flight, if any
    pub fn offset(&self) -> Option<usize> {
        match self.state {
            HarvestState::DiscoveringTotal => Some(self.partial.start),
            HarvestState::Paging { offset, .. } => Some(offset),
            HarvestState::Init | HarvestState::Done => None,
        }
    }

    pub fn into_partial(self) -> ResultCollection {
        self.partial
    }

    pub fn into_error(self) -> HarvestError {
        self.error
    }
}

impl fmt::Display for HarvestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset() {
            Some(offset) => write!(f, "harvest failed at offset {}: {}", offset, self.error),
            None => write!(f, "harvest failed: {}", self.error),
        }
    }
}

impl std::error::Error for HarvestFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
