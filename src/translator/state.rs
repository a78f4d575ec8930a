use std::fmt;

/// Where a translation run currently is.
///
/// `Configuring -> OverviewRead -> Partitioning -> Iterating.. -> Merging ->
/// HeaderWritten -> Done`, with `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationState {
    /// Validating configuration
    Configuring,
    /// Bounds, MS levels and polarities are known
    OverviewRead,
    /// Computing the shard plan
    Partitioning,
    /// Running one memory iteration
    Iterating {
        /// Zero-based iteration
        iteration: usize,
        /// Iterations in the plan
        of: usize,
    },
    /// Concatenating shard outputs
    Merging,
    /// Headers are on disk
    HeaderWritten,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

impl TranslationState {
    /// Whether the run has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranslationState::Done | TranslationState::Failed)
    }
}

impl fmt::Display for TranslationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationState::Configuring => write!(f, "configuring"),
            TranslationState::OverviewRead => write!(f, "overview read"),
            TranslationState::Partitioning => write!(f, "partitioning"),
            TranslationState::Iterating { iteration, of } => {
                write!(f, "iteration {}/{}", iteration + 1, of)
            }
            TranslationState::Merging => write!(f, "merging"),
            TranslationState::HeaderWritten => write!(f, "header written"),
            TranslationState::Done => write!(f, "done"),
            TranslationState::Failed => write!(f, "failed"),
        }
    }
}
