use crate::Error;
use std::fmt::{self, Display};

/// Step of the paired insert transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Begin,
    InsertOrder,
    FetchOrderId,
    InsertFill,
    Commit,
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Begin => "beginning the transaction",
            Step::InsertOrder => "inserting the order",
            Step::FetchOrderId => "fetching the order id",
            Step::InsertFill => "inserting the order fill",
            Step::Commit => "committing",
        })
    }
}

/// Failure of a single attempt, tagged with the step that raised it.
///
/// The transaction was already rolled back when this is returned.
#[derive(Debug)]
pub struct AttemptError {
    pub step: Step,
    pub error: Error,
}

impl AttemptError {
    pub fn new(step: Step, error: Error) -> Self {
        Self { step, error }
    }
}

impl Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed while {}: {:#}", self.step, self.error)
    }
}

impl std::error::Error for AttemptError {}

type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure surfaced to the caller of the workload.
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("Invalid order request: {0}")]
    InvalidRequest(String),
    #[error("Giving up after {attempts} attempts failed with a retryable conflict")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
    #[error("Failed while {step}")]
    FatalDatabase {
        step: Step,
        #[source]
        source: Source,
    },
    #[error("Could not connect to `{url}`")]
    Connectivity {
        url: String,
        #[source]
        source: Source,
    },
    #[error("Could not create the tables")]
    Schema {
        #[source]
        source: Source,
    },
    #[error("Could not count the rows of `{table}`")]
    RowCount {
        table: String,
        #[source]
        source: Source,
    },
}

impl WorkloadError {
    pub fn fatal(failure: AttemptError) -> Self {
        WorkloadError::FatalDatabase {
            step: failure.step,
            source: failure.error.into(),
        }
    }

    pub fn connectivity(url: impl Into<String>, error: Error) -> Self {
        WorkloadError::Connectivity {
            url: url.into(),
            source: error.into(),
        }
    }

    /// Step that raised the error, when it comes from a transaction attempt.
    pub fn step(&self) -> Option<Step> {
        match self {
            WorkloadError::RetriesExhausted { last, .. } => Some(last.step),
            WorkloadError::FatalDatabase { step, .. } => Some(*step),
            _ => None,
        }
    }
}
