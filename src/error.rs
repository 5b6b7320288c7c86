use miette::Diagnostic;
use thiserror::Error;

use crate::asserter::AssertionError;
use crate::model::ModelBindingError;
use crate::runner::RequestError;
use crate::specification::StatusMismatchError;
use crate::transport::TransportError;

/// Where a call was in its lifecycle when it stopped.
///
/// A call walks `Built → Sent → Received → Bound → Asserted`; any error moves
/// it to the terminal failed state, and the phase recorded with the error is
/// the last one the call had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Built,
    Sent,
    Received,
    Bound,
    Asserted,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Built => "built",
            Phase::Sent => "sent",
            Phase::Received => "received",
            Phase::Bound => "bound",
            Phase::Asserted => "asserted",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum HarnessError {
    /// Raised in `Built` when a payload fails to encode, in `Received` when
    /// a body fails to bind.
    #[error("{error}")]
    #[diagnostic(code(contract_quest::model_binding))]
    ModelBinding {
        error: ModelBindingError,
        phase: Phase,
    },

    #[error(transparent)]
    #[diagnostic(code(contract_quest::status_mismatch))]
    StatusMismatch(#[from] StatusMismatchError),

    #[error(transparent)]
    #[diagnostic(
        code(contract_quest::transport),
        help("the call was attempted once and is never retried")
    )]
    Transport(#[from] TransportError),

    /// Raised in `Received` for checks on the raw body, in `Bound` for checks
    /// on an extracted model.
    #[error("{error}")]
    #[diagnostic(code(contract_quest::assertion))]
    Assertion {
        error: AssertionError,
        phase: Phase,
    },

    #[error(transparent)]
    #[diagnostic(code(contract_quest::request))]
    Request(#[from] RequestError),
}

impl From<ModelBindingError> for HarnessError {
    fn from(error: ModelBindingError) -> Self {
        HarnessError::ModelBinding {
            error,
            phase: Phase::Received,
        }
    }
}

impl From<AssertionError> for HarnessError {
    fn from(error: AssertionError) -> Self {
        HarnessError::Assertion {
            error,
            phase: Phase::Bound,
        }
    }
}

impl HarnessError {
    /// Stable name of the error kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::ModelBinding { .. } => "ModelBindingError",
            HarnessError::StatusMismatch(_) => "StatusMismatchError",
            HarnessError::Transport(_) => "TransportError",
            HarnessError::Assertion { .. } => "AssertionError",
            HarnessError::Request(_) => "RequestError",
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            HarnessError::Request(_) => Phase::Built,
            HarnessError::Transport(_) => Phase::Sent,
            HarnessError::StatusMismatch(_) => Phase::Received,
            HarnessError::ModelBinding { phase, .. } | HarnessError::Assertion { phase, .. } => {
                *phase
            }
        }
    }
}
