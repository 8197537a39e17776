//! Error types for the adapter surface.

use thiserror::Error;

use gantry_rpc::{ChannelError, RunId};

/// A caller violated a precondition.
///
/// Usage errors fail synchronously at the call site and leave the adapter
/// and every other caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// Construction was attempted with no startup inputs. A connection with
    /// no bootstrap payload can never receive replies.
    #[error("startup inputs must not be empty")]
    EmptyStartupInputs,
    /// The operation arrived after the adapter closed.
    #[error("adapter is closed")]
    Closed,
    /// A run id was completed that is not currently open.
    #[error("{0} is not open")]
    UnknownRun(RunId),
}

/// Any failure surfaced by the adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// A remote failure, including a channel closed underneath a pending
    /// operation. Remote failures are fatal to the whole adapter instance.
    #[error(transparent)]
    Remote(#[from] ChannelError),
}

impl AdapterError {
    /// Whether this is a local precondition violation rather than a remote
    /// failure.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}
