//! Channel abstraction: typed asynchronous call/response with
//! close-with-cause.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::message::{AdapterRequest, AdapterResponse};

/// Receiving half of one in-flight request.
///
/// Resolves with the reply, or with [`ChannelError::Closed`] if the channel
/// is torn down first. Callers on framework threads block on it via
/// `blocking_recv`; async collaborators simply await it.
pub type Reply = oneshot::Receiver<Result<AdapterResponse, ChannelError>>;

/// Sending half of one in-flight request, held by channel implementations.
pub type ReplySlot = oneshot::Sender<Result<AdapterResponse, ChannelError>>;

/// Why a channel was closed.
///
/// Shared behind an `Arc` so every request still pending at close time
/// observes the same cause, full causal chain included.
#[derive(Debug, Error)]
pub enum CloseCause {
    /// The adapter was closed by its caller; nothing went wrong.
    #[error("adapter closed by caller")]
    CloseRequested,
    /// An asynchronous failure collapsed the adapter.
    #[error("asynchronous failure: {0:#}")]
    Failure(#[source] anyhow::Error),
}

impl CloseCause {
    /// Whether this cause carries a failure rather than a requested close.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Failure surfaced by a channel to an operation pending on it.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The channel was closed with a cause while the operation was pending,
    /// or the operation was attempted on an already-closed channel.
    #[error("channel closed: {cause}")]
    Closed { cause: Arc<CloseCause> },
    /// The transport to the remote side failed.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The remote side answered with something the protocol does not allow.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl ChannelError {
    #[must_use]
    pub fn closed(cause: &Arc<CloseCause>) -> Self {
        Self::Closed {
            cause: Arc::clone(cause),
        }
    }
}

/// Asynchronous request/reply connection to the remote environment.
///
/// One channel is exclusively owned by one runner; per-thread request
/// ordering holds because no two threads share a channel.
pub trait Channel: Send + Sync {
    /// Issue one typed request.
    ///
    /// Never blocks. The returned [`Reply`] resolves once the remote side
    /// answers, or with [`ChannelError::Closed`] carrying the close cause if
    /// the channel is torn down first.
    fn request(&self, request: AdapterRequest) -> Reply;

    /// Close the channel, failing every pending request with `cause`.
    ///
    /// Fire-and-forget: implementations must not wait for the remote side to
    /// acknowledge teardown. Closing an already-closed channel is a no-op.
    fn close(&self, cause: Arc<CloseCause>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_cause_classifies_failures() {
        assert!(!CloseCause::CloseRequested.is_failure());
        assert!(CloseCause::Failure(anyhow::anyhow!("boom")).is_failure());
    }

    #[test]
    fn closed_error_preserves_causal_chain() {
        let root = anyhow::anyhow!("remote process died");
        let cause = Arc::new(CloseCause::Failure(root));
        let err = ChannelError::closed(&cause);
        let rendered = err.to_string();
        assert!(rendered.contains("channel closed"));
        assert!(rendered.contains("remote process died"));
    }

    #[test]
    fn closed_errors_share_one_cause() {
        let cause = Arc::new(CloseCause::CloseRequested);
        let a = ChannelError::closed(&cause);
        let b = ChannelError::closed(&cause);
        match (&a, &b) {
            (ChannelError::Closed { cause: ca }, ChannelError::Closed { cause: cb }) => {
                assert!(Arc::ptr_eq(ca, cb));
            }
            other => panic!("expected Closed pair, got {other:?}"),
        }
    }
}
