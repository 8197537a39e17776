//! Failure sink: routes any escaped asynchronous failure into shutdown.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Weak;

use futures_util::FutureExt;

use gantry_rpc::CloseCause;

use crate::adapter::Shared;

/// Catches failures escaping scheduled asynchronous work.
///
/// Collaborators wrap every unit of work they schedule in
/// [`supervise`](Self::supervise), so an `Err` or a panic that the task's
/// own recovery logic did not handle reaches one designated place instead of
/// being dropped. Whatever arrives here is logged and collapses the whole
/// adapter — an errored channel cannot be isolated from other work sharing
/// the same execution facility, so everything stops rather than hang.
///
/// The handle is cheap to clone and holds no strong reference: a sink
/// outliving its adapter degrades to logging only.
#[derive(Clone)]
pub struct FailureSink {
    shared: Weak<Shared>,
}

impl FailureSink {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self { shared }
    }

    /// Route an already-caught asynchronous failure into shutdown.
    ///
    /// Logs a one-line summary at `error` and the full causal chain at
    /// `debug`, then closes the adapter with a cause wrapping `error`.
    pub fn report(&self, error: anyhow::Error) {
        tracing::error!("asynchronous failure: {error}");
        tracing::debug!("asynchronous failure detail: {error:?}");
        match self.shared.upgrade() {
            Some(shared) => shared.shutdown(CloseCause::Failure(error)),
            None => tracing::debug!("failure arrived after the adapter was released"),
        }
    }

    /// Wrap one scheduled unit of work.
    ///
    /// The returned future never resolves to an error: an `Err` from `task`,
    /// or a panic inside it, is caught and forwarded to
    /// [`report`](Self::report).
    pub fn supervise<F>(&self, task: F) -> impl Future<Output = ()> + Send + 'static + use<F>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let sink = self.clone();
        async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => sink.report(error),
                Err(payload) => sink.report(anyhow::anyhow!(
                    "task panicked: {}",
                    panic_message(payload.as_ref())
                )),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
