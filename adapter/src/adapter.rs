//! `TestAdapter` facade — public API consumed by the host test framework.
//!
//! One instance binds caller threads to thread-affine runners, tracks
//! in-flight runs, and tears everything down fail-fast on the first
//! asynchronous failure. Construction performs no remote interaction;
//! connections open lazily, one per caller.

use std::sync::Arc;

use parking_lot::Mutex;

use gantry_rpc::{CloseCause, RunId, StartupInput, TestEnvironment};

use crate::caller::CallerId;
use crate::config::AdapterConfig;
use crate::error::{AdapterError, UsageError};
use crate::frameworks::{self, FrameworkHandle};
use crate::runner::{ManagedRunner, RunnerRegistry};
use crate::state::AdapterState;
use crate::supervisor::FailureSink;

/// Internals shared between the facade, framework handles, and failure
/// sinks.
pub(crate) struct Shared {
    state: Mutex<AdapterState>,
    registry: RunnerRegistry,
}

impl Shared {
    pub(crate) fn runner_for(&self, caller: CallerId) -> Result<Arc<ManagedRunner>, AdapterError> {
        self.registry.get_or_create(caller, &self.state)
    }

    pub(crate) fn run_starting(&self) -> Result<RunId, AdapterError> {
        let id = self.state.lock().start_run()?;
        tracing::debug!(%id, "run starting");
        Ok(id)
    }

    pub(crate) fn run_done(&self, run: RunId) -> Result<(), AdapterError> {
        self.state.lock().finish_run(run)?;
        tracing::debug!(%run, "run done");
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    /// The one teardown path. Idempotent: the first call wins, later calls
    /// observe the terminal flag and return.
    ///
    /// The terminal flag flips under the state lock; runner creation re-checks
    /// it under the same lock, so nothing can be inserted into the registry
    /// once the flag is set and draining outside the lock is race-free. Every
    /// drained channel is closed with `cause`, failing whatever is still
    /// pending on it. Never waits for the remote side to acknowledge.
    pub(crate) fn shutdown(&self, cause: CloseCause) {
        let open = {
            let mut state = self.state.lock();
            match state.mark_closed() {
                Some(open) => open,
                None => {
                    tracing::debug!("close: adapter already closed");
                    return;
                }
            }
        };

        if !open.is_empty() {
            tracing::warn!(
                open_runs = %format_runs(&open),
                "closing adapter while runs are still open"
            );
        }

        let cause = Arc::new(cause);
        let runners = self.registry.drain();
        tracing::info!(runners = runners.len(), %cause, "adapter closed");
        for runner in runners {
            tracing::debug!(caller = %runner.caller(), "closing runner channel");
            runner.channel().close(Arc::clone(&cause));
        }
    }
}

fn format_runs(runs: &[RunId]) -> String {
    let ids: Vec<String> = runs.iter().map(ToString::to_string).collect();
    ids.join(", ")
}

/// Adapter between a host test framework and a remote test-execution
/// environment.
///
/// Callers on multiple threads each get one exclusive runner connection,
/// looked up lock-free after first use. Any asynchronous failure reported
/// through the [`FailureSink`] collapses the whole instance: every channel
/// is closed with a cause and further runner or run creation fails. There is
/// no partial recovery and no retry.
pub struct TestAdapter {
    shared: Arc<Shared>,
}

impl TestAdapter {
    /// Build an adapter over `environment`.
    ///
    /// Fails with [`UsageError::EmptyStartupInputs`] before any remote
    /// interaction if `startup_inputs` is empty — a connection with no
    /// bootstrap payload can never receive replies.
    pub fn new(
        environment: Arc<dyn TestEnvironment>,
        startup_inputs: Vec<StartupInput>,
        config: AdapterConfig,
    ) -> Result<Self, AdapterError> {
        if startup_inputs.is_empty() {
            return Err(UsageError::EmptyStartupInputs.into());
        }
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(AdapterState::new()),
                registry: RunnerRegistry::new(environment, startup_inputs, config.into_connect()),
            }),
        })
    }

    /// One blocking framework-discovery round-trip.
    ///
    /// Issues a single detect request carrying all candidate name sets over
    /// the calling thread's runner and blocks until the remote side answers.
    /// The result preserves positional order: entry `i` is `Some` handle or
    /// `None` exactly as the remote side resolved candidate set `i`.
    ///
    /// Intended to run once, before parallel execution starts. Must not be
    /// called from inside an async runtime. No timeout is applied here; a
    /// dead remote surfaces through the channel's own failure semantics and
    /// the failure sink.
    pub fn load_frameworks(
        &self,
        candidates: &[Vec<String>],
    ) -> Result<Vec<Option<FrameworkHandle>>, AdapterError> {
        frameworks::load(&self.shared, candidates)
    }

    /// The runner owned by `caller`, connecting it first if needed.
    pub fn runner_for(&self, caller: CallerId) -> Result<Arc<ManagedRunner>, AdapterError> {
        self.shared.runner_for(caller)
    }

    /// Allocate a run id and mark the run open. Called by run-execution
    /// wrappers when a run starts.
    pub fn run_starting(&self) -> Result<RunId, AdapterError> {
        self.shared.run_starting()
    }

    /// Retire a run id. Completing an id that is not open is a usage error.
    pub fn run_done(&self, run: RunId) -> Result<(), AdapterError> {
        self.shared.run_done(run)
    }

    /// Handle for collaborators that schedule asynchronous work. Any failure
    /// they report collapses this adapter.
    #[must_use]
    pub fn failure_sink(&self) -> FailureSink {
        FailureSink::new(Arc::downgrade(&self.shared))
    }

    /// Whether the adapter reached its terminal closed state.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Close the adapter. Synchronous and idempotent.
    ///
    /// Logs a warning enumerating any run ids still open, then closes every
    /// runner's channel with a "closed by caller" cause. Does not wait for
    /// the remote side to acknowledge teardown.
    pub fn close(&self) {
        self.shared.shutdown(CloseCause::CloseRequested);
    }
}

impl Drop for TestAdapter {
    /// Dropping the adapter closes it; an earlier explicit `close` makes
    /// this a no-op.
    fn drop(&mut self) {
        self.shared.shutdown(CloseCause::CloseRequested);
    }
}

impl std::fmt::Debug for TestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestAdapter")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
