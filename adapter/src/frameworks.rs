//! Framework discovery: one blocking round-trip before parallel execution.

use std::sync::{Arc, Weak};

use gantry_rpc::{AdapterRequest, AdapterResponse, ChannelError, FrameworkInfo};

use crate::adapter::Shared;
use crate::caller::CallerId;
use crate::error::{AdapterError, UsageError};
use crate::runner::ManagedRunner;

/// A framework the remote side detected, bound to its adapter.
///
/// Handles hold no strong reference: one that outlives its adapter cannot
/// keep connections alive, and operations through it fail as if the adapter
/// were closed.
#[derive(Clone)]
pub struct FrameworkHandle {
    info: FrameworkInfo,
    adapter: Weak<Shared>,
}

impl FrameworkHandle {
    /// Implementation name recognized by the remote side.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Human-readable name for reporting.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.info.display_name
    }

    #[must_use]
    pub fn info(&self) -> &FrameworkInfo {
        &self.info
    }

    /// The runner owned by `caller`, through the adapter this handle is
    /// bound to. Run-execution wrappers use this to route a run's traffic
    /// over the channel of the thread driving it.
    pub fn runner_for(&self, caller: CallerId) -> Result<Arc<ManagedRunner>, AdapterError> {
        match self.adapter.upgrade() {
            Some(shared) => shared.runner_for(caller),
            None => Err(UsageError::Closed.into()),
        }
    }
}

impl std::fmt::Debug for FrameworkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameworkHandle")
            .field("name", &self.info.name)
            .finish_non_exhaustive()
    }
}

/// Issue one detect request carrying all candidate sets and block for the
/// reply.
pub(crate) fn load(
    shared: &Arc<Shared>,
    candidates: &[Vec<String>],
) -> Result<Vec<Option<FrameworkHandle>>, AdapterError> {
    let runner = shared.runner_for(CallerId::current())?;
    tracing::debug!(candidates = candidates.len(), "detecting frameworks");

    let reply = runner.channel().request(AdapterRequest::DetectFrameworks {
        candidates: candidates.to_vec(),
    });
    let response = reply
        .blocking_recv()
        .map_err(|_| ChannelError::Transport("reply dropped before a response arrived".to_string()))??;

    let frameworks = match response {
        AdapterResponse::DetectFrameworks { frameworks } => frameworks,
    };
    if frameworks.len() != candidates.len() {
        return Err(ChannelError::Protocol(format!(
            "detect-frameworks reply carries {} entries for {} candidate sets",
            frameworks.len(),
            candidates.len()
        ))
        .into());
    }

    Ok(frameworks
        .into_iter()
        .map(|found| {
            found.map(|info| {
                tracing::info!(framework = %info.display_name, "framework detected");
                FrameworkHandle {
                    info,
                    adapter: Arc::downgrade(shared),
                }
            })
        })
        .collect())
}
