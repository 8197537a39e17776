//! In-memory collaborators for tests.
//!
//! Scripted stand-ins for the remote environment, used by the adapter's own
//! tests and available to downstream integration tests. A
//! [`ScriptedChannel`] answers `DetectFrameworks` with a canned result (or
//! holds requests pending until closed), records every request, and delivers
//! the close cause to anything still waiting — the same contract a real
//! channel implementation must honor.
//!
//! ```
//! use gantry_rpc::message::{AdapterRequest, AdapterResponse, FrameworkInfo};
//! use gantry_rpc::channel::Channel;
//! use gantry_rpc::testing::ScriptedChannel;
//!
//! let channel = ScriptedChannel::replying(vec![Some(FrameworkInfo::new("f", "F"))]);
//! let reply = channel.request(AdapterRequest::DetectFrameworks { candidates: vec![vec!["f".into()]] });
//! let response = reply.blocking_recv().unwrap().unwrap();
//! assert!(matches!(response, AdapterResponse::DetectFrameworks { .. }));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::channel::{Channel, ChannelError, CloseCause, Reply, ReplySlot};
use crate::environment::{ConnectConfig, RunMultiplexer, RunnerConnection, StartupInput, TestEnvironment};
use crate::message::{AdapterRequest, AdapterResponse, FrameworkInfo, RunId};

/// In-memory [`Channel`] with scripted behavior.
pub struct ScriptedChannel {
    /// Canned `DetectFrameworks` result. `None` means never reply: requests
    /// stay pending until the channel is closed.
    detect_reply: Option<Vec<Option<FrameworkInfo>>>,
    requests: Mutex<Vec<AdapterRequest>>,
    pending: Mutex<Vec<ReplySlot>>,
    closed: Mutex<Option<Arc<CloseCause>>>,
    close_calls: AtomicUsize,
}

impl ScriptedChannel {
    /// A channel that answers every `DetectFrameworks` request with
    /// `frameworks`.
    #[must_use]
    pub fn replying(frameworks: Vec<Option<FrameworkInfo>>) -> Self {
        Self {
            detect_reply: Some(frameworks),
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            closed: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// A channel that never replies; requests stay pending until close.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            detect_reply: None,
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            closed: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Every request issued so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<AdapterRequest> {
        self.requests.lock().clone()
    }

    /// The cause the channel was first closed with, if any.
    #[must_use]
    pub fn close_cause(&self) -> Option<Arc<CloseCause>> {
        self.closed.lock().clone()
    }

    /// How many times `close` was invoked, no-ops included.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Channel for ScriptedChannel {
    fn request(&self, request: AdapterRequest) -> Reply {
        let (tx, rx) = oneshot::channel();
        // The closed lock spans the whole request so a concurrent close
        // cannot slip between the check and the pending insert.
        let closed = self.closed.lock();
        if let Some(cause) = closed.as_ref() {
            let _ = tx.send(Err(ChannelError::closed(cause)));
            return rx;
        }
        self.requests.lock().push(request);
        match &self.detect_reply {
            Some(frameworks) => {
                let _ = tx.send(Ok(AdapterResponse::DetectFrameworks {
                    frameworks: frameworks.clone(),
                }));
            }
            None => self.pending.lock().push(tx),
        }
        rx
    }

    fn close(&self, cause: Arc<CloseCause>) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut closed = self.closed.lock();
        if closed.is_some() {
            return;
        }
        *closed = Some(Arc::clone(&cause));
        for slot in self.pending.lock().drain(..) {
            let _ = slot.send(Err(ChannelError::closed(&cause)));
        }
    }
}

/// Recording [`RunMultiplexer`].
#[derive(Default)]
pub struct ScriptedMux {
    attached: Mutex<Vec<RunId>>,
    detached: Mutex<Vec<RunId>>,
}

impl ScriptedMux {
    #[must_use]
    pub fn attached(&self) -> Vec<RunId> {
        self.attached.lock().clone()
    }

    #[must_use]
    pub fn detached(&self) -> Vec<RunId> {
        self.detached.lock().clone()
    }
}

impl RunMultiplexer for ScriptedMux {
    fn attach(&self, run: RunId) {
        self.attached.lock().push(run);
    }

    fn detach(&self, run: RunId) {
        self.detached.lock().push(run);
    }
}

/// In-memory [`TestEnvironment`] that hands out [`ScriptedChannel`]s and
/// records how it was used.
pub struct ScriptedEnvironment {
    /// Script for channels this environment opens. `None` → silent channels.
    frameworks: Option<Vec<Option<FrameworkInfo>>>,
    /// When set, `open_runner` fails with this transport error.
    fail_with: Option<String>,
    opened: Mutex<Vec<(Arc<ScriptedChannel>, Arc<ScriptedMux>)>>,
    seen_inputs: Mutex<Vec<Vec<StartupInput>>>,
    seen_env: Mutex<Vec<BTreeMap<String, String>>>,
}

impl ScriptedEnvironment {
    /// An environment whose channels never reply.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frameworks: None,
            fail_with: None,
            opened: Mutex::new(Vec::new()),
            seen_inputs: Mutex::new(Vec::new()),
            seen_env: Mutex::new(Vec::new()),
        }
    }

    /// An environment whose channels answer `DetectFrameworks` with
    /// `frameworks`.
    #[must_use]
    pub fn replying(frameworks: Vec<Option<FrameworkInfo>>) -> Self {
        Self {
            frameworks: Some(frameworks),
            ..Self::new()
        }
    }

    /// An environment that refuses to open connections.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new()
        }
    }

    /// Connections opened so far.
    #[must_use]
    pub fn opened(&self) -> Vec<(Arc<ScriptedChannel>, Arc<ScriptedMux>)> {
        self.opened.lock().clone()
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// Environment-variable maps seen across opens, in order.
    #[must_use]
    pub fn seen_env(&self) -> Vec<BTreeMap<String, String>> {
        self.seen_env.lock().clone()
    }

    /// Startup-input batches seen across opens, in order.
    #[must_use]
    pub fn seen_inputs(&self) -> Vec<Vec<StartupInput>> {
        self.seen_inputs.lock().clone()
    }
}

impl Default for ScriptedEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnvironment for ScriptedEnvironment {
    fn open_runner(
        &self,
        inputs: &[StartupInput],
        config: &ConnectConfig,
    ) -> Result<RunnerConnection, ChannelError> {
        if let Some(message) = &self.fail_with {
            return Err(ChannelError::Transport(message.clone()));
        }
        self.seen_inputs.lock().push(inputs.to_vec());
        self.seen_env.lock().push(config.env.clone());
        let channel = Arc::new(match &self.frameworks {
            Some(frameworks) => ScriptedChannel::replying(frameworks.clone()),
            None => ScriptedChannel::silent(),
        });
        let mux = Arc::new(ScriptedMux::default());
        self.opened.lock().push((Arc::clone(&channel), Arc::clone(&mux)));
        Ok(RunnerConnection { channel, mux })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replying_channel_answers_immediately() {
        let channel = ScriptedChannel::replying(vec![None]);
        let reply = channel.request(AdapterRequest::DetectFrameworks {
            candidates: vec![vec!["f".to_string()]],
        });
        let response = reply.blocking_recv().unwrap().unwrap();
        assert_eq!(
            response,
            AdapterResponse::DetectFrameworks {
                frameworks: vec![None]
            }
        );
        assert_eq!(channel.requests().len(), 1);
    }

    #[test]
    fn close_fails_pending_requests_with_cause() {
        let channel = ScriptedChannel::silent();
        let reply = channel.request(AdapterRequest::DetectFrameworks {
            candidates: vec![],
        });
        channel.close(Arc::new(CloseCause::CloseRequested));
        let err = reply.blocking_recv().unwrap().unwrap_err();
        match err {
            ChannelError::Closed { cause } => assert!(!cause.is_failure()),
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[test]
    fn request_after_close_fails_immediately() {
        let channel = ScriptedChannel::silent();
        channel.close(Arc::new(CloseCause::CloseRequested));
        let reply = channel.request(AdapterRequest::DetectFrameworks {
            candidates: vec![],
        });
        assert!(matches!(
            reply.blocking_recv().unwrap(),
            Err(ChannelError::Closed { .. })
        ));
        // Requests against a closed channel are not recorded as traffic.
        assert!(channel.requests().is_empty());
    }

    #[test]
    fn second_close_keeps_first_cause() {
        let channel = ScriptedChannel::silent();
        channel.close(Arc::new(CloseCause::Failure(anyhow::anyhow!("first"))));
        channel.close(Arc::new(CloseCause::CloseRequested));
        assert_eq!(channel.close_calls(), 2);
        assert!(channel.close_cause().unwrap().is_failure());
    }

    #[test]
    fn failing_environment_opens_nothing() {
        let env = ScriptedEnvironment::failing("no remote");
        let config = ConnectConfig {
            console: Arc::new(crate::console::DiscardConsole),
            env: BTreeMap::new(),
        };
        let err = env.open_runner(&[], &config).unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
        assert_eq!(env.open_count(), 0);
    }
}
