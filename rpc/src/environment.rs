//! Remote-environment seam: how runner connections are opened.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, ChannelError};
use crate::console::ConsoleSink;
use crate::message::RunId;

/// One bootstrap payload sent to the remote side when a connection opens.
///
/// A connection with no startup inputs can never receive replies, so the
/// adapter refuses to construct without at least one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupInput {
    /// Name the remote side reports in diagnostics.
    pub name: String,
    /// The payload itself.
    pub source: String,
}

impl StartupInput {
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Options a [`TestEnvironment`] applies when opening a connection.
pub struct ConnectConfig {
    /// Where the remote process's console output goes.
    pub console: Arc<dyn ConsoleSink>,
    /// Environment variables applied to the remote environment's process.
    pub env: BTreeMap<String, String>,
}

impl std::fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// Run-multiplexing layer atop one channel.
///
/// Lets several concurrent runs share the channel without cross-talk: traffic
/// for an attached run travels in [`crate::message::RunEnvelope`] frames the
/// remote side demultiplexes by run id.
pub trait RunMultiplexer: Send + Sync {
    /// Register a run id so the remote side accepts traffic tagged with it.
    fn attach(&self, run: RunId);

    /// Deregister a run id once its run is done.
    fn detach(&self, run: RunId);
}

/// The pair of handles backing one runner.
pub struct RunnerConnection {
    pub channel: Arc<dyn Channel>,
    pub mux: Arc<dyn RunMultiplexer>,
}

impl std::fmt::Debug for RunnerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerConnection").finish_non_exhaustive()
    }
}

/// Handle to the remote test-execution environment.
///
/// Opening a runner connection delivers the startup inputs, wires the remote
/// process's console to the configured sink, and applies the configured
/// environment variables. Process lifecycle management lives behind this
/// trait, not in the adapter.
pub trait TestEnvironment: Send + Sync {
    fn open_runner(
        &self,
        inputs: &[StartupInput],
        config: &ConnectConfig,
    ) -> Result<RunnerConnection, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::DiscardConsole;

    #[test]
    fn startup_input_round_trips() {
        let input = StartupInput::new("bootstrap.js", "globalThis.bridge = {};");
        let json = serde_json::to_string(&input).unwrap();
        let back: StartupInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn connect_config_debug_omits_console() {
        let config = ConnectConfig {
            console: Arc::new(DiscardConsole),
            env: BTreeMap::from([("RUST_LOG".to_string(), "debug".to_string())]),
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("RUST_LOG"));
        assert!(rendered.contains(".."));
    }
}
