//! Adapter configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use gantry_rpc::{ConnectConfig, ConsoleSink, DiscardConsole};

/// Options for one adapter instance.
///
/// Immutable once the adapter is constructed; built from defaults plus
/// override-style setters.
///
/// ```
/// use gantry_adapter::AdapterConfig;
///
/// let config = AdapterConfig::new()
///     .with_env_var("TZ", "UTC")
///     .with_env_var("CI", "1");
/// assert_eq!(config.env().len(), 2);
/// ```
pub struct AdapterConfig {
    console: Arc<dyn ConsoleSink>,
    env: BTreeMap<String, String>,
}

impl AdapterConfig {
    /// Defaults: remote console output is discarded, no extra environment
    /// variables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            console: Arc::new(DiscardConsole),
            env: BTreeMap::new(),
        }
    }

    /// Route the remote process's console output to `console`.
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    /// Replace the environment-variable map applied to the remote process.
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Add one environment variable for the remote process.
    #[must_use]
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Environment variables applied to the remote process.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub(crate) fn into_connect(self) -> ConnectConfig {
        ConnectConfig {
            console: self.console,
            env: self.env,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}
