//! Shared helpers for adapter integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use gantry_adapter::{AdapterConfig, TestAdapter};
use gantry_rpc::testing::ScriptedEnvironment;
use gantry_rpc::{FrameworkInfo, StartupInput, TestEnvironment};

/// Install a subscriber so `RUST_LOG=debug` surfaces adapter logs in tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A minimal bootstrap payload.
pub fn boot_inputs() -> Vec<StartupInput> {
    vec![StartupInput::new("bootstrap", "globalThis.bridge = {};")]
}

/// Adapter over `env` with default configuration.
pub fn adapter_over(env: &Arc<ScriptedEnvironment>) -> TestAdapter {
    TestAdapter::new(
        Arc::clone(env) as Arc<dyn TestEnvironment>,
        boot_inputs(),
        AdapterConfig::new(),
    )
    .expect("non-empty startup inputs")
}

/// Detection result with one present framework per `names` entry.
pub fn detections(names: &[&str]) -> Vec<Option<FrameworkInfo>> {
    names
        .iter()
        .map(|name| Some(FrameworkInfo::new(*name, format!("{name} (display)"))))
        .collect()
}
