//! Typed message surface exchanged with the remote environment.
//!
//! The adapter only ever sends [`AdapterRequest`] values and receives
//! [`AdapterResponse`] values; framing and transport are the channel
//! implementation's business. Run-tagged traffic travels inside a
//! [`RunEnvelope`] so the remote side can demultiplex by [`RunId`].

use serde::{Deserialize, Serialize};

/// Identifier of one test run.
///
/// Allocated by the adapter, strictly increasing for the lifetime of one
/// adapter instance and never reused. The remote side tags multiplexed
/// traffic with it, so it is wire-visible. `0` is never allocated, which
/// keeps a zero-initialized envelope distinguishable from real traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// A request issued by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterRequest {
    /// Probe the remote side for test frameworks.
    ///
    /// Each inner list holds alternative implementation names for one
    /// framework (old and new names of the same framework, probed together).
    DetectFrameworks { candidates: Vec<Vec<String>> },
}

/// A reply from the remote environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterResponse {
    /// Detection results, position-for-position with the request's
    /// candidate lists. `None` marks a framework the remote side could
    /// not find.
    DetectFrameworks {
        frameworks: Vec<Option<FrameworkInfo>>,
    },
}

/// A framework the remote side detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    /// Implementation name recognized by the remote side.
    pub name: String,
    /// Human-readable name for reporting.
    pub display_name: String,
}

impl FrameworkInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

/// One frame of run-tagged traffic.
///
/// Multiplexer implementations wrap every message belonging to a run in an
/// envelope so the single shared channel can carry concurrent runs without
/// cross-talk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEnvelope {
    pub run: RunId,
    pub payload: serde_json::Value,
}
