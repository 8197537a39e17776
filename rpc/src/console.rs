//! Sink for console output forwarded from the remote environment's process.
//!
//! The adapter's own diagnostics go to `tracing`; this sink only receives
//! what the remote process prints. The default configuration discards it.

/// Receives output lines from the remote process.
pub trait ConsoleSink: Send + Sync {
    /// A line written to the remote process's stdout.
    fn out(&self, line: &str);

    /// A line written to the remote process's stderr.
    fn err(&self, line: &str);
}

/// Discards all remote output. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardConsole;

impl ConsoleSink for DiscardConsole {
    fn out(&self, _line: &str) {}
    fn err(&self, _line: &str) {}
}

/// Routes remote output into `tracing` under the `gantry::remote` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn out(&self, line: &str) {
        tracing::info!(target: "gantry::remote", "{line}");
    }

    fn err(&self, line: &str) {
        tracing::warn!(target: "gantry::remote", "{line}");
    }
}
