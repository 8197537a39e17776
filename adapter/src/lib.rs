//! Thread-affine runner pool and fail-fast lifecycle for a remote
//! test-execution environment.
//!
//! A [`TestAdapter`] binds each caller thread of a host test framework to
//! its own lazily-connected runner, allocates monotonic run ids for the runs
//! in flight, and guarantees idempotent, fail-fast teardown: the first
//! asynchronous failure anywhere closes every channel with a cause instead
//! of leaving work hanging. Wire concerns live behind the seams in
//! [`gantry_rpc`].

mod adapter;
mod caller;
mod config;
mod error;
mod frameworks;
mod runner;
mod state;
mod supervisor;

pub use adapter::TestAdapter;
pub use caller::CallerId;
pub use config::AdapterConfig;
pub use error::{AdapterError, UsageError};
pub use frameworks::FrameworkHandle;
pub use gantry_rpc::RunId;
pub use runner::ManagedRunner;
pub use supervisor::FailureSink;
