//! Collaborator seam to the remote test-execution environment.
//!
//! `gantry-adapter` never speaks a wire protocol itself. Everything it needs
//! from the remote side goes through the traits defined here: a
//! [`TestEnvironment`] that can open connections, a [`Channel`] offering typed
//! asynchronous call/response with explicit close-with-cause, and a
//! [`RunMultiplexer`] that lets one channel carry several concurrent runs.
//! Implementations of these traits (process spawning, framing, the actual
//! multiplexing protocol) live outside this workspace.

pub mod channel;
pub mod console;
pub mod environment;
pub mod message;
pub mod testing;

pub use channel::{Channel, ChannelError, CloseCause, Reply, ReplySlot};
pub use console::{ConsoleSink, DiscardConsole, TracingConsole};
pub use environment::{ConnectConfig, RunMultiplexer, RunnerConnection, StartupInput, TestEnvironment};
pub use message::{AdapterRequest, AdapterResponse, FrameworkInfo, RunEnvelope, RunId};
