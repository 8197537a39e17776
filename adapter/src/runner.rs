//! Thread-affine runners and the registry that owns them.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use gantry_rpc::{
    Channel, ConnectConfig, RunMultiplexer, RunnerConnection, StartupInput, TestEnvironment,
};

use crate::caller::CallerId;
use crate::error::AdapterError;
use crate::state::AdapterState;

/// One caller's exclusive connection into the remote environment.
///
/// Bundles the caller token, the channel, and the run-multiplexer handle.
/// Created at most once per token, never migrated between threads, and
/// released exactly once during shutdown.
pub struct ManagedRunner {
    caller: CallerId,
    channel: Arc<dyn Channel>,
    mux: Arc<dyn RunMultiplexer>,
}

impl ManagedRunner {
    fn new(caller: CallerId, connection: RunnerConnection) -> Self {
        Self {
            caller,
            channel: connection.channel,
            mux: connection.mux,
        }
    }

    /// The token this runner is affine to.
    #[must_use]
    pub fn caller(&self) -> CallerId {
        self.caller
    }

    /// The runner's dedicated channel.
    #[must_use]
    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// The run-multiplexer layered on this runner's channel. Run-execution
    /// wrappers attach a run id here before routing traffic for that run.
    #[must_use]
    pub fn mux(&self) -> &Arc<dyn RunMultiplexer> {
        &self.mux
    }
}

impl std::fmt::Debug for ManagedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedRunner")
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}

/// Owns every [`ManagedRunner`] for one adapter instance.
///
/// Lookups are lock-free; only the closed-check-then-create path takes the
/// state lock, so a runner can never be created in the window right after
/// shutdown begins.
pub(crate) struct RunnerRegistry {
    runners: DashMap<CallerId, Arc<ManagedRunner>>,
    environment: Arc<dyn TestEnvironment>,
    inputs: Vec<StartupInput>,
    connect: ConnectConfig,
}

impl RunnerRegistry {
    pub(crate) fn new(
        environment: Arc<dyn TestEnvironment>,
        inputs: Vec<StartupInput>,
        connect: ConnectConfig,
    ) -> Self {
        Self {
            runners: DashMap::new(),
            environment,
            inputs,
            connect,
        }
    }

    /// The existing runner for `caller`, or a freshly connected one.
    ///
    /// Opening the connection happens inside the lock: slower for the first
    /// call from a given caller, but the re-check of the terminal flag and
    /// the insert must be one atomic step against `close`. A failed open
    /// inserts nothing; the caller may try again while the adapter is open.
    pub(crate) fn get_or_create(
        &self,
        caller: CallerId,
        state: &Mutex<AdapterState>,
    ) -> Result<Arc<ManagedRunner>, AdapterError> {
        if let Some(existing) = self.runners.get(&caller) {
            return Ok(Arc::clone(existing.value()));
        }

        let guard = state.lock();
        guard.check_open()?;
        // A racing caller holding the same token may have connected while we
        // waited for the lock.
        if let Some(existing) = self.runners.get(&caller) {
            return Ok(Arc::clone(existing.value()));
        }

        tracing::debug!(%caller, "opening runner connection");
        let connection = self.environment.open_runner(&self.inputs, &self.connect)?;
        let runner = Arc::new(ManagedRunner::new(caller, connection));
        self.runners.insert(caller, Arc::clone(&runner));
        drop(guard);

        Ok(runner)
    }

    /// Remove and return every registered runner.
    ///
    /// Called once, after the terminal flag is set; with creation gated on
    /// the same lock, nothing can be inserted afterwards.
    pub(crate) fn drain(&self) -> Vec<Arc<ManagedRunner>> {
        let drained: Vec<Arc<ManagedRunner>> = self
            .runners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.runners.clear();
        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.runners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::collections::HashSet;

    use gantry_rpc::testing::ScriptedEnvironment;
    use gantry_rpc::DiscardConsole;

    use crate::error::UsageError;

    fn registry(env: Arc<ScriptedEnvironment>) -> RunnerRegistry {
        RunnerRegistry::new(
            env,
            vec![StartupInput::new("boot", "payload")],
            ConnectConfig {
                console: Arc::new(DiscardConsole),
                env: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn same_caller_resolves_to_same_runner() {
        let env = Arc::new(ScriptedEnvironment::new());
        let registry = registry(Arc::clone(&env));
        let state = Mutex::new(AdapterState::new());

        let caller = CallerId::mint();
        let first = registry.get_or_create(caller, &state).unwrap();
        let second = registry.get_or_create(caller, &state).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(env.open_count(), 1);
    }

    #[test]
    fn distinct_callers_get_distinct_runners() {
        let env = Arc::new(ScriptedEnvironment::new());
        let registry = registry(Arc::clone(&env));
        let state = Mutex::new(AdapterState::new());

        let a = registry.get_or_create(CallerId::mint(), &state).unwrap();
        let b = registry.get_or_create(CallerId::mint(), &state).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(env.open_count(), 2);
    }

    #[test]
    fn concurrent_callers_create_exactly_one_runner_each() {
        let env = Arc::new(ScriptedEnvironment::new());
        let registry = Arc::new(registry(Arc::clone(&env)));
        let state = Arc::new(Mutex::new(AdapterState::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    let caller = CallerId::current();
                    let one = registry.get_or_create(caller, &state).unwrap();
                    let two = registry.get_or_create(caller, &state).unwrap();
                    assert!(Arc::ptr_eq(&one, &two));
                    one.caller()
                })
            })
            .collect();

        let callers: HashSet<CallerId> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(callers.len(), 8);
        assert_eq!(env.open_count(), 8);
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn creation_is_refused_once_closed() {
        let env = Arc::new(ScriptedEnvironment::new());
        let registry = registry(Arc::clone(&env));
        let state = Mutex::new(AdapterState::new());
        state.lock().mark_closed();

        let err = registry.get_or_create(CallerId::mint(), &state).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Usage(UsageError::Closed)
        ));
        assert_eq!(env.open_count(), 0);
    }

    #[test]
    fn failed_open_leaves_no_runner_behind() {
        let env = Arc::new(ScriptedEnvironment::failing("remote unreachable"));
        let registry = registry(env);
        let state = Mutex::new(AdapterState::new());

        let caller = CallerId::mint();
        let err = registry.get_or_create(caller, &state).unwrap_err();
        assert!(matches!(err, AdapterError::Remote(_)));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn drain_empties_the_registry() {
        let env = Arc::new(ScriptedEnvironment::new());
        let registry = registry(env);
        let state = Mutex::new(AdapterState::new());

        registry.get_or_create(CallerId::mint(), &state).unwrap();
        registry.get_or_create(CallerId::mint(), &state).unwrap();
        assert_eq!(registry.drain().len(), 2);
        assert_eq!(registry.len(), 0);
        assert!(registry.drain().is_empty());
    }
}
