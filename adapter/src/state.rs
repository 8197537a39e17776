//! The single mutual-exclusion domain: terminal flag, run-id allocation,
//! open-run bookkeeping.

use std::collections::BTreeSet;

use gantry_rpc::RunId;

use crate::error::UsageError;

/// State guarded by the adapter's one mutex.
///
/// The runner map lives outside this struct (it supports lock-free reads);
/// only the terminal flag, the id counter, and the open-run set need mutual
/// exclusion — together with the check-then-insert sequence of runner
/// creation, which takes the same lock.
pub(crate) struct AdapterState {
    closed: bool,
    next_run_id: u64,
    open_runs: BTreeSet<RunId>,
}

impl AdapterState {
    pub(crate) fn new() -> Self {
        Self {
            closed: false,
            // Ids start at 1; 0 is never a valid RunId.
            next_run_id: 1,
            open_runs: BTreeSet::new(),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Refuse the operation if the adapter already closed.
    pub(crate) fn check_open(&self) -> Result<(), UsageError> {
        if self.closed {
            Err(UsageError::Closed)
        } else {
            Ok(())
        }
    }

    /// Allocate the next run id and mark it open.
    pub(crate) fn start_run(&mut self) -> Result<RunId, UsageError> {
        self.check_open()?;
        let id = RunId::new(self.next_run_id);
        self.next_run_id += 1;
        self.open_runs.insert(id);
        Ok(id)
    }

    /// Retire an open run id. Completing an id that is not open is a usage
    /// error; ids are never reused, so a double completion always fails.
    pub(crate) fn finish_run(&mut self, id: RunId) -> Result<(), UsageError> {
        if self.open_runs.remove(&id) {
            Ok(())
        } else {
            Err(UsageError::UnknownRun(id))
        }
    }

    /// Flip the terminal flag.
    ///
    /// Returns `None` if the adapter was already closed, otherwise the ids
    /// still open at close time (the shutdown diagnostic). The flag never
    /// transitions back.
    pub(crate) fn mark_closed(&mut self) -> Option<Vec<RunId>> {
        if self.closed {
            return None;
        }
        self.closed = true;
        Some(self.open_runs.iter().copied().collect())
    }
}
