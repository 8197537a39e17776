//! Execution-context tokens identifying callers.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CALLER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: CallerId = CallerId::mint();
}

/// Opaque token identifying one execution context.
///
/// Runner affinity is keyed by this token rather than by a platform thread
/// id. [`CallerId::current`] derives a stable token for the calling thread;
/// a caller that manages its own execution contexts (a task pool, a custom
/// scheduler) can instead [`mint`](CallerId::mint) tokens and carry them
/// explicitly. Tokens are process-unique and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerId(u64);

impl CallerId {
    /// Allocate a fresh token.
    #[must_use]
    pub fn mint() -> Self {
        Self(NEXT_CALLER.fetch_add(1, Ordering::Relaxed))
    }

    /// The calling thread's token. Stable for the life of the thread.
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(|id| *id)
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "caller-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_stable_per_thread() {
        assert_eq!(CallerId::current(), CallerId::current());
    }

    #[test]
    fn current_differs_across_threads() {
        let here = CallerId::current();
        let there = std::thread::spawn(CallerId::current).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn minted_tokens_are_unique() {
        let a = CallerId::mint();
        let b = CallerId::mint();
        assert_ne!(a, b);
    }
}
