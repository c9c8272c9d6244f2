//! Refill coordination.
//!
//! Every refill of a shared pool goes through [trigger]. A refill first claims
//! the pool's refill flag; if another refill already holds it the trigger is
//! skipped, not queued. The flag is a best-effort single-flight guard: it
//! keeps a pool from stacking up redundant fetches, but nothing waits on it.
//!
//! The fetch itself always runs on the background runtime. In
//! [Background][RefillMode::Background] mode the caller moves on immediately.
//! In [Blocking][RefillMode::Blocking] mode the caller waits for the result on
//! a channel, up to the fetch timeout. Every fetch is bounded by that same
//! timeout; one that runs over is dropped and counts as a failure. Either
//! way the outcome, values or a failure, is always recorded in the pool, even
//! when a blocking caller has already stopped waiting for it.

use std::future::Future;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tracing::{debug, warn};

use crate::store::PoolEntry;
use crate::{runtime, Error, Result};

/// How a refill interacts with the draw that triggered it. Chosen once, when
/// a pooled source is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefillMode {
    /// Stall the triggering draw until the fetch completes or times out.
    Blocking,
    /// Schedule the fetch and return immediately.
    Background,
}

/// The result of triggering a refill.
#[derive(Debug)]
pub(crate) enum RefillOutcome {
    /// Another refill was already in flight.
    Skipped,
    /// A background refill was scheduled.
    Scheduled,
    /// A blocking refill appended this many values.
    Refilled(usize),
    /// A blocking refill failed. The pool is marked unavailable.
    Unavailable(Error),
}

/// Holds a pool's refill flag. Releases the flag on drop, so a refill that
/// errors or panics can't wedge its pool.
struct RefillGuard {
    entry: Arc<PoolEntry>,
}

impl RefillGuard {
    fn acquire(entry: &Arc<PoolEntry>) -> Option<Self> {
        entry.try_start_refill().then(|| RefillGuard {
            entry: Arc::clone(entry),
        })
    }
}

impl Drop for RefillGuard {
    fn drop(&mut self) {
        debug!(fingerprint = %self.entry.fingerprint(), "refill unlocked");
        self.entry.finish_refill();
    }
}

/// Trigger a refill of `entry` from `source`.
pub(crate) fn trigger<F: crate::source::Fetch>(
    entry: &Arc<PoolEntry>,
    source: &F,
    mode: RefillMode,
    timeout: Duration,
) -> RefillOutcome {
    let Some(guard) = RefillGuard::acquire(entry) else {
        debug!(fingerprint = %entry.fingerprint(), "refill already in flight");
        return RefillOutcome::Skipped;
    };

    let fetch = source.fetch();
    match mode {
        RefillMode::Background => {
            debug!(fingerprint = %entry.fingerprint(), "starting refill in background");
            runtime::spawn(run(guard, fetch, timeout));
            RefillOutcome::Scheduled
        }
        RefillMode::Blocking => {
            debug!(fingerprint = %entry.fingerprint(), "starting blocking refill");
            let (tx, rx) = mpsc::sync_channel(1);
            runtime::spawn(async move {
                // the receiver is gone if the caller already timed out.
                let _ = tx.send(run(guard, fetch, timeout).await);
            });

            match rx.recv_timeout(timeout) {
                Ok(Ok(added)) => RefillOutcome::Refilled(added),
                Ok(Err(e)) => RefillOutcome::Unavailable(e),
                Err(mpsc::RecvTimeoutError::Timeout) => RefillOutcome::Unavailable(
                    Error::Network(format!("refill timed out after {timeout:?}")),
                ),
                Err(mpsc::RecvTimeoutError::Disconnected) => RefillOutcome::Unavailable(
                    Error::Network("refill task exited without a result".to_string()),
                ),
            }
        }
    }
}

/// Run a fetch to completion and merge the result into the guarded pool.
async fn run<Fut>(guard: RefillGuard, fetch: Fut, timeout: Duration) -> Result<usize>
where
    Fut: Future<Output = Result<Vec<f64>>>,
{
    let result = match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(Error::Network(format!(
            "fetch timed out after {timeout:?}"
        ))),
    };

    let entry = &guard.entry;
    match result {
        Ok(batch) => {
            let fetched = batch.len();
            let (added, len) = entry.append(batch);
            entry.set_unavailable(false);
            if added < fetched {
                warn!(
                    fingerprint = %entry.fingerprint(),
                    dropped = fetched - added,
                    "dropped out of range values",
                );
            }
            debug!(fingerprint = %entry.fingerprint(), added, len, "merged new values into pool");
            Ok(added)
        }
        Err(e) => {
            warn!(fingerprint = %entry.fingerprint(), err = %e, "refill failed");
            entry.set_unavailable(true);
            Err(e)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::PoolOptions;
    use crate::hash::Fingerprint;
    use crate::source::{Response, ScriptedSource};
    use crate::store::{PoolStore, RefillState};
    use std::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn entry(store: &PoolStore, name: &str, pool_size: usize, buff_percent: f64) -> Arc<PoolEntry> {
        let options = PoolOptions {
            pool_size,
            buff_percent,
            keeper_interval: None,
            timeout: TIMEOUT,
            block_size: None,
        };
        store.entry(&Fingerprint::new("test", name), &options)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for condition");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_blocking_refill_appends() {
        let store = PoolStore::new();
        let entry = entry(&store, "blocking-append", 10, 0.5);
        entry.append(vec![0.1; 4]);

        let source = ScriptedSource::values(vec![0.5; 10]);
        let outcome = trigger(&entry, &source, RefillMode::Blocking, TIMEOUT);

        assert!(matches!(outcome, RefillOutcome::Refilled(10)));
        assert_eq!(entry.pool_len(), 14);
        assert_eq!(entry.refill_state(), RefillState::Idle);
        assert!(!entry.is_unavailable());
    }

    #[test]
    fn test_blocking_refill_failure() {
        let store = PoolStore::new();
        let entry = entry(&store, "blocking-failure", 10, 0.5);

        let source = ScriptedSource::failing();
        let outcome = trigger(&entry, &source, RefillMode::Blocking, TIMEOUT);

        assert!(matches!(outcome, RefillOutcome::Unavailable(Error::Network(_))));
        assert_eq!(entry.pool_len(), 0);
        assert!(entry.is_unavailable());
        assert_eq!(entry.refill_state(), RefillState::Idle);
    }

    #[test]
    fn test_success_clears_unavailable() {
        let store = PoolStore::new();
        let entry = entry(&store, "recover", 10, 0.5);

        let source = ScriptedSource::values(vec![0.5; 10]);
        source.push(Response::Fail("down".to_string()));

        trigger(&entry, &source, RefillMode::Blocking, TIMEOUT);
        assert!(entry.is_unavailable());

        trigger(&entry, &source, RefillMode::Blocking, TIMEOUT);
        assert!(!entry.is_unavailable());
        assert_eq!(entry.pool_len(), 10);
    }

    #[test]
    fn test_background_refill() {
        let store = PoolStore::new();
        let entry = entry(&store, "background", 10, 0.5);

        let source = ScriptedSource::values(vec![0.5; 10]).with_delay(Duration::from_millis(20));
        let outcome = trigger(&entry, &source, RefillMode::Background, TIMEOUT);
        assert!(matches!(outcome, RefillOutcome::Scheduled));

        wait_for(|| entry.pool_len() == 10);
        wait_for(|| entry.is_ready());
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_skip_while_in_flight() {
        let store = PoolStore::new();
        let entry = entry(&store, "skip", 10, 0.5);

        let source = ScriptedSource::values(vec![0.5; 10]).with_delay(Duration::from_millis(50));
        assert!(matches!(
            trigger(&entry, &source, RefillMode::Background, TIMEOUT),
            RefillOutcome::Scheduled
        ));
        assert!(!entry.is_ready());

        for _ in 0..10 {
            assert!(matches!(
                trigger(&entry, &source, RefillMode::Background, TIMEOUT),
                RefillOutcome::Skipped
            ));
        }
        assert!(matches!(
            trigger(&entry, &source, RefillMode::Blocking, TIMEOUT),
            RefillOutcome::Skipped
        ));

        wait_for(|| entry.is_ready());
        assert_eq!(entry.pool_len(), 10);
        assert_eq!(source.calls(), 1);
        assert_eq!(source.max_in_flight(), 1);
    }

    #[test]
    fn test_blocking_timeout_still_recorded() {
        let store = PoolStore::new();
        let entry = entry(&store, "slow", 10, 0.5);

        let source = ScriptedSource::values(vec![0.5; 10]).with_delay(Duration::from_millis(100));
        let outcome = trigger(&entry, &source, RefillMode::Blocking, Duration::from_millis(10));
        assert!(matches!(outcome, RefillOutcome::Unavailable(_)));

        // the fetch itself is bounded by the same timeout, so it fails too and
        // the flag is released.
        wait_for(|| entry.is_ready());
        assert_eq!(entry.pool_len(), 0);
        assert!(entry.is_unavailable());
    }
}
