use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::refill::{self, RefillMode};
use crate::runtime;
use crate::source::Fetch;
use crate::store::PoolEntry;

/// The background task keeping a pool topped up.
///
/// There's at most one keeper per pool. A keeper is never stopped explicitly;
/// it exits on its first tick after its pool has been dropped, which for the
/// global store means never.
#[derive(Debug)]
pub(crate) struct KeeperHandle {
    interval: Duration,
    #[allow(unused)]
    task: tokio::task::JoinHandle<()>,
}

impl KeeperHandle {
    #[cfg(test)]
    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }
}

/// Start a keeper for `entry` unless one is already running. An existing
/// keeper keeps the interval it was started with.
pub(crate) fn ensure_started<'a, F: Fetch>(
    entry: &'a Arc<PoolEntry>,
    source: &Arc<F>,
    interval: Duration,
    timeout: Duration,
) -> &'a KeeperHandle {
    let handle = entry.keeper().get_or_init(|| {
        tracing::debug!(fingerprint = %entry.fingerprint(), ?interval, "pool keeper started");
        let task = runtime::spawn(run(
            Arc::downgrade(entry),
            Arc::clone(source),
            interval,
            timeout,
        ));
        KeeperHandle { interval, task }
    });

    if handle.interval != interval {
        tracing::debug!(
            fingerprint = %entry.fingerprint(),
            running = ?handle.interval,
            requested = ?interval,
            "pool already has a keeper",
        );
    }
    handle
}

async fn run<F: Fetch>(entry: Weak<PoolEntry>, source: Arc<F>, interval: Duration, timeout: Duration) {
    let mut ticks = tokio::time::interval(interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // the first tick completes immediately. a new pool gets its first refill
    // from its first instance, so skip it.
    ticks.tick().await;

    loop {
        ticks.tick().await;

        let Some(entry) = entry.upgrade() else {
            tracing::trace!("pool dropped, keeper exiting");
            return;
        };

        if entry.is_ready() && entry.is_poor() {
            tracing::debug!(
                fingerprint = %entry.fingerprint(),
                len = entry.pool_len(),
                "keeper found poor pool",
            );
            refill::trigger(&entry, source.as_ref(), RefillMode::Background, timeout);
        }
    }
}
