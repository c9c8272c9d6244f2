use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::{Config, PoolOptions, SourceDefaults};
use crate::fallback::FallbackPolicy;
use crate::hash::Fingerprint;
use crate::keeper;
use crate::refill::{self, RefillMode, RefillOutcome};
use crate::source::{Capabilities, Fetch, Generator};
use crate::store::{PoolEntry, PoolStore};
use crate::Result;

/// A [Generator] that serves values out of a shared pool kept full by a
/// [Fetch].
///
/// Every `Pooled` built from an equivalent [Config] shares one pool through
/// its [PoolStore]. Draws take values from the top of the pool while the pool
/// isn't poor. A draw that finds the pool poor triggers a refill and then,
/// depending on the config, either waits for it (`blocking_rand`) or moves on
/// right away and serves a value from the local PRNG (`support_fallback`) or
/// fails with [PoolExhausted][crate::Error::PoolExhausted].
#[derive(Debug)]
pub struct Pooled<F> {
    source: Arc<F>,
    entry: Arc<PoolEntry>,
    mode: RefillMode,
    timeout: Duration,
    fallback: FallbackPolicy,
}

impl<F: Fetch> Pooled<F> {
    /// Resolve pool options for `config`, build a source from them with
    /// `make_source`, and attach it to its shared pool in `store`.
    pub fn build<M>(
        config: &Config,
        defaults: &SourceDefaults,
        store: &PoolStore,
        make_source: M,
    ) -> Result<Self>
    where
        M: FnOnce(&PoolOptions) -> Result<F>,
    {
        let options = PoolOptions::resolve(&config.source_options, defaults)?;
        let source = make_source(&options)?;
        Self::attach(source, config, defaults, &options, store)
    }

    /// Attach an already built source to its shared pool in `store`.
    pub fn new(source: F, config: &Config, defaults: &SourceDefaults, store: &PoolStore) -> Result<Self> {
        let options = PoolOptions::resolve(&config.source_options, defaults)?;
        Self::attach(source, config, defaults, &options, store)
    }

    fn attach(
        source: F,
        config: &Config,
        defaults: &SourceDefaults,
        options: &PoolOptions,
        store: &PoolStore,
    ) -> Result<Self> {
        let fingerprint = Fingerprint::new(source.name(), &config.fingerprint_salt(defaults)?);
        let entry = store.entry(&fingerprint, options);
        let source = Arc::new(source);

        let mode = if config.blocking_rand {
            RefillMode::Blocking
        } else {
            RefillMode::Background
        };

        if let (RefillMode::Background, Some(interval)) = (mode, options.keeper_interval) {
            keeper::ensure_started(&entry, &source, interval, options.timeout);
        }

        Ok(Self {
            source,
            entry,
            mode,
            timeout: options.timeout,
            fallback: FallbackPolicy::new(config.support_fallback),
        })
    }

    /// The key of the shared pool this source draws from.
    pub fn fingerprint(&self) -> &Fingerprint {
        self.entry.fingerprint()
    }

    pub fn mode(&self) -> RefillMode {
        self.mode
    }

    fn refill(&self) -> RefillOutcome {
        refill::trigger(&self.entry, self.source.as_ref(), self.mode, self.timeout)
    }
}

impl<F: Fetch> Generator for Pooled<F> {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            rand: true,
            random: false,
            init: true,
            is_ready: true,
            blocking_rand: true,
        }
    }

    fn rand(&self) -> Result<f64> {
        let mut pooled = self.entry.pop_unless_poor();

        if pooled.is_none() {
            debug!(
                fingerprint = %self.entry.fingerprint(),
                len = self.entry.pool_len(),
                "pool is poor",
            );
            if let RefillOutcome::Refilled(added) = self.refill() {
                // only a finished blocking refill can have changed the pool
                trace!(fingerprint = %self.entry.fingerprint(), added, "drawing after refill");
                pooled = self.entry.pop_unless_poor();
            }
        }

        let decision = self.fallback.decide(pooled);
        trace!(fingerprint = %self.entry.fingerprint(), ?decision, "draw");
        self.fallback.resolve(decision, &self.entry)
    }

    fn init(&self) -> Result<()> {
        let len = self.entry.pool_len();
        if len > 0 {
            debug!(fingerprint = %self.entry.fingerprint(), len, "adopted existing pool");
            return Ok(());
        }

        match self.refill() {
            RefillOutcome::Unavailable(e) => {
                debug!(fingerprint = %self.entry.fingerprint(), err = %e, "initial refill failed");
            }
            outcome => {
                debug!(fingerprint = %self.entry.fingerprint(), ?outcome, "initial refill");
            }
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.entry.is_ready()
    }

    fn pool_len(&self) -> Option<usize> {
        Some(self.entry.pool_len())
    }

    fn fingerprint(&self) -> Option<&Fingerprint> {
        Some(self.entry.fingerprint())
    }
}
