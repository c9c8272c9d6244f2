use std::fmt;

use crate::config::Config;
use crate::hash::Fingerprint;
use crate::source::{self, Capabilities, Generator};
use crate::store::PoolStore;
use crate::{Error, Result};

/// A random number generator backed by a configurable source.
///
/// A `MultiRandom` wraps a single [Generator]. Pooled sources share their
/// pool with every other `MultiRandom` built from an equivalent [Config] in
/// the same [PoolStore], so building many instances is cheap and doesn't
/// multiply network traffic.
///
/// ```no_run
/// use multi_random::{Config, MultiRandom};
///
/// let rng = MultiRandom::new(&Config::new("random-org"))?;
/// let fraction = rng.rand()?;
/// let die = rng.random(1.0, 6.0)?;
/// # Ok::<(), multi_random::Error>(())
/// ```
pub struct MultiRandom {
    generator: Box<dyn Generator>,
    capabilities: Capabilities,
}

impl fmt::Debug for MultiRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiRandom")
            .field("source", &self.generator.name())
            .field("capabilities", &self.capabilities)
            .field("fingerprint", &self.generator.fingerprint())
            .finish()
    }
}

impl MultiRandom {
    /// Build a generator for `config`, sharing pools through the
    /// process-wide store.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_store(config, PoolStore::global())
    }

    /// Build a generator for `config`, sharing pools through `store`.
    pub fn with_store(config: &Config, store: &PoolStore) -> Result<Self> {
        let generator = source::by_name(config, store)?;
        Self::negotiate(generator, config)
    }

    /// Wrap a pre-built generator. The source named in `config` is ignored,
    /// but `blocking_rand` is still checked against what the generator
    /// supports.
    pub fn with_generator(generator: impl Generator + 'static, config: &Config) -> Result<Self> {
        Self::negotiate(Box::new(generator), config)
    }

    fn negotiate(generator: Box<dyn Generator>, config: &Config) -> Result<Self> {
        let capabilities = generator.capabilities();
        let name = generator.name();

        if !(capabilities.rand || capabilities.random) {
            return Err(Error::configuration(format!(
                "source {name:?} supports neither rand nor random"
            )));
        }
        if config.blocking_rand && !capabilities.blocking_rand {
            return Err(Error::configuration(format!(
                "source {name:?} does not support blockingRand"
            )));
        }

        if capabilities.init {
            generator.init()?;
        }

        tracing::debug!(source = name, ?capabilities, "created generator");
        Ok(Self {
            generator,
            capabilities,
        })
    }

    /// A fraction in `[0, 1)`.
    pub fn rand(&self) -> Result<f64> {
        self.generator.rand()
    }

    /// A value between `min` and `max`, inclusive.
    ///
    /// Sources that can't generate ranged values directly get one composed
    /// from [rand][Self::rand] with [compose_range].
    pub fn random(&self, min: f64, max: f64) -> Result<f64> {
        if self.capabilities.random {
            return self.generator.random(min, max);
        }
        Ok(compose_range(self.generator.rand()?, min, max))
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The name of the source this generator draws from.
    pub fn source_name(&self) -> &'static str {
        self.generator.name()
    }

    /// Returns `false` while the source is refilling.
    pub fn is_ready(&self) -> bool {
        !self.capabilities.is_ready || self.generator.is_ready()
    }

    /// The number of values in this generator's shared pool, or `None` for
    /// sources that don't pool.
    pub fn pool_len(&self) -> Option<usize> {
        self.generator.pool_len()
    }

    /// The key of this generator's shared pool, or `None` for sources that
    /// don't pool.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.generator.fingerprint()
    }
}

/// Map a fraction in `[0, 1)` to a value in `[min, max]` as
/// `round(fraction * (max - min)) + min`, rounding halves up.
///
/// This mapping is biased: `min` and `max` each get half the probability of
/// every value in between, since only half a unit of the scaled range rounds
/// to either of them. It's kept as is so existing callers see the same
/// distribution they always have.
pub fn compose_range(fraction: f64, min: f64, max: f64) -> f64 {
    (fraction * (max - min) + 0.5).floor() + min
}
