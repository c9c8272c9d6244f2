use crate::config::{Config, PoolOptions, SourceDefaults};
use crate::source::{Capabilities, Generator};
use crate::Result;

/// Local pseudorandom values with no pool and no network.
///
/// Values come from a thread-local PRNG. Set `MULTI_RANDOM_SEED` to seed it
/// deterministically.
#[derive(Debug, Clone)]
pub struct MathRandom {
    _private: (),
}

impl MathRandom {
    pub const NAME: &'static str = "math-random";

    /// Pool options are accepted and validated for every source, even though
    /// this one never pools anything.
    pub const DEFAULTS: SourceDefaults = SourceDefaults::new(64, 0.5);

    pub fn new(config: &Config) -> Result<Self> {
        PoolOptions::resolve(&config.source_options, &Self::DEFAULTS)?;
        Ok(Self { _private: () })
    }
}

impl Generator for MathRandom {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            rand: true,
            blocking_rand: true,
            ..Default::default()
        }
    }

    fn rand(&self) -> Result<f64> {
        Ok(crate::rand::fraction())
    }
}
