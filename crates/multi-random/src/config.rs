//! Configuration for a [MultiRandom][crate::MultiRandom].
//!
//! Config is plain serde data. Keys are camelCase, with snake_case aliases,
//! so configuration written for either convention loads unchanged. Anything
//! left unset is filled in from the defaults of the selected source at
//! construction time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level configuration for a [MultiRandom][crate::MultiRandom].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The name of the source to draw values from. See
    /// [by_name][crate::source::by_name] for the list of known sources.
    #[serde(default = "default_source", alias = "plugin")]
    pub source: String,

    /// An explicit id for the shared pool.
    ///
    /// Instances with the same source and id share a pool no matter how the
    /// rest of their configuration differs. Without an id, the pool is keyed
    /// on the entire configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Refill the pool synchronously, stalling a draw until fresh values
    /// arrive, instead of refilling in the background.
    #[serde(default, alias = "blocking_rand")]
    pub blocking_rand: bool,

    /// Serve locally generated pseudorandom values when the pool can't serve a
    /// draw. When disabled, those draws fail with
    /// [PoolExhausted][Error::PoolExhausted].
    #[serde(default = "default_true", alias = "support_fallback")]
    pub support_fallback: bool,

    /// Options for the selected source.
    #[serde(default, alias = "source_options", alias = "pluginOptions")]
    pub source_options: SourceOptions,
}

fn default_source() -> String {
    "math-random".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: default_source(),
            id: None,
            blocking_rand: false,
            support_fallback: true,
            source_options: SourceOptions::default(),
        }
    }
}

impl Config {
    /// Create a config for a named source with every other field defaulted.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::configuration(format!("bad json: {e}")))
    }

    /// Parse a config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| Error::configuration(format!("bad yaml: {e}")))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_blocking_rand(mut self, blocking_rand: bool) -> Self {
        self.blocking_rand = blocking_rand;
        self
    }

    pub fn with_fallback(mut self, support_fallback: bool) -> Self {
        self.support_fallback = support_fallback;
        self
    }

    pub fn with_source_options(mut self, source_options: SourceOptions) -> Self {
        self.source_options = source_options;
        self
    }

    /// The string a pool fingerprint is derived from: the explicit id if there
    /// is one, otherwise this config serialized with every source option
    /// filled in from `defaults`.
    pub(crate) fn fingerprint_salt(&self, defaults: &SourceDefaults) -> Result<String> {
        if let Some(id) = &self.id {
            return Ok(id.clone());
        }

        let effective = Config {
            source_options: self.source_options.with_defaults(defaults),
            ..self.clone()
        };
        serde_json::to_string(&effective)
            .map_err(|e| Error::configuration(format!("unserializable config: {e}")))
    }
}

/// Per-source options. Every field is optional and falls back to the default
/// for the selected source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOptions {
    /// The number of values fetched in a single batch.
    #[serde(default, alias = "pool_size", skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,

    /// The fraction of `pool_size` at or below which a pool counts as poor
    /// and gets refilled. Must be in `(0, 1]`.
    #[serde(
        default,
        alias = "buff_percent",
        alias = "bufferFraction",
        skip_serializing_if = "Option::is_none"
    )]
    pub buff_percent: Option<f64>,

    /// Run a background keeper that refills a poor pool between draws.
    #[serde(
        default,
        alias = "pool_keeper_enabled",
        skip_serializing_if = "Option::is_none"
    )]
    pub pool_keeper_enabled: Option<bool>,

    /// How often the keeper checks the pool, in milliseconds.
    #[serde(
        default,
        alias = "pool_keeper_interval",
        skip_serializing_if = "Option::is_none"
    )]
    pub pool_keeper_interval: Option<u64>,

    /// Network timeout for a single fetch, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// The size of each hex block requested from `qrng-au`. Ignored by
    /// every other source.
    #[serde(default, alias = "block_size", skip_serializing_if = "Option::is_none")]
    pub block_size: Option<u32>,
}

impl SourceOptions {
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn buff_percent(mut self, buff_percent: f64) -> Self {
        self.buff_percent = Some(buff_percent);
        self
    }

    pub fn keeper(mut self, enabled: bool) -> Self {
        self.pool_keeper_enabled = Some(enabled);
        self
    }

    pub fn keeper_interval(mut self, interval: Duration) -> Self {
        self.pool_keeper_interval = Some(interval.as_millis() as u64);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.as_millis() as u64);
        self
    }

    fn with_defaults(&self, defaults: &SourceDefaults) -> SourceOptions {
        SourceOptions {
            pool_size: Some(self.pool_size.unwrap_or(defaults.pool_size)),
            buff_percent: Some(self.buff_percent.unwrap_or(defaults.buff_percent)),
            pool_keeper_enabled: Some(self.pool_keeper_enabled.unwrap_or(defaults.keeper_enabled)),
            pool_keeper_interval: Some(
                self.pool_keeper_interval
                    .unwrap_or(defaults.keeper_interval_ms),
            ),
            timeout: Some(self.timeout.unwrap_or(defaults.timeout_ms)),
            block_size: self.block_size.or(defaults.block_size),
        }
    }
}

/// The option defaults for a single source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceDefaults {
    pub pool_size: usize,
    pub buff_percent: f64,
    pub keeper_enabled: bool,
    pub keeper_interval_ms: u64,
    pub timeout_ms: u64,
    pub block_size: Option<u32>,
}

impl SourceDefaults {
    pub const fn new(pool_size: usize, buff_percent: f64) -> Self {
        Self {
            pool_size,
            buff_percent,
            keeper_enabled: true,
            keeper_interval_ms: 5000,
            timeout_ms: 5000,
            block_size: None,
        }
    }

    pub const fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = Some(block_size);
        self
    }
}

/// Source options with defaults applied and validated.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolOptions {
    pub pool_size: usize,
    pub buff_percent: f64,
    /// The keeper interval, or `None` if the keeper is disabled.
    pub keeper_interval: Option<Duration>,
    pub timeout: Duration,
    pub block_size: Option<u32>,
}

impl PoolOptions {
    pub fn resolve(options: &SourceOptions, defaults: &SourceDefaults) -> Result<Self> {
        let options = options.with_defaults(defaults);

        // with_defaults always fills these in.
        let pool_size = options.pool_size.unwrap_or(defaults.pool_size);
        let buff_percent = options.buff_percent.unwrap_or(defaults.buff_percent);
        let keeper_enabled = options.pool_keeper_enabled.unwrap_or(defaults.keeper_enabled);
        let keeper_interval_ms = options
            .pool_keeper_interval
            .unwrap_or(defaults.keeper_interval_ms);
        let timeout_ms = options.timeout.unwrap_or(defaults.timeout_ms);

        if pool_size == 0 {
            return Err(Error::configuration("poolSize must be greater than zero"));
        }
        if !(buff_percent > 0.0 && buff_percent <= 1.0) {
            return Err(Error::configuration(format!(
                "buffPercent must be in (0, 1], got {buff_percent}"
            )));
        }
        if keeper_enabled && keeper_interval_ms == 0 {
            return Err(Error::configuration(
                "poolKeeperInterval must be greater than zero",
            ));
        }
        if timeout_ms == 0 {
            return Err(Error::configuration("timeout must be greater than zero"));
        }
        if options.block_size == Some(0) {
            return Err(Error::configuration("blockSize must be greater than zero"));
        }

        Ok(Self {
            pool_size,
            buff_percent,
            keeper_interval: keeper_enabled.then(|| Duration::from_millis(keeper_interval_ms)),
            timeout: Duration::from_millis(timeout_ms),
            block_size: options.block_size,
        })
    }
}
