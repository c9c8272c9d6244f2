//! Value sources.
//!
//! There are two layers of source. A [Generator] is anything a
//! [MultiRandom][crate::MultiRandom] can draw from directly. It advertises
//! what it can do with a set of [Capabilities] and the facade negotiates
//! against them. A [Fetch] is the much narrower interface a network provider
//! implements: fetch one batch of fractions, or fail. Wrapping a `Fetch` in
//! [Pooled] turns it into a `Generator` backed by a shared, self-refilling
//! pool.
//!
//! | name                  | kind    | backend                         |
//! |-----------------------|---------|---------------------------------|
//! | `math-random`         | local   | seeded local PRNG               |
//! | `random-org`          | pooled  | random.org decimal fractions    |
//! | `qrng-au`             | pooled  | ANU quantum RNG (hex16 blocks)  |
//! | `app-incredible-trng` | pooled  | AppIncredible TRNG              |

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::hash::Fingerprint;
use crate::store::PoolStore;
use crate::{Error, Result};

mod app_incredible;
mod math_random;
mod parse;
mod qrng_au;
mod random_org;
mod scripted;

pub use app_incredible::AppIncredible;
pub use math_random::MathRandom;
pub use qrng_au::QrngAu;
pub use random_org::RandomOrg;
pub use scripted::{Response, ScriptedSource};

pub use crate::pooled::Pooled;

/// The names of every built-in source.
pub const NAMES: &[&str] = &[
    MathRandom::NAME,
    RandomOrg::NAME,
    QrngAu::NAME,
    AppIncredible::NAME,
];

/// The operations a [Generator] supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Generate a single fraction in `[0, 1)`.
    pub rand: bool,

    /// Generate a value in a range directly.
    pub random: bool,

    /// Needs [Generator::init] called once after construction.
    pub init: bool,

    /// Reports readiness with [Generator::is_ready].
    pub is_ready: bool,

    /// Can refill synchronously, so it can be used with `blocking_rand`.
    pub blocking_rand: bool,
}

/// A source of random values that a [MultiRandom][crate::MultiRandom] can draw
/// from.
///
/// Every method but [name][Generator::name] and
/// [capabilities][Generator::capabilities] has a default. Implementors should
/// override the methods their capabilities advertise.
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// A fraction in `[0, 1)`.
    fn rand(&self) -> Result<f64> {
        Err(Error::Unsupported {
            source_name: self.name(),
            operation: "rand",
        })
    }

    /// A value between `min` and `max`.
    fn random(&self, min: f64, max: f64) -> Result<f64> {
        let _ = (min, max);
        Err(Error::Unsupported {
            source_name: self.name(),
            operation: "random",
        })
    }

    /// Warm up. Called once right after construction if `init` is advertised.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Returns `false` while the source is busy refilling.
    fn is_ready(&self) -> bool {
        true
    }

    /// The number of values currently pooled, for pooled sources.
    fn pool_len(&self) -> Option<usize> {
        None
    }

    /// The key of the shared pool this source draws from, for pooled sources.
    fn fingerprint(&self) -> Option<&Fingerprint> {
        None
    }
}

/// A remote provider of random fractions.
///
/// `fetch` is called at most once at a time per shared pool. The returned
/// future runs on a background runtime, so it must own everything it needs.
pub trait Fetch: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Fetch a batch of fractions in `[0, 1)`.
    fn fetch(&self) -> impl Future<Output = Result<Vec<f64>>> + Send + 'static;
}

/// Build the source named in `config`. Pooled sources keep their pools in
/// `store`.
pub fn by_name(config: &Config, store: &PoolStore) -> Result<Box<dyn Generator>> {
    let generator: Box<dyn Generator> = match config.source.as_str() {
        MathRandom::NAME => Box::new(MathRandom::new(config)?),
        RandomOrg::NAME => Box::new(Pooled::build(
            config,
            &RandomOrg::DEFAULTS,
            store,
            RandomOrg::new,
        )?),
        QrngAu::NAME => Box::new(Pooled::build(config, &QrngAu::DEFAULTS, store, QrngAu::new)?),
        AppIncredible::NAME => Box::new(Pooled::build(
            config,
            &AppIncredible::DEFAULTS,
            store,
            AppIncredible::new,
        )?),
        name => {
            return Err(Error::configuration(format!(
                "couldn't create source {name:?}: unknown source. expected one of {NAMES:?}"
            )))
        }
    };

    Ok(generator)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("multi-random/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| Error::configuration(format!("failed to build an http client: {e}")))
}
