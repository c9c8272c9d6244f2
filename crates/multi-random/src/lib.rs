//! Uniform random fractions from local or remote entropy providers.
//!
//! A [MultiRandom] draws from one configured source. Network sources are
//! wrapped in a shared prefetch pool: every instance built from an equivalent
//! [Config] draws from the same pool, refills are coordinated so only one
//! fetch per pool is in flight, an optional keeper tops the pool up in the
//! background, and draws that find the pool poor can fall back to a local
//! PRNG instead of failing.
//!
//! ```no_run
//! use multi_random::{Config, MultiRandom, SourceOptions};
//!
//! let config = Config::new("qrng-au")
//!     .with_source_options(SourceOptions::default().pool_size(128));
//!
//! let rng = MultiRandom::new(&config)?;
//! println!("{}", rng.rand()?);
//! # Ok::<(), multi_random::Error>(())
//! ```

mod error;
pub use crate::error::{Error, Result};

mod config;
pub use crate::config::{Config, PoolOptions, SourceDefaults, SourceOptions};

mod hash;
pub use crate::hash::Fingerprint;

mod pool;
pub use crate::pool::Pool;

mod store;
pub use crate::store::PoolStore;

mod facade;
pub use crate::facade::{compose_range, MultiRandom};

mod refill;
pub use crate::refill::RefillMode;

pub mod source;

pub(crate) mod rand;

mod fallback;
mod keeper;
mod pooled;
mod runtime;
