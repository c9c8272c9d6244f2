//! Local pseudorandomness for `math-random` and fallback draws.
//!
//! Each thread draws from its own `StdRng`. Thread generators are seeded from
//! one shared generator, which is seeded from `MULTI_RANDOM_SEED` when it's
//! set and from system entropy otherwise, so a run that leans on fallback
//! values can be replayed.

use std::cell::RefCell;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The env variable used to seed every local PRNG.
pub const SEED_ENV: &str = "MULTI_RANDOM_SEED";

/// Run `f` with this thread's generator.
pub fn with_thread_rng<F, T>(f: F) -> T
where
    F: FnMut(&mut StdRng) -> T,
{
    thread_local! {
        static THREAD_RNG: RefCell<StdRng> = RefCell::new(seeded_std_rng());
    }

    THREAD_RNG.with_borrow_mut(f)
}

/// A uniformly distributed fraction in `[0, 1)`.
pub fn fraction() -> f64 {
    with_thread_rng(|rng| rng.gen::<f64>())
}

static SEEDER: Lazy<Mutex<StdRng>> = Lazy::new(|| {
    let seeder = std::env::var(SEED_ENV)
        .ok()
        .and_then(|seed| seed.trim().parse::<u64>().ok())
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    Mutex::new(seeder)
});

fn seeded_std_rng() -> StdRng {
    // nothing that holds this lock can panic, but a poisoned seeder is still
    // a perfectly good seeder.
    let seed = SEEDER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .gen();
    StdRng::from_seed(seed)
}
