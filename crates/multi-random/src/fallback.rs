use tracing::debug;

use crate::store::PoolEntry;
use crate::{Error, Result};

/// What a draw returns once the pool has had its chance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Decision {
    /// The pool had a value to spare.
    FromPool(f64),
    /// The pool was poor. Use the local PRNG instead.
    Synthesize,
    /// The pool was poor and fallback is off.
    Exhausted,
}

/// Decides where a draw's value comes from when the pool can't supply one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FallbackPolicy {
    support_fallback: bool,
}

impl FallbackPolicy {
    pub(crate) fn new(support_fallback: bool) -> Self {
        Self { support_fallback }
    }

    /// Decide on a draw, given the value taken from the pool if it wasn't
    /// poor.
    pub(crate) fn decide(&self, pooled: Option<f64>) -> Decision {
        match (pooled, self.support_fallback) {
            (Some(value), _) => Decision::FromPool(value),
            (None, true) => Decision::Synthesize,
            (None, false) => Decision::Exhausted,
        }
    }

    /// Turn a decision into a value.
    pub(crate) fn resolve(&self, decision: Decision, entry: &PoolEntry) -> Result<f64> {
        match decision {
            Decision::FromPool(value) => Ok(value),
            Decision::Synthesize => {
                debug!(
                    fingerprint = %entry.fingerprint(),
                    unavailable = entry.is_unavailable(),
                    "value from fallback",
                );
                Ok(crate::rand::fraction())
            }
            Decision::Exhausted => {
                debug!(
                    fingerprint = %entry.fingerprint(),
                    len = entry.pool_len(),
                    unavailable = entry.is_unavailable(),
                    "pool exhausted",
                );
                Err(Error::PoolExhausted)
            }
        }
    }
}
