use std::fmt;

use xxhash_rust::xxh3::Xxh3;

/// A stable key that identifies a shared pool.
///
/// A Fingerprint is a 128-bit xxh3 digest over the name of a source and a salt
/// string. The salt is either an explicitly configured id or the serialized
/// configuration of the source, so any two instances configured the same way
/// land on the same pool. xxh3 isn't a cryptographic hash, but nothing here
/// needs preimage resistance, just a negligible chance of two different
/// configurations colliding.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    const SUFFIX: &'static str = ":multi-random";

    pub(crate) fn new(source_name: &str, salt: &str) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(source_name.as_bytes());
        // separate the two strings so ("ab", "c") and ("a", "bc") differ.
        hasher.update(&[0]);
        hasher.update(salt.as_bytes());

        Self(format!("{:032x}{}", hasher.digest128(), Self::SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
