use std::time::Duration;

use multi_random::{Config, MultiRandom, SourceOptions};
use tracing_subscriber::EnvFilter;

/// Draw a handful of values from a source.
///
/// usage: draw [SOURCE] [COUNT] [--blocking]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let source = args.next().unwrap_or_else(|| "math-random".to_string());
    let count: usize = args
        .next()
        .map(|n| n.parse().expect("COUNT must be a number"))
        .unwrap_or(10);
    let blocking = args.any(|arg| arg == "--blocking");

    let config = Config::new(source)
        .with_blocking_rand(blocking)
        .with_source_options(SourceOptions::default().timeout(Duration::from_secs(10)));

    let rng = MultiRandom::new(&config).unwrap();
    println!(
        "source={} capabilities={:?} fingerprint={:?}",
        rng.source_name(),
        rng.capabilities(),
        rng.fingerprint().map(|fp| fp.to_string()),
    );

    for _ in 0..count {
        match rng.rand() {
            Ok(value) => println!("{value:.6} d6={}", rng.random(1.0, 6.0).unwrap()),
            Err(e) => println!("error: {e}"),
        }
    }

    if let Some(len) = rng.pool_len() {
        println!("pool_len={len}");
    }
}
