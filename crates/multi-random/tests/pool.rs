use std::time::{Duration, Instant};

use multi_random::source::{Generator, Pooled, Response, ScriptedSource};
use multi_random::{Config, Error, MultiRandom, PoolStore, SourceOptions};

fn config(blocking_rand: bool, support_fallback: bool) -> Config {
    Config::new(ScriptedSource::NAME)
        .with_blocking_rand(blocking_rand)
        .with_fallback(support_fallback)
        .with_source_options(
            SourceOptions::default()
                .pool_size(10)
                .buff_percent(0.5)
                .keeper(false)
                .timeout(Duration::from_secs(2)),
        )
}

fn multi_random(source: &ScriptedSource, config: &Config, store: &PoolStore) -> MultiRandom {
    let pooled = Pooled::new(source.clone(), config, &ScriptedSource::DEFAULTS, store).unwrap();
    MultiRandom::with_generator(pooled, config).unwrap()
}

fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn equivalent_instances_share_a_pool() {
    let store = PoolStore::new();
    let source = ScriptedSource::values(vec![0.25; 10]);
    let config = config(true, false);

    let a = multi_random(&source, &config, &store);
    let b = multi_random(&source, &config, &store);

    // a warmed the pool on init, b adopted it
    assert_eq!(source.calls(), 1);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(b.pool_len(), Some(10));

    a.rand().unwrap();
    assert_eq!(b.pool_len(), Some(9));
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.pool_len(a.fingerprint().unwrap()),
        Some(9),
    );
}

#[test]
fn blocking_refill_appends_before_popping() {
    let store = PoolStore::new();
    let source = ScriptedSource::values(vec![0.5; 10]);
    // init gets four values, which leaves the pool poor
    source.push(Response::Values(vec![0.1, 0.2, 0.3, 0.4]));

    let rng = multi_random(&source, &config(true, false), &store);
    assert_eq!(rng.pool_len(), Some(4));

    assert_eq!(rng.rand().unwrap(), 0.5);
    assert_eq!(rng.pool_len(), Some(13));
}

#[test]
fn failing_source_with_fallback_never_fails() {
    let store = PoolStore::new();
    let source = ScriptedSource::failing().with_delay(Duration::from_millis(2));
    let rng = multi_random(&source, &config(false, true), &store);

    for _ in 0..500 {
        let value = rng.rand().unwrap();
        assert!((0.0..1.0).contains(&value), "{value} is out of range");
        assert_eq!(rng.pool_len(), Some(0));
        assert!(source.in_flight() <= 1);
    }

    wait_for(|| rng.is_ready());
    assert!(source.calls() >= 1);
    assert_eq!(source.max_in_flight(), 1);
}

#[test]
fn failing_source_without_fallback_is_exhausted() {
    let store = PoolStore::new();

    for blocking in [true, false] {
        let source = ScriptedSource::failing();
        let rng = multi_random(&source, &config(blocking, false), &store);

        for _ in 0..10 {
            let err = rng.rand().unwrap_err();
            assert!(matches!(err, Error::PoolExhausted), "unexpected error: {err}");
            assert!(err.is_temporary());
        }
        assert_eq!(rng.pool_len(), Some(0));
    }
}

#[test]
fn recovers_once_the_source_does() {
    let store = PoolStore::new();
    let source = ScriptedSource::values(vec![0.75; 10]);
    source
        .push(Response::Fail("connection refused".to_string()))
        .push(Response::Fail("connection refused".to_string()));

    // init and the first draw both fail
    let rng = multi_random(&source, &config(true, false), &store);
    assert!(matches!(rng.rand(), Err(Error::PoolExhausted)));

    assert_eq!(rng.rand().unwrap(), 0.75);
    assert_eq!(rng.pool_len(), Some(9));
}

#[test]
fn out_of_range_values_never_reach_a_draw() {
    let store = PoolStore::new();
    let source = ScriptedSource::values(vec![0.5, 1.0, -0.1, f64::NAN, 0.9, 0.1, 0.2, 0.3, 0.4, 0.6, 0.7, 0.8]);
    let rng = multi_random(&source, &config(true, true), &store);

    // nine of the twelve values are in range
    assert_eq!(rng.pool_len(), Some(9));
    for _ in 0..100 {
        let value = rng.rand().unwrap();
        assert!((0.0..1.0).contains(&value), "{value} is out of range");
    }
}

#[test]
fn background_keeper_fills_the_pool() {
    let store = PoolStore::new();
    let source = ScriptedSource::values(vec![0.5; 10]).with_delay(Duration::from_millis(5));
    let config = Config::new(ScriptedSource::NAME).with_source_options(
        SourceOptions::default()
            .pool_size(10)
            .buff_percent(0.5)
            .keeper_interval(Duration::from_millis(10)),
    );

    let rng = multi_random(&source, &config, &store);
    wait_for(|| rng.pool_len() == Some(10));

    // drain the pool down to the watermark and let the keeper top it back up.
    for _ in 0..5 {
        assert_eq!(rng.rand().unwrap(), 0.5);
    }
    wait_for(|| rng.pool_len().unwrap() > 5);
    assert!(source.calls() >= 2);
}

#[test]
fn ranged_draws_use_the_pool() {
    let store = PoolStore::new();
    let source = ScriptedSource::values(vec![0.55; 10]);
    let rng = multi_random(&source, &config(true, false), &store);

    assert!(!rng.capabilities().random);
    assert_eq!(rng.random(10.0, 20.0).unwrap(), 16.0);
}

#[test]
fn pooled_generator_reports_state() {
    let store = PoolStore::new();
    let source = ScriptedSource::values(vec![0.5; 10]);
    let pooled = Pooled::new(source, &config(true, true), &ScriptedSource::DEFAULTS, &store).unwrap();

    assert_eq!(pooled.name(), "scripted");
    assert!(pooled.is_ready());
    assert_eq!(pooled.pool_len(), Some(0));

    pooled.init().unwrap();
    let snapshot = store.snapshot(pooled.fingerprint()).unwrap();
    assert_eq!(snapshot.len(), 10);
    assert!(!snapshot.is_poor());
}
