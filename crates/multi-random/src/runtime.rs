use std::future::Future;

use once_cell::sync::Lazy;

// refills and keepers run here instead of on a caller's runtime, so draws work
// the same from sync code, from inside an async task, or from any runtime
// flavor. a blocking draw only ever waits on a channel, never on this runtime.
static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("multi-random")
        .build()
        .expect("multi-random failed to initialize its async runtime. this is a bug in multi-random")
});

/// Spawn a task on the static/lazy background runtime.
pub(crate) fn spawn<F, T>(fut: F) -> tokio::task::JoinHandle<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    RUNTIME.spawn(fut)
}
