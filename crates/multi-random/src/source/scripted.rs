use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SourceDefaults;
use crate::source::Fetch;
use crate::{Error, Result};

/// A single scripted fetch result.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// Return this batch of values.
    Values(Vec<f64>),
    /// Fail with a network error carrying this message.
    Fail(String),
}

/// An in-memory [Fetch] that plays back a script of responses.
///
/// This source is intended for testing pooled behavior and for running
/// without network access. Responses are returned in the order they were
/// queued. Once the queue runs dry every fetch gets the fallback response.
///
/// Clones share the same script and counters, so keep a clone around to
/// inspect a source after handing it to a [Pooled][crate::source::Pooled].
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    inner: Arc<ScriptedInner>,
}

#[derive(Debug)]
struct ScriptedInner {
    queue: Mutex<VecDeque<Response>>,
    otherwise: Response,
    delay: Duration,

    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub const NAME: &'static str = "scripted";
    pub const DEFAULTS: SourceDefaults = SourceDefaults::new(64, 0.5);

    /// A source that returns `otherwise` once its queue is empty.
    pub fn new(otherwise: Response) -> Self {
        Self::build(otherwise, Duration::ZERO)
    }

    /// A source that always returns the same batch.
    pub fn values(batch: Vec<f64>) -> Self {
        Self::new(Response::Values(batch))
    }

    /// A source that always fails.
    pub fn failing() -> Self {
        Self::new(Response::Fail("scripted failure".to_string()))
    }

    /// Delay every fetch by `delay`. Returns a new source with an empty queue
    /// and fresh counters.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self::build(self.inner.otherwise.clone(), delay)
    }

    fn build(otherwise: Response, delay: Duration) -> Self {
        Self {
            inner: Arc::new(ScriptedInner {
                queue: Mutex::new(VecDeque::new()),
                otherwise,
                delay,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue a response.
    pub fn push(&self, response: Response) -> &Self {
        self.queue().push_back(response);
        self
    }

    /// The number of fetches that have started.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// The number of fetches currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// The most fetches that have ever been running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Response>> {
        // nothing panics while holding this lock.
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Fetch for ScriptedSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<f64>>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let response = self
            .queue()
            .pop_front()
            .unwrap_or_else(|| inner.otherwise.clone());

        async move {
            inner.calls.fetch_add(1, Ordering::SeqCst);
            let _running = InFlight::enter(&inner);

            if !inner.delay.is_zero() {
                tokio::time::sleep(inner.delay).await;
            }

            match response {
                Response::Values(values) => Ok(values),
                Response::Fail(message) => Err(Error::Network(message)),
            }
        }
    }
}

/// Counts a fetch as in flight until dropped, including when the fetch future
/// is dropped before it completes.
struct InFlight<'a> {
    inner: &'a ScriptedInner,
}

impl<'a> InFlight<'a> {
    fn enter(inner: &'a ScriptedInner) -> Self {
        let running = inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        inner.max_in_flight.fetch_max(running, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
