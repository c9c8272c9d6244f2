/// A buffer of prefetched values.
///
/// A pool is a stack: values are appended in batches and drawn from the end.
/// Every value in a pool is a fraction in `[0, 1)`.
///
/// A pool is "poor" when it's empty or holds no more than `capacity *
/// buff_percent` values. A poor pool should be refilled, and the fallback
/// policy won't serve values out of it.
#[derive(Clone, Debug, PartialEq)]
pub struct Pool {
    values: Vec<f64>,
    capacity: usize,
    buff_percent: f64,
}

impl Pool {
    pub(crate) fn new(capacity: usize, buff_percent: f64) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
            buff_percent,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buff_percent(&self) -> f64 {
        self.buff_percent
    }

    /// The pool length at or below which this pool is poor.
    pub fn watermark(&self) -> f64 {
        self.capacity as f64 * self.buff_percent
    }

    pub fn is_poor(&self) -> bool {
        self.values.is_empty() || self.values.len() as f64 <= self.watermark()
    }

    /// Take the most recently added value.
    pub(crate) fn pop(&mut self) -> Option<f64> {
        self.values.pop()
    }

    /// Append a batch of values to the pool, returning the number of values
    /// that were added.
    ///
    /// Values outside of `[0, 1)` are dropped. Sources validate their batches
    /// before they get here, so this should never drop anything.
    pub(crate) fn extend(&mut self, batch: impl IntoIterator<Item = f64>) -> usize {
        let before = self.values.len();
        self.values
            .extend(batch.into_iter().filter(|v| (0.0..1.0).contains(v)));
        self.values.len() - before
    }
}
