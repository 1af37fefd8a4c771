use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared cap on the number of records delivered to handlers in one run.
///
/// Reservations are atomic so the budget stays exact even if several shard
/// workers draw from it at once.
#[derive(Debug)]
pub struct RecordBudget {
    limit: Option<usize>,
    used: AtomicUsize,
}

impl RecordBudget {
    /// A budget of `limit` records; `None` is unlimited.
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    /// Records still available; `None` when unlimited.
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.limit
            .map(|limit| limit.saturating_sub(self.used.load(Ordering::Acquire)))
    }

    /// Whether no further record may be delivered.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// How many records the next fetch should ask for.
    #[must_use]
    pub fn fetch_limit(&self, batch_size: usize) -> usize {
        self.remaining()
            .map_or(batch_size, |remaining| remaining.min(batch_size))
    }

    /// Reserve up to `wanted` records and return how many were granted.
    pub fn reserve(&self, wanted: usize) -> usize {
        let Some(limit) = self.limit else {
            self.used.fetch_add(wanted, Ordering::AcqRel);
            return wanted;
        };
        let previous = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used + wanted.min(limit.saturating_sub(used)))
            })
            .unwrap_or_else(|used| used);
        wanted.min(limit.saturating_sub(previous))
    }

    /// Return records reserved for a batch the handler did not accept.
    pub fn release(&self, granted: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(granted))
            });
    }

    /// Records reserved so far.
    #[must_use]
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}
