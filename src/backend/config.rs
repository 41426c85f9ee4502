//! Pool configuration.

/// Configuration for a [`PoolAllocator`](super::pool::PoolAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Blocks requested from the chunk pool when a size class runs dry.
    pub refill_batch: usize,

    /// Maximum out-of-memory handler calls per failed first-tier request.
    /// `None` retries for as long as a handler is installed.
    pub oom_retry_limit: Option<usize>,
}

impl PoolConfig {
    /// Default batch of blocks per refill.
    pub const DEFAULT_REFILL_BATCH: usize = 20;

    /// The default configuration, usable in const contexts.
    pub const DEFAULT: Self = Self {
        refill_batch: Self::DEFAULT_REFILL_BATCH,
        oom_retry_limit: None,
    };

    /// Small refill batches, for memory-constrained programs with many size classes.
    pub const fn compact() -> Self {
        Self {
            refill_batch: 4,
            oom_retry_limit: Some(1),
        }
    }

    /// Large refill batches, for allocation-heavy workloads.
    pub const fn throughput() -> Self {
        Self {
            refill_batch: 64,
            oom_retry_limit: None,
        }
    }

    /// Set the refill batch. Values below one are treated as one.
    #[must_use = "builder methods return a new value"]
    pub const fn with_refill_batch(mut self, batch: usize) -> Self {
        self.refill_batch = if batch == 0 { 1 } else { batch };
        self
    }

    /// Set the out-of-memory retry limit.
    #[must_use = "builder methods return a new value"]
    pub const fn with_oom_retry_limit(mut self, limit: Option<usize>) -> Self {
        self.oom_retry_limit = limit;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
