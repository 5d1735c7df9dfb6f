//! Sequential and thread-pool execution of per-item work.
//!
//! With the `parallel-processing` feature the [`Executor::Parallel`] variant
//! runs items on a dedicated rayon thread pool. Results always come back in
//! input order and the first failure in input order is reported.

use super::{BatchError, BatchResult};
use crate::AudioEventResult;
#[cfg(feature = "parallel-processing")]
use rayon::prelude::*;

/// How a batch of independent items is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Executor {
    /// One item after another on the calling thread.
    #[default]
    Sequential,
    /// Items spread over a rayon thread pool; `0` threads lets rayon decide.
    #[cfg(feature = "parallel-processing")]
    Parallel {
        /// Number of worker threads.
        num_threads: usize,
    },
}

impl Executor {
    /// Parallel executor with one thread per logical CPU.
    #[cfg(feature = "parallel-processing")]
    pub fn default_parallel() -> Self {
        Self::Parallel {
            num_threads: num_cpus::get(),
        }
    }

    /// Applies `f` to every input and collects the outputs in input order.
    ///
    /// # Errors
    /// Returns [`BatchError::ItemError`] for the lowest failing index, or
    /// [`BatchError::ExecutorError`] if the thread pool cannot be built.
    pub fn map<I, O, F>(&self, inputs: &[I], f: F) -> BatchResult<Vec<O>>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> AudioEventResult<O> + Sync + Send,
    {
        let results: Vec<AudioEventResult<O>> = match self {
            Self::Sequential => inputs.iter().map(&f).collect(),
            #[cfg(feature = "parallel-processing")]
            Self::Parallel { num_threads } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*num_threads)
                    .build()
                    .map_err(|e| {
                        BatchError::executor_error(format!("Thread pool creation failed: {e}"))
                    })?;
                pool.install(|| inputs.par_iter().map(&f).collect())
            }
        };
        tracing::debug!(executor = ?self, num_items = inputs.len(), "batch processed");

        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| result.map_err(|e| BatchError::item_error(index, e)))
            .collect()
    }
}
