//! Rayon thread pool configuration for raid simulations.
//!
//! Use [WorkerPool::install] to drive simulated teams on a fixed number of threads, or rely
//! on Rayon's default (all CPU cores).

use rayon::ThreadPoolBuilder;

/// Configures how many worker threads drive simulated teams.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use the global Rayon pool.
    pub workers: usize,
}

impl WorkerPool {
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Run a closure on a pool with this worker count. Falls back to the global pool when a
    /// dedicated one cannot be built.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            return f();
        }
        match ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool.install(f),
            Err(err) => {
                tracing::warn!(workers = self.workers, %err, "thread pool unavailable, using global pool");
                f()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::*;

    #[test]
    fn dedicated_pool_runs_closure() {
        let pool = WorkerPool::with_workers(2);
        let threads = pool.install(rayon::current_num_threads);
        assert_eq!(threads, 2);
    }

    #[test]
    fn default_pool_sums_in_parallel() {
        let total: u64 = WorkerPool::default().install(|| (1..=100u64).into_par_iter().sum());
        assert_eq!(total, 5050);
    }
}
