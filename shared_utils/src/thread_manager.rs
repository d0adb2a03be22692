//! Worker-count policy for CPU-bound batch work
//!
//! Decode and encode run in-process, so the pool width is the whole budget:
//! there are no child processes to reserve threads for.

use std::sync::OnceLock;

/// Environment override for the worker count
pub const THREADS_ENV: &str = "HEIC_CONVERT_THREADS";

/// Cached optimal thread count for this system
static OPTIMAL_THREADS: OnceLock<usize> = OnceLock::new();

/// Configuration for thread allocation
#[derive(Debug, Clone)]
pub struct ThreadConfig {
    /// Percentage of cores to use (0-100)
    pub core_percentage: usize,
    /// Minimum threads to allocate
    pub min_threads: usize,
    /// Maximum threads to allocate
    pub max_threads: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            core_percentage: 80,
            min_threads: 1,
            max_threads: 16,
        }
    }
}

/// Calculate the worker count for `cpu_count` cores under `config`.
pub fn threads_for_cores(cpu_count: usize, config: &ThreadConfig) -> usize {
    // Leave one core for the OS and the progress UI once there is more than one
    let reserved = if cpu_count > 2 { 1 } else { 0 };
    let available = cpu_count.saturating_sub(reserved).max(1);

    let calculated = (available * config.core_percentage / 100).max(1);
    calculated.clamp(config.min_threads.max(1), config.max_threads.max(1))
}

/// Calculate optimal thread count based on system capabilities
pub fn calculate_optimal_threads(config: &ThreadConfig) -> usize {
    threads_for_cores(num_cpus::get(), config)
}

/// Parse a worker-count override; zero and garbage are ignored.
pub fn parse_thread_override(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

/// Get optimal threads for batch conversion (cached)
pub fn get_optimal_threads() -> usize {
    *OPTIMAL_THREADS.get_or_init(|| {
        if let Some(n) = std::env::var(THREADS_ENV)
            .ok()
            .as_deref()
            .and_then(parse_thread_override)
        {
            tracing::debug!(threads = n, "Worker count taken from {}", THREADS_ENV);
            return n;
        }
        calculate_optimal_threads(&ThreadConfig::default())
    })
}
