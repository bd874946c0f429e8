use crate::core::error::{CellsnpError, Result};
use log::{error, warn};

/// Validate and normalize a requested worker count.
pub fn determine_allowed_cpus(desired: usize) -> Result<usize> {
    if desired == 0 {
        error!("Must select > 0 threads");
        Err(CellsnpError::Config(
            "Too few threads selected. Min 1".to_string(),
        ))
    } else if desired > num_cpus::get() {
        warn!(
            "Specified more threads than are available, using {}",
            desired
        );
        Ok(desired)
    } else {
        Ok(desired)
    }
}

/// Build a dedicated Rayon pool with exactly `workers` threads.
///
/// `workers` is taken as already resolved by [`determine_allowed_cpus`].
pub fn build_worker_pool(workers: usize) -> Result<rayon::ThreadPool> {
    if workers == 0 {
        return Err(CellsnpError::Config(
            "Worker pool needs at least one thread".to_string(),
        ));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("cellsnp-worker-{}", i))
        .build()
        .map_err(|e| CellsnpError::Config(format!("Failed to build worker pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        assert!(determine_allowed_cpus(0).is_err());
    }

    #[test]
    fn oversubscription_is_allowed() {
        let many = num_cpus::get() + 4;
        assert_eq!(determine_allowed_cpus(many).unwrap(), many);
    }

    #[test]
    fn pool_has_requested_size() {
        let pool = build_worker_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }

    #[test]
    fn pool_takes_a_resolved_count_as_is() {
        let many = determine_allowed_cpus(num_cpus::get() + 2).unwrap();
        let pool = build_worker_pool(many).unwrap();
        assert_eq!(pool.current_num_threads(), many);
        assert!(build_worker_pool(0).is_err());
    }
}
