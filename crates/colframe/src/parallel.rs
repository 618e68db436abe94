use std::ops::Range;

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::prelude::*;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::ThreadPool;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use std::sync::OnceLock;

/// Best-effort crate-local Rayon thread pool for sharded sort and aggregation work.
///
/// Rayon normally uses a **global** thread pool. Under extreme resource constraints, global pool
/// initialization can fail and Rayon will panic on first use. An embedding host cannot recover
/// from that, so we build our own pool and fall back to running shards on the calling thread if
/// no pool can be created.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn desired_rayon_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn build_rayon_pool() -> Option<ThreadPool> {
    let requested = desired_rayon_threads().max(1);
    let try_build = |n| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("colframe-worker-{i}"))
            .build()
    };

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::warn!("failed to build {requested}-thread worker pool ({err}); retrying with 1");
            try_build(1).ok()
        }
        Err(err) => {
            log::warn!("failed to build worker pool ({err}); shards will run sequentially");
            None
        }
    }
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_rayon_pool).as_ref()
}

/// Number of workers the pool can run concurrently (1 when no pool is available).
pub(crate) fn available_workers() -> usize {
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        rayon_pool().map(|p| p.current_num_threads()).unwrap_or(1)
    }
    #[cfg(not(all(feature = "parallel", not(target_arch = "wasm32"))))]
    {
        1
    }
}

/// Sharding pays off only with more than one worker and strictly more than `threshold` items.
pub(crate) fn should_shard(len: usize, workers: usize, threshold: usize) -> bool {
    workers > 1 && len > threshold
}

/// Split `0..len` into at most `workers` contiguous, non-empty ranges of near-equal size.
pub(crate) fn shard_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let shard = len.div_ceil(workers);
    (0..workers)
        .map(|w| (w * shard).min(len)..((w + 1) * shard).min(len))
        .filter(|r| !r.is_empty())
        .collect()
}

/// Run `f` over every task and return the results in task order.
///
/// Tasks are independent; the call returns once all of them have finished.
pub(crate) fn map_tasks<T, R, F>(tasks: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if tasks.len() > 1 {
            if let Some(pool) = rayon_pool() {
                return pool.install(|| tasks.into_par_iter().map(&f).collect());
            }
        }
    }
    tasks.into_iter().map(f).collect()
}

/// Apply `f` to each item; items are disjoint so they may be processed concurrently.
pub(crate) fn for_each_mut<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if items.len() > 1 {
            if let Some(pool) = rayon_pool() {
                pool.install(|| items.par_iter_mut().for_each(&f));
                return;
            }
        }
    }
    items.iter_mut().for_each(f);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_ranges_cover_input_without_overlap() {
        for (len, workers) in [(0, 4), (1, 8), (10, 3), (10, 10), (7, 2), (100, 8)] {
            let ranges = shard_ranges(len, workers);
            assert!(ranges.len() <= workers.max(1));
            let mut next = 0;
            for r in &ranges {
                assert_eq!(r.start, next);
                assert!(!r.is_empty());
                next = r.end;
            }
            assert_eq!(next, len);
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(!should_shard(50_000, 8, 50_000));
        assert!(should_shard(50_001, 8, 50_000));
        assert!(!should_shard(50_001, 1, 50_000));
        assert!(should_shard(1, 2, 0));
        assert!(!should_shard(0, 2, 0));
    }

    #[test]
    fn map_tasks_preserves_task_order() {
        let out = map_tasks((0..32).collect::<Vec<u32>>(), |x| x * 2);
        assert_eq!(out, (0..32).map(|x| x * 2).collect::<Vec<_>>());
    }
}
