//! Splitting the integer m/z range into `iterations x threads` shards.

use crate::codec::MzScale;
use crate::shard::{ShardId, ShardSpec};

/// Memory iterations needed for `size_bytes` of input, at least one.
pub fn iteration_count(size_bytes: u64, max_bytes_per_iteration: u64) -> usize {
    let max = max_bytes_per_iteration.max(1);
    size_bytes.div_ceil(max).max(1) as usize
}

/// `round(k * total / parts)`, ties rounding down.
fn boundary(k: u64, total: u64, parts: u64) -> u64 {
    let num = k as u128 * total as u128;
    let parts = parts as u128;
    let (q, rem) = (num / parts, num % parts);
    (if 2 * rem > parts { q + 1 } else { q }) as u64
}

/// Line ranges `[start, end)` splitting `[first, first + lines)` into `parts`.
fn split(first: u64, lines: u64, parts: usize) -> Vec<(u64, u64)> {
    let parts = parts.max(1) as u64;
    (0..parts)
        .map(|k| {
            (
                first + boundary(k, lines, parts),
                first + boundary(k + 1, lines, parts),
            )
        })
        .collect()
}

/// Shards of every iteration, in m/z order.
///
/// Lines are first split across iterations, then each iteration's lines across
/// threads. Shards that would cover no lines are left out, except that a plan
/// over an empty range keeps one empty shard so every artifact set still gets
/// (empty) files and a header.
#[derive(Debug, Clone)]
pub struct ShardPlan {
    lower: i64,
    upper: i64,
    total_lines: u64,
    iterations: Vec<Vec<ShardSpec>>,
}

impl ShardPlan {
    /// Plan `[lower, upper)` on `scale` with the given routing tolerance.
    pub fn new(
        lower: i64,
        upper: i64,
        scale: &MzScale,
        iterations: usize,
        threads: usize,
        tolerance: f64,
    ) -> Self {
        let total_lines = scale.line_count(lower, upper);
        let step = scale.step();
        let to_int = |line: u64| lower + line as i64 * step;

        let mut plan = Vec::new();
        if total_lines == 0 {
            plan.push(vec![ShardSpec::new(
                ShardId::new(0, 0),
                lower,
                lower,
                scale,
                tolerance,
            )]);
        } else {
            for (start, end) in split(0, total_lines, iterations) {
                if start == end {
                    continue;
                }
                let iteration = plan.len();
                let shards: Vec<ShardSpec> = split(start, end - start, threads)
                    .into_iter()
                    .filter(|(s, e)| s < e)
                    .enumerate()
                    .map(|(index, (s, e))| {
                        ShardSpec::new(
                            ShardId::new(iteration, index),
                            to_int(s),
                            to_int(e),
                            scale,
                            tolerance,
                        )
                    })
                    .collect();
                plan.push(shards);
            }
        }

        Self {
            lower,
            upper,
            total_lines,
            iterations: plan,
        }
    }

    /// First integer m/z.
    pub fn lower(&self) -> i64 {
        self.lower
    }

    /// Integer m/z bound (exclusive).
    pub fn upper(&self) -> i64 {
        self.upper
    }

    /// Lines per level.
    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    /// Iterations with at least one shard.
    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    /// Shards of one iteration.
    pub fn iteration(&self, iteration: usize) -> &[ShardSpec] {
        self.iterations
            .get(iteration)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All shards in m/z order.
    pub fn shards(&self) -> impl Iterator<Item = &ShardSpec> {
        self.iterations.iter().flatten()
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.iterations.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::OVERLAP_TOLERANCE;
    use proptest::prelude::*;

    fn scale() -> MzScale {
        MzScale::new(1000, 0.01).unwrap()
    }

    #[test]
    fn test_iteration_count() {
        assert_eq!(iteration_count(0, 100), 1);
        assert_eq!(iteration_count(100, 100), 1);
        assert_eq!(iteration_count(101, 100), 2);
        assert_eq!(iteration_count(5000, 1000), 5);
    }

    #[test]
    fn test_two_threads_split_evenly() {
        let plan = ShardPlan::new(400_000, 410_000, &scale(), 1, 2, OVERLAP_TOLERANCE);
        let shards: Vec<_> = plan.shards().collect();
        assert_eq!(shards.len(), 2);
        assert_eq!((shards[0].lower, shards[0].upper), (400_000, 405_000));
        assert_eq!((shards[1].lower, shards[1].upper), (405_000, 410_000));
        assert_eq!(shards[1].lower_threshold, 404.0);
        assert_eq!(shards[1].upper_threshold, 411.0);
    }

    #[test]
    fn test_more_threads_than_lines() {
        let plan = ShardPlan::new(400_000, 400_030, &scale(), 2, 4, OVERLAP_TOLERANCE);
        assert_eq!(plan.total_lines(), 3);
        assert_eq!(plan.iteration_count(), 2);
        assert_eq!(plan.shard_count(), 3);
        for shard in plan.shards() {
            assert_eq!(shard.line_count(&scale()), 1);
        }
    }

    #[test]
    fn test_empty_range_keeps_one_shard() {
        let plan = ShardPlan::new(0, 0, &scale(), 3, 3, OVERLAP_TOLERANCE);
        assert_eq!(plan.shard_count(), 1);
        assert_eq!(plan.iteration(0)[0].line_count(&scale()), 0);
        assert!(plan.iteration(1).is_empty());
    }

    proptest! {
        #[test]
        fn prop_every_line_assigned_once(
            start in 0i64..100_000,
            lines in 0u64..5_000,
            iterations in 1usize..8,
            threads in 1usize..9,
        ) {
            let scale = scale();
            let lower = start * scale.step();
            let upper = lower + lines as i64 * scale.step();
            let plan = ShardPlan::new(lower, upper, &scale, iterations, threads, OVERLAP_TOLERANCE);

            let mut cursor = lower;
            for shard in plan.shards() {
                prop_assert_eq!(shard.lower, cursor);
                prop_assert!(shard.upper >= shard.lower);
                prop_assert_eq!((shard.upper - shard.lower) % scale.step(), 0);
                cursor = shard.upper;
            }
            prop_assert_eq!(cursor, upper);
            prop_assert!(plan.iteration_count() <= iterations);
            for i in 0..plan.iteration_count() {
                prop_assert!(plan.iteration(i).len() <= threads);
            }
        }
    }
}
