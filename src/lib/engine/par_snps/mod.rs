//! Parallel SNP-list processing.
//!
//! The [`ShardCoordinator`] cuts the SNP list into contiguous shards, runs one
//! pileup worker per shard on a Rayon pool and collects each shard's totals
//! through a crossbeam channel. Shards write private fragments that are merged
//! in shard order, so outputs do not depend on the number of workers.

mod merge;
mod scheduler;
mod types;

pub use merge::{merge_mtx, merge_vcf, rewrite_mtx, MergeCounts};
pub use scheduler::ShardCoordinator;
pub use types::{split_shards, MergedOutput, RunState, Shard, ShardResult};
