use crate::pipeline::pileup::site::FilterTallies;
use crate::pipeline::pileup::writer::SiteFiles;
use std::fmt;
use std::ops::Range;

/// Lifecycle of a [`super::ShardCoordinator`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Sharding,
    WorkersRunning,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Sharding => "sharding",
            RunState::WorkersRunning => "workers running",
            RunState::Merging => "merging",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A contiguous run of SNPs handled by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub index: usize,
    pub range: Range<usize>,
}

impl Shard {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Split `n` SNPs over `workers`: equal `n / workers` ranges, remainder to the last.
///
/// Never yields more shards than SNPs, and always at least one shard.
pub fn split_shards(n: usize, workers: usize) -> Vec<Shard> {
    let workers = workers.min(n).max(1);
    let size = n / workers;
    (0..workers)
        .map(|index| {
            let start = index * size;
            let end = if index + 1 == workers { n } else { start + size };
            Shard {
                index,
                range: start..end,
            }
        })
        .collect()
}

/// What one worker reports back over the result channel.
#[derive(Debug, Clone)]
pub struct ShardResult {
    pub shard: usize,
    /// SNPs piled up, passing or not.
    pub processed: u64,
    /// SNPs written to the outputs.
    pub passed: u64,
    /// Nonzero matrix entries for AD, DP, OTH.
    pub records: [u64; 3],
    pub tallies: FilterTallies,
    /// Fragment files, when the shard did not write the final outputs directly.
    pub fragments: Option<SiteFiles>,
}

/// Totals of a completed run.
#[derive(Debug, Clone)]
pub struct MergedOutput {
    pub snps: usize,
    pub sites: u64,
    pub samples: usize,
    pub records: [u64; 3],
    pub tallies: FilterTallies,
}
