//! SNP pileup: from alignment records to per-sample allele counts.
//!
//! A site is processed leaves first: [`resolver`] turns each fetched read into
//! a base observation, [`group`] deduplicates and counts observations per
//! sample, [`stats`] and [`genotype`] derive AD/DP/OTH and likelihoods, and
//! [`site`] drives one SNP through all of it before [`writer`] records it.

pub mod config;
pub mod genotype;
pub mod group;
pub mod resolver;
pub mod roster;
pub mod site;
pub mod source;
pub mod stats;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Grouping, PileupConfig};
pub use group::{GroupKey, GroupTable, PushOutcome, SampleGroup};
pub use resolver::{PileupRecord, ReadResolver, Resolved};
pub use roster::SampleRoster;
pub use site::{FilterTallies, SiteDriver, SiteOutcome};
pub use source::{HtsOpener, ReadSource, SourceOpener};
pub use stats::{SiteAggregate, SiteReject, SiteVerdict};
pub use writer::{OutputLayout, SiteFiles, SiteWriter, WriteMode, WriterTotals};
