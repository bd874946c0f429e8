//! cellsnp: allele counting at known SNP sites
//!
//! cellsnp piles up aligned reads at a list of candidate SNPs and counts, per
//! cell barcode or per bulk sample, how many reads (or UMIs) carry each base.
//! The library provides:
//! 1. Read resolution: the base and quality a read shows at a reference position
//! 2. Per-sample grouping with UMI deduplication
//! 3. Site statistics, allele inference and genotype likelihoods
//! 4. Parallel processing of the SNP list with worker-count-independent outputs
//!
//! # Modules
//!
//! - [`core`]: errors, I/O helpers, read filters and worker pools
//! - [`engine`]: SNP positions and the parallel shard coordinator
//! - [`pipeline`]: the pileup itself, from alignment records to output files

pub mod core;
pub mod engine;
pub mod pipeline;
