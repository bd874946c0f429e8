//! Site-level aggregation, allele inference and site filters.

use crate::core::error::Result;
use crate::engine::position::{Snp, NUM_BASES};
use crate::pipeline::pileup::config::PileupConfig;
use crate::pipeline::pileup::genotype::{accumulate_quality_matrix, genotype_likelihoods};
use crate::pipeline::pileup::group::GroupTable;
use std::fmt;

/// Number of real nucleotides considered for allele inference (N excluded).
const NUM_NUCLEOTIDES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteReject {
    LowCount,
    LowMaf,
}

impl fmt::Display for SiteReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteReject::LowCount => f.write_str("total count below minimum"),
            SiteReject::LowMaf => f.write_str("minor allele frequency below minimum"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteVerdict {
    Pass,
    Reject(SiteReject),
}

/// Sums over every sample group for the current SNP.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteAggregate {
    pub base_counts: [u64; NUM_BASES],
    pub total: u64,
    /// Alleles used for AD/DP/OTH: supplied by the SNP list when both are known.
    pub ref_idx: usize,
    pub alt_idx: usize,
    pub inferred_ref: usize,
    pub inferred_alt: usize,
    pub ad: u64,
    pub dp: u64,
    pub oth: u64,
    /// Groups with a nonzero AD, DP and OTH respectively.
    pub nr_ad: u64,
    pub nr_dp: u64,
    pub nr_oth: u64,
}

impl SiteAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Most and second-most frequent of A, C, G, T. Equal counts go to the earlier base.
pub fn infer_alleles(counts: &[u64; NUM_BASES]) -> (usize, usize) {
    let mut order = [0usize, 1, 2, 3];
    // Stable sort keeps A < C < G < T among equal counts.
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    debug_assert!(order.iter().all(|&i| i < NUM_NUCLEOTIDES));
    (order[0], order[1])
}

/// Aggregate `table` into `aggregate` and apply the site filters.
///
/// Group totals and `aggregate.base_counts` are filled in even when the site
/// is rejected; AD/DP/OTH and likelihoods only for passing sites.
pub fn finalize(
    table: &mut GroupTable,
    snp: &Snp,
    config: &PileupConfig,
    aggregate: &mut SiteAggregate,
) -> Result<SiteVerdict> {
    for group in table.groups_mut().iter_mut() {
        group.total = group.base_counts.iter().sum();
        for (site, count) in aggregate.base_counts.iter_mut().zip(group.base_counts.iter()) {
            *site += count;
        }
    }
    aggregate.total = aggregate.base_counts.iter().sum();
    if aggregate.total < config.min_count {
        return Ok(SiteVerdict::Reject(SiteReject::LowCount));
    }

    let (inferred_ref, inferred_alt) = infer_alleles(&aggregate.base_counts);
    aggregate.inferred_ref = inferred_ref;
    aggregate.inferred_alt = inferred_alt;
    if (aggregate.base_counts[inferred_alt] as f64) < aggregate.total as f64 * config.min_maf {
        return Ok(SiteVerdict::Reject(SiteReject::LowMaf));
    }

    let (ref_idx, alt_idx) = snp
        .known_alleles()
        .unwrap_or((inferred_ref, inferred_alt));
    aggregate.ref_idx = ref_idx;
    aggregate.alt_idx = alt_idx;
    aggregate.ad = aggregate.base_counts[alt_idx];
    aggregate.dp = aggregate.base_counts[ref_idx] + aggregate.ad;
    aggregate.oth = aggregate.total.saturating_sub(aggregate.dp);

    for group in table.groups_mut().iter_mut() {
        group.ad = group.base_counts[alt_idx];
        group.dp = group.base_counts[ref_idx] + group.ad;
        group.oth = group.total.saturating_sub(group.dp);
        aggregate.nr_ad += (group.ad > 0) as u64;
        aggregate.nr_dp += (group.dp > 0) as u64;
        aggregate.nr_oth += (group.oth > 0) as u64;

        if config.genotype {
            accumulate_quality_matrix(group)?;
            group.likelihoods = genotype_likelihoods(&group.qual_matrix, ref_idx, alt_idx);
        }
    }
    Ok(SiteVerdict::Pass)
}
