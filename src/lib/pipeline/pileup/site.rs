//! Pileup of one SNP across every input.

use crate::core::error::{CellsnpError, Result};
use crate::core::read_filter::ReadReject;
use crate::engine::position::Snp;
use crate::pipeline::pileup::config::{Grouping, PileupConfig};
use crate::pipeline::pileup::group::{GroupKey, GroupTable, PushOutcome};
use crate::pipeline::pileup::resolver::{ReadResolver, Resolved};
use crate::pipeline::pileup::roster::SampleRoster;
use crate::pipeline::pileup::source::{resolve_tid, ReadSource};
use crate::pipeline::pileup::stats::{finalize, SiteAggregate, SiteReject, SiteVerdict};
use log::debug;
use rust_htslib::bam::Record;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOutcome {
    /// Counts are ready in [`SiteDriver::table`] and [`SiteDriver::aggregate`].
    Pass,
    Filtered(SiteReject),
}

/// Why reads and sites were dropped, summed per worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterTallies {
    pub reads: FxHashMap<ReadReject, u64>,
    pub duplicate_umis: u64,
    pub unknown_groups: u64,
    /// Source/SNP pairs skipped because the contig is absent from that source.
    pub missing_contigs: u64,
    pub sites: FxHashMap<SiteReject, u64>,
}

impl FilterTallies {
    pub fn merge(&mut self, other: &FilterTallies) {
        for (reason, n) in other.reads.iter() {
            *self.reads.entry(*reason).or_insert(0) += n;
        }
        for (reason, n) in other.sites.iter() {
            *self.sites.entry(*reason).or_insert(0) += n;
        }
        self.duplicate_umis += other.duplicate_umis;
        self.unknown_groups += other.unknown_groups;
        self.missing_contigs += other.missing_contigs;
    }

    pub fn sites_filtered(&self) -> u64 {
        self.sites.values().sum()
    }
}

/// Worker-owned state for piling up SNPs one at a time.
///
/// The group table, aggregate and record buffer are reused for every SNP.
pub struct SiteDriver {
    config: Arc<PileupConfig>,
    resolver: ReadResolver,
    table: GroupTable,
    aggregate: SiteAggregate,
    record: Record,
    tallies: FilterTallies,
}

impl SiteDriver {
    pub fn new(config: Arc<PileupConfig>, roster: &SampleRoster) -> Self {
        Self {
            resolver: ReadResolver::from_config(&config),
            table: GroupTable::prepare(roster, config.use_umi()),
            aggregate: SiteAggregate::new(),
            record: Record::new(),
            tallies: FilterTallies::default(),
            config,
        }
    }

    /// Pile up `snp` from every source. Source `i` is sample `i` in sample-ID mode.
    pub fn process_site<S: ReadSource>(
        &mut self,
        snp: &Snp,
        sources: &mut [S],
    ) -> Result<SiteOutcome> {
        self.table.reset();
        self.aggregate.reset();
        let pushed = self
            .collect(snp, sources)
            .map_err(|e| e.at_site(&snp.chrom, snp.pos))?;

        let verdict = if pushed < self.config.min_count {
            SiteVerdict::Reject(SiteReject::LowCount)
        } else {
            finalize(&mut self.table, snp, &self.config, &mut self.aggregate)
                .map_err(|e| e.at_site(&snp.chrom, snp.pos))?
        };
        match verdict {
            SiteVerdict::Pass => Ok(SiteOutcome::Pass),
            SiteVerdict::Reject(reason) => {
                debug!("Filtered SNP {}:{} ({})", snp.chrom, snp.pos1(), reason);
                *self.tallies.sites.entry(reason).or_insert(0) += 1;
                Ok(SiteOutcome::Filtered(reason))
            }
        }
    }

    /// Route every usable read into the group table; returns reads pushed
    /// (duplicates of an already-counted UMI included).
    fn collect<S: ReadSource>(&mut self, snp: &Snp, sources: &mut [S]) -> Result<u64> {
        let barcode_mode = matches!(self.config.grouping, Grouping::Barcodes { .. });
        let mut pushed = 0u64;
        for (index, source) in sources.iter_mut().enumerate() {
            let tid = match resolve_tid(&*source, &snp.chrom) {
                Some(tid) => tid,
                None => {
                    debug!(
                        "Contig {} absent from input {}, skipping it for {}:{}",
                        snp.chrom,
                        index,
                        snp.chrom,
                        snp.pos1()
                    );
                    self.tallies.missing_contigs += 1;
                    continue;
                }
            };
            source.fetch(tid, snp.pos, snp.pos + 1)?;

            while let Some(next) = source.read(&mut self.record) {
                next?;
                let pileup = match self.resolver.resolve(&self.record, snp.pos)? {
                    Resolved::Pileup(pileup) => pileup,
                    Resolved::Rejected(reason) => {
                        *self.tallies.reads.entry(reason).or_insert(0) += 1;
                        continue;
                    }
                };
                let key = if barcode_mode {
                    let barcode = pileup.cell_barcode.ok_or_else(|| {
                        CellsnpError::Roster("resolved read carries no cell barcode".to_string())
                    })?;
                    GroupKey::Barcode(barcode)
                } else {
                    GroupKey::Sample(index)
                };
                match self.table.push(&pileup, key)? {
                    PushOutcome::Counted => pushed += 1,
                    PushOutcome::DuplicateUmi => {
                        pushed += 1;
                        self.tallies.duplicate_umis += 1;
                    }
                    PushOutcome::UnknownGroup => self.tallies.unknown_groups += 1,
                }
            }
        }
        Ok(pushed)
    }

    pub fn table(&self) -> &GroupTable {
        &self.table
    }

    pub fn aggregate(&self) -> &SiteAggregate {
        &self.aggregate
    }

    pub fn tallies(&self) -> &FilterTallies {
        &self.tallies
    }

    pub fn config(&self) -> &PileupConfig {
        &self.config
    }
}
