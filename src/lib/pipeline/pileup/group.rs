//! Per-sample accumulation of base observations at one SNP.

use crate::core::error::{CellsnpError, Result};
use crate::engine::position::NUM_BASES;
use crate::pipeline::pileup::resolver::PileupRecord;
use crate::pipeline::pileup::roster::SampleRoster;
use rustc_hash::FxHashSet;
use smartstring::alias::String as SmartString;

/// Number of genotype states tracked for each base in the quality matrix.
pub const QUAL_STATES: usize = 4;

/// Maximum number of genotype likelihoods (three diploid states plus two doublet states).
pub const MAX_LIKELIHOODS: usize = 5;

/// Counts and qualities for one cell or bulk sample at the current SNP.
#[derive(Debug, Clone)]
pub struct SampleGroup {
    pub base_counts: [u64; NUM_BASES],
    pub quals: [Vec<u8>; NUM_BASES],
    umis: Option<FxHashSet<SmartString>>,
    pub total: u64,
    pub ad: u64,
    pub dp: u64,
    pub oth: u64,
    /// Natural-log genotype likelihoods: 0/0, 1/0, 1/1, then the optional doublet states.
    pub likelihoods: [f64; MAX_LIKELIHOODS],
    pub qual_matrix: [[f64; QUAL_STATES]; NUM_BASES],
}

impl SampleGroup {
    pub(crate) fn new(use_umi: bool) -> Self {
        Self {
            base_counts: [0; NUM_BASES],
            quals: Default::default(),
            umis: use_umi.then(FxHashSet::default),
            total: 0,
            ad: 0,
            dp: 0,
            oth: 0,
            likelihoods: [0.0; MAX_LIKELIHOODS],
            qual_matrix: [[0.0; QUAL_STATES]; NUM_BASES],
        }
    }

    fn reset(&mut self) {
        self.base_counts = [0; NUM_BASES];
        for quals in self.quals.iter_mut() {
            quals.clear();
        }
        if let Some(umis) = self.umis.as_mut() {
            umis.clear();
        }
        self.total = 0;
        self.ad = 0;
        self.dp = 0;
        self.oth = 0;
        self.likelihoods = [0.0; MAX_LIKELIHOODS];
        self.qual_matrix = [[0.0; QUAL_STATES]; NUM_BASES];
    }

    /// Distinct UMIs seen at this SNP, when UMI grouping is on.
    pub fn umi_count(&self) -> Option<usize> {
        self.umis.as_ref().map(|u| u.len())
    }
}

/// How a resolved read is routed to its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey<'a> {
    /// Cell barcode from the read's tag.
    Barcode(&'a str),
    /// Index of the input file the read came from.
    Sample(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Counted,
    /// A read for an already-seen UMI; the first read per UMI is kept.
    DuplicateUmi,
    /// Barcode is not on the roster.
    UnknownGroup,
}

/// All sample groups of one worker, in roster order.
#[derive(Debug, Clone)]
pub struct GroupTable {
    roster: SampleRoster,
    groups: Vec<SampleGroup>,
}

impl GroupTable {
    pub fn prepare(roster: &SampleRoster, use_umi: bool) -> Self {
        Self {
            roster: roster.clone(),
            groups: (0..roster.len()).map(|_| SampleGroup::new(use_umi)).collect(),
        }
    }

    pub fn push(&mut self, record: &PileupRecord<'_>, key: GroupKey<'_>) -> Result<PushOutcome> {
        let index = match key {
            GroupKey::Barcode(barcode) => match self.roster.barcode_index(barcode) {
                Some(index) => index,
                None => return Ok(PushOutcome::UnknownGroup),
            },
            GroupKey::Sample(index) if index < self.groups.len() => index,
            GroupKey::Sample(index) => {
                return Err(CellsnpError::Roster(format!(
                    "input {} has no sample group ({} configured)",
                    index,
                    self.groups.len()
                )))
            }
        };

        let group = &mut self.groups[index];
        if let Some(umis) = group.umis.as_mut() {
            let umi = record.umi.ok_or_else(|| {
                CellsnpError::Roster(format!(
                    "read without UMI routed to UMI-grouped sample {}",
                    index
                ))
            })?;
            if umis.contains(umi) {
                return Ok(PushOutcome::DuplicateUmi);
            }
            umis.insert(SmartString::from(umi));
        }

        group.base_counts[record.base] += 1;
        group.quals[record.base].push(record.qual);
        Ok(PushOutcome::Counted)
    }

    /// Clear every group for the next SNP, keeping allocations.
    pub fn reset(&mut self) {
        for group in self.groups.iter_mut() {
            group.reset();
        }
    }

    pub fn groups(&self) -> &[SampleGroup] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [SampleGroup] {
        &mut self.groups
    }

    pub fn roster(&self) -> &SampleRoster {
        &self.roster
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
