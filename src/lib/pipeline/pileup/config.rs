//! Run configuration for the pileup engine.

use crate::core::read_filter::DefaultReadFilter;

pub const DEFAULT_CELL_TAG: &str = "CB";
pub const DEFAULT_UMI_TAG: &str = "UR";
pub const DEFAULT_MIN_COUNT: u64 = 20;
pub const DEFAULT_MIN_MAF: f64 = 0.0;
pub const DEFAULT_MIN_LEN: u32 = 30;
pub const DEFAULT_MIN_MAPQ: u8 = 20;
pub const DEFAULT_MAX_FLAG: u16 = 255;

/// How reads are assigned to sample groups. Exactly one strategy per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// Single input with cells identified by a barcode tag.
    Barcodes { cell_tag: String },
    /// One bulk sample per input file, in input order.
    SampleIds,
}

/// Read-only settings shared by every worker.
#[derive(Debug, Clone)]
pub struct PileupConfig {
    pub grouping: Grouping,
    /// UMI tag; `None` counts reads instead of molecules.
    pub umi_tag: Option<String>,
    pub min_count: u64,
    pub min_maf: f64,
    pub min_len: u32,
    pub min_mapq: u8,
    pub max_flag: u16,
    pub genotype: bool,
    /// Also report likelihoods for the doublet states GT=0.5 and GT=1.5.
    pub doublet_gl: bool,
}

impl Default for PileupConfig {
    fn default() -> Self {
        Self {
            grouping: Grouping::Barcodes {
                cell_tag: DEFAULT_CELL_TAG.to_string(),
            },
            umi_tag: Some(DEFAULT_UMI_TAG.to_string()),
            min_count: DEFAULT_MIN_COUNT,
            min_maf: DEFAULT_MIN_MAF,
            min_len: DEFAULT_MIN_LEN,
            min_mapq: DEFAULT_MIN_MAPQ,
            max_flag: DEFAULT_MAX_FLAG,
            genotype: false,
            doublet_gl: false,
        }
    }
}

impl PileupConfig {
    #[inline]
    pub fn use_umi(&self) -> bool {
        self.umi_tag.is_some()
    }

    #[inline]
    pub fn cell_tag(&self) -> Option<&str> {
        match &self.grouping {
            Grouping::Barcodes { cell_tag } => Some(cell_tag.as_str()),
            Grouping::SampleIds => None,
        }
    }

    pub fn read_filter(&self) -> DefaultReadFilter {
        DefaultReadFilter::new(self.min_mapq, self.max_flag, self.min_len)
    }
}
