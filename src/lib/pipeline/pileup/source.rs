//! Read sources over indexed alignment files.

use crate::core::error::{CellsnpError, Result};
use rust_htslib::bam::{self, Read, Record};
use std::path::PathBuf;

/// Region-addressable stream of alignment records.
pub trait ReadSource {
    /// Numeric id of a reference sequence, if the header has it.
    fn tid(&self, chrom: &str) -> Option<u32>;

    /// Restrict subsequent reads to records overlapping `[start, end)` on `tid`.
    fn fetch(&mut self, tid: u32, start: u64, end: u64) -> Result<()>;

    /// Fill `record` with the next fetched record; `None` when the region is exhausted.
    fn read(&mut self, record: &mut Record) -> Option<Result<()>>;
}

/// Opens one private set of sources, one per input, for each worker.
pub trait SourceOpener: Send + Sync {
    type Source: ReadSource;

    fn open_all(&self) -> Result<Vec<Self::Source>>;

    /// Number of inputs every call to `open_all` yields.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve a chromosome name, tolerating a missing or extra `chr` prefix.
pub fn resolve_tid<S: ReadSource + ?Sized>(source: &S, chrom: &str) -> Option<u32> {
    if let Some(tid) = source.tid(chrom) {
        return Some(tid);
    }
    match chrom.strip_prefix("chr") {
        Some(bare) => source.tid(bare),
        None => source.tid(&format!("chr{}", chrom)),
    }
}

impl ReadSource for bam::IndexedReader {
    #[inline]
    fn tid(&self, chrom: &str) -> Option<u32> {
        self.header().tid(chrom.as_bytes())
    }

    fn fetch(&mut self, tid: u32, start: u64, end: u64) -> Result<()> {
        bam::IndexedReader::fetch(self, (tid, start as i64, end as i64))?;
        Ok(())
    }

    #[inline]
    fn read(&mut self, record: &mut Record) -> Option<Result<()>> {
        Read::read(self, record).map(|r| r.map_err(CellsnpError::from))
    }
}

/// Opens indexed BAM/CRAM/SAM.gz files.
#[derive(Debug, Clone)]
pub struct HtsOpener {
    paths: Vec<PathBuf>,
}

impl HtsOpener {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl SourceOpener for HtsOpener {
    type Source = bam::IndexedReader;

    fn open_all(&self) -> Result<Vec<Self::Source>> {
        self.paths
            .iter()
            .map(|path| {
                bam::IndexedReader::from_path(path).map_err(|e| {
                    CellsnpError::InvalidInput(format!(
                        "cannot open indexed alignment file {}: {}",
                        path.display(),
                        e
                    ))
                })
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}
