//! Record builders and an in-memory read source shared by the pileup tests.

use crate::core::error::{CellsnpError, Result};
use crate::pipeline::pileup::group::SampleGroup;
use crate::pipeline::pileup::source::{ReadSource, SourceOpener};
use rust_htslib::bam::record::{Aux, Cigar, CigarString, Record};
use std::sync::Arc;

pub(crate) const TEST_QUAL: u8 = 30;

pub(crate) fn read_at(tid: i32, pos: i64, cigar: Vec<Cigar>, seq: &[u8], mapq: u8) -> Record {
    let mut record = Record::new();
    let qual = vec![TEST_QUAL; seq.len()];
    record.set(b"read", Some(&CigarString(cigar)), seq, &qual);
    record.set_tid(tid);
    record.set_pos(pos);
    record.set_mapq(mapq);
    record.set_flags(0);
    record
}

/// A 40M read on tid 0 whose sixth base sits on `snp_pos`.
pub(crate) fn snp_read(snp_pos: i64, base: u8, cb: Option<&str>, umi: Option<&str>) -> Record {
    let mut seq = vec![b'A'; 40];
    seq[5] = base;
    let mut record = read_at(0, snp_pos - 5, vec![Cigar::Match(40)], &seq, 60);
    if let Some(cb) = cb {
        record.push_aux(b"CB", Aux::String(cb)).unwrap();
    }
    if let Some(umi) = umi {
        record.push_aux(b"UR", Aux::String(umi)).unwrap();
    }
    record
}

pub(crate) fn alignments(contigs: &[&str], records: Vec<Record>) -> MemoryAlignments {
    MemoryAlignments {
        contigs: contigs.iter().map(|c| c.to_string()).collect(),
        records,
    }
}

pub(crate) fn empty_group() -> SampleGroup {
    SampleGroup::new(false)
}

/// Records and contig names backing a [`MemorySource`].
#[derive(Debug, Default)]
pub(crate) struct MemoryAlignments {
    pub contigs: Vec<String>,
    pub records: Vec<Record>,
}

/// In-memory read source with the same overlap semantics as an indexed file.
#[derive(Debug, Clone)]
pub(crate) struct MemorySource {
    data: Arc<MemoryAlignments>,
    hits: Vec<usize>,
    cursor: usize,
}

impl MemorySource {
    pub(crate) fn new(data: Arc<MemoryAlignments>) -> Self {
        Self {
            data,
            hits: Vec::new(),
            cursor: 0,
        }
    }
}

/// Reference end as htslib computes it: unplaced records cover one base.
fn end_pos(record: &Record) -> i64 {
    if record.is_unmapped() || record.cigar_len() == 0 {
        record.pos() + 1
    } else {
        record.cigar().end_pos()
    }
}

impl ReadSource for MemorySource {
    fn tid(&self, chrom: &str) -> Option<u32> {
        self.data
            .contigs
            .iter()
            .position(|c| c == chrom)
            .map(|i| i as u32)
    }

    fn fetch(&mut self, tid: u32, start: u64, end: u64) -> Result<()> {
        if tid as usize >= self.data.contigs.len() {
            return Err(CellsnpError::InvalidInput(format!(
                "unknown reference id {}",
                tid
            )));
        }
        let (start, end) = (start as i64, end as i64);
        self.hits.clear();
        self.cursor = 0;
        for (i, record) in self.data.records.iter().enumerate() {
            if record.tid() == tid as i32 && record.pos() < end && end_pos(record) > start {
                self.hits.push(i);
            }
        }
        Ok(())
    }

    fn read(&mut self, record: &mut Record) -> Option<Result<()>> {
        let index = *self.hits.get(self.cursor)?;
        self.cursor += 1;
        *record = self.data.records[index].clone();
        Some(Ok(()))
    }
}

/// Hands every worker its own cursor over shared in-memory inputs.
#[derive(Debug, Clone)]
pub(crate) struct MemoryOpener {
    inputs: Vec<Arc<MemoryAlignments>>,
}

impl MemoryOpener {
    pub(crate) fn new(inputs: Vec<MemoryAlignments>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Arc::new).collect(),
        }
    }
}

impl SourceOpener for MemoryOpener {
    type Source = MemorySource;

    fn open_all(&self) -> Result<Vec<Self::Source>> {
        Ok(self.inputs.iter().cloned().map(MemorySource::new).collect())
    }

    fn len(&self) -> usize {
        self.inputs.len()
    }
}

mod tests {
    use super::*;

    fn drain(source: &mut MemorySource) -> Vec<i64> {
        let mut record = Record::new();
        let mut starts = Vec::new();
        while let Some(r) = source.read(&mut record) {
            r.unwrap();
            starts.push(record.pos());
        }
        starts
    }

    #[test]
    fn fetch_returns_overlapping_records_only() {
        let data = alignments(
            &["1"],
            vec![
                snp_read(100, b'A', None, None), // covers 95..135
                snp_read(200, b'A', None, None), // covers 195..235
            ],
        );
        let mut source = MemorySource::new(Arc::new(data));
        source.fetch(0, 134, 135).unwrap();
        assert_eq!(drain(&mut source), vec![95]);
        source.fetch(0, 135, 136).unwrap();
        assert!(drain(&mut source).is_empty());
        source.fetch(0, 200, 201).unwrap();
        assert_eq!(drain(&mut source), vec![195]);
    }

    #[test]
    fn unplaced_mates_overlap_one_base() {
        let mut mate = read_at(0, 100, Vec::new(), b"ACGTACGTAC", 0);
        mate.set_flags(0x85);
        let mut source = MemorySource::new(Arc::new(alignments(&["1"], vec![mate])));
        source.fetch(0, 100, 101).unwrap();
        assert_eq!(drain(&mut source), vec![100]);
        source.fetch(0, 101, 102).unwrap();
        assert!(drain(&mut source).is_empty());
    }

    #[test]
    fn opener_gives_independent_cursors() {
        let opener = MemoryOpener::new(vec![alignments(
            &["1"],
            vec![snp_read(100, b'A', None, None)],
        )]);
        let mut first = opener.open_all().unwrap();
        let mut second = opener.open_all().unwrap();
        first[0].fetch(0, 100, 101).unwrap();
        second[0].fetch(0, 100, 101).unwrap();
        assert_eq!(drain(&mut first[0]).len(), 1);
        assert_eq!(drain(&mut second[0]).len(), 1);
        assert_eq!(opener.len(), 1);
    }
}
