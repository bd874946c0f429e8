//! Resolve the base a read reports at one reference position.
//!
//! The resolver walks the CIGAR of a fetched read instead of relying on the
//! htslib pileup engine: every SNP is fetched as its own one-base region, so a
//! direct walk is cheaper than building a pileup column per site.

use crate::core::error::{CellsnpError, Result};
use crate::core::read_filter::{DefaultReadFilter, ReadFilter, ReadReject};
use crate::engine::position::nt16_index;
use crate::pipeline::pileup::config::PileupConfig;
use rust_htslib::bam::record::{Aux, Cigar, Record};

/// What one read shows at the target position. Borrows tag values from the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupRecord<'r> {
    /// Offset of the site within the stored query sequence.
    pub qpos: usize,
    /// Index into `A, C, G, T, N`.
    pub base: usize,
    pub qual: u8,
    pub is_del: bool,
    pub is_refskip: bool,
    /// Aligned (M/=/X) bases over the whole read.
    pub aligned_len: u32,
    pub cell_barcode: Option<&'r str>,
    pub umi: Option<&'r str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<'r> {
    Pileup(PileupRecord<'r>),
    Rejected(ReadReject),
}

/// Where the target position fell within the CIGAR.
struct SiteHit {
    /// Index of the operation covering the target.
    op_index: usize,
    op: Cigar,
    /// Reference coordinate at the start of that operation.
    ref_start: i64,
    /// Query coordinate at the start of that operation.
    query_start: i64,
}

/// Per-read filter and CIGAR resolver.
#[derive(Debug, Clone)]
pub struct ReadResolver<F: ReadFilter = DefaultReadFilter> {
    filter: F,
    umi_tag: Option<Vec<u8>>,
    cell_tag: Option<Vec<u8>>,
}

impl ReadResolver<DefaultReadFilter> {
    pub fn from_config(config: &PileupConfig) -> Self {
        Self::new(
            config.read_filter(),
            config.umi_tag.as_deref(),
            config.cell_tag(),
        )
    }
}

impl<F: ReadFilter> ReadResolver<F> {
    pub fn new(filter: F, umi_tag: Option<&str>, cell_tag: Option<&str>) -> Self {
        Self {
            filter,
            umi_tag: umi_tag.map(|t| t.as_bytes().to_vec()),
            cell_tag: cell_tag.map(|t| t.as_bytes().to_vec()),
        }
    }

    /// Resolve `record` at the 0-based reference position `target`.
    ///
    /// Filter failures come back as [`Resolved::Rejected`]; `Err` means the
    /// record itself is inconsistent with the request.
    pub fn resolve<'r>(&self, record: &'r Record, target: u64) -> Result<Resolved<'r>> {
        let umi = match &self.umi_tag {
            Some(tag) => match string_tag(record, tag) {
                Some(umi) => Some(umi),
                None => return Ok(Resolved::Rejected(ReadReject::MissingUmi)),
            },
            None => None,
        };
        let cell_barcode = match &self.cell_tag {
            Some(tag) => match string_tag(record, tag) {
                Some(cb) => Some(cb),
                None => return Ok(Resolved::Rejected(ReadReject::MissingCellBarcode)),
            },
            None => None,
        };
        if let Err(reject) = self.filter.filter_read(record) {
            return Ok(Resolved::Rejected(reject));
        }

        let target = i64::try_from(target)
            .map_err(|_| malformed(record, format!("target position {} overflows", target)))?;
        if record.pos() < 0 || record.pos() > target {
            return Err(malformed(
                record,
                format!(
                    "read starts at {} which is after target {}",
                    record.pos(),
                    target
                ),
            ));
        }

        let cigar = record.cigar();
        let mut x = record.pos();
        let mut y: i64 = 0;
        let mut aligned_len: u32 = 0;
        let mut hit = None;
        for (op_index, op) in cigar.iter().enumerate() {
            let (ref_start, query_start) = (x, y);
            match *op {
                Cigar::Match(l) | Cigar::Equal(l) | Cigar::Diff(l) => {
                    x += l as i64;
                    y += l as i64;
                    aligned_len += l;
                }
                Cigar::Del(l) | Cigar::RefSkip(l) => x += l as i64,
                Cigar::Ins(l) | Cigar::SoftClip(l) => y += l as i64,
                Cigar::HardClip(_) | Cigar::Pad(_) => {}
            }
            if x > target {
                hit = Some(SiteHit {
                    op_index,
                    op: *op,
                    ref_start,
                    query_start,
                });
                break;
            }
        }

        let hit = hit.ok_or_else(|| {
            malformed(
                record,
                format!("alignment ending at {} does not cover {}", x, target),
            )
        })?;

        let (qpos, is_del, is_refskip) = match hit.op {
            Cigar::Match(_) | Cigar::Equal(_) | Cigar::Diff(_) => {
                ((hit.query_start + (target - hit.ref_start)) as usize, false, false)
            }
            Cigar::Del(_) => (hit.query_start as usize, true, false),
            Cigar::RefSkip(_) => (hit.query_start as usize, false, true),
            other => {
                return Err(malformed(
                    record,
                    format!("operation {} cannot cover a reference position", other),
                ))
            }
        };
        if is_del {
            return Ok(Resolved::Rejected(ReadReject::Deletion));
        }
        if is_refskip {
            return Ok(Resolved::Rejected(ReadReject::RefSkip));
        }

        // The length filter counts aligned bases over the whole read.
        for op in cigar.iter().skip(hit.op_index + 1) {
            if let Cigar::Match(l) | Cigar::Equal(l) | Cigar::Diff(l) = *op {
                aligned_len += l;
            }
        }
        if let Err(reject) = self.filter.filter_aligned_len(aligned_len) {
            return Ok(Resolved::Rejected(reject));
        }

        let seq_len = record.seq_len();
        if seq_len == 0 {
            return Ok(Resolved::Rejected(ReadReject::MissingSequence));
        }
        if qpos >= seq_len {
            return Err(malformed(
                record,
                format!("query offset {} beyond sequence length {}", qpos, seq_len),
            ));
        }

        Ok(Resolved::Pileup(PileupRecord {
            qpos,
            base: nt16_index(record.seq().encoded_base(qpos)),
            qual: record.qual()[qpos],
            is_del,
            is_refskip,
            aligned_len,
            cell_barcode,
            umi,
        }))
    }
}

/// String-valued aux tag, treating empty values as absent.
#[inline]
fn string_tag<'r>(record: &'r Record, tag: &[u8]) -> Option<&'r str> {
    match record.aux(tag) {
        Ok(Aux::String(value)) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn malformed(record: &Record, reason: String) -> CellsnpError {
    CellsnpError::MalformedRecord {
        qname: String::from_utf8_lossy(record.qname()).into_owned(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pileup::testing::{read_at, snp_read};
    use rust_htslib::bam::record::Cigar::*;

    fn resolver(umi: Option<&str>, cell: Option<&str>) -> ReadResolver {
        ReadResolver::new(DefaultReadFilter::new(20, 255, 30), umi, cell)
    }

    fn pileup(resolved: Resolved<'_>) -> PileupRecord<'_> {
        match resolved {
            Resolved::Pileup(p) => p,
            Resolved::Rejected(r) => panic!("unexpected reject: {}", r),
        }
    }

    #[test]
    fn resolves_base_inside_match() {
        let record = snp_read(100, b'G', Some("AAAC"), Some("UMI1"));
        let p = pileup(resolver(Some("UR"), Some("CB")).resolve(&record, 100).unwrap());
        assert_eq!(p.base, 2);
        assert_eq!(p.qpos, 5);
        assert_eq!(p.cell_barcode, Some("AAAC"));
        assert_eq!(p.umi, Some("UMI1"));
        assert_eq!(p.aligned_len, 40);
    }

    #[test]
    fn soft_clips_and_insertions_shift_the_query_offset() {
        // 3S 10M 2I 20M 5S starting at 50; target 62 lies in the second match block.
        let cigar = vec![SoftClip(3), Match(10), Ins(2), Match(20), SoftClip(5)];
        let mut seq = vec![b'A'; 40];
        seq[3 + 10 + 2 + 2] = b'T';
        let record = read_at(0, 50, cigar, &seq, 60);
        let p = pileup(resolver(None, None).resolve(&record, 62).unwrap());
        assert_eq!(p.qpos, 17);
        assert_eq!(p.base, 3);
        assert_eq!(p.aligned_len, 30);
    }

    #[test]
    fn aligned_length_counts_operations_after_the_site() {
        // Only 10 aligned bases precede the site; the remainder comes after it.
        let cigar = vec![Match(10), Del(4), Match(25)];
        let record = read_at(0, 100, cigar, &[b'C'; 35], 60);
        let p = pileup(resolver(None, None).resolve(&record, 105).unwrap());
        assert_eq!(p.aligned_len, 35);
    }

    #[test]
    fn deletion_and_refskip_are_rejected() {
        let del = read_at(0, 100, vec![Match(20), Del(3), Match(20)], &[b'A'; 40], 60);
        assert_eq!(
            resolver(None, None).resolve(&del, 121).unwrap(),
            Resolved::Rejected(ReadReject::Deletion)
        );
        let skip = read_at(0, 100, vec![Match(20), RefSkip(500), Match(20)], &[b'A'; 40], 60);
        assert_eq!(
            resolver(None, None).resolve(&skip, 300).unwrap(),
            Resolved::Rejected(ReadReject::RefSkip)
        );
    }

    #[test]
    fn filters_apply_in_order() {
        // Missing UMI wins over the low mapping quality.
        let mut record = snp_read(100, b'A', Some("AAAC"), None);
        record.set_mapq(0);
        assert_eq!(
            resolver(Some("UR"), Some("CB")).resolve(&record, 100).unwrap(),
            Resolved::Rejected(ReadReject::MissingUmi)
        );
        let record = snp_read(100, b'A', None, Some("U1"));
        assert_eq!(
            resolver(Some("UR"), Some("CB")).resolve(&record, 100).unwrap(),
            Resolved::Rejected(ReadReject::MissingCellBarcode)
        );
        let mut record = snp_read(100, b'A', Some("AAAC"), Some("U1"));
        record.set_mapq(5);
        assert_eq!(
            resolver(Some("UR"), Some("CB")).resolve(&record, 100).unwrap(),
            Resolved::Rejected(ReadReject::LowMappingQuality)
        );
        let mut record = snp_read(100, b'A', Some("AAAC"), Some("U1"));
        record.set_flags(1024);
        assert_eq!(
            resolver(Some("UR"), Some("CB")).resolve(&record, 100).unwrap(),
            Resolved::Rejected(ReadReject::FlagAboveMax)
        );
    }

    #[test]
    fn empty_tags_count_as_missing() {
        let record = snp_read(100, b'A', Some(""), Some("U1"));
        assert_eq!(
            resolver(Some("UR"), Some("CB")).resolve(&record, 100).unwrap(),
            Resolved::Rejected(ReadReject::MissingCellBarcode)
        );
    }

    #[test]
    fn short_alignments_are_rejected() {
        let record = read_at(0, 100, vec![SoftClip(20), Match(20)], &[b'A'; 40], 60);
        assert_eq!(
            resolver(None, None).resolve(&record, 105).unwrap(),
            Resolved::Rejected(ReadReject::ShortAlignment)
        );
    }

    #[test]
    fn cigar_not_reaching_the_target_is_an_error() {
        let record = read_at(0, 100, vec![Match(40)], &[b'A'; 40], 60);
        let err = resolver(None, None).resolve(&record, 140).unwrap_err();
        assert!(matches!(err, CellsnpError::MalformedRecord { .. }));
    }

    #[test]
    fn target_before_read_start_is_an_error() {
        let record = read_at(0, 100, vec![Match(40)], &[b'A'; 40], 60);
        assert!(resolver(None, None).resolve(&record, 99).is_err());
    }
}
