//! Candidate SNP sites.

use super::base_index;
use smartstring::alias::String;

/// A candidate SNP site. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snp {
    /// Chromosome name as written in the regions file.
    pub chrom: String,
    /// 0-based position.
    pub pos: u64,
    /// Reference base, when the regions file gives a single-base REF.
    pub ref_base: Option<u8>,
    /// Alternative base, when the first ALT allele is a single base.
    pub alt_base: Option<u8>,
}

impl Snp {
    pub fn new(chrom: &str, pos: u64, ref_base: Option<u8>, alt_base: Option<u8>) -> Self {
        Self {
            chrom: String::from(chrom),
            pos,
            ref_base: ref_base.map(|b| b.to_ascii_uppercase()),
            alt_base: alt_base.map(|b| b.to_ascii_uppercase()),
        }
    }

    /// 1-based position, as written in VCF output.
    #[inline]
    pub fn pos1(&self) -> u64 {
        self.pos + 1
    }

    /// Supplied (ref, alt) indices, only when both alleles are known.
    pub fn known_alleles(&self) -> Option<(usize, usize)> {
        match (self.ref_base, self.alt_base) {
            (Some(r), Some(a)) => Some((base_index(r), base_index(a))),
            _ => None,
        }
    }
}

/// Parse a VCF REF/ALT field into a single base, if it is one.
///
/// Only the first comma-separated allele is considered; `.` and multi-base
/// alleles yield `None`.
pub fn single_base_allele(field: &str) -> Option<u8> {
    let first = field.split(',').next()?;
    match first.as_bytes() {
        [b] if *b != b'.' && *b != b'*' => Some(b.to_ascii_uppercase()),
        _ => None,
    }
}
