//! Read filtering primitives.
//!
//! This module exposes the [`ReadFilter`] trait along with the default
//! record-level filter (placement, mapping quality, flag value, aligned length) and the
//! [`ReadReject`] reasons shared by the pileup resolver.

use rust_htslib::bam::record::Record;
use std::fmt;

/// Why a read did not contribute to a site. Rejects are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadReject {
    Unmapped,
    MissingUmi,
    MissingCellBarcode,
    LowMappingQuality,
    FlagAboveMax,
    Deletion,
    RefSkip,
    ShortAlignment,
    MissingSequence,
}

impl fmt::Display for ReadReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ReadReject::Unmapped => "unmapped or without CIGAR",
            ReadReject::MissingUmi => "missing UMI tag",
            ReadReject::MissingCellBarcode => "missing cell barcode tag",
            ReadReject::LowMappingQuality => "mapping quality below minimum",
            ReadReject::FlagAboveMax => "flag above maximum",
            ReadReject::Deletion => "deletion at site",
            ReadReject::RefSkip => "reference skip at site",
            ReadReject::ShortAlignment => "aligned length below minimum",
            ReadReject::MissingSequence => "record has no stored sequence",
        };
        f.write_str(reason)
    }
}

/// A trait for filtering reads based on various criteria.
pub trait ReadFilter {
    /// Record-level checks that do not depend on the target site.
    fn filter_read(&self, read: &Record) -> Result<(), ReadReject>;

    /// Checks on the total number of aligned (M/=/X) bases of the read.
    fn filter_aligned_len(&self, _aligned_len: u32) -> Result<(), ReadReject> {
        Ok(())
    }
}

/// Placement, mapping quality, flag and aligned-length filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultReadFilter {
    /// Reads with mapping quality below this value are rejected.
    min_mapq: u8,
    /// Reads whose whole flag value exceeds this are rejected.
    max_flag: u16,
    /// Reads with fewer aligned bases than this are rejected.
    min_len: u32,
}

impl DefaultReadFilter {
    pub fn new(min_mapq: u8, max_flag: u16, min_len: u32) -> Self {
        Self {
            min_mapq,
            max_flag,
            min_len,
        }
    }
}

impl ReadFilter for DefaultReadFilter {
    #[inline(always)]
    fn filter_read(&self, read: &Record) -> Result<(), ReadReject> {
        // Unmapped mates placed at their partner's position come back from a fetch.
        if read.is_unmapped() || read.cigar_len() == 0 {
            return Err(ReadReject::Unmapped);
        }
        if read.mapq() < self.min_mapq {
            return Err(ReadReject::LowMappingQuality);
        }
        if read.flags() > self.max_flag {
            return Err(ReadReject::FlagAboveMax);
        }
        Ok(())
    }

    #[inline(always)]
    fn filter_aligned_len(&self, aligned_len: u32) -> Result<(), ReadReject> {
        if aligned_len < self.min_len {
            Err(ReadReject::ShortAlignment)
        } else {
            Ok(())
        }
    }
}
