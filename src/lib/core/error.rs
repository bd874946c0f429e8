//! Error types for the cellsnp library

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CellsnpError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("htslib error: {0}")]
    Hts(#[from] rust_htslib::errors::Error),

    #[error("Malformed alignment record '{qname}': {reason}")]
    MalformedRecord { qname: String, reason: String },

    #[error("Malformed base quality value {0}")]
    MalformedQuality(u8),

    #[error("Inconsistent sample group roster: {0}")]
    Roster(String),

    #[error("Failed to pileup SNP {chrom}:{pos}: {source}")]
    Site {
        chrom: String,
        /// 1-based position, as reported to users.
        pos: u64,
        #[source]
        source: Box<CellsnpError>,
    },

    #[error("Shard {shard} failed: {source}")]
    Shard {
        shard: usize,
        #[source]
        source: Box<CellsnpError>,
    },

    #[error("Failed to merge {path}: {reason}")]
    Merge { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CellsnpError>;

/// Attach a file path to bare `std::io` failures.
pub trait IoResultExt<T> {
    fn with_path<P: Into<PathBuf>>(self, path: P) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    #[inline]
    fn with_path<P: Into<PathBuf>>(self, path: P) -> Result<T> {
        self.map_err(|source| CellsnpError::Io {
            path: path.into(),
            source,
        })
    }
}

impl CellsnpError {
    /// Wrap an error with the coordinates of the SNP being processed.
    pub fn at_site(self, chrom: &str, pos0: u64) -> Self {
        CellsnpError::Site {
            chrom: chrom.to_string(),
            pos: pos0 + 1,
            source: Box::new(self),
        }
    }

    pub fn in_shard(self, shard: usize) -> Self {
        CellsnpError::Shard {
            shard,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_errors_carry_the_path() {
        let res: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.with_path("/tmp/missing.mtx").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.mtx"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn site_context_reports_one_based_position() {
        let err = CellsnpError::MalformedQuality(200).at_site("chr1", 99);
        let msg = err.to_string();
        assert!(msg.contains("chr1:100"), "{}", msg);
    }

    #[test]
    fn shard_context_keeps_the_source() {
        let err = CellsnpError::Roster("missing group".into()).in_shard(3);
        assert!(err.to_string().starts_with("Shard 3 failed"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("missing group"));
    }
}
