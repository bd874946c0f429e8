//! Ordered sample roster: cell barcodes or bulk sample IDs.

use crate::core::error::{CellsnpError, Result};
use crate::core::io::read_lines;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Column order of every output. Shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct SampleRoster {
    names: Arc<Vec<String>>,
    /// Only populated for barcode rosters; sample IDs are addressed by input index.
    barcode_to_index: Arc<FxHashMap<String, usize>>,
}

impl SampleRoster {
    /// Build a barcode roster. Barcodes are sorted lexicographically and deduplicated.
    pub fn from_barcodes(mut barcodes: Vec<String>) -> Result<Self> {
        barcodes.retain(|b| !b.is_empty());
        if barcodes.is_empty() {
            return Err(CellsnpError::Roster("barcode list is empty".to_string()));
        }
        barcodes.sort_unstable();
        barcodes.dedup();

        let mut index = FxHashMap::with_capacity_and_hasher(barcodes.len(), Default::default());
        for (i, barcode) in barcodes.iter().enumerate() {
            index.insert(barcode.clone(), i);
        }
        Ok(Self {
            names: Arc::new(barcodes),
            barcode_to_index: Arc::new(index),
        })
    }

    /// Read a barcode file, one barcode per line.
    pub fn barcodes_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_barcodes(read_lines(path)?)
    }

    /// Build a sample roster; order follows the input files.
    pub fn from_sample_ids(ids: Vec<String>) -> Result<Self> {
        if ids.is_empty() {
            return Err(CellsnpError::Roster("sample list is empty".to_string()));
        }
        Ok(Self {
            names: Arc::new(ids),
            barcode_to_index: Arc::new(FxHashMap::default()),
        })
    }

    #[inline]
    pub fn barcode_index(&self, barcode: &str) -> Option<usize> {
        self.barcode_to_index.get(barcode).copied()
    }

    #[inline]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|s| s.as_str())
    }

    pub fn names(&self) -> &[String] {
        self.names.as_ref()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
