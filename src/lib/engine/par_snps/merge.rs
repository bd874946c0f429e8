//! Combine shard fragments into the final outputs.

use crate::core::error::{CellsnpError, IoResultExt, Result};
use crate::core::io::{copy_file_into, OutputFile};
use crate::pipeline::pileup::writer::mtx_summary_line;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sites and records actually merged into one matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCounts {
    pub sites: u64,
    pub records: u64,
}

/// Append the summary line and every fragment, renumbering sites globally.
///
/// Fragment lines are `local_site<TAB>sample<TAB>count`; a blank line closes
/// each site. The merged totals must match `expected`.
pub fn merge_mtx(
    out_path: &Path,
    fragments: &[PathBuf],
    samples: usize,
    expected: MergeCounts,
) -> Result<MergeCounts> {
    let mut out = OutputFile::append(out_path, false)?;
    out.write_all(mtx_summary_line(expected.sites, samples, expected.records).as_bytes())
        .with_path(out_path)?;

    let mut offset = 0u64;
    let mut records = 0u64;
    let mut line = String::with_capacity(64);
    for fragment in fragments {
        let mut reader = BufReader::new(File::open(fragment).with_path(fragment)?);
        let mut closed = 0u64;
        loop {
            line.clear();
            if reader.read_line(&mut line).with_path(fragment)? == 0 {
                break;
            }
            let entry = line.trim_end_matches('\n');
            if entry.is_empty() {
                closed += 1;
                continue;
            }
            let (local, rest) = entry.split_once('\t').ok_or_else(|| {
                merge_error(out_path, format!("malformed line '{}' in {}", entry, fragment.display()))
            })?;
            let local: u64 = local.parse().map_err(|_| {
                merge_error(out_path, format!("bad site number '{}' in {}", local, fragment.display()))
            })?;
            if local != closed + 1 {
                return Err(merge_error(
                    out_path,
                    format!(
                        "site {} out of order in {} (expected {})",
                        local,
                        fragment.display(),
                        closed + 1
                    ),
                ));
            }
            writeln!(out, "{}\t{}", offset + local, rest).with_path(out_path)?;
            records += 1;
        }
        offset += closed;
    }
    out.finish()?;

    let merged = MergeCounts {
        sites: offset,
        records,
    };
    if merged != expected {
        return Err(merge_error(
            out_path,
            format!(
                "merged {} sites / {} records, shards reported {} / {}",
                merged.sites, merged.records, expected.sites, expected.records
            ),
        ));
    }
    Ok(merged)
}

/// Append VCF fragments byte for byte.
pub fn merge_vcf(out_path: &Path, fragments: &[PathBuf], gzip: bool) -> Result<u64> {
    let mut out = OutputFile::append(out_path, gzip)?;
    let mut copied = 0;
    for fragment in fragments {
        copied += copy_file_into(fragment, &mut out)?;
    }
    out.finish()?;
    Ok(copied)
}

/// Insert the summary line after the leading `%` lines of a directly written matrix.
pub fn rewrite_mtx(path: &Path, sites: u64, samples: usize, records: u64) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut reader = BufReader::new(File::open(path).with_path(path)?);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).with_path(dir)?;
    let tmp_path = tmp.path().to_path_buf();
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).with_path(path)? == 0 || !line.starts_with('%') {
                break;
            }
            writer.write_all(line.as_bytes()).with_path(&tmp_path)?;
        }
        if line.is_empty() && records != 0 {
            return Err(merge_error(
                path,
                format!("expected {} records but the matrix has none", records),
            ));
        }
        writer
            .write_all(mtx_summary_line(sites, samples, records).as_bytes())
            .with_path(&tmp_path)?;
        writer.write_all(line.as_bytes()).with_path(&tmp_path)?;
        io::copy(&mut reader, &mut writer).with_path(&tmp_path)?;
        writer.flush().with_path(&tmp_path)?;
    }
    tmp.persist(path).map_err(|e| CellsnpError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

fn merge_error(path: &Path, reason: String) -> CellsnpError {
    CellsnpError::Merge {
        path: path.to_path_buf(),
        reason,
    }
}
