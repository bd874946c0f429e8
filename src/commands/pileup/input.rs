use anyhow::{anyhow, Context, Result};
use cellsnp_lib::core::io::get_reader;
use cellsnp_lib::engine::position::snp::single_base_allele;
use cellsnp_lib::engine::position::Snp;
use std::path::Path;

/// Load candidate SNPs from a VCF or VCF.gz, keeping file order.
///
/// POS is converted to 0-based. REF and the first ALT allele are kept only
/// when they are single bases.
pub fn load_snps<P: AsRef<Path>>(path: P) -> Result<Vec<Snp>> {
    let path = path.as_ref();
    let mut reader = get_reader(path)
        .with_context(|| format!("Failed to open regions file {}", path.display()))?;

    let mut snps = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read record {} of {}", line + 1, path.display()))?;
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        let (chrom, pos) = match (record.get(0), record.get(1)) {
            (Some(chrom), Some(pos)) if !chrom.is_empty() => (chrom, pos),
            _ => {
                return Err(anyhow!(
                    "Record {} of {} has no CHROM/POS columns",
                    line + 1,
                    path.display()
                ))
            }
        };
        let pos: u64 = pos
            .trim()
            .parse()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| anyhow!("Invalid POS '{}' for {} in {}", pos, chrom, path.display()))?;
        let ref_base = record.get(3).and_then(single_base_allele);
        let alt_base = record.get(4).and_then(single_base_allele);
        snps.push(Snp::new(chrom, pos - 1, ref_base, alt_base));
    }

    if snps.is_empty() {
        return Err(anyhow!("Regions file {} lists no SNPs", path.display()));
    }
    Ok(snps)
}
