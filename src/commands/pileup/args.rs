use std::path::PathBuf;
use structopt::StructOpt;

/// Arguments for the `pileup` command.
#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "pileup",
    about = "Count alleles per cell or per sample at known SNP sites"
)]
pub struct PileupArgs {
    /// Indexed SAM/BAM/CRAM file(s), comma separated. One file for single-cell
    /// input, one file per sample for bulk input.
    #[structopt(short = "s", long)]
    pub sam_file: Option<String>,

    /// A list file of indexed alignment files, one per line.
    #[structopt(short = "S", long, parse(from_os_str))]
    pub sam_file_list: Option<PathBuf>,

    /// Output directory for VCFs and sparse matrices; created if missing.
    #[structopt(short = "O", long, parse(from_os_str))]
    pub out_dir: PathBuf,

    /// VCF (optionally gzipped) listing the candidate SNPs.
    #[structopt(short = "R", long, parse(from_os_str))]
    pub regions_vcf: PathBuf,

    /// Plain file listing all effective cell barcodes, one per line.
    #[structopt(short = "b", long, parse(from_os_str))]
    pub barcode_file: Option<PathBuf>,

    /// File of sample IDs, one per line, matching the input order.
    #[structopt(short = "i", long, parse(from_os_str))]
    pub sample_list: Option<PathBuf>,

    /// Comma separated sample IDs, matching the input order.
    #[structopt(short = "I", long)]
    pub sample_ids: Option<String>,

    /// Genotype each sample in addition to counting.
    #[structopt(long)]
    pub genotype: bool,

    /// Number of worker threads.
    #[structopt(short = "p", long, default_value = "1")]
    pub nproc: usize,

    /// Tag for cell barcodes; `None` turns barcode grouping off.
    #[structopt(long, default_value = "CB")]
    pub cell_tag: String,

    /// Tag for UMIs: a tag name, `Auto` (UR with barcodes, none otherwise) or
    /// `None` to count reads instead of molecules.
    #[structopt(long, default_value = "UR")]
    pub umi_tag: String,

    /// Minimum aggregated count for a site to be reported.
    #[structopt(long, default_value = "20")]
    pub min_count: u64,

    /// Minimum minor allele frequency.
    #[structopt(long, default_value = "0.0")]
    pub min_maf: f64,

    /// Keep the doublet genotype likelihoods (GT=0.5 and GT=1.5).
    #[structopt(long)]
    pub double_gl: bool,

    /// Compress the VCF outputs.
    #[structopt(long)]
    pub gzip: bool,

    /// Minimum mapped length for read filtering.
    #[structopt(long, default_value = "30")]
    pub min_len: u32,

    /// Minimum MAPQ for read filtering.
    #[structopt(long, default_value = "20")]
    pub min_mapq: u8,

    /// Maximum FLAG for read filtering.
    #[structopt(long, default_value = "255")]
    pub max_flag: u16,
}

/// Spelling of "turned off" accepted for tag options.
pub(crate) fn is_none_value(value: &str) -> bool {
    value == "None" || value == "none"
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsnp_lib::pipeline::pileup::config::{
        DEFAULT_CELL_TAG, DEFAULT_MAX_FLAG, DEFAULT_MIN_COUNT, DEFAULT_MIN_LEN, DEFAULT_MIN_MAPQ,
        DEFAULT_UMI_TAG,
    };

    #[test]
    fn parses_minimal_arguments() {
        let args = PileupArgs::from_iter_safe(&[
            "pileup",
            "-s",
            "a.bam",
            "-O",
            "out",
            "-R",
            "snps.vcf.gz",
            "-b",
            "barcodes.tsv",
        ])
        .unwrap();

        assert_eq!(args.sam_file.as_deref(), Some("a.bam"));
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert_eq!(args.cell_tag, DEFAULT_CELL_TAG);
        assert_eq!(args.umi_tag, DEFAULT_UMI_TAG);
        assert_eq!(args.nproc, 1);
        assert_eq!(args.min_count, DEFAULT_MIN_COUNT);
        assert_eq!(args.min_len, DEFAULT_MIN_LEN);
        assert_eq!(args.min_mapq, DEFAULT_MIN_MAPQ);
        assert_eq!(args.max_flag, DEFAULT_MAX_FLAG);
        assert!(!args.genotype && !args.gzip && !args.double_gl);
    }

    #[test]
    fn regions_are_required() {
        assert!(PileupArgs::from_iter_safe(&["pileup", "-s", "a.bam", "-O", "out"]).is_err());
    }

    #[test]
    fn none_spellings() {
        assert!(is_none_value("None"));
        assert!(is_none_value("none"));
        assert!(!is_none_value("NONE"));
    }
}
