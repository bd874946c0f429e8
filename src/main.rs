//! cellsnp - allele counting at known SNPs for single cells and bulk samples
//!
//! Piles up reads from indexed SAM/BAM/CRAM files at every SNP of a regions
//! VCF and counts alleles per cell barcode (one single-cell input) or per
//! sample (one bulk input per sample).
//!
//! # Outputs
//!
//! - `cellSNP.tag.{AD,DP,OTH}.mtx`: sparse SNP x sample count matrices
//! - `cellSNP.base.vcf[.gz]`: site-level totals for every reported SNP
//! - `cellSNP.cells.vcf[.gz]`: per-sample genotypes, with `--genotype`
//! - `cellSNP.samples.tsv`: the matrix column order
//!
//! # Usage
//!
//! ```bash
//! # Single-cell input with a barcode whitelist
//! cellsnp pileup -s possorted.bam -b barcodes.tsv -R snps.vcf.gz -O out -p 8
//!
//! # Two bulk samples, genotyped, counting reads instead of UMIs
//! cellsnp pileup -s a.bam,b.bam -I donorA,donorB -R snps.vcf.gz -O out \
//!     --cell-tag None --umi-tag None --genotype --gzip
//! ```

extern crate cellsnp_lib;
pub mod commands;
use anyhow::Result;
use cellsnp_lib::core::errors::is_broken_pipe;
use env_logger::Env;
use log::*;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case", author, about)]
/// Per-cell and per-sample allele counting at known SNPs
struct Args {
    #[structopt(subcommand)]
    subcommand: Subcommand,
}

#[derive(StructOpt)]
enum Subcommand {
    /// Count alleles at the SNPs of a regions VCF
    Pileup(commands::PileupArgs),
}

impl Subcommand {
    fn run(self) -> Result<()> {
        match self {
            Subcommand::Pileup(args) => commands::run_pileup(args)?,
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = Args::from_args().subcommand.run() {
        if is_broken_pipe(&err) {
            std::process::exit(0);
        }
        error!("{:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
