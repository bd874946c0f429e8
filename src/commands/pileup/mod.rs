mod args;
mod input;

use anyhow::{anyhow, Context, Result};
use cellsnp_lib::core::prelude::{determine_allowed_cpus, make_parent_dirs, read_lines};
use cellsnp_lib::engine::par_snps::{MergedOutput, ShardCoordinator};
use cellsnp_lib::pipeline::pileup::config::{Grouping, PileupConfig, DEFAULT_UMI_TAG};
use cellsnp_lib::pipeline::pileup::roster::SampleRoster;
use cellsnp_lib::pipeline::pileup::source::HtsOpener;
use cellsnp_lib::pipeline::pileup::writer::OutputLayout;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub use args::PileupArgs;
use args::is_none_value;
use input::load_snps;

/// Everything a run needs once the command line has been checked.
#[derive(Debug)]
struct RunPlan {
    inputs: Vec<PathBuf>,
    roster: SampleRoster,
    config: PileupConfig,
    layout: OutputLayout,
    workers: usize,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn collect_inputs(args: &PileupArgs) -> Result<Vec<PathBuf>> {
    let inputs: Vec<PathBuf> = match (&args.sam_file, &args.sam_file_list) {
        (Some(_), Some(_)) => {
            return Err(anyhow!(
                "--sam-file and --sam-file-list cannot be given at the same time"
            ))
        }
        (Some(files), None) => split_list(files).into_iter().map(PathBuf::from).collect(),
        (None, Some(list)) => read_lines(list)
            .with_context(|| format!("Could not read input list {}", list.display()))?
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        (None, None) => return Err(anyhow!("Specify --sam-file or --sam-file-list")),
    };
    if inputs.is_empty() {
        return Err(anyhow!("No alignment files given"));
    }
    for input in inputs.iter() {
        if !input.exists() {
            return Err(anyhow!("Input {} does not exist", input.display()));
        }
    }
    Ok(inputs)
}

/// Validate option combinations and resolve grouping, roster and UMI mode.
fn check_args(args: &PileupArgs) -> Result<RunPlan> {
    let workers = determine_allowed_cpus(args.nproc)?;
    let inputs = collect_inputs(args)?;

    let layout = OutputLayout::new(&args.out_dir, args.gzip, args.genotype);
    make_parent_dirs(layout.samples())
        .with_context(|| format!("Could not create output directory {}", args.out_dir.display()))?;

    let has_sample_ids = args.sample_ids.is_some() || args.sample_list.is_some();
    let mut cell_tag = (!is_none_value(&args.cell_tag)).then(|| args.cell_tag.clone());
    if has_sample_ids {
        if args.barcode_file.is_some() {
            return Err(anyhow!(
                "Barcodes and sample IDs cannot be given at the same time"
            ));
        }
        cell_tag = None;
    }

    let (grouping, roster) = match (cell_tag, &args.barcode_file) {
        (Some(cell_tag), Some(barcodes)) => {
            let roster = SampleRoster::barcodes_from_file(barcodes)
                .with_context(|| format!("Could not read barcode file {}", barcodes.display()))?;
            (Grouping::Barcodes { cell_tag }, roster)
        }
        (None, None) => {
            let ids = match (&args.sample_ids, &args.sample_list) {
                (Some(_), Some(_)) => {
                    return Err(anyhow!(
                        "--sample-ids and --sample-list cannot be given at the same time"
                    ))
                }
                (Some(ids), None) => split_list(ids),
                (None, Some(list)) => read_lines(list)
                    .with_context(|| format!("Could not read sample list {}", list.display()))?,
                (None, None) => (0..inputs.len()).map(|i| format!("Sample_{}", i)).collect(),
            };
            if ids.len() != inputs.len() {
                return Err(anyhow!(
                    "Number of sample IDs ({}) does not match number of input files ({})",
                    ids.len(),
                    inputs.len()
                ));
            }
            (Grouping::SampleIds, SampleRoster::from_sample_ids(ids)?)
        }
        _ => {
            return Err(anyhow!(
                "Barcodes and a cell tag must be given together (use --cell-tag None for bulk samples)"
            ))
        }
    };

    let umi_tag = if args.umi_tag == "Auto" {
        matches!(grouping, Grouping::Barcodes { .. }).then(|| DEFAULT_UMI_TAG.to_string())
    } else if is_none_value(&args.umi_tag) {
        None
    } else {
        Some(args.umi_tag.clone())
    };

    let config = PileupConfig {
        grouping,
        umi_tag,
        min_count: args.min_count,
        min_maf: args.min_maf,
        min_len: args.min_len,
        min_mapq: args.min_mapq,
        max_flag: args.max_flag,
        genotype: args.genotype,
        doublet_gl: args.double_gl,
    };
    Ok(RunPlan {
        inputs,
        roster,
        config,
        layout,
        workers,
    })
}

fn log_summary(merged: &MergedOutput) {
    info!(
        "{} of {} SNPs passed filters ({} filtered) across {} samples",
        merged.sites,
        merged.snps,
        merged.tallies.sites_filtered(),
        merged.samples
    );
    info!(
        "Matrix records: AD={} DP={} OTH={}",
        merged.records[0], merged.records[1], merged.records[2]
    );
    for (reason, n) in merged.tallies.reads.iter() {
        debug!("Reads rejected ({:?}): {}", reason, n);
    }
    debug!(
        "Duplicate UMIs: {}, reads from unknown groups: {}, missing contigs: {}",
        merged.tallies.duplicate_umis, merged.tallies.unknown_groups, merged.tallies.missing_contigs
    );
}

/// Entry point for the `pileup` command.
pub fn run_pileup(args: PileupArgs) -> Result<()> {
    let start_time = Instant::now();
    let plan = check_args(&args)?;

    info!(
        "{} input file(s), {} samples, output to {:?}",
        plan.inputs.len(),
        plan.roster.len(),
        plan.layout.out_dir
    );
    info!(
        "grouping = {:?}, umi tag = {:?}, genotype = {}, gzip = {}",
        plan.config.grouping, plan.config.umi_tag, plan.config.genotype, plan.layout.gzip
    );
    info!(
        "min_count = {}, min_maf = {:.2}, double_gl = {}, min_len = {}, min_mapq = {}, max_flag = {}",
        plan.config.min_count,
        plan.config.min_maf,
        plan.config.doublet_gl,
        plan.config.min_len,
        plan.config.min_mapq,
        plan.config.max_flag
    );

    info!("Loading SNPs from {:?}", args.regions_vcf);
    let snps = load_snps(&args.regions_vcf)?;
    info!("Loaded {} SNPs", snps.len());

    let mut coordinator = ShardCoordinator::new(
        snps.into(),
        Arc::new(plan.config),
        plan.roster,
        HtsOpener::new(plan.inputs),
        plan.layout,
        plan.workers,
    );
    let merged = coordinator.run().context("Pileup failed")?;
    log_summary(&merged);

    info!("pileup finished in {:?}", start_time.elapsed());
    Ok(())
}
