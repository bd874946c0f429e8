use crossbeam::channel::bounded;
use log::*;
use std::path::PathBuf;
use std::sync::Arc;

use super::merge::{merge_mtx, merge_vcf, rewrite_mtx, MergeCounts};
use super::types::{split_shards, MergedOutput, RunState, Shard, ShardResult};
use crate::core::concurrency::build_worker_pool;
use crate::core::error::{CellsnpError, IoResultExt, Result};
use crate::engine::position::Snp;
use crate::pipeline::pileup::config::PileupConfig;
use crate::pipeline::pileup::roster::SampleRoster;
use crate::pipeline::pileup::site::{FilterTallies, SiteDriver, SiteOutcome};
use crate::pipeline::pileup::source::SourceOpener;
use crate::pipeline::pileup::writer::{write_headers, OutputLayout, SiteFiles, SiteWriter, WriteMode};

const FRAGMENT_DIR_PREFIX: &str = ".cellsnp-shards-";

/// Splits the SNP list over a worker pool and assembles the final outputs.
pub struct ShardCoordinator<O: SourceOpener> {
    snps: Arc<[Snp]>,
    config: Arc<PileupConfig>,
    roster: SampleRoster,
    opener: O,
    layout: OutputLayout,
    workers: usize,
    state: RunState,
}

impl<O: SourceOpener> ShardCoordinator<O> {
    pub fn new(
        snps: Arc<[Snp]>,
        config: Arc<PileupConfig>,
        roster: SampleRoster,
        opener: O,
        layout: OutputLayout,
        workers: usize,
    ) -> Self {
        Self {
            snps,
            config,
            roster,
            opener,
            layout,
            workers,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Pile up every SNP and leave complete outputs in the output directory.
    pub fn run(&mut self) -> Result<MergedOutput> {
        match self.run_inner() {
            Ok(merged) => {
                self.state = RunState::Done;
                Ok(merged)
            }
            Err(err) => {
                debug!("Run failed while {}: {}", self.state, err);
                self.state = RunState::Failed;
                Err(err)
            }
        }
    }

    fn run_inner(&mut self) -> Result<MergedOutput> {
        if self.workers == 0 {
            return Err(CellsnpError::Config(
                "Too few threads selected. Min 1".to_string(),
            ));
        }
        self.state = RunState::Sharding;
        write_headers(&self.layout, &self.roster)?;
        let shards = split_shards(self.snps.len(), self.workers);
        info!(
            "Piling up {} SNPs for {} samples in {} shard(s)",
            self.snps.len(),
            self.roster.len(),
            shards.len()
        );

        if shards.len() == 1 {
            self.run_single(&shards[0])
        } else {
            self.run_sharded(shards)
        }
    }

    fn run_single(&mut self, shard: &Shard) -> Result<MergedOutput> {
        self.state = RunState::WorkersRunning;
        let files = self.layout.site_files();
        let result = run_shard(
            shard,
            &self.snps,
            &self.config,
            &self.roster,
            &self.opener,
            &files,
            WriteMode::Direct,
        )
        .map_err(|e| e.in_shard(shard.index))?;

        self.state = RunState::Merging;
        for (path, records) in self.layout.mtx().iter().zip(result.records.iter()) {
            rewrite_mtx(path, result.passed, self.roster.len(), *records)?;
        }
        Ok(MergedOutput {
            snps: self.snps.len(),
            sites: result.passed,
            samples: self.roster.len(),
            records: result.records,
            tallies: result.tallies,
        })
    }

    fn run_sharded(&mut self, shards: Vec<Shard>) -> Result<MergedOutput> {
        let scratch = tempfile::Builder::new()
            .prefix(FRAGMENT_DIR_PREFIX)
            .tempdir_in(&self.layout.out_dir)
            .with_path(&self.layout.out_dir)?;
        let pool = build_worker_pool(shards.len())?;
        info!("Using {} worker threads.", pool.current_num_threads());

        self.state = RunState::WorkersRunning;
        let (sender, receiver) = bounded::<Result<ShardResult>>(shards.len());
        let (snps, config, roster, opener) = (&self.snps, &self.config, &self.roster, &self.opener);
        let genotype = self.layout.genotype;
        let dir = scratch.path();
        pool.scope(|scope| {
            for shard in shards.iter() {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let files = SiteFiles::fragments(dir, shard.index, genotype);
                    let result = run_shard(
                        shard,
                        snps,
                        config,
                        roster,
                        opener,
                        &files,
                        WriteMode::Fragment,
                    )
                    .map_err(|e| e.in_shard(shard.index));
                    // The receiver outlives the scope, so this only fails if it was dropped.
                    let _ = sender.send(result);
                });
            }
        });
        drop(sender);

        let mut results = Vec::with_capacity(shards.len());
        for result in receiver.iter() {
            results.push(result?);
        }
        results.sort_by_key(|r| r.shard);

        self.state = RunState::Merging;
        let merged = self.merge(&results)?;
        if let Err(e) = scratch.close() {
            warn!("Failed to remove shard fragments: {}", e);
        }
        Ok(merged)
    }

    fn merge(&self, results: &[ShardResult]) -> Result<MergedOutput> {
        let samples = self.roster.len();
        let sites: u64 = results.iter().map(|r| r.passed).sum();
        let mut records = [0u64; 3];
        let mut tallies = FilterTallies::default();
        for result in results {
            for (total, n) in records.iter_mut().zip(result.records.iter()) {
                *total += n;
            }
            tallies.merge(&result.tallies);
        }

        let fragments: Vec<&SiteFiles> = results
            .iter()
            .map(|r| {
                r.fragments.as_ref().ok_or_else(|| {
                    CellsnpError::Config(format!("shard {} produced no fragments", r.shard))
                })
            })
            .collect::<Result<_>>()?;

        for (m, path) in self.layout.mtx().iter().enumerate() {
            let parts: Vec<PathBuf> = fragments.iter().map(|f| f.mtx[m].clone()).collect();
            merge_mtx(
                path,
                &parts,
                samples,
                MergeCounts {
                    sites,
                    records: records[m],
                },
            )?;
        }
        let parts: Vec<PathBuf> = fragments.iter().map(|f| f.base_vcf.clone()).collect();
        merge_vcf(&self.layout.base_vcf(), &parts, self.layout.gzip)?;
        if let Some(cells) = self.layout.cells_vcf() {
            let parts: Vec<PathBuf> = fragments
                .iter()
                .filter_map(|f| f.cells_vcf.clone())
                .collect();
            merge_vcf(&cells, &parts, self.layout.gzip)?;
        }
        debug!("Merged {} shards into {:?}", results.len(), self.layout.out_dir);

        Ok(MergedOutput {
            snps: self.snps.len(),
            sites,
            samples,
            records,
            tallies,
        })
    }
}

/// Pile up one shard start to finish with its own readers and writers.
fn run_shard<O: SourceOpener>(
    shard: &Shard,
    snps: &[Snp],
    config: &Arc<PileupConfig>,
    roster: &SampleRoster,
    opener: &O,
    files: &SiteFiles,
    mode: WriteMode,
) -> Result<ShardResult> {
    let mut sources = opener.open_all()?;
    let mut driver = SiteDriver::new(Arc::clone(config), roster);
    let mut writer = SiteWriter::open(files, mode, config.doublet_gl)?;

    let total = shard.len();
    let log_step = std::cmp::max(1, total / 10);
    let mut processed = 0u64;
    for (i, snp) in snps[shard.range.clone()].iter().enumerate() {
        if let SiteOutcome::Pass = driver.process_site(snp, &mut sources)? {
            writer.write_site(snp, driver.table(), driver.aggregate())?;
        }
        processed += 1;
        let done = i + 1;
        if done % log_step == 0 || done == total {
            info!(
                "Shard {}: processed {:.1}% ({} / {} SNPs)",
                shard.index,
                done as f64 / total as f64 * 100.0,
                done,
                total
            );
        }
    }

    let totals = writer.finish()?;
    let tallies = driver.tallies().clone();
    debug!(
        "Shard {} done: {} of {} SNPs passed, {} filtered",
        shard.index,
        totals.sites,
        processed,
        tallies.sites_filtered()
    );
    Ok(ShardResult {
        shard: shard.index,
        processed,
        passed: totals.sites,
        records: totals.records,
        tallies,
        fragments: (mode == WriteMode::Fragment).then(|| files.clone()),
    })
}
