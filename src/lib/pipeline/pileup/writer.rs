//! Output files: sparse matrices, base and cell VCFs, sample roster.
//!
//! Headers are written once up front by [`write_headers`]. A [`SiteWriter`]
//! then appends passing sites either straight into the final files (a single
//! worker) or into plain per-shard fragments that are merged afterwards.

use crate::core::error::{IoResultExt, Result};
use crate::core::fs::with_gz_suffix;
use crate::core::io::OutputFile;
use crate::engine::position::{base_char, Snp};
use crate::pipeline::pileup::genotype::{
    best_genotype, phred_scale, DIPLOID_GENOTYPES, DOUBLET_LIKELIHOODS,
};
use crate::pipeline::pileup::group::{GroupTable, SampleGroup};
use crate::pipeline::pileup::roster::SampleRoster;
use crate::pipeline::pileup::stats::SiteAggregate;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MTX_AD_FILE: &str = "cellSNP.tag.AD.mtx";
pub const MTX_DP_FILE: &str = "cellSNP.tag.DP.mtx";
pub const MTX_OTH_FILE: &str = "cellSNP.tag.OTH.mtx";
pub const BASE_VCF_FILE: &str = "cellSNP.base.vcf";
pub const CELLS_VCF_FILE: &str = "cellSNP.cells.vcf";
pub const SAMPLES_FILE: &str = "cellSNP.samples.tsv";

/// Matrices in AD, DP, OTH order; every per-matrix array follows it.
pub const MTX_FILES: [&str; 3] = [MTX_AD_FILE, MTX_DP_FILE, MTX_OTH_FILE];

pub const MTX_PREAMBLE: &str = "%%MatrixMarket matrix coordinate integer general\n%\n";

const VCF_COLUMNS: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";

const CELLS_VCF_META: &str = concat!(
    "##fileformat=VCFv4.2\n",
    "##source=cellSNP_v",
    env!("CARGO_PKG_VERSION"),
    "\n",
    "##FILTER=<ID=PASS,Description=\"All filters passed\">\n",
    "##FILTER=<ID=.,Description=\"Filter info not available\">\n",
    "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"total counts for ALT and REF\">\n",
    "##INFO=<ID=AD,Number=1,Type=Integer,Description=\"total counts for ALT\">\n",
    "##INFO=<ID=OTH,Number=1,Type=Integer,Description=\"total counts for other bases from REF and ALT\">\n",
    "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n",
    "##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"List of Phred-scaled genotype likelihoods\">\n",
    "##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"total counts for ALT and REF\">\n",
    "##FORMAT=<ID=AD,Number=1,Type=Integer,Description=\"total counts for ALT\">\n",
    "##FORMAT=<ID=OTH,Number=1,Type=Integer,Description=\"total counts for other bases from REF and ALT\">\n",
    "##FORMAT=<ID=ALL,Number=5,Type=Integer,Description=\"total counts for all bases in order of A,C,G,T,N\">\n",
);

const CELLS_VCF_CONTIGS: [&str; 24] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y",
];

const CELLS_FORMAT: &str = "GT:AD:DP:OTH:PL:ALL";
const EMPTY_SAMPLE: &str = ".:.:.:.:.:.";

/// Final output locations for one run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub out_dir: PathBuf,
    /// Compress the VCFs. Matrices and the roster are always plain.
    pub gzip: bool,
    pub genotype: bool,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(out_dir: P, gzip: bool, genotype: bool) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
            gzip,
            genotype,
        }
    }

    pub fn mtx(&self) -> [PathBuf; 3] {
        MTX_FILES.map(|name| self.out_dir.join(name))
    }

    pub fn base_vcf(&self) -> PathBuf {
        self.vcf(BASE_VCF_FILE)
    }

    pub fn cells_vcf(&self) -> Option<PathBuf> {
        self.genotype.then(|| self.vcf(CELLS_VCF_FILE))
    }

    pub fn samples(&self) -> PathBuf {
        self.out_dir.join(SAMPLES_FILE)
    }

    fn vcf(&self, name: &str) -> PathBuf {
        let path = self.out_dir.join(name);
        if self.gzip {
            with_gz_suffix(&path)
        } else {
            path
        }
    }

    /// Where a single worker writes its sites: the final files themselves.
    pub fn site_files(&self) -> SiteFiles {
        SiteFiles {
            mtx: self.mtx(),
            base_vcf: self.base_vcf(),
            cells_vcf: self.cells_vcf(),
            gzip: self.gzip,
        }
    }
}

/// Files one [`SiteWriter`] appends to.
#[derive(Debug, Clone)]
pub struct SiteFiles {
    pub mtx: [PathBuf; 3],
    pub base_vcf: PathBuf,
    pub cells_vcf: Option<PathBuf>,
    pub gzip: bool,
}

impl SiteFiles {
    /// Plain per-shard fragments inside `dir`.
    pub fn fragments(dir: &Path, shard: usize, genotype: bool) -> Self {
        let name = |file: &str| dir.join(format!("{}.{}", file, shard));
        Self {
            mtx: MTX_FILES.map(|file| name(file)),
            base_vcf: name(BASE_VCF_FILE),
            cells_vcf: genotype.then(|| name(CELLS_VCF_FILE)),
            gzip: false,
        }
    }
}

/// Create every final file and write its header, truncating old outputs.
pub fn write_headers(layout: &OutputLayout, roster: &SampleRoster) -> Result<()> {
    for path in layout.mtx().iter() {
        let mut out = OutputFile::create(path, false)?;
        out.write_all(MTX_PREAMBLE.as_bytes()).with_path(path)?;
        out.finish()?;
    }

    let samples = layout.samples();
    let mut out = OutputFile::create(&samples, false)?;
    for name in roster.names() {
        writeln!(out, "{}", name).with_path(&samples)?;
    }
    out.finish()?;

    let base = layout.base_vcf();
    let mut out = OutputFile::create(&base, layout.gzip)?;
    write!(out, "##fileformat=VCFv4.2\n{}\n", VCF_COLUMNS).with_path(&base)?;
    out.finish()?;

    if let Some(cells) = layout.cells_vcf() {
        let mut out = OutputFile::create(&cells, layout.gzip)?;
        out.write_all(cells_vcf_header(roster).as_bytes())
            .with_path(&cells)?;
        out.finish()?;
    }
    Ok(())
}

fn cells_vcf_header(roster: &SampleRoster) -> String {
    let mut header = String::from(CELLS_VCF_META);
    for contig in CELLS_VCF_CONTIGS.iter() {
        header.push_str(&format!("##contig=<ID={}>\n", contig));
    }
    header.push_str(VCF_COLUMNS);
    header.push_str("\tFORMAT");
    for name in roster.names() {
        header.push('\t');
        header.push_str(name);
    }
    header.push('\n');
    header
}

/// Summary line that follows the `%` lines of a matrix.
pub fn mtx_summary_line(sites: u64, samples: usize, records: u64) -> String {
    format!("{}\t{}\t{}\n", sites, samples, records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Append to final files with 1-based site numbers.
    Direct,
    /// Shard-local site numbers and a blank line after every site in each matrix.
    Fragment,
}

/// Sites and nonzero entries written per matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterTotals {
    pub sites: u64,
    /// AD, DP, OTH.
    pub records: [u64; 3],
}

pub struct SiteWriter {
    mode: WriteMode,
    mtx: [OutputFile; 3],
    base_vcf: OutputFile,
    cells_vcf: Option<OutputFile>,
    doublet_gl: bool,
    totals: WriterTotals,
    line: String,
}

impl SiteWriter {
    pub fn open(files: &SiteFiles, mode: WriteMode, doublet_gl: bool) -> Result<Self> {
        let open = |path: &Path, gzip: bool| match mode {
            WriteMode::Direct => OutputFile::append(path, gzip),
            WriteMode::Fragment => OutputFile::create(path, gzip),
        };
        let mtx = [
            open(&files.mtx[0], false)?,
            open(&files.mtx[1], false)?,
            open(&files.mtx[2], false)?,
        ];
        let base_vcf = open(&files.base_vcf, files.gzip)?;
        let cells_vcf = match &files.cells_vcf {
            Some(path) => Some(open(path, files.gzip)?),
            None => None,
        };
        Ok(Self {
            mode,
            mtx,
            base_vcf,
            cells_vcf,
            doublet_gl,
            totals: WriterTotals::default(),
            line: String::with_capacity(256),
        })
    }

    /// Append one passing site.
    pub fn write_site(
        &mut self,
        snp: &Snp,
        table: &GroupTable,
        aggregate: &SiteAggregate,
    ) -> Result<()> {
        self.totals.sites += 1;
        let site = self.totals.sites;

        for (sample, group) in table.groups().iter().enumerate() {
            for (m, value) in [group.ad, group.dp, group.oth].into_iter().enumerate() {
                if value > 0 {
                    let out = &mut self.mtx[m];
                    writeln!(out, "{}\t{}\t{}", site, sample + 1, value).with_path(out.path())?;
                    self.totals.records[m] += 1;
                }
            }
        }
        if self.mode == WriteMode::Fragment {
            for out in self.mtx.iter_mut() {
                out.write_all(b"\n").with_path(out.path())?;
            }
        }

        self.line.clear();
        self.line.push_str(&format!(
            "{}\t{}\t.\t{}\t{}\t.\tPASS\tAD={};DP={};OTH={}",
            snp.chrom,
            snp.pos1(),
            base_char(aggregate.ref_idx),
            base_char(aggregate.alt_idx),
            aggregate.ad,
            aggregate.dp,
            aggregate.oth
        ));
        writeln!(self.base_vcf, "{}", self.line).with_path(self.base_vcf.path())?;

        if let Some(cells) = self.cells_vcf.as_mut() {
            self.line.push('\t');
            self.line.push_str(CELLS_FORMAT);
            for group in table.groups() {
                self.line.push('\t');
                push_sample_column(&mut self.line, group, self.doublet_gl);
            }
            writeln!(cells, "{}", self.line).with_path(cells.path())?;
        }
        Ok(())
    }

    pub fn totals(&self) -> WriterTotals {
        self.totals
    }

    /// Flush and close every file.
    pub fn finish(self) -> Result<WriterTotals> {
        let SiteWriter {
            mtx,
            base_vcf,
            cells_vcf,
            totals,
            ..
        } = self;
        for out in mtx {
            out.finish()?;
        }
        base_vcf.finish()?;
        if let Some(cells) = cells_vcf {
            cells.finish()?;
        }
        Ok(totals)
    }
}

/// `GT:AD:DP:OTH:PL:ALL` for one sample, or all-missing when it has no reads.
fn push_sample_column(line: &mut String, group: &SampleGroup, doublet_gl: bool) {
    if group.total == 0 {
        line.push_str(EMPTY_SAMPLE);
        return;
    }
    let n_gl = if doublet_gl {
        DOUBLET_LIKELIHOODS
    } else {
        DIPLOID_GENOTYPES.len()
    };
    line.push_str(&format!(
        "{}:{}:{}:{}:",
        DIPLOID_GENOTYPES[best_genotype(&group.likelihoods)],
        group.ad,
        group.dp,
        group.oth
    ));
    for (i, gl) in group.likelihoods[..n_gl].iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&format!("{:.0}", phred_scale(*gl)));
    }
    line.push(':');
    for (i, count) in group.base_counts.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&count.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pileup::config::{Grouping, PileupConfig};
    use crate::pipeline::pileup::group::GroupKey;
    use crate::pipeline::pileup::resolver::PileupRecord;
    use crate::pipeline::pileup::stats::finalize;

    fn site(samples: &[&[usize]], genotype: bool) -> (GroupTable, SiteAggregate) {
        let names = (0..samples.len()).map(|i| format!("s{}", i)).collect();
        let roster = SampleRoster::from_sample_ids(names).unwrap();
        let mut table = GroupTable::prepare(&roster, false);
        for (i, bases) in samples.iter().enumerate() {
            for &base in bases.iter() {
                let rec = PileupRecord {
                    qpos: 0,
                    base,
                    qual: 30,
                    is_del: false,
                    is_refskip: false,
                    aligned_len: 50,
                    cell_barcode: None,
                    umi: None,
                };
                table.push(&rec, GroupKey::Sample(i)).unwrap();
            }
        }
        let config = PileupConfig {
            grouping: Grouping::SampleIds,
            umi_tag: None,
            min_count: 0,
            genotype,
            ..Default::default()
        };
        let mut agg = SiteAggregate::new();
        finalize(&mut table, &Snp::new("1", 0, None, None), &config, &mut agg).unwrap();
        (table, agg)
    }

    #[test]
    fn layout_names_and_compression() {
        let layout = OutputLayout::new("/out", true, false);
        assert_eq!(layout.mtx()[1], PathBuf::from("/out/cellSNP.tag.DP.mtx"));
        assert_eq!(layout.base_vcf(), PathBuf::from("/out/cellSNP.base.vcf.gz"));
        assert_eq!(layout.cells_vcf(), None);
        assert_eq!(layout.samples(), PathBuf::from("/out/cellSNP.samples.tsv"));
    }

    #[test]
    fn headers_are_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), false, true);
        let roster =
            SampleRoster::from_barcodes(vec!["BBB".to_string(), "AAA".to_string()]).unwrap();
        write_headers(&layout, &roster).unwrap();

        let mtx = std::fs::read_to_string(&layout.mtx()[0]).unwrap();
        assert_eq!(mtx, MTX_PREAMBLE);
        let samples = std::fs::read_to_string(layout.samples()).unwrap();
        assert_eq!(samples, "AAA\nBBB\n");
        let base = std::fs::read_to_string(layout.base_vcf()).unwrap();
        assert_eq!(
            base,
            "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"
        );
        let cells = std::fs::read_to_string(layout.cells_vcf().unwrap()).unwrap();
        assert!(cells.contains("##contig=<ID=22>\n##contig=<ID=X>\n##contig=<ID=Y>\n"));
        assert!(cells.ends_with("INFO\tFORMAT\tAAA\tBBB\n"));
    }

    #[test]
    fn direct_mode_appends_numbered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), false, false);
        let roster = SampleRoster::from_sample_ids(vec!["s0".into(), "s1".into()]).unwrap();
        write_headers(&layout, &roster).unwrap();

        let (table, agg) = site(&[&[0, 0, 2], &[2, 3]], false);
        let mut writer = SiteWriter::open(&layout.site_files(), WriteMode::Direct, false).unwrap();
        let snp = Snp::new("chr2", 41, None, None);
        writer.write_site(&snp, &table, &agg).unwrap();
        writer.write_site(&snp, &table, &agg).unwrap();
        let totals = writer.finish().unwrap();
        assert_eq!(totals.sites, 2);
        // AD: both samples; DP: both; OTH: only s1.
        assert_eq!(totals.records, [4, 4, 2]);

        let ad = std::fs::read_to_string(&layout.mtx()[0]).unwrap();
        assert_eq!(ad, format!("{}1\t1\t1\n1\t2\t1\n2\t1\t1\n2\t2\t1\n", MTX_PREAMBLE));
        let base = std::fs::read_to_string(layout.base_vcf()).unwrap();
        assert!(base.ends_with("chr2\t42\t.\tA\tG\t.\tPASS\tAD=2;DP=4;OTH=1\n"));
    }

    #[test]
    fn fragment_mode_separates_sites_with_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let files = SiteFiles::fragments(dir.path(), 3, false);
        assert!(files.mtx[2].ends_with("cellSNP.tag.OTH.mtx.3"));
        let (table, agg) = site(&[&[0, 0, 2]], false);
        let mut writer = SiteWriter::open(&files, WriteMode::Fragment, false).unwrap();
        writer
            .write_site(&Snp::new("1", 9, None, None), &table, &agg)
            .unwrap();
        writer.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&files.mtx[0]).unwrap(), "1\t1\t1\n\n");
        assert_eq!(std::fs::read_to_string(&files.mtx[2]).unwrap(), "\n");
    }

    #[test]
    fn sample_columns_follow_the_format() {
        let (table, _) = site(&[&[0; 4], &[]], true);
        let mut line = String::new();
        push_sample_column(&mut line, &table.groups()[0], false);
        let fields: Vec<&str> = line.split(':').collect();
        assert_eq!(fields[0], "0/0");
        assert_eq!(&fields[1..4], &["0", "4", "0"]);
        assert_eq!(fields[4].split(',').count(), 3);
        assert_eq!(fields[5], "4,0,0,0,0");

        let mut doublet = String::new();
        push_sample_column(&mut doublet, &table.groups()[0], true);
        assert_eq!(doublet.split(':').nth(4).unwrap().split(',').count(), 5);

        let mut empty = String::new();
        push_sample_column(&mut empty, &table.groups()[1], false);
        assert_eq!(empty, ".:.:.:.:.:.");
    }

    #[test]
    fn summary_line_layout() {
        assert_eq!(mtx_summary_line(12, 3, 30), "12\t3\t30\n");
    }
}
