use crate::core::error::{IoResultExt, Result};
use crate::core::fs::is_gzipped;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const IO_BUFFER_SIZE: usize = 256 * 1024;

/// Open a plain or gzip-compressed text file, deciding by extension.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).with_path(path)?;
    let reader: Box<dyn BufRead> = if is_gzipped(path) {
        Box::new(BufReader::with_capacity(
            IO_BUFFER_SIZE,
            MultiGzDecoder::new(file),
        ))
    } else {
        Box::new(BufReader::with_capacity(IO_BUFFER_SIZE, file))
    };
    Ok(reader)
}

/// Build a tab-delimited CSV reader over a plain or gzip file, skipping `#` lines.
pub fn get_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<Box<dyn BufRead>>> {
    let raw_reader = open_reader(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(raw_reader))
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

/// Buffered output file, optionally gzip-compressed, that remembers its path.
///
/// Call [`OutputFile::finish`] to flush and surface trailing write errors; a
/// dropped handle still flushes but swallows failures.
pub struct OutputFile {
    path: PathBuf,
    sink: Sink,
}

impl OutputFile {
    /// Create (truncate) a file.
    pub fn create<P: AsRef<Path>>(path: P, gzipped: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).with_path(path)?;
        Ok(Self::wrap(path, file, gzipped))
    }

    /// Open a file for appending. Gzip output is appended as a new member.
    pub fn append<P: AsRef<Path>>(path: P, gzipped: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_path(path)?;
        Ok(Self::wrap(path, file, gzipped))
    }

    fn wrap(path: &Path, file: File, gzipped: bool) -> Self {
        let writer = BufWriter::with_capacity(IO_BUFFER_SIZE, file);
        let sink = if gzipped {
            Sink::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            Sink::Plain(writer)
        };
        Self {
            path: path.to_path_buf(),
            sink,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush all buffers and finalize compression.
    pub fn finish(self) -> Result<()> {
        let OutputFile { path, sink } = self;
        match sink {
            Sink::Plain(mut writer) => writer.flush().with_path(path),
            Sink::Gzip(encoder) => {
                let mut writer = encoder.finish().with_path(&path)?;
                writer.flush().with_path(path)
            }
        }
    }
}

impl Write for OutputFile {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match &mut self.sink {
            Sink::Plain(w) => w.write_all(buf),
            Sink::Gzip(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

/// Copy the raw bytes of `src` into `dst`, returning the number of bytes copied.
pub fn copy_file_into(src: &Path, dst: &mut OutputFile) -> Result<u64> {
    let mut reader = BufReader::with_capacity(IO_BUFFER_SIZE, File::open(src).with_path(src)?);
    let dst_path = dst.path().to_path_buf();
    copy_stream(&mut reader, dst).with_path(dst_path)
}

fn copy_stream<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    io::copy(reader, writer)
}

/// Read a list file: one trimmed, non-empty entry per line.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let reader = open_reader(path)?;
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.with_path(path)?;
        let entry = line.trim();
        if !entry.is_empty() {
            entries.push(entry.to_string());
        }
    }
    Ok(entries)
}
