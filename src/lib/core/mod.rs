pub mod concurrency;
pub mod error;
pub mod errors;
pub mod fs;
pub mod io;
pub mod read_filter;

pub mod prelude {
    pub use super::concurrency::{build_worker_pool, determine_allowed_cpus};
    pub use super::error::{CellsnpError, IoResultExt, Result};
    pub use super::errors::is_broken_pipe;
    pub use super::fs::{is_gzipped, make_parent_dirs, with_gz_suffix};
    pub use super::io::{copy_file_into, get_reader, open_reader, read_lines, OutputFile};
    pub use super::read_filter::{DefaultReadFilter, ReadFilter, ReadReject};
}
