pub mod pileup;

pub use pileup::{run_pileup, PileupArgs};
