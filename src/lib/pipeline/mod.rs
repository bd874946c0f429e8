pub mod pileup;
