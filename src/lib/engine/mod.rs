pub mod par_snps;
pub mod position;
