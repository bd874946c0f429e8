//! Base-quality genotype likelihoods.
//!
//! Every base quality becomes a vector of log-probabilities for the four ways
//! a read can support a genotype (`QUAL_STATES`); summing those per observed
//! base gives the quality matrix, from which the diploid (and optional
//! doublet) likelihoods are read off.

use crate::core::error::{CellsnpError, Result};
use crate::engine::position::NUM_BASES;
use crate::pipeline::pileup::group::{SampleGroup, MAX_LIKELIHOODS, QUAL_STATES};

/// Base qualities are capped at this Phred value.
pub const QUAL_CAP: f64 = 45.0;
/// Base qualities are floored at this Phred value.
pub const QUAL_FLOOR: f64 = 0.25;

/// Genotype labels in likelihood order.
pub const DIPLOID_GENOTYPES: [&str; 3] = ["0/0", "1/0", "1/1"];
/// Number of likelihoods reported with doublet states enabled.
pub const DOUBLET_LIKELIHOODS: usize = MAX_LIKELIHOODS;

/// Log-probability vector for one base quality.
///
/// Index 0: the read base is the true allele. 1: one of three alleles in a
/// 3:1 doublet. 2: one of two alleles in a heterozygote. 3: a sequencing error
/// into this specific base.
pub fn quality_vector(qual: u8) -> Result<[f64; QUAL_STATES]> {
    let phred = (qual as f64).min(QUAL_CAP).max(QUAL_FLOOR);
    let err = 10f64.powf(-phred / 10.0);
    let vector = [
        (1.0 - err).ln(),
        (3.0 / 4.0 - 2.0 / 3.0 * err).ln(),
        (1.0 / 2.0 - 1.0 / 3.0 * err).ln(),
        (err / 3.0).ln(),
    ];
    if vector.iter().all(|v| v.is_finite()) {
        Ok(vector)
    } else {
        Err(CellsnpError::MalformedQuality(qual))
    }
}

/// Sum quality vectors for every stored quality into `group.qual_matrix`.
pub fn accumulate_quality_matrix(group: &mut SampleGroup) -> Result<()> {
    for base in 0..NUM_BASES {
        for &qual in group.quals[base].iter() {
            let vector = quality_vector(qual)?;
            for (acc, v) in group.qual_matrix[base].iter_mut().zip(vector.iter()) {
                *acc += v;
            }
        }
    }
    Ok(())
}

/// Natural-log likelihoods: 0/0, 1/0, 1/1, then the doublet states 0.5 and 1.5.
pub fn genotype_likelihoods(
    qual_matrix: &[[f64; QUAL_STATES]; NUM_BASES],
    ref_idx: usize,
    alt_idx: usize,
) -> [f64; MAX_LIKELIHOODS] {
    let others: f64 = (0..NUM_BASES)
        .filter(|&b| b != ref_idx && b != alt_idx)
        .map(|b| qual_matrix[b][3])
        .sum();
    let r = &qual_matrix[ref_idx];
    let a = &qual_matrix[alt_idx];
    [
        r[0] + a[3] + others,
        r[2] + a[2] + others,
        r[3] + a[0] + others,
        r[1] + a[2] + others,
        r[2] + a[1] + others,
    ]
}

/// Convert a natural-log likelihood to a Phred-scaled value.
#[inline]
pub fn phred_scale(log_likelihood: f64) -> f64 {
    -10.0 * log_likelihood / std::f64::consts::LN_10
}

/// Index of the most likely diploid genotype; earlier states win ties.
pub fn best_genotype(likelihoods: &[f64; MAX_LIKELIHOODS]) -> usize {
    let mut best = 0;
    for i in 1..DIPLOID_GENOTYPES.len() {
        if likelihoods[i] > likelihoods[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_vector_matches_the_error_model() {
        let v = quality_vector(30).unwrap();
        let e = 0.001f64;
        assert!((v[0] - (1.0 - e).ln()).abs() < 1e-12);
        assert!((v[1] - (0.75 - 2.0 * e / 3.0).ln()).abs() < 1e-12);
        assert!((v[2] - (0.5 - e / 3.0).ln()).abs() < 1e-12);
        assert!((v[3] - (e / 3.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn quality_is_capped_and_floored() {
        assert_eq!(quality_vector(60).unwrap(), quality_vector(45).unwrap());
        // Missing qualities (0xff) are capped too.
        assert_eq!(quality_vector(255).unwrap(), quality_vector(45).unwrap());
        let floor = quality_vector(0).unwrap();
        assert!(floor.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn homozygous_reference_reads_favour_0_0() {
        let mut matrix = [[0.0; QUAL_STATES]; NUM_BASES];
        let v = quality_vector(30).unwrap();
        for _ in 0..10 {
            for k in 0..QUAL_STATES {
                matrix[0][k] += v[k];
            }
        }
        let gl = genotype_likelihoods(&matrix, 0, 2);
        assert_eq!(best_genotype(&gl), 0);
        assert!(phred_scale(gl[0]) < phred_scale(gl[1]));
    }

    #[test]
    fn balanced_reads_favour_heterozygote() {
        let mut matrix = [[0.0; QUAL_STATES]; NUM_BASES];
        let v = quality_vector(30).unwrap();
        for base in [0usize, 2] {
            for _ in 0..8 {
                for k in 0..QUAL_STATES {
                    matrix[base][k] += v[k];
                }
            }
        }
        let gl = genotype_likelihoods(&matrix, 0, 2);
        assert_eq!(best_genotype(&gl), 1);
        assert_eq!(DIPLOID_GENOTYPES[best_genotype(&gl)], "1/0");
    }

    #[test]
    fn phred_scale_of_certainty_is_zero() {
        assert_eq!(phred_scale(0.0), 0.0);
        assert!((phred_scale(0.1f64.ln()) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn accumulates_every_stored_quality() {
        let mut group = crate::pipeline::pileup::testing::empty_group();
        group.quals[3] = vec![30, 30, 20];
        accumulate_quality_matrix(&mut group).unwrap();
        let expected = 2.0 * quality_vector(30).unwrap()[0] + quality_vector(20).unwrap()[0];
        assert!((group.qual_matrix[3][0] - expected).abs() < 1e-12);
        assert_eq!(group.qual_matrix[0], [0.0; QUAL_STATES]);
    }
}
