//! Genomic position primitives used across cellsnp pipelines.
//!
//! - [`snp::Snp`]: a candidate variant site, optionally with known alleles
//! - [`BASE_ORDER`] and helpers: the fixed `A, C, G, T, N` ordering every count array uses

pub mod snp;

pub use snp::Snp;

/// Number of base categories tracked per site (A, C, G, T, N).
pub const NUM_BASES: usize = 5;

/// Fixed base ordering shared by counts, quality lists and output columns.
pub const BASE_ORDER: [u8; NUM_BASES] = [b'A', b'C', b'G', b'T', b'N'];

/// Index of the catch-all `N` category.
pub const N_INDEX: usize = 4;

/// Map a nucleotide character to its index in [`BASE_ORDER`]; anything else is `N`.
#[inline]
pub fn base_index(base: u8) -> usize {
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => N_INDEX,
    }
}

/// Map a 4-bit BAM sequence code (`=ACMGRSVTWYHKDBN`) to its index in [`BASE_ORDER`].
#[inline]
pub fn nt16_index(code: u8) -> usize {
    match code {
        1 => 0,
        2 => 1,
        4 => 2,
        8 => 3,
        _ => N_INDEX,
    }
}

/// Character for an index in [`BASE_ORDER`].
#[inline]
pub fn base_char(index: usize) -> char {
    BASE_ORDER.get(index).copied().unwrap_or(b'N') as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chars_and_codes_agree() {
        for (code, ch) in [(1u8, b'A'), (2, b'C'), (4, b'G'), (8, b'T'), (15, b'N')] {
            assert_eq!(nt16_index(code), base_index(ch));
        }
    }

    #[test]
    fn ambiguity_codes_collapse_to_n() {
        assert_eq!(nt16_index(3), N_INDEX);
        assert_eq!(base_index(b'R'), N_INDEX);
        assert_eq!(base_char(N_INDEX), 'N');
    }

    #[test]
    fn lower_case_is_accepted() {
        assert_eq!(base_index(b'g'), 2);
        assert_eq!(base_char(base_index(b't')), 'T');
    }
}
