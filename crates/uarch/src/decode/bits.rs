//! Bitfield extraction helpers for fixed-width 32-bit instruction words.

/// Extracts `width` bits starting at `lsb`, zero-extended.
#[inline]
#[must_use]
pub const fn extract(word: u32, lsb: u32, width: u32) -> u32 {
    (word >> lsb) & ((1 << width) - 1)
}

/// Extracts `width` bits starting at `lsb`, sign-extended to 64 bits.
#[inline]
#[must_use]
pub const fn sextract(word: u32, lsb: u32, width: u32) -> i64 {
    let raw = extract(word, lsb, width) as i64;
    let shift = 64 - width;
    (raw << shift) >> shift
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_extract_field() {
        assert_eq!(extract(0xABCD_1234, 0, 4), 0x4);
        assert_eq!(extract(0xABCD_1234, 16, 16), 0xABCD);
        assert_eq!(extract(u32::MAX, 31, 1), 1);
    }

    #[test]
    fn test_sextract_negative() {
        // imm26 of all ones is -1.
        assert_eq!(sextract(0x03FF_FFFF, 0, 26), -1);
        // Top bit clear stays positive.
        assert_eq!(sextract(0x01FF_FFFF, 0, 26), 0x01FF_FFFF);
        // A mid-range negative offset.
        assert_eq!(sextract(0b10_0000_0000_0000 << 5, 5, 14), -8192);
    }

    proptest! {
        #[test]
        fn test_sextract_matches_arithmetic_shift(word: u32, lsb in 0u32..26, width in 1u32..=26) {
            // Reference: left-align the field in 32 bits, arithmetic shift back.
            let expected = i64::from((((word >> lsb) << (32 - width)) as i32) >> (32 - width));
            prop_assert_eq!(sextract(word, lsb, width), expected);
        }

        #[test]
        fn test_sextract_preserves_low_bits(word: u32, width in 1u32..=26) {
            let value = sextract(word, 0, width);
            prop_assert_eq!((value as u64) & ((1 << width) - 1), u64::from(extract(word, 0, width)));
        }
    }
}
