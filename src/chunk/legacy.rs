//! Compatibility shims for streams written before the format settled.
//!
//! - Pre-draft-48 LOOP bodies put the termination byte before the repeat
//!   count, and FRAM used a different numbering of framing modes.
//! - Some old writers stored the MAGN methods as 16-bit values. The layout is
//!   guessed from the payload length and, for the one ambiguous length, from
//!   the field values.
//!
//! Pre-draft-48 handling is enabled either by
//! [`DecoderOptions::legacy_pre_draft48`](crate::core::DecoderOptions) or by
//! a `draft NN` nEED keyword with `NN < 48`.

use byteorder::{BigEndian, ByteOrder};

/// Last draft using the old LOOP/FRAM layout.
pub const LAST_LEGACY_DRAFT: u32 = 47;

/// Map an old framing mode onto the current numbering.
///
/// Lossy: several old modes collapse onto mode 1.
pub const fn remap_fram_mode(mode: u8) -> u8 {
    match mode {
        0 => 0,
        1 => 3,
        2 => 4,
        3 | 4 => 1,
        5 => 2,
        _ => 1,
    }
}

/// Whether a MAGN payload uses 16-bit method fields.
pub fn magn_is_wide(data: &[u8]) -> bool {
    match data.len() {
        6 | 8 | 10 | 12 | 14 | 16 | 20 => true,
        18 => {
            let at = |i: usize| BigEndian::read_u16(&data[i..i + 2]);
            at(4) <= 5 && (6..=16).step_by(2).all(|i| at(i) < 256)
        }
        _ => false,
    }
}

/// Payload lengths valid for the standard MAGN layout.
pub const fn magn_len_ok(len: usize, wide: bool) -> bool {
    if wide {
        matches!(len, 0 | 2 | 4 | 6 | 8 | 10 | 12 | 14 | 16 | 18 | 20)
    } else {
        matches!(len, 0 | 2 | 4 | 5 | 7 | 9 | 11 | 13 | 15 | 17 | 18)
    }
}

/// Parse a `draft NN` keyword; `None` for anything else.
pub fn draft_number(keyword: &[u8]) -> Option<u32> {
    let text = std::str::from_utf8(keyword).ok()?;
    let num = text.strip_prefix("draft ")?;
    num.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fram_remap() {
        assert_eq!(remap_fram_mode(0), 0);
        assert_eq!(remap_fram_mode(1), 3);
        assert_eq!(remap_fram_mode(2), 4);
        assert_eq!(remap_fram_mode(4), 1);
        assert_eq!(remap_fram_mode(5), 2);
        assert_eq!(remap_fram_mode(9), 1);
    }

    #[test]
    fn test_magn_layout_detection() {
        assert!(magn_is_wide(&[0; 6]));
        assert!(magn_is_wide(&[0; 20]));
        assert!(!magn_is_wide(&[0; 5]));
        assert!(!magn_is_wide(&[0; 17]));

        // 18 bytes with small 16-bit values: old layout
        let mut data = [0u8; 18];
        data[5] = 1;
        data[7] = 2;
        assert!(magn_is_wide(&data));

        // method byte followed by a large multiplier: new layout
        data[4] = 1;
        assert!(!magn_is_wide(&data));
    }

    #[test]
    fn test_draft_number() {
        assert_eq!(draft_number(b"draft 47"), Some(47));
        assert_eq!(draft_number(b"draft 99"), Some(99));
        assert_eq!(draft_number(b"MNG-1.0"), None);
        assert_eq!(draft_number(b"draft x"), None);
    }
}
