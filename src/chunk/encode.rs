//! Record re-encoding.
//!
//! Writes a [`ChunkRecord`] back into payload bytes following the same field
//! rules used to decode it. Deflated fields keep their original compressed
//! bytes, so a decoded payload re-encodes byte for byte.

use super::field::*;
use super::hooks;
use super::index::lookup;
use super::record::ChunkRecord;

/// Encode the payload of a record.
pub fn encode(rec: &ChunkRecord) -> Vec<u8> {
    let mut out = Vec::new();
    if rec.empty {
        return out;
    }
    let schema = lookup(rec.id);
    for rule in schema.fields {
        if rule.kind == FieldKind::Hook {
            hooks::encode(rec, &mut out);
            continue;
        }
        let Some(value) = rec.get(rule.name) else {
            continue;
        };
        match value {
            Value::Int(v) => {
                let bytes = v.to_be_bytes();
                out.extend_from_slice(&bytes[4 - rule.width as usize..]);
            }
            Value::Text { bytes, terminated } => {
                out.extend_from_slice(bytes);
                if *terminated {
                    out.push(0);
                }
            }
            Value::Deflated { compressed, .. } => out.extend_from_slice(compressed),
            Value::Raw(bytes) => out.extend_from_slice(bytes),
            Value::Flag(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::decode::{decode, DecodeEnv};
    use crate::chunk::id::{self, ChunkId};
    use crate::core::{Inflater, ZlibCodec};
    use crate::util::ColorType;
    use proptest::prelude::*;

    fn env(codec: &ZlibCodec) -> DecodeEnv<'_> {
        DecodeEnv {
            seq: 1,
            embedded: false,
            gate_type: Some(ColorType::Rgba),
            color_type: None,
            bit_depth: 0,
            palette_len: 0,
            pre_draft48: false,
            magn_detect: true,
            inflater: codec,
        }
    }

    fn round_trip(chunk: ChunkId, raw: &[u8]) {
        let codec = ZlibCodec::default();
        let rec = decode(chunk, lookup(chunk), raw, &env(&codec)).unwrap();
        assert_eq!(encode(&rec), raw, "{chunk}");
    }

    #[test]
    fn test_round_trip_samples() {
        let mut mhdr = Vec::new();
        for v in [320u32, 240, 1000, 3, 2, 0, 0x41] {
            mhdr.extend_from_slice(&v.to_be_bytes());
        }
        round_trip(id::MHDR, &mhdr);
        round_trip(id::DEFI, &[0, 1, 1, 0, 0, 0, 0, 5, 0xFF, 0xFF, 0xFF, 0xFB]);
        round_trip(id::BACK, &[0, 1, 0, 2, 0, 3, 1]);
        round_trip(id::FRAM, b"\x01name\0\x00\x00\x00\x00");
        round_trip(id::FRAM, b"\x03");
        round_trip(id::TEXT, b"Author\0someone");
        round_trip(id::SEEK, b"segment");
        round_trip(id::TERM, &[3, 0, 0, 0, 0, 10, 0x7F, 0xFF, 0xFF, 0xFF]);
        round_trip(id::ENDL, &[2]);
        round_trip(id::GAMA, &[]);
    }

    #[test]
    fn test_deflated_keeps_stream() {
        let codec = ZlibCodec::default();
        let mut raw = b"icc\0\0".to_vec();
        raw.extend_from_slice(&codec.deflate(&[7u8; 64], 9).unwrap());
        round_trip(id::ICCP, &raw);
    }

    proptest! {
        #[test]
        fn prop_show_round_trip(first in 1u16.., last in proptest::option::of(1u16..), mode in proptest::option::of(0u8..8)) {
            let mut raw = first.to_be_bytes().to_vec();
            if let Some(last) = last {
                raw.extend_from_slice(&last.to_be_bytes());
                if let Some(mode) = mode {
                    raw.push(mode);
                }
            }
            round_trip(id::SHOW, &raw);
        }

        #[test]
        fn prop_move_round_trip(first: u16, last: u16, kind in 0u8..2, x: i32, y: i32) {
            let mut raw = Vec::new();
            raw.extend_from_slice(&first.to_be_bytes());
            raw.extend_from_slice(&last.to_be_bytes());
            raw.push(kind);
            raw.extend_from_slice(&x.to_be_bytes());
            raw.extend_from_slice(&y.to_be_bytes());
            round_trip(id::MOVE, &raw);
        }

        #[test]
        fn prop_palette_round_trip(entries in proptest::collection::vec(any::<[u8; 3]>(), 1..256)) {
            let raw: Vec<u8> = entries.concat();
            round_trip(id::PLTE, &raw);
        }

        #[test]
        fn prop_disc_round_trip(ids in proptest::collection::vec(any::<u16>(), 1..16)) {
            let raw: Vec<u8> = ids.iter().flat_map(|i| i.to_be_bytes()).collect();
            round_trip(id::DISC, &raw);
        }
    }
}
