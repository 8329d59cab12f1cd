//! Field tables for every known chunk type.
//!
//! Each table lists the payload fields in wire order. Irregular payloads end
//! in a hook field decoded by [`super::hooks`].

use super::field::*;

type F = FieldRule;

// ============================================================================
// PNG
// ============================================================================

pub static IHDR: &[F] = &[
    F::int("width", 4, 1, 0).no_high_bit(),
    F::int("height", 4, 1, 0).no_high_bit(),
    F::int("bit_depth", 1, 1, 16).checked(is_png_depth),
    F::int("color_type", 1, 0, 6).checked(is_png_color),
    F::int("compression", 1, 0, 0).checked(is_zero),
    F::int("filter", 1, 0, 0).checked(is_filter_method),
    F::int("interlace", 1, 0, 1),
];

pub static PLTE: &[F] = &[F::hook("entries")];

pub static IDAT: &[F] = &[F::raw("data").length("data_len")];

pub static TRNS: &[F] = &[F::hook("entries")];

pub static GAMA: &[F] = &[F::int("gamma", 4, 0, 0)];

pub static CHRM: &[F] = &[
    F::int("white_x", 4, 0, 0),
    F::int("white_y", 4, 0, 0),
    F::int("red_x", 4, 0, 0),
    F::int("red_y", 4, 0, 0),
    F::int("green_x", 4, 0, 0),
    F::int("green_y", 4, 0, 0),
    F::int("blue_x", 4, 0, 0),
    F::int("blue_y", 4, 0, 0),
];

pub static SRGB: &[F] = &[F::int("intent", 1, 0, 4)];

pub static ICCP: &[F] = &[
    F::keyword("name", 1, 79),
    F::int("compression", 1, 0, 0),
    F::deflated("profile").length("profile_len"),
];

pub static TEXT: &[F] = &[F::keyword("keyword", 1, 79), F::text("text", 0)];

pub static ZTXT: &[F] = &[
    F::keyword("keyword", 1, 79),
    F::int("compression", 1, 0, 0),
    F::deflated("text"),
];

pub static ITXT: &[F] = &[
    F::keyword("keyword", 1, 79),
    F::int("compression_flag", 1, 0, 1),
    F::int("compression_method", 1, 0, 0),
    F::keyword("language", 0, 0),
    F::keyword("translation", 0, 0),
    F::hook("text"),
];

pub static BKGD: &[F] = &[
    F::int("index", 1, 0, 0xFF).gated(IF_INDEXED),
    F::int("gray", 2, 0, 0xFFFF).gated(IF_GRAY | IF_GRAY_ALPHA),
    F::int("red", 2, 0, 0xFFFF).gated(IF_RGB | IF_RGBA),
    F::int("green", 2, 0, 0xFFFF).gated(IF_RGB | IF_RGBA),
    F::int("blue", 2, 0, 0xFFFF).gated(IF_RGB | IF_RGBA),
];

pub static PHYS: &[F] = &[
    F::int("x", 4, 0, 0),
    F::int("y", 4, 0, 0),
    F::int("unit", 1, 0, 1),
];

pub static SBIT: &[F] = &[
    F::int("bits0", 1, 0, 0xFF),
    F::int("bits1", 1, 0, 0xFF).gated(IF_RGB | IF_INDEXED | IF_GRAY_ALPHA | IF_RGBA),
    F::int("bits2", 1, 0, 0xFF).gated(IF_RGB | IF_INDEXED | IF_RGBA),
    F::int("bits3", 1, 0, 0xFF).gated(IF_RGBA),
];

pub static SPLT: &[F] = &[
    F::keyword("name", 1, 79),
    F::int("sample_depth", 1, 8, 16),
    F::hook("entries"),
];

pub static HIST: &[F] = &[F::hook("entries")];

pub static TIME: &[F] = &[
    F::int("year", 2, 0, 0xFFFF),
    F::int("month", 1, 1, 12),
    F::int("day", 1, 1, 31),
    F::int("hour", 1, 0, 24),
    F::int("minute", 1, 0, 60),
    F::int("second", 1, 0, 60),
];

// ============================================================================
// JNG
// ============================================================================

pub static JHDR: &[F] = &[
    F::int("width", 4, 1, 0).no_high_bit(),
    F::int("height", 4, 1, 0).no_high_bit(),
    F::int("color_type", 1, 8, 16).checked(is_jng_color),
    F::int("sample_depth", 1, 8, 20).checked(is_jng_depth),
    F::int("compression", 1, 8, 8),
    F::int("interlace", 1, 0, 8).checked(is_jng_interlace),
    F::int("alpha_depth", 1, 0, 16).checked(is_alpha_depth),
    F::int("alpha_compression", 1, 0, 8).checked(is_alpha_compression),
    F::int("alpha_filter", 1, 0, 0).checked(is_filter_method),
    F::int("alpha_interlace", 1, 0, 1),
];

pub static JDAT: &[F] = &[F::raw("data").length("data_len")];

pub static JDAA: &[F] = &[F::raw("data").length("data_len")];

// ============================================================================
// MNG
// ============================================================================

pub static MHDR: &[F] = &[
    F::int("width", 4, 0, 0),
    F::int("height", 4, 0, 0),
    F::int("ticks", 4, 0, 0),
    F::int("layer_count", 4, 0, 0),
    F::int("frame_count", 4, 0, 0),
    F::int("play_time", 4, 0, 0),
    F::int("simplicity", 4, 0, 0),
];

pub static LOOP: &[F] = &[F::hook("body")];

pub static ENDL: &[F] = &[F::int("level", 1, 0, 0xFF)];

pub static DEFI: &[F] = &[
    F::int("object_id", 2, 0, 0xFFFF),
    F::int("do_not_show", 1, 0, 0xFF).optional().presence("has_do_not_show"),
    F::int("concrete", 1, 0, 0xFF).optional().presence("has_concrete"),
    F::signed("x").group1().presence("has_location"),
    F::signed("y").group1(),
    F::signed("clip_left").group2().presence("has_clip"),
    F::signed("clip_right").group2(),
    F::signed("clip_top").group2(),
    F::signed("clip_bottom").group2(),
];

pub static BASI: &[F] = &[
    F::int("width", 4, 0, 0),
    F::int("height", 4, 0, 0),
    F::int("bit_depth", 1, 1, 16).checked(is_png_depth),
    F::int("color_type", 1, 0, 6).checked(is_png_color),
    F::int("compression", 1, 0, 0).checked(is_zero),
    F::int("filter", 1, 0, 0).checked(is_filter_method),
    F::int("interlace", 1, 0, 1),
    F::int("red", 2, 0, 0xFFFF).group1(),
    F::int("green", 2, 0, 0xFFFF).group1(),
    F::int("blue", 2, 0, 0xFFFF).group1(),
    F::int("alpha", 2, 0, 0xFFFF).optional().presence("has_alpha"),
    F::int("viewable", 1, 0, 1).optional().presence("has_viewable"),
];

pub static CLON: &[F] = &[
    F::int("source_id", 2, 0, 0xFFFF),
    F::int("clone_id", 2, 0, 0xFFFF),
    F::int("clone_type", 1, 0, 2).optional(),
    F::int("do_not_show", 1, 0, 1).optional().presence("has_do_not_show"),
    F::int("concrete", 1, 0, 1).optional().presence("has_concrete"),
    F::int("location_type", 1, 0, 2).group1().presence("has_location"),
    F::signed("x").group1(),
    F::signed("y").group1(),
];

pub static PAST: &[F] = &[F::hook("body")];

pub static DISC: &[F] = &[F::hook("ids")];

pub static BACK: &[F] = &[
    F::int("red", 2, 0, 0xFFFF),
    F::int("green", 2, 0, 0xFFFF),
    F::int("blue", 2, 0, 0xFFFF),
    F::int("mandatory", 1, 0, 3).optional(),
    F::int("image_id", 2, 0, 0xFFFF).optional(),
    F::int("tile", 1, 0, 1).optional(),
];

pub static FRAM: &[F] = &[
    F::int("mode", 1, 0, 4).optional(),
    F::keyword("name", 0, 79).optional(),
    F::hook("changes").optional(),
];

pub static MOVE: &[F] = &[
    F::int("first_id", 2, 0, 0xFFFF),
    F::int("last_id", 2, 0, 0xFFFF),
    F::int("move_type", 1, 0, 1),
    F::signed("x"),
    F::signed("y"),
];

pub static CLIP: &[F] = &[
    F::int("first_id", 2, 0, 0xFFFF),
    F::int("last_id", 2, 0, 0xFFFF),
    F::int("clip_type", 1, 0, 1),
    F::signed("left"),
    F::signed("right"),
    F::signed("top"),
    F::signed("bottom"),
];

pub static SHOW: &[F] = &[
    F::int("first_id", 2, 1, 0xFFFF),
    F::int("last_id", 2, 1, 0xFFFF).optional().presence("has_last_id"),
    F::int("mode", 1, 0, 7).optional(),
];

pub static TERM: &[F] = &[
    F::int("action", 1, 0, 3),
    F::int("iteration_action", 1, 0, 2).group1(),
    F::int("delay", 4, 0, 0).group1(),
    F::int("iteration_max", 4, 0, 0).group1(),
];

pub static SAVE: &[F] = &[F::hook("entries")];

pub static SEEK: &[F] = &[F::text("name", 79)];

pub static EXPI: &[F] = &[F::int("snapshot_id", 2, 0, 0xFFFF), F::text("name", 79)];

pub static FPRI: &[F] = &[
    F::int("delta_type", 1, 0, 1),
    F::int("priority", 1, 0, 0xFF),
];

pub static NEED: &[F] = &[F::hook("keywords")];

pub static PHYG: &[F] = &[
    F::int("x", 4, 0, 0),
    F::int("y", 4, 0, 0),
    F::int("unit", 1, 0, 1),
];

pub static DHDR: &[F] = &[
    F::int("object_id", 2, 0, 0xFFFF),
    F::int("image_type", 1, 0, 2),
    F::int("delta_type", 1, 0, 7),
    F::int("block_width", 4, 0, 0).group1().presence("has_block_size"),
    F::int("block_height", 4, 0, 0).group1(),
    F::int("block_x", 4, 0, 0).group2().presence("has_block_location"),
    F::int("block_y", 4, 0, 0).group2(),
];

pub static PROM: &[F] = &[
    F::int("color_type", 1, 0, 14).checked(is_prom_color),
    F::int("bit_depth", 1, 0, 16).checked(is_png_depth),
    F::int("fill", 1, 0, 1),
];

pub static PPLT: &[F] = &[F::int("delta_type", 1, 0, 5), F::hook("entries")];

pub static DROP: &[F] = &[F::hook("ids")];

pub static DBYK: &[F] = &[
    F::int("chunk_name", 4, 0, 0),
    F::int("polarity", 1, 0, 1),
    F::text("keywords", 0),
];

pub static ORDR: &[F] = &[F::hook("entries")];

pub static MAGN: &[F] = &[F::hook("body")];

pub static EVNT: &[F] = &[F::hook("entries")];

pub static UNKNOWN: &[F] = &[F::raw("data").length("data_len")];

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<(&'static str, &'static [F])> {
        vec![
            ("IHDR", IHDR), ("JHDR", JHDR), ("MHDR", MHDR), ("DEFI", DEFI), ("BASI", BASI),
            ("CLON", CLON), ("BACK", BACK), ("FRAM", FRAM), ("SHOW", SHOW), ("TERM", TERM),
            ("DHDR", DHDR), ("ITXT", ITXT), ("SPLT", SPLT), ("PPLT", PPLT),
        ]
    }

    #[test]
    fn test_hook_fields_are_last() {
        for (name, table) in all() {
            for (i, rule) in table.iter().enumerate() {
                if matches!(rule.kind, FieldKind::Hook | FieldKind::Raw | FieldKind::Deflated) {
                    assert_eq!(i, table.len() - 1, "{name}: tail field {} not last", rule.name);
                }
            }
        }
    }

    #[test]
    fn test_groups_are_contiguous() {
        for (name, table) in all() {
            for group in 1..=2 {
                let idx: Vec<usize> = table
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.group() == group)
                    .map(|(i, _)| i)
                    .collect();
                if let (Some(first), Some(last)) = (idx.first(), idx.last()) {
                    assert_eq!(last - first + 1, idx.len(), "{name}: group {group} split");
                }
            }
        }
    }

    #[test]
    fn test_integer_widths() {
        for (_, table) in all() {
            for rule in table.iter().filter(|r| r.kind == FieldKind::Int) {
                assert!(matches!(rule.width, 1 | 2 | 4), "{} width {}", rule.name, rule.width);
            }
        }
    }
}
