//! Field descriptors.
//!
//! A [`FieldRule`] describes one field of a chunk payload: how many bytes it
//! takes, how to interpret them and which constraints apply. Chunk payloads
//! are described by ordered rule lists in [`super::tables`].

use crate::util::ColorType;

/// Field may be absent; sets the presence flag when consumed.
pub const OPTIONAL: u16 = 0x0001;
/// Member of the first all-or-nothing group.
pub const GROUP1: u16 = 0x0002;
/// Member of the second all-or-nothing group.
pub const GROUP2: u16 = 0x0004;
/// 32-bit value must fit in 31 bits.
pub const NO_HIGH_BIT: u16 = 0x0008;
/// Text is terminated by a NUL byte (or the end of the payload).
pub const TERMINATED: u16 = 0x0010;
/// Integer is two's-complement signed; range checks are skipped.
pub const SIGNED: u16 = 0x0020;

/// Image-type gate: field applies to grayscale images.
pub const IF_GRAY: u8 = 0x01;
/// Image-type gate: field applies to truecolor images.
pub const IF_RGB: u8 = 0x02;
/// Image-type gate: field applies to indexed images.
pub const IF_INDEXED: u8 = 0x04;
/// Image-type gate: field applies to grayscale+alpha images.
pub const IF_GRAY_ALPHA: u8 = 0x08;
/// Image-type gate: field applies to truecolor+alpha images.
pub const IF_RGBA: u8 = 0x10;

/// Gate bit for a color type (JPEG types gate like their PNG twins).
pub const fn gate_bit(color_type: ColorType) -> u8 {
    match color_type {
        ColorType::Gray | ColorType::JpegGray => IF_GRAY,
        ColorType::Rgb | ColorType::JpegColor => IF_RGB,
        ColorType::Indexed => IF_INDEXED,
        ColorType::GrayAlpha | ColorType::JpegGrayAlpha => IF_GRAY_ALPHA,
        ColorType::Rgba | ColorType::JpegColorAlpha => IF_RGBA,
    }
}

/// Per-field validation beyond the numeric range.
pub type FieldCheck = fn(u32) -> bool;

/// How the bytes of a field are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned big-endian integer of `width` bytes.
    Int,
    /// Byte string; NUL-terminated with [`TERMINATED`], else the remainder.
    Text,
    /// zlib stream occupying the remainder; inflated on decode.
    Deflated,
    /// Remainder copied verbatim.
    Raw,
    /// Remainder handed to the chunk's payload hook.
    Hook,
}

/// One field of a chunk payload.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Lower bound (integers) or minimum length (text); 0 = unbounded.
    pub min: u32,
    /// Upper bound (integers) or maximum length (text); 0 = unbounded.
    pub max: u32,
    /// Byte width for integers.
    pub width: u8,
    pub flags: u16,
    /// Image-type gate mask; 0 = always applies.
    pub gate: u8,
    pub check: Option<FieldCheck>,
    /// Record entry set to a flag telling whether an optional field was present.
    pub presence: Option<&'static str>,
    /// Record entry receiving the byte length of a text/blob field.
    pub length: Option<&'static str>,
}

impl FieldRule {
    const fn base(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            min: 0,
            max: 0,
            width: 0,
            flags: 0,
            gate: 0,
            check: None,
            presence: None,
            length: None,
        }
    }

    /// Integer of `width` bytes in `[min, max]`.
    pub const fn int(name: &'static str, width: u8, min: u32, max: u32) -> Self {
        let mut rule = Self::base(name, FieldKind::Int);
        rule.width = width;
        rule.min = min;
        rule.max = max;
        rule
    }

    /// Signed 32-bit integer.
    pub const fn signed(name: &'static str) -> Self {
        let mut rule = Self::int(name, 4, 0, 0);
        rule.flags = SIGNED;
        rule
    }

    /// NUL-terminated text with a length range.
    pub const fn keyword(name: &'static str, min: u32, max: u32) -> Self {
        let mut rule = Self::base(name, FieldKind::Text);
        rule.min = min;
        rule.max = max;
        rule.flags = TERMINATED;
        rule
    }

    /// Text running to the end of the payload.
    pub const fn text(name: &'static str, max: u32) -> Self {
        let mut rule = Self::base(name, FieldKind::Text);
        rule.max = max;
        rule
    }

    pub const fn deflated(name: &'static str) -> Self {
        Self::base(name, FieldKind::Deflated)
    }

    pub const fn raw(name: &'static str) -> Self {
        Self::base(name, FieldKind::Raw)
    }

    pub const fn hook(name: &'static str) -> Self {
        Self::base(name, FieldKind::Hook)
    }

    pub const fn optional(mut self) -> Self {
        self.flags |= OPTIONAL;
        self
    }

    pub const fn group1(mut self) -> Self {
        self.flags |= GROUP1;
        self
    }

    pub const fn group2(mut self) -> Self {
        self.flags |= GROUP2;
        self
    }

    pub const fn no_high_bit(mut self) -> Self {
        self.flags |= NO_HIGH_BIT;
        self
    }

    pub const fn gated(mut self, gate: u8) -> Self {
        self.gate = gate;
        self
    }

    pub const fn checked(mut self, check: FieldCheck) -> Self {
        self.check = Some(check);
        self
    }

    pub const fn presence(mut self, flag: &'static str) -> Self {
        self.presence = Some(flag);
        self
    }

    pub const fn length(mut self, field: &'static str) -> Self {
        self.length = Some(field);
        self
    }

    #[inline]
    pub const fn is_optional(&self) -> bool {
        self.flags & (OPTIONAL | GROUP1 | GROUP2) != 0
    }

    /// Group index (1 or 2), 0 when ungrouped.
    #[inline]
    pub const fn group(&self) -> usize {
        if self.flags & GROUP1 != 0 {
            1
        } else if self.flags & GROUP2 != 0 {
            2
        } else {
            0
        }
    }

    #[inline]
    pub const fn has(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    /// Whether the field applies to the given color type.
    #[inline]
    pub fn applies_to(&self, color_type: Option<ColorType>) -> bool {
        if self.gate == 0 {
            return true;
        }
        match color_type {
            Some(ct) => self.gate & gate_bit(ct) != 0,
            None => false,
        }
    }
}

/// A decoded field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(u32),
    Text { bytes: Vec<u8>, terminated: bool },
    Deflated { compressed: Vec<u8>, inflated: Vec<u8> },
    Raw(Vec<u8>),
    Flag(bool),
}

impl Value {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text { bytes, .. } => Some(bytes),
            Self::Deflated { inflated, .. } => Some(inflated),
            Self::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

// Shared checks used by the field tables.

pub fn is_png_depth(v: u32) -> bool {
    matches!(v, 1 | 2 | 4 | 8 | 16)
}

pub fn is_png_color(v: u32) -> bool {
    matches!(v, 0 | 2 | 3 | 4 | 6)
}

pub fn is_zero(v: u32) -> bool {
    v == 0
}

pub fn is_jng_color(v: u32) -> bool {
    matches!(v, 8 | 10 | 12 | 14)
}

pub fn is_jng_depth(v: u32) -> bool {
    matches!(v, 8 | 12 | 20)
}

pub fn is_jng_interlace(v: u32) -> bool {
    matches!(v, 0 | 8)
}

pub fn is_alpha_depth(v: u32) -> bool {
    matches!(v, 0 | 1 | 2 | 4 | 8 | 16)
}

pub fn is_alpha_compression(v: u32) -> bool {
    matches!(v, 0 | 8)
}

pub fn is_prom_color(v: u32) -> bool {
    matches!(v, 0 | 2 | 3 | 4 | 6 | 8 | 10 | 12 | 14)
}

pub fn is_filter_method(v: u32) -> bool {
    matches!(v, 0 | 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let rule = FieldRule::int("x", 4, 0, 0).group1();
        assert_eq!(rule.group(), 1);
        assert!(rule.is_optional());

        let rule = FieldRule::keyword("name", 1, 79);
        assert!(rule.has(TERMINATED));
        assert!(!rule.is_optional());
    }

    #[test]
    fn test_gating() {
        let rule = FieldRule::int("index", 1, 0, 0).gated(IF_INDEXED);
        assert!(rule.applies_to(Some(ColorType::Indexed)));
        assert!(!rule.applies_to(Some(ColorType::Rgb)));
        assert!(!rule.applies_to(None));

        let rule = FieldRule::int("gray", 2, 0, 0).gated(IF_GRAY | IF_GRAY_ALPHA);
        assert!(rule.applies_to(Some(ColorType::JpegGrayAlpha)));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(5).as_u32(), Some(5));
        assert_eq!(Value::Flag(true).as_flag(), Some(true));
        let v = Value::Deflated { compressed: vec![1], inflated: vec![2, 3] };
        assert_eq!(v.as_bytes(), Some(&[2u8, 3][..]));
    }
}
