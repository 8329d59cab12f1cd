//! Decoded chunk records.
//!
//! A [`ChunkRecord`] is the generic product of the decoder: the ordered
//! regular fields by name, plus a typed [`Payload`] for the irregular tail.

use smallvec::SmallVec;

use super::field::Value;
use super::id::ChunkId;
use crate::util::{Rect, Rgb8};

/// A decoded chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRecord {
    pub id: ChunkId,
    /// Running sequence number within the stream.
    pub seq: u32,
    /// Empty payload (allowed by the schema).
    pub empty: bool,
    pub fields: SmallVec<[(&'static str, Value); 8]>,
    pub payload: Payload,
}

impl ChunkRecord {
    pub fn new(id: ChunkId, seq: u32) -> Self {
        Self { id, seq, empty: false, fields: SmallVec::new(), payload: Payload::None }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn push(&mut self, name: &'static str, value: Value) {
        self.fields.push((name, value));
    }

    #[inline]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(Value::as_u32)
    }

    pub fn u16(&self, name: &str) -> Option<u16> {
        self.u32(name).map(|v| v as u16)
    }

    pub fn u8(&self, name: &str) -> Option<u8> {
        self.u32(name).map(|v| v as u8)
    }

    /// Signed field (stored as raw 32-bit pattern).
    pub fn i32(&self, name: &str) -> Option<i32> {
        self.u32(name).map(|v| v as i32)
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(Value::as_bytes)
    }

    /// Text field as lossy UTF-8.
    pub fn text(&self, name: &str) -> Option<String> {
        self.bytes(name).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Presence flag; false when missing.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_flag).unwrap_or(false)
    }
}

/// Typed payload of chunks whose layout is too irregular for field rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    Palette(Vec<Rgb8>),
    Transparency(Transparency),
    Histogram(Vec<u16>),
    SuggestedPalette(Vec<SpltEntry>),
    /// iTXt text: `raw` as stored on the wire, `text` after optional inflate.
    IntlText { raw: Vec<u8>, text: Vec<u8> },
    Loop(LoopSpec),
    Frame(FrameChanges),
    Save(SaveSpec),
    Magnify(MagnifySpec),
    Paste(PasteSpec),
    /// DISC object ids.
    ObjectIds(Vec<u16>),
    /// DROP chunk names.
    ChunkNames(Vec<ChunkId>),
    /// ORDR entries: chunk name and order type.
    Order(Vec<(ChunkId, u8)>),
    PartialPalette(Vec<PaletteRange>),
    Events(Vec<EventEntry>),
    /// nEED keywords, NUL separated on the wire.
    Keywords(Vec<Vec<u8>>),
}

/// tRNS contents by image type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transparency {
    Gray(u16),
    Rgb(u16, u16, u16),
    /// Alpha per palette entry.
    Indexed(Vec<u8>),
    /// Top-level tRNS: raw bytes interpreted by the image inheriting it.
    Global(Vec<u8>),
}

/// One sPLT entry; 8-bit palettes widen into 16-bit fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpltEntry {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub alpha: u16,
    pub frequency: u16,
}

/// LOOP body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopSpec {
    pub level: u8,
    pub repeat: u32,
    pub termination: Option<u8>,
    pub iter_min: Option<u32>,
    pub iter_max: Option<u32>,
    pub signals: Vec<u32>,
    /// Stored in the pre-draft-48 layout.
    pub legacy: bool,
}

/// FRAM change block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameChanges {
    pub change_delay: u8,
    pub change_timeout: u8,
    pub change_clip: u8,
    pub change_sync: u8,
    pub delay: Option<u32>,
    pub timeout: Option<u32>,
    /// Boundary type and rectangle.
    pub clip: Option<(u8, Rect)>,
    pub sync_ids: Vec<u32>,
}

/// SAVE body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveSpec {
    /// 4 or 8 byte offsets.
    pub offset_size: u8,
    pub entries: Vec<SaveEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveEntry {
    /// 0 = segment with full info, 1 = segment, 2 = subframe, 3 = exported image.
    pub entry_type: u8,
    pub offset: u64,
    pub start_time: u64,
    pub layer: u32,
    pub frame: u32,
    pub name: Vec<u8>,
}

/// MAGN body with defaults applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MagnifySpec {
    pub first_id: u16,
    pub last_id: u16,
    pub method_x: u8,
    pub mx: u16,
    pub my: u16,
    pub ml: u16,
    pub mr: u16,
    pub mt: u16,
    pub mb: u16,
    pub method_y: u8,
    /// Bytes present on the wire.
    pub wire_len: u8,
    /// Methods stored as 16-bit values (old writers).
    pub wide: bool,
}

impl Default for MagnifySpec {
    fn default() -> Self {
        Self {
            first_id: 0,
            last_id: 0,
            method_x: 0,
            mx: 1,
            my: 1,
            ml: 1,
            mr: 1,
            mt: 1,
            mb: 1,
            method_y: 0,
            wire_len: 0,
            wide: false,
        }
    }
}

/// PAST body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasteSpec {
    pub dest_id: u16,
    /// 0 = absolute, 1 = relative to the previous PAST target.
    pub target_type: u8,
    pub target_x: i32,
    pub target_y: i32,
    pub sources: Vec<PasteSource>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PasteSource {
    pub source_id: u16,
    /// 0 = over, 1 = replace, 2 = under.
    pub composition: u8,
    /// 0 = as is, 2 = flip both, 4 = flip x, 6 = flip y, 8 = tile.
    pub orientation: u8,
    /// 0 = relative to destination origin, 1 = relative to the target.
    pub offset_type: u8,
    pub offset_x: i32,
    pub offset_y: i32,
    pub boundary_type: u8,
    pub boundary: Rect,
}

/// PPLT index range with its entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaletteRange {
    pub first: u8,
    pub last: u8,
    /// Per-index values: RGB, alpha only, or RGBA depending on the delta type.
    pub entries: Vec<[u8; 4]>,
}

/// One evNT entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventEntry {
    pub event_type: u8,
    pub mask_type: u8,
    pub bounds: Rect,
    pub object_id: u16,
    pub index: u8,
    pub segment: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::id;

    #[test]
    fn test_accessors() {
        let mut rec = ChunkRecord::new(id::DEFI, 3);
        rec.push("object_id", Value::Int(7));
        rec.push("x", Value::Int((-5i32) as u32));
        rec.push("has_location", Value::Flag(true));
        rec.push("has_clip", Value::Flag(false));

        assert_eq!(rec.u16("object_id"), Some(7));
        assert_eq!(rec.i32("x"), Some(-5));
        assert!(rec.flag("has_location"));
        assert!(!rec.flag("has_clip"));
        assert!(!rec.flag("missing"));
        assert!(rec.has("has_clip"));
        assert_eq!(rec.u32("clip_left"), None);
    }

    #[test]
    fn test_text_accessor() {
        let mut rec = ChunkRecord::new(id::TEXT, 0);
        rec.push("keyword", Value::Text { bytes: b"Title".to_vec(), terminated: true });
        assert_eq!(rec.text("keyword").as_deref(), Some("Title"));
        assert_eq!(rec.bytes("keyword"), Some(&b"Title"[..]));
    }

    #[test]
    fn test_magnify_defaults() {
        let spec = MagnifySpec::default();
        assert_eq!((spec.mx, spec.my, spec.ml, spec.mr, spec.mt, spec.mb), (1, 1, 1, 1, 1, 1));
        assert_eq!(spec.method_x, 0);
    }
}
