//! Animation records.
//!
//! One record per chunk with a playback effect. Records own everything
//! they need, including snapshots of decoded images, so a cached stream can
//! be replayed without the original bytes.

use crate::chunk::{EventEntry, FrameChanges, LoopSpec, PaletteRange, PasteSpec};
use crate::core::TermInfo;
use crate::object::{CloneKind, DeltaType, Fill, ImageData, Location, Magnification, ObjectDef, PaletteDelta};
use crate::util::{ColorType, Rect, Rgb16, Rgb8};

/// Playback counters at the moment a record first took effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stamp {
    pub frame: u32,
    pub layer: u32,
    /// Milliseconds since the start of the animation.
    pub time: u64,
}

/// BACK parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Background {
    pub color: Rgb16,
    /// Bit 0: color mandatory, bit 1: image mandatory.
    pub mandatory: u8,
    /// Object tiled or placed behind every frame; 0 for none.
    pub image_id: u16,
    pub tile: bool,
}

/// DHDR block after its IEND.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaImage {
    pub object_id: u16,
    pub kind: DeltaType,
    /// Block position inside the target.
    pub origin: (u32, u32),
    /// Delta pixels; absent for no-change deltas and palette-only blocks.
    pub image: Option<Box<ImageData>>,
}

/// The replayable effect of one chunk.
#[derive(Clone, Debug, PartialEq)]
pub enum AnimationRecord {
    /// Top-level PLTE.
    Palette(Vec<Rgb8>),
    /// Top-level tRNS, raw.
    Transparency(Vec<u8>),
    /// Top-level gAMA; `None` for an empty chunk.
    Gamma(Option<u32>),
    Chroma(Option<[u32; 8]>),
    Srgb(Option<u8>),
    Icc(Option<Vec<u8>>),
    /// Top-level bKGD.
    BackgroundColor(Option<Rgb16>),
    Loop(LoopSpec),
    EndLoop {
        level: u8,
    },
    DefineObject {
        id: u16,
        def: ObjectDef,
    },
    /// BASI image.
    BaseImage {
        object_id: u16,
        data: Box<ImageData>,
    },
    Clone {
        source: u16,
        target: u16,
        kind: CloneKind,
        visible: bool,
        abstract_: bool,
        location: Option<Location>,
    },
    Background(Background),
    Frame {
        /// 0 keeps the current mode.
        mode: u8,
        name: Vec<u8>,
        changes: Option<FrameChanges>,
    },
    Move {
        first: u16,
        last: u16,
        location: Location,
    },
    Clip {
        first: u16,
        last: u16,
        relative: bool,
        rect: Rect,
    },
    Show {
        first: u16,
        last: u16,
        mode: u8,
    },
    Terminate(TermInfo),
    Save,
    Seek {
        name: Vec<u8>,
    },
    Delta(DeltaImage),
    Promote {
        object_id: u16,
        color_type: ColorType,
        bit_depth: u8,
        fill: Fill,
    },
    PartialPalette {
        object_id: u16,
        kind: PaletteDelta,
        ranges: Vec<PaletteRange>,
    },
    Magnify {
        first: u16,
        last: u16,
        mag: Magnification,
    },
    Paste(PasteSpec),
    Discard(Vec<u16>),
    Event(Vec<EventEntry>),
    /// IHDR or JHDR image.
    Image {
        object_id: u16,
        data: Box<ImageData>,
    },
    /// MEND, or IEND of a single-image stream.
    End,
}

impl AnimationRecord {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Palette(_) => "palette",
            Self::Transparency(_) => "transparency",
            Self::Gamma(_) => "gamma",
            Self::Chroma(_) => "chroma",
            Self::Srgb(_) => "srgb",
            Self::Icc(_) => "icc",
            Self::BackgroundColor(_) => "background-color",
            Self::Loop(_) => "loop",
            Self::EndLoop { .. } => "end-loop",
            Self::DefineObject { .. } => "define-object",
            Self::BaseImage { .. } => "base-image",
            Self::Clone { .. } => "clone",
            Self::Background(_) => "background",
            Self::Frame { .. } => "frame",
            Self::Move { .. } => "move",
            Self::Clip { .. } => "clip",
            Self::Show { .. } => "show",
            Self::Terminate(_) => "terminate",
            Self::Save => "save",
            Self::Seek { .. } => "seek",
            Self::Delta(_) => "delta",
            Self::Promote { .. } => "promote",
            Self::PartialPalette { .. } => "partial-palette",
            Self::Magnify { .. } => "magnify",
            Self::Paste(_) => "paste",
            Self::Discard(_) => "discard",
            Self::Event(_) => "event",
            Self::Image { .. } => "image",
            Self::End => "end",
        }
    }

    /// Whether this record can put pixels on the canvas.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::BaseImage { .. } | Self::Delta(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(AnimationRecord::Save.name(), "save");
        assert_eq!(AnimationRecord::EndLoop { level: 1 }.name(), "end-loop");
        assert!(!AnimationRecord::End.is_image());
        let img = AnimationRecord::Image { object_id: 0, data: Box::new(ImageData::empty()) };
        assert!(img.is_image());
    }

    #[test]
    fn test_stamp_order() {
        let a = Stamp { frame: 1, layer: 3, time: 100 };
        let b = Stamp { frame: 2, layer: 0, time: 0 };
        assert!(a < b);
    }
}
