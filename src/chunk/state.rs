//! Stream-wide parse state used to validate chunk ordering.

use super::id::{self, ChunkId, Signature};
use super::schema::*;
use crate::util::{ColorType, Fault};

/// What has been seen so far and which image, if any, is open.
#[derive(Clone, Debug)]
pub struct ParseState {
    pub container: Signature,
    /// `HAS_*` flags from [`super::schema`].
    pub has: u32,
    /// Sequence number of the last chunk accepted (1-based).
    pub seq: u32,
    /// Nesting depth of headers (MHDR, embedded images).
    pub image_level: u32,
    pub color_type: Option<ColorType>,
    pub bit_depth: u8,
    /// Delta type of the open DHDR.
    pub delta_type: Option<u8>,
    /// Entries in the palette of the open image.
    pub palette_len: usize,
    pub has_global_palette: bool,
    pub has_global_trns: bool,
    /// Stream declared itself older than MNG draft 48.
    pub pre_draft48: bool,
}

impl ParseState {
    pub fn new(container: Signature) -> Self {
        Self {
            container,
            has: 0,
            seq: 0,
            image_level: 0,
            color_type: None,
            bit_depth: 0,
            delta_type: None,
            palette_len: 0,
            has_global_palette: false,
            has_global_trns: false,
            pre_draft48: false,
        }
    }

    #[inline]
    pub fn has(&self, flag: u32) -> bool {
        self.has & flag != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u32) {
        self.has |= flag;
    }

    /// Inside an embedded image (between a header and its IEND).
    #[inline]
    pub fn embedded(&self) -> bool {
        self.has(IMAGE_HEADERS)
    }

    /// Color type used to gate type-dependent fields.
    ///
    /// Top-level chunks carry the full truecolor layout.
    pub fn gate_type(&self) -> Option<ColorType> {
        if self.embedded() {
            self.color_type
        } else {
            Some(ColorType::Rgba)
        }
    }

    /// Close the open image after IEND.
    pub fn end_image(&mut self) {
        self.has &= !(IMAGE_HEADERS | HAS_IDAT | HAS_PLTE | HAS_JDAT | HAS_JDAA | HAS_JSEP);
        self.color_type = None;
        self.bit_depth = 0;
        self.delta_type = None;
        self.palette_len = 0;
        self.image_level = self.image_level.saturating_sub(1);
    }

    fn container_bit(&self) -> u8 {
        match self.container {
            Signature::Png => IN_PNG,
            Signature::Jng => IN_JNG,
            Signature::Mng => IN_MNG,
        }
    }

    fn expected_header(&self) -> ChunkId {
        match self.container {
            Signature::Png => id::IHDR,
            Signature::Jng => id::JHDR,
            Signature::Mng => id::MHDR,
        }
    }

    /// Check a chunk against container, requirement and forbid rules.
    ///
    /// `seq` is the number the chunk will receive.
    pub fn check_sequence(&self, chunk: ChunkId, schema: &ChunkSchema) -> Result<(), Fault> {
        if self.seq == 0 && chunk != self.expected_header() {
            return Err(Fault::HeaderNotFirst);
        }
        if schema.containers & self.container_bit() == 0 {
            return Err(Fault::WrongContainer);
        }

        let req = schema.requires;
        if req & REQ_GEN_HDR != 0 && !self.embedded() {
            let global_ok = self.container == Signature::Mng && schema.has_flag(GLOBAL);
            if !global_ok {
                return Err(Fault::MissingPredecessor);
            }
        }
        let needs = [
            (REQ_JHDR, HAS_JHDR),
            (REQ_MHDR, HAS_MHDR),
            (REQ_DHDR, HAS_DHDR),
            (REQ_SAVE, HAS_SAVE),
            (REQ_PLTE, HAS_PLTE),
        ];
        for (bit, flag) in needs {
            if req & bit != 0 && !self.has(flag) {
                return Err(Fault::MissingPredecessor);
            }
        }

        if self.has & schema.forbids != 0 {
            return Err(Fault::Forbidden);
        }
        Ok(())
    }
}
