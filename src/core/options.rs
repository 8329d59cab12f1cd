//! Decoder configuration.

use crate::chunk::ChunkId;

/// Default limit for canvas and image dimensions.
pub const DEFAULT_MAX_CANVAS: u32 = 10_000;

/// Options controlling decoding and playback.
///
/// Build with [`DecoderOptions::default`] and the `with_*` setters.
#[derive(Clone, Debug, PartialEq)]
pub struct DecoderOptions {
    /// Append animation records to the log so the stream can be replayed.
    pub cache_playback: bool,
    /// Verify the CRC of every chunk.
    pub check_crc: bool,
    /// Maximum width and height of the canvas and of any image.
    pub max_canvas: (u32, u32),
    /// Gamma of the output device.
    pub display_gamma: f64,
    /// Gamma assumed for images without gAMA/sRGB/iCCP.
    pub file_gamma_default: f64,
    /// Unknown critical chunks that may be skipped instead of aborting.
    pub allow_unknown_critical: Vec<ChunkId>,
    /// Decode LOOP/FRAM in the layout used before MNG draft 48.
    pub legacy_pre_draft48: bool,
    /// Detect MAGN streams written with 16-bit method fields.
    pub legacy_magn_detect: bool,
    /// Keep decoded records for inspection.
    pub store_chunks: bool,
    /// Largest chunk payload accepted.
    pub max_chunk_len: u32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            cache_playback: true,
            check_crc: true,
            max_canvas: (DEFAULT_MAX_CANVAS, DEFAULT_MAX_CANVAS),
            display_gamma: 2.2,
            file_gamma_default: 0.45455,
            allow_unknown_critical: Vec::new(),
            legacy_pre_draft48: false,
            legacy_magn_detect: true,
            store_chunks: false,
            max_chunk_len: crate::chunk::id::MAX_CHUNK_LENGTH,
        }
    }
}

impl DecoderOptions {
    pub fn with_cache_playback(mut self, on: bool) -> Self {
        self.cache_playback = on;
        self
    }

    pub fn with_check_crc(mut self, on: bool) -> Self {
        self.check_crc = on;
        self
    }

    pub fn with_max_canvas(mut self, width: u32, height: u32) -> Self {
        self.max_canvas = (width, height);
        self
    }

    pub fn with_display_gamma(mut self, gamma: f64) -> Self {
        self.display_gamma = gamma;
        self
    }

    pub fn with_file_gamma_default(mut self, gamma: f64) -> Self {
        self.file_gamma_default = gamma;
        self
    }

    pub fn allow_critical(mut self, chunk: ChunkId) -> Self {
        if !self.allow_unknown_critical.contains(&chunk) {
            self.allow_unknown_critical.push(chunk);
        }
        self
    }

    pub fn with_legacy_pre_draft48(mut self, on: bool) -> Self {
        self.legacy_pre_draft48 = on;
        self
    }

    pub fn with_legacy_magn_detect(mut self, on: bool) -> Self {
        self.legacy_magn_detect = on;
        self
    }

    pub fn with_store_chunks(mut self, on: bool) -> Self {
        self.store_chunks = on;
        self
    }

    pub fn with_max_chunk_len(mut self, len: u32) -> Self {
        self.max_chunk_len = len;
        self
    }

    /// Whether an unknown critical chunk is tolerated.
    #[inline]
    pub fn is_allowed_critical(&self, chunk: ChunkId) -> bool {
        self.allow_unknown_critical.contains(&chunk)
    }

    /// Whether `width` x `height` fits the configured maximum.
    #[inline]
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.max_canvas.0 && height <= self.max_canvas.1
    }
}
