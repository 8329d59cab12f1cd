//! Turning decoded chunks into animation records.
//!
//! The [`Processor`] validates chunk order against the [`ParseState`],
//! decodes each chunk through its schema, assembles embedded images and
//! emits the [`AnimationRecord`]s the engine replays. It never touches the
//! canvas or the object store.

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};

use crate::anim::{AnimationRecord, Background, DeltaImage};
use crate::chunk::legacy::{draft_number, remap_fram_mode, LAST_LEGACY_DRAFT};
use crate::chunk::schema::*;
use crate::chunk::{
    decode, id, lookup, ChunkId, ChunkRecord, DecodeEnv, MagnifySpec, ParseState, Payload, RawChunk, Signature,
    Transparency,
};
use crate::core::{Callbacks, ColorInfo, DecoderOptions, Inflater, JpegCodec, RowFilter, TermInfo, INTRAPIXEL_METHOD};
use crate::object::pixel::{max_value, set, widen};
use crate::object::{
    decode_jng, decode_png, CloneKind, DeltaType, Fill, GlobalDefaults, ImageData, ImageHeader, JngAlpha, JngParts,
    Location, Magnification, ObjectDef, PaletteDelta,
};
use crate::util::{ColorType, Error, Fault, Point, Rect, Result, Rgb16, Rgb8, Warning};

/// Reserved MHDR simplicity bits; any of them set means features this
/// decoder does not know.
const SIMPLICITY_RESERVED: u32 = 0x0000_FC00;

/// Header of the stream (MHDR, or IHDR/JHDR of a single image).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub signature: Signature,
    pub width: u32,
    pub height: u32,
    /// Ticks per second; 0 for single images.
    pub ticks: u32,
    pub layer_count: u32,
    pub frame_count: u32,
    pub play_time: u32,
    pub simplicity: u32,
}

impl StreamInfo {
    /// Whether the simplicity profile announces transparency.
    ///
    /// Without a valid profile transparency must be assumed.
    pub const fn expects_alpha(&self) -> bool {
        self.simplicity & 0x01 == 0 || self.simplicity & 0x08 != 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImageKind {
    Png,
    Jng(JngAlpha),
    /// BASI with its fill color.
    Basi([u16; 4]),
}

/// An image between its header and IEND.
#[derive(Debug)]
struct PendingImage {
    object_id: u16,
    kind: ImageKind,
    header: ImageHeader,
    palette: Vec<Rgb8>,
    transparency: Option<Transparency>,
    color: ColorInfo,
    background: Option<Rgb16>,
    idat: Vec<u8>,
    jng: JngParts,
    viewable: bool,
    /// Larger than the configured maximum: parsed but not decoded.
    skip: bool,
}

/// An open DHDR block.
#[derive(Clone, Copy, Debug)]
struct PendingDelta {
    object_id: u16,
    kind: DeltaType,
    origin: (u32, u32),
    /// Declared block width and height.
    block: Option<(u32, u32)>,
}

/// Chunk-to-record translator.
pub struct Processor {
    opts: DecoderOptions,
    inflater: Box<dyn Inflater>,
    filter: Box<dyn RowFilter>,
    jpeg: Option<Box<dyn JpegCodec>>,
    state: Option<ParseState>,
    info: Option<StreamInfo>,
    image: Option<PendingImage>,
    delta: Option<PendingDelta>,
    /// Target of images outside DEFI is object 0; DEFI changes it.
    current_object: u16,
    globals: GlobalDefaults,
    global_palette: Vec<Rgb8>,
    global_trns: Option<Vec<u8>>,
    warnings: Vec<Warning>,
    chunks: Vec<ChunkRecord>,
    counts: BTreeMap<ChunkId, u32>,
    last_id: Option<ChunkId>,
    finished: bool,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("info", &self.info)
            .field("current_object", &self.current_object)
            .field("warnings", &self.warnings.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn sequence(chunk: ChunkId, seq: u32, fault: Fault) -> Error {
    Error::sequence(chunk, seq, fault)
}

impl Processor {
    pub fn new(
        opts: DecoderOptions,
        inflater: Box<dyn Inflater>,
        filter: Box<dyn RowFilter>,
        jpeg: Option<Box<dyn JpegCodec>>,
    ) -> Self {
        Self {
            opts,
            inflater,
            filter,
            jpeg,
            state: None,
            info: None,
            image: None,
            delta: None,
            current_object: 0,
            globals: GlobalDefaults::default(),
            global_palette: Vec::new(),
            global_trns: None,
            warnings: Vec::new(),
            chunks: Vec::new(),
            counts: BTreeMap::new(),
            last_id: None,
            finished: false,
        }
    }

    /// Start a stream of type `signature`.
    pub fn begin(&mut self, signature: Signature) {
        let mut state = ParseState::new(signature);
        state.pre_draft48 = self.opts.legacy_pre_draft48;
        self.state = Some(state);
    }

    /// Whether [`begin`](Self::begin) has been called.
    #[inline]
    pub fn has_begun(&self) -> bool {
        self.state.is_some()
    }

    #[inline]
    pub fn options(&self) -> &DecoderOptions {
        &self.opts
    }

    pub fn set_jpeg(&mut self, jpeg: Option<Box<dyn JpegCodec>>) {
        self.jpeg = jpeg;
    }

    pub fn set_inflater(&mut self, inflater: Box<dyn Inflater>) {
        self.inflater = inflater;
    }

    pub fn set_row_filter(&mut self, filter: Box<dyn RowFilter>) {
        self.filter = filter;
    }

    #[inline]
    pub fn info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Decoded chunks, kept when `store_chunks` is on.
    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    /// Chunks seen per id.
    pub fn counts(&self) -> &BTreeMap<ChunkId, u32> {
        &self.counts
    }

    /// MEND, or IEND of a single image, has been processed.
    #[inline]
    pub fn finished(&self) -> bool {
        self.finished
    }

    fn state(&self) -> Result<&ParseState> {
        self.state.as_ref().ok_or(Error::FunctionInvalid("stream signature not read"))
    }

    fn state_mut(&mut self) -> Result<&mut ParseState> {
        self.state.as_mut().ok_or(Error::FunctionInvalid("stream signature not read"))
    }

    fn warn(&mut self, chunk: ChunkId, seq: u32, fault: Fault) {
        let warning = Warning { chunk, seq, fault };
        tracing::warn!(%warning, "ignored");
        self.warnings.push(warning);
    }

    /// Process one chunk, appending the records it produces to `out`.
    pub fn process(&mut self, chunk: &RawChunk, cb: &mut dyn Callbacks, out: &mut Vec<AnimationRecord>) -> Result<()> {
        let id = chunk.id;
        if self.finished {
            tracing::debug!(chunk = %id, "chunk after end of stream ignored");
            return Ok(());
        }
        let schema = lookup(id);
        let seq = self.state()?.seq + 1;
        *self.counts.entry(id).or_default() += 1;

        if !schema.is_known() && id.is_critical() && !self.opts.is_allowed_critical(id) {
            return Err(Error::UnknownCritical(id));
        }
        if let Err(fault) = self.state()?.check_sequence(id, schema) {
            if id.is_ancillary() && fault != Fault::HeaderNotFirst {
                self.warn(id, seq, fault);
                self.state_mut()?.seq = seq;
                return Ok(());
            }
            return Err(sequence(id, seq, fault));
        }

        let rec = {
            let state = self.state()?;
            let env = DecodeEnv::from_state(state, seq, self.opts.legacy_magn_detect, self.inflater.as_ref());
            decode(id, schema, &chunk.data, &env)?
        };
        self.state_mut()?.seq = seq;
        tracing::trace!(chunk = %id, seq, len = chunk.data.len(), "chunk");

        self.handle(schema.special, &rec, cb, out)?;
        self.last_id = Some(id);
        if self.opts.store_chunks {
            self.chunks.push(rec);
        }
        Ok(())
    }

    fn handle(&mut self, special: Special, rec: &ChunkRecord, cb: &mut dyn Callbacks, out: &mut Vec<AnimationRecord>) -> Result<()> {
        let (id, seq) = (rec.id, rec.seq);
        let embedded = self.state()?.embedded();
        match special {
            Special::Mhdr => self.mhdr(rec, cb)?,
            Special::Mend => {
                out.push(AnimationRecord::End);
                self.finished = true;
            }
            Special::Ihdr => self.ihdr(rec, cb)?,
            Special::Jhdr => self.jhdr(rec, cb)?,
            Special::Basi => self.basi(rec)?,
            Special::Dhdr => {
                let kind = DeltaType::from_u8(rec.u8("delta_type").unwrap_or(0))
                    .ok_or_else(|| Error::malformed(id, seq, Fault::InvalidDelta, rec.u32("delta_type").unwrap_or(0) as u64, 7))?;
                let origin = (rec.u32("block_x").unwrap_or(0), rec.u32("block_y").unwrap_or(0));
                let block = rec
                    .flag("has_block_size")
                    .then(|| (rec.u32("block_width").unwrap_or(0), rec.u32("block_height").unwrap_or(0)));
                self.delta = Some(PendingDelta { object_id: rec.u16("object_id").unwrap_or(0), kind, origin, block });
                let state = self.state_mut()?;
                state.set(HAS_DHDR);
                state.delta_type = Some(kind as u8);
            }
            Special::Iend => self.iend(rec, out)?,
            Special::Plte => self.plte(rec, embedded, out)?,
            Special::Trns => self.trns(rec, embedded, out)?,
            Special::Idat => {
                let state = self.state()?;
                let indexed = state.color_type == Some(ColorType::Indexed);
                if indexed && !state.has(HAS_PLTE) && self.delta.is_none() {
                    return Err(sequence(id, seq, Fault::PaletteMissing));
                }
                let img = self.image.as_mut().ok_or_else(|| sequence(id, seq, Fault::MissingPredecessor))?;
                let data = rec.bytes("data").unwrap_or_default();
                match img.kind {
                    ImageKind::Jng(_) => img.jng.idat.extend_from_slice(data),
                    _ => img.idat.extend_from_slice(data),
                }
                self.state_mut()?.set(HAS_IDAT);
            }
            Special::Jdat => {
                let separated = self.state()?.has(HAS_JSEP);
                let img = self.image.as_mut().ok_or_else(|| sequence(id, seq, Fault::MissingPredecessor))?;
                // After JSEP only the 12-bit part follows; the 8-bit part is enough.
                if !separated {
                    img.jng.jdat.extend_from_slice(rec.bytes("data").unwrap_or_default());
                }
                self.state_mut()?.set(HAS_JDAT);
            }
            Special::Jdaa => {
                let img = self.image.as_mut().ok_or_else(|| sequence(id, seq, Fault::MissingPredecessor))?;
                img.jng.jdaa.extend_from_slice(rec.bytes("data").unwrap_or_default());
                self.state_mut()?.set(HAS_JDAA);
            }
            Special::Jsep => self.state_mut()?.set(HAS_JSEP),
            Special::Gama => {
                let gamma = rec.u32("gamma");
                self.color_chunk(embedded, rec.empty, out, |c| c.gamma = gamma, AnimationRecord::Gamma(gamma));
            }
            Special::Chrm => {
                let names = ["white_x", "white_y", "red_x", "red_y", "green_x", "green_y", "blue_x", "blue_y"];
                let chroma = (!rec.empty).then(|| names.map(|n| rec.u32(n).unwrap_or(0)));
                self.color_chunk(embedded, rec.empty, out, |c| c.chroma = chroma, AnimationRecord::Chroma(chroma));
            }
            Special::Srgb => {
                let intent = rec.u8("intent");
                self.color_chunk(embedded, rec.empty, out, |c| c.srgb = intent, AnimationRecord::Srgb(intent));
            }
            Special::Iccp => {
                let profile = rec.bytes("profile").map(<[u8]>::to_vec);
                let copy = profile.clone();
                self.color_chunk(embedded, rec.empty, out, |c| c.icc = copy, AnimationRecord::Icc(profile));
            }
            Special::Bkgd => self.bkgd(rec, embedded, out)?,
            Special::Text => {
                let keyword = rec.text("keyword").unwrap_or_default();
                let text = match &rec.payload {
                    Payload::IntlText { text, .. } => String::from_utf8_lossy(text).into_owned(),
                    _ => rec.text("text").unwrap_or_default(),
                };
                if !cb.process_text(id, &keyword, &text) {
                    return Err(Error::Callback("process_text"));
                }
            }
            Special::Loop => {
                if !self.opts.cache_playback {
                    return Err(Error::LoopWithCacheOff);
                }
                if let Payload::Loop(spec) = &rec.payload {
                    out.push(AnimationRecord::Loop(spec.clone()));
                }
                self.state_mut()?.set(HAS_LOOP);
            }
            Special::Endl => out.push(AnimationRecord::EndLoop { level: rec.u8("level").unwrap_or(0) }),
            Special::Defi => {
                let id = rec.u16("object_id").unwrap_or(0);
                let clip = rec.flag("has_clip").then(|| {
                    Rect::new(
                        rec.i32("clip_left").unwrap_or(0),
                        rec.i32("clip_right").unwrap_or(0),
                        rec.i32("clip_top").unwrap_or(0),
                        rec.i32("clip_bottom").unwrap_or(0),
                    )
                });
                let def = ObjectDef {
                    visible: rec.u8("do_not_show").unwrap_or(0) != 1,
                    concrete: rec.u8("concrete").unwrap_or(0) == 1,
                    position: Point::new(rec.i32("x").unwrap_or(0), rec.i32("y").unwrap_or(0)),
                    clip,
                };
                self.current_object = id;
                out.push(AnimationRecord::DefineObject { id, def });
            }
            Special::Clon => {
                let kind = CloneKind::from_u8(rec.u8("clone_type").unwrap_or(0))
                    .ok_or_else(|| Error::malformed(id, seq, Fault::OutOfRange, rec.u32("clone_type").unwrap_or(0) as u64, 2))?;
                let location = rec.flag("has_location").then(|| {
                    Location::from_type(rec.u8("location_type").unwrap_or(0), rec.i32("x").unwrap_or(0), rec.i32("y").unwrap_or(0))
                });
                out.push(AnimationRecord::Clone {
                    source: rec.u16("source_id").unwrap_or(0),
                    target: rec.u16("clone_id").unwrap_or(0),
                    kind,
                    visible: rec.u8("do_not_show").unwrap_or(0) != 1,
                    abstract_: rec.u8("concrete").unwrap_or(0) == 1,
                    location,
                });
            }
            Special::Past => {
                if let Payload::Paste(spec) = &rec.payload {
                    out.push(AnimationRecord::Paste(spec.clone()));
                }
            }
            Special::Disc => {
                let ids = match &rec.payload {
                    Payload::ObjectIds(ids) => ids.clone(),
                    _ => Vec::new(),
                };
                out.push(AnimationRecord::Discard(ids));
            }
            Special::Back => {
                let color = Rgb16 {
                    r: rec.u16("red").unwrap_or(0),
                    g: rec.u16("green").unwrap_or(0),
                    b: rec.u16("blue").unwrap_or(0),
                };
                out.push(AnimationRecord::Background(Background {
                    color,
                    mandatory: rec.u8("mandatory").unwrap_or(0),
                    image_id: rec.u16("image_id").unwrap_or(0),
                    tile: rec.u8("tile").unwrap_or(0) == 1,
                }));
            }
            Special::Fram => {
                let mut mode = rec.u8("mode").unwrap_or(0);
                if self.state()?.pre_draft48 {
                    mode = remap_fram_mode(mode);
                }
                let changes = match &rec.payload {
                    Payload::Frame(c) => Some(c.clone()),
                    _ => None,
                };
                let name = rec.bytes("name").unwrap_or_default().to_vec();
                out.push(AnimationRecord::Frame { mode, name, changes });
            }
            Special::Move => {
                let location =
                    Location::from_type(rec.u8("move_type").unwrap_or(0), rec.i32("x").unwrap_or(0), rec.i32("y").unwrap_or(0));
                out.push(AnimationRecord::Move {
                    first: rec.u16("first_id").unwrap_or(0),
                    last: rec.u16("last_id").unwrap_or(0),
                    location,
                });
            }
            Special::Clip => {
                let rect = Rect::new(
                    rec.i32("left").unwrap_or(0),
                    rec.i32("right").unwrap_or(0),
                    rec.i32("top").unwrap_or(0),
                    rec.i32("bottom").unwrap_or(0),
                );
                out.push(AnimationRecord::Clip {
                    first: rec.u16("first_id").unwrap_or(0),
                    last: rec.u16("last_id").unwrap_or(0),
                    relative: rec.u8("clip_type").unwrap_or(0) == 1,
                    rect,
                });
            }
            Special::Show => {
                let record = if rec.empty {
                    AnimationRecord::Show { first: 1, last: u16::MAX, mode: 0 }
                } else {
                    let first = rec.u16("first_id").unwrap_or(1);
                    AnimationRecord::Show {
                        first,
                        last: rec.u16("last_id").unwrap_or(first),
                        mode: rec.u8("mode").unwrap_or(0),
                    }
                };
                out.push(record);
            }
            Special::Term => {
                if self.last_id != Some(id::MHDR) {
                    self.warn(id, seq, Fault::MisplacedTerm);
                }
                let term = TermInfo {
                    action: rec.u8("action").unwrap_or(0),
                    iteration_action: rec.u8("iteration_action").unwrap_or(0),
                    delay: rec.u32("delay").unwrap_or(0),
                    iteration_max: rec.u32("iteration_max").unwrap_or(0),
                };
                self.state_mut()?.set(HAS_TERM);
                out.push(AnimationRecord::Terminate(term));
            }
            Special::Save => {
                self.state_mut()?.set(HAS_SAVE);
                out.push(AnimationRecord::Save);
            }
            Special::Seek => {
                out.push(AnimationRecord::Seek { name: rec.bytes("name").unwrap_or_default().to_vec() });
            }
            Special::Prom => {
                let delta = self.delta.ok_or_else(|| sequence(id, seq, Fault::MissingPredecessor))?;
                let raw = rec.u8("color_type").unwrap_or(0);
                let color_type =
                    ColorType::from_u8(raw).ok_or_else(|| Error::malformed(id, seq, Fault::InvalidColorType, raw as u64, 14))?;
                out.push(AnimationRecord::Promote {
                    object_id: delta.object_id,
                    color_type,
                    bit_depth: rec.u8("bit_depth").unwrap_or(8),
                    fill: Fill::from_u8(rec.u8("fill").unwrap_or(0)),
                });
            }
            Special::Pplt => {
                let delta = self.delta.ok_or_else(|| sequence(id, seq, Fault::MissingPredecessor))?;
                let raw = rec.u8("delta_type").unwrap_or(0);
                let kind =
                    PaletteDelta::from_u8(raw).ok_or_else(|| Error::malformed(id, seq, Fault::InvalidDelta, raw as u64, 5))?;
                let ranges = match &rec.payload {
                    Payload::PartialPalette(r) => r.clone(),
                    _ => Vec::new(),
                };
                out.push(AnimationRecord::PartialPalette { object_id: delta.object_id, kind, ranges });
            }
            Special::Magn => {
                let spec = match &rec.payload {
                    Payload::Magnify(spec) => *spec,
                    _ => MagnifySpec::default(),
                };
                out.push(AnimationRecord::Magnify {
                    first: spec.first_id,
                    last: spec.last_id,
                    mag: Magnification::from(&spec),
                });
            }
            Special::Evnt => {
                if let Payload::Events(entries) = &rec.payload {
                    out.push(AnimationRecord::Event(entries.clone()));
                }
            }
            Special::Need => self.need(rec, cb)?,
            Special::Unknown => {
                let data = rec.bytes("data").unwrap_or_default();
                if !cb.process_unknown(id, data) {
                    tracing::debug!(chunk = %id, "unknown chunk skipped");
                }
            }
            Special::Phys
            | Special::Sbit
            | Special::Splt
            | Special::Hist
            | Special::Time
            | Special::Expi
            | Special::Fpri
            | Special::Ipng
            | Special::Ijng
            | Special::Drop
            | Special::Dbyk
            | Special::Ordr => {
                tracing::debug!(chunk = %id, fields = rec.fields.len(), "informational chunk");
            }
        }
        Ok(())
    }

    // ========================================================================
    // Headers
    // ========================================================================

    fn begin_stream(&mut self, mut info: StreamInfo, chunk: ChunkId, seq: u32, cb: &mut dyn Callbacks) -> Result<()> {
        if !self.opts.fits(info.width, info.height) {
            self.warn(chunk, seq, Fault::ImageTooLarge);
            info.width = info.width.min(self.opts.max_canvas.0);
            info.height = info.height.min(self.opts.max_canvas.1);
        }
        tracing::debug!(signature = ?info.signature, width = info.width, height = info.height, ticks = info.ticks, "stream header");
        if !cb.process_header(info.width, info.height) {
            return Err(Error::Callback("process_header"));
        }
        self.info = Some(info);
        Ok(())
    }

    fn mhdr(&mut self, rec: &ChunkRecord, cb: &mut dyn Callbacks) -> Result<()> {
        let simplicity = rec.u32("simplicity").unwrap_or(0);
        if simplicity & 0x01 != 0 && simplicity & SIMPLICITY_RESERVED != 0 {
            return Err(Error::TooComplex(simplicity));
        }
        let info = StreamInfo {
            signature: Signature::Mng,
            width: rec.u32("width").unwrap_or(0),
            height: rec.u32("height").unwrap_or(0),
            ticks: rec.u32("ticks").unwrap_or(0),
            layer_count: rec.u32("layer_count").unwrap_or(0),
            frame_count: rec.u32("frame_count").unwrap_or(0),
            play_time: rec.u32("play_time").unwrap_or(0),
            simplicity,
        };
        self.begin_stream(info, rec.id, rec.seq, cb)?;
        let state = self.state_mut()?;
        state.set(HAS_MHDR);
        state.image_level += 1;
        Ok(())
    }

    fn still_info(signature: Signature, width: u32, height: u32) -> StreamInfo {
        StreamInfo { signature, width, height, ticks: 0, layer_count: 1, frame_count: 1, play_time: 0, simplicity: 0 }
    }

    fn begin_image(&mut self, kind: ImageKind, header: ImageHeader, rec: &ChunkRecord) {
        let skip = !self.opts.fits(header.width, header.height);
        if skip {
            self.warn(rec.id, rec.seq, Fault::ImageTooLarge);
        }
        let object_id = match self.state.as_ref().map(|s| s.container) {
            Some(Signature::Mng) => self.current_object,
            _ => 0,
        };
        self.image = Some(PendingImage {
            object_id,
            kind,
            header,
            palette: Vec::new(),
            transparency: None,
            color: self.globals.color.clone(),
            background: self.globals.background,
            idat: Vec::new(),
            jng: JngParts::default(),
            viewable: true,
            skip,
        });
    }

    fn open_image(&mut self, flag: u32, header: &ImageHeader) -> Result<()> {
        let state = self.state_mut()?;
        state.set(flag);
        state.color_type = Some(header.color_type);
        state.bit_depth = header.bit_depth;
        state.palette_len = 0;
        state.image_level += 1;
        Ok(())
    }

    fn png_header(rec: &ChunkRecord) -> Result<ImageHeader> {
        let raw = rec.u8("color_type").unwrap_or(0);
        let color_type =
            ColorType::from_u8(raw).ok_or_else(|| Error::malformed(rec.id, rec.seq, Fault::InvalidColorType, raw as u64, 6))?;
        let depth = rec.u8("bit_depth").unwrap_or(8);
        if !color_type.allows_depth(depth) {
            return Err(Error::malformed(rec.id, rec.seq, Fault::InvalidBitDepth, depth as u64, 16));
        }
        let mut header =
            ImageHeader::new(rec.u32("width").unwrap_or(0), rec.u32("height").unwrap_or(0), depth, color_type);
        header.compression = rec.u8("compression").unwrap_or(0);
        header.filter = rec.u8("filter").unwrap_or(0);
        header.interlace = rec.u8("interlace").unwrap_or(0);
        Ok(header)
    }

    /// Intrapixel filtering (method 64) is only legal inside MNG.
    fn check_filter_method(&self, rec: &ChunkRecord, name: &str) -> Result<()> {
        let method = rec.u8(name).unwrap_or(0);
        if method == INTRAPIXEL_METHOD && self.state()?.container != Signature::Mng {
            return Err(Error::malformed(rec.id, rec.seq, Fault::InvalidFilter, method as u64, 0));
        }
        Ok(())
    }

    /// A block delta image must have the size its DHDR declared.
    fn check_delta_block(&self, rec: &ChunkRecord, header: &ImageHeader) -> Result<()> {
        let Some(delta) = &self.delta else { return Ok(()) };
        if matches!(delta.kind, DeltaType::FullReplace | DeltaType::NoChange) {
            return Ok(());
        }
        match delta.block {
            Some((w, h)) if (w, h) != (header.width, header.height) => {
                let (value, limit) = if w != header.width { (header.width, w) } else { (header.height, h) };
                Err(Error::malformed(rec.id, rec.seq, Fault::InvalidBlock, value as u64, limit as u64))
            }
            _ => Ok(()),
        }
    }

    fn ihdr(&mut self, rec: &ChunkRecord, cb: &mut dyn Callbacks) -> Result<()> {
        let header = Self::png_header(rec)?;
        self.check_filter_method(rec, "filter")?;
        self.check_delta_block(rec, &header)?;
        if self.state()?.container == Signature::Png {
            self.begin_stream(Self::still_info(Signature::Png, header.width, header.height), rec.id, rec.seq, cb)?;
        }
        self.begin_image(ImageKind::Png, header, rec);
        self.open_image(HAS_IHDR, &header)
    }

    fn jhdr(&mut self, rec: &ChunkRecord, cb: &mut dyn Callbacks) -> Result<()> {
        let raw = rec.u8("color_type").unwrap_or(0);
        let color_type =
            ColorType::from_u8(raw).ok_or_else(|| Error::malformed(rec.id, rec.seq, Fault::InvalidColorType, raw as u64, 14))?;
        let mut header = ImageHeader::new(rec.u32("width").unwrap_or(0), rec.u32("height").unwrap_or(0), 8, color_type);
        header.compression = rec.u8("compression").unwrap_or(8);
        header.interlace = rec.u8("interlace").unwrap_or(0);
        let alpha = JngAlpha {
            depth: rec.u8("alpha_depth").unwrap_or(0),
            compression: rec.u8("alpha_compression").unwrap_or(0),
            filter: rec.u8("alpha_filter").unwrap_or(0),
            interlace: rec.u8("alpha_interlace").unwrap_or(0),
        };
        self.check_filter_method(rec, "alpha_filter")?;
        if self.state()?.container == Signature::Jng {
            self.begin_stream(Self::still_info(Signature::Jng, header.width, header.height), rec.id, rec.seq, cb)?;
        }
        self.begin_image(ImageKind::Jng(alpha), header, rec);
        self.open_image(HAS_JHDR, &header)
    }

    fn basi(&mut self, rec: &ChunkRecord) -> Result<()> {
        let header = Self::png_header(rec)?;
        let opaque = max_value(header.bit_depth);
        let fill = [
            rec.u16("red").unwrap_or(0),
            rec.u16("green").unwrap_or(0),
            rec.u16("blue").unwrap_or(0),
            rec.u16("alpha").unwrap_or(opaque),
        ];
        self.begin_image(ImageKind::Basi(fill), header, rec);
        if let Some(img) = self.image.as_mut() {
            img.viewable = rec.u8("viewable").unwrap_or(0) == 1;
        }
        self.open_image(HAS_BASI, &header)
    }

    // ========================================================================
    // Palette, transparency and color chunks
    // ========================================================================

    fn plte(&mut self, rec: &ChunkRecord, embedded: bool, out: &mut Vec<AnimationRecord>) -> Result<()> {
        let (id, seq) = (rec.id, rec.seq);
        let entries = match &rec.payload {
            Payload::Palette(p) => p.clone(),
            _ => Vec::new(),
        };
        if !embedded {
            self.global_palette.clone_from(&entries);
            self.state_mut()?.has_global_palette = true;
            out.push(AnimationRecord::Palette(entries));
            return Ok(());
        }
        if self.state()?.has(HAS_PLTE) {
            return Err(sequence(id, seq, Fault::MultiplePalettes));
        }
        let palette = if rec.empty {
            if self.global_palette.is_empty() {
                return Err(sequence(id, seq, Fault::NoGlobalPalette));
            }
            self.global_palette.clone()
        } else {
            entries
        };
        let len = palette.len();
        if let Some(img) = self.image.as_mut() {
            img.palette = palette;
        }
        let state = self.state_mut()?;
        state.palette_len = len;
        state.set(HAS_PLTE);
        Ok(())
    }

    fn trns(&mut self, rec: &ChunkRecord, embedded: bool, out: &mut Vec<AnimationRecord>) -> Result<()> {
        let (id, seq) = (rec.id, rec.seq);
        if !embedded {
            let raw = match &rec.payload {
                Payload::Transparency(Transparency::Global(raw)) => raw.clone(),
                _ => Vec::new(),
            };
            self.global_trns = Some(raw.clone());
            self.state_mut()?.has_global_trns = true;
            out.push(AnimationRecord::Transparency(raw));
            return Ok(());
        }
        let trns = if rec.empty {
            let raw = self.global_trns.as_deref().ok_or_else(|| sequence(id, seq, Fault::NoGlobalTransparency))?;
            let color_type = self.state()?.color_type;
            color_type.and_then(|ct| global_transparency(raw, ct)).ok_or_else(|| sequence(id, seq, Fault::NoGlobalTransparency))?
        } else {
            match &rec.payload {
                Payload::Transparency(t) => t.clone(),
                _ => return Ok(()),
            }
        };
        if let Some(img) = self.image.as_mut() {
            img.transparency = Some(trns);
        }
        Ok(())
    }

    /// gAMA, cHRM, sRGB and iCCP: embedded ones describe the open image,
    /// top-level ones become stream defaults.
    fn color_chunk(
        &mut self,
        embedded: bool,
        empty: bool,
        out: &mut Vec<AnimationRecord>,
        apply: impl FnOnce(&mut ColorInfo),
        record: AnimationRecord,
    ) {
        if embedded {
            // Empty embedded chunks keep the inherited global value.
            if let (false, Some(img)) = (empty, self.image.as_mut()) {
                apply(&mut img.color);
            }
        } else {
            apply(&mut self.globals.color);
            out.push(record);
        }
    }

    fn bkgd(&mut self, rec: &ChunkRecord, embedded: bool, out: &mut Vec<AnimationRecord>) -> Result<()> {
        if !embedded {
            let color = (!rec.empty).then(|| Rgb16 {
                r: rec.u16("red").unwrap_or(0),
                g: rec.u16("green").unwrap_or(0),
                b: rec.u16("blue").unwrap_or(0),
            });
            self.globals.background = color;
            out.push(AnimationRecord::BackgroundColor(color));
            return Ok(());
        }
        let Some(img) = self.image.as_mut() else { return Ok(()) };
        if rec.empty {
            return Ok(());
        }
        let depth = img.header.bit_depth;
        let wide = |v: u16| widen(v, depth, 16, true);
        img.background = match img.header.color_type {
            ColorType::Indexed => {
                let i = rec.u8("index").unwrap_or(0) as usize;
                img.palette.get(i).map(|c| Rgb16 { r: c.r as u16 * 257, g: c.g as u16 * 257, b: c.b as u16 * 257 })
            }
            ct if ct.is_gray() => {
                let g = wide(rec.u16("gray").unwrap_or(0));
                Some(Rgb16 { r: g, g, b: g })
            }
            _ => Some(Rgb16 {
                r: wide(rec.u16("red").unwrap_or(0)),
                g: wide(rec.u16("green").unwrap_or(0)),
                b: wide(rec.u16("blue").unwrap_or(0)),
            }),
        };
        Ok(())
    }

    // ========================================================================
    // IEND
    // ========================================================================

    fn build_image(&self, img: PendingImage, seq: u32) -> Result<Option<ImageData>> {
        if img.skip {
            return Ok(None);
        }
        let header = img.header;
        let mut data = ImageData::new(header, false, img.viewable, &self.globals);
        data.color = img.color;
        data.background = img.background;
        data.palette = img.palette;
        data.transparency = img.transparency;
        match img.kind {
            ImageKind::Png => {
                if img.idat.is_empty() {
                    return Err(sequence(id::IEND, seq, Fault::ImageDataMissing));
                }
                data.pixels = decode_png(&header, &img.idat, self.inflater.as_ref(), self.filter.as_ref())?;
            }
            ImageKind::Basi(fill) => {
                if img.idat.is_empty() {
                    fill_pixels(&mut data, fill);
                } else {
                    data.pixels = decode_png(&header, &img.idat, self.inflater.as_ref(), self.filter.as_ref())?;
                }
            }
            ImageKind::Jng(alpha) => {
                if img.jng.jdat.is_empty() {
                    return Err(sequence(id::IEND, seq, Fault::ImageDataMissing));
                }
                let jpeg = self.jpeg.as_deref().ok_or_else(|| Error::Jpeg("no JPEG codec configured".into()))?;
                data.pixels = decode_jng(
                    header.width,
                    header.height,
                    header.color_type,
                    alpha,
                    &img.jng,
                    jpeg,
                    self.inflater.as_ref(),
                    self.filter.as_ref(),
                )?;
                data.alpha_depth = alpha.depth;
            }
        }
        Ok(Some(data))
    }

    fn iend(&mut self, rec: &ChunkRecord, out: &mut Vec<AnimationRecord>) -> Result<()> {
        let container = self.state()?.container;
        let pending = self.image.take();
        let kind = pending.as_ref().map(|p| p.kind);
        let object_id = pending.as_ref().map_or(0, |p| p.object_id);
        let data = match pending {
            Some(img) => self.build_image(img, rec.seq)?,
            None => None,
        };

        if let Some(delta) = self.delta.take() {
            out.push(AnimationRecord::Delta(DeltaImage {
                object_id: delta.object_id,
                kind: delta.kind,
                origin: delta.origin,
                image: data.map(Box::new),
            }));
        } else if let Some(data) = data {
            let data = Box::new(data);
            out.push(match kind {
                Some(ImageKind::Basi(_)) => AnimationRecord::BaseImage { object_id, data },
                _ => AnimationRecord::Image { object_id, data },
            });
        }
        self.state_mut()?.end_image();
        if container != Signature::Mng {
            out.push(AnimationRecord::End);
            self.finished = true;
        }
        Ok(())
    }

    // ========================================================================
    // nEED
    // ========================================================================

    fn need(&mut self, rec: &ChunkRecord, cb: &mut dyn Callbacks) -> Result<()> {
        let Payload::Keywords(keywords) = &rec.payload else { return Ok(()) };
        for keyword in keywords {
            if keyword.len() == 4 {
                let chunk = ChunkId::new(&[keyword[0], keyword[1], keyword[2], keyword[3]]);
                if lookup(chunk).is_known() {
                    continue;
                }
            }
            if let Some(draft) = draft_number(keyword) {
                if draft <= LAST_LEGACY_DRAFT {
                    tracing::debug!(draft, "pre-draft-48 layout");
                    self.state_mut()?.pre_draft48 = true;
                }
                continue;
            }
            match keyword.as_slice() {
                b"MNG-1.0" | b"MNG-1.1" => continue,
                b"CACHEOFF" => {
                    tracing::debug!("stream asks for playback caching off");
                    continue;
                }
                _ => {}
            }
            if !cb.process_need(&String::from_utf8_lossy(keyword)) {
                return Err(sequence(rec.id, rec.seq, Fault::UnsupportedNeed));
            }
        }
        Ok(())
    }
}

/// Interpret a top-level tRNS for an image of type `color_type`.
fn global_transparency(raw: &[u8], color_type: ColorType) -> Option<Transparency> {
    match color_type {
        ColorType::Gray if raw.len() >= 2 => Some(Transparency::Gray(BigEndian::read_u16(raw))),
        ColorType::Rgb if raw.len() >= 6 => Some(Transparency::Rgb(
            BigEndian::read_u16(raw),
            BigEndian::read_u16(&raw[2..]),
            BigEndian::read_u16(&raw[4..]),
        )),
        ColorType::Indexed => Some(Transparency::Indexed(raw.to_vec())),
        _ => None,
    }
}

/// Fill a BASI buffer with its color; channels follow the color type.
fn fill_pixels(data: &mut ImageData, [r, g, b, a]: [u16; 4]) {
    let samples: &[u16] = match data.color_type() {
        ColorType::Gray | ColorType::Indexed => &[r],
        ColorType::GrayAlpha => &[r, a],
        ColorType::Rgb => &[r, g, b],
        _ => &[r, g, b, a],
    };
    let samples = samples.to_vec();
    let bit16 = data.bit_depth() > 8;
    let mask = max_value(data.bit_depth());
    let sample = data.sample_size().max(1);
    for px in data.pixels.chunks_exact_mut(sample) {
        for (c, &v) in samples.iter().enumerate() {
            set(px, c, bit16, v & mask);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NoCallbacks, PngRowFilter, ZlibCodec};

    fn processor(opts: DecoderOptions, sig: Signature) -> Processor {
        let mut p = Processor::new(opts, Box::new(ZlibCodec::default()), Box::new(PngRowFilter), None);
        p.begin(sig);
        p
    }

    fn raw(name: &[u8; 4], data: &[u8]) -> RawChunk {
        let id = ChunkId::new(name);
        RawChunk { id, data: data.to_vec(), crc: crate::chunk::crc(id, data) }
    }

    fn feed(p: &mut Processor, chunks: &[RawChunk]) -> Result<Vec<AnimationRecord>> {
        let mut out = Vec::new();
        for c in chunks {
            p.process(c, &mut NoCallbacks, &mut out)?;
        }
        Ok(out)
    }

    fn ihdr(w: u32, h: u32, depth: u8, ct: u8) -> RawChunk {
        let mut d = Vec::new();
        d.extend_from_slice(&w.to_be_bytes());
        d.extend_from_slice(&h.to_be_bytes());
        d.extend_from_slice(&[depth, ct, 0, 0, 0]);
        raw(b"IHDR", &d)
    }

    fn mhdr(w: u32, h: u32, simplicity: u32) -> RawChunk {
        let mut d = Vec::new();
        for v in [w, h, 1000, 0, 0, 0, simplicity] {
            d.extend_from_slice(&v.to_be_bytes());
        }
        raw(b"MHDR", &d)
    }

    fn idat(rows: &[u8]) -> RawChunk {
        raw(b"IDAT", &ZlibCodec::default().deflate(rows, 6).unwrap())
    }

    #[test]
    fn test_png_image() {
        let mut p = processor(DecoderOptions::default(), Signature::Png);
        let out = feed(&mut p, &[ihdr(1, 1, 8, 0), idat(&[0, 77]), raw(b"IEND", &[])]).unwrap();
        assert_eq!(out.len(), 2);
        match &out[0] {
            AnimationRecord::Image { object_id: 0, data } => {
                assert_eq!((data.width(), data.height(), data.sample_size()), (1, 1, 1));
                assert_eq!(data.pixels, vec![77]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(out[1], AnimationRecord::End);
        assert!(p.finished());
        assert_eq!(p.info().map(|i| (i.width, i.frame_count)), Some((1, 1)));
    }

    #[test]
    fn test_indexed_needs_palette() {
        let mut p = processor(DecoderOptions::default(), Signature::Png);
        let err = feed(&mut p, &[ihdr(1, 1, 8, 3), idat(&[0, 0])]).unwrap_err();
        assert_eq!(err.fault(), Some(Fault::PaletteMissing));
    }

    #[test]
    fn test_global_palette_inherited() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        let out = feed(
            &mut p,
            &[
                mhdr(1, 1, 0),
                raw(b"PLTE", &[1, 2, 3]),
                ihdr(1, 1, 8, 3),
                raw(b"PLTE", &[]),
                idat(&[0, 0]),
                raw(b"IEND", &[]),
            ],
        )
        .unwrap();
        assert_eq!(out[0], AnimationRecord::Palette(vec![Rgb8::new(1, 2, 3)]));
        match &out[1] {
            AnimationRecord::Image { data, .. } => assert_eq!(data.palette, vec![Rgb8::new(1, 2, 3)]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_plte_without_global() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        let err = feed(&mut p, &[mhdr(1, 1, 0), ihdr(1, 1, 8, 3), raw(b"PLTE", &[])]).unwrap_err();
        assert_eq!(err.fault(), Some(Fault::NoGlobalPalette));
    }

    #[test]
    fn test_defi_targets_images() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        let out = feed(
            &mut p,
            &[mhdr(4, 4, 0), raw(b"DEFI", &[0, 5]), ihdr(1, 1, 8, 0), idat(&[0, 1]), raw(b"IEND", &[])],
        )
        .unwrap();
        assert!(matches!(out[0], AnimationRecord::DefineObject { id: 5, .. }));
        assert!(matches!(out[1], AnimationRecord::Image { object_id: 5, .. }));
        assert!(!p.finished());
    }

    #[test]
    fn test_too_complex() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        assert!(matches!(feed(&mut p, &[mhdr(1, 1, 0x0000_0401)]), Err(Error::TooComplex(0x401))));
    }

    #[test]
    fn test_oversize_canvas_warns() {
        let mut p = processor(DecoderOptions::default().with_max_canvas(8, 8), Signature::Mng);
        feed(&mut p, &[mhdr(100, 4, 0)]).unwrap();
        assert_eq!(p.info().map(|i| i.width), Some(8));
        assert_eq!(p.warnings()[0].fault, Fault::ImageTooLarge);
    }

    #[test]
    fn test_misplaced_term_warns() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        let out = feed(&mut p, &[mhdr(1, 1, 0), raw(b"BACK", &[0, 0, 0, 0, 0, 0]), raw(b"TERM", &[0])]).unwrap();
        assert!(matches!(out.last(), Some(AnimationRecord::Terminate(_))));
        assert_eq!(p.warnings().len(), 1);
        assert_eq!(p.warnings()[0].fault, Fault::MisplacedTerm);
    }

    #[test]
    fn test_loop_needs_cache() {
        let mut p = processor(DecoderOptions::default().with_cache_playback(false), Signature::Mng);
        let err = feed(&mut p, &[mhdr(1, 1, 0), raw(b"LOOP", &[0, 0, 0, 0, 2])]);
        assert!(matches!(err, Err(Error::LoopWithCacheOff)));
    }

    #[test]
    fn test_unknown_critical() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        assert!(matches!(feed(&mut p, &[mhdr(1, 1, 0), raw(b"ZZZZ", &[1])]), Err(Error::UnknownCritical(_))));

        let zzzz = ChunkId::new(b"ZZZZ");
        let mut p = processor(DecoderOptions::default().allow_critical(zzzz), Signature::Mng);
        assert!(feed(&mut p, &[mhdr(1, 1, 0), raw(b"ZZZZ", &[1]), raw(b"prVt", &[2])]).is_ok());
        assert_eq!(p.counts().get(&zzzz), Some(&1));
    }

    #[test]
    fn test_need_keywords() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        feed(&mut p, &[mhdr(1, 1, 0), raw(b"nEED", b"draft 47\0MNG-1.0\0PAST")]).unwrap();
        assert!(p.state().unwrap().pre_draft48);
        let err = feed(&mut p, &[raw(b"nEED", b"teleport")]).unwrap_err();
        assert_eq!(err.fault(), Some(Fault::UnsupportedNeed));
    }

    #[test]
    fn test_ancillary_sequence_downgraded() {
        let mut p = processor(DecoderOptions::default(), Signature::Png);
        let out = feed(
            &mut p,
            &[ihdr(1, 1, 8, 0), idat(&[0, 1]), raw(b"gAMA", &[0, 0, 0xB1, 0x8F]), raw(b"IEND", &[])],
        )
        .unwrap();
        assert_eq!(p.warnings().len(), 1);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_delta_block() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        let mut dhdr = vec![0, 1, 1, 1];
        for v in [1u32, 1, 1, 0] {
            dhdr.extend_from_slice(&v.to_be_bytes());
        }
        let out = feed(&mut p, &[mhdr(2, 1, 0), raw(b"DHDR", &dhdr), ihdr(1, 1, 8, 0), idat(&[0, 5]), raw(b"IEND", &[])])
            .unwrap();
        match &out[0] {
            AnimationRecord::Delta(d) => {
                assert_eq!((d.object_id, d.kind, d.origin), (1, DeltaType::BlockPixelAdd, (1, 0)));
                assert_eq!(d.image.as_ref().map(|i| i.pixels.clone()), Some(vec![5]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_delta_block_size_checked() {
        let dhdr = |w: u32, h: u32| {
            let mut d = vec![0, 1, 1, 1];
            for v in [w, h, 0, 0] {
                d.extend_from_slice(&v.to_be_bytes());
            }
            raw(b"DHDR", &d)
        };
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        let err = feed(&mut p, &[mhdr(2, 2, 0), dhdr(2, 1), ihdr(1, 1, 8, 0)]).unwrap_err();
        assert_eq!(err.fault(), Some(Fault::InvalidBlock));

        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        assert!(feed(&mut p, &[mhdr(2, 2, 0), dhdr(1, 1), ihdr(1, 1, 8, 0)]).is_ok());
    }

    #[test]
    fn test_basi_fill() {
        let mut p = processor(DecoderOptions::default(), Signature::Mng);
        let mut basi = Vec::new();
        basi.extend_from_slice(&2u32.to_be_bytes());
        basi.extend_from_slice(&1u32.to_be_bytes());
        basi.extend_from_slice(&[8, 2, 0, 0, 0]);
        for v in [10u16, 20, 30] {
            basi.extend_from_slice(&v.to_be_bytes());
        }
        let out = feed(&mut p, &[mhdr(2, 1, 0), raw(b"BASI", &basi), raw(b"IEND", &[])]).unwrap();
        match &out[0] {
            AnimationRecord::BaseImage { data, .. } => {
                assert_eq!(data.pixels, vec![10, 20, 30, 10, 20, 30]);
                assert!(!data.viewable);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn header_fault(sig: Signature, chunks: &[RawChunk]) -> Option<Fault> {
        let mut p = processor(DecoderOptions::default(), sig);
        feed(&mut p, chunks).err().and_then(|e| e.fault())
    }

    fn jhdr(alpha_filter: u8) -> RawChunk {
        let mut d = Vec::new();
        d.extend_from_slice(&1u32.to_be_bytes());
        d.extend_from_slice(&1u32.to_be_bytes());
        d.extend_from_slice(&[8, 8, 8, 0, 8, 0, alpha_filter, 0]);
        raw(b"JHDR", &d)
    }

    #[test]
    fn test_header_methods_checked() {
        let png = |compression: u8, filter: u8| {
            let mut d = Vec::new();
            d.extend_from_slice(&1u32.to_be_bytes());
            d.extend_from_slice(&1u32.to_be_bytes());
            d.extend_from_slice(&[8, 0, compression, filter, 0]);
            d
        };
        let bad_ihdr = |c, f| header_fault(Signature::Png, &[raw(b"IHDR", &png(c, f))]);
        assert_eq!(bad_ihdr(1, 0), Some(Fault::InvalidCompression));
        assert_eq!(bad_ihdr(0, 3), Some(Fault::InvalidFilter));
        assert_eq!(bad_ihdr(7, 200), Some(Fault::InvalidCompression));
        assert_eq!(bad_ihdr(0, 64), Some(Fault::InvalidFilter), "intrapixel needs an MNG container");
        assert_eq!(header_fault(Signature::Mng, &[mhdr(1, 1, 0), raw(b"IHDR", &png(0, 64))]), None);

        let mut basi = png(1, 0);
        basi.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        assert_eq!(header_fault(Signature::Mng, &[mhdr(1, 1, 0), raw(b"BASI", &basi)]), Some(Fault::InvalidCompression));

        assert_eq!(header_fault(Signature::Jng, &[jhdr(3)]), Some(Fault::InvalidFilter));
        assert_eq!(header_fault(Signature::Jng, &[jhdr(64)]), Some(Fault::InvalidFilter));
        assert_eq!(header_fault(Signature::Mng, &[mhdr(1, 1, 0), jhdr(64)]), None);
    }

    #[test]
    fn test_store_chunks() {
        let mut p = processor(DecoderOptions::default().with_store_chunks(true), Signature::Mng);
        feed(&mut p, &[mhdr(1, 1, 0), raw(b"SAVE", &[])]).unwrap();
        assert_eq!(p.chunks().len(), 2);
        assert_eq!(p.chunks()[1].id, id::SAVE);
    }
}
