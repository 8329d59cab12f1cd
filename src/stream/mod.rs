//! Stream driver - reading, caching and cooperative playback.
//!
//! [`Mng`] pulls chunks from a [`ByteSource`], turns them into animation
//! records through the [`Processor`] and replays them with an [`Engine`].
//! Nothing blocks: a source without data yields [`Status::NeedMoreData`], a
//! frame delay yields [`Status::NeedTimer`] after arming the application's
//! timer, and the matching call resumes where the previous one stopped.
//!
//! # Example
//!
//! ```ignore
//! use mng::prelude::*;
//!
//! let mut mng = Mng::new(SliceSource::new(&bytes));
//! let mut cb = NoCallbacks;
//! mng.read(&mut cb)?;
//! while let Status::NeedTimer(ms) = mng.display(&mut cb)? {
//!     std::thread::sleep(std::time::Duration::from_millis(ms as u64));
//! }
//! ```

pub mod process;

use std::collections::BTreeMap;

pub use process::{Processor, StreamInfo};

use crate::anim::{AnimationLog, AnimationRecord, Engine, Flow, Mode, PlaybackContext, Stamp};
use crate::chunk::{ChunkId, ChunkReader, ChunkRecord, Pull, Signature};
use crate::core::{
    ByteSource, Callbacks, Canvas, ColorManager, DecoderOptions, Inflater, JpegCodec, PngRowFilter, RgbaCanvas,
    RowFilter, ZlibCodec,
};
use crate::util::{Error, Result, Warning};

/// Jumps in a row without a frame boundary before playback gives up.
const MAX_IDLE_JUMPS: u32 = 1 << 16;

/// Outcome of a driver call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The requested work is complete.
    Done,
    /// The source has no more bytes yet; call again after feeding it.
    NeedMoreData,
    /// The timer is armed; call `resume` after this many milliseconds.
    NeedTimer(u32),
    /// Playback is frozen until `display` is called again.
    Frozen,
    /// An earlier error ended the stream.
    Stopped,
}

/// Frame, layer and play-time totals of one pass through the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub frames: u32,
    pub layers: u32,
    /// Milliseconds.
    pub play_time: u64,
}

impl From<Stamp> for Totals {
    fn from(s: Stamp) -> Self {
        Self { frames: s.frame, layers: s.layer, play_time: s.time }
    }
}

/// An MNG, PNG or JNG stream being decoded and played.
pub struct Mng<S: ByteSource> {
    source: S,
    reader: ChunkReader,
    processor: Processor,
    engine: Option<Engine>,
    /// Held until the stream header gives the canvas its size.
    canvas: Option<Box<dyn Canvas>>,
    cms: Option<Box<dyn ColorManager>>,
    log: AnimationLog,
    cursor: usize,
    totals: Option<Totals>,
    read_done: bool,
    /// Playback reached its end.
    played: bool,
    frozen: bool,
    stopped: bool,
    /// A segment jump left the engine off the straight path through the log.
    detoured: bool,
    idle_jumps: u32,
}

impl<S: ByteSource> std::fmt::Debug for Mng<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mng")
            .field("processor", &self.processor)
            .field("records", &self.log.len())
            .field("cursor", &self.cursor)
            .field("totals", &self.totals)
            .field("read_done", &self.read_done)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "jpeg")]
fn default_jpeg() -> Option<Box<dyn JpegCodec>> {
    Some(Box::new(crate::core::ImageJpeg))
}

#[cfg(not(feature = "jpeg"))]
fn default_jpeg() -> Option<Box<dyn JpegCodec>> {
    None
}

impl<S: ByteSource> Mng<S> {
    /// Decoder with default options.
    pub fn new(source: S) -> Self {
        Self::with_options(source, DecoderOptions::default())
    }

    pub fn with_options(source: S, opts: DecoderOptions) -> Self {
        let reader = ChunkReader::new(opts.check_crc, opts.max_chunk_len);
        let processor = Processor::new(opts, Box::new(ZlibCodec::default()), Box::new(PngRowFilter), default_jpeg());
        Self {
            source,
            reader,
            processor,
            engine: None,
            canvas: None,
            cms: None,
            log: AnimationLog::new(),
            cursor: 0,
            totals: None,
            read_done: false,
            played: false,
            frozen: false,
            stopped: false,
            detoured: false,
            idle_jumps: 0,
        }
    }

    /// Draw onto `canvas` instead of an in-memory RGBA buffer.
    pub fn with_canvas(mut self, canvas: Box<dyn Canvas>) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn with_color_manager(mut self, cms: Box<dyn ColorManager>) -> Self {
        self.cms = Some(cms);
        self
    }

    /// Replace the JPEG codec; `None` makes JNG images an error.
    pub fn with_jpeg(mut self, jpeg: Option<Box<dyn JpegCodec>>) -> Self {
        self.processor.set_jpeg(jpeg);
        self
    }

    pub fn with_inflater(mut self, inflater: Box<dyn Inflater>) -> Self {
        self.processor.set_inflater(inflater);
        self
    }

    pub fn with_row_filter(mut self, filter: Box<dyn RowFilter>) -> Self {
        self.processor.set_row_filter(filter);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[inline]
    pub fn options(&self) -> &DecoderOptions {
        self.processor.options()
    }

    /// Container type, once the signature has been read.
    pub fn signature(&self) -> Option<Signature> {
        self.reader.signature()
    }

    /// Stream header, once read.
    pub fn info(&self) -> Option<&StreamInfo> {
        self.processor.info()
    }

    pub fn warnings(&self) -> &[Warning] {
        self.processor.warnings()
    }

    /// Decoded chunks; empty unless `store_chunks` is on.
    pub fn chunks(&self) -> &[ChunkRecord] {
        self.processor.chunks()
    }

    pub fn chunk_counts(&self) -> &BTreeMap<ChunkId, u32> {
        self.processor.counts()
    }

    /// Totals of the first pass, known once the stream is fully read.
    #[inline]
    pub fn totals(&self) -> Option<Totals> {
        self.totals
    }

    pub fn log(&self) -> &AnimationLog {
        &self.log
    }

    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut Engine> {
        self.engine.as_mut()
    }

    pub fn canvas(&self) -> Option<&dyn Canvas> {
        self.engine.as_ref().map(Engine::canvas)
    }

    /// CRC-32 of the canvas rows.
    pub fn checksum(&self) -> Option<u32> {
        self.engine.as_ref().map(Engine::checksum)
    }

    #[inline]
    pub fn is_read(&self) -> bool {
        self.read_done
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn engine_or_err(&mut self) -> Result<&mut Engine> {
        self.engine.as_mut().ok_or(Error::FunctionInvalid("stream header not read"))
    }

    /// Run `f`, stopping the stream if it fails.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "stream stopped");
            self.stopped = true;
        }
        result
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Read as much of the stream as the source allows.
    ///
    /// With playback caching on, records go to the log and a silent pass
    /// after the last chunk computes totals and frame stamps. With caching
    /// off they are applied as they arrive.
    pub fn read(&mut self, cb: &mut dyn Callbacks) -> Result<Status> {
        if self.stopped {
            return Ok(Status::Stopped);
        }
        self.guarded(|this| this.read_inner(cb))
    }

    fn read_inner(&mut self, cb: &mut dyn Callbacks) -> Result<Status> {
        let mut out = Vec::new();
        while !self.read_done {
            match self.reader.pull(&mut self.source)? {
                Pull::Pending => return Ok(Status::NeedMoreData),
                Pull::End => {
                    if !self.processor.finished() {
                        return Err(Error::UnexpectedEof(self.reader.offset()));
                    }
                    self.read_done = true;
                }
                Pull::Ready(chunk) => {
                    if !self.processor.has_begun() {
                        let sig = self.reader.signature().ok_or(Error::InvalidSignature)?;
                        self.processor.begin(sig);
                    }
                    self.processor.process(&chunk, cb, &mut out)?;
                    if self.engine.is_none() {
                        self.create_engine();
                    }
                    for record in out.drain(..) {
                        self.accept(record, cb)?;
                    }
                    if self.processor.finished() {
                        self.read_done = true;
                    }
                }
            }
        }
        if self.totals.is_none() {
            self.finish_read(cb)?;
        }
        Ok(Status::Done)
    }

    fn create_engine(&mut self) {
        let Some(info) = self.processor.info() else { return };
        let ctx = match info.signature {
            Signature::Mng => PlaybackContext::new(info.width, info.height, info.ticks),
            _ => PlaybackContext::still(info.width, info.height),
        };
        let canvas = self.canvas.take().unwrap_or_else(|| Box::new(RgbaCanvas::new(0, 0)));
        let mut engine = Engine::new(ctx, canvas, self.cms.take());
        let mode = if self.options().cache_playback { Mode::Scan } else { Mode::Seek };
        engine.set_mode(mode);
        self.engine = Some(engine);
    }

    fn accept(&mut self, record: AnimationRecord, cb: &mut dyn Callbacks) -> Result<()> {
        if self.options().cache_playback {
            self.log.append(record);
            return Ok(());
        }
        // Without a cache every record is applied once, drawing without delays.
        let engine = self.engine_or_err()?;
        engine.apply(0, &record, cb)?;
        Ok(())
    }

    /// After the last chunk: a silent pass stamps every record, then the
    /// engine is rewound for display.
    fn finish_read(&mut self, cb: &mut dyn Callbacks) -> Result<()> {
        let cache = self.options().cache_playback;
        let log = &mut self.log;
        let engine = self.engine.as_mut().ok_or(Error::FunctionInvalid("stream header not read"))?;
        if !cache {
            self.totals = Some(engine.stamp().into());
            self.played = true;
            return Ok(());
        }
        engine.reset();
        engine.set_mode(Mode::Scan);
        for index in 0..log.len() {
            log.replay(index, engine, cb)?;
        }
        let totals = Totals::from(engine.stamp());
        tracing::debug!(frames = totals.frames, layers = totals.layers, play_time = totals.play_time, "stream read");
        engine.reset();
        engine.set_mode(Mode::Play);
        self.totals = Some(totals);
        self.cursor = 0;
        Ok(())
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Start or continue playback, unfreezing if needed.
    pub fn display(&mut self, cb: &mut dyn Callbacks) -> Result<Status> {
        if self.stopped {
            return Ok(Status::Stopped);
        }
        if !self.read_done {
            let status = self.read(cb)?;
            if status != Status::Done {
                return Ok(status);
            }
        }
        self.frozen = false;
        self.guarded(|this| this.run(cb))
    }

    /// Continue after a timer fired.
    pub fn resume(&mut self, cb: &mut dyn Callbacks) -> Result<Status> {
        if self.stopped {
            return Ok(Status::Stopped);
        }
        if self.frozen {
            return Ok(Status::Frozen);
        }
        if !self.read_done {
            return self.read(cb);
        }
        self.guarded(|this| this.run(cb))
    }

    /// Halt playback; `resume` reports [`Status::Frozen`] until `display`.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Back to the first frame, clearing a stop caused by an error.
    pub fn reset(&mut self) -> Result<()> {
        let engine = self.engine_or_err()?;
        engine.reset();
        engine.set_mode(Mode::Play);
        self.cursor = 0;
        self.played = false;
        self.frozen = false;
        self.stopped = false;
        self.detoured = false;
        self.idle_jumps = 0;
        Ok(())
    }

    fn wait(&mut self, ms: u32, cb: &mut dyn Callbacks) -> Result<Option<Status>> {
        self.idle_jumps = 0;
        if ms == 0 {
            return Ok(None);
        }
        if !cb.set_timer(ms) {
            return Err(Error::Callback("set_timer"));
        }
        Ok(Some(Status::NeedTimer(ms)))
    }

    fn jump(&mut self, to: usize) -> bool {
        self.cursor = to;
        self.idle_jumps += 1;
        if self.idle_jumps > MAX_IDLE_JUMPS {
            tracing::warn!(to, "no frame boundary between jumps, playback ends");
            return false;
        }
        true
    }

    /// Play records until a delay, the end, or an error.
    fn run(&mut self, cb: &mut dyn Callbacks) -> Result<Status> {
        if self.played {
            return Ok(Status::Done);
        }
        loop {
            let engine = self.engine.as_mut().ok_or(Error::FunctionInvalid("stream header not read"))?;
            let flow = if self.cursor < self.log.len() {
                let flow = self.log.replay(self.cursor, engine, cb)?;
                self.cursor += 1;
                flow
            } else {
                engine.terminate(cb)?
            };
            match flow {
                Flow::Continue => {}
                Flow::Wait(ms) => {
                    if let Some(status) = self.wait(ms, cb)? {
                        return Ok(status);
                    }
                }
                Flow::Jump { to, delay } => {
                    if !self.jump(to) {
                        self.played = true;
                        return Ok(Status::Done);
                    }
                    if delay > 0 {
                        if let Some(status) = self.wait(delay, cb)? {
                            return Ok(status);
                        }
                    }
                }
                Flow::Stop => {
                    self.played = true;
                    return Ok(Status::Done);
                }
                Flow::Rewind => {
                    if !self.jump(0) {
                        self.played = true;
                        return Ok(Status::Done);
                    }
                    let engine = self.engine_or_err()?;
                    engine.reset();
                    engine.set_mode(Mode::Play);
                }
            }
        }
    }

    // ========================================================================
    // Jumps
    // ========================================================================

    fn require_totals(&self) -> Result<Totals> {
        self.totals.ok_or(Error::FunctionInvalid("stream not fully read"))
    }

    /// Replay without delays until `reached` holds for the engine counters.
    /// Playback then continues from there.
    ///
    /// `bookmark` is the first log entry whose first-pass stamp satisfies
    /// `reached`. Without loops the stamps are exact, so the replay stops
    /// at that entry. A target ahead of the current position is replayed
    /// from the cursor; anything else starts over from the first record.
    fn seek_until(&mut self, cb: &mut dyn Callbacks, reached: impl Fn(&Stamp) -> bool, bookmark: Option<usize>) -> Result<bool> {
        if !self.options().cache_playback {
            return Err(Error::FunctionInvalid("jumps need playback caching"));
        }
        let exact = if self.log.has_loops() { None } else { bookmark };
        let now = self.engine_or_err()?.stamp();
        let ahead =
            !self.played && !self.detoured && !reached(&now) && exact.map_or(true, |at| at >= self.cursor);
        if ahead {
            tracing::debug!(from = self.cursor, to = ?exact, "seek forward");
        } else {
            self.engine_or_err()?.reset();
            self.cursor = 0;
            self.played = false;
            self.detoured = false;
        }
        self.engine_or_err()?.set_mode(Mode::Seek);
        self.idle_jumps = 0;
        let found = loop {
            let engine = self.engine.as_mut().ok_or(Error::FunctionInvalid("stream header not read"))?;
            if exact.is_some_and(|at| self.cursor >= at) || reached(&engine.stamp()) {
                break true;
            }
            let flow = if self.cursor < self.log.len() {
                let flow = self.log.replay(self.cursor, engine, cb)?;
                self.cursor += 1;
                flow
            } else {
                engine.terminate(cb)?
            };
            match flow {
                Flow::Continue => {}
                Flow::Wait(_) => self.idle_jumps = 0,
                Flow::Jump { to, .. } => {
                    if !self.jump(to) {
                        break false;
                    }
                }
                Flow::Stop | Flow::Rewind => {
                    let engine = self.engine_or_err()?;
                    break reached(&engine.stamp());
                }
            }
        };
        self.engine_or_err()?.set_mode(Mode::Play);
        Ok(found)
    }

    /// Show frame `frame` (0-based) completed; playback continues after it.
    pub fn goto_frame(&mut self, frame: u32, cb: &mut dyn Callbacks) -> Result<Status> {
        if self.stopped {
            return Ok(Status::Stopped);
        }
        let totals = self.require_totals()?;
        if frame >= totals.frames {
            return Err(Error::FrameOutOfRange { requested: frame, available: totals.frames });
        }
        let bookmark = self.log.find_frame(frame + 1);
        self.guarded(|this| {
            if this.seek_until(cb, |s| s.frame > frame, bookmark)? {
                Ok(Status::Done)
            } else {
                Err(Error::FrameOutOfRange { requested: frame, available: totals.frames })
            }
        })
    }

    /// Show layer `layer` (0-based) drawn.
    pub fn goto_layer(&mut self, layer: u32, cb: &mut dyn Callbacks) -> Result<Status> {
        if self.stopped {
            return Ok(Status::Stopped);
        }
        let totals = self.require_totals()?;
        if layer >= totals.layers {
            return Err(Error::FrameOutOfRange { requested: layer, available: totals.layers });
        }
        let bookmark = self.log.find_layer(layer + 1);
        self.guarded(|this| {
            if this.seek_until(cb, |s| s.layer > layer, bookmark)? {
                Ok(Status::Done)
            } else {
                Err(Error::FrameOutOfRange { requested: layer, available: totals.layers })
            }
        })
    }

    /// Show the frame playing at `millis` milliseconds.
    pub fn goto_time(&mut self, millis: u64, cb: &mut dyn Callbacks) -> Result<Status> {
        if self.stopped {
            return Ok(Status::Stopped);
        }
        let totals = self.require_totals()?;
        let out_of_range = || Error::FrameOutOfRange {
            requested: millis.min(u32::MAX as u64) as u32,
            available: totals.play_time.min(u32::MAX as u64) as u32,
        };
        if millis > totals.play_time {
            return Err(out_of_range());
        }
        let bookmark = self.log.find_time(millis);
        self.guarded(|this| {
            if this.seek_until(cb, |s| s.time >= millis && s.layer > 0, bookmark)? {
                Ok(Status::Done)
            } else {
                Err(out_of_range())
            }
        })
    }

    /// Continue playback at the SEEK record named `name`.
    ///
    /// The SAVE point is replayed first if playback has not passed it, so
    /// the SEEK restores the saved state.
    pub fn seek_segment(&mut self, name: &str, cb: &mut dyn Callbacks) -> Result<()> {
        self.require_totals()?;
        let target = self.log.find_segment(name.as_bytes()).ok_or_else(|| Error::SegmentNotFound(name.to_string()))?;
        let save = self.log.save_index();
        self.guarded(|this| {
            let log = &mut this.log;
            let engine = this.engine.as_mut().ok_or(Error::FunctionInvalid("stream header not read"))?;
            if !engine.has_saved() {
                engine.reset();
                engine.set_mode(Mode::Seek);
                if let Some(save) = save {
                    for index in 0..=save {
                        log.replay(index, engine, cb)?;
                    }
                }
                engine.set_mode(Mode::Play);
            }
            tracing::debug!(segment = name, index = target, "seek");
            this.cursor = target;
            this.played = false;
            this.detoured = true;
            this.idle_jumps = 0;
            Ok(())
        })
    }

    /// Deliver an input event at canvas position (`x`, `y`).
    ///
    /// When an evNT entry matches, playback moves to its segment and `true`
    /// is returned; `display` or `resume` continues from there.
    pub fn trigger_event(&mut self, event_type: u8, x: i32, y: i32, cb: &mut dyn Callbacks) -> Result<bool> {
        let segment = self.engine.as_ref().and_then(|e| e.trigger(event_type, x, y));
        let Some(segment) = segment else { return Ok(false) };
        let name = String::from_utf8_lossy(&segment).into_owned();
        self.seek_segment(&name, cb)?;
        Ok(true)
    }
}
