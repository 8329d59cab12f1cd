//! Applying animation records.
//!
//! The [`Engine`] owns everything a record can touch: the object store, the
//! playback context and the canvas. [`Engine::apply`] performs one record
//! and reports what the driver should do next through a [`Flow`]; it never
//! sleeps or moves the log cursor itself.

use super::compose::{draw_object, fill, tile_object};
use super::context::{LoopFrame, Mode, PlaybackContext, Settings, INFINITE_REPEAT};
use super::record::{AnimationRecord, DeltaImage, Stamp};
use crate::chunk::{LoopSpec, PasteSpec};
use crate::core::{Callbacks, Canvas, ColorManager};
use crate::object::paste::is_paste_ready;
use crate::object::{
    apply_block, apply_palette, blank_destination, paste, prepare_destination, promote, target_point, to_rgba8,
    DeltaType, Fill, ImageData, ObjectStore,
};
use crate::util::{ColorType, Error, Point, Rect, Result};

/// What the driver does after a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Go on with the next record.
    Continue,
    /// A frame ended; wait this many milliseconds before the next record.
    Wait(u32),
    /// Continue at log index `to` after `delay` milliseconds.
    Jump { to: usize, delay: u32 },
    /// Playback is over; the canvas shows the final frame.
    Stop,
    /// Start again from the first frame.
    Rewind,
}

/// Record interpreter.
pub struct Engine {
    pub store: ObjectStore,
    pub ctx: PlaybackContext,
    canvas: Box<dyn Canvas>,
    cms: Option<Box<dyn ColorManager>>,
    saved: Option<Settings>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("ctx", &self.ctx)
            .field("canvas", &(self.canvas.width(), self.canvas.height()))
            .field("saved", &self.saved.is_some())
            .finish()
    }
}

impl Engine {
    /// Engine drawing onto `canvas`, resized to the context dimensions.
    pub fn new(ctx: PlaybackContext, mut canvas: Box<dyn Canvas>, cms: Option<Box<dyn ColorManager>>) -> Self {
        canvas.resize(ctx.width, ctx.height);
        Self { store: ObjectStore::new(), ctx, canvas, cms, saved: None }
    }

    #[inline]
    pub fn stamp(&self) -> Stamp {
        self.ctx.stamp()
    }

    #[inline]
    pub fn canvas(&self) -> &dyn Canvas {
        self.canvas.as_ref()
    }

    pub fn canvas_mut(&mut self) -> &mut dyn Canvas {
        self.canvas.as_mut()
    }

    /// CRC-32 over the canvas rows.
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for y in 0..self.canvas.height() {
            hasher.update(self.canvas.row(y));
        }
        hasher.finalize()
    }

    /// Whether SAVE has been applied.
    #[inline]
    pub fn has_saved(&self) -> bool {
        self.saved.is_some()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.ctx.mode = mode;
    }

    /// Back to the state before the first record.
    pub fn reset(&mut self) {
        self.store.reset();
        self.ctx.restart();
        self.saved = None;
        let (w, h) = (self.ctx.width, self.ctx.height);
        self.canvas.resize(w, h);
    }

    /// Apply one record found at log index `index`.
    pub fn apply(&mut self, index: usize, record: &AnimationRecord, cb: &mut dyn Callbacks) -> Result<Flow> {
        if let Some(depth) = self.ctx.skipping {
            return match record {
                AnimationRecord::Loop(spec) => {
                    self.ctx.loops.push(LoopFrame { level: spec.level, start: index + 1, remaining: 0 });
                    Ok(Flow::Continue)
                }
                AnimationRecord::EndLoop { level } => self.end_loop(*level, Some(depth)),
                _ => Ok(Flow::Continue),
            };
        }

        let settings = &mut self.ctx.settings;
        match record {
            AnimationRecord::Palette(p) => settings.global_palette.clone_from(p),
            AnimationRecord::Transparency(t) => settings.global_trns = Some(t.clone()),
            AnimationRecord::Gamma(g) => settings.globals.color.gamma = *g,
            AnimationRecord::Chroma(c) => settings.globals.color.chroma = *c,
            AnimationRecord::Srgb(s) => settings.globals.color.srgb = *s,
            AnimationRecord::Icc(p) => settings.globals.color.icc.clone_from(p),
            AnimationRecord::BackgroundColor(c) => settings.globals.background = *c,
            AnimationRecord::Background(b) => {
                settings.background = *b;
                settings.has_background = true;
            }
            AnimationRecord::Loop(spec) => self.begin_loop(index, spec),
            AnimationRecord::EndLoop { level } => return self.end_loop(*level, None),
            AnimationRecord::DefineObject { id, def } => {
                let obj = self.store.define(*id, def)?;
                if *id != 0 {
                    obj.viewable = false;
                }
            }
            AnimationRecord::Image { object_id, data } | AnimationRecord::BaseImage { object_id, data } => {
                return self.load_image(*object_id, data, cb);
            }
            AnimationRecord::Clone { source, target, kind, visible, abstract_, location } => {
                self.store.clone_object(*source, *target, *kind, *visible, *abstract_, *location)?;
            }
            AnimationRecord::Frame { mode, changes, .. } => {
                let flow = self.close_subframe();
                let ctx = &mut self.ctx;
                ctx.subframe = ctx.settings.framing;
                if *mode != 0 {
                    ctx.settings.framing.mode = *mode;
                    ctx.subframe.mode = *mode;
                }
                if let Some(changes) = changes {
                    ctx.subframe.apply_changes(&mut ctx.settings.framing, changes);
                }
                return Ok(flow);
            }
            AnimationRecord::Move { first, last, location } => {
                for obj in self.store.range_mut(*first, *last) {
                    obj.position = location.apply(obj.position);
                }
            }
            AnimationRecord::Clip { first, last, relative, rect } => {
                for obj in self.store.range_mut(*first, *last) {
                    obj.clip = if *relative && obj.clipped {
                        Rect::new(
                            obj.clip.left.saturating_add(rect.left),
                            obj.clip.right.saturating_add(rect.right),
                            obj.clip.top.saturating_add(rect.top),
                            obj.clip.bottom.saturating_add(rect.bottom),
                        )
                    } else {
                        *rect
                    };
                    obj.clipped = true;
                }
            }
            AnimationRecord::Show { first, last, mode } => return self.show(*first, *last, *mode, cb),
            AnimationRecord::Terminate(term) => {
                self.ctx.term = Some(*term);
                self.ctx.term_index = Some(index);
                if !cb.process_term(*term) {
                    return Err(Error::Callback("process_term"));
                }
            }
            AnimationRecord::Save => {
                self.store.freeze_all();
                self.saved = Some(self.ctx.settings.clone());
                if !cb.process_save() {
                    return Err(Error::Callback("process_save"));
                }
            }
            AnimationRecord::Seek { name } => {
                if !cb.process_seek(&String::from_utf8_lossy(name)) {
                    return Err(Error::Callback("process_seek"));
                }
                self.store.drop_unfrozen();
                if let Some(saved) = &self.saved {
                    self.ctx.settings = saved.clone();
                    self.ctx.subframe = saved.framing;
                }
            }
            AnimationRecord::Delta(delta) => return self.apply_delta(delta, cb),
            AnimationRecord::Promote { object_id, color_type, bit_depth, fill } => {
                self.promote_object(*object_id, *color_type, *bit_depth, *fill)?;
            }
            AnimationRecord::PartialPalette { object_id, kind, ranges } => {
                let obj = self.store.get_mut(*object_id).ok_or(Error::ObjectNotFound(*object_id))?;
                apply_palette(obj.data_mut()?, *kind, ranges)?;
            }
            AnimationRecord::Magnify { first, last, mag } => self.store.set_magnification(*first, *last, *mag)?,
            AnimationRecord::Paste(spec) => return self.paste(spec, cb),
            AnimationRecord::Discard(ids) => self.store.discard(ids),
            AnimationRecord::Event(entries) => self.ctx.events.clone_from(entries),
            AnimationRecord::End => return Ok(self.close_subframe()),
        }
        Ok(Flow::Continue)
    }

    // ========================================================================
    // Layers and frames
    // ========================================================================

    fn wait(&self, ms: u32) -> Flow {
        if self.ctx.mode == Mode::Play && ms > 0 { Flow::Wait(ms) } else { Flow::Continue }
    }

    /// End an open subframe of framing mode 2 or 4.
    fn close_subframe(&mut self) -> Flow {
        if matches!(self.ctx.subframe.mode, 2 | 4) && self.ctx.subframe_layers > 0 {
            let ms = self.ctx.end_frame();
            return self.wait(ms);
        }
        Flow::Continue
    }

    fn draw_background(&mut self) -> Result<Rect> {
        let clip = self.ctx.clip();
        fill(self.canvas.as_mut(), clip, self.ctx.background_rgba());
        let settings = &self.ctx.settings;
        if settings.has_background && settings.background.image_id != 0 {
            let (id, tile) = (settings.background.image_id, settings.background.tile);
            if self.store.contains(id) {
                let obj = self.store.resolved(id)?;
                let cms = self.cms.as_deref();
                if tile {
                    tile_object(self.canvas.as_mut(), obj, clip, cms)?;
                } else {
                    draw_object(self.canvas.as_mut(), obj, clip, cms)?;
                }
            }
        }
        Ok(clip)
    }

    /// Draw `ids` as one layer and advance the counters.
    fn show_layer(&mut self, ids: &[u16], cb: &mut dyn Callbacks) -> Result<Flow> {
        if self.ctx.mode != Mode::Scan {
            let mut touched = Vec::with_capacity(ids.len() + 1);
            if self.ctx.needs_background() {
                touched.push(self.draw_background()?);
            }
            let clip = self.ctx.clip();
            for &id in ids {
                let obj = self.store.resolved(id)?;
                touched.push(draw_object(self.canvas.as_mut(), obj, clip, self.cms.as_deref())?);
            }
            if self.ctx.mode == Mode::Play {
                let area = touched.into_iter().filter(|r| !r.is_empty()).reduce(|a, b| {
                    Rect::new(a.left.min(b.left), a.right.max(b.right), a.top.min(b.top), a.bottom.max(b.bottom))
                });
                if let Some(area) = area {
                    if !cb.refresh(area) {
                        return Err(Error::Callback("refresh"));
                    }
                }
            }
        }

        let ctx = &mut self.ctx;
        ctx.layer += 1;
        ctx.subframe_layers += 1;
        ctx.first_layer = false;
        tracing::trace!(layer = ctx.layer, objects = ids.len(), "layer");
        if ctx.subframe.frame_per_layer() {
            let ms = ctx.end_frame();
            ctx.subframe = ctx.settings.framing;
            return Ok(self.wait(ms));
        }
        Ok(Flow::Continue)
    }

    /// Show `id` when it is visible and has pixels.
    fn display(&mut self, id: u16, cb: &mut dyn Callbacks) -> Result<Flow> {
        match self.store.get(id) {
            Some(obj) if obj.visible && obj.viewable => self.show_layer(&[id], cb),
            _ => Ok(Flow::Continue),
        }
    }

    // ========================================================================
    // Images
    // ========================================================================

    fn load_image(&mut self, id: u16, data: &ImageData, cb: &mut dyn Callbacks) -> Result<Flow> {
        if id != 0 && !self.store.contains(id) {
            self.store.define(id, &Default::default())?;
        }
        let obj = self.store.get_mut(id).ok_or(Error::ObjectNotFound(id))?;
        if obj.frozen {
            return Err(Error::ObjectFrozen(id));
        }
        let mut data = data.clone();
        if id != 0 {
            data.concrete = obj.data.concrete;
        }
        obj.viewable = data.viewable;
        obj.valid = true;
        if !obj.clipped {
            obj.clip = Rect::from_size(Point::default(), data.width(), data.height());
        }
        obj.data.replace(data);
        if id == 0 {
            // Object 0 keeps a pending MAGN for every image it receives.
            let pending = obj.magnify;
            obj.resolve()?;
            obj.magnify = pending;
        } else {
            obj.magnify = None;
        }
        self.display(id, cb)
    }

    fn apply_delta(&mut self, delta: &DeltaImage, cb: &mut dyn Callbacks) -> Result<Flow> {
        let id = delta.object_id;
        let obj = self.store.get_mut(id).ok_or(Error::ObjectNotFound(id))?;
        if let Some(image) = &delta.image {
            obj.resolve()?;
            let target = obj.data_mut()?;
            let concrete = target.concrete;
            apply_block(target, image, delta.kind, delta.origin.0, delta.origin.1)?;
            target.concrete = concrete;
            obj.viewable = true;
        } else if delta.kind != DeltaType::NoChange && obj.frozen {
            return Err(Error::ObjectFrozen(id));
        }
        self.display(id, cb)
    }

    fn promote_object(&mut self, id: u16, color_type: ColorType, bit_depth: u8, fill: Fill) -> Result<()> {
        let obj = self.store.get_mut(id).ok_or(Error::ObjectNotFound(id))?;
        obj.resolve()?;
        let data = obj.data_mut()?;
        let promoted = promote(data, color_type, bit_depth, fill)?;
        *data = promoted;
        Ok(())
    }

    fn paste(&mut self, spec: &PasteSpec, cb: &mut dyn Callbacks) -> Result<Flow> {
        let mut sources = Vec::with_capacity(spec.sources.len());
        for s in &spec.sources {
            let obj = self.store.resolved(s.source_id)?;
            if !obj.viewable {
                return Err(Error::FunctionInvalid("PAST source has no image"));
            }
            sources.push((obj.data.share(), *s));
        }

        let dest_id = spec.dest_id;
        let (width, height) = (self.ctx.width, self.ctx.height);
        let obj = self.store.get_mut(dest_id).ok_or(Error::ObjectNotFound(dest_id))?;
        if dest_id == 0 {
            obj.data.replace(blank_destination(width, height));
            obj.viewable = true;
        } else {
            if obj.frozen {
                return Err(Error::ObjectFrozen(dest_id));
            }
            if obj.data.concrete {
                return Err(Error::ObjectNotAbstract(dest_id));
            }
            obj.resolve()?;
            if !is_paste_ready(&obj.data) {
                let ready = prepare_destination(&obj.data)?;
                obj.data.replace(ready);
            }
        }

        let target = target_point(spec.target_type, spec.target_x, spec.target_y, obj.paste_origin, self.ctx.settings.paste_prev);
        let dest = obj.data_mut()?;
        for (source, s) in &sources {
            paste(dest, target, source, s)?;
        }
        dest.viewable = true;
        obj.viewable = true;
        obj.paste_origin = target;
        self.ctx.settings.paste_prev = target;
        tracing::debug!(dest = dest_id, sources = sources.len(), x = target.x, y = target.y, "paste");

        if dest_id == 0 { self.display(0, cb) } else { Ok(Flow::Continue) }
    }

    // ========================================================================
    // SHOW
    // ========================================================================

    fn show(&mut self, first: u16, last: u16, mode: u8, cb: &mut dyn Callbacks) -> Result<Flow> {
        let mut shown = Vec::new();
        match mode {
            0..=5 => {
                for obj in self.store.range_mut(first, last) {
                    match mode {
                        0 | 3 => obj.visible = true,
                        1 => obj.visible = false,
                        4 | 5 => obj.visible = !obj.visible,
                        _ => {}
                    }
                    if matches!(mode, 0 | 2 | 4) && obj.visible && obj.viewable {
                        shown.push(obj.id);
                    }
                }
            }
            6 | 7 => {
                let ids: Vec<u16> = self.store.range_mut(first, last).map(|o| o.id).collect();
                let next = if (first..=last).contains(&self.ctx.show_cycle) { self.ctx.show_cycle } else { first };
                let Some(pick) = ids.iter().copied().find(|&id| id >= next).or_else(|| ids.first().copied()) else {
                    return Ok(Flow::Continue);
                };
                for obj in self.store.range_mut(first, last) {
                    obj.visible = obj.id == pick;
                    if mode == 6 && obj.visible && obj.viewable {
                        shown.push(obj.id);
                    }
                }
                self.ctx.show_cycle = pick.wrapping_add(1);
            }
            _ => return Err(Error::FunctionInvalid("SHOW mode out of range")),
        }
        if shown.is_empty() { Ok(Flow::Continue) } else { self.show_layer(&shown, cb) }
    }

    // ========================================================================
    // Loops and termination
    // ========================================================================

    fn begin_loop(&mut self, index: usize, spec: &LoopSpec) {
        let ctx = &mut self.ctx;
        ctx.loops.push(LoopFrame { level: spec.level, start: index + 1, remaining: spec.repeat });
        if spec.repeat == 0 {
            ctx.skipping = Some(ctx.loops.len() - 1);
        }
    }

    fn end_loop(&mut self, level: u8, skipping: Option<usize>) -> Result<Flow> {
        let ctx = &mut self.ctx;
        let pos = ctx.loops.iter().rposition(|f| f.level == level).ok_or(Error::NoMatchingLoop(level))?;
        ctx.loops.truncate(pos + 1);
        if let Some(depth) = skipping {
            ctx.loops.pop();
            if pos <= depth {
                ctx.skipping = None;
            }
            return Ok(Flow::Continue);
        }
        if ctx.mode == Mode::Scan {
            ctx.loops.pop();
            return Ok(Flow::Continue);
        }
        let frame = &mut ctx.loops[pos];
        if frame.remaining == INFINITE_REPEAT {
            return Ok(Flow::Jump { to: frame.start, delay: 0 });
        }
        frame.remaining = frame.remaining.saturating_sub(1);
        if frame.remaining > 0 {
            return Ok(Flow::Jump { to: frame.start, delay: 0 });
        }
        ctx.loops.pop();
        Ok(Flow::Continue)
    }

    fn clear_to_background(&mut self, cb: &mut dyn Callbacks) -> Result<()> {
        let area = Rect::from_size(Point::default(), self.ctx.width, self.ctx.height);
        fill(self.canvas.as_mut(), area, self.ctx.background_rgba());
        if self.ctx.mode == Mode::Play && !cb.refresh(area) {
            return Err(Error::Callback("refresh"));
        }
        Ok(())
    }

    /// The log is exhausted: decide between stopping, repeating from the
    /// TERM record, and rewinding.
    pub fn terminate(&mut self, cb: &mut dyn Callbacks) -> Result<Flow> {
        let Some(term) = self.ctx.term else {
            self.ctx.finished = true;
            return Ok(Flow::Stop);
        };
        if self.ctx.mode == Mode::Scan {
            self.ctx.finished = true;
            return Ok(Flow::Stop);
        }
        let mut action = term.action;
        if action == 3 {
            let more = term.iteration_max == INFINITE_REPEAT || self.ctx.iterations.saturating_add(1) < term.iteration_max;
            if let (true, Some(at)) = (more, self.ctx.term_index) {
                self.ctx.iterations += 1;
                let delay = self.ctx.millis(term.delay);
                tracing::debug!(iteration = self.ctx.iterations, delay, "repeat after TERM");
                return Ok(Flow::Jump { to: at + 1, delay: if self.ctx.mode == Mode::Play { delay } else { 0 } });
            }
            action = term.iteration_action;
        }
        match action {
            1 => {
                self.clear_to_background(cb)?;
                self.ctx.finished = true;
                Ok(Flow::Stop)
            }
            2 => Ok(Flow::Rewind),
            _ => {
                self.ctx.finished = true;
                Ok(Flow::Stop)
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Segment name of the first evNT entry matching an input event at
    /// canvas position (`x`, `y`).
    pub fn trigger(&self, event_type: u8, x: i32, y: i32) -> Option<Vec<u8>> {
        let p = Point::new(x, y);
        self.ctx
            .events
            .iter()
            .find(|e| {
                if e.event_type != event_type {
                    return false;
                }
                let in_box = !matches!(e.mask_type, 1 | 4 | 5) || e.bounds.contains(p);
                let on_object = match e.mask_type {
                    2 | 4 => self.store.get(e.object_id).is_some_and(|o| o.bounds().contains(p)),
                    3 | 5 => self.hits_pixel(e.object_id, e.index, p),
                    _ => true,
                };
                in_box && on_object
            })
            .map(|e| e.segment.clone())
    }

    /// Whether `p` falls on a pixel of `id` that is opaque, or that holds
    /// palette `index` for indexed images.
    fn hits_pixel(&self, id: u16, index: u8, p: Point) -> bool {
        let Some(obj) = self.store.get(id) else { return false };
        if !obj.bounds().contains(p) {
            return false;
        }
        let (x, y) = ((p.x - obj.position.x) as usize, (p.y - obj.position.y) as u32);
        let data = &obj.data;
        if data.color_type() == ColorType::Indexed {
            return data.row(y).get(x) == Some(&index);
        }
        let rgba = to_rgba8(data);
        let at = (y as usize * data.width() as usize + x) * 4 + 3;
        rgba.get(at).is_some_and(|&a| a != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::record::Background;
    use crate::chunk::{EventEntry, PasteSource};
    use crate::core::{NoCallbacks, RgbaCanvas, TermInfo};
    use crate::object::{GlobalDefaults, ImageHeader, Location, ObjectDef};
    use crate::util::Rgb16;

    fn engine(w: u32, h: u32) -> Engine {
        Engine::new(PlaybackContext::new(w, h, 1000), Box::new(RgbaCanvas::new(w, h)), None)
    }

    fn gray(w: u32, h: u32, v: u8) -> Box<ImageData> {
        let mut data = ImageData::new(ImageHeader::new(w, h, 8, ColorType::Gray), false, true, &GlobalDefaults::default());
        data.pixels = vec![v; (w * h) as usize];
        Box::new(data)
    }

    fn pixel(e: &Engine, x: u32, y: u32) -> [u8; 4] {
        let row = e.canvas().row(y);
        let at = x as usize * 4;
        [row[at], row[at + 1], row[at + 2], row[at + 3]]
    }

    fn run(e: &mut Engine, records: &[AnimationRecord]) -> Vec<Flow> {
        let mut cb = NoCallbacks;
        records.iter().enumerate().map(|(i, r)| e.apply(i, r, &mut cb).unwrap()).collect()
    }

    #[test]
    fn test_image_draws_layer() {
        let mut e = engine(2, 2);
        e.ctx.subframe.delay = 100;
        let flows = run(&mut e, &[AnimationRecord::Image { object_id: 0, data: gray(2, 2, 9) }]);
        assert_eq!(flows, vec![Flow::Wait(100)]);
        assert_eq!(pixel(&e, 1, 1), [9, 9, 9, 255]);
        assert_eq!((e.ctx.frame, e.ctx.layer, e.ctx.time), (1, 1, 100));
    }

    #[test]
    fn test_scan_counts_without_drawing() {
        let mut e = engine(2, 2);
        e.set_mode(Mode::Scan);
        e.ctx.subframe.delay = 100;
        let flows = run(&mut e, &[AnimationRecord::Image { object_id: 0, data: gray(2, 2, 9) }]);
        assert_eq!(flows, vec![Flow::Continue]);
        assert_eq!(pixel(&e, 0, 0), [0; 4]);
        assert_eq!(e.ctx.frame, 1);
    }

    #[test]
    fn test_hidden_object_not_drawn() {
        let mut e = engine(2, 2);
        let def = ObjectDef { visible: false, ..Default::default() };
        run(&mut e, &[
            AnimationRecord::DefineObject { id: 3, def },
            AnimationRecord::Image { object_id: 3, data: gray(2, 2, 9) },
        ]);
        assert_eq!(e.ctx.layer, 0);
        assert!(e.store.get(3).unwrap().viewable);
    }

    #[test]
    fn test_framing_mode_2_groups_layers() {
        let mut e = engine(2, 1);
        let flows = run(&mut e, &[
            AnimationRecord::Frame { mode: 2, name: Vec::new(), changes: None },
            AnimationRecord::Image { object_id: 0, data: gray(1, 1, 1) },
            AnimationRecord::Image { object_id: 0, data: gray(1, 1, 2) },
            AnimationRecord::Frame { mode: 0, name: Vec::new(), changes: None },
        ]);
        assert_eq!(flows[3], Flow::Wait(1));
        assert_eq!((e.ctx.frame, e.ctx.layer), (1, 2));
    }

    #[test]
    fn test_background_color() {
        let mut e = engine(2, 1);
        let back = Background { color: Rgb16 { r: 0xFFFF, g: 0, b: 0 }, ..Default::default() };
        run(&mut e, &[
            AnimationRecord::Background(back),
            AnimationRecord::Image { object_id: 0, data: gray(1, 1, 7) },
        ]);
        assert_eq!(pixel(&e, 0, 0), [7, 7, 7, 255]);
        assert_eq!(pixel(&e, 1, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn test_loop_jumps() {
        let mut e = engine(1, 1);
        let spec = LoopSpec { level: 0, repeat: 2, ..Default::default() };
        let mut cb = NoCallbacks;
        e.apply(4, &AnimationRecord::Loop(spec), &mut cb).unwrap();
        assert_eq!(e.apply(9, &AnimationRecord::EndLoop { level: 0 }, &mut cb).unwrap(), Flow::Jump { to: 5, delay: 0 });
        assert_eq!(e.apply(9, &AnimationRecord::EndLoop { level: 0 }, &mut cb).unwrap(), Flow::Continue);
        assert!(e.ctx.loops.is_empty());
        assert!(matches!(e.apply(9, &AnimationRecord::EndLoop { level: 0 }, &mut cb), Err(Error::NoMatchingLoop(0))));
    }

    #[test]
    fn test_zero_repeat_skips_body() {
        let mut e = engine(1, 1);
        let flows = run(&mut e, &[
            AnimationRecord::Loop(LoopSpec { level: 1, repeat: 0, ..Default::default() }),
            AnimationRecord::Loop(LoopSpec { level: 2, repeat: 5, ..Default::default() }),
            AnimationRecord::Image { object_id: 0, data: gray(1, 1, 1) },
            AnimationRecord::EndLoop { level: 2 },
            AnimationRecord::EndLoop { level: 1 },
            AnimationRecord::Gamma(Some(1)),
        ]);
        assert!(flows.iter().all(|f| *f == Flow::Continue));
        assert_eq!(e.ctx.layer, 0);
        assert_eq!(e.ctx.skipping, None);
        assert_eq!(e.ctx.settings.globals.color.gamma, Some(1));
    }

    #[test]
    fn test_scan_ignores_loop_jumps() {
        let mut e = engine(1, 1);
        e.set_mode(Mode::Scan);
        e.ctx.loops.push(LoopFrame { level: 0, start: 0, remaining: INFINITE_REPEAT });
        let flows = run(&mut e, &[AnimationRecord::EndLoop { level: 0 }]);
        assert_eq!(flows, vec![Flow::Continue]);
    }

    #[test]
    fn test_show_modes() {
        let mut e = engine(2, 2);
        run(&mut e, &[
            AnimationRecord::DefineObject { id: 1, def: ObjectDef { visible: false, ..Default::default() } },
            AnimationRecord::Image { object_id: 1, data: gray(1, 1, 1) },
            AnimationRecord::DefineObject { id: 2, def: ObjectDef { visible: false, ..Default::default() } },
            AnimationRecord::Image { object_id: 2, data: gray(1, 1, 2) },
        ]);
        run(&mut e, &[AnimationRecord::Show { first: 1, last: 2, mode: 0 }]);
        assert_eq!(e.ctx.layer, 1);
        run(&mut e, &[AnimationRecord::Show { first: 1, last: 2, mode: 5 }]);
        assert!(!e.store.get(1).unwrap().visible);

        run(&mut e, &[AnimationRecord::Show { first: 1, last: 2, mode: 6 }]);
        assert!(e.store.get(1).unwrap().visible && !e.store.get(2).unwrap().visible);
        run(&mut e, &[AnimationRecord::Show { first: 1, last: 2, mode: 6 }]);
        assert!(!e.store.get(1).unwrap().visible && e.store.get(2).unwrap().visible);
        run(&mut e, &[AnimationRecord::Show { first: 1, last: 2, mode: 7 }]);
        assert!(e.store.get(1).unwrap().visible);
    }

    #[test]
    fn test_move_and_clip() {
        let mut e = engine(4, 4);
        run(&mut e, &[
            AnimationRecord::DefineObject { id: 1, def: ObjectDef::default() },
            AnimationRecord::Move { first: 1, last: 1, location: Location::Relative(Point::new(2, 1)) },
            AnimationRecord::Clip { first: 1, last: 1, relative: false, rect: Rect::new(0, 3, 0, 3) },
            AnimationRecord::Clip { first: 1, last: 1, relative: true, rect: Rect::new(1, 0, 0, 0) },
        ]);
        let obj = e.store.get(1).unwrap();
        assert_eq!(obj.position, Point::new(2, 1));
        assert_eq!(obj.clip, Rect::new(1, 3, 0, 3));
    }

    #[test]
    fn test_save_seek_restores() {
        let mut e = engine(1, 1);
        run(&mut e, &[
            AnimationRecord::DefineObject { id: 1, def: ObjectDef::default() },
            AnimationRecord::Gamma(Some(5)),
            AnimationRecord::Save,
            AnimationRecord::DefineObject { id: 2, def: ObjectDef::default() },
            AnimationRecord::Gamma(Some(9)),
            AnimationRecord::Seek { name: b"a".to_vec() },
        ]);
        assert!(e.store.contains(1));
        assert!(!e.store.contains(2));
        assert_eq!(e.ctx.settings.globals.color.gamma, Some(5));
        let err = e.apply(6, &AnimationRecord::Image { object_id: 1, data: gray(1, 1, 0) }, &mut NoCallbacks);
        assert!(matches!(err, Err(Error::ObjectFrozen(1))));
        assert!(e.apply(7, &AnimationRecord::Image { object_id: 0, data: gray(1, 1, 3) }, &mut NoCallbacks).is_ok());
    }

    #[test]
    fn test_term_repeats_then_stops() {
        let mut e = engine(1, 1);
        let term = TermInfo { action: 3, iteration_action: 0, delay: 10, iteration_max: 2 };
        run(&mut e, &[AnimationRecord::Terminate(term)]);
        let mut cb = NoCallbacks;
        assert_eq!(e.terminate(&mut cb).unwrap(), Flow::Jump { to: 1, delay: 10 });
        assert_eq!(e.terminate(&mut cb).unwrap(), Flow::Stop);
        assert!(e.ctx.finished);
    }

    #[test]
    fn test_term_actions() {
        let mut e = engine(1, 1);
        assert_eq!(e.terminate(&mut NoCallbacks).unwrap(), Flow::Stop);
        e.ctx.term = Some(TermInfo { action: 2, ..Default::default() });
        assert_eq!(e.terminate(&mut NoCallbacks).unwrap(), Flow::Rewind);
    }

    #[test]
    fn test_paste_into_zero() {
        let source = |offset_type, offset_x| PasteSource {
            source_id: 1,
            offset_type,
            offset_x,
            boundary: Rect::new(0, 3, 0, 1),
            ..Default::default()
        };
        let setup = [
            AnimationRecord::DefineObject { id: 1, def: ObjectDef { visible: false, ..Default::default() } },
            AnimationRecord::Image { object_id: 1, data: gray(1, 1, 50) },
        ];

        // Offsets relative to the target point.
        let mut e = engine(3, 1);
        run(&mut e, &setup);
        let spec = PasteSpec { dest_id: 0, target_x: 1, sources: vec![source(1, 1)], ..Default::default() };
        run(&mut e, &[AnimationRecord::Paste(spec)]);
        assert_eq!(pixel(&e, 2, 0), [50, 50, 50, 255]);
        assert_eq!(pixel(&e, 0, 0), [0; 4]);
        assert_eq!(pixel(&e, 1, 0), [0; 4]);
        assert_eq!(e.ctx.settings.paste_prev, Point::new(1, 0));

        // Absolute offsets ignore the target point.
        let mut e = engine(3, 1);
        run(&mut e, &setup);
        let spec = PasteSpec { dest_id: 0, target_x: 1, sources: vec![source(0, 0)], ..Default::default() };
        run(&mut e, &[AnimationRecord::Paste(spec)]);
        assert_eq!(pixel(&e, 0, 0), [50, 50, 50, 255]);
        assert_eq!(pixel(&e, 1, 0), [0; 4]);
    }

    #[test]
    fn test_paste_needs_abstract_target() {
        let mut e = engine(1, 1);
        let spec = PasteSpec { dest_id: 1, ..Default::default() };
        let err = {
            run(&mut e, &[AnimationRecord::DefineObject { id: 1, def: ObjectDef { concrete: true, ..Default::default() } }]);
            e.apply(1, &AnimationRecord::Paste(spec), &mut NoCallbacks)
        };
        assert!(matches!(err, Err(Error::ObjectNotAbstract(1))));
    }

    #[test]
    fn test_delta_block() {
        let mut e = engine(2, 1);
        run(&mut e, &[
            AnimationRecord::DefineObject { id: 1, def: ObjectDef::default() },
            AnimationRecord::Image { object_id: 1, data: gray(2, 1, 10) },
            AnimationRecord::Delta(DeltaImage {
                object_id: 1,
                kind: DeltaType::BlockPixelAdd,
                origin: (1, 0),
                image: Some(gray(1, 1, 5)),
            }),
        ]);
        assert_eq!(e.store.get(1).unwrap().data.pixels, vec![10, 15]);
        assert_eq!(e.ctx.layer, 2);
    }

    #[test]
    fn test_events() {
        let mut e = engine(4, 4);
        run(&mut e, &[
            AnimationRecord::DefineObject { id: 1, def: ObjectDef { position: Point::new(2, 2), ..Default::default() } },
            AnimationRecord::Image { object_id: 1, data: gray(2, 2, 1) },
            AnimationRecord::Event(vec![
                EventEntry { event_type: 1, mask_type: 2, object_id: 1, segment: b"hit".to_vec(), ..Default::default() },
                EventEntry { event_type: 1, mask_type: 0, segment: b"miss".to_vec(), ..Default::default() },
            ]),
        ]);
        assert_eq!(e.trigger(1, 3, 3), Some(b"hit".to_vec()));
        assert_eq!(e.trigger(1, 0, 0), Some(b"miss".to_vec()));
        assert_eq!(e.trigger(2, 3, 3), None);
    }
}
