//! Playback state threaded through record replay.

use super::record::{Background, Stamp};
use crate::chunk::{EventEntry, FrameChanges};
use crate::core::TermInfo;
use crate::object::GlobalDefaults;
use crate::util::{Point, Rect, Rgb16, Rgb8};

/// LOOP repeat count meaning "forever".
pub const INFINITE_REPEAT: u32 = 0x7FFF_FFFF;

/// Ticks per second assumed when MHDR says 0.
pub const DEFAULT_TICKS: u32 = 1000;

/// How records are being replayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Normal playback: delays and jumps are honored.
    #[default]
    Play,
    /// First pass after reading: no delays, no jumps, no drawing.
    Scan,
    /// Jumping to a frame: jumps are honored, delays are not.
    Seek,
}

/// Framing parameters of one subframe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Framing {
    /// Framing mode 1..=4.
    pub mode: u8,
    /// Interframe delay in ticks.
    pub delay: u32,
    pub timeout: u32,
    /// Frame clip; `None` covers the whole canvas.
    pub clip: Option<Rect>,
}

impl Default for Framing {
    fn default() -> Self {
        Self { mode: 1, delay: 1, timeout: INFINITE_REPEAT, clip: None }
    }
}

impl Framing {
    /// Whether layers in this mode each end a frame.
    #[inline]
    pub const fn frame_per_layer(&self) -> bool {
        matches!(self.mode, 1 | 3)
    }

    /// Apply FRAM changes: `self` gets every change, `default` only those
    /// flagged as persistent.
    pub fn apply_changes(&mut self, default: &mut Framing, changes: &FrameChanges) {
        if let (c @ 1..=2, Some(delay)) = (changes.change_delay, changes.delay) {
            self.delay = delay;
            if c == 2 {
                default.delay = delay;
            }
        }
        if let (c @ 1..=2, Some(timeout)) = (changes.change_timeout, changes.timeout) {
            self.timeout = timeout;
            if c == 2 {
                default.timeout = timeout;
            }
        }
        if let (c @ 1..=2, Some((kind, rect))) = (changes.change_clip, changes.clip) {
            let clip = if kind == 1 {
                let base = self.clip.unwrap_or_else(Rect::unbounded);
                Rect::new(
                    base.left.saturating_add(rect.left),
                    base.right.saturating_add(rect.right),
                    base.top.saturating_add(rect.top),
                    base.bottom.saturating_add(rect.bottom),
                )
            } else {
                rect
            };
            self.clip = Some(clip);
            if c == 2 {
                default.clip = Some(clip);
            }
        }
    }
}

/// An open LOOP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopFrame {
    pub level: u8,
    /// Log index of the first record of the body.
    pub start: usize,
    pub remaining: u32,
}

/// State restored by SEEK to what it was at SAVE.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    pub framing: Framing,
    pub background: Background,
    /// BACK seen.
    pub has_background: bool,
    pub globals: GlobalDefaults,
    pub global_palette: Vec<Rgb8>,
    pub global_trns: Option<Vec<u8>>,
    /// Previous PAST target of the stream.
    pub paste_prev: Point,
}

/// Everything playback needs besides objects and the canvas.
#[derive(Clone, Debug, Default)]
pub struct PlaybackContext {
    pub mode: Mode,
    pub width: u32,
    pub height: u32,
    pub ticks: u32,
    pub settings: Settings,
    /// Framing of the current subframe.
    pub subframe: Framing,
    pub frame: u32,
    pub layer: u32,
    /// Milliseconds elapsed.
    pub time: u64,
    /// Layers drawn since the last frame boundary.
    pub subframe_layers: u32,
    /// No layer drawn yet in this stream.
    pub first_layer: bool,
    pub loops: Vec<LoopFrame>,
    /// Stack depth of the LOOP whose body is being skipped.
    pub skipping: Option<usize>,
    pub term: Option<TermInfo>,
    /// Log index of the TERM record.
    pub term_index: Option<usize>,
    pub iterations: u32,
    /// Next object of a cycling SHOW.
    pub show_cycle: u16,
    pub events: Vec<EventEntry>,
    pub finished: bool,
    /// Single-image stream.
    pub still: bool,
}

impl PlaybackContext {
    pub fn new(width: u32, height: u32, ticks: u32) -> Self {
        let mut ctx = Self { width, height, first_layer: true, ..Default::default() };
        ctx.set_ticks(ticks);
        ctx.subframe = ctx.settings.framing;
        ctx
    }

    /// Context for single-image PNG and JNG streams: no delays.
    pub fn still(width: u32, height: u32) -> Self {
        let mut ctx = Self::new(width, height, DEFAULT_TICKS);
        ctx.settings.framing.delay = 0;
        ctx.subframe.delay = 0;
        ctx.still = true;
        ctx
    }

    pub fn set_ticks(&mut self, ticks: u32) {
        self.ticks = if ticks == 0 { DEFAULT_TICKS } else { ticks };
    }

    /// Ticks to milliseconds.
    #[inline]
    pub fn millis(&self, ticks: u32) -> u32 {
        (ticks as u64 * 1000 / self.ticks.max(1) as u64).min(u32::MAX as u64) as u32
    }

    #[inline]
    pub fn stamp(&self) -> Stamp {
        Stamp { frame: self.frame, layer: self.layer, time: self.time }
    }

    /// Canvas rectangle clipped by the frame clip.
    pub fn clip(&self) -> Rect {
        let canvas = Rect::from_size(Point::default(), self.width, self.height);
        match self.subframe.clip {
            Some(c) => canvas.intersect(&c),
            None => canvas,
        }
    }

    /// Close the current frame; returns the delay in milliseconds.
    pub fn end_frame(&mut self) -> u32 {
        let ms = self.millis(self.subframe.delay);
        self.frame += 1;
        self.time += ms as u64;
        self.subframe_layers = 0;
        tracing::trace!(frame = self.frame, time = self.time, "frame boundary");
        ms
    }

    /// Whether a background layer goes before the next layer.
    pub fn needs_background(&self) -> bool {
        match self.subframe.mode {
            3 => true,
            4 => self.subframe_layers == 0,
            _ => self.first_layer,
        }
    }

    /// Background color as RGBA8.
    ///
    /// BACK wins over a top-level bKGD; with neither the canvas is cleared
    /// to transparent black.
    pub fn background_rgba(&self) -> [u8; 4] {
        let color: Option<Rgb16> = if self.settings.has_background {
            Some(self.settings.background.color)
        } else {
            self.settings.globals.background
        };
        match color {
            Some(c) => [(c.r >> 8) as u8, (c.g >> 8) as u8, (c.b >> 8) as u8, 0xFF],
            None => [0; 4],
        }
    }

    /// Back to the start of the stream, keeping dimensions and tick rate.
    pub fn restart(&mut self) {
        let mode = self.mode;
        *self = if self.still {
            Self::still(self.width, self.height)
        } else {
            Self::new(self.width, self.height, self.ticks)
        };
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = PlaybackContext::new(10, 10, 0);
        assert_eq!(ctx.ticks, DEFAULT_TICKS);
        assert_eq!(ctx.subframe.mode, 1);
        assert_eq!(ctx.millis(1), 1);
        assert!(ctx.first_layer);
        assert!(ctx.needs_background());
        assert_eq!(ctx.background_rgba(), [0; 4]);
    }

    #[test]
    fn test_end_frame_advances_time() {
        let mut ctx = PlaybackContext::new(10, 10, 100);
        ctx.subframe.delay = 5;
        assert_eq!(ctx.end_frame(), 50);
        assert_eq!((ctx.frame, ctx.time), (1, 50));
    }

    #[test]
    fn test_frame_changes() {
        let mut default = Framing::default();
        let mut sub = default;
        let changes = FrameChanges {
            change_delay: 1,
            delay: Some(7),
            change_clip: 2,
            clip: Some((0, Rect::new(0, 5, 0, 5))),
            ..Default::default()
        };
        sub.apply_changes(&mut default, &changes);
        assert_eq!(sub.delay, 7);
        assert_eq!(default.delay, 1);
        assert_eq!(default.clip, Some(Rect::new(0, 5, 0, 5)));

        let relative = FrameChanges { change_clip: 1, clip: Some((1, Rect::new(1, -1, 1, -1))), ..Default::default() };
        sub.apply_changes(&mut default, &relative);
        assert_eq!(sub.clip, Some(Rect::new(1, 4, 1, 4)));
        assert_eq!(default.clip, Some(Rect::new(0, 5, 0, 5)));
    }

    #[test]
    fn test_background_modes() {
        let mut ctx = PlaybackContext::new(4, 4, 1);
        ctx.first_layer = false;
        assert!(!ctx.needs_background());
        ctx.subframe.mode = 3;
        assert!(ctx.needs_background());
        ctx.subframe.mode = 4;
        ctx.subframe_layers = 1;
        assert!(!ctx.needs_background());

        ctx.settings.globals.background = Some(Rgb16 { r: 0xFFFF, g: 0, b: 0x8000 });
        assert_eq!(ctx.background_rgba(), [255, 0, 128, 255]);
    }

    #[test]
    fn test_restart_keeps_kind() {
        let mut ctx = PlaybackContext::still(3, 3);
        ctx.mode = Mode::Seek;
        ctx.frame = 4;
        ctx.restart();
        assert_eq!((ctx.frame, ctx.subframe.delay, ctx.mode), (0, 0, Mode::Seek));
        assert!(ctx.still);
    }

    #[test]
    fn test_clip() {
        let mut ctx = PlaybackContext::new(10, 10, 1);
        assert_eq!(ctx.clip(), Rect::new(0, 10, 0, 10));
        ctx.subframe.clip = Some(Rect::new(-5, 5, 2, 20));
        assert_eq!(ctx.clip(), Rect::new(0, 5, 2, 10));
    }
}
