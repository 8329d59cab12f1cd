//! The append-only animation log.
//!
//! While a stream is read every record is appended here. Playback walks the
//! log by index; loops and jumps move the index, never the contents. Each
//! entry remembers the counters active the first time it was applied, which
//! is what frame, layer and time lookups search.

use super::record::{AnimationRecord, Stamp};
use super::replay::{Engine, Flow};
use crate::core::Callbacks;
use crate::util::{Error, Result};

/// A record and its first-apply stamp.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub record: AnimationRecord,
    pub stamp: Option<Stamp>,
}

#[derive(Clone, Debug, Default)]
pub struct AnimationLog {
    entries: Vec<LogEntry>,
    save: Option<usize>,
}

impl AnimationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; returns its index.
    pub fn append(&mut self, record: AnimationRecord) -> usize {
        if matches!(record, AnimationRecord::Save) && self.save.is_none() {
            self.save = Some(self.entries.len());
        }
        tracing::trace!(index = self.entries.len(), record = record.name(), "append");
        self.entries.push(LogEntry { record, stamp: None });
        self.entries.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    pub fn stamp(&self, index: usize) -> Option<Stamp> {
        self.entries.get(index).and_then(|e| e.stamp)
    }

    /// Record the first-apply stamp; later calls leave it unchanged.
    pub fn mark(&mut self, index: usize, stamp: Stamp) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.stamp.get_or_insert(stamp);
        }
    }

    /// Apply record `index` through `engine`, stamping it on first use.
    pub fn replay(&mut self, index: usize, engine: &mut Engine, cb: &mut dyn Callbacks) -> Result<Flow> {
        let stamp = engine.stamp();
        let entry = self
            .entries
            .get(index)
            .ok_or(Error::FrameOutOfRange { requested: index as u32, available: self.entries.len() as u32 })?;
        let flow = engine.apply(index, &entry.record, cb)?;
        self.mark(index, stamp);
        Ok(flow)
    }

    fn find(&self, pred: impl Fn(&Stamp) -> bool) -> Option<usize> {
        self.entries.iter().position(|e| e.stamp.as_ref().is_some_and(&pred))
    }

    /// First stamped record at or after frame `frame`.
    pub fn find_frame(&self, frame: u32) -> Option<usize> {
        self.find(|s| s.frame >= frame)
    }

    pub fn find_layer(&self, layer: u32) -> Option<usize> {
        self.find(|s| s.layer >= layer)
    }

    /// First stamped record at or after `time` milliseconds once a layer
    /// has been drawn.
    pub fn find_time(&self, time: u64) -> Option<usize> {
        self.find(|s| s.time >= time && s.layer > 0)
    }

    /// Index of the SEEK record named `name`.
    pub fn find_segment(&self, name: &[u8]) -> Option<usize> {
        self.entries.iter().position(|e| matches!(&e.record, AnimationRecord::Seek { name: n } if n == name))
    }

    /// Index of the SAVE record, if any.
    #[inline]
    pub fn save_index(&self) -> Option<usize> {
        self.save
    }

    /// Whether the log holds LOOP records.
    pub fn has_loops(&self) -> bool {
        self.entries.iter().any(|e| matches!(e.record, AnimationRecord::Loop(_)))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.save = None;
    }
}
