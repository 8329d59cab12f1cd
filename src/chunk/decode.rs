//! Generic chunk decoder.
//!
//! Interprets a schema's field rules against a raw payload, then hands any
//! irregular tail to the chunk's hook. Every violation aborts the chunk with
//! [`Error::Malformed`] carrying the offending value and the limit it broke.

use byteorder::{BigEndian, ByteOrder};

use super::field::*;
use super::hooks;
use super::record::ChunkRecord;
use super::schema::ChunkSchema;
use super::state::ParseState;
use super::id::ChunkId;
use crate::core::Inflater;
use crate::util::{ColorType, Error, Fault, Result};

/// A field violation before it is tied to a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Violation {
    pub fault: Fault,
    pub value: u64,
    pub limit: u64,
}

impl Violation {
    pub const fn new(fault: Fault, value: u64, limit: u64) -> Self {
        Self { fault, value, limit }
    }

    /// Payload length mismatch.
    pub const fn length(actual: usize, expected: usize) -> Self {
        Self::new(Fault::InvalidLength, actual as u64, expected as u64)
    }

    pub fn into_error(self, chunk: ChunkId, seq: u32) -> Error {
        Error::malformed(chunk, seq, self.fault, self.value, self.limit)
    }
}

impl From<Fault> for Violation {
    fn from(fault: Fault) -> Self {
        Self::new(fault, 0, 0)
    }
}

pub type Checked<T> = std::result::Result<T, Violation>;

/// Big-endian reader over a payload.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, n: usize) -> Checked<&'a [u8]> {
        if self.remaining() < n {
            return Err(Violation::length(self.remaining(), n));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Checked<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Checked<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Checked<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn i32(&mut self) -> Checked<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    /// Unsigned integer of 1, 2 or 4 bytes.
    pub fn uint(&mut self, width: u8) -> Checked<u32> {
        match width {
            1 => self.u8().map(u32::from),
            2 => self.u16().map(u32::from),
            _ => self.u32(),
        }
    }

    /// Everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// Bytes up to a NUL (consumed, not returned) or the end.
    pub fn until_nul(&mut self) -> (&'a [u8], bool) {
        let tail = &self.data[self.pos..];
        match tail.iter().position(|&b| b == 0) {
            Some(n) => {
                self.pos += n + 1;
                (&tail[..n], true)
            }
            None => {
                self.pos = self.data.len();
                (tail, false)
            }
        }
    }
}

/// State the decoder consults besides the raw bytes.
pub struct DecodeEnv<'a> {
    pub seq: u32,
    pub embedded: bool,
    pub gate_type: Option<ColorType>,
    pub color_type: Option<ColorType>,
    pub bit_depth: u8,
    pub palette_len: usize,
    pub pre_draft48: bool,
    pub magn_detect: bool,
    pub inflater: &'a dyn Inflater,
}

impl<'a> DecodeEnv<'a> {
    pub fn from_state(state: &ParseState, seq: u32, magn_detect: bool, inflater: &'a dyn Inflater) -> Self {
        Self {
            seq,
            embedded: state.embedded(),
            gate_type: state.gate_type(),
            color_type: state.color_type,
            bit_depth: state.bit_depth,
            palette_len: state.palette_len,
            pre_draft48: state.pre_draft48,
            magn_detect,
            inflater,
        }
    }
}

/// Fault reported when a field's own check fails.
fn check_fault(rule: &FieldRule) -> Fault {
    let name = rule.name;
    if name.ends_with("depth") {
        Fault::InvalidBitDepth
    } else if name.ends_with("color_type") {
        Fault::InvalidColorType
    } else if name.ends_with("compression") {
        Fault::InvalidCompression
    } else if name.ends_with("filter") {
        Fault::InvalidFilter
    } else if name.ends_with("interlace") {
        Fault::InvalidInterlace
    } else {
        Fault::OutOfRange
    }
}

fn check_int(rule: &FieldRule, value: u32) -> Checked<()> {
    if rule.has(NO_HIGH_BIT) && value & 0x8000_0000 != 0 {
        return Err(Violation::new(Fault::HighBitSet, value as u64, 0x7FFF_FFFF));
    }
    if rule.has(SIGNED) {
        return Ok(());
    }
    if rule.min != 0 && value < rule.min {
        return Err(Violation::new(check_fault(rule), value as u64, rule.min as u64));
    }
    if rule.max != 0 && value > rule.max {
        return Err(Violation::new(check_fault(rule), value as u64, rule.max as u64));
    }
    if let Some(check) = rule.check {
        if !check(value) {
            return Err(Violation::new(check_fault(rule), value as u64, rule.max as u64));
        }
    }
    Ok(())
}

fn check_len(rule: &FieldRule, len: usize) -> Checked<()> {
    if rule.min != 0 && len < rule.min as usize {
        return Err(Violation::length(len, rule.min as usize));
    }
    if rule.max != 0 && len > rule.max as usize {
        return Err(Violation::length(len, rule.max as usize));
    }
    Ok(())
}

/// Decode a payload against its schema.
#[tracing::instrument(level = "trace", skip_all, fields(chunk = %id, seq = env.seq, len = raw.len()))]
pub fn decode(id: ChunkId, schema: &ChunkSchema, raw: &[u8], env: &DecodeEnv<'_>) -> Result<ChunkRecord> {
    decode_fields(id, schema, raw, env).map_err(|v| v.into_error(id, env.seq))
}

fn decode_fields(id: ChunkId, schema: &ChunkSchema, raw: &[u8], env: &DecodeEnv<'_>) -> Checked<ChunkRecord> {
    let mut rec = ChunkRecord::new(id, env.seq);

    if raw.is_empty() {
        if schema.fields.is_empty() {
            return Ok(rec);
        }
        if schema.allows_empty(env.embedded) {
            rec.empty = true;
            return Ok(rec);
        }
        return Err(Fault::Empty.into());
    }
    if schema.fields.is_empty() {
        return Err(Violation::new(Fault::NotEmpty, raw.len() as u64, 0));
    }

    let mut cur = Cursor::new(raw);
    // Per group: None = not reached, Some(true) = present, Some(false) = absent.
    let mut groups: [Option<bool>; 3] = [None; 3];

    for rule in schema.fields {
        if !rule.applies_to(env.gate_type) {
            continue;
        }
        let group = rule.group();

        if cur.is_empty() && rule.is_optional() {
            if group > 0 {
                if groups[group] == Some(true) {
                    return Err(Fault::IncompleteGroup.into());
                }
                groups[group] = Some(false);
            }
            if let Some(flag) = rule.presence {
                rec.push(flag, Value::Flag(false));
            }
            continue;
        }

        match rule.kind {
            FieldKind::Int => {
                let value = match cur.uint(rule.width) {
                    Ok(v) => v,
                    Err(v) if group > 0 && groups[group] == Some(true) => {
                        return Err(Violation::new(Fault::IncompleteGroup, v.value, v.limit));
                    }
                    Err(v) => return Err(v),
                };
                check_int(rule, value)?;
                rec.push(rule.name, Value::Int(value));
            }
            FieldKind::Text => {
                let (bytes, terminated) = if rule.has(TERMINATED) {
                    cur.until_nul()
                } else {
                    (cur.rest(), false)
                };
                check_len(rule, bytes.len())?;
                if let Some(len) = rule.length {
                    rec.push(len, Value::Int(bytes.len() as u32));
                }
                rec.push(rule.name, Value::Text { bytes: bytes.to_vec(), terminated });
            }
            FieldKind::Deflated => {
                let compressed = cur.rest();
                let inflated = env
                    .inflater
                    .inflate(compressed)
                    .map_err(|_| Violation::new(Fault::InvalidCompression, compressed.len() as u64, 0))?;
                if let Some(len) = rule.length {
                    rec.push(len, Value::Int(inflated.len() as u32));
                }
                rec.push(rule.name, Value::Deflated { compressed: compressed.to_vec(), inflated });
            }
            FieldKind::Raw => {
                let bytes = cur.rest();
                if let Some(len) = rule.length {
                    rec.push(len, Value::Int(bytes.len() as u32));
                }
                rec.push(rule.name, Value::Raw(bytes.to_vec()));
            }
            FieldKind::Hook => {
                let tail = cur.rest();
                let payload = hooks::decode(id, tail, &rec, env)?;
                rec.payload = payload;
            }
        }

        if group > 0 {
            groups[group] = Some(true);
        }
        if let Some(flag) = rule.presence {
            rec.push(flag, Value::Flag(true));
        }
    }

    if !cur.is_empty() {
        return Err(Violation::new(Fault::TrailingBytes, cur.remaining() as u64, 0));
    }
    Ok(rec)
}
