//! Payload hooks for irregular chunk layouts.
//!
//! Each hook receives the bytes left after the regular fields, plus the
//! fields already decoded, and returns a typed [`Payload`]. The matching
//! encoder writes the payload back in the layout it came from.

use super::decode::{Checked, Cursor, DecodeEnv, Violation};
use super::id::{self, ChunkId};
use super::legacy;
use super::record::*;
use crate::util::{ColorType, Fault, Rect, Rgb8};

/// Decode the hook tail of chunk `chunk`.
pub fn decode(chunk: ChunkId, data: &[u8], rec: &ChunkRecord, env: &DecodeEnv<'_>) -> Checked<Payload> {
    match chunk {
        id::PLTE => palette(data),
        id::TRNS => transparency(data, env),
        id::HIST => histogram(data, env),
        id::SPLT => suggested_palette(data, rec.u8("sample_depth").unwrap_or(8)),
        id::ITXT => intl_text(data, rec, env),
        id::LOOP if env.pre_draft48 => loop_pre48(data),
        id::LOOP => loop_body(data),
        id::FRAM => frame_changes(data),
        id::SAVE => save(data),
        id::MAGN => magnify(data, env.magn_detect),
        id::PAST => paste(data),
        id::DISC => object_ids(data),
        id::DROP => chunk_names(data),
        id::ORDR => order(data),
        id::PPLT => partial_palette(data, rec.u8("delta_type").unwrap_or(0), env),
        id::EVNT => events(data),
        id::NEED => keywords(data),
        _ => Ok(Payload::None),
    }
}

// ============================================================================
// PNG
// ============================================================================

fn palette(data: &[u8]) -> Checked<Payload> {
    if data.len() % 3 != 0 || data.len() > 768 {
        return Err(Violation::length(data.len(), 768));
    }
    let entries = data.chunks_exact(3).map(|c| Rgb8::new(c[0], c[1], c[2])).collect();
    Ok(Payload::Palette(entries))
}

fn transparency(data: &[u8], env: &DecodeEnv<'_>) -> Checked<Payload> {
    if !env.embedded {
        return Ok(Payload::Transparency(Transparency::Global(data.to_vec())));
    }
    let mut cur = Cursor::new(data);
    let trns = match env.color_type {
        Some(ColorType::Gray) => {
            if data.len() != 2 {
                return Err(Violation::length(data.len(), 2));
            }
            Transparency::Gray(cur.u16()?)
        }
        Some(ColorType::Rgb) => {
            if data.len() != 6 {
                return Err(Violation::length(data.len(), 6));
            }
            Transparency::Rgb(cur.u16()?, cur.u16()?, cur.u16()?)
        }
        Some(ColorType::Indexed) => {
            let limit = if env.palette_len > 0 { env.palette_len } else { 256 };
            if data.len() > limit {
                return Err(Violation::length(data.len(), limit));
            }
            Transparency::Indexed(data.to_vec())
        }
        other => {
            let ct = other.map(ColorType::as_u8).unwrap_or(0);
            return Err(Violation::new(Fault::InvalidColorType, ct as u64, 0));
        }
    };
    Ok(Payload::Transparency(trns))
}

fn histogram(data: &[u8], env: &DecodeEnv<'_>) -> Checked<Payload> {
    if data.len() % 2 != 0 || data.len() / 2 != env.palette_len {
        return Err(Violation::length(data.len(), env.palette_len * 2));
    }
    let mut cur = Cursor::new(data);
    let mut out = Vec::with_capacity(env.palette_len);
    while !cur.is_empty() {
        out.push(cur.u16()?);
    }
    Ok(Payload::Histogram(out))
}

fn suggested_palette(data: &[u8], depth: u8) -> Checked<Payload> {
    let size = if depth == 16 { 10 } else { 6 };
    if data.len() % size != 0 {
        return Err(Violation::length(data.len(), size));
    }
    let mut cur = Cursor::new(data);
    let mut out = Vec::with_capacity(data.len() / size);
    while !cur.is_empty() {
        let sample = |cur: &mut Cursor<'_>| -> Checked<u16> {
            if depth == 16 { cur.u16() } else { cur.u8().map(u16::from) }
        };
        out.push(SpltEntry {
            red: sample(&mut cur)?,
            green: sample(&mut cur)?,
            blue: sample(&mut cur)?,
            alpha: sample(&mut cur)?,
            frequency: cur.u16()?,
        });
    }
    Ok(Payload::SuggestedPalette(out))
}

fn intl_text(data: &[u8], rec: &ChunkRecord, env: &DecodeEnv<'_>) -> Checked<Payload> {
    let text = if rec.u8("compression_flag") == Some(1) {
        env.inflater
            .inflate(data)
            .map_err(|_| Violation::new(Fault::InvalidCompression, data.len() as u64, 0))?
    } else {
        data.to_vec()
    };
    Ok(Payload::IntlText { raw: data.to_vec(), text })
}

// ============================================================================
// MNG
// ============================================================================

fn loop_body(data: &[u8]) -> Checked<Payload> {
    let len = data.len();
    if len < 5 || (len >= 6 && (len - 6) % 4 != 0) {
        return Err(Violation::length(len, 5));
    }
    let mut cur = Cursor::new(data);
    let mut spec = LoopSpec { level: cur.u8()?, repeat: cur.u32()?, ..LoopSpec::default() };
    if !cur.is_empty() {
        spec.termination = Some(cur.u8()?);
    }
    loop_tail(&mut cur, &mut spec)?;
    Ok(Payload::Loop(spec))
}

fn loop_pre48(data: &[u8]) -> Checked<Payload> {
    let len = data.len();
    if len < 6 || (len - 6) % 4 != 0 {
        return Err(Violation::length(len, 6));
    }
    let mut cur = Cursor::new(data);
    let level = cur.u8()?;
    let termination = Some(cur.u8()?);
    let repeat = cur.u32()?;
    let mut spec = LoopSpec { level, repeat, termination, legacy: true, ..LoopSpec::default() };
    loop_tail(&mut cur, &mut spec)?;
    Ok(Payload::Loop(spec))
}

fn loop_tail(cur: &mut Cursor<'_>, spec: &mut LoopSpec) -> Checked<()> {
    if !cur.is_empty() {
        spec.iter_min = Some(cur.u32()?);
    }
    if !cur.is_empty() {
        spec.iter_max = Some(cur.u32()?);
    }
    while !cur.is_empty() {
        spec.signals.push(cur.u32()?);
    }
    Ok(())
}

fn read_rect(cur: &mut Cursor<'_>) -> Checked<Rect> {
    Ok(Rect::new(cur.i32()?, cur.i32()?, cur.i32()?, cur.i32()?))
}

fn frame_changes(data: &[u8]) -> Checked<Payload> {
    let len = data.len();
    if len < 4 {
        return Err(Violation::length(len, 4));
    }
    let mut cur = Cursor::new(data);
    let mut ch = FrameChanges {
        change_delay: cur.u8()?,
        change_timeout: cur.u8()?,
        change_clip: cur.u8()?,
        change_sync: cur.u8()?,
        ..FrameChanges::default()
    };
    let mut required = 4;
    if ch.change_delay != 0 {
        required += 4;
    }
    if ch.change_timeout != 0 {
        required += 4;
    }
    if ch.change_clip != 0 {
        required += 17;
    }
    let ok = if ch.change_sync != 0 {
        len >= required && (len - required) % 4 == 0
    } else {
        len == required
    };
    if !ok {
        return Err(Violation::length(len, required));
    }
    if ch.change_delay != 0 {
        ch.delay = Some(cur.u32()?);
    }
    if ch.change_timeout != 0 {
        ch.timeout = Some(cur.u32()?);
    }
    if ch.change_clip != 0 {
        let kind = cur.u8()?;
        ch.clip = Some((kind, read_rect(&mut cur)?));
    }
    while !cur.is_empty() {
        ch.sync_ids.push(cur.u32()?);
    }
    Ok(Payload::Frame(ch))
}

/// Name running to a NUL or the end; a NUL may not end the payload.
fn entry_name(cur: &mut Cursor<'_>) -> Checked<Vec<u8>> {
    let (name, terminated) = cur.until_nul();
    if terminated && cur.is_empty() {
        return Err(Violation::new(Fault::TrailingBytes, 1, 0));
    }
    Ok(name.to_vec())
}

fn save(data: &[u8]) -> Checked<Payload> {
    let mut cur = Cursor::new(data);
    let offset_size = cur.u8()?;
    if offset_size != 4 && offset_size != 8 {
        return Err(Violation::new(Fault::InvalidOffsetSize, offset_size as u64, 8));
    }
    let wide = |cur: &mut Cursor<'_>| -> Checked<u64> {
        if offset_size == 8 {
            let hi = cur.u32()? as u64;
            Ok(hi << 32 | cur.u32()? as u64)
        } else {
            cur.u32().map(u64::from)
        }
    };
    let mut entries = Vec::new();
    while !cur.is_empty() {
        let entry_type = cur.u8()?;
        if entry_type > 3 {
            return Err(Violation::new(Fault::InvalidEntryType, entry_type as u64, 3));
        }
        let mut entry = SaveEntry { entry_type, ..SaveEntry::default() };
        if entry_type <= 1 {
            entry.offset = wide(&mut cur)?;
        }
        if entry_type == 0 {
            entry.start_time = wide(&mut cur)?;
            entry.layer = cur.u32()?;
            entry.frame = cur.u32()?;
        }
        entry.name = entry_name(&mut cur)?;
        entries.push(entry);
    }
    Ok(Payload::Save(SaveSpec { offset_size, entries }))
}

fn magnify(data: &[u8], detect: bool) -> Checked<Payload> {
    let len = data.len();
    let wide = detect && legacy::magn_is_wide(data);
    if len > 20 || !legacy::magn_len_ok(len, wide) {
        return Err(Violation::length(len, 18));
    }
    let mut cur = Cursor::new(data);
    let method = |cur: &mut Cursor<'_>| -> Checked<u8> {
        if wide { cur.u16().map(|v| v as u8) } else { cur.u8() }
    };
    let mut spec = MagnifySpec { wire_len: len as u8, wide, ..MagnifySpec::default() };
    if !cur.is_empty() {
        spec.first_id = cur.u16()?;
    }
    spec.last_id = if cur.is_empty() { spec.first_id } else { cur.u16()? };
    if !cur.is_empty() {
        spec.method_x = method(&mut cur)?;
    }
    spec.mx = if cur.is_empty() { 1 } else { cur.u16()? };
    spec.my = if cur.is_empty() { spec.mx } else { cur.u16()? };
    spec.ml = if cur.is_empty() { spec.mx } else { cur.u16()? };
    spec.mr = if cur.is_empty() { spec.mx } else { cur.u16()? };
    spec.mt = if cur.is_empty() { spec.my } else { cur.u16()? };
    spec.mb = if cur.is_empty() { spec.my } else { cur.u16()? };
    spec.method_y = if cur.is_empty() { spec.method_x } else { method(&mut cur)? };

    if spec.method_x > 5 || spec.method_y > 5 {
        let worst = spec.method_x.max(spec.method_y);
        return Err(Violation::new(Fault::InvalidMethod, worst as u64, 5));
    }
    Ok(Payload::Magnify(spec))
}

fn paste(data: &[u8]) -> Checked<Payload> {
    let len = data.len();
    if len < 41 || (len - 11) % 30 != 0 {
        return Err(Violation::length(len, 41));
    }
    let mut cur = Cursor::new(data);
    let mut spec = PasteSpec {
        dest_id: cur.u16()?,
        target_type: cur.u8()?,
        target_x: cur.i32()?,
        target_y: cur.i32()?,
        sources: Vec::with_capacity((len - 11) / 30),
    };
    while !cur.is_empty() {
        spec.sources.push(PasteSource {
            source_id: cur.u16()?,
            composition: cur.u8()?,
            orientation: cur.u8()?,
            offset_type: cur.u8()?,
            offset_x: cur.i32()?,
            offset_y: cur.i32()?,
            boundary_type: cur.u8()?,
            boundary: read_rect(&mut cur)?,
        });
    }
    Ok(Payload::Paste(spec))
}

fn object_ids(data: &[u8]) -> Checked<Payload> {
    if data.len() % 2 != 0 {
        return Err(Violation::length(data.len(), data.len() + 1));
    }
    let mut cur = Cursor::new(data);
    let mut ids = Vec::with_capacity(data.len() / 2);
    while !cur.is_empty() {
        ids.push(cur.u16()?);
    }
    Ok(Payload::ObjectIds(ids))
}

fn chunk_names(data: &[u8]) -> Checked<Payload> {
    if data.len() < 4 || data.len() % 4 != 0 {
        return Err(Violation::length(data.len(), 4));
    }
    let mut cur = Cursor::new(data);
    let mut names = Vec::with_capacity(data.len() / 4);
    while !cur.is_empty() {
        names.push(ChunkId::from_u32(cur.u32()?));
    }
    Ok(Payload::ChunkNames(names))
}

fn order(data: &[u8]) -> Checked<Payload> {
    if data.len() < 5 || data.len() % 5 != 0 {
        return Err(Violation::length(data.len(), 5));
    }
    let mut cur = Cursor::new(data);
    let mut out = Vec::with_capacity(data.len() / 5);
    while !cur.is_empty() {
        out.push((ChunkId::from_u32(cur.u32()?), cur.u8()?));
    }
    Ok(Payload::Order(out))
}

/// Bytes per index for a PPLT delta type.
pub const fn pplt_entry_size(delta_type: u8) -> usize {
    match delta_type {
        0 | 1 => 3,
        2 | 3 => 1,
        _ => 4,
    }
}

fn partial_palette(data: &[u8], delta_type: u8, env: &DecodeEnv<'_>) -> Checked<Payload> {
    if env.color_type != Some(ColorType::Indexed) {
        let ct = env.color_type.map(ColorType::as_u8).unwrap_or(0);
        return Err(Violation::new(Fault::InvalidColorType, ct as u64, 3));
    }
    let size = pplt_entry_size(delta_type);
    let mut cur = Cursor::new(data);
    let mut ranges = Vec::new();
    let mut max = 0usize;
    while !cur.is_empty() {
        let first = cur.u8()?;
        let last = cur.u8()?;
        if last < first {
            return Err(Violation::new(Fault::OutOfRange, last as u64, first as u64));
        }
        max = max.max(last as usize + 1);
        let count = (last - first) as usize + 1;
        let raw = cur.take(count * size)?;
        let entries = raw
            .chunks_exact(size)
            .map(|c| {
                let mut e = [0u8; 4];
                e[..size].copy_from_slice(c);
                e
            })
            .collect();
        ranges.push(PaletteRange { first, last, entries });
    }
    let limit = match env.bit_depth {
        1 => 2,
        2 => 4,
        4 => 16,
        _ => 256,
    };
    if max > limit {
        return Err(Violation::new(Fault::OutOfRange, max as u64, limit as u64));
    }
    Ok(Payload::PartialPalette(ranges))
}

fn events(data: &[u8]) -> Checked<Payload> {
    let mut cur = Cursor::new(data);
    let mut out = Vec::new();
    while !cur.is_empty() {
        let event_type = cur.u8()?;
        if event_type > 5 {
            return Err(Violation::new(Fault::InvalidEvent, event_type as u64, 5));
        }
        let mask_type = cur.u8()?;
        if mask_type > 5 {
            return Err(Violation::new(Fault::InvalidEvent, mask_type as u64, 5));
        }
        let mut entry = EventEntry { event_type, mask_type, ..EventEntry::default() };
        if matches!(mask_type, 1 | 4 | 5) {
            entry.bounds = read_rect(&mut cur)?;
        }
        if matches!(mask_type, 2..=5) {
            entry.object_id = cur.u16()?;
        }
        if matches!(mask_type, 3 | 5) {
            entry.index = cur.u8()?;
        }
        entry.segment = entry_name(&mut cur)?;
        out.push(entry);
    }
    Ok(Payload::Events(out))
}

fn keywords(data: &[u8]) -> Checked<Payload> {
    if data.is_empty() || data.last() == Some(&0) {
        return Err(Violation::length(data.len(), 1));
    }
    let words: Vec<Vec<u8>> = data.split(|&b| b == 0).map(<[u8]>::to_vec).collect();
    if words.iter().any(Vec::is_empty) {
        return Err(Violation::length(0, 1));
    }
    Ok(Payload::Keywords(words))
}

// ============================================================================
// Encoding
// ============================================================================

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_rect(out: &mut Vec<u8>, r: &Rect) {
    for v in [r.left, r.right, r.top, r.bottom] {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

fn put_names<'a>(out: &mut Vec<u8>, names: impl ExactSizeIterator<Item = &'a [u8]>) {
    let n = names.len();
    for (i, name) in names.enumerate() {
        out.extend_from_slice(name);
        if i + 1 < n {
            out.push(0);
        }
    }
}

/// Write a payload back in its wire layout.
pub fn encode(rec: &ChunkRecord, out: &mut Vec<u8>) {
    match &rec.payload {
        Payload::None => {}
        Payload::Palette(entries) => {
            for e in entries {
                out.extend_from_slice(&[e.r, e.g, e.b]);
            }
        }
        Payload::Transparency(t) => match t {
            Transparency::Gray(v) => put_u16(out, *v),
            Transparency::Rgb(r, g, b) => {
                put_u16(out, *r);
                put_u16(out, *g);
                put_u16(out, *b);
            }
            Transparency::Indexed(raw) | Transparency::Global(raw) => out.extend_from_slice(raw),
        },
        Payload::Histogram(freqs) => freqs.iter().for_each(|&f| put_u16(out, f)),
        Payload::SuggestedPalette(entries) => {
            let wide = rec.u8("sample_depth") == Some(16);
            for e in entries {
                for s in [e.red, e.green, e.blue, e.alpha] {
                    if wide {
                        put_u16(out, s);
                    } else {
                        out.push(s as u8);
                    }
                }
                put_u16(out, e.frequency);
            }
        }
        Payload::IntlText { raw, .. } => out.extend_from_slice(raw),
        Payload::Loop(spec) => {
            out.push(spec.level);
            if spec.legacy {
                out.push(spec.termination.unwrap_or(0));
                put_u32(out, spec.repeat);
            } else {
                put_u32(out, spec.repeat);
                if let Some(t) = spec.termination {
                    out.push(t);
                }
            }
            if let Some(v) = spec.iter_min {
                put_u32(out, v);
            }
            if let Some(v) = spec.iter_max {
                put_u32(out, v);
            }
            spec.signals.iter().for_each(|&s| put_u32(out, s));
        }
        Payload::Frame(ch) => {
            out.extend_from_slice(&[ch.change_delay, ch.change_timeout, ch.change_clip, ch.change_sync]);
            if let Some(v) = ch.delay {
                put_u32(out, v);
            }
            if let Some(v) = ch.timeout {
                put_u32(out, v);
            }
            if let Some((kind, rect)) = &ch.clip {
                out.push(*kind);
                put_rect(out, rect);
            }
            ch.sync_ids.iter().for_each(|&s| put_u32(out, s));
        }
        Payload::Save(spec) => {
            out.push(spec.offset_size);
            let wide = |out: &mut Vec<u8>, v: u64| {
                if spec.offset_size == 8 {
                    out.extend_from_slice(&v.to_be_bytes());
                } else {
                    put_u32(out, v as u32);
                }
            };
            let n = spec.entries.len();
            for (i, e) in spec.entries.iter().enumerate() {
                out.push(e.entry_type);
                if e.entry_type <= 1 {
                    wide(out, e.offset);
                }
                if e.entry_type == 0 {
                    wide(out, e.start_time);
                    put_u32(out, e.layer);
                    put_u32(out, e.frame);
                }
                out.extend_from_slice(&e.name);
                if i + 1 < n {
                    out.push(0);
                }
            }
        }
        Payload::Magnify(spec) => encode_magnify(spec, out),
        Payload::Paste(spec) => {
            put_u16(out, spec.dest_id);
            out.push(spec.target_type);
            out.extend_from_slice(&spec.target_x.to_be_bytes());
            out.extend_from_slice(&spec.target_y.to_be_bytes());
            for s in &spec.sources {
                put_u16(out, s.source_id);
                out.extend_from_slice(&[s.composition, s.orientation, s.offset_type]);
                out.extend_from_slice(&s.offset_x.to_be_bytes());
                out.extend_from_slice(&s.offset_y.to_be_bytes());
                out.push(s.boundary_type);
                put_rect(out, &s.boundary);
            }
        }
        Payload::ObjectIds(ids) => ids.iter().for_each(|&i| put_u16(out, i)),
        Payload::ChunkNames(names) => names.iter().for_each(|n| out.extend_from_slice(n.bytes())),
        Payload::Order(entries) => {
            for (name, kind) in entries {
                out.extend_from_slice(name.bytes());
                out.push(*kind);
            }
        }
        Payload::PartialPalette(ranges) => {
            let size = pplt_entry_size(rec.u8("delta_type").unwrap_or(0));
            for r in ranges {
                out.extend_from_slice(&[r.first, r.last]);
                for e in &r.entries {
                    out.extend_from_slice(&e[..size]);
                }
            }
        }
        Payload::Events(entries) => {
            let n = entries.len();
            for (i, e) in entries.iter().enumerate() {
                out.extend_from_slice(&[e.event_type, e.mask_type]);
                if matches!(e.mask_type, 1 | 4 | 5) {
                    put_rect(out, &e.bounds);
                }
                if matches!(e.mask_type, 2..=5) {
                    put_u16(out, e.object_id);
                }
                if matches!(e.mask_type, 3 | 5) {
                    out.push(e.index);
                }
                out.extend_from_slice(&e.segment);
                if i + 1 < n {
                    out.push(0);
                }
            }
        }
        Payload::Keywords(words) => put_names(out, words.iter().map(Vec::as_slice)),
    }
}

fn encode_magnify(spec: &MagnifySpec, out: &mut Vec<u8>) {
    let start = out.len();
    let limit = spec.wire_len as usize;
    let method = |out: &mut Vec<u8>, m: u8| {
        if spec.wide {
            put_u16(out, m as u16);
        } else {
            out.push(m);
        }
    };
    let done = |out: &Vec<u8>| out.len() - start >= limit;

    if done(out) {
        return;
    }
    put_u16(out, spec.first_id);
    if done(out) {
        return;
    }
    put_u16(out, spec.last_id);
    if done(out) {
        return;
    }
    method(out, spec.method_x);
    for v in [spec.mx, spec.my, spec.ml, spec.mr, spec.mt, spec.mb] {
        if done(out) {
            return;
        }
        put_u16(out, v);
    }
    if !done(out) {
        method(out, spec.method_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ZlibCodec;

    fn env(codec: &ZlibCodec, ct: Option<ColorType>, depth: u8, palette_len: usize) -> DecodeEnv<'_> {
        DecodeEnv {
            seq: 1,
            embedded: ct.is_some(),
            gate_type: ct,
            color_type: ct,
            bit_depth: depth,
            palette_len,
            pre_draft48: false,
            magn_detect: true,
            inflater: codec,
        }
    }

    fn hook(chunk: ChunkId, data: &[u8], env: &DecodeEnv<'_>) -> Checked<Payload> {
        decode(chunk, data, &ChunkRecord::new(chunk, 1), env)
    }

    fn reencode(chunk: ChunkId, payload: Payload) -> Vec<u8> {
        let mut rec = ChunkRecord::new(chunk, 1);
        rec.payload = payload;
        let mut out = Vec::new();
        encode(&rec, &mut out);
        out
    }

    #[test]
    fn test_palette_length() {
        let codec = ZlibCodec::default();
        let e = env(&codec, None, 0, 0);
        assert!(hook(id::PLTE, &[0; 6], &e).is_ok());
        assert_eq!(hook(id::PLTE, &[0; 7], &e).unwrap_err().fault, Fault::InvalidLength);
        assert_eq!(hook(id::PLTE, &[0; 771], &e).unwrap_err().fault, Fault::InvalidLength);
    }

    #[test]
    fn test_transparency_by_type() {
        let codec = ZlibCodec::default();
        let gray = env(&codec, Some(ColorType::Gray), 8, 0);
        assert_eq!(
            hook(id::TRNS, &[0, 7], &gray).unwrap(),
            Payload::Transparency(Transparency::Gray(7))
        );
        assert!(hook(id::TRNS, &[0, 7, 0], &gray).is_err());

        let indexed = env(&codec, Some(ColorType::Indexed), 8, 2);
        assert!(hook(id::TRNS, &[1, 2], &indexed).is_ok());
        assert_eq!(hook(id::TRNS, &[1, 2, 3], &indexed).unwrap_err().limit, 2);

        let rgba = env(&codec, Some(ColorType::Rgba), 8, 0);
        assert_eq!(hook(id::TRNS, &[0, 0], &rgba).unwrap_err().fault, Fault::InvalidColorType);

        let top = env(&codec, None, 0, 0);
        assert_eq!(
            hook(id::TRNS, &[9, 9, 9], &top).unwrap(),
            Payload::Transparency(Transparency::Global(vec![9, 9, 9]))
        );
    }

    #[test]
    fn test_loop_layouts() {
        let codec = ZlibCodec::default();
        let mut e = env(&codec, None, 0, 0);
        let data = [1, 0, 0, 0, 3, 2, 0, 0, 0, 1];
        let Payload::Loop(spec) = hook(id::LOOP, &data, &e).unwrap() else { panic!() };
        assert_eq!((spec.level, spec.repeat, spec.termination, spec.iter_min), (1, 3, Some(2), Some(1)));
        assert_eq!(reencode(id::LOOP, Payload::Loop(spec)), data);

        assert!(hook(id::LOOP, &[1, 0, 0, 0, 3, 2, 0], &e).is_err());

        e.pre_draft48 = true;
        let data = [1, 2, 0, 0, 0, 3];
        let Payload::Loop(spec) = hook(id::LOOP, &data, &e).unwrap() else { panic!() };
        assert_eq!((spec.repeat, spec.termination), (3, Some(2)));
        assert!(spec.legacy);
        assert_eq!(reencode(id::LOOP, Payload::Loop(spec)), data);
    }

    #[test]
    fn test_frame_changes() {
        let codec = ZlibCodec::default();
        let e = env(&codec, None, 0, 0);
        let mut data = vec![2, 0, 0, 1];
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&7u32.to_be_bytes());
        let Payload::Frame(ch) = hook(id::FRAM, &data, &e).unwrap() else { panic!() };
        assert_eq!(ch.delay, Some(100));
        assert_eq!(ch.sync_ids, vec![7]);
        assert_eq!(reencode(id::FRAM, Payload::Frame(ch)), data);

        assert!(hook(id::FRAM, &[2, 0, 0, 0, 1], &e).is_err());
    }

    #[test]
    fn test_save_entries() {
        let codec = ZlibCodec::default();
        let e = env(&codec, None, 0, 0);
        let mut data = vec![4, 1];
        data.extend_from_slice(&55u32.to_be_bytes());
        data.extend_from_slice(b"intro\0");
        data.push(2);
        data.extend_from_slice(b"main");
        let Payload::Save(spec) = hook(id::SAVE, &data, &e).unwrap() else { panic!() };
        assert_eq!(spec.entries.len(), 2);
        assert_eq!(spec.entries[0].offset, 55);
        assert_eq!(spec.entries[0].name, b"intro");
        assert_eq!(spec.entries[1].name, b"main");
        assert_eq!(reencode(id::SAVE, Payload::Save(spec)), data);

        assert_eq!(hook(id::SAVE, &[5], &e).unwrap_err().fault, Fault::InvalidOffsetSize);
        assert_eq!(hook(id::SAVE, &[4, 9], &e).unwrap_err().fault, Fault::InvalidEntryType);
        assert!(hook(id::SAVE, &[4, 2, b'a', 0], &e).is_err());
    }

    #[test]
    fn test_magnify_layouts() {
        let codec = ZlibCodec::default();
        let e = env(&codec, None, 0, 0);

        let data = [0, 1, 0, 1, 1, 0, 2];
        let Payload::Magnify(spec) = hook(id::MAGN, &data, &e).unwrap() else { panic!() };
        assert_eq!((spec.method_x, spec.mx, spec.my, spec.mb, spec.method_y), (1, 2, 2, 2, 1));
        assert!(!spec.wide);
        assert_eq!(reencode(id::MAGN, Payload::Magnify(spec)), data);

        // 16-bit methods
        let data = [0, 1, 0, 1, 0, 2, 0, 3];
        let Payload::Magnify(spec) = hook(id::MAGN, &data, &e).unwrap() else { panic!() };
        assert!(spec.wide);
        assert_eq!((spec.method_x, spec.mx), (2, 3));
        assert_eq!(reencode(id::MAGN, Payload::Magnify(spec)), data);

        assert_eq!(hook(id::MAGN, &[0, 1, 0, 1, 9], &e).unwrap_err().fault, Fault::InvalidMethod);
        assert_eq!(hook(id::MAGN, &[0, 1, 0], &e).unwrap_err().fault, Fault::InvalidLength);
    }

    #[test]
    fn test_partial_palette() {
        let codec = ZlibCodec::default();
        let e = env(&codec, Some(ColorType::Indexed), 2, 4);
        let data = [1, 2, 10, 11, 12, 20, 21, 22];
        let mut rec = ChunkRecord::new(id::PPLT, 1);
        rec.push("delta_type", crate::chunk::Value::Int(0));
        let payload = decode(id::PPLT, &data, &rec, &e).unwrap();
        let Payload::PartialPalette(ref ranges) = payload else { panic!() };
        assert_eq!(ranges[0].entries[1], [20, 21, 22, 0]);
        rec.payload = payload;
        let mut out = Vec::new();
        encode(&rec, &mut out);
        assert_eq!(out, data);

        // index 4 exceeds a 2-bit palette
        assert!(decode(id::PPLT, &[4, 4, 1, 2, 3], &rec, &e).is_err());
        let rgb = env(&codec, Some(ColorType::Rgb), 8, 0);
        assert_eq!(decode(id::PPLT, &data, &rec, &rgb).unwrap_err().fault, Fault::InvalidColorType);
    }

    #[test]
    fn test_events() {
        let codec = ZlibCodec::default();
        let e = env(&codec, None, 0, 0);
        let mut data = vec![1, 2, 0, 9];
        data.extend_from_slice(b"next\0");
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(b"first");
        let Payload::Events(entries) = hook(id::EVNT, &data, &e).unwrap() else { panic!() };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].object_id, 9);
        assert_eq!(entries[0].segment, b"next");
        assert_eq!(reencode(id::EVNT, Payload::Events(entries)), data);

        assert_eq!(hook(id::EVNT, &[6, 0], &e).unwrap_err().fault, Fault::InvalidEvent);
    }

    #[test]
    fn test_keywords() {
        let codec = ZlibCodec::default();
        let e = env(&codec, None, 0, 0);
        let Payload::Keywords(words) = hook(id::NEED, b"MNG-1.0\0draft 47", &e).unwrap() else { panic!() };
        assert_eq!(words, vec![b"MNG-1.0".to_vec(), b"draft 47".to_vec()]);
        assert!(hook(id::NEED, b"MNG-1.0\0", &e).is_err());
        assert!(hook(id::NEED, b"a\0\0b", &e).is_err());
    }

    #[test]
    fn test_paste_length() {
        let codec = ZlibCodec::default();
        let e = env(&codec, None, 0, 0);
        assert!(hook(id::PAST, &[0; 41], &e).is_ok());
        assert!(hook(id::PAST, &[0; 40], &e).is_err());
        assert!(hook(id::PAST, &[0; 42], &e).is_err());
    }
}
