//! Integration tests for reading PNG, JNG and MNG streams.

use mng::anim::AnimationRecord;
use mng::chunk::{encode, id, ChunkId, ChunkWriter, Signature};
use mng::core::{DecoderOptions, Inflater, JpegCodec, JpegImage, NoCallbacks, PushSource, SliceSource, ZlibCodec};
use mng::{ColorType, Error, Fault, Mng, Status};

fn be32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn ihdr(width: u32, height: u32, depth: u8, color_type: u8) -> Vec<u8> {
    let mut data = be32(&[width, height]);
    data.extend_from_slice(&[depth, color_type, 0, 0, 0]);
    data
}

fn idat(rows: &[u8]) -> Vec<u8> {
    ZlibCodec::default().deflate(rows, 6).expect("deflate")
}

fn stream(signature: Signature, chunks: &[(ChunkId, Vec<u8>)]) -> Vec<u8> {
    let mut w = ChunkWriter::new(Vec::new(), signature).expect("signature");
    for (chunk, data) in chunks {
        w.write_chunk(*chunk, data).expect("write chunk");
    }
    w.into_inner()
}

fn gray_png(value: u8) -> Vec<u8> {
    stream(
        Signature::Png,
        &[(id::IHDR, ihdr(1, 1, 8, 0)), (id::IDAT, idat(&[0, value])), (id::IEND, vec![])],
    )
}

#[test]
fn test_png_without_cache() {
    let bytes = gray_png(42);
    let opts = DecoderOptions::default().with_cache_playback(false);
    let mut mng = Mng::with_options(SliceSource::new(&bytes), opts);
    assert_eq!(mng.read(&mut NoCallbacks).unwrap(), Status::Done);

    assert_eq!(mng.log().len(), 0, "no records are kept without a cache");
    let engine = mng.engine().expect("engine");
    let zero = engine.store.zero();
    assert_eq!((zero.data.width(), zero.data.height()), (1, 1));
    assert_eq!(zero.data.sample_size(), 1);
    assert_eq!(zero.data.pixels, vec![42]);
    assert_eq!(mng.totals().map(|t| t.frames), Some(1));
}

#[test]
fn test_png_cached_records() {
    let bytes = gray_png(42);
    let mut mng = Mng::new(SliceSource::new(&bytes));
    mng.read(&mut NoCallbacks).unwrap();
    let names: Vec<&str> = mng.log().iter().map(|e| e.record.name()).collect();
    assert_eq!(names, vec!["image", "end"]);
    assert!(mng.log().iter().all(|e| e.stamp.is_some()));
}

#[test]
fn test_push_source_byte_by_byte() {
    let bytes = gray_png(9);
    let mut mng = Mng::new(PushSource::new());
    let mut waits = 0;
    for b in &bytes {
        mng.source_mut().push(std::slice::from_ref(b));
        if mng.read(&mut NoCallbacks).unwrap() == Status::NeedMoreData {
            waits += 1;
        }
    }
    mng.source_mut().finish();
    assert_eq!(mng.read(&mut NoCallbacks).unwrap(), Status::Done);
    assert!(waits > 10);
    assert_eq!(mng.display(&mut NoCallbacks).unwrap(), Status::Done);
    assert_eq!(&mng.canvas().unwrap().row(0)[..4], &[9, 9, 9, 255]);
}

#[test]
fn test_bad_crc() {
    let mut bytes = gray_png(1);
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let mut mng = Mng::new(SliceSource::new(&bytes));
    assert!(matches!(mng.read(&mut NoCallbacks), Err(Error::Crc { .. })));

    let opts = DecoderOptions::default().with_check_crc(false);
    let mut mng = Mng::with_options(SliceSource::new(&bytes), opts);
    assert_eq!(mng.read(&mut NoCallbacks).unwrap(), Status::Done);
}

#[test]
fn test_wrong_signature() {
    let mut mng = Mng::new(SliceSource::new(b"GIF89a\0\0 not an mng"));
    assert!(matches!(mng.read(&mut NoCallbacks), Err(Error::InvalidSignature)));
}

#[test]
fn test_ihdr_methods_rejected() {
    for (compression, filter, fault) in
        [(1, 0, Fault::InvalidCompression), (0, 3, Fault::InvalidFilter), (7, 200, Fault::InvalidCompression)]
    {
        let mut header = ihdr(1, 1, 8, 0);
        header[10] = compression;
        header[11] = filter;
        let bytes = stream(Signature::Png, &[(id::IHDR, header), (id::IDAT, idat(&[0, 1])), (id::IEND, vec![])]);
        let mut mng = Mng::new(SliceSource::new(&bytes));
        let err = mng.read(&mut NoCallbacks).unwrap_err();
        assert_eq!(err.fault(), Some(fault), "compression {compression}, filter {filter}");
        assert!(mng.is_stopped());
    }
}

struct FlatJpeg(u8);

impl JpegCodec for FlatJpeg {
    fn decode(&self, _data: &[u8]) -> mng::Result<JpegImage> {
        Ok(JpegImage { width: 2, height: 1, color_type: ColorType::JpegGray, pixels: vec![self.0; 2] })
    }
}

fn gray_jng() -> Vec<u8> {
    let mut jhdr = be32(&[2, 1]);
    jhdr.extend_from_slice(&[8, 8, 8, 0, 0, 0, 0, 0]);
    stream(
        Signature::Jng,
        &[(id::JHDR, jhdr), (id::JDAT, vec![0xFF, 0xD8, 0xFF, 0xD9]), (id::IEND, vec![])],
    )
}

#[test]
fn test_jng_with_codec() {
    let bytes = gray_jng();
    let mut mng = Mng::new(SliceSource::new(&bytes)).with_jpeg(Some(Box::new(FlatJpeg(99))));
    mng.read(&mut NoCallbacks).unwrap();
    assert_eq!(mng.signature(), Some(Signature::Jng));
    mng.display(&mut NoCallbacks).unwrap();
    let row = mng.canvas().unwrap().row(0);
    assert_eq!(&row[4..8], &[99, 99, 99, 255]);
}

#[test]
fn test_jng_without_codec() {
    let bytes = gray_jng();
    let mut mng = Mng::new(SliceSource::new(&bytes)).with_jpeg(None);
    assert!(matches!(mng.read(&mut NoCallbacks), Err(Error::Jpeg(_))));
    assert!(mng.is_stopped());
}

#[test]
fn test_decoded_chunks_reencode() {
    let chunks = vec![
        (id::MHDR, be32(&[4, 4, 100, 0, 0, 0, 0])),
        (id::TERM, vec![3, 0, 0, 0, 0, 10, 0, 0, 0, 2]),
        (id::BACK, vec![0, 1, 0, 2, 0, 3, 1]),
        (id::DEFI, [&[0u8, 1, 0, 1][..], &be32(&[2, 3])].concat()),
        (id::IHDR, ihdr(1, 1, 8, 0)),
        (id::IDAT, idat(&[0, 5])),
        (id::IEND, vec![]),
        (id::MOVE, [&[0u8, 1, 0, 1, 1][..], &be32(&[1, 0xFFFF_FFFF])].concat()),
        (id::SHOW, vec![0, 1, 0, 1, 0]),
        (id::MEND, vec![]),
    ];
    let bytes = stream(Signature::Mng, &chunks);
    let opts = DecoderOptions::default().with_store_chunks(true);
    let mut mng = Mng::with_options(SliceSource::new(&bytes), opts);
    mng.read(&mut NoCallbacks).unwrap();

    let decoded = mng.chunks();
    assert_eq!(decoded.len(), chunks.len());
    for (rec, (chunk, data)) in decoded.iter().zip(&chunks) {
        assert_eq!(rec.id, *chunk);
        assert_eq!(&encode(rec), data, "payload of {chunk}");
    }
    assert!(mng.warnings().is_empty());
}

#[test]
fn test_mng_header_and_counts() {
    let chunks = vec![
        (id::MHDR, be32(&[8, 6, 25, 2, 2, 50, 1])),
        (id::IHDR, ihdr(1, 1, 8, 0)),
        (id::IDAT, idat(&[0, 1])),
        (id::IEND, vec![]),
        (id::IHDR, ihdr(1, 1, 8, 0)),
        (id::IDAT, idat(&[0, 2])),
        (id::IEND, vec![]),
        (id::MEND, vec![]),
    ];
    let bytes = stream(Signature::Mng, &chunks);
    let mut mng = Mng::new(SliceSource::new(&bytes));
    mng.read(&mut NoCallbacks).unwrap();

    let info = mng.info().copied().expect("header");
    assert_eq!((info.width, info.height, info.ticks), (8, 6, 25));
    assert!(!info.expects_alpha());
    assert_eq!(mng.chunk_counts().get(&id::IHDR), Some(&2));
    let totals = mng.totals().expect("totals");
    assert_eq!((totals.frames, totals.layers), (2, 2));
    assert_eq!(totals.play_time, 80);
    assert!(matches!(mng.log().get(0).map(|e| &e.record), Some(AnimationRecord::Image { object_id: 0, .. })));
}

#[cfg(feature = "mmap")]
#[test]
fn test_mmap_file() {
    use std::io::Write;

    let mut temp = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    temp.write_all(&gray_png(77)).expect("write");
    temp.flush().expect("flush");

    let source = mng::core::MmapSource::open(temp.path()).expect("mmap");
    let mut mng = Mng::new(source);
    assert_eq!(mng.read(&mut NoCallbacks).unwrap(), Status::Done);
    mng.display(&mut NoCallbacks).unwrap();
    assert_eq!(&mng.canvas().unwrap().row(0)[..4], &[77, 77, 77, 255]);
}
