//! Chunk schemas.
//!
//! A [`ChunkSchema`] ties a chunk id to its field table, the containers it
//! may appear in, its emptiness rules and the ordering constraints checked
//! against the parse state before decoding.

use super::field::FieldRule;
use super::id::{self, ChunkId};
use super::tables as t;

// Containers
pub const IN_PNG: u8 = 0x01;
pub const IN_JNG: u8 = 0x02;
pub const IN_MNG: u8 = 0x04;
pub const IN_ANY: u8 = IN_PNG | IN_JNG | IN_MNG;

/// May appear at the top level of an MNG stream, outside any image.
pub const GLOBAL: u8 = 0x01;
/// Payload may be empty anywhere.
pub const EMPTY: u8 = 0x02;
/// Payload may be empty inside an embedded image.
pub const EMPTY_EMBED: u8 = 0x04;
/// Payload may be empty at the top level.
pub const EMPTY_GLOBAL: u8 = 0x08;

// Parse-state flags, also used as forbid masks.
pub const HAS_IHDR: u32 = 1 << 0;
pub const HAS_JHDR: u32 = 1 << 1;
pub const HAS_BASI: u32 = 1 << 2;
pub const HAS_DHDR: u32 = 1 << 3;
pub const HAS_IDAT: u32 = 1 << 4;
pub const HAS_PLTE: u32 = 1 << 5;
pub const HAS_JDAT: u32 = 1 << 6;
pub const HAS_JDAA: u32 = 1 << 7;
pub const HAS_JSEP: u32 = 1 << 8;
pub const HAS_MHDR: u32 = 1 << 9;
pub const HAS_TERM: u32 = 1 << 10;
pub const HAS_LOOP: u32 = 1 << 11;
pub const HAS_SAVE: u32 = 1 << 12;

/// Any image header opens an embedded image.
pub const IMAGE_HEADERS: u32 = HAS_IHDR | HAS_JHDR | HAS_BASI | HAS_DHDR;

// Requirements
/// Some image header (IHDR, JHDR, BASI or DHDR) must be active.
pub const REQ_GEN_HDR: u8 = 0x01;
pub const REQ_JHDR: u8 = 0x02;
pub const REQ_MHDR: u8 = 0x04;
pub const REQ_DHDR: u8 = 0x08;
pub const REQ_SAVE: u8 = 0x10;
pub const REQ_PLTE: u8 = 0x20;

/// Semantic handler attached to a chunk type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Special {
    Ihdr,
    Plte,
    Idat,
    Iend,
    Trns,
    Gama,
    Chrm,
    Srgb,
    Iccp,
    Text,
    Bkgd,
    Phys,
    Sbit,
    Splt,
    Hist,
    Time,
    Jhdr,
    Jdat,
    Jdaa,
    Jsep,
    Mhdr,
    Mend,
    Loop,
    Endl,
    Defi,
    Basi,
    Clon,
    Past,
    Disc,
    Back,
    Fram,
    Move,
    Clip,
    Show,
    Term,
    Save,
    Seek,
    Expi,
    Fpri,
    Need,
    Dhdr,
    Prom,
    Ipng,
    Pplt,
    Ijng,
    Drop,
    Dbyk,
    Ordr,
    Magn,
    Evnt,
    Unknown,
}

/// Static description of one chunk type.
#[derive(Debug)]
pub struct ChunkSchema {
    pub id: ChunkId,
    pub containers: u8,
    pub flags: u8,
    pub requires: u8,
    pub forbids: u32,
    pub fields: &'static [FieldRule],
    pub special: Special,
}

impl ChunkSchema {
    const fn new(id: ChunkId, special: Special, fields: &'static [FieldRule]) -> Self {
        Self { id, containers: IN_MNG, flags: 0, requires: 0, forbids: 0, fields, special }
    }

    const fn containers(mut self, containers: u8) -> Self {
        self.containers = containers;
        self
    }

    const fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    const fn requires(mut self, requires: u8) -> Self {
        self.requires = requires;
        self
    }

    const fn forbids(mut self, forbids: u32) -> Self {
        self.forbids = forbids;
        self
    }

    /// Top-level MNG chunk: requires MHDR, not allowed inside an image.
    const fn mng(id: ChunkId, special: Special, fields: &'static [FieldRule]) -> Self {
        Self::new(id, special, fields).requires(REQ_MHDR).forbids(IMAGE_HEADERS)
    }

    /// Chunk carried inside a delta image.
    const fn delta(id: ChunkId, special: Special, fields: &'static [FieldRule]) -> Self {
        Self::new(id, special, fields).requires(REQ_MHDR | REQ_DHDR)
    }

    #[inline]
    pub const fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Whether an empty payload is acceptable.
    pub const fn allows_empty(&self, embedded: bool) -> bool {
        self.has_flag(EMPTY)
            || (embedded && self.has_flag(EMPTY_EMBED))
            || (!embedded && self.has_flag(EMPTY_GLOBAL))
    }

    pub fn is_known(&self) -> bool {
        self.special != Special::Unknown
    }
}

const ANCILLARY_FLAGS: u8 = GLOBAL | EMPTY_EMBED | EMPTY_GLOBAL;
const NO_DATA_YET: u32 = HAS_IDAT | HAS_JDAT | HAS_JDAA;

/// Every known chunk, sorted ascending by id.
pub static CHUNK_TABLE: &[ChunkSchema] = &[
    ChunkSchema::mng(id::BACK, Special::Back, t::BACK),
    ChunkSchema::new(id::BASI, Special::Basi, t::BASI).requires(REQ_MHDR).forbids(IMAGE_HEADERS),
    ChunkSchema::mng(id::CLIP, Special::Clip, t::CLIP),
    ChunkSchema::mng(id::CLON, Special::Clon, t::CLON),
    ChunkSchema::delta(id::DBYK, Special::Dbyk, t::DBYK),
    ChunkSchema::mng(id::DEFI, Special::Defi, t::DEFI),
    ChunkSchema::new(id::DHDR, Special::Dhdr, t::DHDR).requires(REQ_MHDR).forbids(IMAGE_HEADERS),
    ChunkSchema::mng(id::DISC, Special::Disc, t::DISC).flags(EMPTY),
    ChunkSchema::delta(id::DROP, Special::Drop, t::DROP),
    ChunkSchema::mng(id::ENDL, Special::Endl, t::ENDL),
    ChunkSchema::mng(id::FRAM, Special::Fram, t::FRAM).flags(EMPTY),
    ChunkSchema::new(id::IDAT, Special::Idat, t::IDAT)
        .containers(IN_ANY)
        .flags(EMPTY_EMBED)
        .requires(REQ_GEN_HDR)
        .forbids(HAS_JSEP),
    ChunkSchema::new(id::IEND, Special::Iend, &[])
        .containers(IN_ANY)
        .flags(EMPTY | EMPTY_EMBED)
        .requires(REQ_GEN_HDR),
    ChunkSchema::new(id::IHDR, Special::Ihdr, t::IHDR)
        .containers(IN_PNG | IN_MNG)
        .flags(GLOBAL)
        .forbids(HAS_IHDR | HAS_JHDR | HAS_BASI | HAS_IDAT | HAS_PLTE),
    ChunkSchema::delta(id::IJNG, Special::Ijng, &[]).flags(EMPTY),
    ChunkSchema::delta(id::IPNG, Special::Ipng, &[]).flags(EMPTY),
    ChunkSchema::new(id::JDAA, Special::Jdaa, t::JDAA)
        .containers(IN_JNG | IN_MNG)
        .requires(REQ_JHDR)
        .forbids(HAS_JSEP),
    ChunkSchema::new(id::JDAT, Special::Jdat, t::JDAT)
        .containers(IN_JNG | IN_MNG)
        .flags(EMPTY_EMBED)
        .requires(REQ_JHDR),
    ChunkSchema::new(id::JHDR, Special::Jhdr, t::JHDR)
        .containers(IN_JNG | IN_MNG)
        .forbids(HAS_IHDR | HAS_BASI | HAS_DHDR | HAS_JHDR),
    ChunkSchema::new(id::JSEP, Special::Jsep, &[])
        .containers(IN_JNG | IN_MNG)
        .flags(EMPTY | EMPTY_EMBED)
        .requires(REQ_JHDR)
        .forbids(HAS_JSEP),
    ChunkSchema::new(id::JDAA_OLD, Special::Jdaa, t::JDAA)
        .containers(IN_JNG | IN_MNG)
        .requires(REQ_JHDR)
        .forbids(HAS_JSEP),
    ChunkSchema::mng(id::LOOP, Special::Loop, t::LOOP),
    ChunkSchema::mng(id::MAGN, Special::Magn, t::MAGN).flags(EMPTY),
    ChunkSchema::new(id::MEND, Special::Mend, &[]).flags(EMPTY | EMPTY_GLOBAL).requires(REQ_MHDR),
    ChunkSchema::new(id::MHDR, Special::Mhdr, t::MHDR).forbids(HAS_MHDR | HAS_IHDR | HAS_JHDR),
    ChunkSchema::mng(id::MOVE, Special::Move, t::MOVE),
    ChunkSchema::delta(id::ORDR, Special::Ordr, t::ORDR),
    ChunkSchema::mng(id::PAST, Special::Past, t::PAST),
    ChunkSchema::new(id::PLTE, Special::Plte, t::PLTE)
        .containers(IN_PNG | IN_MNG)
        .flags(GLOBAL | EMPTY_EMBED)
        .requires(REQ_GEN_HDR)
        .forbids(NO_DATA_YET),
    ChunkSchema::delta(id::PPLT, Special::Pplt, t::PPLT),
    ChunkSchema::delta(id::PROM, Special::Prom, t::PROM),
    ChunkSchema::mng(id::SAVE, Special::Save, t::SAVE).flags(EMPTY).forbids(IMAGE_HEADERS | HAS_SAVE),
    ChunkSchema::mng(id::SEEK, Special::Seek, t::SEEK).flags(EMPTY).requires(REQ_MHDR | REQ_SAVE),
    ChunkSchema::mng(id::SHOW, Special::Show, t::SHOW).flags(EMPTY),
    ChunkSchema::mng(id::TERM, Special::Term, t::TERM).forbids(IMAGE_HEADERS | HAS_TERM | HAS_LOOP),
    ChunkSchema::new(id::BKGD, Special::Bkgd, t::BKGD)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(NO_DATA_YET),
    ChunkSchema::new(id::CHRM, Special::Chrm, t::CHRM)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(HAS_PLTE | NO_DATA_YET),
    ChunkSchema::mng(id::EXPI, Special::Expi, t::EXPI),
    ChunkSchema::mng(id::EVNT, Special::Evnt, t::EVNT).forbids(IMAGE_HEADERS | HAS_SAVE),
    ChunkSchema::mng(id::FPRI, Special::Fpri, t::FPRI),
    ChunkSchema::new(id::GAMA, Special::Gama, t::GAMA)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(HAS_PLTE | NO_DATA_YET),
    ChunkSchema::new(id::HIST, Special::Hist, t::HIST)
        .containers(IN_PNG | IN_MNG)
        .requires(REQ_GEN_HDR | REQ_PLTE)
        .forbids(HAS_IDAT),
    ChunkSchema::new(id::ICCP, Special::Iccp, t::ICCP)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(HAS_PLTE | NO_DATA_YET),
    ChunkSchema::new(id::ITXT, Special::Text, t::ITXT)
        .containers(IN_ANY)
        .flags(GLOBAL)
        .requires(REQ_GEN_HDR),
    ChunkSchema::new(id::NEED, Special::Need, t::NEED).requires(REQ_MHDR).forbids(IMAGE_HEADERS),
    ChunkSchema::mng(id::PHYG, Special::Phys, t::PHYG).flags(EMPTY),
    ChunkSchema::new(id::PHYS, Special::Phys, t::PHYS)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(NO_DATA_YET),
    ChunkSchema::new(id::SBIT, Special::Sbit, t::SBIT)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(NO_DATA_YET),
    ChunkSchema::new(id::SPLT, Special::Splt, t::SPLT)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(NO_DATA_YET),
    ChunkSchema::new(id::SRGB, Special::Srgb, t::SRGB)
        .containers(IN_ANY)
        .flags(ANCILLARY_FLAGS)
        .requires(REQ_GEN_HDR)
        .forbids(HAS_PLTE | NO_DATA_YET),
    ChunkSchema::new(id::TEXT, Special::Text, t::TEXT)
        .containers(IN_ANY)
        .flags(GLOBAL)
        .requires(REQ_GEN_HDR),
    ChunkSchema::new(id::TIME, Special::Time, t::TIME)
        .containers(IN_ANY)
        .flags(GLOBAL)
        .requires(REQ_GEN_HDR),
    ChunkSchema::new(id::TRNS, Special::Trns, t::TRNS)
        .containers(IN_PNG | IN_MNG)
        .flags(GLOBAL | EMPTY_EMBED)
        .requires(REQ_GEN_HDR)
        .forbids(NO_DATA_YET),
    ChunkSchema::new(id::ZTXT, Special::Text, t::ZTXT)
        .containers(IN_ANY)
        .flags(GLOBAL)
        .requires(REQ_GEN_HDR),
];

/// Schema for chunks missing from [`CHUNK_TABLE`]: the payload is kept raw.
pub static UNKNOWN_SCHEMA: ChunkSchema = ChunkSchema::new(ChunkId([0; 4]), Special::Unknown, t::UNKNOWN)
    .containers(IN_ANY)
    .flags(GLOBAL | EMPTY);
