//! Chunk dispatch index.
//!
//! Binary search over [`CHUNK_TABLE`]; ids missing from the table resolve to
//! [`UNKNOWN_SCHEMA`]. The search is only correct while the table stays
//! strictly ascending, which [`verify_sorted`] checks.

use std::sync::OnceLock;

use super::id::ChunkId;
use super::schema::{ChunkSchema, CHUNK_TABLE, UNKNOWN_SCHEMA};
use crate::util::{Error, Result};

/// Look up the schema for a chunk id.
#[inline]
pub fn lookup(id: ChunkId) -> &'static ChunkSchema {
    find(id).unwrap_or(&UNKNOWN_SCHEMA)
}

/// Look up a known schema; `None` for unknown ids.
pub fn find(id: ChunkId) -> Option<&'static ChunkSchema> {
    CHUNK_TABLE
        .binary_search_by(|schema| schema.id.cmp(&id))
        .ok()
        .map(|i| &CHUNK_TABLE[i])
}

/// Check that the table is strictly ascending by id.
pub fn verify_sorted() -> Result<()> {
    for pair in CHUNK_TABLE.windows(2) {
        if pair[0].id >= pair[1].id {
            return Err(Error::other(format!(
                "chunk table out of order at {} / {}",
                pair[0].id, pair[1].id
            )));
        }
    }
    Ok(())
}

/// Verify the table once per process.
pub fn ensure_verified() -> Result<()> {
    static VERIFIED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    VERIFIED
        .get_or_init(|| verify_sorted().map_err(|e| e.to_string()))
        .clone()
        .map_err(Error::Other)
}

/// Number of known chunk types.
pub fn known_count() -> usize {
    CHUNK_TABLE.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::id;
    use crate::chunk::schema::Special;
    use proptest::prelude::*;

    fn linear(id: ChunkId) -> Option<&'static ChunkSchema> {
        CHUNK_TABLE.iter().find(|s| s.id == id)
    }

    #[test]
    fn test_table_sorted() {
        verify_sorted().unwrap();
        ensure_verified().unwrap();
    }

    #[test]
    fn test_every_entry_found() {
        for schema in CHUNK_TABLE {
            let found = lookup(schema.id);
            assert_eq!(found.id, schema.id);
        }
        assert_eq!(lookup(id::IHDR).special, Special::Ihdr);
        assert_eq!(lookup(id::EVNT).special, Special::Evnt);
        assert_eq!(lookup(id::JDAA_OLD).special, Special::Jdaa);
    }

    #[test]
    fn test_unknown_fallback() {
        let schema = lookup(ChunkId::new(b"xyZw"));
        assert_eq!(schema.special, Special::Unknown);
        assert!(!schema.is_known());
        assert!(find(ChunkId::new(b"xyZw")).is_none());
    }

    proptest! {
        #[test]
        fn prop_lookup_matches_linear_scan(raw in any::<u32>()) {
            let id = ChunkId::from_u32(raw);
            let by_search = find(id).map(|s| s.id);
            let by_scan = linear(id).map(|s| s.id);
            prop_assert_eq!(by_search, by_scan);
        }

        #[test]
        fn prop_lookup_known_ids(i in 0..CHUNK_TABLE.len()) {
            let id = CHUNK_TABLE[i].id;
            prop_assert_eq!(find(id).map(|s| s.id), Some(id));
        }
    }
}
