//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use retainer_track::codec::{SocialListLayout, CONTENT_ID_MAPPING_SIZE};
use retainer_track::domain::{ContentIdMapping, ListingEntry, WorldId};
use retainer_track::infra::{InMemoryRecordStore, ResolutionCache, SqliteRecordStore};

/// World used by most tests
pub const TEST_WORLD: WorldId = WorldId(7);

/// Open and migrate a SQLite store at `path`
pub async fn sqlite_store(path: &Path) -> SqliteRecordStore {
    let store = SqliteRecordStore::from_path(&path.to_string_lossy(), 1)
        .await
        .expect("open sqlite store");
    store.initialize().await.expect("run migrations");
    store
}

/// Fresh database file inside a temp directory that lives as long as the guard
pub fn temp_database() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("retainer-data.sqlite");
    (dir, path)
}

/// Empty cache over an in-memory store
pub async fn memory_cache() -> (Arc<InMemoryRecordStore>, Arc<ResolutionCache>) {
    let store = Arc::new(InMemoryRecordStore::new());
    let cache = ResolutionCache::new(store.clone())
        .await
        .expect("build cache");
    (store, Arc::new(cache))
}

/// 40-byte identity-mapping packet
pub fn content_id_packet(content_id: u64, name: &str) -> Vec<u8> {
    let mut buf = vec![0u8; CONTENT_ID_MAPPING_SIZE];
    buf[..8].copy_from_slice(&content_id.to_le_bytes());
    let name = name.as_bytes();
    buf[8..8 + name.len()].copy_from_slice(name);
    buf
}

/// Social list page with the given (slot, content id, name) entries
pub fn social_list_page(layout: &SocialListLayout, slots: &[(usize, u64, &str)]) -> Vec<u8> {
    let mut page = vec![0u8; layout.page_size()];
    for &(index, content_id, name) in slots {
        let start = layout.page_offset + index * layout.slot_size;
        page[start..start + 8].copy_from_slice(&content_id.to_le_bytes());
        let name_start = start + layout.name_offset;
        page[name_start..name_start + name.len()].copy_from_slice(name.as_bytes());
    }
    page
}

/// Listing entry with a name
pub fn listing(retainer_id: u64, name: &str, owner: u64) -> ListingEntry {
    ListingEntry::new(retainer_id, Some(name), owner)
}

/// Identity fact
pub fn mapping(content_id: u64, name: &str) -> ContentIdMapping {
    ContentIdMapping::new(content_id, name)
}
