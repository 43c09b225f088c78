//! Shared fixtures for the end-to-end scenario tests: every test runs the
//! real services over the real SQLite store, in memory.

use std::sync::Arc;

use em_core::traits::{ContentStore, MediaStore, MockMediaStore};
use em_db_sqlite::SqliteContentStore;
use em_services::posts::PostService;
use em_services::rooms::RoomService;

pub async fn memory_store() -> Arc<dyn ContentStore> {
    Arc::new(
        SqliteContentStore::new("sqlite::memory:")
            .await
            .expect("in-memory store"),
    )
}

pub fn room_service(store: &Arc<dyn ContentStore>) -> RoomService {
    RoomService::new(Arc::clone(store))
}

/// The media collaborator is mocked out: post lifecycle tests never upload.
pub fn post_service(store: &Arc<dyn ContentStore>) -> PostService {
    let media: Arc<dyn MediaStore> = Arc::new(MockMediaStore::new());
    PostService::new(Arc::clone(store), media)
}
