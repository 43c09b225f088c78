//! em-core
//!
//! The central domain models and interface definitions for Embers.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn room_expiry_is_strictly_after_deadline() {
        let now = Utc::now();
        let room = Room {
            id: Uuid::now_v7(),
            creator_id: Uuid::now_v7(),
            name: "after hours".to_string(),
            description: String::new(),
            tags: vec![],
            duration_hours: 24,
            expires_at: now,
            max_users: 50,
            is_official: false,
            created_at: now - Duration::hours(24),
            participants: vec![],
        };
        // now == expires_at is still live; expiry requires now > expires_at
        assert!(!room.is_expired_at(now));
        assert!(room.is_expired_at(now + Duration::milliseconds(1)));
    }

    #[test]
    fn page_has_more_tracks_total() {
        let page = Page::new(vec![1, 2, 3], 7, 1, 3);
        assert!(page.has_more);
        let last = Page::new(vec![7], 7, 3, 3);
        assert!(!last.has_more);
    }

    #[test]
    fn post_without_expiry_never_expires() {
        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            content: "hello".to_string(),
            media: None,
            created_at: now - Duration::days(400),
            expires_at: None,
            renewal_count: 0,
            renewed_at: None,
            view_count: 0,
        };
        assert!(!post.is_expired_at(now));
    }
}
