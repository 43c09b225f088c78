//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary. The
//! store port is deliberately wide rather than split per entity: every
//! caller (services, sweeper, API) talks to one durable store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AnonymousIdentity, Comment, JoinOutcome, Membership, Page, Post, PostSort, Room, RoomMessage,
    RoomQuery,
};

/// Data persistence contract for posts, rooms, memberships and messages.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    // Post Operations
    async fn create_post(&self, post: &Post) -> Result<()>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;
    async fn update_post(&self, post: &Post) -> Result<()>;
    async fn delete_post(&self, id: Uuid) -> Result<()>;
    /// Non-expired posts only, newest first or most-viewed-in-window.
    async fn list_active_posts(
        &self,
        now: DateTime<Utc>,
        sort: PostSort,
        page: u32,
        limit: u32,
    ) -> Result<Page<Post>>;
    async fn increment_views(&self, id: Uuid) -> Result<()>;

    // Comment Operations
    async fn add_comment(&self, comment: &Comment) -> Result<()>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>>;
    /// All comments for a post, oldest first; callers assemble the one-level
    /// reply nesting.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;
    /// Removes the comment and any replies pointing at it.
    async fn delete_comment(&self, id: Uuid) -> Result<u64>;
    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64>;

    // Room Operations
    async fn create_room(&self, room: &Room) -> Result<()>;
    async fn get_room(&self, id: Uuid) -> Result<Option<Room>>;
    async fn list_rooms(&self, query: &RoomQuery, now: DateTime<Utc>) -> Result<Page<Room>>;
    /// Atomic conditional append: the existence, expiry, duplicate and
    /// capacity checks plus the insert run in one store transaction, so
    /// concurrent joins near the capacity boundary cannot both slip in.
    async fn try_join(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        identity: &AnonymousIdentity,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome>;
    /// Idempotent removal; succeeds whether or not the user was a member.
    async fn remove_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<()>;
    async fn get_membership(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<Membership>>;
    async fn expired_room_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>>;
    /// Official rooms are keyed by name by the sweeper.
    async fn find_official_room(&self, name: &str) -> Result<Option<Room>>;
    async fn reset_room_expiry(&self, room_id: Uuid, expires_at: DateTime<Utc>) -> Result<()>;

    // Message Operations
    async fn create_message(&self, message: &RoomMessage) -> Result<()>;
    async fn get_message(&self, id: Uuid) -> Result<Option<RoomMessage>>;
    async fn update_message(&self, message: &RoomMessage) -> Result<()>;
    /// Ascending by creation time. Soft-deleted rows are excluded unless
    /// `include_deleted` is set.
    async fn list_messages(
        &self,
        room_id: Uuid,
        page: u32,
        limit: u32,
        include_deleted: bool,
    ) -> Result<Page<RoomMessage>>;
    /// Bulk removal used by the sweep; returns the number of rows deleted.
    async fn delete_messages_for_rooms(&self, room_ids: &[Uuid]) -> Result<u64>;
}

/// Media storage contract (external collaborator: the core only holds the
/// returned handle and releases it on detach/delete).
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns the stored object's handle.
    async fn save(&self, data: Vec<u8>, content_type: &str) -> Result<crate::models::MediaObject>;
    /// Releases a stored object by its public id.
    async fn delete(&self, public_id: &str) -> Result<()>;
}
