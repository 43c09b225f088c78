//! # Domain Models
//!
//! These structs represent the core entities of Embers: ephemeral posts and
//! chat rooms with a bounded validity window, plus the pseudonymous identity
//! used inside rooms. We use UUID v7 for time-ordered, globally unique
//! identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A media object stored by the external media collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaObject {
    pub url: String,
    pub media_type: String,
    /// Handle used to release the object on detach/delete.
    pub public_id: String,
}

/// A time-boxed post. Expired posts drop out of default listings but remain
/// retrievable by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content: String,
    pub media: Option<MediaObject>,
    pub created_at: DateTime<Utc>,
    /// Always filled at creation (default 24h); `None` means "never expires"
    /// and only occurs for rows predating the expiry rollout.
    pub expires_at: Option<DateTime<Utc>>,
    /// Bounded renewal counter, 0..=3.
    pub renewal_count: i32,
    pub renewed_at: Option<DateTime<Utc>>,
    pub view_count: i64,
}

impl Post {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }
}

/// A comment on a post. `parent_id` links a reply to its top-level comment;
/// nesting is one level deep only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A top-level comment with its replies, as returned by post reads.
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// An ephemeral chat room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub duration_hours: i64,
    pub expires_at: DateTime<Utc>,
    pub max_users: i64,
    /// Official rooms are system-owned and reset on a cadence instead of
    /// expiring for good.
    pub is_official: bool,
    pub created_at: DateTime<Utc>,
    /// Current participant set (no duplicates, `len() <= max_users` modulo
    /// the documented admission race).
    pub participants: Vec<Uuid>,
}

impl Room {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() as i64 >= self.max_users
    }
}

/// The pseudonym pair masking a user inside a room's message stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnonymousIdentity {
    pub anonymous_id: String,
    pub anonymous_name: String,
}

/// A user's membership in a room, carrying the pseudonym currently assigned
/// to them there. Re-joining rotates the pseudonym.
#[derive(Debug, Clone, Serialize)]
pub struct Membership {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub anonymous_id: String,
    pub anonymous_name: String,
    pub joined_at: DateTime<Utc>,
}

/// An emoji reaction on a room message. Reactors are identified by their
/// pseudonym, never by raw user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: String,
    pub anonymous_id: String,
    pub reacted_at: DateTime<Utc>,
}

/// A message inside a room. The real sender is kept for self-delete
/// authorization but never serialized out.
#[derive(Debug, Clone, Serialize)]
pub struct RoomMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    #[serde(skip_serializing)]
    pub sender_id: Uuid,
    pub anonymous_id: String,
    pub anonymous_name: String,
    pub content: String,
    pub reply_to: Option<Uuid>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by_admin: bool,
    pub is_system: bool,
    pub reactions: Vec<Reaction>,
    pub created_at: DateTime<Utc>,
}

/// Content shown in place of a soft-deleted message.
pub const DELETED_MESSAGE_PLACEHOLDER: &str = "[message removed]";

/// One page of results plus the metadata clients need to keep paging.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let has_more = (page as u64) * (limit as u64) < total;
        Self { items, total, page, limit, has_more }
    }
}

/// Which rooms a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomFilter {
    All,
    /// Rooms the requesting user currently participates in.
    Joined,
    Official,
}

/// Parameters for a room listing.
#[derive(Debug, Clone)]
pub struct RoomQuery {
    pub filter: RoomFilter,
    /// Required when `filter == Joined`.
    pub user_id: Option<Uuid>,
    pub include_expired: bool,
    pub page: u32,
    pub limit: u32,
}

/// Sort order for the post feed. Nothing fancier than a time-window +
/// view-count sort is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    Newest,
    /// Most viewed among posts created in the last 24 hours.
    MostViewed,
}

/// Result of the store's atomic conditional join. The capacity check and the
/// participant append happen inside one store transaction, so no partial
/// state is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// Idempotent path: the user was already a participant. The pseudonym on
    /// the membership row has been rotated to the freshly supplied one.
    AlreadyMember,
    Full,
    Expired,
    NotFound,
}
