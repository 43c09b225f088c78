//! # Room Admission Controller
//!
//! Enforces the room state machine (Open → Full → Expired) around the
//! store's atomic conditional join, and gates message traffic on current
//! membership. Expired non-official rooms are inert: inner reads and writes
//! answer `Gone`, the row itself stays queryable.

use std::sync::Arc;

use chrono::Utc;
use em_core::error::{AppError, Result};
use em_core::models::{
    AnonymousIdentity, JoinOutcome, Page, Room, RoomMessage, RoomQuery, DELETED_MESSAGE_PLACEHOLDER,
};
use em_core::traits::ContentStore;
use serde::Deserialize;
use uuid::Uuid;

use crate::expiry;
use crate::identity::generate_anonymous_identity;

/// Default room capacity when the creator does not pick one.
pub const DEFAULT_MAX_USERS: i64 = 50;
const MIN_MAX_USERS: i64 = 1;
const MAX_MAX_USERS: i64 = 100;

const MAX_NAME_LEN: usize = 80;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_TAGS: usize = 10;
const MAX_TAG_LEN: usize = 30;

/// Longest message body, in characters, after trimming.
pub const MAX_MESSAGE_LEN: usize = 2000;

const DEFAULT_PAGE_LIMIT: u32 = 50;
const MAX_PAGE_LIMIT: u32 = 100;

/// Creation parameters for a room.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Validity window in hours; defaults to 24.
    pub duration: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub max_users: Option<i64>,
}

pub struct RoomService {
    store: Arc<dyn ContentStore>,
}

impl RoomService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Creates a room and auto-joins its creator.
    pub async fn create_room(&self, creator: Uuid, req: NewRoom) -> Result<(Room, AnonymousIdentity)> {
        let name = req.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::InvalidInput(format!(
                "room name must be 1-{MAX_NAME_LEN} characters"
            )));
        }
        if req.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::InvalidInput(format!(
                "room description cannot exceed {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if req.tags.len() > MAX_TAGS || req.tags.iter().any(|t| t.is_empty() || t.len() > MAX_TAG_LEN) {
            return Err(AppError::InvalidInput(format!(
                "at most {MAX_TAGS} tags of up to {MAX_TAG_LEN} characters each"
            )));
        }
        let max_users = req.max_users.unwrap_or(DEFAULT_MAX_USERS);
        if !(MIN_MAX_USERS..=MAX_MAX_USERS).contains(&max_users) {
            return Err(AppError::InvalidInput(format!(
                "room capacity must be between {MIN_MAX_USERS} and {MAX_MAX_USERS}"
            )));
        }
        let hours = expiry::validate_expiration_time(req.duration, expiry::DEFAULT_EXPIRATION_HOURS)?;

        let now = Utc::now();
        let mut room = Room {
            id: Uuid::now_v7(),
            creator_id: creator,
            name,
            description: req.description.trim().to_string(),
            tags: req.tags,
            duration_hours: hours,
            expires_at: expiry::calculate_expiration_date(now, hours),
            max_users,
            is_official: false,
            created_at: now,
            participants: vec![],
        };
        self.store.create_room(&room).await?;

        let identity = generate_anonymous_identity(creator, room.id);
        self.store.try_join(room.id, creator, &identity, now).await?;
        room.participants.push(creator);

        log::info!("room {} created by {creator}, expires {}", room.id, room.expires_at);
        Ok((room, identity))
    }

    /// Admits `user` into the room. Idempotent for existing participants
    /// (their pseudonym rotates); fails `Gone` on expiry and
    /// `CapacityExceeded` at the `max_users` boundary.
    pub async fn join(&self, room_id: Uuid, user: Uuid) -> Result<(Room, AnonymousIdentity)> {
        let now = Utc::now();
        let identity = generate_anonymous_identity(user, room_id);
        match self.store.try_join(room_id, user, &identity, now).await? {
            JoinOutcome::Joined | JoinOutcome::AlreadyMember => {
                let room = self
                    .store
                    .get_room(room_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("room".into(), room_id.to_string()))?;
                Ok((room, identity))
            }
            JoinOutcome::NotFound => {
                Err(AppError::NotFound("room".into(), room_id.to_string()))
            }
            JoinOutcome::Expired => Err(AppError::Gone("room".into())),
            JoinOutcome::Full => Err(AppError::CapacityExceeded(format!(
                "room {room_id} is at capacity"
            ))),
        }
    }

    /// Idempotent removal; leaving a room you never joined is not an error.
    pub async fn leave(&self, room_id: Uuid, user: Uuid) -> Result<()> {
        self.store.remove_participant(room_id, user).await
    }

    /// Paginated room listing; expired rooms are excluded unless the query
    /// asks for them.
    pub async fn list_rooms(&self, mut query: RoomQuery) -> Result<Page<Room>> {
        (query.page, query.limit) = clamp_paging(query.page, query.limit);
        self.store.list_rooms(&query, Utc::now()).await
    }

    /// Creates a message in the room, stamped with the sender's current
    /// membership pseudonym.
    pub async fn send_message(
        &self,
        room_id: Uuid,
        user: Uuid,
        content: &str,
        reply_to: Option<Uuid>,
    ) -> Result<RoomMessage> {
        let now = Utc::now();
        let room = self.require_room(room_id).await?;
        if room.is_expired_at(now) {
            return Err(AppError::Gone("room".into()));
        }
        let membership = self
            .store
            .get_membership(room_id, user)
            .await?
            .ok_or_else(|| AppError::Forbidden("not a participant of this room".into()))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::InvalidInput("message content cannot be empty".into()));
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::InvalidInput(format!(
                "message content cannot exceed {MAX_MESSAGE_LEN} characters"
            )));
        }
        if let Some(parent_id) = reply_to {
            let parent = self
                .store
                .get_message(parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound("message".into(), parent_id.to_string()))?;
            if parent.room_id != room_id {
                return Err(AppError::InvalidInput(
                    "reply target belongs to a different room".into(),
                ));
            }
        }

        let message = RoomMessage {
            id: Uuid::now_v7(),
            room_id,
            sender_id: user,
            anonymous_id: membership.anonymous_id,
            anonymous_name: membership.anonymous_name,
            content: content.to_string(),
            reply_to,
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by_admin: false,
            is_system: false,
            reactions: vec![],
            created_at: now,
        };
        self.store.create_message(&message).await?;
        Ok(message)
    }

    /// Ascending-by-creation-time page of a room's messages. Participants
    /// only; expired rooms answer `Gone`.
    pub async fn list_messages(
        &self,
        room_id: Uuid,
        user: Uuid,
        page: u32,
        limit: u32,
        include_deleted: bool,
    ) -> Result<Page<RoomMessage>> {
        let now = Utc::now();
        let room = self.require_room(room_id).await?;
        if room.is_expired_at(now) {
            return Err(AppError::Gone("room".into()));
        }
        if self.store.get_membership(room_id, user).await?.is_none() {
            return Err(AppError::Forbidden("not a participant of this room".into()));
        }
        let (page, limit) = clamp_paging(page, limit);
        self.store.list_messages(room_id, page, limit, include_deleted).await
    }

    /// Soft delete: content is replaced by the fixed placeholder, the row
    /// stays for explicit `include_deleted` reads. Allowed for the author
    /// or an admin; idempotent on an already-deleted message.
    pub async fn delete_message(
        &self,
        room_id: Uuid,
        user: Uuid,
        message_id: Uuid,
        as_admin: bool,
    ) -> Result<RoomMessage> {
        let mut message = self.require_message(room_id, message_id).await?;
        if !as_admin && message.sender_id != user {
            return Err(AppError::Forbidden("only the author or an admin can delete".into()));
        }
        if message.is_deleted {
            return Ok(message);
        }
        message.is_deleted = true;
        message.deleted_at = Some(Utc::now());
        message.deleted_by_admin = as_admin && message.sender_id != user;
        message.content = DELETED_MESSAGE_PLACEHOLDER.to_string();
        self.store.update_message(&message).await?;
        Ok(message)
    }

    /// Edits a message body; author only, same content bounds as send.
    pub async fn edit_message(
        &self,
        room_id: Uuid,
        user: Uuid,
        message_id: Uuid,
        content: &str,
    ) -> Result<RoomMessage> {
        let now = Utc::now();
        let room = self.require_room(room_id).await?;
        if room.is_expired_at(now) {
            return Err(AppError::Gone("room".into()));
        }
        let mut message = self.require_message(room_id, message_id).await?;
        if message.sender_id != user {
            return Err(AppError::Forbidden("only the author can edit".into()));
        }
        if message.is_deleted {
            return Err(AppError::InvalidInput("cannot edit a deleted message".into()));
        }
        let content = content.trim();
        if content.is_empty() || content.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::InvalidInput(format!(
                "message content must be 1-{MAX_MESSAGE_LEN} characters"
            )));
        }
        message.content = content.to_string();
        message.is_edited = true;
        message.edited_at = Some(now);
        self.store.update_message(&message).await?;
        Ok(message)
    }

    /// Toggles a reaction. Idempotent per (member, emoji): reacting twice
    /// with the same emoji removes it again.
    pub async fn toggle_reaction(
        &self,
        room_id: Uuid,
        user: Uuid,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<RoomMessage> {
        let now = Utc::now();
        let room = self.require_room(room_id).await?;
        if room.is_expired_at(now) {
            return Err(AppError::Gone("room".into()));
        }
        let membership = self
            .store
            .get_membership(room_id, user)
            .await?
            .ok_or_else(|| AppError::Forbidden("not a participant of this room".into()))?;
        let emoji = emoji.trim();
        if emoji.is_empty() || emoji.chars().count() > 16 {
            return Err(AppError::InvalidInput("invalid reaction emoji".into()));
        }

        let mut message = self.require_message(room_id, message_id).await?;
        let existing = message
            .reactions
            .iter()
            .position(|r| r.anonymous_id == membership.anonymous_id && r.emoji == emoji);
        match existing {
            Some(idx) => {
                message.reactions.remove(idx);
            }
            None => message.reactions.push(em_core::models::Reaction {
                emoji: emoji.to_string(),
                anonymous_id: membership.anonymous_id,
                reacted_at: now,
            }),
        }
        self.store.update_message(&message).await?;
        Ok(message)
    }

    async fn require_room(&self, room_id: Uuid) -> Result<Room> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound("room".into(), room_id.to_string()))
    }

    async fn require_message(&self, room_id: Uuid, message_id: Uuid) -> Result<RoomMessage> {
        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("message".into(), message_id.to_string()))?;
        if message.room_id != room_id {
            return Err(AppError::NotFound("message".into(), message_id.to_string()));
        }
        Ok(message)
    }
}

fn clamp_paging(page: u32, limit: u32) -> (u32, u32) {
    let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit.min(MAX_PAGE_LIMIT) };
    (page.max(1), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use em_core::models::Membership;
    use em_core::traits::MockContentStore;

    fn live_room(id: Uuid, max_users: i64) -> Room {
        let now = Utc::now();
        Room {
            id,
            creator_id: Uuid::now_v7(),
            name: "embers".to_string(),
            description: String::new(),
            tags: vec![],
            duration_hours: 24,
            expires_at: now + Duration::hours(24),
            max_users,
            is_official: false,
            created_at: now,
            participants: vec![],
        }
    }

    fn expired_room(id: Uuid) -> Room {
        let mut room = live_room(id, 50);
        room.expires_at = Utc::now() - Duration::hours(1);
        room
    }

    fn membership(room_id: Uuid, user_id: Uuid) -> Membership {
        Membership {
            room_id,
            user_id,
            anonymous_id: "a1b2c3d4e5".to_string(),
            anonymous_name: "Anonymous-1234".to_string(),
            joined_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn send_message_into_expired_room_is_gone_even_for_members() {
        let room_id = Uuid::now_v7();
        let user = Uuid::now_v7();
        let mut store = MockContentStore::new();
        store
            .expect_get_room()
            .returning(move |_| Ok(Some(expired_room(room_id))));
        // membership is never consulted and no message is written
        store.expect_get_membership().never();
        store.expect_create_message().never();

        let service = RoomService::new(Arc::new(store));
        let err = service.send_message(room_id, user, "hello", None).await.unwrap_err();
        assert!(matches!(err, AppError::Gone(_)));
    }

    #[tokio::test]
    async fn send_message_requires_membership() {
        let room_id = Uuid::now_v7();
        let mut store = MockContentStore::new();
        store
            .expect_get_room()
            .returning(move |_| Ok(Some(live_room(room_id, 50))));
        store.expect_get_membership().returning(|_, _| Ok(None));
        store.expect_create_message().never();

        let service = RoomService::new(Arc::new(store));
        let err = service
            .send_message(room_id, Uuid::now_v7(), "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn send_message_rejects_empty_and_oversized_content() {
        let room_id = Uuid::now_v7();
        let user = Uuid::now_v7();
        let mut store = MockContentStore::new();
        store
            .expect_get_room()
            .returning(move |_| Ok(Some(live_room(room_id, 50))));
        store
            .expect_get_membership()
            .returning(move |r, u| Ok(Some(membership(r, u))));
        store.expect_create_message().never();

        let service = RoomService::new(Arc::new(store));
        let oversized = "x".repeat(MAX_MESSAGE_LEN + 1);
        for bad in ["", "   ", oversized.as_str()] {
            let err = service.send_message(room_id, user, bad, None).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{bad:.20} should fail");
        }
    }

    #[tokio::test]
    async fn send_message_stamps_the_membership_pseudonym() {
        let room_id = Uuid::now_v7();
        let user = Uuid::now_v7();
        let mut store = MockContentStore::new();
        store
            .expect_get_room()
            .returning(move |_| Ok(Some(live_room(room_id, 50))));
        store
            .expect_get_membership()
            .returning(move |r, u| Ok(Some(membership(r, u))));
        store.expect_create_message().once().returning(|_| Ok(()));

        let service = RoomService::new(Arc::new(store));
        let message = service
            .send_message(room_id, user, "  hello there  ", None)
            .await
            .unwrap();
        assert_eq!(message.anonymous_id, "a1b2c3d4e5");
        assert_eq!(message.anonymous_name, "Anonymous-1234");
        assert_eq!(message.content, "hello there");
        assert_eq!(message.sender_id, user);
    }

    #[tokio::test]
    async fn join_full_room_is_capacity_exceeded() {
        let room_id = Uuid::now_v7();
        let mut store = MockContentStore::new();
        store
            .expect_try_join()
            .returning(|_, _, _, _| Ok(JoinOutcome::Full));

        let service = RoomService::new(Arc::new(store));
        let err = service.join(room_id, Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));
    }

    #[tokio::test]
    async fn join_expired_room_is_gone_and_missing_room_is_not_found() {
        let mut store = MockContentStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_try_join()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(JoinOutcome::Expired));
        store
            .expect_try_join()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(JoinOutcome::NotFound));

        let service = RoomService::new(Arc::new(store));
        let gone = service.join(Uuid::now_v7(), Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(gone, AppError::Gone(_)));
        let missing = service.join(Uuid::now_v7(), Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_, _)));
    }

    #[tokio::test]
    async fn delete_message_by_stranger_is_forbidden() {
        let room_id = Uuid::now_v7();
        let author = Uuid::now_v7();
        let message_id = Uuid::now_v7();
        let mut store = MockContentStore::new();
        store.expect_get_message().returning(move |id| {
            Ok(Some(RoomMessage {
                id,
                room_id,
                sender_id: author,
                anonymous_id: "a1b2c3d4e5".to_string(),
                anonymous_name: "Anonymous-1234".to_string(),
                content: "hi".to_string(),
                reply_to: None,
                is_edited: false,
                edited_at: None,
                is_deleted: false,
                deleted_at: None,
                deleted_by_admin: false,
                is_system: false,
                reactions: vec![],
                created_at: Utc::now(),
            }))
        });
        store.expect_update_message().never();

        let service = RoomService::new(Arc::new(store));
        let err = service
            .delete_message(room_id, Uuid::now_v7(), message_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn delete_message_replaces_content_with_placeholder() {
        let room_id = Uuid::now_v7();
        let author = Uuid::now_v7();
        let message_id = Uuid::now_v7();
        let mut store = MockContentStore::new();
        store.expect_get_message().returning(move |id| {
            Ok(Some(RoomMessage {
                id,
                room_id,
                sender_id: author,
                anonymous_id: "a1b2c3d4e5".to_string(),
                anonymous_name: "Anonymous-1234".to_string(),
                content: "regrettable".to_string(),
                reply_to: None,
                is_edited: false,
                edited_at: None,
                is_deleted: false,
                deleted_at: None,
                deleted_by_admin: false,
                is_system: false,
                reactions: vec![],
                created_at: Utc::now(),
            }))
        });
        store
            .expect_update_message()
            .once()
            .withf(|m| m.is_deleted && m.content == DELETED_MESSAGE_PLACEHOLDER)
            .returning(|_| Ok(()));

        let service = RoomService::new(Arc::new(store));
        let deleted = service
            .delete_message(room_id, author, message_id, false)
            .await
            .unwrap();
        assert!(deleted.is_deleted);
        assert!(!deleted.deleted_by_admin);
        assert_eq!(deleted.content, DELETED_MESSAGE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn create_room_validates_duration_and_capacity() {
        let store = MockContentStore::new();
        let service = RoomService::new(Arc::new(store));
        let creator = Uuid::now_v7();

        let bad_duration = NewRoom {
            name: "midnight".to_string(),
            description: String::new(),
            duration: Some(0),
            tags: vec![],
            max_users: None,
        };
        assert!(matches!(
            service.create_room(creator, bad_duration).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));

        let bad_capacity = NewRoom {
            name: "midnight".to_string(),
            description: String::new(),
            duration: None,
            tags: vec![],
            max_users: Some(0),
        };
        assert!(matches!(
            service.create_room(creator, bad_capacity).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
    }
}
