//! # em-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational
//! model and the `em-core` domain models. JSON buckets (tags, reactions,
//! media) live in TEXT columns; UUIDs are stored as BLOBs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use em_core::error::{AppError, Result};
use em_core::models::{
    AnonymousIdentity, Comment, JoinOutcome, Membership, Page, Post, PostSort, Room, RoomMessage,
    RoomQuery,
};
use em_core::traits::ContentStore;
use em_core::RoomFilter;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id            BLOB PRIMARY KEY,
    owner_id      BLOB NOT NULL,
    content       TEXT NOT NULL,
    media         TEXT,
    created_at    TEXT NOT NULL,
    expires_at    TEXT,
    renewal_count INTEGER NOT NULL DEFAULT 0,
    renewed_at    TEXT,
    view_count    INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_posts_expires ON posts (expires_at);

CREATE TABLE IF NOT EXISTS comments (
    id         BLOB PRIMARY KEY,
    post_id    BLOB NOT NULL,
    parent_id  BLOB,
    author_id  BLOB NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_post ON comments (post_id);

CREATE TABLE IF NOT EXISTS rooms (
    id             BLOB PRIMARY KEY,
    creator_id     BLOB NOT NULL,
    name           TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    tags           TEXT NOT NULL DEFAULT '[]',
    duration_hours INTEGER NOT NULL,
    expires_at     TEXT NOT NULL,
    max_users      INTEGER NOT NULL,
    is_official    INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rooms_expires ON rooms (expires_at);
CREATE INDEX IF NOT EXISTS idx_rooms_official_name ON rooms (name) WHERE is_official = 1;

CREATE TABLE IF NOT EXISTS room_participants (
    room_id        BLOB NOT NULL,
    user_id        BLOB NOT NULL,
    anonymous_id   TEXT NOT NULL,
    anonymous_name TEXT NOT NULL,
    joined_at      TEXT NOT NULL,
    PRIMARY KEY (room_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_participants_user ON room_participants (user_id);

CREATE TABLE IF NOT EXISTS room_messages (
    id               BLOB PRIMARY KEY,
    room_id          BLOB NOT NULL,
    sender_id        BLOB NOT NULL,
    anonymous_id     TEXT NOT NULL,
    anonymous_name   TEXT NOT NULL,
    content          TEXT NOT NULL,
    reply_to         BLOB,
    is_edited        INTEGER NOT NULL DEFAULT 0,
    edited_at        TEXT,
    is_deleted       INTEGER NOT NULL DEFAULT 0,
    deleted_at       TEXT,
    deleted_by_admin INTEGER NOT NULL DEFAULT 0,
    is_system        INTEGER NOT NULL DEFAULT 0,
    reactions        TEXT NOT NULL DEFAULT '[]',
    created_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_room_time ON room_messages (room_id, created_at);
"#;

pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    /// Connects and bootstraps the schema.
    ///
    /// # Developer Note
    /// A single pooled connection: SQLite serializes writers anyway, and it
    /// keeps `sqlite::memory:` databases alive across calls in tests.
    pub async fn new(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(internal)?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(internal)?;
        Ok(Self { pool })
    }
}

fn internal<E: std::fmt::Display>(err: E) -> AppError {
    AppError::Internal(err.to_string())
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn opt_blob_to_uuid(blob: Option<Vec<u8>>) -> Option<Uuid> {
    blob.map(|b| blob_to_uuid(&b))
}

fn map_post(row: &SqliteRow) -> Result<Post> {
    let media: Option<String> = row.get("media");
    Ok(Post {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        owner_id: blob_to_uuid(row.get::<Vec<u8>, _>("owner_id").as_slice()),
        content: row.get("content"),
        media: media.map(|m| serde_json::from_str(&m)).transpose()?,
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        renewal_count: row.get("renewal_count"),
        renewed_at: row.get("renewed_at"),
        view_count: row.get("view_count"),
    })
}

fn map_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        post_id: blob_to_uuid(row.get::<Vec<u8>, _>("post_id").as_slice()),
        parent_id: opt_blob_to_uuid(row.get("parent_id")),
        author_id: blob_to_uuid(row.get::<Vec<u8>, _>("author_id").as_slice()),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

fn map_room(row: &SqliteRow, participants: Vec<Uuid>) -> Result<Room> {
    Ok(Room {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        creator_id: blob_to_uuid(row.get::<Vec<u8>, _>("creator_id").as_slice()),
        name: row.get("name"),
        description: row.get("description"),
        tags: serde_json::from_str(&row.get::<String, _>("tags"))?,
        duration_hours: row.get("duration_hours"),
        expires_at: row.get("expires_at"),
        max_users: row.get("max_users"),
        is_official: row.get("is_official"),
        created_at: row.get("created_at"),
        participants,
    })
}

fn map_message(row: &SqliteRow) -> Result<RoomMessage> {
    Ok(RoomMessage {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        room_id: blob_to_uuid(row.get::<Vec<u8>, _>("room_id").as_slice()),
        sender_id: blob_to_uuid(row.get::<Vec<u8>, _>("sender_id").as_slice()),
        anonymous_id: row.get("anonymous_id"),
        anonymous_name: row.get("anonymous_name"),
        content: row.get("content"),
        reply_to: opt_blob_to_uuid(row.get("reply_to")),
        is_edited: row.get("is_edited"),
        edited_at: row.get("edited_at"),
        is_deleted: row.get("is_deleted"),
        deleted_at: row.get("deleted_at"),
        deleted_by_admin: row.get("deleted_by_admin"),
        is_system: row.get("is_system"),
        reactions: serde_json::from_str(&row.get::<String, _>("reactions"))?,
        created_at: row.get("created_at"),
    })
}

impl SqliteContentStore {
    async fn participants_of(&self, room_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM room_participants WHERE room_id = ? ORDER BY joined_at ASC",
        )
        .bind(uuid_to_blob(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(rows
            .into_iter()
            .map(|row| blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()))
            .collect())
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn create_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, owner_id, content, media, created_at, expires_at, renewal_count, renewed_at, view_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(post.id))
        .bind(uuid_to_blob(post.owner_id))
        .bind(&post.content)
        .bind(post.media.as_ref().map(serde_json::to_string).transpose()?)
        .bind(post.created_at)
        .bind(post.expires_at)
        .bind(post.renewal_count)
        .bind(post.renewed_at)
        .bind(post.view_count)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.as_ref().map(map_post).transpose()
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            "UPDATE posts SET content = ?, media = ?, expires_at = ?, renewal_count = ?, renewed_at = ? \
             WHERE id = ?",
        )
        .bind(&post.content)
        .bind(post.media.as_ref().map(serde_json::to_string).transpose()?)
        .bind(post.expires_at)
        .bind(post.renewal_count)
        .bind(post.renewed_at)
        .bind(uuid_to_blob(post.id))
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn list_active_posts(
        &self,
        now: DateTime<Utc>,
        sort: PostSort,
        page: u32,
        limit: u32,
    ) -> Result<Page<Post>> {
        // "active" means the validity window has not closed yet
        let (where_clause, order_clause) = match sort {
            PostSort::Newest => (
                "(expires_at IS NULL OR expires_at >= ?)",
                "ORDER BY created_at DESC",
            ),
            PostSort::MostViewed => (
                "(expires_at IS NULL OR expires_at >= ?) AND created_at >= ?",
                "ORDER BY view_count DESC, created_at DESC",
            ),
        };
        let window_start = now - Duration::hours(24);
        // pages are 1-based; 0 is read as the first page
        let page = page.max(1);
        let offset = ((page - 1) as i64) * (limit as i64);

        let count_sql = format!("SELECT COUNT(*) AS n FROM posts WHERE {where_clause}");
        let mut count_query = sqlx::query(&count_sql).bind(now);
        if matches!(sort, PostSort::MostViewed) {
            count_query = count_query.bind(window_start);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?
            .get("n");

        let list_sql =
            format!("SELECT * FROM posts WHERE {where_clause} {order_clause} LIMIT ? OFFSET ?");
        let mut list_query = sqlx::query(&list_sql).bind(now);
        if matches!(sort, PostSort::MostViewed) {
            list_query = list_query.bind(window_start);
        }
        let rows = list_query
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;

        let items = rows.iter().map(map_post).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total as u64, page, limit))
    }

    async fn increment_views(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn add_comment(&self, comment: &Comment) -> Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, parent_id, author_id, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(comment.id))
        .bind(uuid_to_blob(comment.post_id))
        .bind(comment.parent_id.map(uuid_to_blob))
        .bind(uuid_to_blob(comment.author_id))
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.as_ref().map(map_comment))
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query("SELECT * FROM comments WHERE post_id = ? ORDER BY created_at ASC")
            .bind(uuid_to_blob(post_id))
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.iter().map(map_comment).collect())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ? OR parent_id = ?")
            .bind(uuid_to_blob(id))
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected())
    }

    async fn delete_comments_for_post(&self, post_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(uuid_to_blob(post_id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(result.rows_affected())
    }

    async fn create_room(&self, room: &Room) -> Result<()> {
        sqlx::query(
            "INSERT INTO rooms (id, creator_id, name, description, tags, duration_hours, expires_at, max_users, is_official, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(room.id))
        .bind(uuid_to_blob(room.creator_id))
        .bind(&room.name)
        .bind(&room.description)
        .bind(serde_json::to_string(&room.tags)?)
        .bind(room.duration_hours)
        .bind(room.expires_at)
        .bind(room.max_users)
        .bind(room.is_official)
        .bind(room.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>> {
        let row = sqlx::query("SELECT * FROM rooms WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        match row {
            Some(row) => {
                let participants = self.participants_of(blob_to_uuid(
                    row.get::<Vec<u8>, _>("id").as_slice(),
                ))
                .await?;
                Ok(Some(map_room(&row, participants)?))
            }
            None => Ok(None),
        }
    }

    async fn list_rooms(&self, query: &RoomQuery, now: DateTime<Utc>) -> Result<Page<Room>> {
        let mut conditions: Vec<&str> = vec![];
        match query.filter {
            RoomFilter::All => {}
            RoomFilter::Joined => conditions.push(
                "id IN (SELECT room_id FROM room_participants WHERE user_id = ?)",
            ),
            RoomFilter::Official => conditions.push("is_official = 1"),
        }
        if !query.include_expired {
            conditions.push("expires_at >= ?");
        }
        let where_clause = if conditions.is_empty() {
            String::from("1=1")
        } else {
            conditions.join(" AND ")
        };

        let user_blob = query.user_id.map(uuid_to_blob);

        let count_sql = format!("SELECT COUNT(*) AS n FROM rooms WHERE {where_clause}");
        let mut count_query = sqlx::query(&count_sql);
        if query.filter == RoomFilter::Joined {
            count_query = count_query.bind(user_blob.clone());
        }
        if !query.include_expired {
            count_query = count_query.bind(now);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?
            .get("n");

        let page = query.page.max(1);
        let offset = ((page - 1) as i64) * (query.limit as i64);
        let list_sql = format!(
            "SELECT * FROM rooms WHERE {where_clause} ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query(&list_sql);
        if query.filter == RoomFilter::Joined {
            list_query = list_query.bind(user_blob);
        }
        if !query.include_expired {
            list_query = list_query.bind(now);
        }
        let rows = list_query
            .bind(query.limit as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice());
            let participants = self.participants_of(id).await?;
            items.push(map_room(row, participants)?);
        }
        Ok(Page::new(items, total as u64, page, query.limit))
    }

    /// Atomic admission: existence, expiry, duplicate and capacity checks
    /// plus the insert all run inside one transaction.
    ///
    /// # Developer Note
    /// Without the transaction two concurrent joins at `max_users - 1`
    /// could both observe "not yet full" and overshoot capacity.
    async fn try_join(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        identity: &AnonymousIdentity,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        let room = sqlx::query("SELECT max_users, expires_at FROM rooms WHERE id = ?")
            .bind(uuid_to_blob(room_id))
            .fetch_optional(&mut *tx)
            .await
            .map_err(internal)?;
        let room = match room {
            Some(row) => row,
            None => return Ok(JoinOutcome::NotFound),
        };
        let expires_at: DateTime<Utc> = room.get("expires_at");
        if now > expires_at {
            return Ok(JoinOutcome::Expired);
        }

        let member = sqlx::query(
            "SELECT 1 FROM room_participants WHERE room_id = ? AND user_id = ?",
        )
        .bind(uuid_to_blob(room_id))
        .bind(uuid_to_blob(user_id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal)?;
        if member.is_some() {
            // idempotent re-join rotates the pseudonym
            sqlx::query(
                "UPDATE room_participants SET anonymous_id = ?, anonymous_name = ? \
                 WHERE room_id = ? AND user_id = ?",
            )
            .bind(&identity.anonymous_id)
            .bind(&identity.anonymous_name)
            .bind(uuid_to_blob(room_id))
            .bind(uuid_to_blob(user_id))
            .execute(&mut *tx)
            .await
            .map_err(internal)?;
            tx.commit().await.map_err(internal)?;
            return Ok(JoinOutcome::AlreadyMember);
        }

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM room_participants WHERE room_id = ?")
            .bind(uuid_to_blob(room_id))
            .fetch_one(&mut *tx)
            .await
            .map_err(internal)?
            .get("n");
        let max_users: i64 = room.get("max_users");
        if count >= max_users {
            return Ok(JoinOutcome::Full);
        }

        sqlx::query(
            "INSERT INTO room_participants (room_id, user_id, anonymous_id, anonymous_name, joined_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(room_id))
        .bind(uuid_to_blob(user_id))
        .bind(&identity.anonymous_id)
        .bind(&identity.anonymous_name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;
        tx.commit().await.map_err(internal)?;
        Ok(JoinOutcome::Joined)
    }

    async fn remove_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM room_participants WHERE room_id = ? AND user_id = ?")
            .bind(uuid_to_blob(room_id))
            .bind(uuid_to_blob(user_id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn get_membership(&self, room_id: Uuid, user_id: Uuid) -> Result<Option<Membership>> {
        let row = sqlx::query(
            "SELECT * FROM room_participants WHERE room_id = ? AND user_id = ?",
        )
        .bind(uuid_to_blob(room_id))
        .bind(uuid_to_blob(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;
        Ok(row.map(|row| Membership {
            room_id: blob_to_uuid(row.get::<Vec<u8>, _>("room_id").as_slice()),
            user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
            anonymous_id: row.get("anonymous_id"),
            anonymous_name: row.get("anonymous_name"),
            joined_at: row.get("joined_at"),
        }))
    }

    async fn expired_room_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM rooms WHERE expires_at < ?")
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows
            .into_iter()
            .map(|row| blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()))
            .collect())
    }

    async fn find_official_room(&self, name: &str) -> Result<Option<Room>> {
        let row = sqlx::query("SELECT * FROM rooms WHERE is_official = 1 AND name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        match row {
            Some(row) => {
                let id = blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice());
                let participants = self.participants_of(id).await?;
                Ok(Some(map_room(&row, participants)?))
            }
            None => Ok(None),
        }
    }

    async fn reset_room_expiry(&self, room_id: Uuid, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE rooms SET expires_at = ? WHERE id = ?")
            .bind(expires_at)
            .bind(uuid_to_blob(room_id))
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn create_message(&self, message: &RoomMessage) -> Result<()> {
        sqlx::query(
            "INSERT INTO room_messages (id, room_id, sender_id, anonymous_id, anonymous_name, content, reply_to, \
             is_edited, edited_at, is_deleted, deleted_at, deleted_by_admin, is_system, reactions, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(message.id))
        .bind(uuid_to_blob(message.room_id))
        .bind(uuid_to_blob(message.sender_id))
        .bind(&message.anonymous_id)
        .bind(&message.anonymous_name)
        .bind(&message.content)
        .bind(message.reply_to.map(uuid_to_blob))
        .bind(message.is_edited)
        .bind(message.edited_at)
        .bind(message.is_deleted)
        .bind(message.deleted_at)
        .bind(message.deleted_by_admin)
        .bind(message.is_system)
        .bind(serde_json::to_string(&message.reactions)?)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn get_message(&self, id: Uuid) -> Result<Option<RoomMessage>> {
        let row = sqlx::query("SELECT * FROM room_messages WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.as_ref().map(map_message).transpose()
    }

    async fn update_message(&self, message: &RoomMessage) -> Result<()> {
        sqlx::query(
            "UPDATE room_messages SET content = ?, is_edited = ?, edited_at = ?, is_deleted = ?, \
             deleted_at = ?, deleted_by_admin = ?, reactions = ? WHERE id = ?",
        )
        .bind(&message.content)
        .bind(message.is_edited)
        .bind(message.edited_at)
        .bind(message.is_deleted)
        .bind(message.deleted_at)
        .bind(message.deleted_by_admin)
        .bind(serde_json::to_string(&message.reactions)?)
        .bind(uuid_to_blob(message.id))
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }

    async fn list_messages(
        &self,
        room_id: Uuid,
        page: u32,
        limit: u32,
        include_deleted: bool,
    ) -> Result<Page<RoomMessage>> {
        let deleted_clause = if include_deleted { "" } else { "AND is_deleted = 0" };
        let page = page.max(1);
        let offset = ((page - 1) as i64) * (limit as i64);

        let count_sql = format!(
            "SELECT COUNT(*) AS n FROM room_messages WHERE room_id = ? {deleted_clause}"
        );
        let total: i64 = sqlx::query(&count_sql)
            .bind(uuid_to_blob(room_id))
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?
            .get("n");

        let list_sql = format!(
            "SELECT * FROM room_messages WHERE room_id = ? {deleted_clause} \
             ORDER BY created_at ASC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&list_sql)
            .bind(uuid_to_blob(room_id))
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;

        let items = rows.iter().map(map_message).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total as u64, page, limit))
    }

    async fn delete_messages_for_rooms(&self, room_ids: &[Uuid]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(internal)?;
        let mut deleted = 0u64;
        for room_id in room_ids {
            let result = sqlx::query("DELETE FROM room_messages WHERE room_id = ?")
                .bind(uuid_to_blob(*room_id))
                .execute(&mut *tx)
                .await
                .map_err(internal)?;
            deleted += result.rows_affected();
        }
        tx.commit().await.map_err(internal)?;
        if deleted > 0 {
            log::debug!("purged {deleted} messages across {} rooms", room_ids.len());
        }
        Ok(deleted)
    }
}
