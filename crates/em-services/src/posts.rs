//! # Post Lifecycle Service
//!
//! Creation with a default or explicit validity window, bounded renewal,
//! comments with one-level replies, and media attach/detach through the
//! `MediaStore` port. Expired posts fall out of the feed but stay
//! retrievable by id.

use std::sync::Arc;

use chrono::Utc;
use em_core::error::{AppError, Result};
use em_core::models::{Comment, CommentThread, MediaObject, Page, Post, PostSort};
use em_core::traits::{ContentStore, MediaStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::expiry;

const MAX_POST_CONTENT_LEN: usize = 5000;
const MAX_COMMENT_CONTENT_LEN: usize = 1000;

const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;

/// Creation parameters for a post.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub content: String,
    /// Validity window in hours; defaults to 24.
    pub expiration_hours: Option<i64>,
}

pub struct PostService {
    store: Arc<dyn ContentStore>,
    media: Arc<dyn MediaStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn ContentStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { store, media }
    }

    pub async fn create_post(&self, owner: Uuid, req: NewPost) -> Result<Post> {
        let content = validate_content(&req.content, MAX_POST_CONTENT_LEN)?;
        let hours =
            expiry::validate_expiration_time(req.expiration_hours, expiry::DEFAULT_EXPIRATION_HOURS)?;
        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            owner_id: owner,
            content,
            media: None,
            created_at: now,
            expires_at: Some(expiry::calculate_expiration_date(now, hours)),
            renewal_count: 0,
            renewed_at: None,
            view_count: 0,
        };
        self.store.create_post(&post).await?;
        Ok(post)
    }

    /// Read path: bumps the view counter. Expired posts are still served;
    /// only default listings exclude them.
    pub async fn get_post(&self, id: Uuid) -> Result<(Post, Vec<CommentThread>)> {
        let post = self.require_post(id).await?;
        self.store.increment_views(id).await?;
        let comments = self.get_comments(id).await?;
        Ok((post, comments))
    }

    /// The feed: non-expired posts, newest first or most viewed within the
    /// 24h window.
    pub async fn list_posts(&self, sort: PostSort, page: u32, limit: u32) -> Result<Page<Post>> {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit.min(MAX_PAGE_LIMIT) };
        self.store.list_active_posts(Utc::now(), sort, page, limit).await
    }

    pub async fn edit_content(&self, id: Uuid, owner: Uuid, content: &str) -> Result<Post> {
        let mut post = self.require_owned_post(id, owner).await?;
        post.content = validate_content(content, MAX_POST_CONTENT_LEN)?;
        self.store.update_post(&post).await?;
        Ok(post)
    }

    /// Replaces the expiry window from now, at most `MAX_RENEWALS` times.
    pub async fn renew(&self, id: Uuid, owner: Uuid, hours: Option<i64>) -> Result<Post> {
        let mut post = self.require_owned_post(id, owner).await?;
        expiry::renew_post(&mut post, hours, Utc::now())?;
        self.store.update_post(&post).await?;
        log::info!(
            "post {id} renewed ({}/{}), new expiry {:?}",
            post.renewal_count,
            expiry::MAX_RENEWALS,
            post.expires_at
        );
        Ok(post)
    }

    /// Stores the upload and attaches it, releasing any previous attachment.
    pub async fn attach_media(
        &self,
        id: Uuid,
        owner: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<Post> {
        let mut post = self.require_owned_post(id, owner).await?;
        let stored = self.media.save(data, content_type).await?;
        if let Some(old) = post.media.replace(stored) {
            self.release_media(&old).await;
        }
        self.store.update_post(&post).await?;
        Ok(post)
    }

    pub async fn detach_media(&self, id: Uuid, owner: Uuid) -> Result<Post> {
        let mut post = self.require_owned_post(id, owner).await?;
        if let Some(old) = post.media.take() {
            self.release_media(&old).await;
            self.store.update_post(&post).await?;
        }
        Ok(post)
    }

    /// Owner-only delete; cascades comments and releases attached media.
    pub async fn delete_post(&self, id: Uuid, owner: Uuid) -> Result<()> {
        let post = self.require_owned_post(id, owner).await?;
        if let Some(media) = &post.media {
            self.release_media(media).await;
        }
        self.store.delete_comments_for_post(id).await?;
        self.store.delete_post(id).await
    }

    /// Adds a comment, or a reply when `parent_id` is set. Replies may only
    /// target top-level comments: nesting is one level deep.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Comment> {
        self.require_post(post_id).await?;
        if let Some(pid) = parent_id {
            let parent = self
                .store
                .get_comment(pid)
                .await?
                .ok_or_else(|| AppError::NotFound("comment".into(), pid.to_string()))?;
            if parent.post_id != post_id {
                return Err(AppError::InvalidInput(
                    "parent comment belongs to a different post".into(),
                ));
            }
            if parent.parent_id.is_some() {
                return Err(AppError::InvalidInput("replies cannot be nested further".into()));
            }
        }
        let comment = Comment {
            id: Uuid::now_v7(),
            post_id,
            parent_id,
            author_id: author,
            content: validate_content(content, MAX_COMMENT_CONTENT_LEN)?,
            created_at: Utc::now(),
        };
        self.store.add_comment(&comment).await?;
        Ok(comment)
    }

    /// Comment author or post owner may remove; replies go with it.
    pub async fn remove_comment(&self, post_id: Uuid, requester: Uuid, comment_id: Uuid) -> Result<()> {
        let post = self.require_post(post_id).await?;
        let comment = self
            .store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("comment".into(), comment_id.to_string()))?;
        if comment.post_id != post_id {
            return Err(AppError::NotFound("comment".into(), comment_id.to_string()));
        }
        if comment.author_id != requester && post.owner_id != requester {
            return Err(AppError::Forbidden(
                "only the comment author or the post owner can remove it".into(),
            ));
        }
        self.store.delete_comment(comment_id).await?;
        Ok(())
    }

    /// Assembles the flat comment rows into one level of nesting.
    pub async fn get_comments(&self, post_id: Uuid) -> Result<Vec<CommentThread>> {
        let rows = self.store.list_comments(post_id).await?;
        let (top, replies): (Vec<_>, Vec<_>) = rows.into_iter().partition(|c| c.parent_id.is_none());
        Ok(top
            .into_iter()
            .map(|comment| {
                let replies = replies
                    .iter()
                    .filter(|r| r.parent_id == Some(comment.id))
                    .cloned()
                    .collect();
                CommentThread { comment, replies }
            })
            .collect())
    }

    async fn require_post(&self, id: Uuid) -> Result<Post> {
        self.store
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound("post".into(), id.to_string()))
    }

    async fn require_owned_post(&self, id: Uuid, owner: Uuid) -> Result<Post> {
        let post = self.require_post(id).await?;
        if post.owner_id != owner {
            return Err(AppError::Forbidden("not the post owner".into()));
        }
        Ok(post)
    }

    /// Media release is best-effort: the external store retries nothing and
    /// an orphaned blob is preferable to failing the user's action.
    async fn release_media(&self, media: &MediaObject) {
        if let Err(err) = self.media.delete(&media.public_id).await {
            log::warn!("failed to release media {}: {err}", media.public_id);
        }
    }
}

fn validate_content(raw: &str, max_len: usize) -> Result<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::InvalidInput("content cannot be empty".into()));
    }
    if content.chars().count() > max_len {
        return Err(AppError::InvalidInput(format!(
            "content cannot exceed {max_len} characters"
        )));
    }
    Ok(content.to_string())
}
