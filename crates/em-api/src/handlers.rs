//! # em-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the Embers
//! services. Token verification happens upstream: handlers trust the
//! caller identity resolved into the `x-user-id` / `x-user-role` headers.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use em_core::error::AppError;
use em_core::models::{PostSort, RoomFilter, RoomQuery};
use em_services::posts::{NewPost, PostService};
use em_services::rooms::{NewRoom, RoomService};
use serde::Deserialize;
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::ApiError;

/// State shared across all actix workers.
pub struct AppState {
    pub rooms: RoomService,
    pub posts: PostService,
}

/// The caller identity as resolved by the upstream auth layer.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl FromRequest for UserContext {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok());
        let is_admin = req
            .headers()
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("admin"))
            .unwrap_or(false);
        ready(match user_id {
            Some(user_id) => Ok(UserContext { user_id, is_admin }),
            None => Err(ApiError(AppError::Forbidden("missing caller identity".into()))),
        })
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

// ── Rooms ────────────────────────────────────────────────────────────────────

pub async fn create_room(
    data: web::Data<AppState>,
    user: UserContext,
    body: web::Json<NewRoom>,
) -> ApiResult {
    let (room, identity) = data.rooms.create_room(user.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created()
        .json(serde_json::json!({ "room": room, "identity": identity })))
}

#[derive(Debug, Deserialize)]
pub struct RoomListParams {
    pub filter: Option<String>,
    #[serde(default)]
    pub include_expired: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_rooms(
    data: web::Data<AppState>,
    user: UserContext,
    params: web::Query<RoomListParams>,
) -> ApiResult {
    let filter = match params.filter.as_deref() {
        None => RoomFilter::All,
        Some("joined") => RoomFilter::Joined,
        Some("official") => RoomFilter::Official,
        Some(other) => {
            return Err(ApiError(AppError::InvalidInput(format!(
                "unknown room filter '{other}'"
            ))))
        }
    };
    let query = RoomQuery {
        filter,
        user_id: Some(user.user_id),
        include_expired: params.include_expired,
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(0),
    };
    let page = data.rooms.list_rooms(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn join_room(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
) -> ApiResult {
    let (room, identity) = data.rooms.join(path.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "room": room, "identity": identity })))
}

pub async fn leave_room(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
) -> ApiResult {
    data.rooms.leave(path.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub content: String,
    pub reply_to: Option<Uuid>,
}

pub async fn send_message(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
    body: web::Json<SendMessageBody>,
) -> ApiResult {
    let message = data
        .rooms
        .send_message(path.into_inner(), user.user_id, &body.content, body.reply_to)
        .await?;
    Ok(HttpResponse::Created().json(message))
}

#[derive(Debug, Deserialize)]
pub struct MessageListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub include_deleted: bool,
}

pub async fn list_messages(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
    params: web::Query<MessageListParams>,
) -> ApiResult {
    let page = data
        .rooms
        .list_messages(
            path.into_inner(),
            user.user_id,
            params.page.unwrap_or(1),
            params.limit.unwrap_or(0),
            params.include_deleted,
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

#[derive(Debug, Deserialize)]
pub struct EditMessageBody {
    pub content: String,
}

pub async fn edit_message(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<EditMessageBody>,
) -> ApiResult {
    let (room_id, message_id) = path.into_inner();
    let message = data
        .rooms
        .edit_message(room_id, user.user_id, message_id, &body.content)
        .await?;
    Ok(HttpResponse::Ok().json(message))
}

pub async fn delete_message(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<(Uuid, Uuid)>,
) -> ApiResult {
    let (room_id, message_id) = path.into_inner();
    let message = data
        .rooms
        .delete_message(room_id, user.user_id, message_id, user.is_admin)
        .await?;
    Ok(HttpResponse::Ok().json(message))
}

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
    pub emoji: String,
}

pub async fn toggle_reaction(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<ReactionBody>,
) -> ApiResult {
    let (room_id, message_id) = path.into_inner();
    let message = data
        .rooms
        .toggle_reaction(room_id, user.user_id, message_id, &body.emoji)
        .await?;
    Ok(HttpResponse::Ok().json(message))
}

// ── Posts ────────────────────────────────────────────────────────────────────

pub async fn create_post(
    data: web::Data<AppState>,
    user: UserContext,
    body: web::Json<NewPost>,
) -> ApiResult {
    let post = data.posts.create_post(user.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[derive(Debug, Deserialize)]
pub struct PostListParams {
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_posts(
    data: web::Data<AppState>,
    _user: UserContext,
    params: web::Query<PostListParams>,
) -> ApiResult {
    let sort = match params.sort.as_deref() {
        None | Some("newest") => PostSort::Newest,
        Some("views") => PostSort::MostViewed,
        Some(other) => {
            return Err(ApiError(AppError::InvalidInput(format!(
                "unknown post sort '{other}'"
            ))))
        }
    };
    let page = data
        .posts
        .list_posts(sort, params.page.unwrap_or(1), params.limit.unwrap_or(0))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_post(
    data: web::Data<AppState>,
    _user: UserContext,
    path: web::Path<Uuid>,
) -> ApiResult {
    let (post, comments) = data.posts.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "post": post, "comments": comments })))
}

#[derive(Debug, Deserialize)]
pub struct EditPostBody {
    pub content: String,
}

pub async fn edit_post(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
    body: web::Json<EditPostBody>,
) -> ApiResult {
    let post = data
        .posts
        .edit_content(path.into_inner(), user.user_id, &body.content)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
) -> ApiResult {
    data.posts.delete_post(path.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct RenewBody {
    pub hours: Option<i64>,
}

pub async fn renew_post(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
    body: web::Json<RenewBody>,
) -> ApiResult {
    let post = data
        .posts
        .renew(path.into_inner(), user.user_id, body.hours)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Raw-body upload; the media collaborator does the real storage work.
pub async fn attach_media(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
    req: HttpRequest,
    bytes: web::Bytes,
) -> ApiResult {
    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let post = data
        .posts
        .attach_media(path.into_inner(), user.user_id, bytes.to_vec(), &content_type)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn detach_media(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
) -> ApiResult {
    let post = data.posts.detach_media(path.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[derive(Debug, Deserialize)]
pub struct NewCommentBody {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

pub async fn add_comment(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<Uuid>,
    body: web::Json<NewCommentBody>,
) -> ApiResult {
    let comment = data
        .posts
        .add_comment(path.into_inner(), user.user_id, &body.content, body.parent_id)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn remove_comment(
    data: web::Data<AppState>,
    user: UserContext,
    path: web::Path<(Uuid, Uuid)>,
) -> ApiResult {
    let (post_id, comment_id) = path.into_inner();
    data.posts
        .remove_comment(post_id, user.user_id, comment_id)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
