//! # em-api
//!
//! The web routing and orchestration layer for Embers.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the REST surface.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // Rooms
            .route("/rooms", web::post().to(handlers::create_room))
            .route("/rooms", web::get().to(handlers::list_rooms))
            .route("/rooms/{id}/join", web::post().to(handlers::join_room))
            .route("/rooms/{id}/leave", web::delete().to(handlers::leave_room))
            .route("/rooms/{id}/messages", web::post().to(handlers::send_message))
            .route("/rooms/{id}/messages", web::get().to(handlers::list_messages))
            .route("/rooms/{id}/messages/{mid}", web::patch().to(handlers::edit_message))
            .route("/rooms/{id}/messages/{mid}", web::delete().to(handlers::delete_message))
            .route(
                "/rooms/{id}/messages/{mid}/reactions",
                web::post().to(handlers::toggle_reaction),
            )
            // Posts
            .route("/posts", web::post().to(handlers::create_post))
            .route("/posts", web::get().to(handlers::list_posts))
            .route("/posts/{id}", web::get().to(handlers::get_post))
            .route("/posts/{id}", web::patch().to(handlers::edit_post))
            .route("/posts/{id}", web::delete().to(handlers::delete_post))
            .route("/posts/{id}/renew", web::post().to(handlers::renew_post))
            .route("/posts/{id}/media", web::put().to(handlers::attach_media))
            .route("/posts/{id}/media", web::delete().to(handlers::detach_media))
            .route("/posts/{id}/comments", web::post().to(handlers::add_comment))
            .route("/posts/{id}/comments/{cid}", web::delete().to(handlers::remove_comment)),
    );
}
