//! HTTP-level checks: the REST surface maps domain outcomes onto the
//! documented status codes and the structured failure body.

use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use em_api::handlers::AppState;
use em_core::traits::ContentStore;
use integration_tests::{memory_store, post_service, room_service};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

async fn state_with_store() -> (web::Data<AppState>, Arc<dyn ContentStore>) {
    let store = memory_store().await;
    let state = web::Data::new(AppState {
        rooms: room_service(&store),
        posts: post_service(&store),
    });
    (state, store)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(em_api::configure_routes),
        )
        .await
    };
}

fn as_user(req: test::TestRequest, user: Uuid) -> test::TestRequest {
    req.insert_header(("x-user-id", user.to_string()))
}

#[actix_web::test]
async fn requests_without_identity_are_rejected() {
    let (state, _) = state_with_store().await;
    let app = app!(state);

    let req = test::TestRequest::get().uri("/rooms").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "failed");
}

#[actix_web::test]
async fn room_lifecycle_maps_to_201_200_400_410() {
    let (state, store) = state_with_store().await;
    let app = app!(state);
    let creator = Uuid::now_v7();

    // 201 on creation; the creator takes the single slot
    let req = as_user(test::TestRequest::post().uri("/rooms"), creator)
        .set_json(json!({ "name": "tiny", "duration": 1, "max_users": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = test::read_body_json(resp).await;
    let room_id: Uuid = serde_json::from_value(body["room"]["id"].clone()).unwrap();
    assert!(body["identity"]["anonymous_id"].as_str().unwrap().len() == 10);

    // 400 when a second user hits the capacity wall
    let req = as_user(
        test::TestRequest::post().uri(&format!("/rooms/{room_id}/join")),
        Uuid::now_v7(),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);

    // 404 for a room that never existed
    let req = as_user(
        test::TestRequest::post().uri(&format!("/rooms/{}/join", Uuid::now_v7())),
        creator,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);

    // 410 once the room expires, for joins and inner reads alike
    store
        .reset_room_expiry(room_id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    let req = as_user(
        test::TestRequest::post().uri(&format!("/rooms/{room_id}/join")),
        Uuid::now_v7(),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 410);

    let req = as_user(
        test::TestRequest::get().uri(&format!("/rooms/{room_id}/messages")),
        creator,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 410);
}

#[actix_web::test]
async fn messages_enforce_membership_and_content_bounds() {
    let (state, _) = state_with_store().await;
    let app = app!(state);
    let creator = Uuid::now_v7();

    let req = as_user(test::TestRequest::post().uri("/rooms"), creator)
        .set_json(json!({ "name": "chatty" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let room_id: Uuid = serde_json::from_value(body["room"]["id"].clone()).unwrap();

    // 403 for a non-member
    let req = as_user(
        test::TestRequest::post().uri(&format!("/rooms/{room_id}/messages")),
        Uuid::now_v7(),
    )
    .set_json(json!({ "content": "let me in" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    // 201 for a member; the payload exposes the pseudonym, not the user id
    let req = as_user(
        test::TestRequest::post().uri(&format!("/rooms/{room_id}/messages")),
        creator,
    )
    .set_json(json!({ "content": "hello" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let message: Value = test::read_body_json(resp).await;
    assert!(message.get("sender_id").is_none());
    assert!(message["anonymous_name"].as_str().unwrap().starts_with("Anonymous-"));

    // 400 for empty content
    let req = as_user(
        test::TestRequest::post().uri(&format!("/rooms/{room_id}/messages")),
        creator,
    )
    .set_json(json!({ "content": "   " }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn post_renewal_caps_at_three_over_http() {
    let (state, _) = state_with_store().await;
    let app = app!(state);
    let owner = Uuid::now_v7();

    let req = as_user(test::TestRequest::post().uri("/posts"), owner)
        .set_json(json!({ "content": "renew me" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);
    let post: Value = test::read_body_json(resp).await;
    let post_id: Uuid = serde_json::from_value(post["id"].clone()).unwrap();

    for _ in 0..3 {
        let req = as_user(
            test::TestRequest::post().uri(&format!("/posts/{post_id}/renew")),
            owner,
        )
        .set_json(json!({ "hours": 24 }))
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
    }

    // the fourth renewal breaks the cap
    let req = as_user(
        test::TestRequest::post().uri(&format!("/posts/{post_id}/renew")),
        owner,
    )
    .set_json(json!({ "hours": 24 }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "failed");

    // out-of-range hours fail validation with a descriptive message
    let fresh = as_user(test::TestRequest::post().uri("/posts"), owner)
        .set_json(json!({ "content": "bad hours" }))
        .to_request();
    let fresh_post: Value = test::call_and_read_body_json(&app, fresh).await;
    let fresh_id: Uuid = serde_json::from_value(fresh_post["id"].clone()).unwrap();
    let req = as_user(
        test::TestRequest::post().uri(&format!("/posts/{fresh_id}/renew")),
        owner,
    )
    .set_json(json!({ "hours": 999 }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}
