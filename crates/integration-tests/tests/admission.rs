//! Admission-control scenarios: capacity, idempotent joins, leave/rejoin.

use em_core::error::AppError;
use em_core::traits::ContentStore;
use em_services::rooms::NewRoom;
use integration_tests::{memory_store, room_service};
use uuid::Uuid;

fn new_room(name: &str, max_users: Option<i64>) -> NewRoom {
    NewRoom {
        name: name.to_string(),
        description: String::new(),
        duration: Some(24),
        tags: vec![],
        max_users,
    }
}

#[tokio::test]
async fn single_slot_room_rejects_a_second_user() {
    let store = memory_store().await;
    let rooms = room_service(&store);
    let creator = Uuid::now_v7();

    // the creator auto-joins and takes the only slot
    let (room, _) = rooms
        .create_room(creator, new_room("solo", Some(1)))
        .await
        .unwrap();
    assert_eq!(room.participants, vec![creator]);

    let err = rooms.join(room.id, Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));

    // the occupant itself still gets the idempotent path
    let (room, _) = rooms.join(room.id, creator).await.unwrap();
    assert_eq!(room.participants.len(), 1);
}

#[tokio::test]
async fn joining_twice_leaves_one_membership() {
    let store = memory_store().await;
    let rooms = room_service(&store);
    let creator = Uuid::now_v7();
    let guest = Uuid::now_v7();

    let (room, _) = rooms
        .create_room(creator, new_room("twice", None))
        .await
        .unwrap();

    let (after_first, first_identity) = rooms.join(room.id, guest).await.unwrap();
    let (after_second, second_identity) = rooms.join(room.id, guest).await.unwrap();
    assert_eq!(after_first.participants.len(), 2);
    assert_eq!(after_second.participants.len(), 2);

    // each join hands out a fresh display pseudonym
    assert_ne!(first_identity.anonymous_id, second_identity.anonymous_id);
    let membership = store.get_membership(room.id, guest).await.unwrap().unwrap();
    assert_eq!(membership.anonymous_id, second_identity.anonymous_id);
}

#[tokio::test]
async fn leave_is_idempotent_and_reopens_a_full_room() {
    let store = memory_store().await;
    let rooms = room_service(&store);
    let creator = Uuid::now_v7();
    let guest = Uuid::now_v7();
    let latecomer = Uuid::now_v7();

    let (room, _) = rooms
        .create_room(creator, new_room("revolving door", Some(2)))
        .await
        .unwrap();
    rooms.join(room.id, guest).await.unwrap();

    // full: a third user bounces
    assert!(matches!(
        rooms.join(room.id, latecomer).await.unwrap_err(),
        AppError::CapacityExceeded(_)
    ));

    // a member leaves, the room returns to Open
    rooms.leave(room.id, guest).await.unwrap();
    rooms.leave(room.id, guest).await.unwrap(); // second leave is a no-op
    let (room, _) = rooms.join(room.id, latecomer).await.unwrap();
    assert!(room.participants.contains(&latecomer));
    assert!(!room.participants.contains(&guest));
}

#[tokio::test]
async fn messaging_requires_membership_and_pagination_ascends() {
    let store = memory_store().await;
    let rooms = room_service(&store);
    let creator = Uuid::now_v7();
    let outsider = Uuid::now_v7();

    let (room, _) = rooms
        .create_room(creator, new_room("chatty", None))
        .await
        .unwrap();

    assert!(matches!(
        rooms.send_message(room.id, outsider, "hi", None).await.unwrap_err(),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        rooms.list_messages(room.id, outsider, 1, 10, false).await.unwrap_err(),
        AppError::Forbidden(_)
    ));

    for i in 0..5 {
        rooms
            .send_message(room.id, creator, &format!("note {i}"), None)
            .await
            .unwrap();
    }
    let page = rooms.list_messages(room.id, creator, 1, 2, false).await.unwrap();
    assert_eq!(page.total, 5);
    assert!(page.has_more);
    assert_eq!(page.items[0].content, "note 0");
    assert_eq!(page.items[1].content, "note 1");

    let last = rooms.list_messages(room.id, creator, 3, 2, false).await.unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_more);
    assert_eq!(last.items[0].content, "note 4");
}

#[tokio::test]
async fn reactions_toggle_per_member_and_emoji() {
    let store = memory_store().await;
    let rooms = room_service(&store);
    let creator = Uuid::now_v7();

    let (room, _) = rooms
        .create_room(creator, new_room("reactive", None))
        .await
        .unwrap();
    let message = rooms
        .send_message(room.id, creator, "react to me", None)
        .await
        .unwrap();

    let once = rooms
        .toggle_reaction(room.id, creator, message.id, "🔥")
        .await
        .unwrap();
    assert_eq!(once.reactions.len(), 1);

    // same member, same emoji: removed again
    let twice = rooms
        .toggle_reaction(room.id, creator, message.id, "🔥")
        .await
        .unwrap();
    assert!(twice.reactions.is_empty());
}
