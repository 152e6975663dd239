use placement_core::types::Identity;
use placement_db::db::enums::{RequestStatus, RoomStatus};
use placement_db::store::PlacementStore;
use placement_service::error::ServiceError;
use placement_service::{conversation, ledger, room};

use crate::common::World;

#[test_log::test(tokio::test)]
async fn rejected_room_refuses_messages() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;
    assert_eq!(request.status, RequestStatus::Pending);

    let outcome = ledger::accept_request(store, &world.facility(), request.id)
        .await
        .unwrap();
    assert_eq!(outcome.room.status, RoomStatus::Negotiating);

    let rejected = room::reject_room(store, &world.facility(), outcome.room.id)
        .await
        .unwrap();
    assert_eq!(rejected.status, RoomStatus::Rejected);

    let posted = conversation::post_message(store, &world.hospital(), rejected.id, "hi").await;
    assert!(matches!(posted, Err(ServiceError::InvalidState(_))));
}

#[test_log::test(tokio::test)]
async fn second_completion_closes_room() {
    let world = World::new();
    let store = world.store.as_ref();
    let negotiating = world.negotiating_room().await;

    let accepted = room::accept_room(store, &world.facility(), negotiating.id)
        .await
        .unwrap();
    assert_eq!(accepted.status, RoomStatus::Accepted);

    let half = room::mark_complete(store, &world.hospital(), accepted.id)
        .await
        .unwrap();
    assert!(half.hospital_completed);
    assert!(!half.facility_completed);
    assert_eq!(half.status, RoomStatus::Accepted);

    let done = room::mark_complete(store, &world.facility(), accepted.id)
        .await
        .unwrap();
    assert!(done.facility_completed);
    assert_eq!(done.status, RoomStatus::Completed);
}

#[test_log::test(tokio::test)]
async fn completion_can_be_withdrawn_while_accepted() {
    let world = World::new();
    let store = world.store.as_ref();
    let accepted = world.accepted_room().await;
    room::mark_complete(store, &world.hospital(), accepted.id)
        .await
        .unwrap();

    let withdrawn = room::cancel_completion(store, &world.hospital(), accepted.id)
        .await
        .unwrap();

    assert!(!withdrawn.hospital_completed);
    assert_eq!(withdrawn.status, RoomStatus::Accepted);
}

#[test_log::test(tokio::test)]
async fn completion_order_does_not_matter() {
    let world = World::new();
    let store = world.store.as_ref();

    for (first, second) in [
        (world.hospital(), world.facility()),
        (world.facility(), world.hospital()),
    ] {
        let accepted = world.accepted_room().await;

        let half = room::mark_complete(store, &first, accepted.id).await.unwrap();
        assert_eq!(half.status, RoomStatus::Accepted);

        // Repeating the same side never closes the room on its own.
        let repeated = room::mark_complete(store, &first, accepted.id).await.unwrap();
        assert_eq!(repeated.status, RoomStatus::Accepted);

        let done = room::mark_complete(store, &second, accepted.id).await.unwrap();
        assert_eq!(done.status, RoomStatus::Completed);
        assert!(done.hospital_completed && done.facility_completed);
    }
}

#[test_log::test(tokio::test)]
async fn withdrawn_flag_prevents_completion() {
    let world = World::new();
    let store = world.store.as_ref();
    let accepted = world.accepted_room().await;

    room::mark_complete(store, &world.hospital(), accepted.id)
        .await
        .unwrap();
    room::cancel_completion(store, &world.hospital(), accepted.id)
        .await
        .unwrap();
    let after = room::mark_complete(store, &world.facility(), accepted.id)
        .await
        .unwrap();

    assert_eq!(after.status, RoomStatus::Accepted);
    assert!(after.facility_completed && !after.hospital_completed);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn concurrent_completions_close_room() {
    let world = World::new();
    let room_id = world.accepted_room().await.id;

    let hospital = {
        let store = world.store.clone();
        let identity = world.hospital();
        tokio::spawn(async move { room::mark_complete(store.as_ref(), &identity, room_id).await })
    };
    let facility = {
        let store = world.store.clone();
        let identity = world.facility();
        tokio::spawn(async move { room::mark_complete(store.as_ref(), &identity, room_id).await })
    };
    hospital.await.unwrap().unwrap();
    facility.await.unwrap().unwrap();

    let stored = world.store.room_by_id(room_id).await.unwrap().unwrap();
    assert_eq!(stored.status, RoomStatus::Completed);
}

#[test_log::test(tokio::test)]
async fn completion_needs_accepted_room() {
    let world = World::new();
    let store = world.store.as_ref();
    let negotiating = world.negotiating_room().await;

    assert!(matches!(
        room::mark_complete(store, &world.hospital(), negotiating.id).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert!(matches!(
        room::cancel_completion(store, &world.hospital(), negotiating.id).await,
        Err(ServiceError::InvalidState(_))
    ));
}

#[test_log::test(tokio::test)]
async fn terminal_rooms_are_immutable() {
    let world = World::new();
    let store = world.store.as_ref();

    let rejected = world.negotiating_room().await;
    let rejected = room::reject_room(store, &world.facility(), rejected.id)
        .await
        .unwrap();

    let completed = world.accepted_room().await;
    room::mark_complete(store, &world.hospital(), completed.id)
        .await
        .unwrap();
    let completed = room::mark_complete(store, &world.facility(), completed.id)
        .await
        .unwrap();

    for frozen in [rejected, completed] {
        let results = [
            room::accept_room(store, &world.facility(), frozen.id).await,
            room::reject_room(store, &world.facility(), frozen.id).await,
            room::mark_complete(store, &world.hospital(), frozen.id).await,
            room::mark_complete(store, &world.facility(), frozen.id).await,
            room::cancel_completion(store, &world.hospital(), frozen.id).await,
            room::cancel_completion(store, &world.facility(), frozen.id).await,
        ];
        for result in results {
            assert!(matches!(result, Err(ServiceError::InvalidState(_))));
        }

        let stored = store.room_by_id(frozen.id).await.unwrap().unwrap();
        assert_eq!(stored.status, frozen.status);
        assert_eq!(stored.hospital_completed, frozen.hospital_completed);
        assert_eq!(stored.facility_completed, frozen.facility_completed);
    }
}

#[test_log::test(tokio::test)]
async fn room_transitions_are_facility_only() {
    let world = World::new();
    let store = world.store.as_ref();
    let negotiating = world.negotiating_room().await;

    assert!(matches!(
        room::accept_room(store, &world.hospital(), negotiating.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        room::reject_room(store, &world.hospital(), negotiating.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        room::accept_room(store, &world.other_facility(), negotiating.id).await,
        Err(ServiceError::Forbidden(_))
    ));
}

#[test_log::test(tokio::test)]
async fn reaccepting_room_is_noop() {
    let world = World::new();
    let store = world.store.as_ref();
    let accepted = world.accepted_room().await;

    let again = room::accept_room(store, &world.facility(), accepted.id)
        .await
        .unwrap();

    assert_eq!(again.status, RoomStatus::Accepted);
    assert_eq!(again.id, accepted.id);
}

#[test_log::test(tokio::test)]
async fn rooms_visible_to_participants_only() {
    let world = World::new();
    let store = world.store.as_ref();
    let negotiating = world.negotiating_room().await;

    assert!(room::get_room(store, &world.hospital(), negotiating.id).await.is_ok());
    assert!(room::get_room(store, &world.facility(), negotiating.id).await.is_ok());
    for identity in [world.other_hospital(), world.other_facility(), Identity::admin(1)] {
        assert!(matches!(
            room::get_room(store, &identity, negotiating.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
    assert!(matches!(
        room::get_room(store, &world.hospital(), uuid::Uuid::now_v7()).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[test_log::test(tokio::test)]
async fn room_list_shows_previews_and_unread() {
    let world = World::new();
    let store = world.store.as_ref();
    let quiet = world.negotiating_room().await;
    let busy = world.negotiating_room().await;

    conversation::post_message(store, &world.facility(), busy.id, "We have a bed on Monday")
        .await
        .unwrap();

    let hospital_view = room::list_rooms(store, &world.hospital()).await.unwrap();
    assert_eq!(hospital_view.len(), 2);
    assert_eq!(hospital_view[0].room.id, busy.id);
    assert_eq!(
        hospital_view[0].last_message.as_deref(),
        Some("We have a bed on Monday")
    );
    assert!(hospital_view[0].has_unread);
    assert_eq!(hospital_view[1].room.id, quiet.id);
    assert!(hospital_view[1].last_message.is_none());
    assert!(!hospital_view[1].has_unread);
    assert_eq!(hospital_view[0].hospital_name, "St. Mary's");
    assert_eq!(hospital_view[0].patient.condition, "dementia");

    // The sender never sees their own message as unread.
    let facility_view = room::list_rooms(store, &world.facility()).await.unwrap();
    assert!(facility_view.iter().all(|summary| !summary.has_unread));

    assert!(
        room::list_rooms(store, &world.other_hospital())
            .await
            .unwrap()
            .is_empty()
    );
}

#[test_log::test(tokio::test)]
async fn room_detail_includes_conversation() {
    let world = World::new();
    let store = world.store.as_ref();
    let negotiating = world.negotiating_room().await;
    conversation::post_message(store, &world.hospital(), negotiating.id, "first")
        .await
        .unwrap();
    conversation::post_message(store, &world.facility(), negotiating.id, "second")
        .await
        .unwrap();

    let detail = room::room_detail(store, &world.facility(), negotiating.id)
        .await
        .unwrap();

    let texts: Vec<&str> = detail
        .messages
        .iter()
        .map(|m| m.message_text.as_str())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert!(detail.files.is_empty());
}
