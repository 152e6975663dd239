use std::sync::Arc;

use futures::future::BoxFuture;
use placement_core::types::Identity;
use placement_db::db::enums::RoomStatus;
use placement_db::memory::MemoryStore;
use placement_db::model::room::MessageRoom;
use placement_db::store::PlacementStore;
use placement_service::conversation::{self, FileMetadata};
use placement_service::error::ServiceError;
use placement_service::room;
use placement_service::storage::{FileStorage, LocalFileStorage, StorageError, StorageResult};

use crate::common::{FACILITY_USER, HOSPITAL_USER, World};

fn metadata(name: &str) -> FileMetadata {
    FileMetadata {
        file_name: name.to_string(),
        storage_path: format!("manual/{name}"),
        file_type: ".pdf".to_string(),
        file_size: 12,
    }
}

/// One room in each of the four states.
async fn rooms_in_every_state(world: &World) -> Vec<MessageRoom> {
    let store = world.store.as_ref();

    let negotiating = world.negotiating_room().await;
    let accepted = world.accepted_room().await;

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

    vec![negotiating, accepted, rejected, completed]
}

#[test_log::test(tokio::test)]
async fn messages_blocked_only_after_rejection() {
    let world = World::new();
    let store = world.store.as_ref();

    for room in rooms_in_every_state(&world).await {
        let result = conversation::post_message(store, &world.hospital(), room.id, "update").await;
        if room.status == RoomStatus::Rejected {
            assert!(matches!(result, Err(ServiceError::InvalidState(_))));
        } else {
            let message = result.unwrap();
            assert_eq!(message.sender_id, HOSPITAL_USER);
            assert_eq!(message.message_text, "update");
        }
    }
}

#[test_log::test(tokio::test)]
async fn files_blocked_after_rejection_or_completion() {
    let world = World::new();
    let store = world.store.as_ref();

    for room in rooms_in_every_state(&world).await {
        let result =
            conversation::post_file(store, &world.facility(), room.id, &metadata("plan.pdf")).await;
        match room.status {
            RoomStatus::Negotiating | RoomStatus::Accepted => {
                let file = result.unwrap();
                assert_eq!(file.sender_id, FACILITY_USER);
                assert_eq!(file.room_id, room.id);
            }
            RoomStatus::Rejected | RoomStatus::Completed => {
                assert!(matches!(result, Err(ServiceError::InvalidState(_))));
            }
        }
    }
}

#[test_log::test(tokio::test)]
async fn blank_messages_are_rejected() {
    let world = World::new();
    let room = world.negotiating_room().await;

    let result =
        conversation::post_message(world.store.as_ref(), &world.hospital(), room.id, "   ").await;

    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[test_log::test(tokio::test)]
async fn outsiders_cannot_post() {
    let world = World::new();
    let store = world.store.as_ref();
    let room = world.negotiating_room().await;

    assert!(matches!(
        conversation::post_message(store, &world.other_hospital(), room.id, "hello").await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        conversation::post_file(store, &world.other_facility(), room.id, &metadata("x.pdf")).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        conversation::post_message(store, &world.hospital(), uuid::Uuid::now_v7(), "hello").await,
        Err(ServiceError::NotFound(_))
    ));
}

#[test_log::test(tokio::test)]
async fn messages_and_files_list_oldest_first() {
    let world = World::new();
    let store = world.store.as_ref();
    let room = world.negotiating_room().await;

    for text in ["one", "two", "three"] {
        conversation::post_message(store, &world.hospital(), room.id, text)
            .await
            .unwrap();
    }
    for name in ["a.pdf", "b.pdf"] {
        conversation::post_file(store, &world.hospital(), room.id, &metadata(name))
            .await
            .unwrap();
    }

    let messages = conversation::list_messages(store, &world.facility(), room.id)
        .await
        .unwrap();
    let texts: Vec<&str> = messages.iter().map(|m| m.message_text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);

    let files = conversation::list_files(store, &world.facility(), room.id)
        .await
        .unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);
}

#[test_log::test(tokio::test)]
async fn upload_then_download() {
    let world = World::new();
    let store = world.store.as_ref();
    let dir = tempfile::tempdir().unwrap();
    let files = LocalFileStorage::new(dir.path());
    let room = world.negotiating_room().await;

    let uploaded = conversation::upload_file(
        store,
        &files,
        &world.hospital(),
        room.id,
        "Discharge Summary.PDF",
        b"%PDF-1.7 ...".to_vec(),
    )
    .await
    .unwrap();

    assert_eq!(uploaded.file_name, "Discharge Summary.PDF");
    assert_eq!(uploaded.file_type, ".pdf");
    assert_eq!(uploaded.file_size, 12);
    assert!(uploaded.file_path.starts_with(&format!("{}/", room.id)));
    assert!(uploaded.file_path.ends_with("_Discharge-Summary.PDF"));
    assert!(dir.path().join(&uploaded.file_path).exists());

    let (meta, bytes) =
        conversation::open_file(store, &files, &world.facility(), room.id, uploaded.id)
            .await
            .unwrap();
    assert_eq!(meta.id, uploaded.id);
    assert_eq!(bytes, b"%PDF-1.7 ...");
}

#[test_log::test(tokio::test)]
async fn upload_refused_before_writing_bytes() {
    let world = World::new();
    let store = world.store.as_ref();
    let dir = tempfile::tempdir().unwrap();
    let files = LocalFileStorage::new(dir.path());
    let rejected = world.negotiating_room().await;
    room::reject_room(store, &world.facility(), rejected.id)
        .await
        .unwrap();

    let result = conversation::upload_file(
        store,
        &files,
        &world.hospital(),
        rejected.id,
        "late.pdf",
        vec![1, 2, 3],
    )
    .await;

    assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    assert!(!dir.path().join(rejected.id.to_string()).exists());
}

#[test_log::test(tokio::test)]
async fn only_sender_deletes_file() {
    let world = World::new();
    let store = world.store.as_ref();
    let dir = tempfile::tempdir().unwrap();
    let files = LocalFileStorage::new(dir.path());
    let room = world.negotiating_room().await;
    let uploaded = conversation::upload_file(
        store,
        &files,
        &world.hospital(),
        room.id,
        "referral.pdf",
        b"referral".to_vec(),
    )
    .await
    .unwrap();

    let denied =
        conversation::delete_file(store, &files, &world.facility(), room.id, uploaded.id).await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));
    assert!(dir.path().join(&uploaded.file_path).exists());

    conversation::delete_file(store, &files, &world.hospital(), room.id, uploaded.id)
        .await
        .unwrap();
    assert!(!dir.path().join(&uploaded.file_path).exists());
    assert!(store.room_file_by_id(uploaded.id).await.unwrap().is_none());
}

#[test_log::test(tokio::test)]
async fn delete_tolerates_missing_bytes() {
    let world = World::new();
    let store = world.store.as_ref();
    let dir = tempfile::tempdir().unwrap();
    let files = LocalFileStorage::new(dir.path());
    let room = world.negotiating_room().await;
    let uploaded = conversation::upload_file(
        store,
        &files,
        &world.facility(),
        room.id,
        "scan.png",
        b"png".to_vec(),
    )
    .await
    .unwrap();
    files.delete(&uploaded.file_path).await.unwrap();

    conversation::delete_file(store, &files, &world.facility(), room.id, uploaded.id)
        .await
        .unwrap();

    assert!(store.room_file_by_id(uploaded.id).await.unwrap().is_none());
}

#[test_log::test(tokio::test)]
async fn files_are_addressed_through_their_room() {
    let world = World::new();
    let store = world.store.as_ref();
    let dir = tempfile::tempdir().unwrap();
    let files = LocalFileStorage::new(dir.path());
    let first = world.negotiating_room().await;
    let second = world.negotiating_room().await;
    let uploaded = conversation::upload_file(
        store,
        &files,
        &world.hospital(),
        first.id,
        "notes.txt",
        b"notes".to_vec(),
    )
    .await
    .unwrap();

    assert!(matches!(
        conversation::open_file(store, &files, &world.hospital(), second.id, uploaded.id).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        conversation::delete_file(store, &files, &world.hospital(), second.id, uploaded.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[test_log::test(tokio::test)]
async fn delete_keeps_record_when_storage_fails() {
    let world = World::new();
    let store = world.store.as_ref();
    let dir = tempfile::tempdir().unwrap();
    let files = LocalFileStorage::new(dir.path());
    let room = world.negotiating_room().await;
    let uploaded = conversation::upload_file(
        store,
        &files,
        &world.hospital(),
        room.id,
        "referral.pdf",
        b"referral".to_vec(),
    )
    .await
    .unwrap();

    // A directory where the bytes should be cannot be removed as a file.
    let stored = dir.path().join(&uploaded.file_path);
    std::fs::remove_file(&stored).unwrap();
    std::fs::create_dir(&stored).unwrap();

    let result =
        conversation::delete_file(store, &files, &world.hospital(), room.id, uploaded.id).await;

    assert!(
        matches!(result, Err(ServiceError::FileStorage(StorageError::Io(_)))),
        "{result:?}"
    );
    assert!(store.room_file_by_id(uploaded.id).await.unwrap().is_some());
}

/// Local storage whose writes complete just as the facility rejects the room.
struct RejectedMidUpload {
    inner: LocalFileStorage,
    store: Arc<MemoryStore>,
    room_id: uuid::Uuid,
}

impl FileStorage for RejectedMidUpload {
    fn store<'a>(&'a self, key: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, StorageResult<String>> {
        Box::pin(async move {
            let path = self.inner.store(key, bytes).await?;
            room::reject_room(
                self.store.as_ref(),
                &Identity::facility(FACILITY_USER),
                self.room_id,
            )
            .await
            .unwrap();
            Ok(path)
        })
    }

    fn open<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<Vec<u8>>> {
        self.inner.open(path)
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<()>> {
        self.inner.delete(path)
    }
}

#[test_log::test(tokio::test)]
async fn unrecorded_upload_removes_its_bytes() {
    let world = World::new();
    let store = world.store.as_ref();
    let dir = tempfile::tempdir().unwrap();
    let room = world.negotiating_room().await;
    let files = RejectedMidUpload {
        inner: LocalFileStorage::new(dir.path()),
        store: Arc::clone(&world.store),
        room_id: room.id,
    };

    let result = conversation::upload_file(
        store,
        &files,
        &world.hospital(),
        room.id,
        "late.pdf",
        b"too late".to_vec(),
    )
    .await;

    assert!(matches!(result, Err(ServiceError::InvalidState(_))), "{result:?}");
    assert!(store.room_files(room.id).await.unwrap().is_empty());
    let leftovers = std::fs::read_dir(dir.path().join(room.id.to_string()))
        .unwrap()
        .count();
    assert_eq!(leftovers, 0);
}
