//! Conversation log: messages and file attachments inside a room.
//!
//! Messages are accepted in every state but `rejected`, so follow-up
//! correspondence can continue after completion. Files are only accepted while
//! the room is `negotiating` or `accepted`.

use placement_core::types::Identity;
use placement_core::util::file_name::{file_extension, sanitize_file_name};
use placement_db::model::message::Message;
use placement_db::model::room::MessageRoom;
use placement_db::model::room_file::{NewRoomFile, RoomFile};
use placement_db::store::PlacementStore;

use crate::error::{ServiceError, ServiceResult};
use crate::identity::participant_room;
use crate::storage::{FileStorage, StorageError};

/// Metadata for a file whose bytes are already in storage.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub file_name: String,
    pub storage_path: String,
    pub file_type: String,
    pub file_size: i64,
}

fn gate_files(room: &MessageRoom) -> ServiceResult<()> {
    if room.status.accepts_files() {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(format!(
            "room {} is {}, files can no longer be added",
            room.id, room.status
        )))
    }
}

async fn room_file(
    store: &dyn PlacementStore,
    room_id: uuid::Uuid,
    file_id: i32,
) -> ServiceResult<RoomFile> {
    store
        .room_file_by_id(file_id)
        .await?
        .filter(|file| file.room_id == room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("file {file_id} in room {room_id}")))
}

/// Storage key for an upload: `<room>/<timestamp>_<nonce>_<sanitized name>`.
///
/// The nonce keeps same-named uploads in the same microsecond apart.
#[must_use]
pub fn storage_key(room_id: uuid::Uuid, file_name: &str) -> String {
    format!(
        "{room_id}/{}_{}_{}",
        chrono::Utc::now().timestamp_micros(),
        uuid::Uuid::now_v7().simple(),
        sanitize_file_name(file_name)
    )
}

/// ## Summary
/// Appends a message from the caller to a room.
///
/// ## Errors
/// `NotFound`, `Forbidden` unless the caller participates, `Validation` for
/// blank text, `InvalidState` if the room was rejected.
#[tracing::instrument(skip(store, text))]
pub async fn post_message(
    store: &dyn PlacementStore,
    identity: &Identity,
    room_id: uuid::Uuid,
    text: &str,
) -> ServiceResult<Message> {
    let (room, _) = participant_room(store, identity, room_id).await?;

    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::Validation("message text is required".into()));
    }
    if !room.status.accepts_messages() {
        return Err(ServiceError::InvalidState(format!(
            "room {room_id} is {}, messages can no longer be posted",
            room.status
        )));
    }

    let message = store
        .insert_message(room_id, identity.user_id, text)
        .await?;
    tracing::debug!(room_id = %room_id, message_id = message.id, "Message posted");

    Ok(message)
}

/// ## Summary
/// Records a file attachment whose bytes are already stored.
///
/// ## Errors
/// `NotFound`, `Forbidden` unless the caller participates, `InvalidState`
/// once the room is `rejected` or `completed`.
#[tracing::instrument(skip(store))]
pub async fn post_file(
    store: &dyn PlacementStore,
    identity: &Identity,
    room_id: uuid::Uuid,
    metadata: &FileMetadata,
) -> ServiceResult<RoomFile> {
    let (room, _) = participant_room(store, identity, room_id).await?;
    gate_files(&room)?;

    let file = store
        .insert_room_file(NewRoomFile {
            room_id,
            sender_id: identity.user_id,
            file_name: &metadata.file_name,
            file_path: &metadata.storage_path,
            file_type: &metadata.file_type,
            file_size: metadata.file_size,
        })
        .await?;
    tracing::debug!(room_id = %room_id, file_id = file.id, "File recorded");

    Ok(file)
}

/// ## Summary
/// Stores uploaded bytes and records them as a room file.
///
/// Authorization and state are checked before anything is written. If the
/// metadata cannot be recorded the stored bytes are removed again.
///
/// ## Errors
/// As [`post_file`], plus `FileStorage` if the bytes cannot be written.
#[tracing::instrument(skip(store, files, bytes), fields(size = bytes.len()))]
pub async fn upload_file(
    store: &dyn PlacementStore,
    files: &dyn FileStorage,
    identity: &Identity,
    room_id: uuid::Uuid,
    file_name: &str,
    bytes: Vec<u8>,
) -> ServiceResult<RoomFile> {
    let (room, _) = participant_room(store, identity, room_id).await?;
    gate_files(&room)?;

    let display_name = file_name.trim();
    if display_name.is_empty() {
        return Err(ServiceError::Validation("file name is required".into()));
    }

    let file_size = i64::try_from(bytes.len())
        .map_err(|_err| ServiceError::Validation("file is too large".into()))?;
    let key = storage_key(room_id, display_name);
    let storage_path = files.store(&key, bytes).await?;

    let metadata = FileMetadata {
        file_name: display_name.to_string(),
        storage_path,
        file_type: file_extension(display_name),
        file_size,
    };

    match post_file(store, identity, room_id, &metadata).await {
        Ok(file) => Ok(file),
        Err(err) => {
            if let Err(cleanup) = files.delete(&metadata.storage_path).await {
                tracing::error!(
                    path = %metadata.storage_path,
                    error = %cleanup,
                    "Failed to remove orphaned upload"
                );
            }
            Err(err)
        }
    }
}

/// ## Summary
/// Reads a room file's metadata and bytes.
///
/// ## Errors
/// `NotFound` if the room, the file (in that room) or its bytes are missing,
/// `Forbidden` unless the caller participates.
#[tracing::instrument(skip(store, files))]
pub async fn open_file(
    store: &dyn PlacementStore,
    files: &dyn FileStorage,
    identity: &Identity,
    room_id: uuid::Uuid,
    file_id: i32,
) -> ServiceResult<(RoomFile, Vec<u8>)> {
    participant_room(store, identity, room_id).await?;
    let file = room_file(store, room_id, file_id).await?;

    match files.open(&file.file_path).await {
        Ok(bytes) => Ok((file, bytes)),
        Err(StorageError::NotFound(_)) => {
            tracing::warn!(file_id, path = %file.file_path, "File record has no stored bytes");
            Err(ServiceError::NotFound(format!("contents of file {file_id}")))
        }
        Err(err) => Err(err.into()),
    }
}

/// ## Summary
/// Deletes a file the caller uploaded, bytes first, then the record.
///
/// Bytes that are already gone are ignored; any other storage failure stops
/// the deletion with the record intact.
///
/// ## Errors
/// `NotFound` for a missing room or file, `Forbidden` unless the caller
/// participates and sent the file, `FileStorage` for storage failures.
#[tracing::instrument(skip(store, files))]
pub async fn delete_file(
    store: &dyn PlacementStore,
    files: &dyn FileStorage,
    identity: &Identity,
    room_id: uuid::Uuid,
    file_id: i32,
) -> ServiceResult<()> {
    participant_room(store, identity, room_id).await?;
    let file = room_file(store, room_id, file_id).await?;

    if file.sender_id != identity.user_id {
        tracing::warn!(file_id, user_id = identity.user_id, "Delete of another user's file");
        return Err(ServiceError::Forbidden(
            "only the sender can delete a file".into(),
        ));
    }

    match files.delete(&file.file_path).await {
        Ok(()) => {}
        Err(StorageError::NotFound(path)) => {
            tracing::debug!(file_id, %path, "Stored bytes already absent");
        }
        Err(err) => {
            tracing::error!(file_id, error = %err, "Failed to delete stored bytes");
            return Err(err.into());
        }
    }

    if !store.delete_room_file(file_id).await? {
        return Err(ServiceError::NotFound(format!("file {file_id}")));
    }
    tracing::info!(room_id = %room_id, file_id, "File deleted");

    Ok(())
}

/// ## Summary
/// Messages in a room, oldest first.
///
/// ## Errors
/// `NotFound` or `Forbidden`.
pub async fn list_messages(
    store: &dyn PlacementStore,
    identity: &Identity,
    room_id: uuid::Uuid,
) -> ServiceResult<Vec<Message>> {
    participant_room(store, identity, room_id).await?;
    Ok(store.messages_for_room(room_id).await?)
}

/// ## Summary
/// Files in a room, oldest first.
///
/// ## Errors
/// `NotFound` or `Forbidden`.
pub async fn list_files(
    store: &dyn PlacementStore,
    identity: &Identity,
    room_id: uuid::Uuid,
) -> ServiceResult<Vec<RoomFile>> {
    participant_room(store, identity, room_id).await?;
    Ok(store.room_files(room_id).await?)
}
