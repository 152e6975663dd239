//! Negotiation room: `negotiating -> accepted | rejected`, then the dual
//! completion protocol that closes an accepted room.

use placement_core::types::Identity;
use placement_db::db::enums::{CompletionSide, RoomStatus};
use placement_db::model::message::Message;
use placement_db::model::room::MessageRoom;
use placement_db::model::room_file::RoomFile;
use placement_db::store::{Party, PlacementStore, RoomSummary};

use crate::error::{ServiceError, ServiceResult};
use crate::identity::{participant_room, require_party};

/// A room together with its conversation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomDetail {
    pub room: MessageRoom,
    pub messages: Vec<Message>,
    pub files: Vec<RoomFile>,
}

fn terminal(room: &MessageRoom) -> ServiceError {
    ServiceError::InvalidState(format!("room {} is {}", room.id, room.status))
}

fn facility_only(room: &MessageRoom, side: CompletionSide, action: &str) -> ServiceResult<()> {
    if side == CompletionSide::Facility {
        Ok(())
    } else {
        tracing::warn!(room_id = %room.id, action, "Hospital attempted facility-only transition");
        Err(ServiceError::Forbidden(format!(
            "only the facility can {action} a room"
        )))
    }
}

/// Re-reads a room after a conditional write matched nothing and decides why.
async fn settle_lost_race(
    store: &dyn PlacementStore,
    id: uuid::Uuid,
    reached: impl Fn(&MessageRoom) -> bool,
) -> ServiceResult<MessageRoom> {
    let current = store
        .room_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room {id}")))?;

    if reached(&current) {
        tracing::debug!(room_id = %id, status = %current.status, "Room already in target state");
        Ok(current)
    } else if current.status.is_terminal() {
        Err(terminal(&current))
    } else {
        Err(ServiceError::Conflict(format!(
            "room {id} changed concurrently, now {}",
            current.status
        )))
    }
}

/// ## Summary
/// Returns a room the caller participates in.
///
/// ## Errors
/// `NotFound` or `Forbidden`.
#[tracing::instrument(skip(store))]
pub async fn get_room(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: uuid::Uuid,
) -> ServiceResult<MessageRoom> {
    let (room, _) = participant_room(store, identity, id).await?;
    Ok(room)
}

/// ## Summary
/// Returns a room with its messages and files, both oldest first.
///
/// ## Errors
/// `NotFound` or `Forbidden`.
#[tracing::instrument(skip(store))]
pub async fn room_detail(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: uuid::Uuid,
) -> ServiceResult<RoomDetail> {
    let (room, _) = participant_room(store, identity, id).await?;
    let messages = store.messages_for_room(id).await?;
    let files = store.room_files(id).await?;
    Ok(RoomDetail {
        room,
        messages,
        files,
    })
}

/// ## Summary
/// Facility accepts the placement negotiated in the room.
///
/// Accepting an already accepted room is a no-op success.
///
/// ## Errors
/// `NotFound`, `Forbidden` for the hospital side, `InvalidState` from
/// `rejected` or `completed`, `Conflict` if a concurrent change lost the race.
#[tracing::instrument(skip(store))]
pub async fn accept_room(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: uuid::Uuid,
) -> ServiceResult<MessageRoom> {
    let (room, side) = participant_room(store, identity, id).await?;
    facility_only(&room, side, "accept")?;

    match room.status {
        RoomStatus::Accepted => {
            tracing::debug!(room_id = %id, "Room already accepted");
            Ok(room)
        }
        RoomStatus::Rejected | RoomStatus::Completed => Err(terminal(&room)),
        RoomStatus::Negotiating => {
            match store
                .transition_room(id, RoomStatus::Negotiating, RoomStatus::Accepted)
                .await?
            {
                Some(accepted) => {
                    tracing::info!(room_id = %id, "Room accepted");
                    Ok(accepted)
                }
                None => settle_lost_race(store, id, |r| r.status == RoomStatus::Accepted).await,
            }
        }
    }
}

/// ## Summary
/// Facility rejects the placement while it is still being negotiated.
///
/// ## Errors
/// `NotFound`, `Forbidden` for the hospital side, `InvalidState` unless the
/// room is `negotiating`, `Conflict` if a concurrent change lost the race.
#[tracing::instrument(skip(store))]
pub async fn reject_room(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: uuid::Uuid,
) -> ServiceResult<MessageRoom> {
    let (room, side) = participant_room(store, identity, id).await?;
    facility_only(&room, side, "reject")?;

    if room.status != RoomStatus::Negotiating {
        return Err(terminal(&room));
    }

    match store
        .transition_room(id, RoomStatus::Negotiating, RoomStatus::Rejected)
        .await?
    {
        Some(rejected) => {
            tracing::info!(room_id = %id, "Room rejected");
            Ok(rejected)
        }
        None => settle_lost_race(store, id, |r| r.status == RoomStatus::Rejected).await,
    }
}

/// ## Summary
/// Marks the caller's side of an accepted room complete.
///
/// The room becomes `completed` in the same store operation that sets the
/// second flag.
///
/// ## Errors
/// `NotFound`, `Forbidden`, `InvalidState` unless the room is `accepted`.
#[tracing::instrument(skip(store))]
pub async fn mark_complete(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: uuid::Uuid,
) -> ServiceResult<MessageRoom> {
    let (room, side) = participant_room(store, identity, id).await?;
    if room.status != RoomStatus::Accepted {
        return Err(terminal(&room));
    }

    match store.set_completion(id, side, true).await? {
        Some(updated) => {
            if updated.status == RoomStatus::Completed {
                tracing::info!(room_id = %id, %side, "Both sides complete, room closed");
            } else {
                tracing::info!(room_id = %id, %side, "Side marked complete");
            }
            Ok(updated)
        }
        None => {
            settle_lost_race(store, id, |r| {
                r.status == RoomStatus::Completed && r.completed_by(side)
            })
            .await
        }
    }
}

/// ## Summary
/// Clears the caller's completion flag while the room is still `accepted`.
///
/// ## Errors
/// `NotFound`, `Forbidden`, `InvalidState` unless the room is `accepted`.
#[tracing::instrument(skip(store))]
pub async fn cancel_completion(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: uuid::Uuid,
) -> ServiceResult<MessageRoom> {
    let (room, side) = participant_room(store, identity, id).await?;
    if room.status != RoomStatus::Accepted {
        return Err(terminal(&room));
    }

    match store.set_completion(id, side, false).await? {
        Some(updated) => {
            tracing::info!(room_id = %id, %side, "Completion withdrawn");
            Ok(updated)
        }
        None => settle_lost_race(store, id, |_| false).await,
    }
}

/// ## Summary
/// Rooms of a hospital as seen by `viewer_id`, most recent activity first.
///
/// ## Errors
/// `Unavailable` if the store fails.
pub async fn list_for_hospital(
    store: &dyn PlacementStore,
    hospital_id: i32,
    viewer_id: i32,
) -> ServiceResult<Vec<RoomSummary>> {
    Ok(store
        .room_summaries(Party::Hospital(hospital_id), viewer_id)
        .await?)
}

/// ## Summary
/// Rooms of a facility as seen by `viewer_id`, most recent activity first.
///
/// ## Errors
/// `Unavailable` if the store fails.
pub async fn list_for_facility(
    store: &dyn PlacementStore,
    facility_id: i32,
    viewer_id: i32,
) -> ServiceResult<Vec<RoomSummary>> {
    Ok(store
        .room_summaries(Party::Facility(facility_id), viewer_id)
        .await?)
}

/// ## Summary
/// Lists the caller's rooms.
///
/// ## Errors
/// `Forbidden` for callers without an owned entity.
#[tracing::instrument(skip(store))]
pub async fn list_rooms(
    store: &dyn PlacementStore,
    identity: &Identity,
) -> ServiceResult<Vec<RoomSummary>> {
    match require_party(store, identity).await? {
        Party::Hospital(id) => list_for_hospital(store, id, identity.user_id).await,
        Party::Facility(id) => list_for_facility(store, id, identity.user_id).await,
    }
}
