//! Resolution of a caller's identity to the hospital or facility they act for.

use placement_core::types::{Identity, Role};
use placement_db::db::enums::CompletionSide;
use placement_db::model::room::MessageRoom;
use placement_db::store::{Party, PlacementStore};

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Looks up the entity the caller owns.
///
/// ## Returns
/// `None` for admins, who own nothing.
///
/// ## Errors
/// `Forbidden` if a hospital or facility user has no registered record;
/// `Unavailable` if the store fails.
#[tracing::instrument(skip(store))]
pub async fn resolve_party(
    store: &dyn PlacementStore,
    identity: &Identity,
) -> ServiceResult<Option<Party>> {
    match identity.role {
        Role::Admin => Ok(None),
        Role::Hospital => match store.hospital_by_user(identity.user_id).await? {
            Some(hospital) => Ok(Some(Party::Hospital(hospital.id))),
            None => {
                tracing::warn!(user_id = identity.user_id, "No hospital registered for user");
                Err(ServiceError::Forbidden("no hospital registered for user".into()))
            }
        },
        Role::Facility => match store.facility_by_user(identity.user_id).await? {
            Some(facility) => Ok(Some(Party::Facility(facility.id))),
            None => {
                tracing::warn!(user_id = identity.user_id, "No facility registered for user");
                Err(ServiceError::Forbidden("no facility registered for user".into()))
            }
        },
    }
}

/// ## Summary
/// Like [`resolve_party`], for operations that need an owned entity.
///
/// ## Errors
/// `Forbidden` for admins and for users with no registered record.
pub async fn require_party(store: &dyn PlacementStore, identity: &Identity) -> ServiceResult<Party> {
    resolve_party(store, identity)
        .await?
        .ok_or_else(|| ServiceError::Forbidden("operation requires a hospital or facility".into()))
}

/// ## Summary
/// The side of the room the caller's party occupies.
///
/// ## Errors
/// `Forbidden` if the party is not one of the room's two participants.
pub fn room_side(party: Party, room: &MessageRoom) -> ServiceResult<CompletionSide> {
    party.side_in(room).ok_or_else(|| {
        tracing::warn!(?party, room_id = %room.id, "Caller is not a participant of room");
        ServiceError::Forbidden("not a participant of this room".into())
    })
}

/// ## Summary
/// Loads a room and checks that the caller participates in it.
///
/// ## Errors
/// `NotFound` if the room does not exist, then `Forbidden` if the caller is
/// not a participant.
pub async fn participant_room(
    store: &dyn PlacementStore,
    identity: &Identity,
    room_id: uuid::Uuid,
) -> ServiceResult<(MessageRoom, CompletionSide)> {
    let room = store
        .room_by_id(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room {room_id}")))?;
    let party = require_party(store, identity).await?;
    let side = room_side(party, &room)?;
    Ok((room, side))
}
