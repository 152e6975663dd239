//! Activity tracker: unread counts derived from the conversation log and the
//! request ledger, relative to per-user read watermarks.

use placement_core::types::Identity;
use placement_db::store::{Party, PlacementStore};

use crate::error::{ServiceError, ServiceResult};
use crate::identity::{participant_room, require_party, resolve_party};

/// Unread totals shown to a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UnreadCounts {
    /// Rooms with messages or files from others since the user last read them.
    pub messages: i64,
    /// Requests whose state changed since the user last read them.
    pub requests: i64,
}

/// ## Summary
/// Rooms of `party` with unseen activity from anyone but `user_id`.
///
/// ## Errors
/// `Unavailable` if the store fails.
pub async fn unread_message_room_count(
    store: &dyn PlacementStore,
    party: Option<Party>,
    user_id: i32,
) -> ServiceResult<i64> {
    match party {
        Some(party) => Ok(store.unread_room_count(party, user_id).await?),
        None => Ok(0),
    }
}

/// ## Summary
/// Requests of `party` with a state change `user_id` has not seen.
///
/// Facilities count newly pending requests addressed to them; hospitals count
/// their requests that were accepted or rejected.
///
/// ## Errors
/// `Unavailable` if the store fails.
pub async fn unread_request_count(
    store: &dyn PlacementStore,
    party: Option<Party>,
    user_id: i32,
) -> ServiceResult<i64> {
    match party {
        Some(party) => Ok(store.unread_request_count(party, user_id).await?),
        None => Ok(0),
    }
}

/// ## Summary
/// Both unread counts for the caller. Admins always see zeros.
///
/// ## Errors
/// `Forbidden` for hospital or facility users without a registered record.
#[tracing::instrument(skip(store))]
pub async fn unread_counts(
    store: &dyn PlacementStore,
    identity: &Identity,
) -> ServiceResult<UnreadCounts> {
    let party = resolve_party(store, identity).await?;
    Ok(UnreadCounts {
        messages: unread_message_room_count(store, party, identity.user_id).await?,
        requests: unread_request_count(store, party, identity.user_id).await?,
    })
}

/// ## Summary
/// Moves the caller's watermark for a room to now.
///
/// ## Errors
/// `NotFound` or `Forbidden` as for reading the room.
#[tracing::instrument(skip(store))]
pub async fn mark_room_read(
    store: &dyn PlacementStore,
    identity: &Identity,
    room_id: uuid::Uuid,
) -> ServiceResult<()> {
    participant_room(store, identity, room_id).await?;
    store.mark_room_read(room_id, identity.user_id).await?;
    Ok(())
}

/// ## Summary
/// Moves the caller's watermark for a request to now.
///
/// ## Errors
/// `NotFound` or `Forbidden` as for reading the request.
#[tracing::instrument(skip(store))]
pub async fn mark_request_read(
    store: &dyn PlacementStore,
    identity: &Identity,
    request_id: i32,
) -> ServiceResult<()> {
    let request = store
        .request_by_id(request_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("request {request_id}")))?;
    let party = require_party(store, identity).await?;
    if !party.owns_request(&request) {
        tracing::warn!(request_id, "Caller does not own request");
        return Err(ServiceError::Forbidden(format!(
            "cannot read request {request_id}"
        )));
    }

    store.mark_request_read(request_id, identity.user_id).await?;
    Ok(())
}

/// ## Summary
/// Moves the caller's watermark to now on every request their party owns.
///
/// ## Returns
/// The number of requests marked.
///
/// ## Errors
/// `Forbidden` for callers without an owned entity.
#[tracing::instrument(skip(store))]
pub async fn mark_all_requests_read(
    store: &dyn PlacementStore,
    identity: &Identity,
) -> ServiceResult<usize> {
    let party = require_party(store, identity).await?;
    let marked = store
        .mark_all_requests_read(party, identity.user_id)
        .await?;
    tracing::debug!(?party, marked, "Requests marked read");
    Ok(marked)
}
