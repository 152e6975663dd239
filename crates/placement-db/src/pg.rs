//! `PostgreSQL` implementation of [`PlacementStore`].

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;

use crate::db::DbProvider;
use crate::db::connection::DbPool;
use crate::db::enums::{CompletionSide, RequestStatus, RoomStatus};
use crate::db::query::{activity, message, party, request, room, room_file};
use crate::db::transaction::with_transaction;
use crate::model::message::{Message, NewMessage};
use crate::model::party::{Facility, Hospital};
use crate::model::request::{NewPlacementRequest, PatientFields, PlacementRequest};
use crate::model::room::{MessageRoom, NewMessageRoom};
use crate::model::room_file::{NewRoomFile, RoomFile};
use crate::store::{Party, PlacementStore, RoomSummary, StoreFuture};

/// Store backed by a bb8 pool of async `PostgreSQL` connections.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PlacementStore for PgStore {
    fn hospital_by_user(&self, user_id: i32) -> StoreFuture<'_, Option<Hospital>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let hospital = party::hospital_by_user(user_id)
                .select(Hospital::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(hospital)
        })
    }

    fn facility_by_user(&self, user_id: i32) -> StoreFuture<'_, Option<Facility>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let facility = party::facility_by_user(user_id)
                .select(Facility::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(facility)
        })
    }

    fn facility_by_id(&self, facility_id: i32) -> StoreFuture<'_, Option<Facility>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let facility = party::facility_by_id(facility_id)
                .select(Facility::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(facility)
        })
    }

    fn insert_request<'a>(
        &'a self,
        hospital_id: i32,
        facility_id: i32,
        patient: &'a PatientFields,
    ) -> StoreFuture<'a, PlacementRequest> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let new_request = NewPlacementRequest::pending(hospital_id, facility_id, patient);
            Ok(request::insert_request(&mut conn, &new_request).await?)
        })
    }

    fn request_by_id(&self, id: i32) -> StoreFuture<'_, Option<PlacementRequest>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let found = request::by_id(id)
                .select(PlacementRequest::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(found)
        })
    }

    fn requests_for(&self, party: Party) -> StoreFuture<'_, Vec<PlacementRequest>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let query = match party {
                Party::Hospital(id) => request::for_hospital(id),
                Party::Facility(id) => request::for_facility(id),
            };
            let requests = query
                .select(PlacementRequest::as_select())
                .load(&mut conn)
                .await?;
            Ok(requests)
        })
    }

    fn update_pending_request<'a>(
        &'a self,
        id: i32,
        patient: &'a PatientFields,
    ) -> StoreFuture<'a, Option<PlacementRequest>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(request::update_pending_patient(&mut conn, id, patient).await?)
        })
    }

    fn delete_pending_request(&self, id: i32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(request::delete_pending(&mut conn, id).await?)
        })
    }

    fn reject_pending_request(&self, id: i32) -> StoreFuture<'_, Option<PlacementRequest>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(request::settle_pending(&mut conn, id, RequestStatus::Rejected).await?)
        })
    }

    fn promote_request(
        &self,
        id: i32,
    ) -> StoreFuture<'_, Option<(PlacementRequest, MessageRoom)>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            with_transaction(&mut conn, move |tx| {
                async move {
                    // The conditional update row-locks the request, so a
                    // concurrent promotion waits here and then sees `accepted`.
                    let Some(accepted) =
                        request::settle_pending(tx, id, RequestStatus::Accepted).await?
                    else {
                        return Ok(None);
                    };

                    let new_room = NewMessageRoom::for_request(
                        accepted.id,
                        accepted.hospital_id,
                        accepted.facility_id,
                    );
                    let opened = room::insert_room(tx, &new_room).await?;

                    tracing::debug!(request_id = id, room_id = %opened.id, "Request promoted");
                    Ok(Some((accepted, opened)))
                }
                .scope_boxed()
            })
            .await
        })
    }

    fn room_by_id(&self, id: uuid::Uuid) -> StoreFuture<'_, Option<MessageRoom>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let found = room::by_id(id)
                .select(MessageRoom::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(found)
        })
    }

    fn room_by_request(&self, request_id: i32) -> StoreFuture<'_, Option<MessageRoom>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let found = room::by_request(request_id)
                .select(MessageRoom::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(found)
        })
    }

    fn transition_room(
        &self,
        id: uuid::Uuid,
        from: RoomStatus,
        to: RoomStatus,
    ) -> StoreFuture<'_, Option<MessageRoom>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(room::transition(&mut conn, id, from, to).await?)
        })
    }

    fn set_completion(
        &self,
        id: uuid::Uuid,
        side: CompletionSide,
        completed: bool,
    ) -> StoreFuture<'_, Option<MessageRoom>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            with_transaction(&mut conn, move |tx| {
                async move {
                    let Some(flagged) = room::set_completion_flag(tx, id, side, completed).await?
                    else {
                        return Ok(None);
                    };

                    if completed && flagged.both_completed() {
                        if let Some(closed) = room::complete_if_both(tx, id).await? {
                            return Ok(Some(closed));
                        }
                    }

                    Ok(Some(flagged))
                }
                .scope_boxed()
            })
            .await
        })
    }

    fn room_summaries(&self, party: Party, viewer_id: i32) -> StoreFuture<'_, Vec<RoomSummary>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let rows = activity::room_summaries(&mut conn, party, viewer_id).await?;
            Ok(rows.into_iter().map(RoomSummary::from).collect())
        })
    }

    fn insert_message<'a>(
        &'a self,
        room_id: uuid::Uuid,
        sender_id: i32,
        text: &'a str,
    ) -> StoreFuture<'a, Message> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let new_message = NewMessage {
                room_id,
                sender_id,
                message_text: text,
            };
            Ok(message::insert_message(&mut conn, &new_message).await?)
        })
    }

    fn messages_for_room(&self, room_id: uuid::Uuid) -> StoreFuture<'_, Vec<Message>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let messages = message::for_room(room_id)
                .select(Message::as_select())
                .load(&mut conn)
                .await?;
            Ok(messages)
        })
    }

    fn insert_room_file<'a>(&'a self, file: NewRoomFile<'a>) -> StoreFuture<'a, RoomFile> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(room_file::insert_room_file(&mut conn, &file).await?)
        })
    }

    fn room_files(&self, room_id: uuid::Uuid) -> StoreFuture<'_, Vec<RoomFile>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let files = room_file::for_room(room_id)
                .select(RoomFile::as_select())
                .load(&mut conn)
                .await?;
            Ok(files)
        })
    }

    fn room_file_by_id(&self, id: i32) -> StoreFuture<'_, Option<RoomFile>> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            let file = room_file::by_id(id)
                .select(RoomFile::as_select())
                .first(&mut conn)
                .await
                .optional()?;
            Ok(file)
        })
    }

    fn delete_room_file(&self, id: i32) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(room_file::delete_room_file(&mut conn, id).await?)
        })
    }

    fn unread_room_count(&self, party: Party, user_id: i32) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(activity::unread_room_count(&mut conn, party, user_id).await?)
        })
    }

    fn unread_request_count(&self, party: Party, user_id: i32) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(activity::unread_request_count(&mut conn, party, user_id).await?)
        })
    }

    fn mark_room_read(&self, room_id: uuid::Uuid, user_id: i32) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(activity::mark_room_read(&mut conn, room_id, user_id).await?)
        })
    }

    fn mark_request_read(&self, request_id: i32, user_id: i32) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(activity::mark_request_read(&mut conn, request_id, user_id).await?)
        })
    }

    fn mark_all_requests_read(&self, party: Party, user_id: i32) -> StoreFuture<'_, usize> {
        Box::pin(async move {
            let mut conn = self.pool.get_connection().await?;
            Ok(activity::mark_all_requests_read(&mut conn, party, user_id).await?)
        })
    }
}
