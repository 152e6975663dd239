//! In-process implementation of [`PlacementStore`].
//!
//! All tables sit behind one mutex and every trait method runs as a single
//! critical section, which gives the same atomicity the `PostgreSQL` store gets
//! from conditional updates and transactions. Timestamps come from a clock that
//! never repeats a value, so watermark comparisons are total.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::db::enums::{CompletionSide, RequestStatus, RoomStatus};
use crate::error::{DbError, DbResult};
use crate::model::message::Message;
use crate::model::party::{Facility, Hospital};
use crate::model::request::{PatientFields, PlacementRequest};
use crate::model::room::{MessageRoom, NewMessageRoom};
use crate::model::room_file::{NewRoomFile, RoomFile};
use crate::store::{Party, PlacementStore, RoomSummary, StoreFuture};

#[derive(Debug, Default)]
struct Tables {
    hospitals: Vec<Hospital>,
    facilities: Vec<Facility>,
    requests: BTreeMap<i32, PlacementRequest>,
    rooms: HashMap<uuid::Uuid, MessageRoom>,
    messages: Vec<Message>,
    files: BTreeMap<i32, RoomFile>,
    room_reads: HashMap<(uuid::Uuid, i32), DateTime<Utc>>,
    request_reads: HashMap<(i32, i32), DateTime<Utc>>,
    last_party_id: i32,
    last_request_id: i32,
    last_message_id: i32,
    last_file_id: i32,
    clock: Option<DateTime<Utc>>,
}

impl Tables {
    /// Current time, bumped by a microsecond when it would not advance.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn room_has_unread(&self, room_id: uuid::Uuid, user_id: i32) -> bool {
        let watermark = self.room_reads.get(&(room_id, user_id)).copied();
        let unseen = |sender_id: i32, at: DateTime<Utc>| {
            sender_id != user_id && watermark.is_none_or(|read_at| at > read_at)
        };

        self.messages
            .iter()
            .any(|m| m.room_id == room_id && unseen(m.sender_id, m.created_at))
            || self
                .files
                .values()
                .any(|f| f.room_id == room_id && unseen(f.sender_id, f.created_at))
    }

    fn summarize(&self, room: &MessageRoom, viewer_id: i32) -> Option<RoomSummary> {
        let request = self.requests.get(&room.request_id)?;
        let hospital = self.hospitals.iter().find(|h| h.id == room.hospital_id)?;
        let facility = self.facilities.iter().find(|f| f.id == room.facility_id)?;
        let latest = self
            .messages
            .iter()
            .filter(|m| m.room_id == room.id)
            .max_by_key(|m| (m.created_at, m.id));

        Some(RoomSummary {
            room: room.clone(),
            hospital_name: hospital.name.clone(),
            facility_name: facility.name.clone(),
            patient: request.patient(),
            last_message: latest.map(|m| m.message_text.clone()),
            last_message_at: latest.map(|m| m.created_at),
            has_unread: self.room_has_unread(room.id, viewer_id),
        })
    }
}

fn missing_parent(what: &str) -> DbError {
    DbError::DatabaseError(DieselError::DatabaseError(
        DatabaseErrorKind::ForeignKeyViolation,
        Box::new(format!("{what} does not exist")),
    ))
}

fn ready<'a, T: Send + 'a>(result: DbResult<T>) -> StoreFuture<'a, T> {
    Box::pin(futures::future::ready(result))
}

/// Store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tables and recovers from poisoning.
    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                self.tables.clear_poison();
                poisoned.into_inner()
            }
        }
    }

    /// Registers a hospital account owned by `user_id`.
    #[must_use]
    pub fn add_hospital(&self, user_id: i32, name: &str) -> Hospital {
        let mut tables = self.lock();
        tables.last_party_id += 1;
        let now = tables.tick();
        let hospital = Hospital {
            id: tables.last_party_id,
            user_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.hospitals.push(hospital.clone());
        hospital
    }

    /// Registers a facility account owned by `user_id`.
    #[must_use]
    pub fn add_facility(&self, user_id: i32, name: &str) -> Facility {
        let mut tables = self.lock();
        tables.last_party_id += 1;
        let now = tables.tick();
        let facility = Facility {
            id: tables.last_party_id,
            user_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.facilities.push(facility.clone());
        facility
    }
}

impl PlacementStore for MemoryStore {
    fn hospital_by_user(&self, user_id: i32) -> StoreFuture<'_, Option<Hospital>> {
        let tables = self.lock();
        let found = tables.hospitals.iter().find(|h| h.user_id == user_id).cloned();
        ready(Ok(found))
    }

    fn facility_by_user(&self, user_id: i32) -> StoreFuture<'_, Option<Facility>> {
        let tables = self.lock();
        let found = tables
            .facilities
            .iter()
            .find(|f| f.user_id == user_id)
            .cloned();
        ready(Ok(found))
    }

    fn facility_by_id(&self, facility_id: i32) -> StoreFuture<'_, Option<Facility>> {
        let tables = self.lock();
        let found = tables.facilities.iter().find(|f| f.id == facility_id).cloned();
        ready(Ok(found))
    }

    fn insert_request<'a>(
        &'a self,
        hospital_id: i32,
        facility_id: i32,
        patient: &'a PatientFields,
    ) -> StoreFuture<'a, PlacementRequest> {
        let mut tables = self.lock();
        if !tables.hospitals.iter().any(|h| h.id == hospital_id) {
            return ready(Err(missing_parent("hospital")));
        }
        if !tables.facilities.iter().any(|f| f.id == facility_id) {
            return ready(Err(missing_parent("facility")));
        }

        tables.last_request_id += 1;
        let now = tables.tick();
        let request = PlacementRequest {
            id: tables.last_request_id,
            hospital_id,
            facility_id,
            patient_age: patient.age,
            patient_gender: patient.gender.clone(),
            medical_condition: patient.condition.clone(),
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.requests.insert(request.id, request.clone());
        ready(Ok(request))
    }

    fn request_by_id(&self, id: i32) -> StoreFuture<'_, Option<PlacementRequest>> {
        let tables = self.lock();
        ready(Ok(tables.requests.get(&id).cloned()))
    }

    fn requests_for(&self, party: Party) -> StoreFuture<'_, Vec<PlacementRequest>> {
        let tables = self.lock();
        let mut requests: Vec<PlacementRequest> = tables
            .requests
            .values()
            .filter(|r| party.owns_request(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        ready(Ok(requests))
    }

    fn update_pending_request<'a>(
        &'a self,
        id: i32,
        patient: &'a PatientFields,
    ) -> StoreFuture<'a, Option<PlacementRequest>> {
        let mut tables = self.lock();
        let now = tables.tick();
        let updated = tables
            .requests
            .get_mut(&id)
            .filter(|r| r.status == RequestStatus::Pending)
            .map(|r| {
                r.patient_age = patient.age;
                r.patient_gender.clone_from(&patient.gender);
                r.medical_condition.clone_from(&patient.condition);
                r.updated_at = now;
                r.clone()
            });
        ready(Ok(updated))
    }

    fn delete_pending_request(&self, id: i32) -> StoreFuture<'_, bool> {
        let mut tables = self.lock();
        let pending = tables
            .requests
            .get(&id)
            .is_some_and(|r| r.status == RequestStatus::Pending);
        if pending {
            tables.requests.remove(&id);
            tables.request_reads.retain(|(request_id, _), _| *request_id != id);
        }
        ready(Ok(pending))
    }

    fn reject_pending_request(&self, id: i32) -> StoreFuture<'_, Option<PlacementRequest>> {
        let mut tables = self.lock();
        let now = tables.tick();
        let rejected = tables
            .requests
            .get_mut(&id)
            .filter(|r| r.status == RequestStatus::Pending)
            .map(|r| {
                r.status = RequestStatus::Rejected;
                r.updated_at = now;
                r.clone()
            });
        ready(Ok(rejected))
    }

    fn promote_request(
        &self,
        id: i32,
    ) -> StoreFuture<'_, Option<(PlacementRequest, MessageRoom)>> {
        let mut tables = self.lock();
        let now = tables.tick();
        let Some(request) = tables
            .requests
            .get_mut(&id)
            .filter(|r| r.status == RequestStatus::Pending)
        else {
            return ready(Ok(None));
        };

        request.status = RequestStatus::Accepted;
        request.updated_at = now;
        let accepted = request.clone();

        let new_room =
            NewMessageRoom::for_request(accepted.id, accepted.hospital_id, accepted.facility_id);
        let room = MessageRoom {
            id: new_room.id,
            request_id: new_room.request_id,
            hospital_id: new_room.hospital_id,
            facility_id: new_room.facility_id,
            status: new_room.status,
            hospital_completed: false,
            facility_completed: false,
            created_at: now,
            updated_at: now,
        };
        tables.rooms.insert(room.id, room.clone());

        ready(Ok(Some((accepted, room))))
    }

    fn room_by_id(&self, id: uuid::Uuid) -> StoreFuture<'_, Option<MessageRoom>> {
        let tables = self.lock();
        ready(Ok(tables.rooms.get(&id).cloned()))
    }

    fn room_by_request(&self, request_id: i32) -> StoreFuture<'_, Option<MessageRoom>> {
        let tables = self.lock();
        let found = tables
            .rooms
            .values()
            .find(|r| r.request_id == request_id)
            .cloned();
        ready(Ok(found))
    }

    fn transition_room(
        &self,
        id: uuid::Uuid,
        from: RoomStatus,
        to: RoomStatus,
    ) -> StoreFuture<'_, Option<MessageRoom>> {
        let mut tables = self.lock();
        let now = tables.tick();
        let moved = tables
            .rooms
            .get_mut(&id)
            .filter(|r| r.status == from)
            .map(|r| {
                r.status = to;
                r.updated_at = now;
                r.clone()
            });
        ready(Ok(moved))
    }

    fn set_completion(
        &self,
        id: uuid::Uuid,
        side: CompletionSide,
        completed: bool,
    ) -> StoreFuture<'_, Option<MessageRoom>> {
        let mut tables = self.lock();
        let now = tables.tick();
        let updated = tables
            .rooms
            .get_mut(&id)
            .filter(|r| r.status == RoomStatus::Accepted)
            .map(|r| {
                match side {
                    CompletionSide::Hospital => r.hospital_completed = completed,
                    CompletionSide::Facility => r.facility_completed = completed,
                }
                if r.both_completed() {
                    r.status = RoomStatus::Completed;
                }
                r.updated_at = now;
                r.clone()
            });
        ready(Ok(updated))
    }

    fn room_summaries(&self, party: Party, viewer_id: i32) -> StoreFuture<'_, Vec<RoomSummary>> {
        let tables = self.lock();
        let mut summaries: Vec<RoomSummary> = tables
            .rooms
            .values()
            .filter(|room| party.side_in(room).is_some())
            .filter_map(|room| tables.summarize(room, viewer_id))
            .collect();
        summaries.sort_by(|a, b| {
            let key = |s: &RoomSummary| (s.last_message_at.unwrap_or(s.room.created_at), s.room.id);
            key(b).cmp(&key(a))
        });
        ready(Ok(summaries))
    }

    fn insert_message<'a>(
        &'a self,
        room_id: uuid::Uuid,
        sender_id: i32,
        text: &'a str,
    ) -> StoreFuture<'a, Message> {
        let mut tables = self.lock();
        if !tables.rooms.contains_key(&room_id) {
            return ready(Err(missing_parent("room")));
        }

        tables.last_message_id += 1;
        let message = Message {
            id: tables.last_message_id,
            room_id,
            sender_id,
            message_text: text.to_string(),
            created_at: tables.tick(),
        };
        tables.messages.push(message.clone());
        ready(Ok(message))
    }

    fn messages_for_room(&self, room_id: uuid::Uuid) -> StoreFuture<'_, Vec<Message>> {
        let tables = self.lock();
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        ready(Ok(messages))
    }

    fn insert_room_file<'a>(&'a self, file: NewRoomFile<'a>) -> StoreFuture<'a, RoomFile> {
        let mut tables = self.lock();
        if !tables.rooms.contains_key(&file.room_id) {
            return ready(Err(missing_parent("room")));
        }

        tables.last_file_id += 1;
        let stored = RoomFile {
            id: tables.last_file_id,
            room_id: file.room_id,
            sender_id: file.sender_id,
            file_name: file.file_name.to_string(),
            file_path: file.file_path.to_string(),
            file_type: file.file_type.to_string(),
            file_size: file.file_size,
            created_at: tables.tick(),
        };
        tables.files.insert(stored.id, stored.clone());
        ready(Ok(stored))
    }

    fn room_files(&self, room_id: uuid::Uuid) -> StoreFuture<'_, Vec<RoomFile>> {
        let tables = self.lock();
        let mut files: Vec<RoomFile> = tables
            .files
            .values()
            .filter(|f| f.room_id == room_id)
            .cloned()
            .collect();
        files.sort_by_key(|f| (f.created_at, f.id));
        ready(Ok(files))
    }

    fn room_file_by_id(&self, id: i32) -> StoreFuture<'_, Option<RoomFile>> {
        let tables = self.lock();
        ready(Ok(tables.files.get(&id).cloned()))
    }

    fn delete_room_file(&self, id: i32) -> StoreFuture<'_, bool> {
        let mut tables = self.lock();
        ready(Ok(tables.files.remove(&id).is_some()))
    }

    fn unread_room_count(&self, party: Party, user_id: i32) -> StoreFuture<'_, i64> {
        let tables = self.lock();
        let count = tables
            .rooms
            .values()
            .filter(|room| party.side_in(room).is_some())
            .filter(|room| tables.room_has_unread(room.id, user_id))
            .count();
        ready(Ok(i64::try_from(count).unwrap_or(i64::MAX)))
    }

    fn unread_request_count(&self, party: Party, user_id: i32) -> StoreFuture<'_, i64> {
        let tables = self.lock();
        let notable = |status: RequestStatus| match party {
            Party::Hospital(_) => status.is_terminal(),
            Party::Facility(_) => status == RequestStatus::Pending,
        };
        let count = tables
            .requests
            .values()
            .filter(|r| party.owns_request(r) && notable(r.status))
            .filter(|r| {
                tables
                    .request_reads
                    .get(&(r.id, user_id))
                    .is_none_or(|read_at| r.updated_at > *read_at)
            })
            .count();
        ready(Ok(i64::try_from(count).unwrap_or(i64::MAX)))
    }

    fn mark_room_read(&self, room_id: uuid::Uuid, user_id: i32) -> StoreFuture<'_, ()> {
        let mut tables = self.lock();
        if !tables.rooms.contains_key(&room_id) {
            return ready(Err(missing_parent("room")));
        }
        let now = tables.tick();
        tables.room_reads.insert((room_id, user_id), now);
        ready(Ok(()))
    }

    fn mark_request_read(&self, request_id: i32, user_id: i32) -> StoreFuture<'_, ()> {
        let mut tables = self.lock();
        if !tables.requests.contains_key(&request_id) {
            return ready(Err(missing_parent("request")));
        }
        let now = tables.tick();
        tables.request_reads.insert((request_id, user_id), now);
        ready(Ok(()))
    }

    fn mark_all_requests_read(&self, party: Party, user_id: i32) -> StoreFuture<'_, usize> {
        let mut tables = self.lock();
        let now = tables.tick();
        let owned: Vec<i32> = tables
            .requests
            .values()
            .filter(|r| party.owns_request(r))
            .map(|r| r.id)
            .collect();
        for request_id in &owned {
            tables.request_reads.insert((*request_id, user_id), now);
        }
        ready(Ok(owned.len()))
    }
}
