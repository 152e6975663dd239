use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, Mutex};

use placement_core::types::Identity;
use placement_db::db::enums::{RequestStatus, RoomStatus};
use placement_db::model::request::PatientFields;
use placement_db::store::PlacementStore;
use placement_service::error::ServiceError;
use placement_service::ledger;

use crate::common::{World, patient};

#[test_log::test(tokio::test)]
async fn created_requests_start_pending() {
    let world = World::new();

    let request = world.pending_request().await;

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.hospital_id, world.hospital_id);
    assert_eq!(request.facility_id, world.facility_id);
    assert_eq!(request.patient(), patient());
}

#[test_log::test(tokio::test)]
async fn create_requires_existing_facility() {
    let world = World::new();

    let result =
        ledger::create_request(world.store.as_ref(), &world.hospital(), 9999, &patient()).await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[test_log::test(tokio::test)]
async fn only_hospitals_create_requests() {
    let world = World::new();
    let store = world.store.as_ref();

    for identity in [world.facility(), Identity::admin(1)] {
        let result = ledger::create_request(store, &identity, world.facility_id, &patient()).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }
}

#[test_log::test(tokio::test)]
async fn create_validates_patient() {
    let world = World::new();
    let bad = PatientFields {
        age: 200,
        ..patient()
    };

    let result =
        ledger::create_request(world.store.as_ref(), &world.hospital(), world.facility_id, &bad)
            .await;

    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[test_log::test(tokio::test)]
async fn pending_requests_can_be_edited_by_owner_only() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;
    let edited = PatientFields {
        age: 71,
        gender: "F".to_string(),
        condition: "dementia, diabetes".to_string(),
    };

    let denied = ledger::update_request(store, &world.other_hospital(), request.id, &edited).await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

    let denied = ledger::update_request(store, &world.facility(), request.id, &edited).await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

    let updated = ledger::update_request(store, &world.hospital(), request.id, &edited)
        .await
        .unwrap();
    assert_eq!(updated.patient(), edited);
    assert_eq!(updated.status, RequestStatus::Pending);
}

#[test_log::test(tokio::test)]
async fn decided_requests_are_frozen() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;
    ledger::reject_request(store, &world.facility(), request.id)
        .await
        .unwrap();

    let update = ledger::update_request(store, &world.hospital(), request.id, &patient()).await;
    assert!(matches!(update, Err(ServiceError::InvalidState(_))));

    let cancel = ledger::cancel_request(store, &world.hospital(), request.id).await;
    assert!(matches!(cancel, Err(ServiceError::InvalidState(_))));
}

#[test_log::test(tokio::test)]
async fn cancel_deletes_pending_request() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;

    ledger::cancel_request(store, &world.hospital(), request.id)
        .await
        .unwrap();

    assert!(store.request_by_id(request.id).await.unwrap().is_none());
    let again = ledger::cancel_request(store, &world.hospital(), request.id).await;
    assert!(matches!(again, Err(ServiceError::NotFound(_))));
}

#[test_log::test(tokio::test)]
async fn accept_opens_negotiating_room() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;

    let outcome = ledger::accept_request(store, &world.facility(), request.id)
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.request.status, RequestStatus::Accepted);
    assert_eq!(outcome.room.status, RoomStatus::Negotiating);
    assert_eq!(outcome.room.request_id, request.id);
    assert_eq!(outcome.room.hospital_id, world.hospital_id);
    assert_eq!(outcome.room.facility_id, world.facility_id);
    assert!(!outcome.room.hospital_completed && !outcome.room.facility_completed);
}

#[test_log::test(tokio::test)]
async fn accept_is_idempotent() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;

    let first = ledger::accept_request(store, &world.facility(), request.id)
        .await
        .unwrap();
    let second = ledger::accept_request(store, &world.facility(), request.id)
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.room.id, second.room.id);
}

#[test_log::test(tokio::test)]
async fn only_target_facility_decides() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;

    for identity in [world.other_facility(), world.hospital(), Identity::admin(1)] {
        assert!(matches!(
            ledger::accept_request(store, &identity, request.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            ledger::reject_request(store, &identity, request.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
    assert!(store.room_by_request(request.id).await.unwrap().is_none());
}

#[test_log::test(tokio::test)]
async fn crossed_decisions_are_invalid() {
    let world = World::new();
    let store = world.store.as_ref();

    let rejected = world.pending_request().await;
    ledger::reject_request(store, &world.facility(), rejected.id)
        .await
        .unwrap();
    assert!(matches!(
        ledger::accept_request(store, &world.facility(), rejected.id).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert!(store.room_by_request(rejected.id).await.unwrap().is_none());
    // Re-rejecting is a no-op.
    let again = ledger::reject_request(store, &world.facility(), rejected.id)
        .await
        .unwrap();
    assert_eq!(again.status, RequestStatus::Rejected);

    let accepted = world.pending_request().await;
    ledger::accept_request(store, &world.facility(), accepted.id)
        .await
        .unwrap();
    assert!(matches!(
        ledger::reject_request(store, &world.facility(), accepted.id).await,
        Err(ServiceError::InvalidState(_))
    ));
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_accepts_open_one_room() {
    let world = World::new();
    let request_id = world.pending_request().await.id;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = world.store.clone();
        let identity = world.facility();
        handles.push(tokio::spawn(async move {
            ledger::accept_request(store.as_ref(), &identity, request_id).await
        }));
    }

    let mut rooms = HashSet::new();
    let mut created = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        rooms.insert(outcome.room.id);
        if outcome.created {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(rooms.len(), 1);
    let stored = world
        .store
        .room_by_request(request_id)
        .await
        .unwrap()
        .unwrap();
    assert!(rooms.contains(&stored.id));
}

#[test_log::test(tokio::test)]
async fn requests_visible_to_both_parties_only() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;

    assert!(ledger::get_request(store, &world.hospital(), request.id).await.is_ok());
    assert!(ledger::get_request(store, &world.facility(), request.id).await.is_ok());
    for identity in [world.other_hospital(), world.other_facility(), Identity::admin(1)] {
        assert!(matches!(
            ledger::get_request(store, &identity, request.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
    assert!(matches!(
        ledger::get_request(store, &world.hospital(), 9999).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[test_log::test(tokio::test)]
async fn room_for_request_appears_after_accept() {
    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;

    assert!(
        ledger::room_for_request(store, &world.hospital(), request.id)
            .await
            .unwrap()
            .is_none()
    );

    let outcome = ledger::accept_request(store, &world.facility(), request.id)
        .await
        .unwrap();
    let room = ledger::room_for_request(store, &world.hospital(), request.id)
        .await
        .unwrap();
    assert_eq!(room.map(|r| r.id), Some(outcome.room.id));
}

#[test_log::test(tokio::test)]
async fn listings_are_newest_first_per_party() {
    let world = World::new();
    let store = world.store.as_ref();
    let first = world.pending_request().await;
    let second = world.pending_request().await;

    let sent = ledger::list_requests(store, &world.hospital()).await.unwrap();
    let ids: Vec<i32> = sent.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let received = ledger::list_requests(store, &world.facility()).await.unwrap();
    assert_eq!(received.len(), 2);

    assert!(
        ledger::list_requests(store, &world.other_facility())
            .await
            .unwrap()
            .is_empty()
    );
    assert!(matches!(
        ledger::list_requests(store, &Identity::admin(1)).await,
        Err(ServiceError::Forbidden(_))
    ));
}

/// Collects formatted log output for inspection.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn patient_condition_stays_out_of_logs() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let world = World::new();
    let store = world.store.as_ref();
    let request = world.pending_request().await;
    let edited = PatientFields {
        condition: "vascular dementia".to_string(),
        ..patient()
    };
    ledger::update_request(store, &world.hospital(), request.id, &edited)
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("Request created"), "{output}");
    assert!(output.contains("Request updated"), "{output}");
    assert!(output.contains("age=70"), "{output}");
    assert!(!output.contains("dementia"), "{output}");
}
