use std::sync::Arc;

use placement_core::types::Identity;
use placement_db::memory::MemoryStore;
use placement_db::model::request::{PatientFields, PlacementRequest};
use placement_db::model::room::MessageRoom;
use placement_service::{ledger, room};

pub const HOSPITAL_USER: i32 = 100;
pub const FACILITY_USER: i32 = 200;
pub const OTHER_HOSPITAL_USER: i32 = 101;
pub const OTHER_FACILITY_USER: i32 = 201;

/// A store with two hospitals and two facilities registered.
pub struct World {
    pub store: Arc<MemoryStore>,
    pub hospital_id: i32,
    pub facility_id: i32,
}

impl World {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let hospital = store.add_hospital(HOSPITAL_USER, "St. Mary's");
        let facility = store.add_facility(FACILITY_USER, "Oak House");
        let _county = store.add_hospital(OTHER_HOSPITAL_USER, "County General");
        let _birch = store.add_facility(OTHER_FACILITY_USER, "Birch Lodge");

        Self {
            store,
            hospital_id: hospital.id,
            facility_id: facility.id,
        }
    }

    pub fn hospital(&self) -> Identity {
        Identity::hospital(HOSPITAL_USER)
    }

    pub fn facility(&self) -> Identity {
        Identity::facility(FACILITY_USER)
    }

    pub fn other_hospital(&self) -> Identity {
        Identity::hospital(OTHER_HOSPITAL_USER)
    }

    pub fn other_facility(&self) -> Identity {
        Identity::facility(OTHER_FACILITY_USER)
    }

    pub async fn pending_request(&self) -> PlacementRequest {
        ledger::create_request(
            self.store.as_ref(),
            &self.hospital(),
            self.facility_id,
            &patient(),
        )
        .await
        .unwrap()
    }

    pub async fn negotiating_room(&self) -> MessageRoom {
        let request = self.pending_request().await;
        ledger::accept_request(self.store.as_ref(), &self.facility(), request.id)
            .await
            .unwrap()
            .room
    }

    pub async fn accepted_room(&self) -> MessageRoom {
        let negotiating = self.negotiating_room().await;
        room::accept_room(self.store.as_ref(), &self.facility(), negotiating.id)
            .await
            .unwrap()
    }
}

pub fn patient() -> PatientFields {
    PatientFields {
        age: 70,
        gender: "F".to_string(),
        condition: "dementia".to_string(),
    }
}
