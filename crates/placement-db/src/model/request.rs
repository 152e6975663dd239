use diesel::{pg::Pg, prelude::*};

use crate::db::{enums::RequestStatus, schema};

/// A hospital's ask to place a patient at a facility.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, serde::Serialize,
)]
#[diesel(table_name = schema::placement_requests)]
#[diesel(belongs_to(crate::model::party::Hospital, foreign_key = hospital_id))]
#[diesel(belongs_to(crate::model::party::Facility, foreign_key = facility_id))]
#[diesel(check_for_backend(Pg))]
pub struct PlacementRequest {
    pub id: i32,
    pub hospital_id: i32,
    pub facility_id: i32,
    pub patient_age: i32,
    pub patient_gender: String,
    pub medical_condition: String,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl PlacementRequest {
    #[must_use]
    pub fn patient(&self) -> PatientFields {
        PatientFields {
            age: self.patient_age,
            gender: self.patient_gender.clone(),
            condition: self.medical_condition.clone(),
        }
    }
}

/// Patient demographics carried by a request; the only fields a hospital may
/// edit while the request is pending.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PatientFields {
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub condition: String,
}

/// Insert struct for creating new placement requests
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::placement_requests)]
pub struct NewPlacementRequest<'a> {
    pub hospital_id: i32,
    pub facility_id: i32,
    pub patient_age: i32,
    pub patient_gender: &'a str,
    pub medical_condition: &'a str,
    pub status: RequestStatus,
}

impl<'a> NewPlacementRequest<'a> {
    #[must_use]
    pub fn pending(hospital_id: i32, facility_id: i32, patient: &'a PatientFields) -> Self {
        Self {
            hospital_id,
            facility_id,
            patient_age: patient.age,
            patient_gender: &patient.gender,
            medical_condition: &patient.condition,
            status: RequestStatus::Pending,
        }
    }
}
