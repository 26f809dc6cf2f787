use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::error::postgrest_error;
use shared_database::{AppState, SupabaseClient};
use shared_models::auth::User;

use crate::models::{
    parse_appt_date, CreateVacQueueRequest, UpdateVacQueueRequest, VacQueue, VacQueueError,
};

const HOSPITAL_EMBED: &str = "hospital:hospitals(name,province,tel)";

// Exceptions raised by the booking functions in the store.
const ALREADY_BOOKED: &str = "VACQ_ALREADY_BOOKED";
const CAPACITY_EXCEEDED: &str = "VACQ_CAPACITY_EXCEEDED";
const HOSPITAL_NOT_FOUND: &str = "VACQ_HOSPITAL_NOT_FOUND";
const APPOINTMENT_NOT_FOUND: &str = "VACQ_APPOINTMENT_NOT_FOUND";

pub struct VacQueueService<'a> {
    supabase: &'a SupabaseClient,
    today: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct HospitalCapacity {
    id: Uuid,
    daily_capacity: i32,
}

impl<'a> VacQueueService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            supabase: &state.db,
            today: Utc::now().date_naive(),
        }
    }

    /// Appointments visible to `user`: their own, or everything for an admin.
    /// `hospital_id` narrows the list to one hospital.
    pub async fn list_appointments(
        &self,
        user: &User,
        hospital_id: Option<&str>,
    ) -> Result<Vec<VacQueue>, VacQueueError> {
        let mut path = format!(
            "/rest/v1/vac_queues?select=*,{}&order=appt_date.asc",
            HOSPITAL_EMBED
        );

        if let Some(raw) = hospital_id {
            let id = parse_hospital_id(raw)?;
            self.fetch_hospital(&id, raw).await?;
            path.push_str(&format!("&hospital_id=eq.{}", id));
        }
        if !user.is_admin() {
            path.push_str(&format!("&user_id=eq.{}", user.id));
        }

        debug!("Listing appointments for user {}: {}", user.id, path);

        self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| VacQueueError::DatabaseError(e.to_string()))
    }

    pub async fn get_appointment(&self, user: &User, appointment_id: &str) -> Result<VacQueue, VacQueueError> {
        let appointment = self.fetch(appointment_id).await?;
        ensure_access(user, &appointment, "view")?;
        Ok(appointment)
    }

    /// Books `user` into `hospital_id`. The store function re-checks both
    /// invariants under a row lock; the reads here only sharpen the error.
    pub async fn create_appointment(
        &self,
        user: &User,
        hospital_id: &str,
        request: CreateVacQueueRequest,
    ) -> Result<VacQueue, VacQueueError> {
        debug!("Booking appointment for user {} at hospital {}", user.id, hospital_id);

        let hospital_uuid = parse_hospital_id(hospital_id)?;
        let hospital = self.fetch_hospital(&hospital_uuid, hospital_id).await?;

        let appt_date = parse_appt_date(request.appt_date.as_deref(), self.today)
            .map_err(VacQueueError::Validation)?;

        let existing: Vec<Value> = self.supabase
            .request(
                Method::GET,
                &format!("/rest/v1/vac_queues?user_id=eq.{}&select=id", user.id),
                None,
            )
            .await
            .map_err(|e| VacQueueError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            warn!("User {} already holds an appointment", user.id);
            return Err(VacQueueError::AlreadyBooked { user_id: user.id });
        }

        let booked = self.count_booked(&hospital.id, appt_date, None).await?;
        if booked >= hospital.daily_capacity as usize {
            warn!("Hospital {} is full on {}", hospital.id, appt_date);
            return Err(VacQueueError::CapacityExceeded { hospital_id: hospital.id, date: appt_date });
        }

        let result: Vec<VacQueue> = self.supabase
            .rpc(
                "book_vac_queue",
                json!({
                    "p_user_id": user.id,
                    "p_hospital_id": hospital.id,
                    "p_appt_date": appt_date,
                }),
            )
            .await
            .map_err(|e| map_booking_error(e, user.id, hospital.id, hospital_id, appt_date))?;

        let appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| VacQueueError::DatabaseError("Failed to book appointment".to_string()))?;

        info!("Appointment {} booked for user {} on {}", appointment.id, user.id, appt_date);
        Ok(appointment)
    }

    /// Moves an appointment to another date and/or hospital. Every change goes
    /// through the locked capacity check, excluding the appointment itself.
    pub async fn update_appointment(
        &self,
        user: &User,
        appointment_id: &str,
        request: UpdateVacQueueRequest,
    ) -> Result<VacQueue, VacQueueError> {
        debug!("Updating appointment: {}", appointment_id);

        let current = self.fetch(appointment_id).await?;
        ensure_access(user, &current, "update")?;

        if request.is_empty() {
            return Ok(current);
        }

        let hospital = match request.hospital.as_deref() {
            Some(raw) => {
                let id = parse_hospital_id(raw)?;
                self.fetch_hospital(&id, raw).await?
            }
            None => self.fetch_hospital(&current.hospital_id, &current.hospital_id.to_string()).await?,
        };

        let appt_date = match request.appt_date.as_deref() {
            Some(raw) => parse_appt_date(Some(raw), self.today).map_err(VacQueueError::Validation)?,
            None => current.appt_date,
        };

        let booked = self.count_booked(&hospital.id, appt_date, Some(&current.id)).await?;
        if booked >= hospital.daily_capacity as usize {
            warn!("Hospital {} is full on {}", hospital.id, appt_date);
            return Err(VacQueueError::CapacityExceeded { hospital_id: hospital.id, date: appt_date });
        }

        let result: Vec<VacQueue> = self.supabase
            .rpc(
                "reschedule_vac_queue",
                json!({
                    "p_id": current.id,
                    "p_hospital_id": hospital.id,
                    "p_appt_date": appt_date,
                }),
            )
            .await
            .map_err(|e| match postgrest_error(&e) {
                Some(pg) if pg.is_raised(APPOINTMENT_NOT_FOUND) => {
                    VacQueueError::NotFound(appointment_id.to_string())
                }
                _ => map_booking_error(e, current.user_id, hospital.id, &hospital.id.to_string(), appt_date),
            })?;

        let appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| VacQueueError::NotFound(appointment_id.to_string()))?;

        info!("Appointment {} moved to hospital {} on {}", appointment.id, hospital.id, appt_date);
        Ok(appointment)
    }

    pub async fn delete_appointment(&self, user: &User, appointment_id: &str) -> Result<(), VacQueueError> {
        debug!("Deleting appointment: {}", appointment_id);

        let appointment = self.fetch(appointment_id).await?;
        ensure_access(user, &appointment, "delete")?;

        let _: () = self.supabase
            .request(
                Method::DELETE,
                &format!("/rest/v1/vac_queues?id=eq.{}", appointment.id),
                None,
            )
            .await
            .map_err(|e| VacQueueError::DatabaseError(e.to_string()))?;

        info!("Appointment {} cancelled by {}", appointment.id, user.id);
        Ok(())
    }

    async fn fetch(&self, appointment_id: &str) -> Result<VacQueue, VacQueueError> {
        let id = Uuid::parse_str(appointment_id)
            .map_err(|_| VacQueueError::NotFound(appointment_id.to_string()))?;

        let path = format!("/rest/v1/vac_queues?id=eq.{}&select=*,{}", id, HOSPITAL_EMBED);

        let result: Vec<VacQueue> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| VacQueueError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| VacQueueError::NotFound(appointment_id.to_string()))
    }

    async fn fetch_hospital(&self, id: &Uuid, raw_id: &str) -> Result<HospitalCapacity, VacQueueError> {
        let path = format!("/rest/v1/hospitals?id=eq.{}&select=id,daily_capacity", id);

        let result: Vec<HospitalCapacity> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| VacQueueError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| VacQueueError::HospitalNotFound(raw_id.to_string()))
    }

    async fn count_booked(
        &self,
        hospital_id: &Uuid,
        appt_date: NaiveDate,
        exclude: Option<&Uuid>,
    ) -> Result<usize, VacQueueError> {
        let mut path = format!(
            "/rest/v1/vac_queues?hospital_id=eq.{}&appt_date=eq.{}&select=id&limit=1",
            hospital_id, appt_date
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }

        // The exact count comes back in Content-Range, so max-rows never caps it.
        let (rows, total): (Vec<Value>, Option<u64>) = self.supabase
            .request_with_count(&path)
            .await
            .map_err(|e| VacQueueError::DatabaseError(e.to_string()))?;

        Ok(total.map_or(rows.len(), |n| n as usize))
    }
}

fn parse_hospital_id(raw: &str) -> Result<Uuid, VacQueueError> {
    Uuid::parse_str(raw).map_err(|_| VacQueueError::HospitalNotFound(raw.to_string()))
}

fn ensure_access(user: &User, appointment: &VacQueue, action: &'static str) -> Result<(), VacQueueError> {
    if user.is_admin() || appointment.is_owned_by(&user.id) {
        return Ok(());
    }
    warn!("User {} tried to {} appointment {}", user.id, action, appointment.id);
    Err(VacQueueError::Forbidden { user_id: user.id, action })
}

fn map_booking_error(
    err: anyhow::Error,
    user_id: Uuid,
    hospital_id: Uuid,
    raw_hospital_id: &str,
    date: NaiveDate,
) -> VacQueueError {
    match postgrest_error(&err) {
        Some(pg) if pg.is_raised(ALREADY_BOOKED) || pg.is_unique_violation() => {
            VacQueueError::AlreadyBooked { user_id }
        }
        Some(pg) if pg.is_raised(CAPACITY_EXCEEDED) => {
            VacQueueError::CapacityExceeded { hospital_id, date }
        }
        Some(pg) if pg.is_raised(HOSPITAL_NOT_FOUND) => {
            VacQueueError::HospitalNotFound(raw_hospital_id.to_string())
        }
        _ => VacQueueError::DatabaseError(err.to_string()),
    }
}
