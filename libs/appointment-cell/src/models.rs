use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::validation::ValidationErrors;

// ==============================================================================
// CORE VAC QUEUE MODELS
// ==============================================================================

/// One booked vaccination slot. A user holds at most one at a time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VacQueue {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hospital_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2030-05-01")]
    pub appt_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<HospitalSummary>,
}

impl VacQueue {
    pub fn is_owned_by(&self, user_id: &Uuid) -> bool {
        self.user_id == *user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HospitalSummary {
    #[schema(example = "Happy Hospital")]
    pub name: String,
    #[schema(example = "Bangkok")]
    pub province: String,
    #[schema(example = "02-2187000")]
    pub tel: String,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateVacQueueRequest {
    #[serde(rename = "apptDate", alias = "appt_date")]
    #[schema(example = "2030-05-01")]
    pub appt_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateVacQueueRequest {
    #[serde(rename = "apptDate", alias = "appt_date")]
    #[schema(example = "2030-05-02")]
    pub appt_date: Option<String>,
    /// Id of the hospital to move the appointment to.
    #[serde(alias = "hospital_id")]
    pub hospital: Option<String>,
}

impl UpdateVacQueueRequest {
    pub fn is_empty(&self) -> bool {
        self.appt_date.is_none() && self.hospital.is_none()
    }
}

/// Parses an appointment date and rejects days before `today`.
pub fn parse_appt_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, ValidationErrors> {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(ValidationErrors::single("apptDate", "Please add an appointment date")),
    };

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ValidationErrors::single("apptDate", "Appointment date must be formatted as YYYY-MM-DD")
    })?;

    if date < today {
        return Err(ValidationErrors::single("apptDate", "Appointment date can not be in the past"));
    }

    Ok(date)
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VacQueueError {
    #[error("No appointment with the id of {0}")]
    NotFound(String),

    #[error("No hospital with the id of {0}")]
    HospitalNotFound(String),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("The user with ID {user_id} has already made an appointment")]
    AlreadyBooked { user_id: Uuid },

    #[error("Hospital {hospital_id} has no vaccine doses left on {date}")]
    CapacityExceeded { hospital_id: Uuid, date: NaiveDate },

    #[error("User {user_id} is not authorized to {action} this appointment")]
    Forbidden { user_id: Uuid, action: &'static str },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<VacQueueError> for AppError {
    fn from(err: VacQueueError) -> Self {
        match err {
            VacQueueError::NotFound(_) | VacQueueError::HospitalNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            VacQueueError::Validation(errors) => AppError::Validation(errors),
            VacQueueError::AlreadyBooked { .. } => AppError::Conflict(err.to_string()),
            VacQueueError::CapacityExceeded { .. } => AppError::CapacityExceeded(err.to_string()),
            VacQueueError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
            VacQueueError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
