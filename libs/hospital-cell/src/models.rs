use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::validation::{is_valid_postal_code, ValidationErrors};

pub const NAME_MAX_LEN: usize = 50;
pub const POSTAL_CODE_MAX_LEN: usize = 5;

/// Columns callers may select, sort or filter on when listing hospitals.
pub const LISTABLE_FIELDS: [&str; 10] = [
    "id",
    "name",
    "address",
    "district",
    "province",
    "postalcode",
    "tel",
    "region",
    "daily_capacity",
    "created_at",
];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Hospital {
    pub id: Uuid,
    #[schema(example = "Happy Hospital")]
    pub name: String,
    #[schema(example = "121 Sukhumvit Road")]
    pub address: String,
    #[schema(example = "Bang Na")]
    pub district: String,
    #[schema(example = "Bangkok")]
    pub province: String,
    #[schema(example = "10110")]
    pub postalcode: String,
    #[schema(example = "02-2187000")]
    pub tel: String,
    #[schema(example = "Bangkok")]
    pub region: String,
    pub daily_capacity: i32,
    pub created_at: Option<DateTime<Utc>>,
    /// Reverse lookup of the appointments booked at this hospital.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointments: Option<Vec<HospitalAppointment>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HospitalAppointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub appt_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
}

/// Every field is optional at the type level so one request can report all
/// missing fields at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateHospitalRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub postalcode: Option<String>,
    pub tel: Option<String>,
    pub region: Option<String>,
    pub daily_capacity: Option<i32>,
}

impl CreateHospitalRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.require("name", self.name.as_deref(), "Please add a name");
        errors.max_length("name", self.name.as_deref(), NAME_MAX_LEN, "Name can not be more than 50 characters");
        errors.require("address", self.address.as_deref(), "Please add an address");
        errors.require("district", self.district.as_deref(), "Please add a district");
        errors.require("province", self.province.as_deref(), "Please add a province");
        if errors.require("postalcode", self.postalcode.as_deref(), "Please add a postalcode") {
            check_postal_code(&mut errors, self.postalcode.as_deref());
        }
        if errors.require("tel", self.tel.as_deref(), "Please add a telephone number") {
            errors.tel("tel", self.tel.as_deref());
        }
        errors.require("region", self.region.as_deref(), "Please add a region");
        check_capacity(&mut errors, self.daily_capacity);

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateHospitalRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub postalcode: Option<String>,
    pub tel: Option<String>,
    pub region: Option<String>,
    pub daily_capacity: Option<i32>,
}

impl UpdateHospitalRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.not_blank("name", self.name.as_deref(), "Please add a name");
        errors.max_length("name", self.name.as_deref(), NAME_MAX_LEN, "Name can not be more than 50 characters");
        errors.not_blank("address", self.address.as_deref(), "Please add an address");
        errors.not_blank("district", self.district.as_deref(), "Please add a district");
        errors.not_blank("province", self.province.as_deref(), "Please add a province");
        errors.not_blank("tel", self.tel.as_deref(), "Please add a telephone number");
        errors.tel("tel", self.tel.as_deref());
        errors.not_blank("region", self.region.as_deref(), "Please add a region");
        check_postal_code(&mut errors, self.postalcode.as_deref());
        check_capacity(&mut errors, self.daily_capacity);

        errors.into_result()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.district.is_none()
            && self.province.is_none()
            && self.postalcode.is_none()
            && self.tel.is_none()
            && self.region.is_none()
            && self.daily_capacity.is_none()
    }
}

fn check_postal_code(errors: &mut ValidationErrors, value: Option<&str>) {
    if let Some(code) = value {
        if code.trim().chars().count() > POSTAL_CODE_MAX_LEN {
            errors.add("postalcode", "Postal Code can not be more than 5 digits");
        } else if !is_valid_postal_code(code) {
            errors.add("postalcode", "Postal Code must contain digits only");
        }
    }
}

fn check_capacity(errors: &mut ValidationErrors, value: Option<i32>) {
    if let Some(capacity) = value {
        if capacity < 1 {
            errors.add("daily_capacity", "Daily capacity must be at least 1");
        }
    }
}

/// A hospital annotated with how many vaccine doses are still bookable on
/// one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VacCenter {
    pub id: Uuid,
    pub name: String,
    pub province: String,
    pub tel: String,
    pub daily_capacity: i32,
    pub date: NaiveDate,
    pub booked: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VacCenterQuery {
    pub date: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HospitalError {
    #[error("Hospital not found with id of {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Hospital named {name} already exists")]
    DuplicateName { name: String },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<HospitalError> for AppError {
    fn from(err: HospitalError) -> Self {
        match err {
            HospitalError::NotFound(_) => AppError::NotFound(err.to_string()),
            HospitalError::Validation(errors) => AppError::Validation(errors),
            HospitalError::DuplicateName { .. } => {
                AppError::Validation(ValidationErrors::single("name", err.to_string()))
            }
            HospitalError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
