use std::collections::HashMap;

use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::error::postgrest_error;
use shared_database::{AppState, SupabaseClient};
use shared_utils::query::ListQuery;

use crate::models::{
    CreateHospitalRequest, Hospital, HospitalError, UpdateHospitalRequest, VacCenter,
};

const APPOINTMENTS_EMBED: &str = "appointments:vac_queues(id,user_id,appt_date,created_at)";
const DEFAULT_SORT: &str = "created_at.desc";
const HOSPITAL_NOT_FOUND: &str = "VACQ_HOSPITAL_NOT_FOUND";

pub struct HospitalService<'a> {
    supabase: &'a SupabaseClient,
    default_daily_capacity: i32,
}

#[derive(Debug, Deserialize)]
struct BookedRow {
    hospital_id: Uuid,
    booked: i64,
}

#[derive(Debug, Deserialize)]
struct CapacityRow {
    id: Uuid,
    name: String,
    province: String,
    tel: String,
    daily_capacity: i32,
}

impl<'a> HospitalService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            supabase: &state.db,
            default_daily_capacity: state.config.default_daily_capacity,
        }
    }

    /// Advanced-results listing. Returns the page of rows and the total size
    /// of the filtered collection.
    pub async fn list_hospitals(&self, query: &ListQuery) -> Result<(Vec<Value>, u64), HospitalError> {
        let path = format!(
            "/rest/v1/hospitals?{}",
            query.to_postgrest(Some(APPOINTMENTS_EMBED), DEFAULT_SORT)
        );
        debug!("Listing hospitals: {}", path);

        let (rows, total): (Vec<Value>, Option<u64>) = self.supabase
            .request_with_count(&path)
            .await
            .map_err(|e| HospitalError::DatabaseError(e.to_string()))?;

        let total = total.unwrap_or(rows.len() as u64);
        Ok((rows, total))
    }

    pub async fn get_hospital(&self, hospital_id: &str) -> Result<Hospital, HospitalError> {
        debug!("Fetching hospital: {}", hospital_id);

        let id = parse_id(hospital_id)?;
        let path = format!(
            "/rest/v1/hospitals?id=eq.{}&select=*,{}",
            id, APPOINTMENTS_EMBED
        );

        let result: Vec<Hospital> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| HospitalError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| HospitalError::NotFound(hospital_id.to_string()))
    }

    pub async fn create_hospital(&self, request: CreateHospitalRequest) -> Result<Hospital, HospitalError> {
        request.validate().map_err(HospitalError::Validation)?;

        let name = trimmed(request.name.as_deref());
        debug!("Creating hospital: {}", name);

        self.ensure_name_available(&name, None).await?;

        let hospital_data = json!({
            "name": name,
            "address": trimmed(request.address.as_deref()),
            "district": trimmed(request.district.as_deref()),
            "province": trimmed(request.province.as_deref()),
            "postalcode": trimmed(request.postalcode.as_deref()),
            "tel": trimmed(request.tel.as_deref()),
            "region": trimmed(request.region.as_deref()),
            "daily_capacity": request.daily_capacity.unwrap_or(self.default_daily_capacity),
        });

        let result: Vec<Hospital> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/hospitals",
                Some(hospital_data),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|e| map_write_error(e, &name))?;

        let hospital = result
            .into_iter()
            .next()
            .ok_or_else(|| HospitalError::DatabaseError("Failed to create hospital".to_string()))?;

        info!("Hospital {} created with ID: {}", hospital.name, hospital.id);
        Ok(hospital)
    }

    pub async fn update_hospital(
        &self,
        hospital_id: &str,
        request: UpdateHospitalRequest,
    ) -> Result<Hospital, HospitalError> {
        debug!("Updating hospital: {}", hospital_id);

        let id = parse_id(hospital_id)?;
        request.validate().map_err(HospitalError::Validation)?;

        if request.is_empty() {
            return self.get_hospital(hospital_id).await;
        }

        let mut update_data = Map::new();

        if let Some(name) = &request.name {
            self.ensure_name_available(name.trim(), Some(id)).await?;
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(address) = &request.address {
            update_data.insert("address".to_string(), json!(address.trim()));
        }
        if let Some(district) = &request.district {
            update_data.insert("district".to_string(), json!(district.trim()));
        }
        if let Some(province) = &request.province {
            update_data.insert("province".to_string(), json!(province.trim()));
        }
        if let Some(postalcode) = &request.postalcode {
            update_data.insert("postalcode".to_string(), json!(postalcode.trim()));
        }
        if let Some(tel) = &request.tel {
            update_data.insert("tel".to_string(), json!(tel.trim()));
        }
        if let Some(region) = &request.region {
            update_data.insert("region".to_string(), json!(region.trim()));
        }
        if let Some(daily_capacity) = request.daily_capacity {
            update_data.insert("daily_capacity".to_string(), json!(daily_capacity));
        }

        let path = format!("/rest/v1/hospitals?id=eq.{}", id);
        let name = request.name.clone().unwrap_or_default();

        let result: Vec<Hospital> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update_data)),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(|e| map_write_error(e, &name))?;

        let hospital = result
            .into_iter()
            .next()
            .ok_or_else(|| HospitalError::NotFound(hospital_id.to_string()))?;

        info!("Hospital {} updated", hospital.id);
        Ok(hospital)
    }

    /// Removes the hospital and every appointment that references it in one
    /// store transaction. Returns how many appointments went with it.
    pub async fn delete_hospital(&self, hospital_id: &str) -> Result<usize, HospitalError> {
        debug!("Deleting hospital: {}", hospital_id);

        let id = parse_id(hospital_id)?;

        let removed: i64 = self.supabase
            .rpc("delete_hospital", json!({ "p_id": id }))
            .await
            .map_err(|e| match postgrest_error(&e) {
                Some(pg) if pg.is_raised(HOSPITAL_NOT_FOUND) => HospitalError::NotFound(hospital_id.to_string()),
                _ => HospitalError::DatabaseError(e.to_string()),
            })?;

        info!("Hospital {} deleted along with {} appointment(s)", id, removed);
        Ok(removed.max(0) as usize)
    }

    pub async fn get_vac_centers(&self, date: NaiveDate) -> Result<Vec<VacCenter>, HospitalError> {
        debug!("Computing vac center capacity for {}", date);

        let hospitals: Vec<CapacityRow> = self.supabase
            .request(
                Method::GET,
                "/rest/v1/hospitals?select=id,name,province,tel,daily_capacity&order=name.asc",
                None,
            )
            .await
            .map_err(|e| HospitalError::DatabaseError(e.to_string()))?;

        let booked: HashMap<Uuid, i64> = self.supabase
            .rpc::<Vec<BookedRow>>("vac_center_bookings", json!({ "p_date": date }))
            .await
            .map_err(|e| HospitalError::DatabaseError(e.to_string()))?
            .into_iter()
            .map(|row| (row.hospital_id, row.booked))
            .collect();

        let centers = hospitals
            .into_iter()
            .map(|row| {
                let booked = booked.get(&row.id).copied().unwrap_or(0);
                VacCenter {
                    id: row.id,
                    name: row.name,
                    province: row.province,
                    tel: row.tel,
                    daily_capacity: row.daily_capacity,
                    date,
                    booked,
                    remaining: remaining_capacity(row.daily_capacity, booked),
                }
            })
            .collect();

        Ok(centers)
    }

    async fn ensure_name_available(&self, name: &str, exclude: Option<Uuid>) -> Result<(), HospitalError> {
        let path = format!(
            "/rest/v1/hospitals?name=eq.{}&select=id",
            urlencoding::encode(name)
        );

        let existing: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| HospitalError::DatabaseError(e.to_string()))?;

        let taken = existing.iter().any(|row| {
            let row_id = row["id"].as_str().and_then(|s| Uuid::parse_str(s).ok());
            exclude.map_or(true, |id| row_id != Some(id))
        });

        if taken {
            warn!("Hospital name {} is already taken", name);
            return Err(HospitalError::DuplicateName { name: name.to_string() });
        }
        Ok(())
    }
}

pub fn remaining_capacity(daily_capacity: i32, booked: i64) -> i64 {
    (daily_capacity as i64 - booked).max(0)
}

/// Malformed ids cannot name an existing hospital.
fn parse_id(hospital_id: &str) -> Result<Uuid, HospitalError> {
    Uuid::parse_str(hospital_id).map_err(|_| HospitalError::NotFound(hospital_id.to_string()))
}

fn trimmed(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

fn map_write_error(err: anyhow::Error, name: &str) -> HospitalError {
    match postgrest_error(&err) {
        Some(pg) if pg.is_unique_violation() => HospitalError::DuplicateName { name: name.to_string() },
        _ => HospitalError::DatabaseError(err.to_string()),
    }
}
