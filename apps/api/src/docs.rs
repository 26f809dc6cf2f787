use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "VacQ API", description = "Hospitals, vaccination centers and vaccine appointment booking"),
    paths(
        auth_cell::handlers::register,
        auth_cell::handlers::login,
        auth_cell::handlers::get_me,
        auth_cell::handlers::logout,
        auth_cell::handlers::update_details,
        auth_cell::handlers::update_password,
        hospital_cell::handlers::list_hospitals,
        hospital_cell::handlers::get_hospital,
        hospital_cell::handlers::create_hospital,
        hospital_cell::handlers::update_hospital,
        hospital_cell::handlers::delete_hospital,
        hospital_cell::handlers::get_vac_centers,
        appointment_cell::handlers::list_appointments,
        appointment_cell::handlers::list_hospital_appointments,
        appointment_cell::handlers::create_appointment,
        appointment_cell::handlers::get_appointment,
        appointment_cell::handlers::update_appointment,
        appointment_cell::handlers::delete_appointment
    ),
    components(
        schemas(
            shared_models::auth::User,
            shared_models::auth::Role,
            shared_models::auth::TokenResponse,
            auth_cell::models::RegisterRequest,
            auth_cell::models::LoginRequest,
            auth_cell::models::UpdateDetailsRequest,
            auth_cell::models::UpdatePasswordRequest,
            hospital_cell::models::Hospital,
            hospital_cell::models::HospitalAppointment,
            hospital_cell::models::CreateHospitalRequest,
            hospital_cell::models::UpdateHospitalRequest,
            hospital_cell::models::VacCenter,
            appointment_cell::models::VacQueue,
            appointment_cell::models::HospitalSummary,
            appointment_cell::models::CreateVacQueueRequest,
            appointment_cell::models::UpdateVacQueueRequest
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and the current user"),
        (name = "Hospitals", description = "The hospitals managing API"),
        (name = "Appointments", description = "Vaccine appointment booking")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme the protected paths refer to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
