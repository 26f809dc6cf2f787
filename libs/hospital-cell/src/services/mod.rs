pub mod hospital;

pub use hospital::HospitalService;
