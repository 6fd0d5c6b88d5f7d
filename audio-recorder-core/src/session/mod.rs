pub mod capture;
pub mod pending;
