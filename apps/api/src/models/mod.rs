pub mod capture;
pub mod metadata;
