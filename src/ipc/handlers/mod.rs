pub mod core;
pub mod dashboard;
pub mod datasets;
pub mod headers;
pub mod setup;
pub mod students;
