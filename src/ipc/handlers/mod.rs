pub mod analytics;
pub mod backup;
pub mod core;
pub mod evaluations;
pub mod lessons;
pub mod schedule;
pub mod slots;
