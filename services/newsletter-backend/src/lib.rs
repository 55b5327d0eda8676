pub mod application;
pub mod domain;
pub mod jobs;
pub mod services;
pub mod telemetry;
