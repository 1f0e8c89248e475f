pub mod telemetry;
pub mod ingest;
pub mod digest;
pub mod heuristics;
pub mod summary;
pub mod provider;
pub mod narrative;
pub mod store;
pub mod profile;
pub mod memory;
pub mod chat;
