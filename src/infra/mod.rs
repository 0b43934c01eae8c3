//! Infrastructure adapters and runtime bootstrap.

pub mod backend;
pub mod db;
pub mod error;
pub mod http;
pub mod seed;
pub mod static_content;
pub mod tables;
pub mod telemetry;
pub mod video;
