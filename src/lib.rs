//! Vitrine: content service for a studio portfolio site.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
