//! Domain layer types and invariants.

pub mod category;
pub mod entities;
pub mod error;
pub mod slug;
pub mod types;
