//! Application services layer.

pub mod content;
pub mod error;
pub mod repos;
pub mod resolver;
pub mod revalidate;
pub mod schema;
pub mod sitemap;
pub mod syndication;
