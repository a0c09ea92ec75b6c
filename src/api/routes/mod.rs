//! Route groups, merged into a service router in `api`.

pub mod admin;
pub mod categories;
pub mod events;
pub mod requests;
pub mod stats;
