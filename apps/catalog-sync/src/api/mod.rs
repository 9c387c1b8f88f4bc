//! API endpoint handlers for the catalog sync service.

pub mod catalog;
pub mod sync;
