//! Application services for the catalog sync backend.

pub mod catalog_source;
pub mod genre;
pub mod locator;
pub mod scheduler;
pub mod sync;

pub use catalog_source::{CatalogSource, LidarrClient};
pub use genre::GenreResolver;
pub use locator::FileLocator;
pub use scheduler::{JobContext, Scheduler};
pub use sync::{SyncEngine, SyncReport};
