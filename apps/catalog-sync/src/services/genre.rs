//! Genre resolution: one local row per genre name, ignoring case.

use crate::db::models::Genre;
use crate::db::CatalogStore;
use crate::error::{AppError, Result};

/// Finds or creates genres by name.
#[derive(Clone)]
pub struct GenreResolver {
    store: CatalogStore,
}

impl GenreResolver {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    /// Resolve a genre name to its canonical row.
    ///
    /// The first spelling seen is the one stored; later lookups in any casing
    /// return that row.
    pub async fn resolve(&self, name: &str) -> Result<Genre> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Genre name cannot be blank".to_string()));
        }

        if let Some(genre) = self.store.find_genre_by_name(name).await? {
            return Ok(genre);
        }

        let genre = self.store.insert_genre(name).await?;
        tracing::debug!(genre_id = genre.id, name = %genre.name, "Created genre");
        Ok(genre)
    }
}
