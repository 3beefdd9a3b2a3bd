use thiserror::Error;

use crate::dataset::DatasetError;

/// Errors raised at the store boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The nearest-neighbour query ran without the spatial index it needs.
    #[error("nearest-provider lookup requires a spatial index on {collection}.{field}")]
    MissingSpatialIndex {
        collection: &'static str,
        field: &'static str,
    },

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

impl StoreError {
    pub fn missing_provider_index() -> Self {
        StoreError::MissingSpatialIndex {
            collection: super::PROVIDERS_COLLECTION,
            field: super::PROVIDER_LOCATION_FIELD,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
