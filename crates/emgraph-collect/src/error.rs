//! Error types for the emgraph-collect crate.

use thiserror::Error;

use crate::pattern::PatternError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] emgraph_core::SourceError),

    #[error("Invalid seed uuid: {uuid}")]
    InvalidSeed { uuid: String },
}

pub type Result<T> = std::result::Result<T, CollectError>;
