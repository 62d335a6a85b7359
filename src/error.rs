use thiserror::Error;

use crate::feed::FeedError;
use crate::store::StoreError;

/// Top-level error kinds. Transport and decode failures come from the feed,
/// everything touching the data directory is a storage error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;
