use std::path::PathBuf;
use uuid::Uuid;

/// Failures raised by the storage implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("an active subscription already holds slot {0}")]
    SlotTaken(String),

    #[error("record {0} already exists")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("transaction rolled back: {0}")]
    Rollback(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("already subscribed to this creator")]
    AlreadySubscribed,

    #[error("cannot subscribe to yourself")]
    SelfSubscription,

    #[error("no active subscription found")]
    NoActiveSubscription,

    #[error("subscription not found")]
    NotFound,

    #[error("payment for subscription {subscription_id} was not settled")]
    PaymentDeclined { subscription_id: Uuid },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content {0} not found")]
    ContentNotFound(Uuid),

    #[error("asset missing on storage: {}", .0.display())]
    AssetMissingOnStorage(PathBuf),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode image: {0}")]
    DecodeFailure(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    EncodeFailure(#[source] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entitlement check failed: {0}")]
    Entitlement(#[from] LedgerError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl From<WatermarkError> for ContentError {
    fn from(err: WatermarkError) -> Self {
        match err {
            WatermarkError::Decode(e) => ContentError::DecodeFailure(e),
            WatermarkError::Encode(e) => ContentError::EncodeFailure(e),
        }
    }
}
