use thiserror::Error;

use crate::types::Classification;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Identifier errors
    #[error("Invalid UID: {0}")]
    InvalidUid(String),

    // Event errors
    #[error("Event {uid} already classified as {current}")]
    AlreadyClassified {
        uid: String,
        current: Classification,
    },

    #[error("Cannot classify an event as {0}")]
    InvalidClassification(Classification),
}

pub type Result<T> = std::result::Result<T, Error>;
