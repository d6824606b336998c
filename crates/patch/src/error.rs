//! Error type for patch construction

use thiserror::Error;

/// A populated field could not be encoded as JSON
///
/// This is the only way building a patch can fail. It is raised before any
/// request is sent and is never worth retrying: it means the patch struct
/// holds a value with no JSON representation.
#[derive(Error, Debug)]
#[error("failed to serialize merge patch: {source}")]
pub struct SerializationError {
    #[from]
    source: serde_json::Error,
}

impl SerializationError {
    /// Build an error from a message
    pub(crate) fn custom(message: impl std::fmt::Display) -> Self {
        <serde_json::Error as serde::ser::Error>::custom(message).into()
    }

    /// The underlying serializer error
    #[must_use]
    pub fn inner(&self) -> &serde_json::Error {
        &self.source
    }
}
