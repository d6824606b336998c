//! Placing a patch document on an outgoing request

use crate::document::PatchDocument;
use crate::error::SerializationError;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Request, RequestBuilder};

/// Media type for JSON Merge Patch bodies (RFC 7396)
pub const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

/// Set `document` as the body of `request` with the merge patch content type
///
/// The request method is left alone; callers send patches with `PATCH`.
///
/// # Errors
///
/// [`SerializationError`] if the document cannot be written out. The request
/// is not modified in that case.
pub fn attach_as_request_body(
    document: &PatchDocument,
    request: &mut Request,
) -> Result<(), SerializationError> {
    let body = document.to_vec()?;
    request.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(MERGE_PATCH_CONTENT_TYPE),
    );
    *request.body_mut() = Some(body.into());
    Ok(())
}

/// Builder-style counterpart of [`attach_as_request_body`]
pub trait MergePatchRequestExt: Sized {
    /// Use `document` as the merge patch body
    ///
    /// # Errors
    ///
    /// [`SerializationError`] if the document cannot be written out.
    fn merge_patch(self, document: &PatchDocument) -> Result<Self, SerializationError>;
}

impl MergePatchRequestExt for RequestBuilder {
    fn merge_patch(self, document: &PatchDocument) -> Result<Self, SerializationError> {
        let body = document.to_vec()?;
        Ok(self.header(CONTENT_TYPE, MERGE_PATCH_CONTENT_TYPE).body(body))
    }
}
