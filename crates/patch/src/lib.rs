//! JSON Merge Patch construction for partial-update requests
//!
//! An update request should carry only the attributes the caller wants to
//! change. JSON Merge Patch (RFC 7396) gives the wire format that meaning:
//!
//! - a key that is **absent** leaves the attribute unchanged
//! - a key set to **`null`** clears the attribute
//! - a key set to a **value** replaces the attribute (objects and arrays are
//!   replaced whole)
//!
//! Plain `Option<T>` fields cannot express all three, so patch structs are
//! built from [`Field<T>`], and [`construct`] turns them into a
//! [`PatchDocument`] that holds exactly the populated fields.
//!
//! # Example
//!
//! ```rust
//! use partnersell_patch::{Field, MergePatch, merge_patch};
//! use serde_json::json;
//!
//! merge_patch! {
//!     #[derive(Debug, Clone, Default)]
//!     pub struct ProfilePatch {
//!         pub display_name: String,
//!         pub website: String,
//!         pub tags: Vec<String>,
//!     }
//! }
//!
//! let mut patch = ProfilePatch::default();
//! patch.display_name = Field::Value("Acme".to_string());
//! patch.website = Field::Null;
//!
//! let document = patch.to_patch_document()?;
//! assert_eq!(document.into_value(), json!({"display_name": "Acme", "website": null}));
//! # Ok::<(), partnersell_patch::SerializationError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Lets `merge_patch!` name this crate by its public path from inside its own tests.
extern crate self as partnersell_patch;

pub mod builder;
pub mod document;
pub mod error;
pub mod field;
mod finite;
pub mod request;

pub use builder::{MergePatch, construct};
pub use document::{PatchDocument, apply_merge_patch};
pub use error::SerializationError;
pub use field::Field;
pub use request::{MERGE_PATCH_CONTENT_TYPE, MergePatchRequestExt, attach_as_request_body};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    merge_patch! {
        #[derive(Debug, Default)]
        struct ListingPatch {
            title: String,
            tags: Vec<String>,
        }
    }

    #[test]
    fn test_patch_types_are_send_sync() {
        assert_send_sync::<Field<String>>();
        assert_send_sync::<Field<Vec<serde_json::Value>>>();
        assert_send_sync::<PatchDocument>();
        assert_send_sync::<SerializationError>();
        assert_send_sync::<ListingPatch>();
    }
}
