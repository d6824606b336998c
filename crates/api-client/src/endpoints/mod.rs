//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one group of service endpoints.
//!
//! | Module | Base path | Description |
//! |--------|-----------|-------------|
//! | `registrations` | `registration` | Partner company registrations |

pub mod registrations;

pub use registrations::{
    CreateRegistrationRequest, PrimaryContact, Registration, RegistrationPatch, RegistrationsApi,
};
