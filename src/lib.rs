//! SecurePulse onboarding client
//!
//! Talks to the SecurePulse Identity Service to onboard a Microsoft 365
//! tenant:
//! - `identity` - HTTP client for `/api/onboard`, `/api/tenant/{id}/status`
//!   and `/api/tenants`, plus the bounded status poll
//! - `consent` - hand-off to the Entra ID admin consent page and detection of
//!   the return trip
//! - `session` - the store that carries the pending tenant id across it
//! - `config` - service URL and poll settings

pub mod config;
pub mod consent;
pub mod error;
pub mod identity;
pub mod session;

pub use error::{BackendError, Result, SecurePulseError};
pub use identity::IdentityClient;
