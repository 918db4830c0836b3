//! Business logic: credential resolution, registration and profile changes.

pub mod accounts;
pub mod credentials;

pub use accounts::{AccessResponse, AccountService, RegisterRequest, UpdateProfileRequest};
pub use credentials::{CredentialResolver, LoginResponse};
