//! Profile of the authenticated user.

mod handlers;

pub use handlers::{get_profile, update_profile};
