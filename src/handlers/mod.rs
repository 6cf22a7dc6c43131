//! Confirmation HTTP handlers.

pub mod confirm;

pub use confirm::{EMAIL_CONFIRM_PATH, confirm_routes, email_confirm_get};
