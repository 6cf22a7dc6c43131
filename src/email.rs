//! Email validation.

use crate::error::ConfirmationError;
use email_address::{EmailAddress, Options};

/// Validate an email address.
///
/// - Trims whitespace
/// - Validates RFC 5322 compliance
/// - Rejects display-name forms such as `Name <user@example.com>`
///
/// Case is preserved: duplicate detection compares addresses exactly as stored.
pub fn email_validate(email: &str) -> Result<String, ConfirmationError> {
    let trimmed = email.trim();

    let parsed = EmailAddress::parse_with_options(trimmed, Options::default().without_display_text())
        .map_err(|_| ConfirmationError::InvalidEmail)?;

    Ok(parsed.as_str().to_string())
}
