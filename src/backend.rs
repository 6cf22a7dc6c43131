//! Backend trait abstraction for storage-agnostic address management.
//!
//! This module defines the records stored by the crate and the traits that
//! let it work with any database or storage backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use uuid::Uuid;

/// An email address attached to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Record identifier.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// The address, exactly as it was added.
    pub email: String,
    /// Whether ownership was proven through a confirmation key.
    pub verified: bool,
    /// Whether this is the owner's canonical address. At most one per owner.
    pub primary: bool,
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.email, self.owner_id)
    }
}

/// A confirmation key issued for an [`EmailAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationToken {
    /// Lowercase confirmation key.
    pub key: String,
    /// The address this key confirms.
    pub email_address_id: Uuid,
    /// When the key was issued.
    pub issued_at: DateTime<Utc>,
}

impl ConfirmationToken {
    /// When this key stops being accepted.
    pub fn expires_at(&self, window: chrono::Duration) -> DateTime<Utc> {
        self.issued_at
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns `true` once `now` has reached the end of the expiry window.
    pub fn is_expired(&self, window: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.expires_at(window) <= now
    }
}

/// Minimal user interface required by the crate.
///
/// # Example
///
/// ```rust,ignore
/// use fast_email_confirmation::EmailOwner;
/// use uuid::Uuid;
///
/// #[derive(Clone)]
/// struct MyUser {
///     id: Uuid,
///     username: String,
///     email: String,
/// }
///
/// impl EmailOwner for MyUser {
///     fn id(&self) -> Uuid { self.id }
///     fn username(&self) -> &str { &self.username }
///     fn email(&self) -> &str { &self.email }
/// }
/// ```
pub trait EmailOwner: Send + Sync + Clone {
    /// Returns the user's unique identifier.
    fn id(&self) -> Uuid;

    /// Returns a display name for templates.
    fn username(&self) -> &str;

    /// Returns the user's canonical email, kept in sync with the primary address.
    fn email(&self) -> &str;
}

/// Backend storage trait for addresses and confirmation keys.
///
/// Methods suffixed `_atomic` must run as a single unit of work (a database
/// transaction or an equivalent lock) so that concurrent callers cannot
/// break the uniqueness and single-primary invariants.
///
/// Keys are always handed to the backend in lowercase.
pub trait EmailBackend: Clone + Send + Sync + 'static {
    /// The user type stored in this backend.
    type Owner: EmailOwner;

    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Find a user by their unique ID.
    fn owner_get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Self::Owner>, Self::Error>> + Send;

    /// Atomically create an unverified, non-primary address for an owner.
    ///
    /// Returns `None` without writing anything if the owner already has a
    /// record with exactly this address.
    fn email_address_create_atomic(
        &self,
        owner_id: Uuid,
        email: &str,
    ) -> impl Future<Output = Result<Option<EmailAddress>, Self::Error>> + Send;

    /// Find an address by its ID.
    fn email_address_get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<EmailAddress>, Self::Error>> + Send;

    /// Return the owner's primary address, if any.
    fn email_address_primary_get(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = Result<Option<EmailAddress>, Self::Error>> + Send;

    /// List every address owned by a user.
    fn email_address_list_by_owner(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = Result<Vec<EmailAddress>, Self::Error>> + Send;

    /// List every verified record whose address equals `email` exactly.
    fn email_address_list_verified_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Vec<EmailAddress>, Self::Error>> + Send;

    /// Atomically make an address its owner's primary one.
    ///
    /// When `conditional` is `true` and the owner already has a different
    /// primary address, nothing changes and `false` is returned. Otherwise
    /// every other primary of the owner is cleared, this one is set, the
    /// owner's canonical email is updated, and `true` is returned.
    ///
    /// Returns `None` if no address has this id.
    fn email_address_promote_atomic(
        &self,
        id: Uuid,
        conditional: bool,
    ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send;

    /// Store a confirmation key for an address, replacing any previous key
    /// for the same address.
    fn confirmation_token_issue(
        &self,
        email_address_id: Uuid,
        key: &str,
        issued_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ConfirmationToken, Self::Error>> + Send;

    /// Find a confirmation key, expired or not.
    fn confirmation_token_find(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<ConfirmationToken>, Self::Error>> + Send;

    /// Find the live confirmation key of an address, if any.
    fn confirmation_token_find_by_address(
        &self,
        email_address_id: Uuid,
    ) -> impl Future<Output = Result<Option<ConfirmationToken>, Self::Error>> + Send;

    /// Atomically delete a key and mark its address verified.
    ///
    /// Returns the verified address, or `None` if the key no longer exists.
    fn confirmation_token_consume_atomic(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<EmailAddress>, Self::Error>> + Send;

    /// Delete every key issued at or before `cutoff`. Returns how many were removed.
    fn confirmation_token_delete_issued_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_issued(ago: Duration) -> ConfirmationToken {
        ConfirmationToken {
            key: "abc123".to_string(),
            email_address_id: Uuid::new_v4(),
            issued_at: Utc::now() - ago,
        }
    }

    #[test]
    fn fresh_token_is_not_expired() {
        let token = token_issued(Duration::zero());
        assert!(!token.is_expired(Duration::days(10), Utc::now()));
    }

    #[test]
    fn token_past_window_is_expired() {
        let token = token_issued(Duration::days(11));
        assert!(token.is_expired(Duration::days(10), Utc::now()));
    }

    #[test]
    fn token_expires_exactly_at_window_end() {
        let token = token_issued(Duration::zero());
        let window = Duration::days(3);
        assert!(token.is_expired(window, token.issued_at + window));
        assert!(!token.is_expired(window, token.issued_at + window - Duration::seconds(1)));
    }

    #[test]
    fn email_address_display_names_owner() {
        let owner_id = Uuid::new_v4();
        let address = EmailAddress {
            id: Uuid::new_v4(),
            owner_id,
            email: "daphne@example.com".to_string(),
            verified: false,
            primary: false,
        };
        assert_eq!(address.to_string(), format!("daphne@example.com ({owner_id})"));
    }
}
