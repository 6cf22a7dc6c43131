//! Test suite for verifying fast-email-confirmation integrations.
//!
//! This module provides a reusable test suite that users can invoke to verify
//! their [`EmailBackend`] implementations uphold the address and key
//! invariants, and that the confirmation endpoint behaves end to end.
//!
//! # Usage
//!
//! Implement the [`TestContext`] trait for your test infrastructure, then
//! generate one test per case with [`test_suite!`](crate::test_suite):
//!
//! ```ignore
//! use fast_email_confirmation::testing::{Outbox, RecordingHooks, TestContext};
//! use fast_email_confirmation::{ConfirmationConfig, EmailConfirmation};
//! use reqwest::Client;
//!
//! struct MyContext { /* your app state */ }
//!
//! impl TestContext for MyContext {
//!     type Backend = MyBackend;
//!
//!     async fn spawn(config: ConfirmationConfig) -> (String, Client, Self) {
//!         // Start your app, return (base_url, client, context)
//!     }
//!     // ... other required methods
//! }
//!
//! fast_email_confirmation::test_suite!(MyContext);
//! ```
//!
//! The client returned by `spawn` must not follow redirects.
//!
//! [`EmailBackend`]: crate::EmailBackend

pub mod confirmation;
pub mod endpoint;
mod memory;
pub mod registry;

pub use memory::{MemoryBackend, MemoryBackendError, MemoryContext, MemoryOwner};

use reqwest::Client;
use std::future::Future;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    ConfirmationConfig, ConfirmationHooks, EmailAddress, EmailBackend, EmailConfirmation,
    EmailSendError, EmailSender,
};

/// A message captured by [`Outbox`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient address.
    pub to: String,
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub body: String,
}

/// Email sender that keeps every message in memory.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl Outbox {
    /// Every message sent so far, oldest first.
    pub fn messages(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl EmailSender for Outbox {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailSendError> {
        self.sent
            .lock()
            .map_err(|_| EmailSendError::Transport("outbox lock poisoned".to_string()))?
            .push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

/// Hooks that record every confirmed address.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    confirmed: Arc<Mutex<Vec<EmailAddress>>>,
}

impl RecordingHooks {
    /// Addresses passed to `on_email_confirmed`, oldest first.
    pub fn confirmed(&self) -> Vec<EmailAddress> {
        self.confirmed
            .lock()
            .map(|confirmed| confirmed.clone())
            .unwrap_or_default()
    }
}

impl ConfirmationHooks for RecordingHooks {
    fn on_email_confirmed(&self, address: &EmailAddress) -> impl Future<Output = ()> + Send {
        if let Ok(mut confirmed) = self.confirmed.lock() {
            confirmed.push(address.clone());
        }
        async {}
    }
}

/// The instance type the suite drives.
pub type TestConfirmation<B> = EmailConfirmation<B, RecordingHooks, Outbox>;

/// Configuration used by suite cases: a 10-day expiry window.
pub fn suite_config() -> ConfirmationConfig {
    ConfirmationConfig {
        expiry_days: 10,
        ..Default::default()
    }
}

/// Context trait that test implementations must provide.
///
/// This abstracts away the concrete app infrastructure, allowing the test suite
/// to run against any backend that implements [`crate::EmailBackend`].
pub trait TestContext: Sized + Send + Sync {
    /// The backend under test.
    type Backend: EmailBackend;

    /// Spawn the test app serving `confirmation.routes()` and return
    /// (base_url, http_client, context).
    fn spawn(config: ConfirmationConfig) -> impl Future<Output = (String, Client, Self)> + Send;

    /// The instance wired into the spawned app.
    fn confirmation(&self) -> &TestConfirmation<Self::Backend>;

    /// The sender wired into the spawned app.
    fn outbox(&self) -> &Outbox;

    /// The hooks wired into the spawned app.
    fn hooks(&self) -> &RecordingHooks;

    /// Create a user with an empty canonical email.
    fn owner_create(
        &self,
        username: &str,
    ) -> impl Future<Output = <Self::Backend as EmailBackend>::Owner> + Send;

    /// Store an address directly, bypassing confirmation.
    fn email_address_insert(
        &self,
        owner_id: Uuid,
        email: &str,
        verified: bool,
        primary: bool,
    ) -> impl Future<Output = EmailAddress> + Send;

    /// Move a key's issue time into the past (for testing expiration).
    fn confirmation_token_backdate(
        &self,
        key: &str,
        by: chrono::Duration,
    ) -> impl Future<Output = ()> + Send;
}

/// Test suite for fast-email-confirmation.
///
/// Run all tests with `Suite::<YourContext>::test_all()`.
pub struct Suite<C: TestContext> {
    _marker: std::marker::PhantomData<C>,
}

impl<C: TestContext> Suite<C> {
    /// Run all suite tests.
    pub async fn test_all() {
        registry::add_creates_address_and_sends_confirmation::<C>().await;
        registry::add_duplicate_returns_none_and_sends_nothing::<C>().await;
        registry::primary_get_returns_single_primary::<C>().await;
        registry::owners_for_excludes_unverified_records::<C>().await;
        registry::promote_replaces_existing_primary::<C>().await;
        registry::promote_conditional_keeps_existing_primary::<C>().await;

        confirmation::consume_verifies_promotes_and_notifies::<C>().await;
        confirmation::consume_keeps_existing_primary::<C>().await;
        confirmation::consume_rejects_expired_key::<C>().await;
        confirmation::consume_cannot_be_replayed::<C>().await;
        confirmation::sweep_expired_removes_only_expired_keys::<C>().await;

        endpoint::confirm_page_confirms_address::<C>().await;
        endpoint::confirm_page_rejects_bad_key::<C>().await;
        endpoint::confirm_page_lowercases_key::<C>().await;
        endpoint::confirm_redirects_when_configured::<C>().await;
    }
}

/// Generates individual test functions for the suite.
///
/// This macro creates a `#[tokio::test]` function for each test case in the suite,
/// ensuring they run individually and report separate results.
///
/// # Example
///
/// ```rust,ignore
/// fast_email_confirmation::test_suite!(MyContext);
/// ```
#[macro_export]
macro_rules! test_suite {
    ($context:ty) => {
        #[tokio::test]
        async fn add_creates_address_and_sends_confirmation() {
            $crate::testing::registry::add_creates_address_and_sends_confirmation::<$context>().await;
        }

        #[tokio::test]
        async fn add_duplicate_returns_none_and_sends_nothing() {
            $crate::testing::registry::add_duplicate_returns_none_and_sends_nothing::<$context>().await;
        }

        #[tokio::test]
        async fn primary_get_returns_single_primary() {
            $crate::testing::registry::primary_get_returns_single_primary::<$context>().await;
        }

        #[tokio::test]
        async fn owners_for_excludes_unverified_records() {
            $crate::testing::registry::owners_for_excludes_unverified_records::<$context>().await;
        }

        #[tokio::test]
        async fn promote_replaces_existing_primary() {
            $crate::testing::registry::promote_replaces_existing_primary::<$context>().await;
        }

        #[tokio::test]
        async fn promote_conditional_keeps_existing_primary() {
            $crate::testing::registry::promote_conditional_keeps_existing_primary::<$context>().await;
        }

        #[tokio::test]
        async fn consume_verifies_promotes_and_notifies() {
            $crate::testing::confirmation::consume_verifies_promotes_and_notifies::<$context>().await;
        }

        #[tokio::test]
        async fn consume_keeps_existing_primary() {
            $crate::testing::confirmation::consume_keeps_existing_primary::<$context>().await;
        }

        #[tokio::test]
        async fn consume_rejects_expired_key() {
            $crate::testing::confirmation::consume_rejects_expired_key::<$context>().await;
        }

        #[tokio::test]
        async fn consume_cannot_be_replayed() {
            $crate::testing::confirmation::consume_cannot_be_replayed::<$context>().await;
        }

        #[tokio::test]
        async fn sweep_expired_removes_only_expired_keys() {
            $crate::testing::confirmation::sweep_expired_removes_only_expired_keys::<$context>().await;
        }

        #[tokio::test]
        async fn confirm_page_confirms_address() {
            $crate::testing::endpoint::confirm_page_confirms_address::<$context>().await;
        }

        #[tokio::test]
        async fn confirm_page_rejects_bad_key() {
            $crate::testing::endpoint::confirm_page_rejects_bad_key::<$context>().await;
        }

        #[tokio::test]
        async fn confirm_page_lowercases_key() {
            $crate::testing::endpoint::confirm_page_lowercases_key::<$context>().await;
        }

        #[tokio::test]
        async fn confirm_redirects_when_configured() {
            $crate::testing::endpoint::confirm_redirects_when_configured::<$context>().await;
        }
    };
}
