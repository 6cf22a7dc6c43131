//! In-memory backend and the suite context built on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;
use chrono::{DateTime, Utc};
use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

use super::{Outbox, RecordingHooks, TestConfirmation, TestContext};
use crate::{
    ConfirmationConfig, ConfirmationToken, EmailAddress, EmailBackend, EmailConfirmation,
    EmailOwner,
};

/// Errors raised by [`MemoryBackend`].
#[derive(Debug, Error)]
pub enum MemoryBackendError {
    #[error("memory backend lock poisoned")]
    Poisoned,
}

/// User stored by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOwner {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl EmailOwner for MemoryOwner {
    fn id(&self) -> Uuid {
        self.id
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn email(&self) -> &str {
        &self.email
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    owners: HashMap<Uuid, MemoryOwner>,
    addresses: Vec<EmailAddress>,
    tokens: HashMap<String, ConfirmationToken>,
}

impl MemoryState {
    /// Make `id` the only primary address of its owner and sync the owner's email.
    fn primary_set(&mut self, id: Uuid) {
        let Some(target) = self.addresses.iter().find(|a| a.id == id).cloned() else {
            return;
        };

        for address in self
            .addresses
            .iter_mut()
            .filter(|a| a.owner_id == target.owner_id)
        {
            address.primary = address.id == id;
        }

        if let Some(owner) = self.owners.get_mut(&target.owner_id) {
            owner.email = target.email;
        }
    }
}

/// [`EmailBackend`] keeping everything behind a single mutex.
///
/// Every trait method runs under one lock acquisition, which makes the
/// `_atomic` operations atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, MemoryBackendError> {
        self.state.lock().map_err(|_| MemoryBackendError::Poisoned)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory backend lock")
    }

    /// Create a user with an empty canonical email.
    pub fn owner_create(&self, username: &str) -> MemoryOwner {
        let owner = MemoryOwner {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: String::new(),
        };
        self.state().owners.insert(owner.id, owner.clone());
        owner
    }

    /// Fetch a user.
    pub fn owner(&self, id: Uuid) -> Option<MemoryOwner> {
        self.state().owners.get(&id).cloned()
    }

    /// Store an address directly, bypassing duplicate checks and confirmation.
    pub fn email_address_insert(
        &self,
        owner_id: Uuid,
        email: &str,
        verified: bool,
        primary: bool,
    ) -> EmailAddress {
        let address = EmailAddress {
            id: Uuid::new_v4(),
            owner_id,
            email: email.to_string(),
            verified,
            primary: false,
        };

        let mut state = self.state();
        state.addresses.push(address.clone());
        if primary {
            state.primary_set(address.id);
            return EmailAddress {
                primary: true,
                ..address
            };
        }
        address
    }

    /// Fetch an address.
    pub fn address(&self, id: Uuid) -> Option<EmailAddress> {
        self.state().addresses.iter().find(|a| a.id == id).cloned()
    }

    /// Every address of an owner.
    pub fn addresses_for_owner(&self, owner_id: Uuid) -> Vec<EmailAddress> {
        self.state()
            .addresses
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect()
    }

    /// The live key of an address, if any.
    pub fn token_for_address(&self, email_address_id: Uuid) -> Option<ConfirmationToken> {
        self.state()
            .tokens
            .values()
            .find(|t| t.email_address_id == email_address_id)
            .cloned()
    }

    /// Move a key's issue time into the past.
    pub fn token_backdate(&self, key: &str, by: chrono::Duration) {
        if let Some(token) = self.state().tokens.get_mut(&key.to_lowercase()) {
            token.issued_at -= by;
        }
    }
}

impl EmailBackend for MemoryBackend {
    type Owner = MemoryOwner;
    type Error = MemoryBackendError;

    async fn owner_get_by_id(&self, id: Uuid) -> Result<Option<MemoryOwner>, Self::Error> {
        Ok(self.lock()?.owners.get(&id).cloned())
    }

    async fn email_address_create_atomic(
        &self,
        owner_id: Uuid,
        email: &str,
    ) -> Result<Option<EmailAddress>, Self::Error> {
        let mut state = self.lock()?;

        if state
            .addresses
            .iter()
            .any(|a| a.owner_id == owner_id && a.email == email)
        {
            return Ok(None);
        }

        let address = EmailAddress {
            id: Uuid::new_v4(),
            owner_id,
            email: email.to_string(),
            verified: false,
            primary: false,
        };
        state.addresses.push(address.clone());
        Ok(Some(address))
    }

    async fn email_address_get_by_id(&self, id: Uuid) -> Result<Option<EmailAddress>, Self::Error> {
        Ok(self.lock()?.addresses.iter().find(|a| a.id == id).cloned())
    }

    async fn email_address_primary_get(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<EmailAddress>, Self::Error> {
        Ok(self
            .lock()?
            .addresses
            .iter()
            .find(|a| a.owner_id == owner_id && a.primary)
            .cloned())
    }

    async fn email_address_list_by_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<EmailAddress>, Self::Error> {
        Ok(self
            .lock()?
            .addresses
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn email_address_list_verified_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<EmailAddress>, Self::Error> {
        Ok(self
            .lock()?
            .addresses
            .iter()
            .filter(|a| a.verified && a.email == email)
            .cloned()
            .collect())
    }

    async fn email_address_promote_atomic(
        &self,
        id: Uuid,
        conditional: bool,
    ) -> Result<Option<bool>, Self::Error> {
        let mut state = self.lock()?;

        let Some(owner_id) = state
            .addresses
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.owner_id)
        else {
            return Ok(None);
        };

        let other_primary = state
            .addresses
            .iter()
            .any(|a| a.owner_id == owner_id && a.primary && a.id != id);
        if conditional && other_primary {
            return Ok(Some(false));
        }

        state.primary_set(id);
        Ok(Some(true))
    }

    async fn confirmation_token_issue(
        &self,
        email_address_id: Uuid,
        key: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<ConfirmationToken, Self::Error> {
        let mut state = self.lock()?;
        state
            .tokens
            .retain(|_, t| t.email_address_id != email_address_id);

        let token = ConfirmationToken {
            key: key.to_string(),
            email_address_id,
            issued_at,
        };
        state.tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    async fn confirmation_token_find(
        &self,
        key: &str,
    ) -> Result<Option<ConfirmationToken>, Self::Error> {
        Ok(self.lock()?.tokens.get(key).cloned())
    }

    async fn confirmation_token_find_by_address(
        &self,
        email_address_id: Uuid,
    ) -> Result<Option<ConfirmationToken>, Self::Error> {
        Ok(self
            .lock()?
            .tokens
            .values()
            .find(|t| t.email_address_id == email_address_id)
            .cloned())
    }

    async fn confirmation_token_consume_atomic(
        &self,
        key: &str,
    ) -> Result<Option<EmailAddress>, Self::Error> {
        let mut state = self.lock()?;

        let Some(token) = state.tokens.remove(key) else {
            return Ok(None);
        };

        Ok(state
            .addresses
            .iter_mut()
            .find(|a| a.id == token.email_address_id)
            .map(|address| {
                address.verified = true;
                address.clone()
            }))
    }

    async fn confirmation_token_delete_issued_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, Self::Error> {
        let mut state = self.lock()?;
        let before = state.tokens.len();
        state.tokens.retain(|_, t| t.issued_at > cutoff);
        Ok((before - state.tokens.len()) as u64)
    }
}

/// [`TestContext`] serving the confirmation routes on top of [`MemoryBackend`].
pub struct MemoryContext {
    backend: MemoryBackend,
    confirmation: TestConfirmation<MemoryBackend>,
    outbox: Outbox,
    hooks: RecordingHooks,
}

impl TestContext for MemoryContext {
    type Backend = MemoryBackend;

    async fn spawn(config: ConfirmationConfig) -> (String, Client, Self) {
        let backend = MemoryBackend::new();
        let outbox = Outbox::default();
        let hooks = RecordingHooks::default();
        let confirmation = EmailConfirmation::new(config, backend.clone())
            .expect("valid test config")
            .with_email_sender(outbox.clone())
            .with_hooks(hooks.clone());

        let app: Router = confirmation.routes();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("http client");

        let ctx = Self {
            backend,
            confirmation,
            outbox,
            hooks,
        };
        (format!("http://{addr}"), client, ctx)
    }

    fn confirmation(&self) -> &TestConfirmation<MemoryBackend> {
        &self.confirmation
    }

    fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    fn hooks(&self) -> &RecordingHooks {
        &self.hooks
    }

    async fn owner_create(&self, username: &str) -> MemoryOwner {
        self.backend.owner_create(username)
    }

    async fn email_address_insert(
        &self,
        owner_id: Uuid,
        email: &str,
        verified: bool,
        primary: bool,
    ) -> EmailAddress {
        self.backend
            .email_address_insert(owner_id, email, verified, primary)
    }

    async fn confirmation_token_backdate(&self, key: &str, by: chrono::Duration) {
        self.backend.token_backdate(key, by);
    }
}

#[cfg(test)]
mod suite {
    crate::test_suite!(super::MemoryContext);
}
