//! Confirmation keys: issuance, consumption and expiry.

use chrono::Utc;

use crate::{
    ConfirmationContext, ConfirmationHooks, ConfirmationTemplates, ConfirmationToken,
    EmailAddress, EmailBackend, EmailConfirmation, EmailOwner, EmailSender,
    error::ConfirmationError,
    templates::{ConfirmationTemplate, subject_single_line},
    tokens::{confirmation_key_generate, confirmation_key_normalize},
    verification::activate_url_build,
};

/// Confirmation key issuance, consumption and cleanup.
///
/// Obtained through [`EmailConfirmation::issuer`].
///
/// A key is live from issuance until it is consumed. Once the expiry window
/// has passed it is rejected, but it is only deleted by
/// [`sweep_expired`](Self::sweep_expired).
pub struct ConfirmationIssuer<'a, B, H, E, T>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    inner: &'a EmailConfirmation<B, H, E, T>,
}

impl<'a, B, H, E, T> ConfirmationIssuer<'a, B, H, E, T>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    pub(crate) fn new(inner: &'a EmailConfirmation<B, H, E, T>) -> Self {
        Self { inner }
    }

    /// Issue a new key for `address` and mail the activation link to it.
    ///
    /// Any previous key for the address is replaced. If delivery fails the
    /// error is returned and the stored key stays valid for its window.
    pub async fn issue(&self, address: &EmailAddress) -> Result<ConfirmationToken, ConfirmationError> {
        let owner = self
            .inner
            .backend()
            .owner_get_by_id(address.owner_id)
            .await
            .map_err(ConfirmationError::from_backend)?
            .ok_or(ConfirmationError::OwnerNotFound)?;

        self.issue_for_owner(address, &owner).await
    }

    pub(crate) async fn issue_for_owner(
        &self,
        address: &EmailAddress,
        owner: &B::Owner,
    ) -> Result<ConfirmationToken, ConfirmationError> {
        let key = confirmation_key_generate(&address.email);
        self.issue_with_key(address, owner, &key).await
    }

    pub(crate) async fn issue_with_key(
        &self,
        address: &EmailAddress,
        owner: &B::Owner,
        key: &str,
    ) -> Result<ConfirmationToken, ConfirmationError> {
        let config = self.inner.config();

        let token = self
            .inner
            .backend()
            .confirmation_token_issue(address.id, &confirmation_key_normalize(key), Utc::now())
            .await
            .map_err(ConfirmationError::from_backend)?;

        let context = ConfirmationContext {
            owner_id: owner.id(),
            owner: owner.username().to_string(),
            activate_url: activate_url_build(config, key),
            site_domain: config.site_domain.clone(),
            site_name: config.site_name.clone(),
            key: key.to_string(),
        };

        let templates = self.inner.templates();
        let subject = templates
            .render(ConfirmationTemplate::Subject, &context)
            .map_err(|e| ConfirmationError::Template(e.to_string()))?;
        let body = templates
            .render(ConfirmationTemplate::Message, &context)
            .map_err(|e| ConfirmationError::Template(e.to_string()))?;

        self.inner
            .email_sender()
            .send(&address.email, &subject_single_line(&subject), &body)
            .await?;

        tracing::info!(
            owner_id = %address.owner_id,
            email_address_id = %address.id,
            "Confirmation email sent"
        );

        Ok(token)
    }

    /// Confirm the address a key was issued for.
    ///
    /// The key is matched case-insensitively. Returns `Ok(None)` for unknown,
    /// already consumed or expired keys; nothing is changed in that case.
    /// On success the key is deleted, the address is verified and, if its
    /// owner has no primary address yet, promoted.
    pub async fn consume(&self, key: &str) -> Result<Option<EmailAddress>, ConfirmationError> {
        let key = confirmation_key_normalize(key);
        let backend = self.inner.backend();

        let Some(token) = backend
            .confirmation_token_find(&key)
            .await
            .map_err(ConfirmationError::from_backend)?
        else {
            tracing::debug!("Unknown confirmation key");
            return Ok(None);
        };

        if token.is_expired(self.inner.config().expiry_window(), Utc::now()) {
            tracing::debug!(
                email_address_id = %token.email_address_id,
                issued_at = %token.issued_at,
                "Expired confirmation key"
            );
            return Ok(None);
        }

        let Some(mut address) = backend
            .confirmation_token_consume_atomic(&key)
            .await
            .map_err(ConfirmationError::from_backend)?
        else {
            // Consumed by a concurrent request between lookup and consume.
            return Ok(None);
        };

        self.inner.registry().promote(&mut address, true).await?;

        tracing::info!(
            owner_id = %address.owner_id,
            email_address_id = %address.id,
            primary = address.primary,
            "Email address confirmed"
        );

        self.inner.hooks().on_email_confirmed(&address).await;

        Ok(Some(address))
    }

    /// Delete every key older than the expiry window. Returns how many were removed.
    pub async fn sweep_expired(&self) -> Result<u64, ConfirmationError> {
        let cutoff = Utc::now() - self.inner.config().expiry_window();

        let removed = self
            .inner
            .backend()
            .confirmation_token_delete_issued_before(cutoff)
            .await
            .map_err(ConfirmationError::from_backend)?;

        tracing::info!(removed, %cutoff, "Expired confirmation keys deleted");
        Ok(removed)
    }
}
