//! Email addresses attached to user accounts.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
    ConfirmationHooks, ConfirmationTemplates, EmailAddress, EmailBackend, EmailConfirmation,
    EmailOwner, EmailSender, email::email_validate, error::ConfirmationError,
};

/// Address creation, lookups and primary promotion.
///
/// Obtained through [`EmailConfirmation::registry`].
pub struct AddressRegistry<'a, B, H, E, T>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    inner: &'a EmailConfirmation<B, H, E, T>,
}

impl<'a, B, H, E, T> AddressRegistry<'a, B, H, E, T>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    pub(crate) fn new(inner: &'a EmailConfirmation<B, H, E, T>) -> Self {
        Self { inner }
    }

    /// Attach an address to `owner` and mail a confirmation key to it.
    ///
    /// Returns `Ok(None)` without sending anything when the owner already has
    /// this exact address.
    pub async fn add(
        &self,
        owner: &B::Owner,
        email: &str,
    ) -> Result<Option<EmailAddress>, ConfirmationError> {
        let email = email_validate(email)?;

        let created = self
            .inner
            .backend()
            .email_address_create_atomic(owner.id(), &email)
            .await
            .map_err(ConfirmationError::from_backend)?;

        let Some(address) = created else {
            tracing::debug!(owner_id = %owner.id(), "Address already attached to owner");
            return Ok(None);
        };

        self.inner.issuer().issue_for_owner(&address, owner).await?;

        Ok(Some(address))
    }

    /// Like [`add`](Self::add), but also makes the new address primary.
    pub async fn add_primary(
        &self,
        owner: &B::Owner,
        email: &str,
    ) -> Result<Option<EmailAddress>, ConfirmationError> {
        let Some(mut address) = self.add(owner, email).await? else {
            return Ok(None);
        };
        self.promote(&mut address, false).await?;
        Ok(Some(address))
    }

    /// Return the owner's primary address, if any.
    pub async fn primary(&self, owner_id: Uuid) -> Result<Option<EmailAddress>, ConfirmationError> {
        self.inner
            .backend()
            .email_address_primary_get(owner_id)
            .await
            .map_err(ConfirmationError::from_backend)
    }

    /// Every distinct owner holding a verified record for exactly `email`.
    pub async fn owners_for(&self, email: &str) -> Result<BTreeSet<Uuid>, ConfirmationError> {
        let verified = self
            .inner
            .backend()
            .email_address_list_verified_by_email(email)
            .await
            .map_err(ConfirmationError::from_backend)?;

        Ok(verified
            .into_iter()
            .filter(|address| address.verified && address.email == email)
            .map(|address| address.owner_id)
            .collect())
    }

    /// The owner's verified addresses, primary first, then alphabetical.
    pub async fn verified(&self, owner_id: Uuid) -> Result<Vec<EmailAddress>, ConfirmationError> {
        let mut addresses: Vec<_> = self
            .inner
            .backend()
            .email_address_list_by_owner(owner_id)
            .await
            .map_err(ConfirmationError::from_backend)?
            .into_iter()
            .filter(|address| address.verified)
            .collect();

        addresses.sort_by(|a, b| b.primary.cmp(&a.primary).then_with(|| a.email.cmp(&b.email)));
        Ok(addresses)
    }

    /// Make `address` its owner's primary address.
    ///
    /// Unconditional promotion always succeeds and replaces any existing
    /// primary. Conditional promotion returns `false` and changes nothing when
    /// the owner already has another primary address. Fails with
    /// [`ConfirmationError::AddressNotFound`] if the record no longer exists.
    pub async fn promote(
        &self,
        address: &mut EmailAddress,
        conditional: bool,
    ) -> Result<bool, ConfirmationError> {
        let promoted = self
            .inner
            .backend()
            .email_address_promote_atomic(address.id, conditional)
            .await
            .map_err(ConfirmationError::from_backend)?
            .ok_or(ConfirmationError::AddressNotFound)?;

        if promoted {
            address.primary = true;
            tracing::info!(
                owner_id = %address.owner_id,
                email_address_id = %address.id,
                conditional,
                "Address promoted to primary"
            );
        }

        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{MemoryBackend, Outbox};
    use crate::{ConfirmationConfig, EmailConfirmation, EmailOwner};

    fn setup() -> (EmailConfirmation<MemoryBackend, (), Outbox>, MemoryBackend, Outbox) {
        let backend = MemoryBackend::new();
        let outbox = Outbox::default();
        let ec = EmailConfirmation::new(ConfirmationConfig::default(), backend.clone())
            .expect("config")
            .with_email_sender(outbox.clone());
        (ec, backend, outbox)
    }

    #[tokio::test]
    async fn add_creates_record_and_sends_one_message() {
        let (ec, backend, outbox) = setup();
        let daphne = backend.owner_create("daphne");

        let address = ec
            .registry()
            .add(&daphne, "daphne@example.com")
            .await
            .unwrap()
            .expect("created");

        assert!(!address.verified);
        assert!(!address.primary);
        assert_eq!(outbox.messages().len(), 1);
        assert_eq!(outbox.messages()[0].to, "daphne@example.com");
        assert!(
            backend
                .token_for_address(address.id)
                .is_some(),
            "add must issue a confirmation key"
        );
    }

    #[tokio::test]
    async fn duplicate_add_returns_none_without_sending() {
        let (ec, backend, outbox) = setup();
        let daphne = backend.owner_create("daphne");

        let first = ec.registry().add(&daphne, "daphne@example.com").await.unwrap();
        let second = ec.registry().add(&daphne, "daphne@example.com").await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(backend.addresses_for_owner(daphne.id()).len(), 1);
        assert_eq!(outbox.messages().len(), 1);
    }

    #[tokio::test]
    async fn add_rejects_malformed_address() {
        let (ec, backend, outbox) = setup();
        let daphne = backend.owner_create("daphne");

        let result = ec.registry().add(&daphne, "not-an-email").await;

        assert!(matches!(result, Err(crate::ConfirmationError::InvalidEmail)));
        assert!(backend.addresses_for_owner(daphne.id()).is_empty());
        assert!(outbox.messages().is_empty());
    }

    #[tokio::test]
    async fn add_rejects_display_name_form() {
        let (ec, backend, outbox) = setup();
        let daphne = backend.owner_create("daphne");

        let result = ec.registry().add(&daphne, "Daphne <daphne@example.com>").await;

        assert!(matches!(result, Err(crate::ConfirmationError::InvalidEmail)));
        assert!(backend.addresses_for_owner(daphne.id()).is_empty());
        assert!(outbox.messages().is_empty());

        let plain = ec.registry().add(&daphne, "daphne@example.com").await.unwrap();
        assert_eq!(plain.map(|a| a.email).as_deref(), Some("daphne@example.com"));
    }

    #[tokio::test]
    async fn add_primary_replaces_existing_primary() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        let first = backend.email_address_insert(daphne.id(), "other@example.com", true, true);

        let address = ec
            .registry()
            .add_primary(&daphne, "daphne@example.com")
            .await
            .unwrap()
            .expect("created");

        assert!(address.primary);
        assert!(!backend.address(first.id).unwrap().primary);
        assert_eq!(backend.owner(daphne.id()).unwrap().email(), "daphne@example.com");
    }

    #[tokio::test]
    async fn primary_returns_none_without_primary() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        backend.email_address_insert(daphne.id(), "daphne@example.com", false, false);

        assert_eq!(ec.registry().primary(daphne.id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn primary_returns_the_primary_record() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        let main = backend.email_address_insert(daphne.id(), "daphne@example.com", false, true);
        backend.email_address_insert(daphne.id(), "other@example.com", false, false);

        assert_eq!(ec.registry().primary(daphne.id()).await.unwrap(), Some(main));
    }

    #[tokio::test]
    async fn owners_for_skips_unverified_records() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        let scooby = backend.owner_create("scooby");
        backend.email_address_insert(daphne.id(), "shared@example.com", true, false);
        backend.email_address_insert(scooby.id(), "shared@example.com", false, false);

        let owners = ec.registry().owners_for("shared@example.com").await.unwrap();

        assert_eq!(owners.into_iter().collect::<Vec<_>>(), vec![daphne.id()]);
    }

    #[tokio::test]
    async fn owners_for_is_exact_match() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        backend.email_address_insert(daphne.id(), "Shared@example.com", true, false);

        assert!(ec.registry().owners_for("shared@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn verified_lists_primary_first_then_alphabetical() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        backend.email_address_insert(daphne.id(), "b@example.com", true, false);
        backend.email_address_insert(daphne.id(), "z@example.com", true, true);
        backend.email_address_insert(daphne.id(), "a@example.com", true, false);
        backend.email_address_insert(daphne.id(), "unverified@example.com", false, false);

        let emails: Vec<_> = ec
            .registry()
            .verified(daphne.id())
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.email)
            .collect();

        assert_eq!(emails, vec!["z@example.com", "a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn conditional_promote_keeps_existing_primary() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        let first = backend.email_address_insert(daphne.id(), "other@example.com", false, false);
        let mut first_copy = first.clone();
        assert!(ec.registry().promote(&mut first_copy, false).await.unwrap());

        let mut second = backend.email_address_insert(daphne.id(), "daphne@example.com", false, false);
        let promoted = ec.registry().promote(&mut second, true).await.unwrap();

        assert!(!promoted);
        assert!(!second.primary);
        assert!(!backend.address(second.id).unwrap().primary);
        assert!(backend.address(first.id).unwrap().primary);
        assert_eq!(backend.owner(daphne.id()).unwrap().email(), "other@example.com");
    }

    #[tokio::test]
    async fn promote_unknown_address_is_an_error() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        let mut ghost = crate::EmailAddress {
            id: uuid::Uuid::new_v4(),
            owner_id: daphne.id(),
            email: "ghost@example.com".to_string(),
            verified: true,
            primary: false,
        };

        for conditional in [false, true] {
            let result = ec.registry().promote(&mut ghost, conditional).await;
            assert!(matches!(result, Err(crate::ConfirmationError::AddressNotFound)));
        }
        assert!(!ghost.primary);
        assert!(backend.addresses_for_owner(daphne.id()).is_empty());
    }

    #[tokio::test]
    async fn conditional_promote_succeeds_without_primary() {
        let (ec, backend, _outbox) = setup();
        let daphne = backend.owner_create("daphne");
        backend.email_address_insert(daphne.id(), "other@example.com", false, false);
        let mut address = backend.email_address_insert(daphne.id(), "daphne@example.com", false, false);

        assert!(ec.registry().promote(&mut address, true).await.unwrap());
        assert!(address.primary);
        assert!(backend.address(address.id).unwrap().primary);
        assert_eq!(backend.owner(daphne.id()).unwrap().email(), "daphne@example.com");
    }
}
