//! Framework-independent confirmation endpoint logic.

use crate::{
    ConfirmationHooks, ConfirmationTemplates, EmailAddress, EmailBackend, EmailConfirmation,
    EmailSender, error::ConfirmationError,
};

/// What the hosting framework should do after a confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The address was confirmed and a redirect target is configured.
    Redirect(String),
    /// Render the confirmation page. `None` means the key was invalid or expired.
    Render(Option<EmailAddress>),
}

/// Consume a confirmation key taken from a link.
///
/// Unknown, malformed or expired keys are not errors; they produce
/// `ConfirmOutcome::Render(None)`.
pub async fn confirm<B, H, E, T>(
    confirmation: &EmailConfirmation<B, H, E, T>,
    key: &str,
    success_redirect: Option<&str>,
) -> Result<ConfirmOutcome, ConfirmationError>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    let key = key.to_lowercase();
    let address = confirmation.issuer().consume(&key).await?;

    match (address, success_redirect) {
        (Some(_), Some(target)) => Ok(ConfirmOutcome::Redirect(target.to_string())),
        (address, _) => Ok(ConfirmOutcome::Render(address)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;
    use crate::ConfirmationConfig;

    async fn issued() -> (EmailConfirmation<MemoryBackend>, MemoryBackend, String) {
        let backend = MemoryBackend::new();
        let ec = EmailConfirmation::new(ConfirmationConfig::default(), backend.clone()).unwrap();
        let daphne = backend.owner_create("daphne");
        let address = ec
            .registry()
            .add(&daphne, "daphne@example.com")
            .await
            .unwrap()
            .unwrap();
        let key = backend.token_for_address(address.id).unwrap().key;
        (ec, backend, key)
    }

    #[tokio::test]
    async fn renders_confirmed_address_without_redirect() {
        let (ec, _backend, key) = issued().await;

        let outcome = confirm(&ec, &key, None).await.unwrap();

        match outcome {
            ConfirmOutcome::Render(Some(address)) => assert!(address.verified),
            other => panic!("expected confirmed render, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn redirects_on_success_when_configured() {
        let (ec, _backend, key) = issued().await;

        let outcome = confirm(&ec, &key.to_uppercase(), Some("/profile")).await.unwrap();

        assert_eq!(outcome, ConfirmOutcome::Redirect("/profile".to_string()));
    }

    #[tokio::test]
    async fn renders_none_for_junk_even_with_redirect() {
        let (ec, _backend, _key) = issued().await;

        let outcome = confirm(&ec, "junk", Some("/profile")).await.unwrap();

        assert_eq!(outcome, ConfirmOutcome::Render(None));
    }
}
