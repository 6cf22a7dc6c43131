//! Mail transport for confirmation messages.
//!
//! The crate renders the subject and body itself; an [`EmailSender`] only has
//! to hand the finished message to SMTP, an HTTP mail API or a queue.

use std::future::Future;
use thiserror::Error;

/// Why a confirmation message could not be handed off.
#[derive(Debug, Clone, Error)]
pub enum EmailSendError {
    /// The transport refused the recipient address.
    #[error("recipient rejected: {0}")]
    RecipientRejected(String),

    /// The transport could not be reached or failed mid-send.
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Delivers a rendered confirmation message to one recipient.
///
/// `()` accepts and drops every message. An `Err` surfaces from
/// [`ConfirmationIssuer::issue`](crate::ConfirmationIssuer::issue) and
/// [`AddressRegistry::add`](crate::AddressRegistry::add); the key already
/// stored for the address stays valid, so callers may retry with `issue`.
///
/// ```rust,ignore
/// use fast_email_confirmation::{EmailSendError, EmailSender};
///
/// #[derive(Clone)]
/// struct Relay { client: reqwest::Client }
///
/// impl EmailSender for Relay {
///     async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailSendError> {
///         self.client
///             .post("https://mail.internal/send")
///             .form(&[("to", to), ("subject", subject), ("text", body)])
///             .send()
///             .await
///             .map_err(|e| EmailSendError::Transport(e.to_string()))?;
///         Ok(())
///     }
/// }
/// ```
pub trait EmailSender: Send + Sync + Clone + 'static {
    /// Send one plain-text message. `subject` is always a single line.
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), EmailSendError>> + Send;
}

impl EmailSender for () {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), EmailSendError> {
        Ok(())
    }
}
