//! # fast-email-confirmation
//!
//! Secondary email addresses with emailed confirmation links for Axum.
//!
//! ## Features
//!
//! - **Multiple addresses per user** with at most one primary address
//! - **Time-limited confirmation keys** mailed as activation links
//! - **Extensible backend trait** for any database
//! - **Pluggable templates and mail transport**
//! - **Lifecycle hooks** fired when an address is confirmed
//!
//! ## Quick Start
//!
//! Implement [`EmailBackend`] for your database, then create an
//! [`EmailConfirmation`] instance and mount its routes:
//!
//! ```rust,ignore
//! use fast_email_confirmation::{ConfirmationConfig, EmailConfirmation};
//! use axum::{Router, extract::FromRef};
//!
//! let confirmation = EmailConfirmation::new(ConfirmationConfig::from_env()?, backend)?
//!     .with_email_sender(mailer);
//!
//! #[derive(Clone)]
//! struct AppState {
//!     confirmation: EmailConfirmation<MyBackend, (), Mailer>,
//! }
//!
//! impl FromRef<AppState> for EmailConfirmation<MyBackend, (), Mailer> {
//!     fn from_ref(s: &AppState) -> Self { s.confirmation.clone() }
//! }
//!
//! let app = Router::new()
//!     .merge(confirmation.routes::<AppState>())
//!     .with_state(AppState { confirmation: confirmation.clone() });
//!
//! // Somewhere in your own handlers:
//! confirmation.registry().add(&user, "daphne@example.com").await?;
//! ```
//!
//! ## Endpoints
//!
//! - `GET /confirm/{key}/` - Confirm an address and render the result page
//!
//! ## Hooks
//!
//! ```rust,ignore
//! use fast_email_confirmation::{ConfirmationHooks, EmailAddress};
//!
//! #[derive(Clone)]
//! struct MyHooks;
//!
//! impl ConfirmationHooks for MyHooks {
//!     fn on_email_confirmed(&self, address: &EmailAddress) -> impl std::future::Future<Output = ()> + Send {
//!         let email = address.email.clone();
//!         async move { println!("{email} confirmed"); }
//!     }
//! }
//! ```

mod backend;
mod config;
mod cookies;
mod email;
mod email_sender;
pub mod endpoint;
mod error;
pub mod handlers;
mod issuer;
pub mod openapi;
mod registry;
pub mod templates;
pub mod tokens;
mod verification;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use axum::Router;
use std::future::Future;
use std::sync::Arc;

pub use backend::{ConfirmationToken, EmailAddress, EmailBackend, EmailOwner};
pub use config::{ConfigError, ConfirmationConfig};
pub use email_sender::{EmailSendError, EmailSender};
pub use endpoint::ConfirmOutcome;
pub use error::{ConfirmationError, ErrorResponse};
pub use issuer::ConfirmationIssuer;
pub use registry::AddressRegistry;
pub use templates::{ConfirmationContext, ConfirmationTemplates, DefaultTemplates};

/// Hooks for confirmation lifecycle events.
///
/// Implement this trait to react when an address is confirmed, for example to
/// grant access that requires a verified email.
pub trait ConfirmationHooks: Send + Sync + Clone + 'static {
    /// Called after an address is verified and, if possible, promoted.
    fn on_email_confirmed(&self, _address: &EmailAddress) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl ConfirmationHooks for () {}

/// Address management with emailed confirmation. Cheap to clone.
///
/// # Type Parameters
///
/// - `B`: The backend implementing [`EmailBackend`]
/// - `H`: Optional hooks implementing [`ConfirmationHooks`] (defaults to `()`)
/// - `E`: Optional email sender implementing [`EmailSender`] (defaults to `()`)
/// - `T`: Message templates implementing [`ConfirmationTemplates`]
///   (defaults to [`DefaultTemplates`])
#[derive(Clone)]
pub struct EmailConfirmation<
    B: EmailBackend,
    H: ConfirmationHooks = (),
    E: EmailSender = (),
    T: ConfirmationTemplates = DefaultTemplates,
> {
    config: Arc<ConfirmationConfig>,
    backend: B,
    hooks: H,
    email_sender: E,
    templates: T,
}

impl<B: EmailBackend> EmailConfirmation<B> {
    /// Create an instance with no-op hooks, a no-op sender and default templates.
    pub fn new(config: ConfirmationConfig, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            backend,
            hooks: (),
            email_sender: (),
            templates: DefaultTemplates,
        })
    }
}

impl<B, H, E, T> EmailConfirmation<B, H, E, T>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    /// Attach custom lifecycle hooks.
    pub fn with_hooks<NewH: ConfirmationHooks>(self, hooks: NewH) -> EmailConfirmation<B, NewH, E, T> {
        EmailConfirmation {
            config: self.config,
            backend: self.backend,
            hooks,
            email_sender: self.email_sender,
            templates: self.templates,
        }
    }

    /// Attach the mail transport used for confirmation messages.
    pub fn with_email_sender<NewE: EmailSender>(
        self,
        email_sender: NewE,
    ) -> EmailConfirmation<B, H, NewE, T> {
        EmailConfirmation {
            config: self.config,
            backend: self.backend,
            hooks: self.hooks,
            email_sender,
            templates: self.templates,
        }
    }

    /// Replace the message templates.
    pub fn with_templates<NewT: ConfirmationTemplates>(
        self,
        templates: NewT,
    ) -> EmailConfirmation<B, H, E, NewT> {
        EmailConfirmation {
            config: self.config,
            backend: self.backend,
            hooks: self.hooks,
            email_sender: self.email_sender,
            templates,
        }
    }

    /// Returns a router with the confirmation endpoint.
    ///
    /// Endpoints:
    /// - `GET {confirm_path}/{key}/`
    pub fn routes<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        handlers::confirm_routes::<B, H, E, T>(&self.config.confirm_path).with_state(self.clone())
    }

    /// Address creation, lookups and primary promotion.
    pub fn registry(&self) -> AddressRegistry<'_, B, H, E, T> {
        AddressRegistry::new(self)
    }

    /// Confirmation key issuance, consumption and cleanup.
    pub fn issuer(&self) -> ConfirmationIssuer<'_, B, H, E, T> {
        ConfirmationIssuer::new(self)
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Returns a reference to the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn hooks(&self) -> &H {
        &self.hooks
    }

    pub(crate) fn email_sender(&self) -> &E {
        &self.email_sender
    }

    pub(crate) fn templates(&self) -> &T {
        &self.templates
    }
}
