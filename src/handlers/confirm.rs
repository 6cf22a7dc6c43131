//! Handler for activation links.

use crate::{
    ConfirmationHooks, ConfirmationTemplates, EmailBackend, EmailConfirmation, EmailSender,
    cookies::{CONFIRMED_NOTICE, flash_cookie_create},
    endpoint::{ConfirmOutcome, confirm},
    error::ConfirmationError,
    templates::ConfirmPage,
};
use askama::Template;
use axum::{
    Router,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use utoipa::OpenApi;

/// Default mount point of the confirmation route.
pub const EMAIL_CONFIRM_PATH: &str = "/confirm";

#[derive(OpenApi)]
#[openapi(
    paths(email_confirm_get),
    components(schemas(crate::error::ErrorResponse))
)]
pub(crate) struct EmailConfirmApi;

/// Returns the confirmation route mounted under `prefix`.
pub fn confirm_routes<B, H, E, T>(prefix: &str) -> Router<EmailConfirmation<B, H, E, T>>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    Router::new().route(
        &format!("{prefix}/{{key}}/"),
        get(email_confirm_get::<B, H, E, T>),
    )
}

/// Confirm an email address from an activation link (`GET /confirm/{key}/`).
///
/// Renders an HTML page saying whether the address was confirmed. When a
/// success redirect is configured, a successful confirmation redirects there
/// instead and leaves a notice in the flash cookie.
#[utoipa::path(
    get,
    path = "/{key}/",
    params(("key" = String, Path, description = "Confirmation key from the activation email")),
    responses(
        (status = OK, description = "Confirmation result page", content_type = "text/html", body = String),
        (status = SEE_OTHER, description = "Confirmed; redirecting to the configured page"),
        (status = INTERNAL_SERVER_ERROR, body = crate::error::ErrorResponse)
    )
)]
pub async fn email_confirm_get<B, H, E, T>(
    State(confirmation): State<EmailConfirmation<B, H, E, T>>,
    Path(key): Path<String>,
) -> Result<Response, ConfirmationError>
where
    B: EmailBackend,
    H: ConfirmationHooks,
    E: EmailSender,
    T: ConfirmationTemplates,
{
    let config = confirmation.config();

    match confirm(&confirmation, &key, config.success_redirect.as_deref()).await? {
        ConfirmOutcome::Redirect(target) => {
            let jar = CookieJar::new().add(flash_cookie_create(CONFIRMED_NOTICE, config));
            Ok((jar, Redirect::to(&target)).into_response())
        }
        ConfirmOutcome::Render(address) => {
            let page = ConfirmPage {
                confirmed: address.is_some(),
                email: address.as_ref().map(|a| a.email.as_str()).unwrap_or_default(),
            };
            let html = page
                .render()
                .map_err(|e| ConfirmationError::Template(e.to_string()))?;
            Ok(Html(html).into_response())
        }
    }
}
