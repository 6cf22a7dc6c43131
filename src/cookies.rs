use crate::config::ConfirmationConfig;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Notice shown after a successful confirmation.
pub const CONFIRMED_NOTICE: &str = "Thanks for confirming your email.";

/// Create the one-shot flash cookie carrying a notice for the next page.
pub fn flash_cookie_create(message: &str, config: &ConfirmationConfig) -> Cookie<'static> {
    Cookie::build((config.flash_cookie_name.clone(), message.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::minutes(5))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_cookie_uses_configured_name() {
        let config = ConfirmationConfig {
            flash_cookie_name: "notice".to_string(),
            cookie_secure: true,
            ..Default::default()
        };

        let cookie = flash_cookie_create(CONFIRMED_NOTICE, &config);

        assert_eq!(cookie.name(), "notice");
        assert_eq!(cookie.value(), CONFIRMED_NOTICE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
