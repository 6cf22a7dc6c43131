//! Activation link construction.

use crate::config::ConfirmationConfig;

/// Build the activation link mailed to an address.
///
/// Returns `{protocol}://{site_domain}{confirm_path}/{key}/`. The key is used
/// as given, without lowercasing.
pub fn activate_url_build(config: &ConfirmationConfig, key: &str) -> String {
    format!(
        "{}://{}{}/{}/",
        config.default_http_protocol, config.site_domain, config.confirm_path, key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_http_link() {
        let config = ConfirmationConfig::default();
        assert_eq!(
            activate_url_build(&config, "AbC123"),
            "http://example.com/confirm/AbC123/"
        );
    }

    #[test]
    fn respects_protocol_and_path() {
        let config = ConfirmationConfig {
            default_http_protocol: "https".to_string(),
            site_domain: "accounts.example.org".to_string(),
            confirm_path: "/email/confirm".to_string(),
            ..Default::default()
        };
        assert_eq!(
            activate_url_build(&config, "abc"),
            "https://accounts.example.org/email/confirm/abc/"
        );
    }
}
