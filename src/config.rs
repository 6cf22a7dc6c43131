use thiserror::Error;

/// Errors when loading or validating confirmation configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("missing env var {0}")]
    MissingEnv(&'static str),

    /// Configuration failed validation checks.
    #[error("invalid email confirmation config: {0}")]
    Invalid(String),
}

/// Email confirmation configuration
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Days a confirmation key stays valid after it was issued (default: 3)
    pub expiry_days: u64,

    /// Protocol used when building activation links (default: "http")
    pub default_http_protocol: String,

    /// Host of the current site, used in activation links (default: "example.com")
    pub site_domain: String,

    /// Human readable site name handed to templates (default: "example.com")
    pub site_name: String,

    /// Path prefix of the confirmation route (default: "/confirm")
    pub confirm_path: String,

    /// Where to send the browser after a successful confirmation (default: None)
    pub success_redirect: Option<String>,

    /// Cookie carrying the post-confirmation notice (default: "flash")
    pub flash_cookie_name: String,

    /// Cookie secure flag - only send over HTTPS (default: true in production, false in debug)
    pub cookie_secure: bool,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            expiry_days: 3,
            default_http_protocol: "http".to_string(),
            site_domain: "example.com".to_string(),
            site_name: "example.com".to_string(),
            confirm_path: "/confirm".to_string(),
            success_redirect: None,
            flash_cookie_name: "flash".to_string(),
            cookie_secure: !cfg!(debug_assertions),
        }
    }
}

impl ConfirmationConfig {
    /// Build confirmation config from environment variables.
    ///
    /// Required:
    /// - `EMAIL_CONFIRMATION_SITE_DOMAIN`
    ///
    /// Optional variables fall back to `Default` values when not provided.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.site_domain = env_var_required("EMAIL_CONFIRMATION_SITE_DOMAIN")?;
        cfg.site_name = env_var_optional("EMAIL_CONFIRMATION_SITE_NAME")
            .unwrap_or_else(|| cfg.site_domain.clone());
        cfg.expiry_days =
            env_var_parse_or_default("EMAIL_CONFIRMATION_DAYS", cfg.expiry_days, "u64")?;
        cfg.cookie_secure =
            env_var_bool_or_default("EMAIL_CONFIRMATION_COOKIE_SECURE", cfg.cookie_secure)?;

        if let Some(v) = env_var_optional("DEFAULT_HTTP_PROTOCOL") {
            cfg.default_http_protocol = v.trim().to_ascii_lowercase();
        }
        if let Some(v) = env_var_optional("EMAIL_CONFIRMATION_PATH") {
            cfg.confirm_path = v;
        }
        if let Some(v) = env_var_optional("EMAIL_CONFIRMATION_FLASH_COOKIE_NAME") {
            cfg.flash_cookie_name = v;
        }
        cfg.success_redirect = env_var_optional("EMAIL_CONFIRMATION_SUCCESS_REDIRECT");

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiry_days == 0 {
            return Err(ConfigError::Invalid(
                "Confirmation expiry must be at least 1 day".to_string(),
            ));
        }

        self.expiry_window_checked()?;

        if !matches!(self.default_http_protocol.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "DEFAULT_HTTP_PROTOCOL must be one of: http, https".to_string(),
            ));
        }

        if self.site_domain.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Site domain cannot be empty".to_string(),
            ));
        }

        if !self.confirm_path.starts_with('/') || self.confirm_path.ends_with('/') {
            return Err(ConfigError::Invalid(
                "Confirm path must start with '/' and must not end with '/'".to_string(),
            ));
        }

        if self.flash_cookie_name.is_empty() {
            return Err(ConfigError::Invalid(
                "Flash cookie name cannot be empty".to_string(),
            ));
        }

        if self
            .success_redirect
            .as_deref()
            .is_some_and(|v| v.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "Success redirect cannot be blank".to_string(),
            ));
        }

        Ok(())
    }

    /// Expiry window as a duration. Only meaningful on a validated config.
    pub fn expiry_window(&self) -> chrono::Duration {
        self.expiry_window_checked().unwrap_or(chrono::Duration::MAX)
    }

    fn expiry_window_checked(&self) -> Result<chrono::Duration, ConfigError> {
        i64::try_from(self.expiry_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .ok_or_else(|| ConfigError::Invalid("Confirmation expiry is out of range".to_string()))
    }
}

fn env_var_required(key: &'static str) -> Result<String, ConfigError> {
    env_var_optional(key).ok_or(ConfigError::MissingEnv(key))
}

fn env_var_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_var_parse_or_default<T: std::str::FromStr>(
    key: &str,
    default: T,
    type_name: &str,
) -> Result<T, ConfigError> {
    match env_var_optional(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(format!("{key} must be a valid {type_name}"))),
        _ => Ok(default),
    }
}

fn env_var_bool_or_default(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env_var_optional(key) {
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(format!(
                "{key} must be a valid boolean"
            ))),
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "EMAIL_CONFIRMATION_SITE_DOMAIN",
        "EMAIL_CONFIRMATION_SITE_NAME",
        "EMAIL_CONFIRMATION_DAYS",
        "EMAIL_CONFIRMATION_COOKIE_SECURE",
        "DEFAULT_HTTP_PROTOCOL",
        "EMAIL_CONFIRMATION_PATH",
        "EMAIL_CONFIRMATION_FLASH_COOKIE_NAME",
        "EMAIL_CONFIRMATION_SUCCESS_REDIRECT",
    ];

    fn env_clear() {
        for key in VARS {
            // SAFETY: env tests are serialized.
            unsafe { std::env::remove_var(key) };
        }
    }

    fn env_set(key: &str, value: &str) {
        // SAFETY: env tests are serialized.
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ConfirmationConfig::default();
        assert_eq!(cfg.expiry_days, 3);
        assert_eq!(cfg.default_http_protocol, "http");
        assert_eq!(cfg.confirm_path, "/confirm");
        assert_eq!(cfg.expiry_window(), chrono::Duration::days(3));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_expiry() {
        let cfg = ConfirmationConfig {
            expiry_days: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_expiry_beyond_duration_range() {
        for expiry_days in [u64::MAX, i64::MAX as u64, 1 << 63] {
            let cfg = ConfirmationConfig {
                expiry_days,
                ..Default::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::Invalid(_))),
                "{expiry_days} days should be rejected"
            );
            assert!(cfg.expiry_window() > chrono::Duration::zero());
        }
    }

    #[test]
    #[serial]
    fn from_env_rejects_huge_days() {
        env_clear();
        env_set("EMAIL_CONFIRMATION_SITE_DOMAIN", "example.com");
        env_set("EMAIL_CONFIRMATION_DAYS", "18446744073709551615");

        let result = ConfirmationConfig::from_env();
        env_clear();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_unknown_protocol() {
        let cfg = ConfirmationConfig {
            default_http_protocol: "ftp".to_string(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_trailing_slash_in_path() {
        let cfg = ConfirmationConfig {
            confirm_path: "/confirm/".to_string(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[serial]
    fn from_env_requires_site_domain() {
        env_clear();
        assert_eq!(
            ConfirmationConfig::from_env().unwrap_err(),
            ConfigError::MissingEnv("EMAIL_CONFIRMATION_SITE_DOMAIN")
        );
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        env_clear();
        env_set("EMAIL_CONFIRMATION_SITE_DOMAIN", "accounts.example.org");
        env_set("EMAIL_CONFIRMATION_DAYS", "10");
        env_set("DEFAULT_HTTP_PROTOCOL", "HTTPS");
        env_set("EMAIL_CONFIRMATION_SUCCESS_REDIRECT", "/profile");

        let cfg = ConfirmationConfig::from_env().expect("config");
        env_clear();

        assert_eq!(cfg.site_domain, "accounts.example.org");
        assert_eq!(cfg.site_name, "accounts.example.org");
        assert_eq!(cfg.expiry_days, 10);
        assert_eq!(cfg.default_http_protocol, "https");
        assert_eq!(cfg.success_redirect.as_deref(), Some("/profile"));
    }

    #[test]
    #[serial]
    fn from_env_rejects_non_numeric_days() {
        env_clear();
        env_set("EMAIL_CONFIRMATION_SITE_DOMAIN", "example.com");
        env_set("EMAIL_CONFIRMATION_DAYS", "three");

        let result = ConfirmationConfig::from_env();
        env_clear();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
