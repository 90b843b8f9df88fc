//! Scalar defaults of the authorization configurer, loadable from the
//! environment.

use serde::{Deserialize, Serialize};

use usman_core::{ConfigError, ConfigResult};

/// Two weeks, in seconds.
pub const TWO_WEEKS_SECONDS: u32 = 1_209_600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub login_page_title: String,
    pub application_url: String,
    pub password_error_message: String,
    pub csrf_enabled: bool,
    pub registration_allowed: bool,
    pub max_auth_failure_count: u32,
    pub auth_failure_block_minutes: u32,
    pub remember_me_validity_seconds: u32,
    pub csrf_token_validity_seconds: u32,
    pub oauth2: OAuth2Settings,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            login_page_title: String::new(),
            application_url: "http://127.0.0.1:8085".to_string(),
            password_error_message: "Wrong password!".to_string(),
            csrf_enabled: true,
            registration_allowed: true,
            max_auth_failure_count: 3,
            auth_failure_block_minutes: 60,
            remember_me_validity_seconds: TWO_WEEKS_SECONDS,
            csrf_token_validity_seconds: TWO_WEEKS_SECONDS,
            oauth2: OAuth2Settings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth2Settings {
    pub google_client_id: Option<String>,
}

impl OAuth2Settings {
    pub fn google_enabled(&self) -> bool {
        self.google_client_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

impl AuthSettings {
    /// Read `USMAN_*` environment variables over the defaults.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults; values that do not parse are rejected.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Self::default();

        if let Some(v) = lookup("USMAN_LOGIN_PAGE_TITLE") {
            s.login_page_title = v;
        }
        match lookup("USMAN_APPLICATION_URL") {
            Some(v) => s.application_url = v,
            None => tracing::warn!(
                application_url = %s.application_url,
                "USMAN_APPLICATION_URL not set; using local default"
            ),
        }
        if let Some(v) = lookup("USMAN_PASSWORD_ERROR_MESSAGE") {
            s.password_error_message = v;
        }
        if let Some(v) = lookup("USMAN_CSRF_ENABLED") {
            s.csrf_enabled = parse_flag("USMAN_CSRF_ENABLED", &v)?;
        }
        if let Some(v) = lookup("USMAN_REGISTRATION_ALLOWED") {
            s.registration_allowed = parse_flag("USMAN_REGISTRATION_ALLOWED", &v)?;
        }
        if let Some(v) = lookup("USMAN_MAX_AUTH_FAILURE_COUNT") {
            s.max_auth_failure_count = parse_number("USMAN_MAX_AUTH_FAILURE_COUNT", &v)?;
        }
        if let Some(v) = lookup("USMAN_AUTH_FAILURE_BLOCK_MINUTES") {
            s.auth_failure_block_minutes = parse_number("USMAN_AUTH_FAILURE_BLOCK_MINUTES", &v)?;
        }
        if let Some(v) = lookup("USMAN_REMEMBER_ME_VALIDITY_SECONDS") {
            s.remember_me_validity_seconds =
                parse_number("USMAN_REMEMBER_ME_VALIDITY_SECONDS", &v)?;
        }
        if let Some(v) = lookup("USMAN_CSRF_TOKEN_VALIDITY_SECONDS") {
            s.csrf_token_validity_seconds = parse_number("USMAN_CSRF_TOKEN_VALIDITY_SECONDS", &v)?;
        }
        s.oauth2.google_client_id = lookup("USMAN_GOOGLE_CLIENT_ID");

        Ok(s)
    }
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::validation(format!("{key}: expected a boolean, got '{value}'"))),
    }
}

fn parse_number(key: &str, value: &str) -> ConfigResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::validation(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key: &str| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = AuthSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, AuthSettings::default());
        assert_eq!(settings.max_auth_failure_count, 3);
        assert_eq!(settings.remember_me_validity_seconds, 1_209_600);
    }

    #[test]
    fn values_are_parsed() {
        let settings = AuthSettings::from_lookup(lookup(&[
            ("USMAN_REGISTRATION_ALLOWED", "false"),
            ("USMAN_MAX_AUTH_FAILURE_COUNT", " 5 "),
            ("USMAN_GOOGLE_CLIENT_ID", "client-123"),
        ]))
        .unwrap();

        assert!(!settings.registration_allowed);
        assert_eq!(settings.max_auth_failure_count, 5);
        assert!(settings.oauth2.google_enabled());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = AuthSettings::from_lookup(lookup(&[("USMAN_CSRF_ENABLED", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("USMAN_CSRF_ENABLED")));

        let err =
            AuthSettings::from_lookup(lookup(&[("USMAN_AUTH_FAILURE_BLOCK_MINUTES", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn empty_google_client_id_disables_google() {
        let oauth2 = OAuth2Settings {
            google_client_id: Some(String::new()),
        };
        assert!(!oauth2.google_enabled());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: AuthSettings =
            serde_json::from_str(r#"{"csrf_enabled": false, "oauth2": {}}"#).unwrap();
        assert!(!settings.csrf_enabled);
        assert_eq!(settings.application_url, "http://127.0.0.1:8085");
    }
}
