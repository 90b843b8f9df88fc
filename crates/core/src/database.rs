//! Connection settings of the internal user-store database.
//!
//! The datasource router that picks between this store and the host
//! application's database lives outside this workspace; it only reads the
//! connection URL assembled here.

use serde::{Deserialize, Serialize};

/// Driver class of the embedded H2 database, the only driver that takes
/// extra `;key=value` parameters appended to its URL.
pub const H2_DRIVER: &str = "org.h2.Driver";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub driver_class: String,
    /// Base URL without the database name, e.g. `jdbc:h2:mem:`.
    pub url: String,
    pub name: String,
    pub user: String,
    pub password: String,
    pub additional_params: String,
    pub dialect: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            driver_class: H2_DRIVER.to_string(),
            url: "jdbc:h2:mem:".to_string(),
            name: "usman".to_string(),
            user: "admin".to_string(),
            password: String::new(),
            additional_params: "DB_CLOSE_DELAY=-1".to_string(),
            dialect: "org.hibernate.dialect.H2Dialect".to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Read settings from `USMAN_DB_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let fields: [(&str, &mut String); 7] = [
            ("USMAN_DB_DRIVER", &mut settings.driver_class),
            ("USMAN_DB_URL", &mut settings.url),
            ("USMAN_DB_NAME", &mut settings.name),
            ("USMAN_DB_USER", &mut settings.user),
            ("USMAN_DB_PASSWORD", &mut settings.password),
            ("USMAN_DB_ADDITIONAL_PARAMS", &mut settings.additional_params),
            ("USMAN_DB_DIALECT", &mut settings.dialect),
        ];
        for (key, slot) in fields {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        if settings.password.is_empty() {
            tracing::warn!("USMAN_DB_PASSWORD not set; user store connects without a password");
        }
        settings
    }

    pub fn is_h2(&self) -> bool {
        self.driver_class == H2_DRIVER
    }

    /// Full connection URL: `{url}/{name}`, plus `;{additional_params}` for H2.
    pub fn connection_url(&self) -> String {
        let mut url = format!("{}/{}", self.url, self.name);
        if self.is_h2() {
            url.push(';');
            url.push_str(&self.additional_params);
        }
        url
    }
}

impl core::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("driver_class", &self.driver_class)
            .field("url", &self.url)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("additional_params", &self.additional_params)
            .field("dialect", &self.dialect)
            .finish()
    }
}
