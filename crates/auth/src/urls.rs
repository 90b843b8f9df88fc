//! Canonical URLs of the user-management pages.

use serde::{Deserialize, Serialize};

use usman_core::ConfigResult;

use crate::seal::SealState;

/// Supplies the URLs the registration policy rewrites.
pub trait UrlSchemeProvider: Send + Sync {
    /// Page showing the registration form.
    fn registration_url(&self) -> &str;

    /// Endpoint the registration form submits to.
    fn registration_submit_url(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlScheme {
    pub login_url: String,
    pub login_processing_url: String,
    pub logout_url: String,
    pub success_url: String,
    pub admin_url: String,
    pub registration_url: String,
    pub perform_register_url: String,
}

impl Default for UrlScheme {
    fn default() -> Self {
        Self {
            login_url: "/usman/v1/security/login".to_string(),
            login_processing_url: "/usman/v1/security/perform-login".to_string(),
            logout_url: "/usman/v1/security/logout".to_string(),
            success_url: "/index.html".to_string(),
            admin_url: "/usman/v1/admin".to_string(),
            registration_url: "/usman/v1/users/registration".to_string(),
            perform_register_url: "/usman/v1/users/perform-register".to_string(),
        }
    }
}

/// Mutable-until-configured holder of the [`UrlScheme`].
#[derive(Debug, Clone, Default)]
pub struct UrlsConfigurer {
    scheme: UrlScheme,
    state: SealState,
}

const COMPONENT: &str = "UrlsConfigurer";

impl UrlsConfigurer {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(&mut self, apply: impl FnOnce(&mut UrlScheme)) -> ConfigResult<&mut Self> {
        self.state.ensure_open(COMPONENT)?;
        apply(&mut self.scheme);
        Ok(self)
    }

    pub fn set_login_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|s| s.login_url = url.into())
    }

    pub fn set_login_processing_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|s| s.login_processing_url = url.into())
    }

    pub fn set_logout_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|s| s.logout_url = url.into())
    }

    pub fn set_success_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|s| s.success_url = url.into())
    }

    pub fn set_admin_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|s| s.admin_url = url.into())
    }

    pub fn set_registration_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|s| s.registration_url = url.into())
    }

    pub fn set_perform_register_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|s| s.perform_register_url = url.into())
    }

    /// Freeze the URLs.
    pub fn configure(&mut self) -> ConfigResult<&Self> {
        self.state.seal(COMPONENT)?;
        Ok(self)
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_sealed()
    }

    pub fn scheme(&self) -> &UrlScheme {
        &self.scheme
    }
}

impl UrlSchemeProvider for UrlsConfigurer {
    fn registration_url(&self) -> &str {
        &self.scheme.registration_url
    }

    fn registration_submit_url(&self) -> &str {
        &self.scheme.perform_register_url
    }
}
