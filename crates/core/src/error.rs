//! Configuration error model.

use thiserror::Error;

/// Result type used by every configuration operation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration-level error.
///
/// Raised while a configurer is being assembled, sealed or first read.
/// None of these are retried internally; they always reach the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mutator was called after the component was sealed.
    ///
    /// Not recoverable for that instance: build a new one.
    #[error("{component} is already configured")]
    Sealed { component: &'static str },

    /// A permission-path provider failed while `configure()` was merging.
    #[error("permission provider '{provider}' failed for tier {tier}")]
    Provider {
        provider: String,
        tier: String,
        #[source]
        source: anyhow::Error,
    },

    /// The password matcher could not be compiled.
    #[error("invalid password pattern '{pattern}': {reason}")]
    PasswordPattern { pattern: String, reason: String },

    /// A configuration value failed validation (e.g. malformed env value).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn sealed(component: &'static str) -> Self {
        Self::Sealed { component }
    }

    pub fn provider(
        provider: impl Into<String>,
        tier: impl core::fmt::Display,
        source: anyhow::Error,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            tier: tier.to_string(),
            source,
        }
    }

    pub fn password_pattern(pattern: impl Into<String>, reason: impl core::fmt::Display) -> Self {
        Self::PasswordPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed { .. })
    }
}
