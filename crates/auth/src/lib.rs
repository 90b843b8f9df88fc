//! `usman-auth`: authorization configuration for the user-management module.
//!
//! The [`AuthorizationConfigurer`] collects URL permission rules, password
//! strength rules and authentication limits during startup, then seals them.
//! Everything else in this crate reads the sealed result.
//!
//! This crate is decoupled from HTTP and storage.

pub mod account;
pub mod authorize;
pub mod configurer;
pub mod failures;
pub mod password;
pub mod permissions;
pub mod provider;
pub mod registry;
pub mod roles;
pub mod seal;
pub mod settings;
pub mod urls;

pub use account::{AccountError, UserAccount};
pub use authorize::{AuthzError, Principal, authorize_request, explain_request};
pub use configurer::AuthorizationConfigurer;
pub use failures::{AuthFailureTracker, FailurePolicy};
pub use password::{PasswordMatcher, PasswordPolicy};
pub use permissions::{Permission, UrlPermission};
pub use provider::{PermissionPathsProvider, StaticPermissionPaths};
pub use registry::{OverrideOutcome, PermissionRegistry};
pub use roles::Role;
pub use seal::SealState;
pub use settings::{AuthSettings, OAuth2Settings};
pub use urls::{UrlScheme, UrlSchemeProvider, UrlsConfigurer};
