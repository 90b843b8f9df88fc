//! `usman-core`: shared building blocks of the user-management module.
//!
//! This crate holds the error model, identifiers and connection settings.
//! It has no knowledge of permissions or authorization policy.

pub mod database;
pub mod error;
pub mod id;
pub mod value_object;

pub use database::DatabaseSettings;
pub use error::{ConfigError, ConfigResult};
pub use id::{UserId, VerificationId};
pub use value_object::ValueObject;
