//! User account state relevant to authentication.
//!
//! Persistence of accounts belongs to the host; this module only answers
//! whether an account in a given state may sign in.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use usman_core::{UserId, VerificationId};

use crate::roles::Role;

/// How long a freshly created account stays valid without renewal.
pub const EXPIRATION_DAYS: i64 = 1;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccountError {
    #[error("account is disabled")]
    Disabled,
    #[error("account is locked")]
    Locked,
    #[error("account has expired")]
    Expired,
    #[error("credentials have expired")]
    CredentialsExpired,
}

/// A user account.
///
/// # Invariants
/// - Two accounts are the same account when login and email match.
/// - `check_status` reports problems in a fixed order: disabled, locked,
///   expired, credentials expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Option<UserId>,
    pub login: String,
    pub name: String,
    /// Encoded password; the encoding is the host's concern.
    pub password: String,
    pub email: String,
    pub authority: Role,
    pub expiration_date: DateTime<Utc>,
    pub verification_id: VerificationId,
    pub account_locked: bool,
    pub credentials_expired: bool,
    pub enabled: bool,
}

impl UserAccount {
    /// New, enabled account expiring [`EXPIRATION_DAYS`] after `now`.
    pub fn new(
        login: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
        authority: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            login: login.into(),
            name: name.into(),
            password: password.into(),
            email: email.into(),
            authority,
            expiration_date: now + Duration::days(EXPIRATION_DAYS),
            verification_id: VerificationId::new(),
            account_locked: false,
            credentials_expired: false,
            enabled: true,
        }
    }

    pub fn builder() -> UserAccountBuilder {
        UserAccountBuilder::default()
    }

    pub fn is_account_non_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date > now
    }

    pub fn is_account_non_locked(&self) -> bool {
        !self.account_locked
    }

    pub fn is_credentials_non_expired(&self) -> bool {
        !self.credentials_expired
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether this account may authenticate at `now`.
    pub fn check_status(&self, now: DateTime<Utc>) -> Result<(), AccountError> {
        if !self.is_enabled() {
            return Err(AccountError::Disabled);
        }
        if !self.is_account_non_locked() {
            return Err(AccountError::Locked);
        }
        if !self.is_account_non_expired(now) {
            return Err(AccountError::Expired);
        }
        if !self.is_credentials_non_expired() {
            return Err(AccountError::CredentialsExpired);
        }
        Ok(())
    }
}

impl PartialEq for UserAccount {
    fn eq(&self, other: &Self) -> bool {
        self.login == other.login && self.email == other.email
    }
}

impl Eq for UserAccount {}

impl core::hash::Hash for UserAccount {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.login.hash(state);
        self.email.hash(state);
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserAccountBuilder {
    id: Option<UserId>,
    login: String,
    name: String,
    password: String,
    email: String,
    authority: Option<Role>,
    expiration_date: Option<DateTime<Utc>>,
    verification_id: Option<VerificationId>,
    account_locked: bool,
    credentials_expired: bool,
    disabled: bool,
}

impl UserAccountBuilder {
    pub fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn authority(mut self, authority: Role) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn expiration_date(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    pub fn verification_id(mut self, verification_id: VerificationId) -> Self {
        self.verification_id = Some(verification_id);
        self
    }

    pub fn account_locked(mut self, locked: bool) -> Self {
        self.account_locked = locked;
        self
    }

    pub fn credentials_expired(mut self, expired: bool) -> Self {
        self.credentials_expired = expired;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.disabled = !enabled;
        self
    }

    /// Build the account. Without an explicit expiration date the account
    /// expires [`EXPIRATION_DAYS`] from now; without an authority it is a
    /// plain user.
    pub fn build(self) -> UserAccount {
        UserAccount {
            id: self.id,
            login: self.login,
            name: self.name,
            password: self.password,
            email: self.email,
            authority: self.authority.unwrap_or_else(Role::user),
            expiration_date: self
                .expiration_date
                .unwrap_or_else(|| Utc::now() + Duration::days(EXPIRATION_DAYS)),
            verification_id: self.verification_id.unwrap_or_default(),
            account_locked: self.account_locked,
            credentials_expired: self.credentials_expired,
            enabled: !self.disabled,
        }
    }
}
