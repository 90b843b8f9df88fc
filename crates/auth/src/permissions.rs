use serde::{Deserialize, Serialize};

use usman_core::ValueObject;

use crate::roles::Role;

/// HTTP method assigned to a rule when none is given.
pub const DEFAULT_HTTP_METHOD: &str = "GET";

/// Method that matches every request method.
pub const ANY_HTTP_METHOD: &str = "*";

/// Coarse access tier attached to a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Anyone, authenticated or not.
    AnyUser,
    /// Regular users and administrators.
    UserAdmin,
    /// Administrators only.
    AdminOnly,
}

impl Permission {
    /// Order in which providers are queried during `configure()`.
    pub const MERGE_ORDER: [Permission; 3] =
        [Permission::AnyUser, Permission::AdminOnly, Permission::UserAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AnyUser => "ANY_USER",
            Permission::UserAdmin => "USER_ADMIN",
            Permission::AdminOnly => "ADMIN_ONLY",
        }
    }

    /// Authorities admitted by this tier. Empty means no authentication needed.
    pub fn authorities(&self) -> &'static [&'static str] {
        match self {
            Permission::AnyUser => &[],
            Permission::UserAdmin => &[Role::USER, Role::ADMIN],
            Permission::AdminOnly => &[Role::ADMIN],
        }
    }

    /// Whether a principal holding `role` (or nobody, for `None`) is admitted.
    pub fn admits(&self, role: Option<&Role>) -> bool {
        match self {
            Permission::AnyUser => true,
            _ => role.is_some_and(|r| self.authorities().contains(&r.as_str())),
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single access rule: `url` requested with `http_method` needs `permission`.
///
/// Two rules are equal when they target the same url and method, whatever
/// permission they carry. Rules are never edited; overriding one swaps in a
/// new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlPermission {
    url: String,
    http_method: String,
    permission: Permission,
}

impl UrlPermission {
    /// Rule for the default method (`GET`).
    pub fn new(url: impl Into<String>, permission: Permission) -> Self {
        Self::with_method(url, DEFAULT_HTTP_METHOD, permission)
    }

    pub fn with_method(
        url: impl Into<String>,
        http_method: impl Into<String>,
        permission: Permission,
    ) -> Self {
        Self {
            url: url.into(),
            http_method: http_method.into().to_ascii_uppercase(),
            permission,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn http_method(&self) -> &str {
        &self.http_method
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// True if this rule applies to a request made with `method`.
    pub fn matches_method(&self, method: &str) -> bool {
        self.http_method == ANY_HTTP_METHOD || self.http_method.eq_ignore_ascii_case(method)
    }
}

impl PartialEq for UrlPermission {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.http_method == other.http_method
    }
}

impl Eq for UrlPermission {}

impl core::hash::Hash for UrlPermission {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.http_method.hash(state);
    }
}

impl ValueObject for UrlPermission {}

impl core::fmt::Display for UrlPermission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} -> {}", self.http_method, self.url, self.permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_method_is_get() {
        let rule = UrlPermission::new("/index", Permission::AnyUser);
        assert_eq!(rule.http_method(), "GET");
    }

    #[test]
    fn method_is_normalized_to_upper_case() {
        let rule = UrlPermission::with_method("/reg", "post", Permission::AdminOnly);
        assert_eq!(rule.http_method(), "POST");
        assert!(rule.matches_method("Post"));
        assert!(!rule.matches_method("GET"));
    }

    #[test]
    fn equality_ignores_permission() {
        let a = UrlPermission::new("/admin", Permission::AnyUser);
        let b = UrlPermission::new("/admin", Permission::AdminOnly);
        let c = UrlPermission::with_method("/admin", "POST", Permission::AnyUser);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn wildcard_method_matches_everything() {
        let rule = UrlPermission::with_method("/static", ANY_HTTP_METHOD, Permission::AnyUser);
        assert!(rule.matches_method("DELETE"));
        assert!(rule.matches_method("GET"));
    }

    #[test]
    fn tiers_admit_expected_roles() {
        let user = Role::user();
        let admin = Role::admin();

        assert!(Permission::AnyUser.admits(None));
        assert!(!Permission::UserAdmin.admits(None));
        assert!(Permission::UserAdmin.admits(Some(&user)));
        assert!(Permission::UserAdmin.admits(Some(&admin)));
        assert!(!Permission::AdminOnly.admits(Some(&user)));
        assert!(Permission::AdminOnly.admits(Some(&admin)));
    }

    #[test]
    fn tier_serializes_in_screaming_case() {
        let json = serde_json::to_string(&Permission::UserAdmin).unwrap();
        assert_eq!(json, "\"USER_ADMIN\"");
    }
}
