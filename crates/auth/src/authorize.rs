//! Request admission over a sealed permission registry.

use serde::Serialize;
use thiserror::Error;

use crate::permissions::Permission;
use crate::registry::PermissionRegistry;
use crate::roles::Role;

/// An authenticated caller, as seen by request admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub login: String,
    pub authority: Role,
}

impl Principal {
    pub fn new(login: impl Into<String>, authority: Role) -> Self {
        Self {
            login: login.into(),
            authority,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required for {method} {url}")]
    Unauthenticated { method: String, url: String },

    #[error("forbidden: {method} {url} requires {required}")]
    Forbidden {
        method: String,
        url: String,
        required: Permission,
    },
}

/// Decide whether `principal` (or an anonymous caller) may request `url`
/// with `method`.
///
/// The first rule for the url whose method matches decides. A url without any
/// applicable rule is open to every authenticated principal.
///
/// - Read-only over the registry
/// - No IO
pub fn authorize_request(
    registry: &PermissionRegistry,
    principal: Option<&Principal>,
    method: &str,
    url: &str,
) -> Result<(), AuthzError> {
    let explanation = explain_request(registry, principal, method, url);
    if explanation.granted {
        return Ok(());
    }
    match (principal, explanation.required_permission) {
        (Some(_), Some(required)) => Err(AuthzError::Forbidden {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            required,
        }),
        _ => Err(AuthzError::Unauthenticated {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }),
    }
}

/// Detailed account of a request admission decision.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionExplanation {
    pub method: String,
    pub url: String,
    /// Position of the deciding rule in the registry, if any rule applied.
    pub matched_rule: Option<usize>,
    pub required_permission: Option<Permission>,
    pub principal: Option<String>,
    pub authority: Option<String>,
    pub granted: bool,
    pub reason: String,
}

/// Explain why a request would be admitted or rejected.
pub fn explain_request(
    registry: &PermissionRegistry,
    principal: Option<&Principal>,
    method: &str,
    url: &str,
) -> AdmissionExplanation {
    let resolved = registry.resolve_indexed(url, method);
    let matched_rule = resolved.map(|(index, _)| index);
    let required = resolved.map(|(_, rule)| rule.permission());
    let role = principal.map(|p| &p.authority);

    let (granted, reason) = match required {
        None if principal.is_some() => (true, "no rule applies; authenticated callers are admitted".to_string()),
        None => (false, "no rule applies and the caller is anonymous".to_string()),
        Some(permission) if permission.admits(role) => (
            true,
            format!("{permission} admits {}", role.map_or("anonymous callers", |r| r.as_str())),
        ),
        Some(permission) => (
            false,
            format!(
                "{permission} requires one of {:?}, caller has {}",
                permission.authorities(),
                role.map_or("no authority", |r| r.as_str())
            ),
        ),
    };

    AdmissionExplanation {
        method: method.to_ascii_uppercase(),
        url: url.to_string(),
        matched_rule,
        required_permission: required,
        principal: principal.map(|p| p.login.clone()),
        authority: role.map(|r| r.as_str().to_string()),
        granted,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::UrlPermission;

    fn registry() -> PermissionRegistry {
        [
            UrlPermission::new("/index", Permission::AnyUser),
            UrlPermission::with_method("/users", "*", Permission::UserAdmin),
            UrlPermission::new("/admin", Permission::AdminOnly),
            UrlPermission::with_method("/reg", "POST", Permission::AdminOnly),
            UrlPermission::new("/reg", Permission::AnyUser),
        ]
        .into_iter()
        .collect()
    }

    fn alice() -> Principal {
        Principal::new("alice", Role::user())
    }

    fn root() -> Principal {
        Principal::new("root", Role::admin())
    }

    #[test]
    fn any_user_rules_admit_anonymous_callers() {
        assert!(authorize_request(&registry(), None, "GET", "/index").is_ok());
    }

    #[test]
    fn user_admin_rules_need_a_known_authority() {
        let reg = registry();
        assert!(authorize_request(&reg, Some(&alice()), "DELETE", "/users").is_ok());
        assert!(authorize_request(&reg, Some(&root()), "GET", "/users").is_ok());
        assert_eq!(
            authorize_request(&reg, None, "GET", "/users"),
            Err(AuthzError::Unauthenticated {
                method: "GET".to_string(),
                url: "/users".to_string()
            })
        );

        let stranger = Principal::new("bob", Role::new("ROLE_GUEST"));
        assert!(matches!(
            authorize_request(&reg, Some(&stranger), "GET", "/users"),
            Err(AuthzError::Forbidden { required: Permission::UserAdmin, .. })
        ));
    }

    #[test]
    fn admin_only_rejects_users() {
        let reg = registry();
        assert!(authorize_request(&reg, Some(&root()), "GET", "/admin").is_ok());
        assert!(matches!(
            authorize_request(&reg, Some(&alice()), "get", "/admin"),
            Err(AuthzError::Forbidden { required: Permission::AdminOnly, .. })
        ));
    }

    #[test]
    fn method_scoped_rules_are_distinguished() {
        let reg = registry();
        assert!(authorize_request(&reg, None, "GET", "/reg").is_ok());
        assert!(authorize_request(&reg, Some(&alice()), "POST", "/reg").is_err());
    }

    #[test]
    fn unknown_urls_require_authentication() {
        let reg = registry();
        assert!(authorize_request(&reg, Some(&alice()), "GET", "/elsewhere").is_ok());
        assert!(authorize_request(&reg, None, "GET", "/elsewhere").is_err());
    }

    #[test]
    fn explanation_names_the_deciding_rule() {
        let explanation = explain_request(&registry(), Some(&alice()), "post", "/reg");
        assert_eq!(explanation.matched_rule, Some(3));
        assert_eq!(explanation.required_permission, Some(Permission::AdminOnly));
        assert_eq!(explanation.method, "POST");
        assert!(!explanation.granted);
        assert!(explanation.reason.contains("ROLE_USER"));
    }
}
