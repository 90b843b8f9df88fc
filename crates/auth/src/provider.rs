//! Sources of pre-declared URL permissions.
//!
//! Feature modules of a host application each ship the rules for their own
//! endpoints. The configurer asks every provider for every tier while it is
//! being configured.

use std::collections::HashMap;

use crate::permissions::{Permission, UrlPermission};

/// Contract for anything that declares URL permissions.
pub trait PermissionPathsProvider: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Rules declared for `tier`. May be empty.
    fn permission_paths(&self, tier: Permission) -> anyhow::Result<Vec<UrlPermission>>;
}

/// Provider backed by fixed, in-memory lists.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissionPaths {
    name: String,
    paths: HashMap<Permission, Vec<UrlPermission>>,
}

impl StaticPermissionPaths {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: HashMap::new(),
        }
    }

    /// Declare `url` under `tier` for the default method.
    pub fn path(self, tier: Permission, url: impl Into<String>) -> Self {
        self.rule(tier, UrlPermission::new(url, tier))
    }

    /// Declare `url` under `tier` for `method`.
    pub fn method_path(
        self,
        tier: Permission,
        url: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        self.rule(tier, UrlPermission::with_method(url, method, tier))
    }

    fn rule(mut self, tier: Permission, rule: UrlPermission) -> Self {
        self.paths.entry(tier).or_default().push(rule);
        self
    }
}

impl PermissionPathsProvider for StaticPermissionPaths {
    fn name(&self) -> &str {
        &self.name
    }

    fn permission_paths(&self, tier: Permission) -> anyhow::Result<Vec<UrlPermission>> {
        Ok(self.paths.get(&tier).cloned().unwrap_or_default())
    }
}
