//! Ordered URL permission rules.
//!
//! Order is significant: request admission takes the first matching rule, so
//! overrides replace rules in place rather than moving them.

use serde::{Deserialize, Serialize};

use crate::permissions::{DEFAULT_HTTP_METHOD, Permission, UrlPermission};

/// What an override did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// An existing rule at this index now carries the new permission.
    Replaced(usize),
    /// A new rule was pushed at this index.
    Appended(usize),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionRegistry {
    entries: Vec<UrlPermission>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. No deduplication happens here.
    pub fn add(&mut self, permission: UrlPermission) {
        self.entries.push(permission);
    }

    pub fn extend<I>(&mut self, permissions: I)
    where
        I: IntoIterator<Item = UrlPermission>,
    {
        self.entries.extend(permissions);
    }

    /// Index of the first rule for `url`.
    ///
    /// With `method` set, only a rule for exactly that method counts.
    pub fn find_index(&self, url: &str, method: Option<&str>) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry.url() == url && method.is_none_or(|m| entry.http_method().eq_ignore_ascii_case(m))
        })
    }

    /// Method of the first rule for `url`, or the default method if none.
    pub fn method_of(&self, url: &str) -> &str {
        self.find_index(url, None)
            .map(|i| self.entries[i].http_method())
            .unwrap_or(DEFAULT_HTTP_METHOD)
    }

    /// Give `url` the permission `permission`.
    ///
    /// Existence is decided by url alone. Without a method, the first rule for
    /// the url is replaced in place and keeps its own method. With a method,
    /// the rule for that exact method is replaced in place if there is one;
    /// otherwise a new rule is appended so other methods keep their rules.
    /// An unknown url always gets a new rule.
    pub fn override_permission(
        &mut self,
        url: &str,
        method: Option<&str>,
        permission: Permission,
    ) -> OverrideOutcome {
        let outcome = match (self.find_index(url, None), method) {
            (Some(index), None) => {
                let method = self.entries[index].http_method().to_string();
                self.entries[index] = UrlPermission::with_method(url, method, permission);
                OverrideOutcome::Replaced(index)
            }
            (Some(_), Some(method)) => match self.find_index(url, Some(method)) {
                Some(index) => {
                    self.entries[index] = UrlPermission::with_method(url, method, permission);
                    OverrideOutcome::Replaced(index)
                }
                None => self.push(UrlPermission::with_method(url, method, permission)),
            },
            (None, None) => self.push(UrlPermission::new(url, permission)),
            (None, Some(method)) => self.push(UrlPermission::with_method(url, method, permission)),
        };
        tracing::debug!(url, ?method, %permission, ?outcome, "permission overridden");
        outcome
    }

    /// First rule that applies to a request for `url` with `method`, with its
    /// position.
    pub fn resolve_indexed(&self, url: &str, method: &str) -> Option<(usize, &UrlPermission)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.url() == url && entry.matches_method(method))
    }

    /// First rule that applies to a request for `url` with `method`.
    pub fn resolve(&self, url: &str, method: &str) -> Option<&UrlPermission> {
        self.resolve_indexed(url, method).map(|(_, entry)| entry)
    }

    pub fn get(&self, index: usize) -> Option<&UrlPermission> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UrlPermission> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[UrlPermission] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, permission: UrlPermission) -> OverrideOutcome {
        self.entries.push(permission);
        OverrideOutcome::Appended(self.entries.len() - 1)
    }
}

impl FromIterator<UrlPermission> for PermissionRegistry {
    fn from_iter<I: IntoIterator<Item = UrlPermission>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PermissionRegistry {
    type Item = &'a UrlPermission;
    type IntoIter = core::slice::Iter<'a, UrlPermission>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
