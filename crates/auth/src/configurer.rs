//! The authorization configurer.
//!
//! Built once at startup: callers set values, then `configure()` merges the
//! provider rules, applies the registration policy and seals the object.
//! After that it is read-only and can be shared across request threads.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use usman_core::ConfigResult;

use crate::password::{PasswordMatcher, PasswordPolicy};
use crate::permissions::{Permission, UrlPermission};
use crate::provider::PermissionPathsProvider;
use crate::registry::PermissionRegistry;
use crate::seal::SealState;
use crate::settings::AuthSettings;
use crate::urls::{UrlSchemeProvider, UrlsConfigurer};

const COMPONENT: &str = "AuthorizationConfigurer";

pub struct AuthorizationConfigurer {
    settings: AuthSettings,
    registry: PermissionRegistry,
    password_policy: PasswordPolicy,
    password_matcher: OnceLock<PasswordMatcher>,
    resource_handlers: HashMap<String, Vec<String>>,
    urls: Arc<dyn UrlSchemeProvider>,
    providers: Vec<Arc<dyn PermissionPathsProvider>>,
    state: SealState,
}

impl Default for AuthorizationConfigurer {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationConfigurer {
    /// Configurer with default settings and URLs and no providers.
    pub fn new() -> Self {
        Self::from_settings(AuthSettings::default(), Arc::new(UrlsConfigurer::new()), Vec::new())
    }

    pub fn with_collaborators(
        urls: Arc<dyn UrlSchemeProvider>,
        providers: Vec<Arc<dyn PermissionPathsProvider>>,
    ) -> Self {
        Self::from_settings(AuthSettings::default(), urls, providers)
    }

    pub fn from_settings(
        settings: AuthSettings,
        urls: Arc<dyn UrlSchemeProvider>,
        providers: Vec<Arc<dyn PermissionPathsProvider>>,
    ) -> Self {
        Self {
            settings,
            registry: PermissionRegistry::new(),
            password_policy: PasswordPolicy::default(),
            password_matcher: OnceLock::new(),
            resource_handlers: HashMap::new(),
            urls,
            providers,
            state: SealState::Open,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutators (all fail once sealed)
    // ─────────────────────────────────────────────────────────────────────

    fn edit(&mut self, apply: impl FnOnce(&mut Self)) -> ConfigResult<&mut Self> {
        self.state.ensure_open(COMPONENT)?;
        apply(self);
        Ok(self)
    }

    pub fn set_login_page_title(&mut self, title: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.login_page_title = title.into())
    }

    pub fn set_application_url(&mut self, url: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.application_url = url.into())
    }

    pub fn set_password_error_message(
        &mut self,
        message: impl Into<String>,
    ) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.password_error_message = message.into())
    }

    pub fn set_csrf_enabled(&mut self, enabled: bool) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.csrf_enabled = enabled)
    }

    pub fn set_registration_allowed(&mut self, allowed: bool) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.registration_allowed = allowed)
    }

    pub fn set_max_auth_failure_count(&mut self, count: u32) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.max_auth_failure_count = count)
    }

    pub fn set_auth_failure_block_minutes(&mut self, minutes: u32) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.auth_failure_block_minutes = minutes)
    }

    pub fn set_remember_me_validity_seconds(&mut self, seconds: u32) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.remember_me_validity_seconds = seconds)
    }

    pub fn set_csrf_token_validity_seconds(&mut self, seconds: u32) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.csrf_token_validity_seconds = seconds)
    }

    pub fn set_google_client_id(&mut self, client_id: impl Into<String>) -> ConfigResult<&mut Self> {
        self.edit(|c| c.settings.oauth2.google_client_id = Some(client_id.into()))
    }

    /// Replace the password policy.
    ///
    /// The matcher is compiled on first read and never rebuilt, so set the
    /// policy before calling [`Self::password_matcher`].
    pub fn set_password_policy(&mut self, policy: PasswordPolicy) -> ConfigResult<&mut Self> {
        self.edit(|c| {
            if c.password_matcher.get().is_some() {
                tracing::warn!("password policy changed after its matcher was compiled; the old matcher stays in use");
            }
            c.password_policy = policy;
        })
    }

    pub fn add_permission(&mut self, permission: UrlPermission) -> ConfigResult<&mut Self> {
        self.edit(|c| c.registry.add(permission))
    }

    pub fn add_permissions<I>(&mut self, permissions: I) -> ConfigResult<&mut Self>
    where
        I: IntoIterator<Item = UrlPermission>,
    {
        self.edit(|c| c.registry.extend(permissions))
    }

    /// Serve static resources under `path` from `locations`, after any
    /// locations already registered for the same path.
    pub fn add_resource_handler<I, S>(
        &mut self,
        path: impl Into<String>,
        locations: I,
    ) -> ConfigResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edit(|c| {
            c.resource_handlers
                .entry(path.into())
                .or_default()
                .extend(locations.into_iter().map(Into::into));
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Seal
    // ─────────────────────────────────────────────────────────────────────

    /// Merge provider rules, apply the registration policy and seal.
    ///
    /// Not atomic: if a provider fails, the rules merged so far stay in the
    /// registry, the configurer stays open and the call may be retried
    /// (which merges the successful providers again).
    pub fn configure(&mut self) -> ConfigResult<&Self> {
        self.state.ensure_open(COMPONENT)?;
        self.merge_provider_permissions()?;
        self.apply_registration_policy();
        self.state.seal(COMPONENT)?;
        Ok(self)
    }

    fn merge_provider_permissions(&mut self) -> ConfigResult<()> {
        for provider in &self.providers {
            for tier in Permission::MERGE_ORDER {
                let paths = provider
                    .permission_paths(tier)
                    .map_err(|e| usman_core::ConfigError::provider(provider.name(), tier, e))?;
                tracing::debug!(provider = provider.name(), %tier, count = paths.len(), "merging provider permissions");
                self.registry.extend(paths);
            }
        }
        Ok(())
    }

    fn apply_registration_policy(&mut self) {
        if self.settings.registration_allowed {
            return;
        }
        let registration = self.urls.registration_url().to_string();
        let submit = self.urls.registration_submit_url().to_string();
        tracing::info!(%registration, %submit, "registration disabled; restricting registration urls to admins");

        self.registry.override_permission(&registration, None, Permission::AdminOnly);
        self.registry.override_permission(&submit, None, Permission::AdminOnly);
        self.registry.override_permission(&submit, Some("POST"), Permission::AdminOnly);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn is_configured(&self) -> bool {
        self.state.is_sealed()
    }

    pub fn state(&self) -> SealState {
        self.state
    }

    /// Compiled password matcher, built from the policy on first call.
    ///
    /// A compile failure is returned here, not from `configure()`; nothing is
    /// cached in that case.
    pub fn password_matcher(&self) -> ConfigResult<&PasswordMatcher> {
        if let Some(matcher) = self.password_matcher.get() {
            return Ok(matcher);
        }
        // Two threads racing here both compile the same policy; one result wins.
        let compiled = self.password_policy.compile()?;
        Ok(self.password_matcher.get_or_init(|| compiled))
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.password_policy
    }

    pub fn permissions(&self) -> &PermissionRegistry {
        &self.registry
    }

    pub fn resource_handlers(&self) -> &HashMap<String, Vec<String>> {
        &self.resource_handlers
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn urls(&self) -> &dyn UrlSchemeProvider {
        self.urls.as_ref()
    }

    pub fn login_page_title(&self) -> &str {
        &self.settings.login_page_title
    }

    pub fn application_url(&self) -> &str {
        &self.settings.application_url
    }

    pub fn password_error_message(&self) -> &str {
        &self.settings.password_error_message
    }

    pub fn csrf_enabled(&self) -> bool {
        self.settings.csrf_enabled
    }

    pub fn registration_allowed(&self) -> bool {
        self.settings.registration_allowed
    }

    pub fn max_auth_failure_count(&self) -> u32 {
        self.settings.max_auth_failure_count
    }

    pub fn auth_failure_block_minutes(&self) -> u32 {
        self.settings.auth_failure_block_minutes
    }

    pub fn remember_me_validity_seconds(&self) -> u32 {
        self.settings.remember_me_validity_seconds
    }

    pub fn csrf_token_validity_seconds(&self) -> u32 {
        self.settings.csrf_token_validity_seconds
    }

    pub fn is_google_auth_allowed(&self) -> bool {
        self.settings.oauth2.google_enabled()
    }
}

impl core::fmt::Debug for AuthorizationConfigurer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationConfigurer")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("password_policy", &self.password_policy)
            .field("password_matcher", &self.password_matcher.get().map(|m| m.as_str()))
            .field("resource_handlers", &self.resource_handlers)
            .field("providers", &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticPermissionPaths;
    use std::sync::atomic::{AtomicBool, Ordering};
    use usman_core::ConfigError;

    fn reg_urls() -> Arc<UrlsConfigurer> {
        let mut urls = UrlsConfigurer::new();
        urls.set_registration_url("/reg")
            .unwrap()
            .set_perform_register_url("/reg/submit")
            .unwrap();
        urls.configure().unwrap();
        Arc::new(urls)
    }

    fn rows(configurer: &AuthorizationConfigurer) -> Vec<(&str, &str, Permission)> {
        configurer
            .permissions()
            .iter()
            .map(|p| (p.url(), p.http_method(), p.permission()))
            .collect()
    }

    struct FailingProvider;

    impl PermissionPathsProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn permission_paths(&self, tier: Permission) -> anyhow::Result<Vec<UrlPermission>> {
            match tier {
                Permission::AdminOnly => anyhow::bail!("backing file unreadable"),
                _ => Ok(vec![UrlPermission::new("/partial", tier)]),
            }
        }
    }

    #[test]
    fn defaults_match_settings() {
        let configurer = AuthorizationConfigurer::new();
        assert_eq!(configurer.application_url(), "http://127.0.0.1:8085");
        assert_eq!(configurer.password_error_message(), "Wrong password!");
        assert!(configurer.csrf_enabled());
        assert!(configurer.registration_allowed());
        assert_eq!(configurer.max_auth_failure_count(), 3);
        assert_eq!(configurer.auth_failure_block_minutes(), 60);
        assert_eq!(configurer.remember_me_validity_seconds(), 1_209_600);
        assert_eq!(configurer.csrf_token_validity_seconds(), 1_209_600);
        assert!(!configurer.is_google_auth_allowed());
        assert!(!configurer.is_configured());
    }

    #[test]
    fn mutators_chain() {
        let mut configurer = AuthorizationConfigurer::new();
        configurer
            .set_login_page_title("Sign in")
            .unwrap()
            .set_csrf_enabled(false)
            .unwrap()
            .set_max_auth_failure_count(5)
            .unwrap()
            .set_google_client_id("google-id")
            .unwrap();

        assert_eq!(configurer.login_page_title(), "Sign in");
        assert!(!configurer.csrf_enabled());
        assert_eq!(configurer.max_auth_failure_count(), 5);
        assert!(configurer.is_google_auth_allowed());
    }

    #[test]
    fn every_mutator_fails_once_sealed() {
        let mut c = AuthorizationConfigurer::new();
        c.add_permission(UrlPermission::new("/index", Permission::AnyUser)).unwrap();
        c.configure().unwrap();

        assert!(c.set_login_page_title("x").unwrap_err().is_sealed());
        assert!(c.set_application_url("x").unwrap_err().is_sealed());
        assert!(c.set_password_error_message("x").unwrap_err().is_sealed());
        assert!(c.set_csrf_enabled(false).unwrap_err().is_sealed());
        assert!(c.set_registration_allowed(false).unwrap_err().is_sealed());
        assert!(c.set_max_auth_failure_count(1).unwrap_err().is_sealed());
        assert!(c.set_auth_failure_block_minutes(1).unwrap_err().is_sealed());
        assert!(c.set_remember_me_validity_seconds(1).unwrap_err().is_sealed());
        assert!(c.set_csrf_token_validity_seconds(1).unwrap_err().is_sealed());
        assert!(c.set_google_client_id("x").unwrap_err().is_sealed());
        assert!(c.set_password_policy(PasswordPolicy::new()).unwrap_err().is_sealed());
        assert!(c.add_permission(UrlPermission::new("/x", Permission::AnyUser)).unwrap_err().is_sealed());
        assert!(c.add_permissions(Vec::new()).unwrap_err().is_sealed());
        assert!(c.add_resource_handler("/css/**", ["classpath:/static/css/"]).unwrap_err().is_sealed());
        assert!(c.configure().unwrap_err().is_sealed());

        // Reads still work.
        assert_eq!(c.permissions().len(), 1);
        assert_eq!(c.application_url(), "http://127.0.0.1:8085");
        assert!(c.password_matcher().is_ok());
    }

    #[test]
    fn resource_handler_locations_accumulate() {
        let mut c = AuthorizationConfigurer::new();
        c.add_resource_handler("/js/**", ["classpath:/static/js/"])
            .unwrap()
            .add_resource_handler("/css/**", ["classpath:/static/css/"])
            .unwrap()
            .add_resource_handler("/js/**", ["file:/opt/js/", "classpath:/vendor/js/"])
            .unwrap();

        assert_eq!(
            c.resource_handlers()["/js/**"],
            vec!["classpath:/static/js/", "file:/opt/js/", "classpath:/vendor/js/"]
        );
        assert_eq!(c.resource_handlers()["/css/**"], vec!["classpath:/static/css/"]);
    }

    #[test]
    fn registration_disabled_restricts_registration_urls() {
        let mut c = AuthorizationConfigurer::with_collaborators(reg_urls(), Vec::new());
        c.add_permission(UrlPermission::new("/reg", Permission::AnyUser))
            .unwrap()
            .add_permission(UrlPermission::new("/reg/submit", Permission::AnyUser))
            .unwrap()
            .set_registration_allowed(false)
            .unwrap();

        c.configure().unwrap();

        assert_eq!(
            rows(&c),
            vec![
                ("/reg", "GET", Permission::AdminOnly),
                ("/reg/submit", "GET", Permission::AdminOnly),
                ("/reg/submit", "POST", Permission::AdminOnly),
            ]
        );
    }

    #[test]
    fn registration_disabled_replaces_existing_post_rule() {
        let mut c = AuthorizationConfigurer::with_collaborators(reg_urls(), Vec::new());
        c.add_permission(UrlPermission::new("/reg/submit", Permission::AnyUser))
            .unwrap()
            .add_permission(UrlPermission::with_method("/reg/submit", "POST", Permission::AnyUser))
            .unwrap()
            .set_registration_allowed(false)
            .unwrap();

        c.configure().unwrap();

        assert_eq!(
            rows(&c),
            vec![
                ("/reg/submit", "GET", Permission::AdminOnly),
                ("/reg/submit", "POST", Permission::AdminOnly),
                ("/reg", "GET", Permission::AdminOnly),
            ]
        );
    }

    #[test]
    fn registration_allowed_leaves_rules_untouched() {
        let mut c = AuthorizationConfigurer::with_collaborators(reg_urls(), Vec::new());
        c.add_permission(UrlPermission::new("/reg", Permission::AnyUser)).unwrap();
        c.configure().unwrap();
        assert_eq!(rows(&c), vec![("/reg", "GET", Permission::AnyUser)]);
    }

    #[test]
    fn providers_are_merged_in_tier_order_after_explicit_rules() {
        let provider = StaticPermissionPaths::new("module")
            .path(Permission::UserAdmin, "/profile")
            .path(Permission::AdminOnly, "/admin")
            .path(Permission::AnyUser, "/login")
            .path(Permission::AdminOnly, "/admin/users")
            .path(Permission::AnyUser, "/logout");
        let mut c = AuthorizationConfigurer::with_collaborators(reg_urls(), vec![Arc::new(provider)]);
        c.add_permission(UrlPermission::new("/index", Permission::AnyUser)).unwrap();

        c.configure().unwrap();

        let urls: Vec<&str> = c.permissions().iter().map(|p| p.url()).collect();
        assert_eq!(urls, vec!["/index", "/login", "/logout", "/admin", "/admin/users", "/profile"]);
    }

    #[test]
    fn duplicate_rules_from_several_providers_are_kept() {
        let a = StaticPermissionPaths::new("a").path(Permission::AnyUser, "/shared");
        let b = StaticPermissionPaths::new("b").path(Permission::AnyUser, "/shared");
        let mut c = AuthorizationConfigurer::with_collaborators(reg_urls(), vec![Arc::new(a), Arc::new(b)]);

        c.configure().unwrap();

        assert_eq!(c.permissions().len(), 2);
    }

    #[test]
    fn provider_failure_leaves_configurer_open() {
        let mut c = AuthorizationConfigurer::with_collaborators(reg_urls(), vec![Arc::new(FailingProvider)]);

        let err = c.configure().unwrap_err();

        match &err {
            ConfigError::Provider { provider, tier, .. } => {
                assert_eq!(provider, "failing");
                assert_eq!(tier, "ADMIN_ONLY");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        assert!(!c.is_configured());
        // ANY_USER was merged before ADMIN_ONLY failed.
        assert_eq!(rows(&c), vec![("/partial", "GET", Permission::AnyUser)]);
        assert!(c.set_login_page_title("still open").is_ok());
    }

    /// Fails on the ADMIN_ONLY tier the first time, then recovers.
    #[derive(Default)]
    struct RecoveringProvider {
        failed_once: AtomicBool,
    }

    impl PermissionPathsProvider for RecoveringProvider {
        fn name(&self) -> &str {
            "recovering"
        }

        fn permission_paths(&self, tier: Permission) -> anyhow::Result<Vec<UrlPermission>> {
            match tier {
                Permission::AnyUser => Ok(vec![UrlPermission::new("/partial", tier)]),
                Permission::AdminOnly if !self.failed_once.swap(true, Ordering::SeqCst) => {
                    anyhow::bail!("backing file briefly unreadable")
                }
                Permission::AdminOnly => Ok(vec![UrlPermission::new("/admin", tier)]),
                Permission::UserAdmin => Ok(Vec::new()),
            }
        }
    }

    #[test]
    fn configure_can_be_retried_after_provider_failure() {
        let mut c = AuthorizationConfigurer::with_collaborators(
            reg_urls(),
            vec![Arc::new(RecoveringProvider::default())],
        );

        assert!(matches!(c.configure(), Err(ConfigError::Provider { .. })));
        assert!(!c.is_configured());

        c.configure().unwrap();

        assert!(c.is_configured());
        // The rule merged by the failed attempt is merged again.
        assert_eq!(
            rows(&c),
            vec![
                ("/partial", "GET", Permission::AnyUser),
                ("/partial", "GET", Permission::AnyUser),
                ("/admin", "GET", Permission::AdminOnly),
            ]
        );
        assert!(c.configure().unwrap_err().is_sealed());
        assert!(c.set_login_page_title("late").unwrap_err().is_sealed());
    }

    #[test]
    fn password_matcher_is_compiled_once() {
        let mut c = AuthorizationConfigurer::new();
        c.set_password_policy(
            PasswordPolicy::new().min_length(8).require_digit(true).require_upper(true),
        )
        .unwrap();

        let first = c.password_matcher().unwrap().as_str().to_string();
        assert_eq!(first, "^(?=.*[0-9])(?=.*[A-Z]).{8,}$");

        c.set_password_policy(PasswordPolicy::new().min_length(1)).unwrap();
        assert_eq!(c.password_matcher().unwrap().as_str(), first);
    }

    #[test]
    fn password_compile_error_surfaces_on_first_read() {
        let mut c = AuthorizationConfigurer::new();
        c.set_password_policy(PasswordPolicy::new().min_length(9).max_length(3)).unwrap();

        c.configure().unwrap();

        assert!(matches!(c.password_matcher(), Err(ConfigError::PasswordPattern { .. })));
    }

    #[test]
    fn sealed_configurer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthorizationConfigurer>();

        let mut c = AuthorizationConfigurer::new();
        c.configure().unwrap();
        let shared = Arc::new(c);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&shared);
                std::thread::spawn(move || c.password_matcher().unwrap().is_match("abcd"))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_rule() -> impl Strategy<Value = UrlPermission> {
            (
                "/[a-d]{1,2}",
                prop_oneof![Just("GET"), Just("POST"), Just("*")],
                prop_oneof![
                    Just(Permission::AnyUser),
                    Just(Permission::UserAdmin),
                    Just(Permission::AdminOnly),
                ],
            )
                .prop_map(|(url, method, permission)| {
                    UrlPermission::with_method(url, method, permission)
                })
        }

        proptest! {
            /// Property: explicit rules come out of `configure()` in the order
            /// they were added, ahead of the registration rules.
            #[test]
            fn added_rules_keep_order_through_configure(
                rules in prop::collection::vec(arb_rule(), 0..16),
            ) {
                let mut c = AuthorizationConfigurer::with_collaborators(reg_urls(), Vec::new());
                for rule in &rules {
                    c.add_permission(rule.clone()).unwrap();
                }
                c.set_registration_allowed(false).unwrap();

                c.configure().unwrap();

                let expected: Vec<(&str, &str, Permission)> = rules
                    .iter()
                    .map(|p| (p.url(), p.http_method(), p.permission()))
                    .collect();
                let actual = rows(&c);
                prop_assert_eq!(&actual[..rules.len()], &expected[..]);
                prop_assert_eq!(
                    &actual[rules.len()..],
                    &[
                        ("/reg", "GET", Permission::AdminOnly),
                        ("/reg/submit", "GET", Permission::AdminOnly),
                        ("/reg/submit", "POST", Permission::AdminOnly),
                    ][..]
                );
            }
        }
    }
}
