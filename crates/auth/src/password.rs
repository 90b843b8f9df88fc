//! Password strength rules and their compiled matcher.
//!
//! A policy renders to a single anchored pattern string such as
//! `^(?=.*[0-9])(?=.*[A-Z]).{8,}$`. That string is the stable, comparable form
//! of the policy. The `regex` crate has no look-around, so each lookahead is
//! compiled as its own `^.*[class]` search and the length rule as
//! `^.{min,max}$`; a candidate matches only when every part matches, which is
//! what the combined pattern means.

use regex::Regex;
use serde::{Deserialize, Serialize};

use usman_core::{ConfigError, ConfigResult, ValueObject};

/// Characters accepted by the "special character" rule.
pub const DEFAULT_SPECIAL_CHARACTERS: &str = "!@#&()–[{}]:;',?/*~$^+=<>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: u32,
    /// Upper bound on length; `0` means unbounded.
    pub max_length: u32,
    pub require_digit: bool,
    pub require_lower: bool,
    pub require_upper: bool,
    pub require_special: bool,
    /// Body of the character class used by the special-character rule.
    pub special_characters: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 0,
            require_digit: false,
            require_lower: false,
            require_upper: false,
            require_special: false,
            special_characters: DEFAULT_SPECIAL_CHARACTERS.to_string(),
        }
    }
}

impl ValueObject for PasswordPolicy {}

impl PasswordPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, min_length: u32) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn require_digit(mut self, required: bool) -> Self {
        self.require_digit = required;
        self
    }

    pub fn require_lower(mut self, required: bool) -> Self {
        self.require_lower = required;
        self
    }

    pub fn require_upper(mut self, required: bool) -> Self {
        self.require_upper = required;
        self
    }

    pub fn require_special(mut self, required: bool) -> Self {
        self.require_special = required;
        self
    }

    pub fn special_characters(mut self, characters: impl Into<String>) -> Self {
        self.special_characters = characters.into();
        self
    }

    /// Character classes that must each appear at least once, in the fixed
    /// order digit, lower, upper, special.
    fn required_classes(&self) -> Vec<String> {
        let mut classes = Vec::with_capacity(4);
        if self.require_digit {
            classes.push("[0-9]".to_string());
        }
        if self.require_lower {
            classes.push("[a-z]".to_string());
        }
        if self.require_upper {
            classes.push("[A-Z]".to_string());
        }
        if self.require_special {
            classes.push(format!("[{}]", self.special_characters));
        }
        classes
    }

    fn length_quantifier(&self) -> String {
        if self.max_length > 0 {
            format!("{{{},{}}}", self.min_length, self.max_length)
        } else {
            format!("{{{},}}", self.min_length)
        }
    }

    /// The policy rendered as one anchored pattern with lookaheads.
    pub fn pattern(&self) -> String {
        let mut pattern = String::from("^");
        for class in self.required_classes() {
            pattern.push_str("(?=.*");
            pattern.push_str(&class);
            pattern.push(')');
        }
        pattern.push('.');
        pattern.push_str(&self.length_quantifier());
        pattern.push('$');
        pattern
    }

    /// Compile the policy into a matcher.
    ///
    /// Fails when a part does not compile, e.g. a malformed custom special
    /// character class or a minimum above the maximum.
    pub fn compile(&self) -> ConfigResult<PasswordMatcher> {
        let pattern = self.pattern();
        let build = |source: String| {
            Regex::new(&source).map_err(|e| ConfigError::password_pattern(pattern.clone(), e))
        };

        let requirements = self
            .required_classes()
            .into_iter()
            .map(|class| build(format!("^.*{class}")))
            .collect::<ConfigResult<Vec<_>>>()?;
        let length = build(format!("^.{}$", self.length_quantifier()))?;

        tracing::debug!(%pattern, "password matcher compiled");
        Ok(PasswordMatcher {
            pattern,
            requirements,
            length,
        })
    }
}

/// Compiled form of a [`PasswordPolicy`].
#[derive(Debug, Clone)]
pub struct PasswordMatcher {
    pattern: String,
    requirements: Vec<Regex>,
    length: Regex,
}

impl PasswordMatcher {
    /// Whether `candidate` satisfies every rule of the policy.
    pub fn is_match(&self, candidate: &str) -> bool {
        self.length.is_match(candidate) && self.requirements.iter().all(|r| r.is_match(candidate))
    }

    /// The combined pattern this matcher was built from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl core::fmt::Display for PasswordMatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.pattern)
    }
}
