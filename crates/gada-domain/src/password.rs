//! Password strength policy.
//!
//! A password must be at least [`MIN_PASSWORD_LEN`] characters and contain at
//! least one lowercase letter, one uppercase letter, one digit and one symbol.
//! Violations are reported as the full list of failed rules so callers can
//! tell the user exactly what is missing.

use std::fmt;

use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 8;

/// A single password rule that a candidate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRule {
    Length,
    Lowercase,
    Uppercase,
    Digit,
    Symbol,
}

impl PasswordRule {
    pub fn description(self) -> &'static str {
        match self {
            Self::Length => "at least 8 characters",
            Self::Lowercase => "a lowercase letter",
            Self::Uppercase => "an uppercase letter",
            Self::Digit => "a digit",
            Self::Symbol => "a symbol",
        }
    }
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Check `password` against the policy.
///
/// Length is counted in characters, not bytes. Any character that is neither
/// alphanumeric nor whitespace counts as a symbol.
pub fn check_password_strength(password: &str) -> Result<(), Vec<PasswordRule>> {
    let mut missing = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push(PasswordRule::Length);
    }
    if !password.chars().any(char::is_lowercase) {
        missing.push(PasswordRule::Lowercase);
    }
    if !password.chars().any(char::is_uppercase) {
        missing.push(PasswordRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push(PasswordRule::Digit);
    }
    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        missing.push(PasswordRule::Symbol);
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
