//! Enable-predicates over boolean settings.
//!
//! Two forms are accepted: a bare flag (`enable_tke`) and its negation
//! (`not enable_hydrostatic`). Anything else is rejected when the catalog
//! is built, long before allocation.

use std::fmt;

use gyre_core::{SettingKind, Settings, SettingsError};

/// A parsed enable-predicate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// True when the flag is set.
    Flag(String),
    /// True when the flag is not set.
    Not(String),
}

impl Predicate {
    /// Parse `<flag>` or `not <flag>`. Returns the rejection reason on
    /// failure.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let tokens: Vec<&str> = expr.split_whitespace().collect();
        match tokens.as_slice() {
            [] => Err("empty predicate".to_string()),
            ["not"] => Err("'not' requires a flag".to_string()),
            [flag] => identifier(flag).map(|f| Self::Flag(f.to_string())),
            ["not", flag] => identifier(flag).map(|f| Self::Not(f.to_string())),
            _ => Err("only '<flag>' and 'not <flag>' are supported".to_string()),
        }
    }

    /// The setting the predicate reads.
    pub fn flag(&self) -> &str {
        match self {
            Self::Flag(f) | Self::Not(f) => f,
        }
    }

    /// Evaluate against frozen settings.
    pub fn evaluate(&self, settings: &Settings) -> Result<bool, SettingsError> {
        match self {
            Self::Flag(f) => settings.flag(f),
            Self::Not(f) => settings.flag(f).map(|on| !on),
        }
    }

    /// Check that the flag is registered and boolean.
    pub(crate) fn check(&self, settings: &Settings) -> Result<(), SettingsError> {
        let kind = settings.kind(self.flag())?;
        if kind != SettingKind::Bool {
            return Err(SettingsError::TypeMismatch {
                name: self.flag().to_string(),
                expected: SettingKind::Bool.as_str(),
                found: kind.as_str(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => f.write_str(flag),
            Self::Not(flag) => write!(f, "not {flag}"),
        }
    }
}

fn identifier(token: &str) -> Result<&str, String> {
    let mut chars = token.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("'{token}' is not a setting name"));
    }
    if token == "not" {
        return Err("'not' is reserved".to_string());
    }
    Ok(token)
}
