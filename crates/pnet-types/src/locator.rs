//! Resolved store locators.
//!
//! A locator names one physical backing store:
//!
//! ```text
//! [modifier:]*scheme://address
//! ```
//!
//! - `scheme` starts with an ASCII letter, followed by letters, digits,
//!   `+`, `-` or `.`
//! - `modifier` is one of `prettyprint`, `readonly`, `transient`
//! - `address` is opaque to this crate, non-empty, and free of whitespace,
//!   control characters and [`FORBIDDEN_CHARS`]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a locator address.
pub const FORBIDDEN_CHARS: &[char] = &[
    '$', '"', '<', '>', '\\', '^', '`', '{', '}', '|', '*', '?', '#', '(', ')', '[', ']', '!',
];

const SCHEME_DELIMITER: &str = "://";

/// A flag prefixed to a locator. Modifiers never change routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Human-friendly serialization.
    PrettyPrint,
    /// Mutations are rejected.
    ReadOnly,
    /// Backing data is re-read before every read.
    Transient,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrettyPrint => "prettyprint",
            Self::ReadOnly => "readonly",
            Self::Transient => "transient",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "prettyprint" => Some(Self::PrettyPrint),
            "readonly" => Some(Self::ReadOnly),
            "transient" => Some(Self::Transient),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully expanded store locator. Never contains `$`.
///
/// Equality, ordering and hashing follow the raw string, which is also the
/// cache key the store registry memoizes on.
///
/// # Examples
///
/// ```
/// use pnet_types::{Modifier, ResolvedLocator};
///
/// let loc = ResolvedLocator::parse("prettyprint:yml://folder/a.yml").unwrap();
/// assert_eq!(loc.scheme(), "yml");
/// assert_eq!(loc.address(), "folder/a.yml");
/// assert!(loc.has_modifier(Modifier::PrettyPrint));
/// assert!(ResolvedLocator::parse("folder/a.yml").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResolvedLocator {
    raw: String,
    modifiers: Vec<Modifier>,
    scheme: String,
    address: String,
}

impl ResolvedLocator {
    /// Parse and validate a locator string.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let invalid = |reason: String| TypeError::InvalidLocator {
            locator: raw.to_string(),
            reason,
        };

        if raw.contains('$') {
            return Err(invalid("contains an unresolved '$' reference".into()));
        }

        let (head, address) = raw
            .split_once(SCHEME_DELIMITER)
            .ok_or_else(|| invalid(format!("missing '{SCHEME_DELIMITER}' after scheme")))?;

        let mut parts: Vec<&str> = head.split(':').collect();
        // `split` always yields at least one element.
        let scheme = parts.pop().unwrap_or_default();
        validate_scheme(scheme).map_err(invalid)?;

        let mut modifiers = Vec::with_capacity(parts.len());
        for name in parts {
            let modifier =
                Modifier::from_name(name).ok_or_else(|| invalid(format!("unknown modifier {name:?}")))?;
            if !modifiers.contains(&modifier) {
                modifiers.push(modifier);
            }
        }

        validate_address(address).map_err(invalid)?;

        Ok(Self {
            raw: raw.to_string(),
            modifiers,
            scheme: scheme.to_string(),
            address: address.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

fn validate_scheme(scheme: &str) -> Result<(), String> {
    let mut chars = scheme.chars();
    match chars.next() {
        None => return Err("scheme must not be empty".into()),
        Some(c) if !c.is_ascii_alphabetic() => {
            return Err(format!("scheme must start with a letter: {scheme:?}"));
        }
        Some(_) => {}
    }
    if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))) {
        return Err(format!("scheme contains invalid character {c:?}"));
    }
    Ok(())
}

fn validate_address(address: &str) -> Result<(), String> {
    if address.is_empty() {
        return Err("address must not be empty".into());
    }
    for ch in address.chars() {
        if ch.is_whitespace() || ch.is_control() {
            return Err(format!("address contains whitespace or control character {ch:?}"));
        }
        if FORBIDDEN_CHARS.contains(&ch) {
            return Err(format!("address contains forbidden character {ch:?}"));
        }
    }
    Ok(())
}

impl fmt::Display for ResolvedLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for ResolvedLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedLocator({})", self.raw)
    }
}

impl TryFrom<String> for ResolvedLocator {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResolvedLocator> for String {
    fn from(locator: ResolvedLocator) -> Self {
        locator.raw
    }
}
