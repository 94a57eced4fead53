//! Alias name validation.
//!
//! Valid alias names:
//! - Must be non-empty
//! - Must start with an ASCII letter or `_` (so never purely numeric, which
//!   would collide with `$n` capture references)
//! - Must contain only ASCII letters, digits and `_`

use crate::error::MalformedKind;

/// Validate an alias name (without its leading `$`).
///
/// # Examples
///
/// ```
/// use pnet_filter::names::validate_alias_name;
///
/// assert!(validate_alias_name("folder").is_ok());
/// assert!(validate_alias_name("_base2").is_ok());
/// assert!(validate_alias_name("1alias").is_err());
/// assert!(validate_alias_name("alias!").is_err());
/// ```
pub fn validate_alias_name(name: &str) -> Result<(), MalformedKind> {
    let invalid = |reason: String| MalformedKind::InvalidAliasName {
        name: name.to_string(),
        reason,
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("alias name must not be empty".into())),
        Some(c) if c.is_ascii_digit() => {
            return Err(invalid("must not start with a digit".into()));
        }
        Some(c) if !is_alias_start(c) => {
            return Err(invalid(format!("contains forbidden character: {c:?}")));
        }
        Some(_) => {}
    }

    if let Some(c) = chars.find(|c| !is_alias_continue(*c)) {
        return Err(invalid(format!("contains forbidden character: {c:?}")));
    }

    Ok(())
}

pub(crate) fn is_alias_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_alias_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_alias_name("alias").is_ok());
        assert!(validate_alias_name("ALIAS").is_ok());
        assert!(validate_alias_name("a1").is_ok());
        assert!(validate_alias_name("_").is_ok());
        assert!(validate_alias_name("my_store_2").is_ok());
    }

    #[test]
    fn reject_empty() {
        assert!(validate_alias_name("").is_err());
    }

    #[test]
    fn reject_leading_digit() {
        let err = validate_alias_name("1alias").unwrap_err();
        assert!(err.to_string().contains("digit"));
        assert!(validate_alias_name("123").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        assert!(validate_alias_name("alias!").is_err());
        assert!(validate_alias_name("al-ias").is_err());
        assert!(validate_alias_name("al.ias").is_err());
        assert!(validate_alias_name("al ias").is_err());
        assert!(validate_alias_name("-alias").is_err());
    }
}
