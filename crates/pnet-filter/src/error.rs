//! Error types for filter compilation and template resolution.

use pnet_types::TypeError;
use thiserror::Error;

/// The reason a filter definition failed to compile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedKind {
    /// The alias name is empty, starts with a digit, or contains characters
    /// outside `[A-Za-z0-9_]`.
    #[error("invalid alias name {name:?}: {reason}")]
    InvalidAliasName { name: String, reason: String },

    /// The same alias is declared twice.
    #[error("alias ${name} is already defined on line {first_line}")]
    DuplicateAlias { name: String, first_line: usize },

    /// Unmatched or nested parentheses.
    #[error("unbalanced parentheses in pattern {pattern:?}")]
    UnbalancedGroup { pattern: String },

    /// A group that is not exactly `(*)` or `(**)` spanning a whole segment.
    #[error("capture group {segment:?} must contain exactly one wildcard")]
    InvalidCaptureGroup { segment: String },

    /// `**` somewhere other than the last segment.
    #[error("'**' must be the last segment of pattern {pattern:?}")]
    MisplacedMultiWildcard { pattern: String },

    /// `a..b`, or a pattern with nothing in it.
    #[error("empty segment in pattern {pattern:?}")]
    EmptySegment { pattern: String },

    /// A `*` mixed into literal text, such as `a*b`.
    #[error("wildcard mixed into literal segment {segment:?}")]
    InvalidWildcard { segment: String },

    /// Two rules with the same pattern shape.
    #[error("duplicate pattern {pattern:?}, first defined on line {first_line}")]
    DuplicatePattern { pattern: String, first_line: usize },

    /// A `$name` reference to an alias that is never declared.
    #[error("undefined alias ${name}")]
    UndefinedAlias { name: String },

    /// A `$n` reference beyond the capture groups the rule declares.
    #[error("capture ${index} out of range: pattern declares {available} capture group(s)")]
    CaptureIndexOutOfRange { index: usize, available: usize },

    /// The template cannot produce a valid locator under any substitution.
    #[error("invalid locator syntax in {template:?}: {reason}")]
    InvalidLocatorSyntax { template: String, reason: String },

    /// A non-blank, non-comment line without `=`.
    #[error("missing '=' in declaration {text:?}")]
    MissingAssignment { text: String },
}

/// A filter definition that failed to compile. `line` is 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed filter at line {line}: {kind}")]
pub struct MalformedFilterError {
    pub line: usize,
    pub kind: MalformedKind,
}

impl MalformedFilterError {
    pub fn new(line: usize, kind: MalformedKind) -> Self {
        Self { line, kind }
    }
}

/// Errors raised while expanding a template into a locator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A `$name` reference with no alias binding.
    #[error("unresolved alias ${name}")]
    UnresolvedAlias { name: String },

    /// Alias expansion revisited an alias already being expanded.
    #[error("alias cycle: {}", .chain.join(" -> "))]
    AliasCycle { chain: Vec<String> },

    /// A `$n` reference beyond the captures the match produced.
    #[error("capture ${index} out of range: match produced {available} capture(s)")]
    CaptureIndexOutOfRange { index: usize, available: usize },

    /// The expanded text is not a valid locator.
    #[error(transparent)]
    InvalidLocator(#[from] TypeError),
}

/// Convenience alias for filter compilation.
pub type FilterResult<T> = std::result::Result<T, MalformedFilterError>;
