//! Key patterns: parsing, matching, capture extraction and specificity.
//!
//! Grammar:
//!
//! ```text
//! pattern ::= segment ('.' segment)*
//! segment ::= literal | '*' | '**' | '(' ('*' | '**') ')'
//! ```
//!
//! `*` consumes exactly one key segment. `**` consumes zero or more trailing
//! segments and is only legal as the last segment. Parenthesized wildcards
//! additionally capture what they consume; captures are numbered from 1 in
//! left-to-right order.

use std::cmp::Ordering;
use std::fmt;

use pnet_types::SEPARATOR;

use crate::error::MalformedKind;

/// One segment of a compiled pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    Literal(String),
    SingleWildcard,
    MultiWildcard,
    CapturingSingleWildcard(usize),
    CapturingMultiWildcard(usize),
}

impl PatternSegment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Self::MultiWildcard | Self::CapturingMultiWildcard(_))
    }

    /// The 1-based capture index, if this segment captures.
    pub fn capture_index(&self) -> Option<usize> {
        match self {
            Self::CapturingSingleWildcard(i) | Self::CapturingMultiWildcard(i) => Some(*i),
            _ => None,
        }
    }

    /// Positional rank: literal > single wildcard > multi wildcard.
    fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 2,
            Self::SingleWildcard | Self::CapturingSingleWildcard(_) => 1,
            Self::MultiWildcard | Self::CapturingMultiWildcard(_) => 0,
        }
    }

    /// Equality with capture markers erased.
    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            _ => !self.is_literal() && !other.is_literal() && self.rank() == other.rank(),
        }
    }
}

impl fmt::Display for PatternSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::SingleWildcard => f.write_str("*"),
            Self::MultiWildcard => f.write_str("**"),
            Self::CapturingSingleWildcard(_) => f.write_str("(*)"),
            Self::CapturingMultiWildcard(_) => f.write_str("(**)"),
        }
    }
}

/// Values bound by capturing wildcards during a match. Indexed from 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Captures(Vec<String>);

impl Captures {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// The value bound to capture `index` (1-based).
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Captures bound by matching a key *prefix*. `None` marks a capture whose
/// value depends on segments the prefix does not supply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefixBinding(Vec<Option<String>>);

impl PrefixBinding {
    /// The bound value of capture `index` (1-based), if determined.
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .and_then(|v| v.as_deref())
    }

    pub fn is_bound(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Fill unbound captures with empty strings.
    pub fn to_captures(&self) -> Captures {
        Captures(
            self.0
                .iter()
                .map(|v| v.clone().unwrap_or_default())
                .collect(),
        )
    }
}

/// Ranking key used to pick the best of several matching rules.
///
/// Fields compare in declaration order; greater is more specific:
/// 1. literal segments before the first wildcard
/// 2. absence of a trailing `**`
/// 3. total segment count
/// 4. segment ranks position by position (literal > `*` > `**`)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    leading_literals: usize,
    bounded: bool,
    length: usize,
    ranks: Vec<u8>,
}

/// A compiled key pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<PatternSegment>,
    capture_count: usize,
}

impl Pattern {
    /// Compile pattern text.
    ///
    /// Checks run in this order: parenthesis balance, group contents,
    /// segment syntax, `**` placement.
    pub fn parse(text: &str) -> Result<Self, MalformedKind> {
        check_balance(text)?;

        let mut segments = Vec::new();
        let mut capture_count = 0;
        for raw_segment in text.split(SEPARATOR) {
            let segment = parse_segment(text, raw_segment, &mut capture_count)?;
            segments.push(segment);
        }

        if let Some(pos) = segments.iter().position(PatternSegment::is_multi) {
            if pos + 1 != segments.len() {
                return Err(MalformedKind::MisplacedMultiWildcard {
                    pattern: text.to_string(),
                });
            }
        }

        Ok(Self {
            raw: text.to_string(),
            segments,
            capture_count,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Number of capturing groups declared.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    pub fn has_trailing_multi(&self) -> bool {
        self.segments.last().is_some_and(PatternSegment::is_multi)
    }

    /// Match a full key, returning the captures on success.
    pub fn matches(&self, key: &[String]) -> Option<Captures> {
        let mut captures = Vec::with_capacity(self.capture_count);
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PatternSegment::Literal(text) => {
                    if key.get(i)? != text {
                        return None;
                    }
                }
                PatternSegment::SingleWildcard => {
                    key.get(i)?;
                }
                PatternSegment::CapturingSingleWildcard(_) => {
                    captures.push(key.get(i)?.clone());
                }
                // Every earlier segment consumed exactly one key segment, so
                // `i <= key.len()` holds here.
                PatternSegment::MultiWildcard => return Some(Captures(captures)),
                PatternSegment::CapturingMultiWildcard(_) => {
                    captures.push(key[i..].join(SEPARATOR.to_string().as_str()));
                    return Some(Captures(captures));
                }
            }
        }
        (key.len() == self.segments.len()).then_some(Captures(captures))
    }

    /// Match a key prefix: succeeds if some key starting with `prefix`
    /// (including `prefix` itself) could match this pattern.
    ///
    /// Single-wildcard captures inside the prefix are bound. Captures past
    /// the end of the prefix, and multi-wildcard captures, stay unbound.
    pub fn match_prefix(&self, prefix: &[String]) -> Option<PrefixBinding> {
        let mut binding = Vec::with_capacity(self.capture_count);
        let mut consumed_all = false;
        for (i, segment) in self.segments.iter().enumerate() {
            let Some(value) = prefix.get(i) else {
                consumed_all = true;
                if segment.capture_index().is_some() {
                    binding.push(None);
                }
                continue;
            };
            match segment {
                PatternSegment::Literal(text) => {
                    if value != text {
                        return None;
                    }
                }
                PatternSegment::SingleWildcard => {}
                PatternSegment::CapturingSingleWildcard(_) => binding.push(Some(value.clone())),
                PatternSegment::MultiWildcard => return Some(PrefixBinding(binding)),
                PatternSegment::CapturingMultiWildcard(_) => {
                    binding.push(None);
                    return Some(PrefixBinding(binding));
                }
            }
        }
        // A bounded pattern shorter than the prefix matches no extension.
        (consumed_all || prefix.len() == self.segments.len()).then_some(PrefixBinding(binding))
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            leading_literals: self.segments.iter().take_while(|s| s.is_literal()).count(),
            bounded: !self.has_trailing_multi(),
            length: self.segments.len(),
            ranks: self.segments.iter().map(PatternSegment::rank).collect(),
        }
    }

    /// Compare two patterns by specificity. `Greater` means `self` wins.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        self.specificity().cmp(&other.specificity())
    }

    /// Returns `true` if both patterns match exactly the same keys, i.e.
    /// they differ at most in capture markers.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn check_balance(text: &str) -> Result<(), MalformedKind> {
    let unbalanced = || MalformedKind::UnbalancedGroup {
        pattern: text.to_string(),
    };
    let mut open = false;
    for ch in text.chars() {
        match ch {
            '(' if open => return Err(unbalanced()),
            '(' => open = true,
            ')' if !open => return Err(unbalanced()),
            ')' => open = false,
            _ => {}
        }
    }
    if open {
        return Err(unbalanced());
    }
    Ok(())
}

fn parse_segment(
    pattern: &str,
    segment: &str,
    capture_count: &mut usize,
) -> Result<PatternSegment, MalformedKind> {
    if segment.is_empty() {
        return Err(MalformedKind::EmptySegment {
            pattern: pattern.to_string(),
        });
    }

    if segment.contains(['(', ')']) {
        return match segment {
            "(*)" => {
                *capture_count += 1;
                Ok(PatternSegment::CapturingSingleWildcard(*capture_count))
            }
            "(**)" => {
                *capture_count += 1;
                Ok(PatternSegment::CapturingMultiWildcard(*capture_count))
            }
            _ => Err(MalformedKind::InvalidCaptureGroup {
                segment: segment.to_string(),
            }),
        };
    }

    match segment {
        "*" => Ok(PatternSegment::SingleWildcard),
        "**" => Ok(PatternSegment::MultiWildcard),
        _ if segment.contains('*') => Err(MalformedKind::InvalidWildcard {
            segment: segment.to_string(),
        }),
        _ => Ok(PatternSegment::Literal(segment.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> Vec<String> {
        text.split('.').map(str::to_string).collect()
    }

    fn pattern(text: &str) -> Pattern {
        Pattern::parse(text).unwrap()
    }

    // ---- Parsing ----

    #[test]
    fn parse_segment_kinds() {
        let p = pattern("a.*.(*).(**)");
        assert_eq!(
            p.segments(),
            &[
                PatternSegment::Literal("a".into()),
                PatternSegment::SingleWildcard,
                PatternSegment::CapturingSingleWildcard(1),
                PatternSegment::CapturingMultiWildcard(2),
            ]
        );
        assert_eq!(p.capture_count(), 2);
        assert!(p.has_trailing_multi());
    }

    #[test]
    fn reject_unbalanced_groups() {
        for text in ["a.*.(**(", "a.*.(**))", "a.*.(**", "a.)*(", "a.((*))"] {
            let err = Pattern::parse(text).unwrap_err();
            assert!(
                matches!(err, MalformedKind::UnbalancedGroup { .. }),
                "{text}: expected UnbalancedGroup, got {err}"
            );
        }
    }

    #[test]
    fn reject_invalid_capture_groups() {
        for text in ["a.(c)", "a.()", "a.(***)", "a.x(*)", "(a.*)"] {
            let err = Pattern::parse(text).unwrap_err();
            assert!(
                matches!(err, MalformedKind::InvalidCaptureGroup { .. }),
                "{text}: expected InvalidCaptureGroup, got {err}"
            );
        }
    }

    #[test]
    fn reject_misplaced_multi_wildcard() {
        assert!(matches!(
            Pattern::parse("a.**.b").unwrap_err(),
            MalformedKind::MisplacedMultiWildcard { .. }
        ));
        assert!(matches!(
            Pattern::parse("(**).b").unwrap_err(),
            MalformedKind::MisplacedMultiWildcard { .. }
        ));
    }

    #[test]
    fn reject_empty_segments_and_mixed_wildcards() {
        assert!(matches!(
            Pattern::parse("a..b").unwrap_err(),
            MalformedKind::EmptySegment { .. }
        ));
        assert!(matches!(
            Pattern::parse("").unwrap_err(),
            MalformedKind::EmptySegment { .. }
        ));
        assert!(matches!(
            Pattern::parse("a.b*").unwrap_err(),
            MalformedKind::InvalidWildcard { .. }
        ));
    }

    // ---- Matching ----

    #[test]
    fn exact_length_literal_pattern() {
        let p = pattern("a.b.c");
        assert!(p.matches(&key("a.b.c")).is_some());
        assert!(p.matches(&key("a.b.c.d")).is_none());
        assert!(p.matches(&key("a.b")).is_none());
        assert!(p.matches(&key("a.x.c")).is_none());
    }

    #[test]
    fn single_wildcard_consumes_one_segment() {
        let p = pattern("a.b.*");
        assert!(p.matches(&key("a.b.c")).is_some());
        assert!(p.matches(&key("a.b.c.d")).is_none());
        assert!(p.matches(&key("a.b")).is_none());
    }

    #[test]
    fn multi_wildcard_consumes_zero_or_more() {
        let p = pattern("a.**");
        assert!(p.matches(&key("a")).is_some());
        assert!(p.matches(&key("a.b")).is_some());
        assert!(p.matches(&key("a.b.c.d")).is_some());
        assert!(p.matches(&key("b.a")).is_none());
    }

    #[test]
    fn lone_multi_wildcard_matches_everything() {
        let p = pattern("**");
        assert!(p.matches(&key("x")).is_some());
        assert!(p.matches(&key("x.y.z")).is_some());
    }

    #[test]
    fn captures_single_and_multi() {
        let p = pattern("a.(*).(**)");
        let caps = p.matches(&key("a.b.c.d")).unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps.get(1), Some("b"));
        assert_eq!(caps.get(2), Some("c.d"));
        assert_eq!(caps.get(0), None);
        assert_eq!(caps.get(3), None);
    }

    #[test]
    fn capturing_multi_may_bind_empty_suffix() {
        let caps = pattern("a.(**)").matches(&key("a")).unwrap();
        assert_eq!(caps.get(1), Some(""));
    }

    // ---- Prefix matching ----

    #[test]
    fn prefix_binds_captures_inside_prefix() {
        let binding = pattern("subset.(*)").match_prefix(&key("subset.subset")).unwrap();
        assert_eq!(binding.get(1), Some("subset"));
    }

    #[test]
    fn prefix_leaves_captures_past_end_unbound() {
        let binding = pattern("subset.(*)").match_prefix(&key("subset")).unwrap();
        assert!(!binding.is_bound(1));
        assert_eq!(binding.to_captures().get(1), Some(""));
    }

    #[test]
    fn prefix_rejects_literal_mismatch_and_short_patterns() {
        assert!(pattern("b.**").match_prefix(&key("a.b")).is_none());
        assert!(pattern("a.*").match_prefix(&key("a.b.c")).is_none());
        assert!(pattern("a.**").match_prefix(&key("a.b.c")).is_some());
    }

    #[test]
    fn prefix_multi_capture_is_never_bound() {
        let binding = pattern("a.(**)").match_prefix(&key("a.b.c")).unwrap();
        assert!(!binding.is_bound(1));
    }

    // ---- Specificity ----

    #[test]
    fn longer_bounded_beats_shorter_multi() {
        let multi = pattern("a.b.**");
        let bounded = pattern("a.b.c.*");
        assert_eq!(bounded.cmp_specificity(&multi), Ordering::Greater);
        assert_eq!(multi.cmp_specificity(&bounded), Ordering::Less);
    }

    #[test]
    fn leading_literals_dominate() {
        assert_eq!(
            pattern("a.*").cmp_specificity(&pattern("*.b.c")),
            Ordering::Greater
        );
        assert_eq!(
            pattern("subset.(*)").cmp_specificity(&pattern("**")),
            Ordering::Greater
        );
    }

    #[test]
    fn positional_rank_breaks_score_ties() {
        // Same leading literals, both bounded, same length.
        assert_eq!(
            pattern("a.*.c").cmp_specificity(&pattern("a.*.*")),
            Ordering::Greater
        );
    }

    #[test]
    fn shape_ignores_capture_markers() {
        assert!(pattern("a.(*)").same_shape(&pattern("a.*")));
        assert!(pattern("a.(**)").same_shape(&pattern("a.**")));
        assert!(!pattern("a.*").same_shape(&pattern("a.**")));
        assert!(!pattern("a.b").same_shape(&pattern("a.*")));
    }
}
