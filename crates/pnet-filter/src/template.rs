//! Locator templates.
//!
//! A template is literal text mixed with references:
//!
//! - `$<digits>` — a capture reference, e.g. `$1`
//! - `$<name>` — an alias reference, where `name` is the longest run of
//!   `[A-Za-z0-9_]` starting with a letter or `_`
//!
//! A `$` followed by anything else is kept as literal text; it can never
//! survive locator validation.

use std::fmt;

use crate::names::{is_alias_continue, is_alias_start};

/// One lexical piece of a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Capture(usize),
    Alias(String),
}

/// A parsed locator template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    raw: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    /// Lex template text. Never fails; validation happens at compile and
    /// resolution time.
    pub fn parse(text: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '$' {
                literal.push(ch);
                continue;
            }
            match chars.peek() {
                Some(c) if c.is_ascii_digit() => {
                    let mut digits = String::new();
                    while let Some(d) = chars.next_if(char::is_ascii_digit) {
                        digits.push(d);
                    }
                    flush_literal(&mut literal, &mut parts);
                    // Overflowing indices are out of range for any pattern.
                    parts.push(TemplatePart::Capture(digits.parse().unwrap_or(usize::MAX)));
                }
                Some(c) if is_alias_start(*c) => {
                    let mut name = String::new();
                    while let Some(n) = chars.next_if(|c| is_alias_continue(*c)) {
                        name.push(n);
                    }
                    flush_literal(&mut literal, &mut parts);
                    parts.push(TemplatePart::Alias(name));
                }
                _ => literal.push(ch),
            }
        }
        flush_literal(&mut literal, &mut parts);

        Self {
            raw: text.to_string(),
            parts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// Alias names referenced directly by this template.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            TemplatePart::Alias(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Capture indices referenced directly by this template.
    pub fn captures(&self) -> impl Iterator<Item = usize> + '_ {
        self.parts.iter().filter_map(|p| match p {
            TemplatePart::Capture(index) => Some(*index),
            _ => None,
        })
    }
}

fn flush_literal(literal: &mut String, parts: &mut Vec<TemplatePart>) {
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(std::mem::take(literal)));
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only() {
        let t = Template::parse("yml://test.yml");
        assert_eq!(t.parts(), &[TemplatePart::Literal("yml://test.yml".into())]);
    }

    #[test]
    fn capture_references() {
        let t = Template::parse("yml://$1.yml");
        assert_eq!(
            t.parts(),
            &[
                TemplatePart::Literal("yml://".into()),
                TemplatePart::Capture(1),
                TemplatePart::Literal(".yml".into()),
            ]
        );
        assert_eq!(t.captures().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn multi_digit_capture() {
        let t = Template::parse("$12x");
        assert_eq!(
            t.parts(),
            &[TemplatePart::Capture(12), TemplatePart::Literal("x".into())]
        );
    }

    #[test]
    fn alias_takes_longest_name() {
        let t = Template::parse("$aliasnope");
        assert_eq!(t.aliases().collect::<Vec<_>>(), vec!["aliasnope"]);

        let t = Template::parse("yml://$base/$1.yml");
        assert_eq!(t.aliases().collect::<Vec<_>>(), vec!["base"]);
        assert_eq!(t.captures().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn digit_run_ends_before_letters() {
        let t = Template::parse("$1alias");
        assert_eq!(
            t.parts(),
            &[TemplatePart::Capture(1), TemplatePart::Literal("alias".into())]
        );
    }

    #[test]
    fn stray_dollar_stays_literal() {
        let t = Template::parse("a$%b$");
        assert_eq!(t.parts(), &[TemplatePart::Literal("a$%b$".into())]);
    }

    #[test]
    fn overflowing_capture_index_saturates() {
        let t = Template::parse("$99999999999999999999999");
        assert_eq!(t.captures().collect::<Vec<_>>(), vec![usize::MAX]);
    }
}
