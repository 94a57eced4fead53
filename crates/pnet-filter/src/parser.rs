//! Filter text compiler.
//!
//! Filter text is line oriented:
//!
//! ```text
//! # comment
//! $alias=<template>
//! <pattern>=<template>
//! ```
//!
//! Each line is checked in order: alias name, pattern syntax, duplicates,
//! then capture references and locator syntax of its template. Templates
//! that reference aliases are checked in a second pass, since aliases may
//! be declared anywhere in the file.

use std::collections::BTreeMap;

use pnet_types::ResolvedLocator;
use tracing::debug;

use crate::error::{FilterResult, MalformedFilterError, MalformedKind};
use crate::filter::{ParsedFilter, Rule};
use crate::names::validate_alias_name;
use crate::pattern::Pattern;
use crate::resolver::Resolver;
use crate::template::Template;

const COMMENT: char = '#';
const ALIAS_SIGIL: char = '$';
const ASSIGN: char = '=';

/// Compile filter text into an immutable [`ParsedFilter`].
///
/// Fails on the first error found. Nothing outside the returned value is
/// touched, so compiling the same text twice yields equal filters.
///
/// # Examples
///
/// ```
/// use pnet_filter::compile;
/// use pnet_types::Key;
///
/// let filter = compile("$dir=yml://data\nplayers.(*)=$dir/$1.yml\n**=yml://main.yml").unwrap();
/// let key = Key::parse("players.alice").unwrap();
/// let best = filter.match_best(&key).unwrap();
/// assert_eq!(filter.resolve(&best).unwrap().as_str(), "yml://data/alice.yml");
/// ```
pub fn compile(text: &str) -> FilterResult<ParsedFilter> {
    let mut rules: Vec<Rule> = Vec::new();
    let mut aliases: BTreeMap<String, Template> = BTreeMap::new();
    let mut alias_lines: BTreeMap<String, usize> = BTreeMap::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT) {
            continue;
        }

        let (lhs, rhs) = trimmed.split_once(ASSIGN).ok_or_else(|| {
            MalformedFilterError::new(
                line,
                MalformedKind::MissingAssignment {
                    text: trimmed.to_string(),
                },
            )
        })?;
        let (lhs, rhs) = (lhs.trim(), rhs.trim());

        if let Some(name) = lhs.strip_prefix(ALIAS_SIGIL) {
            validate_alias_name(name).map_err(|kind| MalformedFilterError::new(line, kind))?;
            if let Some(&first_line) = alias_lines.get(name) {
                return Err(MalformedFilterError::new(
                    line,
                    MalformedKind::DuplicateAlias {
                        name: name.to_string(),
                        first_line,
                    },
                ));
            }
            alias_lines.insert(name.to_string(), line);
            aliases.insert(name.to_string(), Template::parse(rhs));
            continue;
        }

        let pattern = Pattern::parse(lhs).map_err(|kind| MalformedFilterError::new(line, kind))?;
        if let Some(existing) = rules.iter().find(|r| r.pattern.same_shape(&pattern)) {
            return Err(MalformedFilterError::new(
                line,
                MalformedKind::DuplicatePattern {
                    pattern: lhs.to_string(),
                    first_line: existing.line,
                },
            ));
        }
        let rule = Rule {
            pattern,
            template: Template::parse(rhs),
            line,
        };
        if !uses_aliases(&rule) {
            check_rule_template(&rule, &Resolver::new(&aliases))?;
        }
        rules.push(rule);
    }

    check_alias_references(&rules, &aliases, &alias_lines)?;

    let resolver = Resolver::new(&aliases);
    for rule in rules.iter().filter(|r| uses_aliases(r)) {
        check_rule_template(rule, &resolver)?;
    }

    debug!(rules = rules.len(), aliases = aliases.len(), "compiled filter");
    Ok(ParsedFilter { rules, aliases })
}

fn uses_aliases(rule: &Rule) -> bool {
    rule.template.aliases().next().is_some()
}

/// Every alias referenced by any template, alias templates included, must
/// be declared somewhere in the file. Reported in source-line order.
fn check_alias_references(
    rules: &[Rule],
    aliases: &BTreeMap<String, Template>,
    alias_lines: &BTreeMap<String, usize>,
) -> FilterResult<()> {
    let mut templates: Vec<(usize, &Template)> = rules.iter().map(|r| (r.line, &r.template)).collect();
    templates.extend(
        aliases
            .iter()
            .filter_map(|(name, t)| alias_lines.get(name).map(|line| (*line, t))),
    );
    templates.sort_by_key(|(line, _)| *line);

    for (line, template) in templates {
        if let Some(name) = template.aliases().find(|name| !aliases.contains_key(*name)) {
            return Err(MalformedFilterError::new(
                line,
                MalformedKind::UndefinedAlias {
                    name: name.to_string(),
                },
            ));
        }
    }
    Ok(())
}

/// Capture indices (including those reached through aliases) must be
/// declared by the rule's pattern, and the template must expand to a valid
/// locator for any capture values.
fn check_rule_template(rule: &Rule, resolver: &Resolver<'_>) -> FilterResult<()> {
    let sketch = resolver.sketch(&rule.template);
    let available = rule.pattern.capture_count();

    if let Some(&index) = sketch
        .captures
        .iter()
        .find(|&&index| index == 0 || index > available)
    {
        return Err(MalformedFilterError::new(
            rule.line,
            MalformedKind::CaptureIndexOutOfRange { index, available },
        ));
    }

    ResolvedLocator::parse(&sketch.text).map_err(|e| {
        MalformedFilterError::new(
            rule.line,
            MalformedKind::InvalidLocatorSyntax {
                template: rule.template.as_str().to_string(),
                reason: e.to_string(),
            },
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> MalformedKind {
        compile(text).unwrap_err().kind
    }

    #[test]
    fn numeric_alias_name() {
        assert!(matches!(
            kind("$1alias=yml://blah$1.yml\na.*.(**)=$1alias\n"),
            MalformedKind::InvalidAliasName { .. }
        ));
    }

    #[test]
    fn bad_characters_in_alias_name() {
        assert!(matches!(
            kind("$alias!=yml://blah$1.yml\na.*.(**)=$alias\n"),
            MalformedKind::InvalidAliasName { .. }
        ));
    }

    #[test]
    fn two_left_parentheses() {
        assert!(matches!(
            kind("$alias=yml://blah$1.yml\na.*.(**(=$alias\n"),
            MalformedKind::UnbalancedGroup { .. }
        ));
    }

    #[test]
    fn two_right_parentheses() {
        assert!(matches!(
            kind("$alias=yml://blah$1.yml\na.*.(**))=$alias\n"),
            MalformedKind::UnbalancedGroup { .. }
        ));
    }

    #[test]
    fn missing_right_parenthesis() {
        assert!(matches!(
            kind("$alias=yml://blah$1.yml\na.*.(**=$alias\n"),
            MalformedKind::UnbalancedGroup { .. }
        ));
    }

    #[test]
    fn undefined_alias() {
        let err = compile("$alias=yml://blah$1.yml\na.*.(**)=$aliasnope\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            MalformedKind::UndefinedAlias {
                name: "aliasnope".into()
            }
        );
    }

    #[test]
    fn capture_too_high_through_alias() {
        let err = compile("$alias=yml://blah$2.yml\na.*.(**)=$alias\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.kind,
            MalformedKind::CaptureIndexOutOfRange {
                index: 2,
                available: 1
            }
        );
    }

    #[test]
    fn capture_too_high_in_rule() {
        assert!(matches!(
            kind("a.(*)=yml://$1/$2.yml"),
            MalformedKind::CaptureIndexOutOfRange { index: 2, .. }
        ));
        assert!(matches!(
            kind("a.(*)=yml://$0.yml"),
            MalformedKind::CaptureIndexOutOfRange { index: 0, .. }
        ));
    }

    #[test]
    fn same_pattern_twice() {
        let err = compile("$alias=yml://blah$1.yml\na.*=$alias\na.*=$alias\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(
            err.kind,
            MalformedKind::DuplicatePattern {
                pattern: "a.*".into(),
                first_line: 2
            }
        );
    }

    #[test]
    fn same_shape_differing_captures_is_duplicate() {
        assert!(matches!(
            kind("a.(*)=yml://$1.yml\na.*=yml://x.yml"),
            MalformedKind::DuplicatePattern { .. }
        ));
    }

    #[test]
    fn invalid_uri() {
        assert!(matches!(
            kind("$alias=!@#$%^&*()blah$1.yml\na.*.(**)=$alias\n"),
            MalformedKind::InvalidLocatorSyntax { .. }
        ));
    }

    #[test]
    fn empty_template_is_invalid_locator() {
        assert!(matches!(
            kind("a.b="),
            MalformedKind::InvalidLocatorSyntax { .. }
        ));
    }

    #[test]
    fn misplaced_multi_wildcard() {
        assert!(matches!(
            kind("a.**.c=yml://x.yml"),
            MalformedKind::MisplacedMultiWildcard { .. }
        ));
    }

    #[test]
    fn missing_assignment() {
        let err = compile("\n# routes\na.b\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(matches!(err.kind, MalformedKind::MissingAssignment { .. }));
    }

    #[test]
    fn duplicate_alias() {
        assert!(matches!(
            kind("$a=yml://x.yml\n$a=yml://y.yml\nk=$a"),
            MalformedKind::DuplicateAlias { first_line: 1, .. }
        ));
    }

    #[test]
    fn undefined_alias_inside_unused_alias() {
        assert!(matches!(
            kind("$a=yml://$b.yml\nk=yml://k.yml"),
            MalformedKind::UndefinedAlias { .. }
        ));
    }

    #[test]
    fn forward_alias_reference() {
        let filter = compile("k.(*)=$dir/$1.yml\n$dir=json://data").unwrap();
        assert_eq!(filter.rules().len(), 1);
        assert!(filter.alias("dir").is_some());
    }

    #[test]
    fn comments_blank_lines_and_whitespace() {
        let text = "# default store\n\n  **  =  yml://default.yml  \n\t# end\n";
        let filter = compile(text).unwrap();
        assert_eq!(filter.rules().len(), 1);
        assert_eq!(filter.rules()[0].pattern().as_str(), "**");
        assert_eq!(filter.rules()[0].template().as_str(), "yml://default.yml");
        assert_eq!(filter.rules()[0].line(), 3);
    }

    #[test]
    fn modifiers_accepted() {
        let filter = compile("a=prettyprint:yml://a.yml\nb=readonly:transient:json://b.json").unwrap();
        assert_eq!(filter.rules().len(), 2);
        assert!(matches!(
            kind("a=sparkly:yml://a.yml"),
            MalformedKind::InvalidLocatorSyntax { .. }
        ));
    }

    #[test]
    fn alias_cycle_compiles_but_never_resolves() {
        // The cycle contributes nothing to the sketch, so the literal part
        // alone must already be a valid locator.
        let filter = compile("$a=yml://x$b\n$b=$a\nk=$a").unwrap();
        assert_eq!(filter.rules().len(), 1);
    }

    #[test]
    fn template_errors_reported_on_their_own_line() {
        let err = compile("a.(*)=yml://$2.yml\na.(*)=yml://x.yml\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(
            err.kind,
            MalformedKind::CaptureIndexOutOfRange { index: 2, available: 1 }
        ));

        let err = compile("a=yml://ok.yml\nb=not a locator\nb=yml://dup.yml\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, MalformedKind::InvalidLocatorSyntax { .. }));
    }
}
