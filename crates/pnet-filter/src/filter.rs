//! The compiled filter: an immutable rule list plus alias table.

use std::collections::BTreeMap;

use pnet_types::{Key, ResolvedLocator};
use tracing::trace;

use crate::error::{FilterResult, ResolveError};
use crate::pattern::{Captures, Pattern};
use crate::resolver::Resolver;
use crate::template::Template;

/// One `<pattern>=<template>` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub(crate) pattern: Pattern,
    pub(crate) template: Template,
    pub(crate) line: usize,
}

impl Rule {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// 1-based source line of the declaration.
    pub fn line(&self) -> usize {
        self.line
    }
}

/// A rule that matched a key, with the captures it extracted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub rule: &'a Rule,
    pub captures: Captures,
}

/// The immutable result of compiling filter text.
///
/// Rules keep source order, but source order does not decide precedence:
/// [`ParsedFilter::match_best`] ranks by pattern specificity and only falls
/// back to definition order on a full tie.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFilter {
    pub(crate) rules: Vec<Rule>,
    pub(crate) aliases: BTreeMap<String, Template>,
}

impl ParsedFilter {
    /// Compile filter text. See [`crate::compile`].
    pub fn compile(text: &str) -> FilterResult<Self> {
        crate::parser::compile(text)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn aliases(&self) -> &BTreeMap<String, Template> {
        &self.aliases
    }

    pub fn alias(&self, name: &str) -> Option<&Template> {
        self.aliases.get(name)
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.aliases)
    }

    /// The most specific rule matching `key`.
    pub fn match_best(&self, key: &Key) -> Option<RuleMatch<'_>> {
        let mut best: Option<RuleMatch<'_>> = None;
        for candidate in self.match_all(key) {
            let wins = match &best {
                None => true,
                Some(current) => candidate
                    .rule
                    .pattern
                    .cmp_specificity(&current.rule.pattern)
                    .is_gt(),
            };
            if wins {
                best = Some(candidate);
            }
        }
        if let Some(m) = &best {
            trace!(key = %key, pattern = %m.rule.pattern, "best rule");
        }
        best
    }

    /// Every rule matching `key`, in source order.
    pub fn match_all(&self, key: &Key) -> Vec<RuleMatch<'_>> {
        self.rules
            .iter()
            .filter_map(|rule| {
                rule.pattern
                    .matches(key.segments())
                    .map(|captures| RuleMatch { rule, captures })
            })
            .collect()
    }

    /// Resolve a match into its store locator.
    pub fn resolve(&self, m: &RuleMatch<'_>) -> Result<ResolvedLocator, ResolveError> {
        self.resolver().resolve(&m.rule.template, &m.captures)
    }

    /// Rules ordered from most to least specific. Ties keep source order.
    pub fn rules_by_specificity(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by(|a, b| b.pattern.cmp_specificity(&a.pattern));
        rules
    }
}
