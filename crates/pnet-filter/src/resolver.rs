//! Template resolution: capture substitution and recursive alias expansion.

use std::collections::{BTreeMap, BTreeSet};

use pnet_types::ResolvedLocator;

use crate::error::ResolveError;
use crate::pattern::Captures;
use crate::template::{Template, TemplatePart};

/// Stand-in for a capture value when checking a template without a key.
const CAPTURE_PLACEHOLDER: &str = "x";

/// Expands templates against an alias table.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    aliases: &'a BTreeMap<String, Template>,
}

/// A key-independent view of a template: the text it expands to with
/// placeholder captures, and every capture index it references through any
/// alias. Cycles and undefined aliases are skipped rather than reported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Sketch {
    pub text: String,
    pub captures: BTreeSet<usize>,
}

impl<'a> Resolver<'a> {
    pub fn new(aliases: &'a BTreeMap<String, Template>) -> Self {
        Self { aliases }
    }

    /// Expand `template` with `captures` and validate the result as a locator.
    pub fn resolve(
        &self,
        template: &Template,
        captures: &Captures,
    ) -> Result<ResolvedLocator, ResolveError> {
        let text = self.expand(template, captures)?;
        Ok(ResolvedLocator::parse(&text)?)
    }

    /// Expand `template` with `captures` into plain text.
    pub fn expand(&self, template: &Template, captures: &Captures) -> Result<String, ResolveError> {
        let mut out = String::new();
        let mut stack = Vec::new();
        self.expand_into(template, captures, &mut stack, &mut out)?;
        Ok(out)
    }

    /// Every capture index `template` references, directly or through
    /// aliases.
    pub fn referenced_captures(&self, template: &Template) -> Result<BTreeSet<usize>, ResolveError> {
        let mut found = BTreeSet::new();
        let mut stack = Vec::new();
        self.collect_captures(template, &mut stack, &mut found)?;
        Ok(found)
    }

    fn expand_into(
        &self,
        template: &Template,
        captures: &Captures,
        stack: &mut Vec<String>,
        out: &mut String,
    ) -> Result<(), ResolveError> {
        for part in template.parts() {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Capture(index) => {
                    let value =
                        captures
                            .get(*index)
                            .ok_or(ResolveError::CaptureIndexOutOfRange {
                                index: *index,
                                available: captures.len(),
                            })?;
                    out.push_str(value);
                }
                TemplatePart::Alias(name) => {
                    let inner = self.enter(name, stack)?;
                    self.expand_into(inner, captures, stack, out)?;
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    fn collect_captures(
        &self,
        template: &Template,
        stack: &mut Vec<String>,
        found: &mut BTreeSet<usize>,
    ) -> Result<(), ResolveError> {
        found.extend(template.captures());
        for name in template.aliases() {
            let inner = self.enter(name, stack)?;
            self.collect_captures(inner, stack, found)?;
            stack.pop();
        }
        Ok(())
    }

    /// Push `name` onto the expansion stack and return its template.
    fn enter(&self, name: &str, stack: &mut Vec<String>) -> Result<&'a Template, ResolveError> {
        if let Some(pos) = stack.iter().position(|n| n == name) {
            let mut chain = stack[pos..].to_vec();
            chain.push(name.to_string());
            return Err(ResolveError::AliasCycle { chain });
        }
        let template = self
            .aliases
            .get(name)
            .ok_or_else(|| ResolveError::UnresolvedAlias {
                name: name.to_string(),
            })?;
        stack.push(name.to_string());
        Ok(template)
    }

    pub(crate) fn sketch(&self, template: &Template) -> Sketch {
        let mut sketch = Sketch::default();
        let mut stack = Vec::new();
        self.sketch_into(template, &mut stack, &mut sketch);
        sketch
    }

    fn sketch_into(&self, template: &Template, stack: &mut Vec<String>, sketch: &mut Sketch) {
        for part in template.parts() {
            match part {
                TemplatePart::Literal(text) => sketch.text.push_str(text),
                TemplatePart::Capture(index) => {
                    sketch.captures.insert(*index);
                    sketch.text.push_str(CAPTURE_PLACEHOLDER);
                }
                TemplatePart::Alias(name) => {
                    if let Ok(inner) = self.enter(name, stack) {
                        self.sketch_into(inner, stack, sketch);
                        stack.pop();
                    }
                }
            }
        }
    }
}
