//! Filter language for the persistence network.
//!
//! A filter routes hierarchical keys to store locators. It is compiled once
//! from line-oriented text into an immutable [`ParsedFilter`], then queried
//! for every read and write.
//!
//! # Quick Start
//!
//! ```rust
//! use pnet_filter::compile;
//! use pnet_types::Key;
//!
//! let filter = compile("a.b.**=yml://no.yml\na.b.c.*=yml://yes.yml").unwrap();
//! let key = Key::parse("a.b.c.d").unwrap();
//! let best = filter.match_best(&key).unwrap();
//! assert_eq!(filter.resolve(&best).unwrap().as_str(), "yml://yes.yml");
//! ```
//!
//! # Modules
//!
//! - [`parser`] — Filter text compiler
//! - [`pattern`] — Pattern segments, matching, captures and specificity
//! - [`template`] — Locator templates with `$n` and `$alias` references
//! - [`resolver`] — Recursive alias expansion and capture substitution
//! - [`filter`] — The compiled [`ParsedFilter`] and its match operations
//! - [`names`] — Alias name validation
//! - [`error`] — Compile and resolution errors

pub mod error;
pub mod filter;
pub mod names;
pub mod parser;
pub mod pattern;
pub mod resolver;
pub mod template;

pub use error::{FilterResult, MalformedFilterError, MalformedKind, ResolveError};
pub use filter::{ParsedFilter, Rule, RuleMatch};
pub use parser::compile;
pub use pattern::{Captures, Pattern, PatternSegment, PrefixBinding, Specificity};
pub use resolver::Resolver;
pub use template::{Template, TemplatePart};
