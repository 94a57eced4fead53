//! On-disk encodings for file-backed stores.
//!
//! `yml` and `json` share one nested layout: each key segment becomes a
//! nested map, and a node that holds both a value and children keeps its
//! own value under [`SELF_VALUE`]:
//!
//! ```text
//! a.b    = value1          a:
//! a.b.c1 = value2    =>      b: {_: value1, c1: value2, c2: value3}
//! a.b.c2 = value3
//! ```
//!
//! Compact `yml` writes maps whose children are all values in flow style
//! (`b: {_: value1, c1: value2}`); `prettyprint` writes every map in block
//! style.
//!
//! `ini` is flat, one `a.b.c=value` line per pair. Keys and values are
//! backslash-escaped so that any key survives a round trip.

use std::collections::BTreeMap;

use pnet_types::Key;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Child name holding a node's own value in nested layouts.
pub const SELF_VALUE: &str = "_";

/// A file encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Yaml,
    Json,
    Ini,
}

impl Format {
    /// Encode pairs. `pretty` selects the human-friendly style where the
    /// encoding has one.
    pub fn encode(&self, entries: &BTreeMap<Key, String>, pretty: bool) -> StoreResult<String> {
        match self {
            Self::Json => {
                let tree = to_tree(entries)?;
                let mut text = if pretty {
                    serde_json::to_string_pretty(&tree)
                } else {
                    serde_json::to_string(&tree)
                }
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
                text.push('\n');
                Ok(text)
            }
            Self::Yaml => {
                let tree = to_tree(entries)?;
                if pretty {
                    return serde_yaml::to_string(&tree)
                        .map_err(|e| StoreError::Serialization(e.to_string()));
                }
                encode_compact_yaml(&tree)
            }
            Self::Ini => Ok(encode_ini(entries)),
        }
    }

    /// Decode file text. Blank text decodes to no pairs.
    pub fn decode(&self, text: &str) -> StoreResult<BTreeMap<Key, String>> {
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match self {
            Self::Json => {
                let tree: Value = serde_json::from_str(text)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                from_tree(&tree)
            }
            Self::Yaml => {
                let tree: Value = serde_yaml::from_str(text)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                from_tree(&tree)
            }
            Self::Ini => decode_ini(text),
        }
    }
}

/// Reject keys that collide with the nested layout's reserved child name.
pub fn check_key(key: &Key) -> StoreResult<()> {
    match key.segments().iter().find(|s| s.as_str() == SELF_VALUE) {
        Some(segment) => Err(StoreError::ReservedSegment {
            key: key.to_string(),
            segment: segment.clone(),
        }),
        None => Ok(()),
    }
}

#[derive(Default)]
struct Node {
    value: Option<String>,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn into_value(self) -> Value {
        if self.children.is_empty() {
            return self.value.map(Value::String).unwrap_or(Value::Null);
        }
        let mut map = Map::new();
        if let Some(value) = self.value {
            map.insert(SELF_VALUE.to_string(), Value::String(value));
        }
        for (name, child) in self.children {
            map.insert(name, child.into_value());
        }
        Value::Object(map)
    }
}

fn to_tree(entries: &BTreeMap<Key, String>) -> StoreResult<Value> {
    let mut root = Node::default();
    for (key, value) in entries {
        check_key(key)?;
        let mut node = &mut root;
        for segment in key.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.value = Some(value.clone());
    }
    // The root never holds a value of its own, so an empty tree is `{}`.
    Ok(match root.into_value() {
        Value::Null => Value::Object(Map::new()),
        other => other,
    })
}

fn from_tree(tree: &Value) -> StoreResult<BTreeMap<Key, String>> {
    let mut entries = BTreeMap::new();
    let mut path = Vec::new();
    match tree {
        Value::Object(map) => walk(map, &mut path, &mut entries)?,
        Value::Null => {}
        other => {
            return Err(StoreError::Serialization(format!(
                "top level must be a map, found {}",
                kind_name(other)
            )))
        }
    }
    Ok(entries)
}

fn walk(
    map: &Map<String, Value>,
    path: &mut Vec<String>,
    entries: &mut BTreeMap<Key, String>,
) -> StoreResult<()> {
    for (name, child) in map {
        if name == SELF_VALUE {
            if path.is_empty() {
                return Err(StoreError::Serialization(format!(
                    "'{SELF_VALUE}' is not allowed at the top level"
                )));
            }
            if let Some(value) = scalar(child)? {
                entries.insert(key_from(path)?, value);
            }
            continue;
        }

        path.push(name.clone());
        match child {
            Value::Object(inner) => walk(inner, path, entries)?,
            other => {
                if let Some(value) = scalar(other)? {
                    entries.insert(key_from(path)?, value);
                }
            }
        }
        path.pop();
    }
    Ok(())
}

fn scalar(value: &Value) -> StoreResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(StoreError::Serialization(format!(
            "expected a scalar value, found {}",
            kind_name(other)
        ))),
    }
}

fn key_from(path: &[String]) -> StoreResult<Key> {
    Key::new(path.iter().cloned()).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn encode_compact_yaml(tree: &Value) -> StoreResult<String> {
    let mut out = String::new();
    match tree {
        Value::Object(map) if map.is_empty() => out.push_str("{}\n"),
        Value::Object(map) => write_yaml_block(map, 0, &mut out)?,
        other => {
            return Err(StoreError::Serialization(format!(
                "top level must be a map, found {}",
                kind_name(other)
            )))
        }
    }
    Ok(out)
}

fn write_yaml_block(map: &Map<String, Value>, indent: usize, out: &mut String) -> StoreResult<()> {
    for (name, child) in map {
        out.push_str(&" ".repeat(indent));
        out.push_str(&yaml_scalar(name));
        out.push(':');
        match child {
            Value::String(value) => {
                out.push(' ');
                out.push_str(&yaml_scalar(value));
                out.push('\n');
            }
            Value::Object(inner) if inner.values().all(Value::is_string) => {
                let items: Vec<String> = inner
                    .iter()
                    .map(|(k, v)| {
                        let value = v.as_str().unwrap_or_default();
                        format!("{}: {}", yaml_scalar(k), yaml_scalar(value))
                    })
                    .collect();
                out.push_str(" {");
                out.push_str(&items.join(", "));
                out.push_str("}\n");
            }
            Value::Object(inner) => {
                out.push('\n');
                write_yaml_block(inner, indent + 2, out)?;
            }
            other => {
                return Err(StoreError::Serialization(format!(
                    "expected a string or map, found {}",
                    kind_name(other)
                )))
            }
        }
    }
    Ok(())
}

/// A YAML scalar usable in both block and flow context. Plain when it
/// cannot be read back as anything but the same string, else double-quoted.
fn yaml_scalar(text: &str) -> String {
    const RESERVED: [&str; 12] = [
        "true", "false", "yes", "no", "on", "off", "null", "y", "n", "inf", "infinity", "nan",
    ];
    let plain = text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '.' | '@'))
        && !RESERVED.contains(&text.to_ascii_lowercase().as_str());
    if plain {
        return text.to_string();
    }
    serde_json::Value::String(text.to_string()).to_string()
}

fn encode_ini(entries: &BTreeMap<Key, String>) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(&escape_ini_key(&key.to_string()));
        out.push('=');
        out.push_str(&escape_ini(value));
        out.push('\n');
    }
    out
}

fn decode_ini(text: &str) -> StoreResult<BTreeMap<Key, String>> {
    let mut entries = BTreeMap::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        let split = find_unescaped_assign(trimmed).ok_or_else(|| {
            StoreError::Serialization(format!("line {}: missing '='", idx + 1))
        })?;
        let key = unescape_ini(trimmed[..split].trim());
        let key = Key::parse(&key)
            .map_err(|e| StoreError::Serialization(format!("line {}: {e}", idx + 1)))?;
        entries.insert(key, unescape_ini(&trimmed[split + 1..]));
    }
    Ok(entries)
}

fn find_unescaped_assign(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Escape key text so it holds no `=`, no whitespace and no leading comment
/// marker.
fn escape_ini_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, ch) in key.chars().enumerate() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\="),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' ' => out.push_str("\\s"),
            '#' | ';' if i == 0 => {
                out.push('\\');
                out.push(ch);
            }
            _ if ch.is_whitespace() || ch.is_control() => {
                out.push_str(&format!("\\u{{{:x}}}", ch as u32));
            }
            _ => out.push(ch),
        }
    }
    out
}

fn escape_ini(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape_ini(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('s') => out.push(' '),
            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u{");
                        out.push_str(&hex);
                        out.push('}');
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<Key, String> {
        [("a.b", "value1"), ("a.b.c1", "value2"), ("a.b.c2", "value3")]
            .into_iter()
            .map(|(k, v)| (Key::parse(k).unwrap(), v.to_string()))
            .collect()
    }

    #[test]
    fn json_nested_layout() {
        let text = Format::Json.encode(&sample(), false).unwrap();
        assert_eq!(
            text,
            "{\"a\":{\"b\":{\"_\":\"value1\",\"c1\":\"value2\",\"c2\":\"value3\"}}}\n"
        );
        assert_eq!(Format::Json.decode(&text).unwrap(), sample());
    }

    #[test]
    fn json_pretty_is_multiline() {
        let text = Format::Json.encode(&sample(), true).unwrap();
        assert!(text.lines().count() > 1);
        assert_eq!(Format::Json.decode(&text).unwrap(), sample());
    }

    #[test]
    fn yaml_layout_decodes_back() {
        let text = Format::Yaml.encode(&sample(), false).unwrap();
        assert!(text.contains("c1: value2"));
        assert_eq!(Format::Yaml.decode(&text).unwrap(), sample());
    }

    #[test]
    fn compact_yaml_uses_flow_maps_for_leaves() {
        let text = Format::Yaml.encode(&sample(), false).unwrap();
        assert_eq!(text, "a:\n  b: {_: value1, c1: value2, c2: value3}\n");
    }

    #[test]
    fn pretty_yaml_uses_block_maps() {
        let text = Format::Yaml.encode(&sample(), true).unwrap();
        assert_ne!(text, Format::Yaml.encode(&sample(), false).unwrap());
        assert!(text.contains("    c1: value2\n"));
        assert_eq!(Format::Yaml.decode(&text).unwrap(), sample());
    }

    #[test]
    fn compact_yaml_quotes_ambiguous_scalars() {
        let entries: BTreeMap<Key, String> = [
            ("flags.on", "yes"),
            ("flags.count", "010"),
            ("flags.list", "a, b"),
            ("flags.quote", "say \"hi\"\nbye"),
            ("top", ""),
        ]
        .into_iter()
        .map(|(k, v)| (Key::parse(k).unwrap(), v.to_string()))
        .collect();
        let text = Format::Yaml.encode(&entries, false).unwrap();
        assert_eq!(Format::Yaml.decode(&text).unwrap(), entries);
    }

    #[test]
    fn yaml_scalars_become_strings() {
        let decoded = Format::Yaml.decode("a:\n  n: 5\n  t: true\n  gone: null\n").unwrap();
        assert_eq!(decoded.get(&Key::parse("a.n").unwrap()).map(String::as_str), Some("5"));
        assert_eq!(decoded.get(&Key::parse("a.t").unwrap()).map(String::as_str), Some("true"));
        assert!(!decoded.contains_key(&Key::parse("a.gone").unwrap()));
    }

    #[test]
    fn ini_flat_layout() {
        let text = Format::Ini.encode(&sample(), false).unwrap();
        assert_eq!(text, "a.b=value1\na.b.c1=value2\na.b.c2=value3\n");
        assert_eq!(Format::Ini.decode(&text).unwrap(), sample());
    }

    #[test]
    fn ini_escapes_newlines() {
        let mut entries = BTreeMap::new();
        entries.insert(Key::parse("motd").unwrap(), "line1\nline2 \\ end".to_string());
        let text = Format::Ini.encode(&entries, false).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(Format::Ini.decode(&text).unwrap(), entries);
    }

    #[test]
    fn ini_keys_with_special_characters_round_trip() {
        let entries: BTreeMap<Key, String> = [
            (vec!["a=b", "c"], "v"),
            (vec![" padded ", "x"], "1"),
            (vec!["#hash", "y"], "2"),
            (vec![";semi"], "3"),
            (vec!["multi\nline", "back\\slash"], "4"),
            (vec!["tab\there"], "5"),
        ]
        .into_iter()
        .map(|(segments, v)| (Key::new(segments).unwrap(), v.to_string()))
        .collect();
        let text = Format::Ini.encode(&entries, false).unwrap();
        assert_eq!(text.lines().count(), entries.len());
        assert!(text.starts_with(|c: char| !c.is_whitespace()));
        assert_eq!(Format::Ini.decode(&text).unwrap(), entries);
    }

    #[test]
    fn ini_value_may_hold_assignments() {
        let decoded = Format::Ini.decode("url=http://h/?a=b\n").unwrap();
        assert_eq!(
            decoded.get(&Key::parse("url").unwrap()).map(String::as_str),
            Some("http://h/?a=b")
        );
    }

    #[test]
    fn ini_skips_comments_and_rejects_garbage() {
        let decoded = Format::Ini.decode("# header\n; note\n\na=1\n").unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(Format::Ini.decode("not a pair\n").is_err());
    }

    #[test]
    fn blank_text_is_empty() {
        for format in [Format::Json, Format::Yaml, Format::Ini] {
            assert!(format.decode("  \n").unwrap().is_empty());
        }
    }

    #[test]
    fn empty_tree_encodes_as_empty_map() {
        let text = Format::Json.encode(&BTreeMap::new(), false).unwrap();
        assert_eq!(text, "{}\n");
    }

    #[test]
    fn reserved_segment_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert(Key::parse("a._").unwrap(), "x".to_string());
        assert!(matches!(
            Format::Json.encode(&entries, false).unwrap_err(),
            StoreError::ReservedSegment { .. }
        ));
    }

    #[test]
    fn lists_are_rejected() {
        assert!(Format::Json.decode("{\"a\":[1,2]}").is_err());
        assert!(Format::Json.decode("[1]").is_err());
    }
}
