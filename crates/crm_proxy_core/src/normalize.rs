//! Conversion of remote-call results into plain JSON.
//!
//! Two decodings of a SOAP body exist. [`RemoteValue::from_element`] mirrors
//! what a schema-aware SOAP client hands back (records keyed by local name,
//! repeated elements collected in order) and [`element_to_json`] keeps the raw
//! document shape with qualified keys, `@attribute` and `#text` entries. Only
//! the latter carries namespace prefixes, which [`strip_key_prefixes`] removes
//! according to a [`KeyPrefixPolicy`].

use std::collections::VecDeque;

use serde_json::{Map, Number, Value};

use crate::xml::{local_name, XmlNode};

pub const DEFAULT_KEY_PREFIXES: [&str; 3] = ["ax21:", "ax22:", "ax28:"];
/// Characters removed from every key by [`KeyPrefixPolicy::StripAll`].
pub const LEGACY_PREFIX_LEN: usize = 5;

/// A remote-call result before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteValue {
    Null,
    Bool(bool),
    Number(Number),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Named fields in declaration order. Later duplicates win.
    Record(Vec<(String, RemoteValue)>),
    /// FIFO multi-valued field.
    Sequence(VecDeque<RemoteValue>),
    List(Vec<RemoteValue>),
    /// Embedded element the decoder could not map onto fields.
    Element(XmlNode),
}

impl RemoteValue {
    /// Decodes a response element into fields the way a SOAP client would.
    ///
    /// `xsi:nil` becomes null, `true`/`false` leaves become booleans, other
    /// leaves stay text. Leaves carrying data attributes are kept as elements.
    /// Children sharing a local name are gathered into a [`RemoteValue::Sequence`].
    pub fn from_element(node: &XmlNode) -> Self {
        Self::from_element_with::<&str>(node, &[])
    }

    /// Like [`RemoteValue::from_element`], with `repeated` naming the local
    /// names that always decode as a [`RemoteValue::Sequence`], even when the
    /// response carries a single occurrence.
    pub fn from_element_with<S: AsRef<str>>(node: &XmlNode, repeated: &[S]) -> Self {
        if is_nil(node) {
            return RemoteValue::Null;
        }

        if node.children.is_empty() {
            if node.data_attributes().any(|(key, _)| !is_schema_instance(key)) {
                return RemoteValue::Element(node.clone());
            }
            return match node.text.as_deref() {
                None => RemoteValue::Null,
                Some("true") => RemoteValue::Bool(true),
                Some("false") => RemoteValue::Bool(false),
                Some(text) => RemoteValue::Text(text.to_string()),
            };
        }

        let mut fields: Vec<(String, RemoteValue)> = Vec::new();
        for child in &node.children {
            let name = child.local_name();
            let value = RemoteValue::from_element_with(child, repeated);
            let declared_repeated = repeated.iter().any(|known| known.as_ref() == name);
            match fields.iter_mut().find(|(key, _)| key == name) {
                Some((_, RemoteValue::Sequence(items))) => items.push_back(value),
                Some((_, existing)) => {
                    let first = std::mem::replace(existing, RemoteValue::Null);
                    *existing = RemoteValue::Sequence(VecDeque::from([first, value]));
                }
                None if declared_repeated => fields.push((
                    name.to_string(),
                    RemoteValue::Sequence(VecDeque::from([value])),
                )),
                None => fields.push((name.to_string(), value)),
            }
        }
        RemoteValue::Record(fields)
    }
}

impl From<Value> for RemoteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RemoteValue::Null,
            Value::Bool(flag) => RemoteValue::Bool(flag),
            Value::Number(number) => RemoteValue::Number(number),
            Value::String(text) => RemoteValue::Text(text),
            Value::Array(items) => {
                RemoteValue::List(items.into_iter().map(RemoteValue::from).collect())
            }
            Value::Object(map) => RemoteValue::Record(
                map.into_iter()
                    .map(|(key, value)| (key, RemoteValue::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Produces a JSON value with no residual non-primitive leaves.
pub fn normalize(value: &RemoteValue) -> Value {
    match value {
        RemoteValue::Null => Value::Null,
        RemoteValue::Bool(flag) => Value::Bool(*flag),
        RemoteValue::Number(number) => Value::Number(number.clone()),
        RemoteValue::Float(float) => Number::from_f64(*float)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(float.to_string())),
        RemoteValue::Text(text) => Value::String(text.clone()),
        RemoteValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        RemoteValue::Record(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, field) in fields {
                map.insert(key.clone(), normalize(field));
            }
            Value::Object(map)
        }
        RemoteValue::Sequence(items) => Value::Array(items.iter().map(normalize).collect()),
        RemoteValue::List(items) => Value::Array(items.iter().map(normalize).collect()),
        RemoteValue::Element(node) => Value::String(node.to_markup()),
    }
}

/// How namespace prefixes are removed from response keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPrefixPolicy {
    /// Strip a prefix only when the key starts with one of these.
    Namespaced(Vec<String>),
    /// Drop the first [`LEGACY_PREFIX_LEN`] characters of every key.
    StripAll,
}

impl Default for KeyPrefixPolicy {
    fn default() -> Self {
        KeyPrefixPolicy::Namespaced(DEFAULT_KEY_PREFIXES.iter().map(|p| p.to_string()).collect())
    }
}

impl KeyPrefixPolicy {
    pub fn strip<'k>(&self, key: &'k str) -> &'k str {
        match self {
            KeyPrefixPolicy::Namespaced(prefixes) => prefixes
                .iter()
                .find_map(|prefix| key.strip_prefix(prefix.as_str()))
                .unwrap_or(key),
            KeyPrefixPolicy::StripAll => key
                .char_indices()
                .nth(LEGACY_PREFIX_LEN)
                .map(|(index, _)| &key[index..])
                .unwrap_or(""),
        }
    }
}

/// Removes namespace prefixes from the top-level keys of a mapping.
pub fn strip_key_prefixes(map: Map<String, Value>, policy: &KeyPrefixPolicy) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (policy.strip(&key).to_string(), value))
        .collect()
}

/// Converts an element into the raw document-shaped JSON form.
pub fn element_to_json(node: &XmlNode) -> Value {
    let mut map = Map::new();
    map.insert(node.tag.clone(), element_content(node));
    Value::Object(map)
}

fn element_content(node: &XmlNode) -> Value {
    if node.attributes.is_empty() && node.children.is_empty() {
        return node
            .text
            .as_ref()
            .map(|text| Value::String(text.clone()))
            .unwrap_or(Value::Null);
    }

    let mut map = Map::new();
    for (key, value) in &node.attributes {
        map.insert(format!("@{key}"), Value::String(value.clone()));
    }
    for child in &node.children {
        let content = element_content(child);
        match map.get_mut(&child.tag) {
            Some(Value::Array(items)) => items.push(content),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::Array(vec![first, content]);
            }
            None => {
                map.insert(child.tag.clone(), content);
            }
        }
    }
    if let Some(text) = &node.text {
        map.insert("#text".to_string(), Value::String(text.clone()));
    }
    Value::Object(map)
}

/// Looks up a key by local name, ignoring whatever prefix the server used.
pub fn get_local<'m>(map: &'m Map<String, Value>, local: &str) -> Option<&'m Value> {
    map.iter()
        .find(|(key, _)| !key.starts_with('@') && local_name(key) == local)
        .map(|(_, value)| value)
}

/// Removes a key by local name and returns its value.
pub fn take_local(map: &mut Map<String, Value>, local: &str) -> Option<Value> {
    let key = map
        .keys()
        .find(|key| !key.starts_with('@') && local_name(key) == local)?
        .clone();
    map.remove(&key)
}

fn is_nil(node: &XmlNode) -> bool {
    node.attributes
        .iter()
        .any(|(key, value)| local_name(key) == "nil" && (value == "true" || value == "1"))
}

fn is_schema_instance(attribute: &str) -> bool {
    attribute.starts_with("xsi:")
}
