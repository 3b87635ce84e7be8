use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::TopicCatalog;
use crate::error::TaxonomyError;
use crate::text::{fold_key_token, strip_bom};

const ROOT_KEYS: &[&str] = &[
    "superTopics",
    "super_topics",
    "topics",
    "themen",
    "topicTree",
    "topic_tree",
];

const NAME_KEYS: &[&str] = &[
    "name",
    "title",
    "label",
    "superTopic",
    "super_topic",
    "superThema",
    "oberThema",
    "hauptThema",
    "ueberthema",
    "topic",
];

const CHILDREN_KEYS: &[&str] = &[
    "subtopics",
    "subTopics",
    "sub_themes",
    "subThemen",
    "unterthemen",
    "unterThemen",
    "children",
    "topics",
];

const SUB_KEYS: &[&str] = &[
    "subtopic",
    "subTopic",
    "sub_theme",
    "unterthema",
    "unterThema",
    "child",
    "sub",
];

pub fn parse(input: &str) -> Result<TopicCatalog, TaxonomyError> {
    let document: Value = serde_json::from_str(strip_bom(input))
        .map_err(|err| TaxonomyError::MalformedTaxonomy(err.to_string()))?;
    parse_value(&document)
}

/// Any object or array yields a catalog, possibly empty; scalars are rejected.
pub fn parse_value(document: &Value) -> Result<TopicCatalog, TaxonomyError> {
    if !(document.is_object() || document.is_array()) {
        return Err(TaxonomyError::MalformedTaxonomy(format!(
            "expected an object or array at the root, found {}",
            value_kind(document)
        )));
    }

    let root = lookup_folded(document, ROOT_KEYS)
        .filter(|value| !value.is_null())
        .unwrap_or(document);

    let mut builder = CatalogBuilder::default();
    builder.walk(root, None);
    Ok(builder.finish())
}

enum NodeShape<'a> {
    List(&'a [Value]),
    Leaf(&'a str),
    Named {
        name: Option<String>,
        children: Option<&'a [Value]>,
        explicit_sub: Option<String>,
    },
    BareMap(&'a Map<String, Value>),
    Ignored,
}

fn shape_of(node: &Value) -> NodeShape<'_> {
    match node {
        Value::Array(items) => NodeShape::List(items),
        Value::String(text) => NodeShape::Leaf(text),
        Value::Object(map) => {
            let name = first_label(node, NAME_KEYS);
            let children = CHILDREN_KEYS
                .iter()
                .find_map(|key| lookup_folded(node, &[*key]).and_then(Value::as_array))
                .map(Vec::as_slice);
            let explicit_sub = first_label(node, SUB_KEYS);

            if name.is_none() && children.is_none() && explicit_sub.is_none() {
                NodeShape::BareMap(map)
            } else {
                NodeShape::Named {
                    name,
                    children,
                    explicit_sub,
                }
            }
        }
        _ => NodeShape::Ignored,
    }
}

#[derive(Default)]
struct CatalogBuilder {
    topics: BTreeMap<String, BTreeSet<String>>,
}

impl CatalogBuilder {
    fn register(&mut self, super_topic: &str, sub_topic: Option<&str>) {
        let super_topic = super_topic.trim();
        if super_topic.is_empty() {
            return;
        }
        let subs = self.topics.entry(super_topic.to_string()).or_default();
        if let Some(sub_topic) = sub_topic.map(str::trim).filter(|sub| !sub.is_empty()) {
            subs.insert(sub_topic.to_string());
        }
    }

    /// Depth-first walk; `current` is the super-topic the node sits under.
    fn walk(&mut self, node: &Value, current: Option<&str>) {
        match shape_of(node) {
            NodeShape::List(items) => {
                for item in items {
                    self.walk(item, current);
                }
            }
            NodeShape::Leaf(text) => {
                if let Some(current) = current {
                    self.register(current, Some(text));
                }
            }
            NodeShape::Named {
                name,
                children,
                explicit_sub,
            } => {
                let context = match (current, name.as_deref()) {
                    (Some(current), Some(name)) => {
                        // Nested named node: a sub-topic of the enclosing super.
                        self.register(current, Some(name));
                        Some(current.to_string())
                    }
                    (Some(current), None) => Some(current.to_string()),
                    (None, Some(name)) => {
                        self.register(name, None);
                        Some(name.to_string())
                    }
                    (None, None) => None,
                };

                if let Some(children) = children {
                    for child in children {
                        self.walk(child, context.as_deref());
                    }
                }
                if let (Some(context), Some(sub)) = (context.as_deref(), explicit_sub.as_deref()) {
                    self.register(context, Some(sub));
                }
            }
            NodeShape::BareMap(map) => {
                for (key, value) in map {
                    let key = key.trim();
                    if key.is_empty() {
                        continue;
                    }
                    match current {
                        // Inside a super-topic the keys are its sub-topics.
                        Some(current) => {
                            self.register(current, Some(key));
                            if value.is_array() || value.is_object() {
                                self.walk(value, Some(current));
                            }
                        }
                        None => match value {
                            Value::String(sub) => self.register(key, Some(sub)),
                            Value::Array(_) | Value::Object(_) => {
                                self.register(key, None);
                                self.walk(value, Some(key));
                            }
                            _ => {}
                        },
                    }
                }
            }
            NodeShape::Ignored => {}
        }
    }

    fn finish(self) -> TopicCatalog {
        let all_sub_topics: BTreeSet<String> = self.topics.values().flatten().cloned().collect();
        TopicCatalog {
            super_topics: self.topics.keys().cloned().collect(),
            sub_topics_by_super: self
                .topics
                .into_iter()
                .map(|(super_topic, subs)| (super_topic, subs.into_iter().collect()))
                .collect(),
            all_sub_topics: all_sub_topics.into_iter().collect(),
        }
    }
}

/// Value of the first variant present on the object, comparing keys after
/// diacritic folding and separator removal. Later duplicates win.
fn lookup_folded<'a>(node: &'a Value, variants: &[&str]) -> Option<&'a Value> {
    let map = node.as_object()?;
    variants.iter().find_map(|variant| {
        let wanted = fold_key_token(variant);
        map.iter()
            .rev()
            .find(|(key, _)| fold_key_token(key) == wanted)
            .map(|(_, value)| value)
    })
}

fn first_label(node: &Value, variants: &[&str]) -> Option<String> {
    variants.iter().find_map(|variant| {
        let label = match lookup_folded(node, &[*variant])? {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            _ => return None,
        };
        (!label.is_empty()).then_some(label)
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
