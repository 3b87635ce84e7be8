use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{Map, Value};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyRole {
    Topic,
    SuperTopic,
    SubTopic,
    Maintenance,
}

impl KeyRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::SuperTopic => "super-topic",
            Self::SubTopic => "sub-topic",
            Self::Maintenance => "maintenance",
        }
    }
}

struct KeyRule {
    role: KeyRole,
    preferred: &'static [&'static str],
    pattern: &'static str,
    exclude: Option<&'static str>,
}

const TOPIC_PART_EXCLUDE: &str = r"(?i)confidence|konfidenz|reason|grund|source|quelle";

const KEY_RULES: &[KeyRule] = &[
    KeyRule {
        role: KeyRole::Topic,
        preferred: &["topic", "thema", "aiTopic", "topicPath"],
        pattern: r"(?i)topic|thema",
        exclude: Some(concat!(
            r"(?i)super|sub|ober|unter|haupt|ueber|über|",
            r"confidence|konfidenz|reason|grund|source|quelle|tree|baum",
        )),
    },
    KeyRule {
        role: KeyRole::SuperTopic,
        preferred: &[
            "superTopic",
            "aiSuperTopic",
            "super_topic",
            "oberthema",
            "hauptthema",
            "ueberthema",
            "überthema",
        ],
        pattern: r"(?i)super.?topic|ober.?thema|haupt.?thema|(?:ue|ü)ber.?thema",
        exclude: Some(TOPIC_PART_EXCLUDE),
    },
    KeyRule {
        role: KeyRole::SubTopic,
        preferred: &["subTopic", "aiSubTopic", "sub_topic", "unterthema"],
        pattern: r"(?i)sub.?topic|unter.?thema",
        exclude: Some(TOPIC_PART_EXCLUDE),
    },
    KeyRule {
        role: KeyRole::Maintenance,
        preferred: &[
            "needsReview",
            "needs_review",
            "needsMaintenance",
            "aiNeedsMaintenance",
            "wartungNoetig",
            "wartung",
        ],
        pattern: r"(?i)wartung|fehlerhaft|defekt|maintenance|needs.?review|invalid",
        exclude: Some(r"(?i)reason|grund|severity|level|label|manual|traffic"),
    },
];

struct CompiledRule {
    role: KeyRole,
    preferred: &'static [&'static str],
    pattern: Regex,
    exclude: Option<Regex>,
}

impl CompiledRule {
    fn matches_name(&self, name: &str) -> bool {
        if !self.pattern.is_match(name) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(name),
            None => true,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DetectedKeys {
    pub topic: Option<String>,
    pub super_topic: Option<String>,
    pub sub_topic: Option<String>,
    pub maintenance: Option<String>,
}

pub struct KeyDetector {
    rules: Vec<CompiledRule>,
}

impl KeyDetector {
    pub fn new() -> Result<Self> {
        let mut rules = Vec::with_capacity(KEY_RULES.len());
        for rule in KEY_RULES {
            let pattern = Regex::new(rule.pattern).with_context(|| {
                format!("failed to compile {} key pattern", rule.role.as_str())
            })?;
            let exclude = rule
                .exclude
                .map(Regex::new)
                .transpose()
                .with_context(|| {
                    format!("failed to compile {} key exclusion", rule.role.as_str())
                })?;
            rules.push(CompiledRule {
                role: rule.role,
                preferred: rule.preferred,
                pattern,
                exclude,
            });
        }
        Ok(Self { rules })
    }

    /// Exact preferred names win over pattern hits; pattern hits are taken in
    /// the record's own key order.
    pub fn detect_key(&self, record: &Map<String, Value>, role: KeyRole) -> Option<String> {
        let rule = self.rules.iter().find(|rule| rule.role == role)?;

        for name in rule.preferred {
            if record.get(*name).is_some_and(is_scalar) {
                return Some((*name).to_string());
            }
        }

        record
            .iter()
            .find(|(name, value)| is_scalar(value) && rule.matches_name(name))
            .map(|(name, _)| name.clone())
    }

    pub fn detect_all(&self, record: &Map<String, Value>) -> DetectedKeys {
        DetectedKeys {
            topic: self.detect_key(record, KeyRole::Topic),
            super_topic: self.detect_key(record, KeyRole::SuperTopic),
            sub_topic: self.detect_key(record, KeyRole::SubTopic),
            maintenance: self.detect_key(record, KeyRole::Maintenance),
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("fixture should be an object")
    }

    #[test]
    fn preferred_names_win_over_earlier_pattern_hits() {
        let detector = KeyDetector::new().expect("rules should compile");
        let raw = record(json!({
            "themaAlt": "x",
            "topic": "Netzwerke > TCP",
        }));
        assert_eq!(
            detector.detect_key(&raw, KeyRole::Topic).as_deref(),
            Some("topic")
        );
    }

    #[test]
    fn german_compound_names_are_detected_by_pattern() {
        let detector = KeyDetector::new().expect("rules should compile");
        let raw = record(json!({
            "Oberthema_neu": "Netzwerke",
            "Unterthema_neu": "TCP",
            "istFehlerhaft": true,
        }));
        let keys = detector.detect_all(&raw);
        assert_eq!(keys.super_topic.as_deref(), Some("Oberthema_neu"));
        assert_eq!(keys.sub_topic.as_deref(), Some("Unterthema_neu"));
        assert_eq!(keys.maintenance.as_deref(), Some("istFehlerhaft"));
        assert_eq!(keys.topic, None);
    }

    #[test]
    fn topic_pattern_skips_part_and_score_fields() {
        let detector = KeyDetector::new().expect("rules should compile");
        let raw = record(json!({
            "superTopic": "A",
            "topicConfidence": 0.4,
            "aiTopicReason": "why",
            "Themengebiet": "A > B",
        }));
        assert_eq!(detector.detect_key(&raw, KeyRole::Topic), None);

        let raw = record(json!({ "superTopic": "A", "TopicLabel": "A > B" }));
        assert_eq!(
            detector.detect_key(&raw, KeyRole::Topic).as_deref(),
            Some("TopicLabel")
        );
    }

    #[test]
    fn nested_blocks_never_become_keys() {
        let detector = KeyDetector::new().expect("rules should compile");
        let raw = record(json!({
            "topic": { "name": "nested" },
            "maintenance": { "severity": 3 },
        }));
        assert_eq!(detector.detect_key(&raw, KeyRole::Topic), None);
        assert_eq!(detector.detect_key(&raw, KeyRole::Maintenance), None);
    }

    #[test]
    fn maintenance_reason_fields_are_not_flags() {
        let detector = KeyDetector::new().expect("rules should compile");
        let raw = record(json!({
            "manualMaintenanceReason": "typo",
            "maintenanceSeverity": 2,
            "needs_review": false,
        }));
        assert_eq!(
            detector.detect_key(&raw, KeyRole::Maintenance).as_deref(),
            Some("needs_review")
        );
    }
}
