use serde_json::Value;

use crate::text::normalize_whitespace;

const TOPIC_CONFIDENCE_PATHS: &[(&str, &str)] = &[
    ("aiAudit.topicFinal.confidence", "aiAudit.topicFinal"),
    ("aiAudit.topicInitial.confidence", "aiAudit.topicInitial"),
    ("aiTopicConfidence", "legacy"),
    ("topicConfidence", "legacy"),
];

/// Pass B supersedes pass A as a whole block.
const ANSWER_BLOCK_PATHS: &[&str] = &[
    "aiAudit.answerPlausibility.passB",
    "aiAudit.answerPlausibility.passA",
];

const LEGACY_ANSWER_CONFIDENCE_KEYS: &[&str] = &["aiAnswerConfidence", "answerConfidence"];

const LEGACY_RECOMMEND_CHANGE_KEYS: &[&str] = &["aiRecommendChange", "recommendChange"];

const PASS_REASON_KEYS: &[&str] = &["reasonDetailed", "reasonShort"];

const MAINTENANCE_FLAG_PATHS: &[&str] = &[
    "aiAudit.maintenance.needsMaintenance",
    "aiNeedsMaintenance",
    "needsMaintenance",
    "needs_maintenance",
    "wartungNoetig",
    "wartungsbedarf",
];

const MAINTENANCE_SEVERITY_PATHS: &[&str] =
    &["aiAudit.maintenance.severity", "maintenanceSeverity"];

const MAINTENANCE_REASONS_PATHS: &[&str] =
    &["aiAudit.maintenance.reasons", "maintenanceReasons"];

/// Checked before the selected pass block; detailed text before short text.
const ANSWER_REASON_PATHS: &[&str] = &[
    "AnswerReasonDetailed",
    "answerReasonDetailed",
    "aiAnswerReasonDetailed",
    "AnswerReasonShort",
    "answerReasonShort",
    "aiAnswerReasonShort",
    "aiAudit.answerPlausibility.finalPass.reasonDetailed",
    "aiAudit.answerPlausibility.finalPass.reasonShort",
    "aiAudit.answerPlausibility.verification.reasonDetailed",
    "aiAudit.answerPlausibility.verification.reasonShort",
];

const TOPIC_REASON_PATHS: &[&str] = &[
    "aiTopicReason",
    "aiAudit.topicFinal.reasonShort",
    "aiAudit.topicInitial.reasonShort",
];

const MAINTENANCE_REASON_PATHS: &[&str] = &["aiMaintenanceReason"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuditFacts {
    pub topic_confidence: Option<f64>,
    pub answer_confidence: Option<f64>,
    pub recommend_change: bool,
    pub needs_maintenance: bool,
    pub topic_reason: Option<String>,
    pub topic_source: String,
    pub answer_reason: Option<String>,
    pub answer_source: String,
    pub maintenance_reason: Option<String>,
    pub maintenance_severity: Option<f64>,
    pub maintenance_reason_count: usize,
    pub answers_changed_by_ai: bool,
}

pub fn extract_audit(record: &Value) -> AuditFacts {
    let (topic_confidence, topic_source) = first_confidence(record, TOPIC_CONFIDENCE_PATHS);
    let answer = answer_signals(record);

    let needs_maintenance = MAINTENANCE_FLAG_PATHS
        .iter()
        .find_map(|path| value_at(record, path).and_then(as_flag))
        .unwrap_or(false);

    let maintenance_severity = MAINTENANCE_SEVERITY_PATHS
        .iter()
        .find_map(|path| value_at(record, path).and_then(as_number));

    let maintenance_reasons = MAINTENANCE_REASONS_PATHS
        .iter()
        .find_map(|path| value_at(record, path).and_then(Value::as_array))
        .map(|reasons| string_items(reasons))
        .unwrap_or_default();

    let maintenance_reason =
        first_non_empty_text(record, MAINTENANCE_REASON_PATHS).or_else(|| {
            if maintenance_reasons.is_empty() {
                None
            } else {
                Some(maintenance_reasons.join("; "))
            }
        });

    AuditFacts {
        topic_confidence,
        answer_confidence: answer.confidence,
        recommend_change: answer.recommend_change.unwrap_or(false),
        needs_maintenance,
        topic_reason: first_non_empty_text(record, TOPIC_REASON_PATHS),
        topic_source: topic_source.to_string(),
        answer_reason: first_non_empty_text(record, ANSWER_REASON_PATHS).or(answer.pass_reason),
        answer_source: answer.source.to_string(),
        maintenance_reason,
        maintenance_severity,
        maintenance_reason_count: maintenance_reasons.len(),
        answers_changed_by_ai: answers_changed_by_ai(record),
    }
}

fn first_confidence(
    record: &Value,
    paths: &[(&str, &'static str)],
) -> (Option<f64>, &'static str) {
    paths
        .iter()
        .find_map(|(path, source)| {
            value_at(record, path)
                .and_then(coerce_confidence)
                .map(|value| (Some(value), *source))
        })
        .unwrap_or((None, ""))
}

struct AnswerSignals {
    confidence: Option<f64>,
    recommend_change: Option<bool>,
    source: &'static str,
    pass_reason: Option<String>,
}

/// Reads every answer signal from one plausibility block. The flat legacy
/// keys only apply when neither pass block exists.
fn answer_signals(record: &Value) -> AnswerSignals {
    let block = ANSWER_BLOCK_PATHS.iter().find_map(|path| {
        value_at(record, path)
            .filter(|block| block.is_object())
            .map(|block| (block, *path))
    });

    if let Some((block, source)) = block {
        return AnswerSignals {
            confidence: block.get("confidence").and_then(coerce_confidence),
            recommend_change: block.get("recommendChange").and_then(as_flag),
            source,
            pass_reason: first_non_empty_text(block, PASS_REASON_KEYS),
        };
    }

    let confidence = LEGACY_ANSWER_CONFIDENCE_KEYS
        .iter()
        .find_map(|key| record.get(*key).and_then(coerce_confidence));
    let recommend_change = LEGACY_RECOMMEND_CHANGE_KEYS
        .iter()
        .find_map(|key| record.get(*key).and_then(as_flag));
    let source = if confidence.is_some() || recommend_change.is_some() {
        "legacy"
    } else {
        ""
    };
    AnswerSignals {
        confidence,
        recommend_change,
        source,
        pass_reason: None,
    }
}

/// Either the dataset says so explicitly, or the correct-answer set moved
/// between the original and the final audit pass.
fn answers_changed_by_ai(record: &Value) -> bool {
    let block = value_at(record, "aiAudit.answerPlausibility");
    if let Some(explicit) = block
        .and_then(|block| block.get("changedInDataset"))
        .and_then(Value::as_bool)
    {
        return explicit;
    }

    let original = block
        .and_then(|block| block.get("originalCorrectIndices"))
        .and_then(index_list);
    let final_indices = block
        .and_then(|block| block.get("finalCorrectIndices"))
        .and_then(index_list);

    match (original, final_indices) {
        (Some(original), Some(final_indices)) => {
            !original.is_empty() && !final_indices.is_empty() && original != final_indices
        }
        _ => false,
    }
}

fn index_list(value: &Value) -> Option<Vec<i64>> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(as_number).map(|n| n as i64).collect())
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(normalize_whitespace)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Dotted path lookup through nested objects.
pub fn value_at<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |node, segment| node.as_object()?.get(segment))
}

pub fn first_non_empty_text(record: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| value_at(record, path))
        .filter_map(text_of)
        .find(|text| !text.is_empty())
}

pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(normalize_whitespace(text)),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Numeric input clamped into [0, 1]; anything non-numeric is absent.
pub fn coerce_confidence(value: &Value) -> Option<f64> {
    as_number(value).map(|number| number.clamp(0.0, 1.0))
}

pub fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "ja" | "y" | "x" => Some(true),
            "false" | "0" | "no" | "nein" | "n" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn topic_confidence_prefers_final_pass_over_initial_and_legacy() {
        let record = json!({
            "topicConfidence": 0.2,
            "aiAudit": {
                "topicInitial": { "confidence": 0.5 },
                "topicFinal": { "confidence": 0.8 },
            },
        });
        let facts = extract_audit(&record);
        assert_eq!(facts.topic_confidence, Some(0.8));
        assert_eq!(facts.topic_source, "aiAudit.topicFinal");

        let record = json!({ "topicConfidence": "0.2" });
        let facts = extract_audit(&record);
        assert_eq!(facts.topic_confidence, Some(0.2));
        assert_eq!(facts.topic_source, "legacy");
    }

    #[test]
    fn answer_fields_prefer_pass_b() {
        let record = json!({
            "aiAudit": {
                "answerPlausibility": {
                    "passA": {
                        "confidence": 0.9,
                        "recommendChange": false,
                        "reasonShort": "fine",
                    },
                    "passB": {
                        "confidence": 0.3,
                        "recommendChange": true,
                        "reasonShort": "B is wrong",
                    },
                },
            },
        });
        let facts = extract_audit(&record);
        assert_eq!(facts.answer_confidence, Some(0.3));
        assert!(facts.recommend_change);
        assert_eq!(facts.answer_source, "aiAudit.answerPlausibility.passB");
        assert_eq!(facts.answer_reason.as_deref(), Some("B is wrong"));
    }

    #[test]
    fn pass_b_block_shadows_pass_a_even_without_confidence() {
        let record = json!({
            "answerConfidence": 0.1,
            "aiAudit": {
                "answerPlausibility": {
                    "passA": { "confidence": 0.2, "recommendChange": true, "reasonShort": "old" },
                    "passB": { "recommendChange": false },
                },
            },
        });
        let facts = extract_audit(&record);
        assert_eq!(facts.answer_confidence, None);
        assert!(!facts.recommend_change);
        assert_eq!(facts.answer_source, "aiAudit.answerPlausibility.passB");
        assert_eq!(facts.answer_reason, None);
    }

    #[test]
    fn legacy_answer_keys_apply_without_any_pass_block() {
        let facts = extract_audit(&json!({ "aiAnswerConfidence": "0,7", "recommendChange": "ja" }));
        assert_eq!(facts.answer_confidence, Some(0.7));
        assert!(facts.recommend_change);
        assert_eq!(facts.answer_source, "legacy");

        let record = json!({ "aiAudit": { "answerPlausibility": { "passB": "n/a" } } });
        let facts = extract_audit(&record);
        assert_eq!(facts.answer_source, "");
    }

    #[test]
    fn detailed_reason_wins_over_short_reason() {
        let record = json!({
            "aiAudit": {
                "answerPlausibility": {
                    "passB": { "reasonShort": "short", "reasonDetailed": "  long   text " },
                },
            },
        });
        assert_eq!(
            extract_audit(&record).answer_reason.as_deref(),
            Some("long text")
        );
    }

    #[test]
    fn confidence_is_clamped_and_non_numeric_is_absent() {
        for (raw, expected) in [
            (json!(1.7), Some(1.0)),
            (json!(-3), Some(0.0)),
            (json!("0,4"), Some(0.4)),
            (json!("high"), None),
            (json!(true), None),
            (json!(null), None),
        ] {
            assert_eq!(coerce_confidence(&raw), expected, "{raw}");
        }
    }

    #[test]
    fn asserted_zero_confidence_is_kept() {
        let facts = extract_audit(&json!({ "answerConfidence": 0 }));
        assert_eq!(facts.answer_confidence, Some(0.0));
        assert_eq!(extract_audit(&json!({})).answer_confidence, None);
    }

    #[test]
    fn maintenance_flag_prefers_nested_block() {
        let record = json!({
            "needsMaintenance": true,
            "aiAudit": {
                "maintenance": {
                    "needsMaintenance": false,
                    "severity": 2,
                    "reasons": ["typo", ""],
                },
            },
        });
        let facts = extract_audit(&record);
        assert!(!facts.needs_maintenance);
        assert_eq!(facts.maintenance_severity, Some(2.0));
        assert_eq!(facts.maintenance_reason_count, 1);
        assert_eq!(facts.maintenance_reason.as_deref(), Some("typo"));

        let legacy = extract_audit(&json!({ "wartungNoetig": "ja" }));
        assert!(legacy.needs_maintenance);
    }

    #[test]
    fn changed_label_compares_correct_index_lists() {
        let changed = json!({
            "aiAudit": {
                "answerPlausibility": { "originalCorrectIndices": [0], "finalCorrectIndices": [1] },
            },
        });
        assert!(extract_audit(&changed).answers_changed_by_ai);

        let explicit = json!({
            "aiAudit": { "answerPlausibility": {
                "changedInDataset": false,
                "originalCorrectIndices": [0],
                "finalCorrectIndices": [1],
            } },
        });
        assert!(!extract_audit(&explicit).answers_changed_by_ai);

        let missing = json!({
            "aiAudit": {
                "answerPlausibility": { "originalCorrectIndices": [], "finalCorrectIndices": [1] },
            },
        });
        assert!(!extract_audit(&missing).answers_changed_by_ai);
    }
}
