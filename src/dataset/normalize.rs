use serde_json::{Map, Value};

use super::audit::{as_flag, as_number, extract_audit, first_non_empty_text, text_of};
use super::keys::KeyDetector;
use super::legacy_topic::split_legacy_topic;
use super::overrides::{OverrideField, manual_edited, resolve_reason};
use super::question::{Answer, Question, RecordRef, join_topic};
use crate::maintenance::MaintenanceInputs;

pub const QUESTION_TEXT_KEYS: &[&str] = &["questionText", "text"];
pub const EXPLANATION_TEXT_KEYS: &[&str] = &["explanationText", "explanation"];

/// Builds the canonical view of one raw record. Records without a usable id
/// yield `None`.
pub fn normalize_record(
    record: &Value,
    location: RecordRef,
    detector: &KeyDetector,
) -> Option<Question> {
    let raw = record.as_object()?;
    let id = raw.get("id").and_then(text_of).unwrap_or_default();
    if id.is_empty() {
        return None;
    }

    let keys = detector.detect_all(raw);
    let topic = read_text(raw, keys.topic.as_deref());
    let legacy = split_legacy_topic(&topic);
    let super_topic = Some(read_text(raw, keys.super_topic.as_deref()))
        .filter(|value| !value.is_empty())
        .unwrap_or(legacy.super_topic);
    let sub_topic = Some(read_text(raw, keys.sub_topic.as_deref()))
        .filter(|value| !value.is_empty())
        .unwrap_or(legacy.sub_topic);
    let topic = if !super_topic.is_empty() && !sub_topic.is_empty() {
        join_topic(&super_topic, &sub_topic)
    } else {
        topic
    };

    let needs_review = keys
        .maintenance
        .as_deref()
        .and_then(|key| raw.get(key))
        .and_then(as_flag)
        .unwrap_or(false);

    let audit = extract_audit(record);
    let answers = read_answers(raw, &id);

    let mut question = Question {
        source_file_index: location.document,
        source: Some(location),
        topic_key: keys.topic,
        super_topic_key: keys.super_topic,
        sub_topic_key: keys.sub_topic,
        maintenance_key: keys.maintenance,
        exam_name: raw.get("examName").and_then(text_of).unwrap_or_default(),
        exam_year: raw.get("examYear").map(year_text).unwrap_or_default(),
        text: first_non_empty_text(record, QUESTION_TEXT_KEYS).unwrap_or_default(),
        explanation: first_non_empty_text(record, EXPLANATION_TEXT_KEYS).unwrap_or_default(),
        topic,
        super_topic,
        sub_topic,
        answers,
        topic_confidence: audit.topic_confidence,
        answer_confidence: audit.answer_confidence,
        recommend_change: audit.recommend_change,
        needs_maintenance: audit.needs_maintenance,
        needs_review,
        topic_reason: resolve_reason(raw, OverrideField::Topic, audit.topic_reason),
        answer_reason: resolve_reason(raw, OverrideField::Answer, audit.answer_reason),
        maintenance_reason: resolve_reason(
            raw,
            OverrideField::Maintenance,
            audit.maintenance_reason,
        ),
        topic_source: audit.topic_source,
        answer_source: audit.answer_source,
        answers_changed_by_ai: audit.answers_changed_by_ai,
        manual_edited: manual_edited(raw),
        image_files: read_image_files(raw),
        maintenance_inputs: MaintenanceInputs {
            severity: audit.maintenance_severity,
            reason_count: audit.maintenance_reason_count,
            ..MaintenanceInputs::default()
        },
        id,
        ..Question::default()
    };
    question.refresh_traffic();

    Some(question)
}

fn read_text(raw: &Map<String, Value>, key: Option<&str>) -> String {
    key.and_then(|key| raw.get(key))
        .and_then(text_of)
        .unwrap_or_default()
}

fn year_text(value: &Value) -> String {
    match value {
        Value::Number(_) => as_number(value)
            .map(|year| {
                if year.fract() == 0.0 {
                    format!("{}", year as i64)
                } else {
                    year.to_string()
                }
            })
            .unwrap_or_default(),
        Value::String(text) => text.trim().to_string(),
        _ => String::new(),
    }
}

fn read_answers(raw: &Map<String, Value>, question_id: &str) -> Vec<Answer> {
    let Some(items) = raw.get("answers").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut answers: Vec<Answer> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let fallback_id = format!("ans_{question_id}_{index}");
            match item {
                Value::Object(answer) => Answer {
                    id: answer
                        .get("id")
                        .and_then(text_of)
                        .filter(|id| !id.is_empty())
                        .unwrap_or(fallback_id),
                    text: first_non_empty_text(item, &["text", "html"]).unwrap_or_default(),
                    is_correct: answer
                        .get("isCorrect")
                        .and_then(as_flag)
                        .unwrap_or(false),
                },
                other => Answer {
                    id: fallback_id,
                    text: text_of(other).unwrap_or_default(),
                    is_correct: false,
                },
            }
        })
        .collect();

    // Older exports only carry the index list.
    let has_inline_flags = items
        .iter()
        .any(|item| item.get("isCorrect").is_some());
    if !has_inline_flags {
        if let Some(indices) = raw.get("correctIndices").and_then(Value::as_array) {
            for index in indices.iter().filter_map(Value::as_u64) {
                if let Some(answer) = answers.get_mut(index as usize) {
                    answer.is_correct = true;
                }
            }
        }
    }

    answers
}

fn read_image_files(raw: &Map<String, Value>) -> Vec<String> {
    raw.get("imageFiles")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|file| !file.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
