use serde_json::{Map, Number, Value, json};
use tracing::warn;

use super::normalize::{EXPLANATION_TEXT_KEYS, QUESTION_TEXT_KEYS};
use super::overrides::{
    ANNOTATIONS_KEY, MANUAL_EDITED_KEY, MANUAL_EDITED_TAG, OverrideField, TAGS_KEY,
};
use super::question::{Question, Reason};

const DEFAULT_TOPIC_KEY: &str = "topic";
const DEFAULT_SUPER_TOPIC_KEY: &str = "superTopic";
const DEFAULT_SUB_TOPIC_KEY: &str = "subTopic";
const DEFAULT_MAINTENANCE_KEY: &str = "needsReview";

/// Writes the canonical fields of `question` into its raw record. Keys the
/// question does not own are left alone, and derived arrays are rebuilt from
/// the answer list on every call.
pub fn write_back(question: &Question, raw: &mut Map<String, Value>) {
    raw.insert("examName".to_string(), optional_string(&question.exam_name));
    raw.insert("examYear".to_string(), year_value(&question.exam_year));

    write_text_with_mirror(raw, QUESTION_TEXT_KEYS, "questionHtml", &question.text);
    write_text_with_mirror(
        raw,
        EXPLANATION_TEXT_KEYS,
        "explanationHtml",
        &question.explanation,
    );

    let combined = question.combined_topic();
    let topic = if combined.is_empty() {
        question.topic.clone()
    } else {
        combined
    };
    raw.insert(
        key_or(&question.topic_key, DEFAULT_TOPIC_KEY),
        Value::String(topic),
    );
    raw.insert(
        key_or(&question.super_topic_key, DEFAULT_SUPER_TOPIC_KEY),
        Value::String(question.super_topic.clone()),
    );
    raw.insert(
        key_or(&question.sub_topic_key, DEFAULT_SUB_TOPIC_KEY),
        Value::String(question.sub_topic.clone()),
    );
    raw.insert(
        key_or(&question.maintenance_key, DEFAULT_MAINTENANCE_KEY),
        Value::Bool(question.needs_review),
    );

    for field in OverrideField::ALL {
        write_override(raw, field, reason_for(question, field));
    }

    write_answers(question, raw);

    raw.insert(
        "imageFiles".to_string(),
        Value::Array(
            question
                .image_files
                .iter()
                .map(|file| file.trim())
                .filter(|file| !file.is_empty())
                .map(|file| Value::String(file.to_string()))
                .collect(),
        ),
    );

    if question.manual_edited {
        stamp_manual_edited(raw);
    }
}

fn reason_for(question: &Question, field: OverrideField) -> &Reason {
    match field {
        OverrideField::Maintenance => &question.maintenance_reason,
        OverrideField::Answer => &question.answer_reason,
        OverrideField::Topic => &question.topic_reason,
    }
}

fn key_or(detected: &Option<String>, default: &str) -> String {
    detected.clone().unwrap_or_else(|| default.to_string())
}

fn optional_string(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::String(value.to_string())
    }
}

fn year_value(year: &str) -> Value {
    let year = year.trim();
    if year.is_empty() {
        return Value::Null;
    }
    if let Ok(whole) = year.parse::<i64>() {
        return Value::Number(whole.into());
    }
    year.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// The plain key is whichever of `keys` the record already uses (first one
/// otherwise); the HTML mirror is only touched when it already exists.
fn write_text_with_mirror(
    raw: &mut Map<String, Value>,
    keys: &[&str],
    mirror_key: &str,
    text: &str,
) {
    let plain_key = keys
        .iter()
        .find(|key| raw.contains_key(**key))
        .or(keys.first())
        .copied();
    if let Some(plain_key) = plain_key {
        raw.insert(plain_key.to_string(), Value::String(text.to_string()));
    }
    if raw.contains_key(mirror_key) {
        raw.insert(mirror_key.to_string(), Value::String(text.to_string()));
    }
}

fn write_override(raw: &mut Map<String, Value>, field: OverrideField, reason: &Reason) {
    let keys = field.top_level_keys();

    if reason.is_manual() {
        raw.insert(keys[0].to_string(), Value::String(reason.text.clone()));
        if let Some(annotations) = annotations_mut(raw) {
            annotations.insert(
                field.annotation_key().to_string(),
                Value::String(reason.text.clone()),
            );
        }
        return;
    }

    // Absence, not a blank string, marks "no override".
    for key in keys {
        raw.shift_remove(*key);
    }
    if let Some(annotations) = raw.get_mut(ANNOTATIONS_KEY).and_then(Value::as_object_mut) {
        annotations.shift_remove(field.annotation_key());
    }
}

/// A non-object `annotations` value belongs to someone else and is kept.
fn annotations_mut(raw: &mut Map<String, Value>) -> Option<&mut Map<String, Value>> {
    let slot = raw
        .entry(ANNOTATIONS_KEY.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        warn!(
            key = ANNOTATIONS_KEY,
            "record annotations are not an object; left untouched"
        );
    }
    slot.as_object_mut()
}

fn write_answers(question: &Question, raw: &mut Map<String, Value>) {
    let previous = raw
        .get("answers")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let answers: Vec<Value> = question
        .answers
        .iter()
        .enumerate()
        .map(|(index, answer)| {
            let mut entry = previous
                .get(index)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let id = if answer.id.is_empty() {
                entry
                    .get("id")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| format!("ans_{}_{index}", question.id))
            } else {
                answer.id.clone()
            };
            entry.insert("id".to_string(), Value::String(id));
            entry.insert("text".to_string(), Value::String(answer.text.clone()));
            entry.insert("html".to_string(), Value::String(answer.text.clone()));
            entry.insert("isCorrect".to_string(), Value::Bool(answer.is_correct));
            Value::Object(entry)
        })
        .collect();

    let correct_indices = question.correct_indices();
    let correct_answers: Vec<Value> = correct_indices
        .iter()
        .map(|index| {
            let text = question
                .answers
                .get(*index)
                .map(|answer| answer.text.clone())
                .unwrap_or_default();
            json!({ "index": index, "text": text, "html": text })
        })
        .collect();

    raw.insert("answers".to_string(), Value::Array(answers));
    raw.insert("correctIndices".to_string(), json!(correct_indices));
    raw.insert("correctAnswers".to_string(), Value::Array(correct_answers));
}

fn stamp_manual_edited(raw: &mut Map<String, Value>) {
    raw.insert(MANUAL_EDITED_KEY.to_string(), Value::Bool(true));
    if let Some(annotations) = annotations_mut(raw) {
        annotations.insert(MANUAL_EDITED_KEY.to_string(), Value::Bool(true));
    }

    let tag = Value::String(MANUAL_EDITED_TAG.to_string());
    let tags = raw
        .entry(TAGS_KEY.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match tags {
        Value::Array(items) => {
            if !items.contains(&tag) {
                items.push(tag);
            }
        }
        Value::String(single) if !single.trim().is_empty() => {
            let existing = Value::String(single.clone());
            *tags = if existing == tag {
                Value::Array(vec![tag])
            } else {
                Value::Array(vec![existing, tag])
            };
        }
        other => *other = Value::Array(vec![tag]),
    }
}
