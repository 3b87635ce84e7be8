use serde_json::{Map, Value};

use super::audit::{as_flag, text_of};
use super::question::Reason;

pub const ANNOTATIONS_KEY: &str = "annotations";
pub const MANUAL_EDITED_KEY: &str = "manualEdited";
pub const MANUAL_EDITED_TAG: &str = "manual-edited";
pub const TAGS_KEY: &str = "tags";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OverrideField {
    Maintenance,
    Answer,
    Topic,
}

impl OverrideField {
    pub const ALL: [Self; 3] = [Self::Maintenance, Self::Answer, Self::Topic];

    /// The first key is the one written back.
    pub fn top_level_keys(self) -> &'static [&'static str] {
        match self {
            Self::Maintenance => &["manualMaintenanceReason", "maintenanceReasonManual"],
            Self::Answer => &[
                "manualAnswerReason",
                "answerReasonManual",
                "manualExplanation",
            ],
            Self::Topic => &["manualTopicReason", "topicReasonManual"],
        }
    }

    pub fn annotation_key(self) -> &'static str {
        match self {
            Self::Maintenance => "maintenanceReason",
            Self::Answer => "answerReason",
            Self::Topic => "topicReason",
        }
    }
}

pub fn manual_override_text(record: &Map<String, Value>, field: OverrideField) -> Option<String> {
    let top_level = field
        .top_level_keys()
        .iter()
        .filter_map(|key| record.get(*key))
        .filter_map(text_of)
        .find(|text| !text.is_empty());

    top_level.or_else(|| {
        annotations(record)
            .and_then(|annotations| annotations.get(field.annotation_key()))
            .and_then(text_of)
            .filter(|text| !text.is_empty())
    })
}

/// A manual text always wins over the AI-derived one.
pub fn resolve_reason(
    record: &Map<String, Value>,
    field: OverrideField,
    ai_text: Option<String>,
) -> Reason {
    Reason::resolve(manual_override_text(record, field), ai_text)
}

pub fn manual_edited(record: &Map<String, Value>) -> bool {
    let top_level = record.get(MANUAL_EDITED_KEY).and_then(as_flag);
    let annotated = annotations(record)
        .and_then(|annotations| annotations.get(MANUAL_EDITED_KEY))
        .and_then(as_flag);
    top_level.or(annotated).unwrap_or(false)
}

fn annotations(record: &Map<String, Value>) -> Option<&Map<String, Value>> {
    record.get(ANNOTATIONS_KEY).and_then(Value::as_object)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dataset::question::Provenance;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("fixture should be an object")
    }

    #[test]
    fn top_level_override_is_detected() {
        let raw = record(json!({ "manualAnswerReason": " B ist korrekt " }));
        let reason = resolve_reason(&raw, OverrideField::Answer, Some("ai".into()));
        assert_eq!(reason.provenance, Provenance::Manual);
        assert_eq!(reason.text, "B ist korrekt");
    }

    #[test]
    fn annotation_mirror_is_detected() {
        let raw = record(json!({ "annotations": { "topicReason": "passt besser" } }));
        assert_eq!(
            manual_override_text(&raw, OverrideField::Topic).as_deref(),
            Some("passt besser")
        );
        assert_eq!(manual_override_text(&raw, OverrideField::Answer), None);
    }

    #[test]
    fn blank_override_falls_back_to_ai_text() {
        let raw = record(json!({ "manualMaintenanceReason": "  ", "annotations": {} }));
        let reason = resolve_reason(&raw, OverrideField::Maintenance, Some("severity 3".into()));
        assert_eq!(reason.provenance, Provenance::AiDerived);
        assert_eq!(reason.text, "severity 3");
    }

    #[test]
    fn manual_edited_reads_both_locations() {
        assert!(manual_edited(&record(json!({ "manualEdited": true }))));
        assert!(manual_edited(&record(json!({ "annotations": { "manualEdited": true } }))));
        assert!(!manual_edited(&record(json!({}))));
    }
}
