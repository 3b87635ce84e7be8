use serde::Serialize;

use crate::maintenance::{MaintenanceInputs, TrafficLevel, classify};
use crate::text::normalize_whitespace;

/// Position of a raw record inside the owning [`super::Dataset`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct RecordRef {
    pub document: usize,
    pub record: usize,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    #[default]
    None,
    AiDerived,
    Manual,
}

/// Displayed explanation text together with where it came from.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Reason {
    pub text: String,
    pub provenance: Provenance,
    #[serde(skip)]
    ai_text: String,
}

impl Reason {
    pub fn resolve(manual: Option<String>, ai: Option<String>) -> Self {
        let ai_text = ai.unwrap_or_default();
        match manual {
            Some(text) => Self {
                text,
                provenance: Provenance::Manual,
                ai_text,
            },
            None => {
                let mut reason = Self {
                    ai_text,
                    ..Self::default()
                };
                reason.clear_manual();
                reason
            }
        }
    }

    /// Blank input clears the override instead of storing an empty one.
    pub fn set_manual(&mut self, text: &str) {
        let text = normalize_whitespace(text);
        if text.is_empty() {
            self.clear_manual();
            return;
        }
        self.text = text;
        self.provenance = Provenance::Manual;
    }

    pub fn clear_manual(&mut self) {
        self.text = self.ai_text.clone();
        self.provenance = if self.ai_text.is_empty() {
            Provenance::None
        } else {
            Provenance::AiDerived
        };
    }

    pub fn is_manual(&self) -> bool {
        self.provenance == Provenance::Manual
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub source_file_index: usize,
    #[serde(skip)]
    pub source: Option<RecordRef>,

    pub topic_key: Option<String>,
    pub super_topic_key: Option<String>,
    pub sub_topic_key: Option<String>,
    pub maintenance_key: Option<String>,

    pub exam_name: String,
    pub exam_year: String,
    pub text: String,
    pub explanation: String,
    pub topic: String,
    pub super_topic: String,
    pub sub_topic: String,
    pub answers: Vec<Answer>,

    pub topic_confidence: Option<f64>,
    pub answer_confidence: Option<f64>,
    pub recommend_change: bool,
    pub needs_maintenance: bool,
    pub needs_review: bool,
    pub topic_reason: Reason,
    pub answer_reason: Reason,
    pub maintenance_reason: Reason,
    pub topic_source: String,
    pub answer_source: String,
    pub maintenance_traffic_level: TrafficLevel,
    pub maintenance_traffic_label: String,
    pub answers_changed_by_ai: bool,

    pub manual_edited: bool,
    pub image_files: Vec<String>,

    #[serde(skip)]
    pub(crate) maintenance_inputs: MaintenanceInputs,
}

impl Question {
    pub fn has_manual_maintenance_override(&self) -> bool {
        self.maintenance_reason.is_manual()
    }

    pub fn has_manual_answer_override(&self) -> bool {
        self.answer_reason.is_manual()
    }

    pub fn has_manual_topic_override(&self) -> bool {
        self.topic_reason.is_manual()
    }

    /// `super > sub`, or whichever part is non-empty.
    pub fn combined_topic(&self) -> String {
        join_topic(&self.super_topic, &self.sub_topic)
    }

    pub fn set_topic_parts(&mut self, super_topic: &str, sub_topic: &str) {
        self.super_topic = normalize_whitespace(super_topic);
        self.sub_topic = normalize_whitespace(sub_topic);
        self.topic = self.combined_topic();
    }

    pub fn correct_indices(&self) -> Vec<usize> {
        self.answers
            .iter()
            .enumerate()
            .filter(|(_, answer)| answer.is_correct)
            .map(|(index, _)| index)
            .collect()
    }

    /// Re-scores the traffic light from the stored audit signals and the
    /// current answer list.
    pub fn refresh_traffic(&mut self) {
        let inputs = MaintenanceInputs {
            flagged: self.needs_maintenance,
            answer_confidence: self.answer_confidence,
            topic_confidence: self.topic_confidence,
            answer_option_count: self.answers.len(),
            ..self.maintenance_inputs.clone()
        };
        let classification = classify(inputs.facts());
        self.maintenance_traffic_level = classification.level;
        self.maintenance_traffic_label = classification.label.to_string();
        self.maintenance_inputs = inputs;
    }
}

pub fn join_topic(super_topic: &str, sub_topic: &str) -> String {
    [super_topic, sub_topic]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" > ")
}

pub fn answer_letter(index: usize) -> String {
    let mut remaining = index + 1;
    let mut letters = Vec::new();
    while remaining > 0 {
        let offset = ((remaining - 1) % 26) as u8;
        letters.push((b'A' + offset) as char);
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}
