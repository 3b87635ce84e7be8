use serde::Serialize;

pub const HARD_SEVERITY_MIN: f64 = 3.0;
pub const SOFT_SEVERITY_MIN: f64 = 2.0;
pub const LOW_CONFIDENCE_SOFT_MAX: f64 = 0.6;
pub const LOW_CONFIDENCE_HARD_MAX: f64 = 0.45;
pub const MIN_ANSWER_OPTIONS: usize = 3;
pub const SOFT_ISSUES_FOR_RED: u32 = 2;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLevel {
    #[default]
    Green,
    Yellow,
    Red,
}

impl TrafficLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }

    /// Display label as shown to editors.
    pub fn label(self) -> &'static str {
        match self {
            Self::Green => "gut",
            Self::Yellow => "Wartung empfohlen",
            Self::Red => "kritisch",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MaintenanceFacts {
    pub hard_issue: bool,
    pub soft_issue_count: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TrafficClassification {
    pub level: TrafficLevel,
    pub label: &'static str,
}

/// Raw signals gathered from one record before they are scored.
#[derive(Clone, Debug, Default)]
pub struct MaintenanceInputs {
    pub flagged: bool,
    pub severity: Option<f64>,
    pub reason_count: usize,
    pub answer_confidence: Option<f64>,
    pub topic_confidence: Option<f64>,
    pub answer_option_count: usize,
}

impl MaintenanceInputs {
    pub fn facts(&self) -> MaintenanceFacts {
        let severity_hard = self
            .severity
            .map(|value| value >= HARD_SEVERITY_MIN)
            .unwrap_or(false);

        // Each check adds its own point; the answer-confidence checks may both fire.
        let soft_checks = [
            self.severity
                .map(|value| value >= SOFT_SEVERITY_MIN)
                .unwrap_or(false),
            self.reason_count > 0,
            at_or_below(self.answer_confidence, LOW_CONFIDENCE_SOFT_MAX),
            at_or_below(self.topic_confidence, LOW_CONFIDENCE_SOFT_MAX),
            at_or_below(self.answer_confidence, LOW_CONFIDENCE_HARD_MAX),
            self.answer_option_count < MIN_ANSWER_OPTIONS,
        ];

        MaintenanceFacts {
            hard_issue: self.flagged || severity_hard,
            soft_issue_count: soft_checks.iter().filter(|hit| **hit).count() as u32,
        }
    }
}

fn at_or_below(value: Option<f64>, max: f64) -> bool {
    value.map(|value| value <= max).unwrap_or(false)
}

pub fn classify(facts: MaintenanceFacts) -> TrafficClassification {
    let level = if facts.hard_issue || facts.soft_issue_count >= SOFT_ISSUES_FOR_RED {
        TrafficLevel::Red
    } else if facts.soft_issue_count == 1 {
        TrafficLevel::Yellow
    } else {
        TrafficLevel::Green
    };

    TrafficClassification {
        level,
        label: level.label(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_inputs() -> MaintenanceInputs {
        MaintenanceInputs {
            flagged: false,
            severity: Some(0.0),
            reason_count: 0,
            answer_confidence: Some(0.95),
            topic_confidence: Some(0.9),
            answer_option_count: 4,
        }
    }

    #[test]
    fn classify_maps_single_soft_issue_to_yellow() {
        let result = classify(MaintenanceFacts {
            hard_issue: false,
            soft_issue_count: 1,
        });
        assert_eq!(result.level, TrafficLevel::Yellow);
        assert_eq!(result.label, "Wartung empfohlen");
    }

    #[test]
    fn labels_follow_the_editor_wording() {
        assert_eq!(TrafficLevel::Green.label(), "gut");
        assert_eq!(TrafficLevel::Yellow.label(), "Wartung empfohlen");
        assert_eq!(TrafficLevel::Red.label(), "kritisch");
    }

    #[test]
    fn classify_maps_hard_issue_to_red_without_soft_issues() {
        let result = classify(MaintenanceFacts {
            hard_issue: true,
            soft_issue_count: 0,
        });
        assert_eq!(result.level, TrafficLevel::Red);
    }

    #[test]
    fn classify_is_monotone_in_soft_issue_count() {
        let mut previous = TrafficLevel::Green;
        for count in 0..6 {
            let level = classify(MaintenanceFacts {
                hard_issue: false,
                soft_issue_count: count,
            })
            .level;
            assert!(level >= previous, "count {count} lowered severity");
            previous = level;
        }
        assert_eq!(previous, TrafficLevel::Red);
    }

    #[test]
    fn healthy_record_stays_green() {
        let facts = healthy_inputs().facts();
        assert_eq!(facts, MaintenanceFacts::default());
        assert_eq!(classify(facts).level, TrafficLevel::Green);
    }

    #[test]
    fn very_low_answer_confidence_counts_twice() {
        let inputs = MaintenanceInputs {
            answer_confidence: Some(0.3),
            ..healthy_inputs()
        };
        let facts = inputs.facts();
        assert_eq!(facts.soft_issue_count, 2);
        assert_eq!(classify(facts).level, TrafficLevel::Red);
    }

    #[test]
    fn severity_thresholds_split_soft_and_hard() {
        let soft = MaintenanceInputs {
            severity: Some(2.0),
            ..healthy_inputs()
        }
        .facts();
        assert!(!soft.hard_issue);
        assert_eq!(soft.soft_issue_count, 1);

        let hard = MaintenanceInputs {
            severity: Some(3.0),
            ..healthy_inputs()
        }
        .facts();
        assert!(hard.hard_issue);
    }

    #[test]
    fn absent_confidence_is_not_a_soft_issue() {
        let facts = MaintenanceInputs {
            answer_confidence: None,
            topic_confidence: None,
            ..healthy_inputs()
        }
        .facts();
        assert_eq!(facts.soft_issue_count, 0);
    }

    #[test]
    fn soft_issue_count_is_order_independent() {
        let base = MaintenanceInputs {
            reason_count: 2,
            topic_confidence: Some(0.5),
            answer_option_count: 2,
            ..healthy_inputs()
        };
        assert_eq!(base.facts().soft_issue_count, 3);
        assert!(!base.facts().hard_issue);

        let flagged = MaintenanceInputs {
            flagged: true,
            ..base
        };
        assert!(flagged.facts().hard_issue);
    }
}
