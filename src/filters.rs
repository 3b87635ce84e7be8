use std::collections::HashSet;

use clap::ValueEnum;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::dataset::{Question, split_legacy_topic};

pub const NO_SUPER_TOPIC: &str = "(no super-topic)";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ImageMode {
    All,
    With,
    Without,
}

impl ImageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::With => "with",
            Self::Without => "without",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TopicSelection {
    Super(String),
    Sub(String, String),
}

impl TopicSelection {
    /// `"Netzwerke"` selects a whole super-topic, `"Netzwerke > TCP"` one
    /// sub-topic.
    pub fn parse(input: &str) -> Option<Self> {
        let parts = split_legacy_topic(input);
        if parts.super_topic.is_empty() {
            return None;
        }
        if parts.sub_topic.is_empty() {
            Some(Self::Super(parts.super_topic))
        } else {
            Some(Self::Sub(parts.super_topic, parts.sub_topic))
        }
    }
}

#[derive(Clone, Debug)]
pub struct QualityFilter {
    pub topic_confidence_max: f64,
    pub answer_confidence_max: f64,
    pub only_recommend_change: bool,
    pub only_needs_maintenance: bool,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self {
            topic_confidence_max: 1.0,
            answer_confidence_max: 1.0,
            only_recommend_change: false,
            only_needs_maintenance: false,
        }
    }
}

pub fn filter_by_exams<'a>(questions: Vec<&'a Question>, exams: &[String]) -> Vec<&'a Question> {
    if exams.is_empty() {
        return questions;
    }
    let wanted: HashSet<&str> = exams.iter().map(String::as_str).collect();
    questions
        .into_iter()
        .filter(|question| {
            !question.exam_name.is_empty() && wanted.contains(question.exam_name.as_str())
        })
        .collect()
}

pub fn filter_by_image_mode(questions: Vec<&Question>, mode: ImageMode) -> Vec<&Question> {
    match mode {
        ImageMode::All => questions,
        ImageMode::With => questions
            .into_iter()
            .filter(|question| !question.image_files.is_empty())
            .collect(),
        ImageMode::Without => questions
            .into_iter()
            .filter(|question| question.image_files.is_empty())
            .collect(),
    }
}

pub fn filter_by_topics<'a>(
    questions: Vec<&'a Question>,
    selections: &[TopicSelection],
) -> Vec<&'a Question> {
    if selections.is_empty() {
        return questions;
    }
    let wanted: HashSet<&TopicSelection> = selections.iter().collect();

    questions
        .into_iter()
        .filter(|question| {
            let super_topic = match question.super_topic.trim() {
                "" => NO_SUPER_TOPIC,
                other => other,
            };
            let sub_topic = question.sub_topic.trim();
            if wanted.contains(&TopicSelection::Super(super_topic.to_string())) {
                return true;
            }
            !sub_topic.is_empty()
                && wanted.contains(&TopicSelection::Sub(
                    super_topic.to_string(),
                    sub_topic.to_string(),
                ))
        })
        .collect()
}

/// Keeps questions at or below both confidence cut-offs. A missing
/// confidence counts as full confidence.
pub fn filter_by_quality<'a>(
    questions: Vec<&'a Question>,
    filter: &QualityFilter,
) -> Vec<&'a Question> {
    questions
        .into_iter()
        .filter(|question| {
            if question.topic_confidence.unwrap_or(1.0) > filter.topic_confidence_max {
                return false;
            }
            if question.answer_confidence.unwrap_or(1.0) > filter.answer_confidence_max {
                return false;
            }
            if filter.only_recommend_change && !question.recommend_change {
                return false;
            }
            if filter.only_needs_maintenance && !question.needs_maintenance {
                return false;
            }
            true
        })
        .collect()
}

/// `;` separates terms; every term has to appear in the question text, or in
/// one of the answers when `in_answers` is set.
pub fn search_questions<'a>(
    questions: Vec<&'a Question>,
    query: &str,
    in_answers: bool,
) -> Vec<&'a Question> {
    let terms: Vec<String> = query
        .split(';')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect();
    if terms.is_empty() {
        return questions;
    }

    questions
        .into_iter()
        .filter(|question| {
            let text = question.text.to_lowercase();
            let answers: Vec<String> = if in_answers {
                question
                    .answers
                    .iter()
                    .map(|answer| answer.text.to_lowercase())
                    .collect()
            } else {
                Vec::new()
            };
            terms.iter().all(|term| {
                text.contains(term.as_str())
                    || answers.iter().any(|answer| answer.contains(term.as_str()))
            })
        })
        .collect()
}

/// Literal replacement across text, explanation and answers. Returns whether
/// anything changed; changed questions are marked as manually edited.
pub fn replace_across_question(question: &mut Question, search: &str, replace: &str) -> bool {
    if search.is_empty() {
        return false;
    }

    let mut touched = false;
    let mut apply = |value: &mut String| {
        if value.contains(search) {
            *value = value.replace(search, replace);
            touched = true;
        }
    };

    apply(&mut question.text);
    apply(&mut question.explanation);
    for answer in &mut question.answers {
        apply(&mut answer.text);
    }

    if touched {
        question.manual_edited = true;
    }
    touched
}

/// Samples `random_n` questions when that is smaller than the set, then
/// optionally shuffles. A fixed `seed` makes both steps reproducible.
pub fn apply_random_and_shuffle<'a>(
    mut questions: Vec<&'a Question>,
    random_n: usize,
    shuffle: bool,
    seed: Option<u64>,
) -> Vec<&'a Question> {
    let sample = random_n > 0 && random_n < questions.len();
    if !sample && !shuffle {
        return questions;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    if sample {
        questions = questions
            .choose_multiple(&mut rng, random_n)
            .copied()
            .collect();
    }
    if shuffle {
        questions.shuffle(&mut rng);
    }
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Answer;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            ..Question::default()
        }
    }

    #[test]
    fn topic_selection_parses_super_and_sub() {
        assert_eq!(
            TopicSelection::parse("Netzwerke"),
            Some(TopicSelection::Super("Netzwerke".into()))
        );
        assert_eq!(
            TopicSelection::parse("Netzwerke > TCP"),
            Some(TopicSelection::Sub("Netzwerke".into(), "TCP".into()))
        );
        assert_eq!(TopicSelection::parse("  "), None);
    }

    #[test]
    fn exam_filter_keeps_all_when_nothing_selected() {
        let mut a = question("a");
        a.exam_name = "AP1".into();
        let b = question("b");
        let all = vec![&a, &b];

        assert_eq!(filter_by_exams(all.clone(), &[]).len(), 2);
        let only = filter_by_exams(all, &["AP1".to_string()]);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, "a");
    }

    #[test]
    fn image_mode_splits_by_attachment() {
        let mut a = question("a");
        a.image_files = vec!["img/1.png".into()];
        let b = question("b");

        assert_eq!(filter_by_image_mode(vec![&a, &b], ImageMode::With)[0].id, "a");
        assert_eq!(filter_by_image_mode(vec![&a, &b], ImageMode::Without)[0].id, "b");
        assert_eq!(filter_by_image_mode(vec![&a, &b], ImageMode::All).len(), 2);
    }

    #[test]
    fn topic_filter_matches_super_or_exact_sub() {
        let mut tcp = question("tcp");
        tcp.set_topic_parts("Netzwerke", "TCP");
        let mut udp = question("udp");
        udp.set_topic_parts("Netzwerke", "UDP");
        let loose = question("loose");

        let selected = filter_by_topics(
            vec![&tcp, &udp, &loose],
            &[TopicSelection::Sub("Netzwerke".into(), "TCP".into())],
        );
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "tcp");

        let selected = filter_by_topics(
            vec![&tcp, &udp, &loose],
            &[TopicSelection::Super(NO_SUPER_TOPIC.into())],
        );
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "loose");
    }

    #[test]
    fn quality_filter_treats_missing_confidence_as_full() {
        let mut weak = question("weak");
        weak.answer_confidence = Some(0.3);
        weak.recommend_change = true;
        let unknown = question("unknown");

        let filter = QualityFilter {
            answer_confidence_max: 0.5,
            ..QualityFilter::default()
        };
        let kept = filter_by_quality(vec![&weak, &unknown], &filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "weak");

        let only_flagged = QualityFilter {
            only_recommend_change: true,
            ..QualityFilter::default()
        };
        assert_eq!(filter_by_quality(vec![&weak, &unknown], &only_flagged).len(), 1);
    }

    #[test]
    fn search_requires_every_term() {
        let mut q = question("q");
        q.text = "Welche Schicht nutzt TCP?".into();
        q.answers = vec![Answer {
            id: "a".into(),
            text: "Transportschicht".into(),
            is_correct: true,
        }];

        assert_eq!(search_questions(vec![&q], "tcp; schicht", false).len(), 1);
        assert_eq!(search_questions(vec![&q], "tcp; transport", false).len(), 0);
        assert_eq!(search_questions(vec![&q], "tcp; transport", true).len(), 1);
        assert_eq!(search_questions(vec![&q], " ; ", false).len(), 1);
    }

    #[test]
    fn random_sample_is_reproducible_with_a_seed() {
        let pool: Vec<Question> = (0..20).map(|n| question(&format!("q{n}"))).collect();
        let all: Vec<&Question> = pool.iter().collect();
        let ids = |picked: Vec<&Question>| -> Vec<String> {
            picked.into_iter().map(|q| q.id.clone()).collect()
        };

        let first = ids(apply_random_and_shuffle(all.clone(), 5, false, Some(42)));
        let second = ids(apply_random_and_shuffle(all.clone(), 5, false, Some(42)));
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        let unique: HashSet<&String> = first.iter().collect();
        assert_eq!(unique.len(), 5);

        let untouched = ids(apply_random_and_shuffle(all.clone(), 0, false, Some(42)));
        assert_eq!(untouched, ids(all.clone()));
        let oversized = ids(apply_random_and_shuffle(all.clone(), 50, false, Some(42)));
        assert_eq!(oversized, ids(all.clone()));
    }

    #[test]
    fn shuffle_keeps_every_question() {
        let pool: Vec<Question> = (0..10).map(|n| question(&format!("q{n}"))).collect();
        let all: Vec<&Question> = pool.iter().collect();

        let shuffled = apply_random_and_shuffle(all.clone(), 0, true, Some(7));
        assert_eq!(shuffled.len(), 10);
        let mut ids: Vec<&str> = shuffled.iter().map(|q| q.id.as_str()).collect();
        ids.sort_unstable();
        let mut expected: Vec<&str> = all.iter().map(|q| q.id.as_str()).collect();
        expected.sort_unstable();
        assert_eq!(ids, expected);

        let again = apply_random_and_shuffle(all, 0, true, Some(7));
        let order: Vec<&str> = again.iter().map(|q| q.id.as_str()).collect();
        let first: Vec<&str> = shuffled.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(order, first);
    }

    #[test]
    fn replace_touches_text_answers_and_marks_edit() {
        let mut q = question("q");
        q.text = "Das OSI Modell".into();
        q.explanation = "OSI hat sieben Schichten".into();
        q.answers = vec![Answer {
            id: "a".into(),
            text: "OSI".into(),
            is_correct: false,
        }];

        assert!(replace_across_question(&mut q, "OSI", "ISO/OSI"));
        assert_eq!(q.text, "Das ISO/OSI Modell");
        assert_eq!(q.explanation, "ISO/OSI hat sieben Schichten");
        assert_eq!(q.answers[0].text, "ISO/OSI");
        assert!(q.manual_edited);

        let mut untouched = question("u");
        assert!(!replace_across_question(&mut untouched, "OSI", "x"));
        assert!(!untouched.manual_edited);
    }
}
