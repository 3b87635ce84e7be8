use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::InspectArgs;
use crate::commands::load_dataset;
use crate::dataset::{KeyRole, Question, QuestionSet};
use crate::maintenance::TrafficLevel;
use crate::model::DatasetSummary;

pub fn run(args: InspectArgs) -> Result<()> {
    let loaded = load_dataset(&args.dataset)?;
    if loaded.questions.is_empty() {
        warn!("dataset contains no questions with a usable id");
    }

    if let Some(id) = &args.id {
        let question = loaded
            .questions
            .get(id)
            .with_context(|| format!("no question with id {id:?}"))?;
        return write_json_stdout(question);
    }

    let summary = summarize(&loaded.questions, loaded.dataset.documents().len());

    info!(
        documents = summary.document_count,
        records = loaded.record_count(),
        questions = summary.question_count,
        skipped_without_id = summary.skipped_without_id,
        replaced_duplicates = summary.replaced_duplicates,
        with_images = summary.with_images,
        needs_review = summary.needs_review,
        manual_edited = summary.manual_edited,
        "dataset summary"
    );
    info!(
        green = summary.traffic.green,
        yellow = summary.traffic.yellow,
        red = summary.traffic.red,
        "maintenance traffic levels"
    );
    info!(
        maintenance = summary.manual_overrides.maintenance,
        answer = summary.manual_overrides.answer,
        topic = summary.manual_overrides.topic,
        "manual reason overrides"
    );
    for (exam, count) in &summary.exams {
        info!(exam = %exam, questions = count, "exam");
    }
    for (super_topic, count) in &summary.super_topics {
        info!(super_topic = %super_topic, questions = count, "super-topic");
    }
    log_detected_keys(&loaded.questions);

    if args.json {
        let questions: Vec<&Question> = loaded.questions.iter().collect();
        write_json_stdout(&questions)?;
    }

    Ok(())
}

fn write_json_stdout<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value)
        .context("failed to serialize canonical questions")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

pub fn summarize(questions: &QuestionSet, document_count: usize) -> DatasetSummary {
    let mut summary = DatasetSummary {
        document_count,
        question_count: questions.len(),
        skipped_without_id: questions.skipped_without_id,
        replaced_duplicates: questions.replaced_duplicates,
        ..DatasetSummary::default()
    };

    for question in questions.iter() {
        match question.maintenance_traffic_level {
            TrafficLevel::Green => summary.traffic.green += 1,
            TrafficLevel::Yellow => summary.traffic.yellow += 1,
            TrafficLevel::Red => summary.traffic.red += 1,
        }
        if question.has_manual_maintenance_override() {
            summary.manual_overrides.maintenance += 1;
        }
        if question.has_manual_answer_override() {
            summary.manual_overrides.answer += 1;
        }
        if question.has_manual_topic_override() {
            summary.manual_overrides.topic += 1;
        }
        if !question.image_files.is_empty() {
            summary.with_images += 1;
        }
        if question.needs_review {
            summary.needs_review += 1;
        }
        if question.manual_edited {
            summary.manual_edited += 1;
        }

        let exam = if question.exam_name.is_empty() {
            "(no exam)".to_string()
        } else {
            question.exam_name.clone()
        };
        *summary.exams.entry(exam).or_default() += 1;

        let super_topic = if question.super_topic.is_empty() {
            crate::filters::NO_SUPER_TOPIC.to_string()
        } else {
            question.super_topic.clone()
        };
        *summary.super_topics.entry(super_topic).or_default() += 1;
    }

    summary
}

fn log_detected_keys(questions: &QuestionSet) {
    let roles = [
        KeyRole::Topic,
        KeyRole::SuperTopic,
        KeyRole::SubTopic,
        KeyRole::Maintenance,
    ];
    for role in roles {
        let mut keys: Vec<&str> = questions
            .iter()
            .filter_map(|question| match role {
                KeyRole::Topic => question.topic_key.as_deref(),
                KeyRole::SuperTopic => question.super_topic_key.as_deref(),
                KeyRole::SubTopic => question.sub_topic_key.as_deref(),
                KeyRole::Maintenance => question.maintenance_key.as_deref(),
            })
            .collect();
        keys.sort_unstable();
        keys.dedup();
        info!(role = role.as_str(), keys = %keys.join(", "), "detected record keys");
    }
}
