use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::QueryArgs;
use crate::commands::{load_dataset, select_questions};
use crate::dataset::{Answer, Question, answer_letter};
use crate::filters::apply_random_and_shuffle;

pub fn run(args: QueryArgs) -> Result<()> {
    let loaded = load_dataset(&args.dataset)?;
    let mut selected = select_questions(&loaded.questions, &args.filters)?;
    selected = apply_random_and_shuffle(selected, args.random_n, args.shuffle, args.seed);
    if let Some(limit) = args.limit {
        selected.truncate(limit);
    }

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &selected)
            .context("failed to serialize query json output")?;
        writeln!(output)?;
        output.flush()?;
    } else {
        write_text_listing(&selected)?;
    }

    info!(returned = selected.len(), "query completed");
    Ok(())
}

fn write_text_listing(questions: &[&Question]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Results: {}", questions.len())?;

    for question in questions {
        let topic = if question.topic.is_empty() {
            "(no topic)"
        } else {
            &question.topic
        };
        writeln!(
            output,
            "{}\t{}\t{}\t{}",
            question.id,
            display_exam(question),
            question.maintenance_traffic_level.as_str(),
            topic
        )?;
        writeln!(output, "\t{}", question.text)?;
        for (index, answer) in question.answers.iter().enumerate() {
            writeln!(output, "\t{}", answer_line(index, answer))?;
        }
        writeln!(output, "\tcorrect: {}", correct_letters(question))?;
    }

    output.flush()?;
    Ok(())
}

fn display_exam(question: &Question) -> String {
    match (question.exam_name.is_empty(), question.exam_year.is_empty()) {
        (true, true) => "(no exam)".to_string(),
        (false, true) => question.exam_name.clone(),
        (true, false) => question.exam_year.clone(),
        (false, false) => format!("{} {}", question.exam_name, question.exam_year),
    }
}

fn answer_line(index: usize, answer: &Answer) -> String {
    let marker = if answer.is_correct { "*" } else { " " };
    format!("{marker} {}) {}", answer_letter(index), answer.text)
}

fn correct_letters(question: &Question) -> String {
    let letters: Vec<String> = question
        .correct_indices()
        .into_iter()
        .map(answer_letter)
        .collect();
    if letters.is_empty() {
        "-".to_string()
    } else {
        letters.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_letters_lists_every_flagged_answer() {
        let question = Question {
            id: "q".into(),
            answers: vec![
                Answer {
                    id: "a".into(),
                    text: "eins".into(),
                    is_correct: true,
                },
                Answer {
                    id: "b".into(),
                    text: "zwei".into(),
                    is_correct: false,
                },
                Answer {
                    id: "c".into(),
                    text: "drei".into(),
                    is_correct: true,
                },
            ],
            ..Question::default()
        };
        assert_eq!(correct_letters(&question), "A, C");
        assert_eq!(correct_letters(&Question::default()), "-");
    }

    #[test]
    fn answer_lines_mark_correct_options() {
        let right = Answer {
            id: "a".into(),
            text: "TCP".into(),
            is_correct: true,
        };
        let wrong = Answer {
            id: "b".into(),
            text: "UDP".into(),
            is_correct: false,
        };
        assert_eq!(answer_line(0, &right), "* A) TCP");
        assert_eq!(answer_line(1, &wrong), "  B) UDP");
    }

    #[test]
    fn exam_label_combines_name_and_year() {
        let question = Question {
            exam_name: "AP1".into(),
            exam_year: "2021".into(),
            ..Question::default()
        };
        assert_eq!(display_exam(&question), "AP1 2021");
        assert_eq!(display_exam(&Question::default()), "(no exam)");
    }
}
