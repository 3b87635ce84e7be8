use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::SyncArgs;
use crate::commands::{load_dataset, write_export};
use crate::dataset::{Question, QuestionSet, Reason};
use crate::model::ExportCounts;
use crate::util::now_utc_string;

pub fn run(args: SyncArgs) -> Result<()> {
    let started_at = now_utc_string();
    let mut loaded = load_dataset(&args.dataset)?;

    let mut edited = 0;
    for (entries, field) in [
        (&args.answer_reasons, ReasonField::Answer),
        (&args.topic_reasons, ReasonField::Topic),
        (&args.maintenance_reasons, ReasonField::Maintenance),
    ] {
        edited += apply_manual_reasons(&mut loaded.questions, entries, field)?;
    }
    if edited > 0 {
        info!(edited, "applied manual reasons");
    }

    let synced = loaded.dataset.sync_all(&loaded.questions);
    info!(synced, questions = loaded.questions.len(), "wrote canonical fields back");

    let counts = ExportCounts {
        synced_count: synced,
        edited_count: edited,
        ..ExportCounts::default()
    };
    let manifest_path = write_export("sync", started_at, &loaded, &args.output, counts)?;

    info!(manifest = %manifest_path.display(), "sync completed");
    Ok(())
}

#[derive(Copy, Clone, Debug)]
enum ReasonField {
    Answer,
    Topic,
    Maintenance,
}

impl ReasonField {
    fn as_str(self) -> &'static str {
        match self {
            Self::Answer => "answer",
            Self::Topic => "topic",
            Self::Maintenance => "maintenance",
        }
    }

    fn reason_mut(self, question: &mut Question) -> &mut Reason {
        match self {
            Self::Answer => &mut question.answer_reason,
            Self::Topic => &mut question.topic_reason,
            Self::Maintenance => &mut question.maintenance_reason,
        }
    }
}

fn apply_manual_reasons(
    questions: &mut QuestionSet,
    entries: &[String],
    field: ReasonField,
) -> Result<usize> {
    for entry in entries {
        let (id, text) = parse_assignment(entry)?;
        let question = questions
            .get_mut(id)
            .with_context(|| format!("no question with id {id:?}"))?;
        field.reason_mut(question).set_manual(text);
        info!(
            id,
            field = field.as_str(),
            cleared = text.trim().is_empty(),
            "manual reason set"
        );
    }
    Ok(entries.len())
}

/// Splits `ID=TEXT` on the first `=`; the text may be empty.
fn parse_assignment(entry: &str) -> Result<(&str, &str)> {
    let Some((id, text)) = entry.split_once('=') else {
        bail!("expected ID=TEXT, got {entry:?}");
    };
    let id = id.trim();
    if id.is_empty() {
        bail!("missing question id in {entry:?}");
    }
    Ok((id, text))
}
