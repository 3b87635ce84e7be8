use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::ReplaceArgs;
use crate::commands::{load_dataset, select_questions, write_export};
use crate::filters::replace_across_question;
use crate::model::ExportCounts;
use crate::util::now_utc_string;

pub fn run(args: ReplaceArgs) -> Result<()> {
    if args.find.is_empty() {
        bail!("--find must not be empty");
    }

    let started_at = now_utc_string();
    let mut loaded = load_dataset(&args.dataset)?;

    let ids: Vec<String> = select_questions(&loaded.questions, &args.filters)?
        .into_iter()
        .map(|question| question.id.clone())
        .collect();

    let mut edited = 0;
    for id in &ids {
        let Some(question) = loaded.questions.get_mut(id) else {
            continue;
        };
        if replace_across_question(question, &args.find, &args.replace_with) {
            debug!(id = %id, "replaced text");
            edited += 1;
        }
    }
    info!(candidates = ids.len(), edited, "bulk replace applied");

    let synced = loaded.dataset.sync_all(&loaded.questions);
    let counts = ExportCounts {
        synced_count: synced,
        edited_count: edited,
        ..ExportCounts::default()
    };
    let manifest_path = write_export("replace", started_at, &loaded, &args.output, counts)?;

    info!(manifest = %manifest_path.display(), "replace completed");
    Ok(())
}
