use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{DatasetArgs, FilterArgs, OutputArgs};
use crate::dataset::{Dataset, KeyDetector, Question, QuestionSet, WrittenDocument};
use crate::filters::{
    QualityFilter, TopicSelection, filter_by_exams, filter_by_image_mode, filter_by_quality,
    filter_by_topics, search_questions,
};
use crate::model::{EXPORT_MANIFEST_VERSION, ExportCounts, ExportManifest, ExportedDocument};
use crate::taxonomy::{CanonicalizeReport, apply_catalog, find_taxonomy_file, load_catalog};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

pub mod inspect;
pub mod query;
pub mod replace;
pub mod sync;
pub mod taxonomy;

pub(crate) struct LoadedDataset {
    pub dataset: Dataset,
    pub questions: QuestionSet,
    pub catalog_path: Option<PathBuf>,
    pub canonicalize: Option<CanonicalizeReport>,
}

impl LoadedDataset {
    pub fn record_count(&self) -> usize {
        self.dataset
            .documents()
            .iter()
            .map(|document| document.records().map(Vec::len).unwrap_or(0))
            .sum()
    }
}

/// Loads and normalizes every dataset document, then snaps topics onto the
/// catalog when one is found.
pub(crate) fn load_dataset(args: &DatasetArgs) -> Result<LoadedDataset> {
    let detector = KeyDetector::new()?;
    let dataset = Dataset::load(&args.datasets)?;
    let mut questions = dataset.normalize(&detector);

    info!(
        documents = dataset.documents().len(),
        questions = questions.len(),
        skipped_without_id = questions.skipped_without_id,
        replaced_duplicates = questions.replaced_duplicates,
        "normalized dataset"
    );

    let catalog_path = resolve_taxonomy_path(args)?;
    let mut canonicalize = None;
    if let Some(path) = &catalog_path {
        if let Some(catalog) = load_catalog(path)? {
            let report = apply_catalog(questions.iter_mut(), &catalog);
            info!(
                checked = report.checked,
                rejected = report.rejected.len(),
                "canonicalized topics"
            );
            canonicalize = Some(report);
        }
    }

    Ok(LoadedDataset {
        dataset,
        questions,
        catalog_path,
        canonicalize,
    })
}

fn resolve_taxonomy_path(args: &DatasetArgs) -> Result<Option<PathBuf>> {
    if let Some(path) = &args.taxonomy {
        return Ok(Some(path.clone()));
    }
    if args.no_taxonomy {
        return Ok(None);
    }

    let Some(first) = args.datasets.first() else {
        return Ok(None);
    };
    let dir = match first.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let found = find_taxonomy_file(dir)?
        .filter(|candidate| !args.datasets.iter().any(|dataset| dataset == candidate));
    match &found {
        Some(path) => info!(path = %path.display(), "using topic tree found next to dataset"),
        None => info!(dir = %dir.display(), "no topic tree found; topics left as recorded"),
    }
    Ok(found)
}

pub(crate) fn select_questions<'a>(
    questions: &'a QuestionSet,
    filters: &FilterArgs,
) -> Result<Vec<&'a Question>> {
    let mut selections = Vec::with_capacity(filters.topics.len());
    for topic in &filters.topics {
        match TopicSelection::parse(topic) {
            Some(selection) => selections.push(selection),
            None => bail!("invalid topic selection: {topic:?}"),
        }
    }

    let quality = QualityFilter {
        topic_confidence_max: filters.topic_confidence_max,
        answer_confidence_max: filters.answer_confidence_max,
        only_recommend_change: filters.only_recommend_change,
        only_needs_maintenance: filters.only_needs_maintenance,
    };

    let mut selected: Vec<&Question> = questions.iter().collect();
    selected = filter_by_exams(selected, &filters.exams);
    selected = filter_by_image_mode(selected, filters.image_mode);
    selected = filter_by_topics(selected, &selections);
    selected = filter_by_quality(selected, &quality);
    if let Some(query) = &filters.search {
        selected = search_questions(selected, query, filters.in_answers);
    }

    info!(
        total = questions.len(),
        selected = selected.len(),
        image_mode = filters.image_mode.as_str(),
        "applied question filters"
    );
    Ok(selected)
}

/// Writes the synchronized documents and the export manifest.
pub(crate) fn write_export(
    command: &str,
    started_at: String,
    loaded: &LoadedDataset,
    output: &OutputArgs,
    mut counts: ExportCounts,
) -> Result<PathBuf> {
    let written = if output.in_place {
        loaded.dataset.write_in_place()?
    } else {
        let dir = output
            .output_dir
            .as_deref()
            .context("either --output-dir or --in-place is required")?;
        loaded.dataset.write_to_dir(dir)?
    };

    counts.document_count = written.len();
    counts.record_count = written.iter().map(|document| document.record_count).sum();
    counts.question_count = loaded.questions.len();
    counts.skipped_without_id = loaded.questions.skipped_without_id;
    counts.replaced_duplicates = loaded.questions.replaced_duplicates;
    counts.rejected_topic_count = loaded
        .canonicalize
        .as_ref()
        .map(|report| report.rejected.len())
        .unwrap_or(0);

    let mut warnings = Vec::new();
    if let Some(report) = &loaded.canonicalize {
        warnings.extend(report.rejected.iter().map(|rejected| {
            format!(
                "question {}: {} topic {:?} not in catalog",
                rejected.question_id, rejected.level, rejected.value
            )
        }));
    }
    if counts.skipped_without_id > 0 {
        warnings.push(format!(
            "{} records without a usable id were left untouched",
            counts.skipped_without_id
        ));
    }

    let manifest_path = match &output.manifest_path {
        Some(path) => path.clone(),
        None => default_manifest_path(command, output, &written),
    };

    let manifest = ExportManifest {
        manifest_version: EXPORT_MANIFEST_VERSION,
        command: command.to_string(),
        started_at,
        generated_at: now_utc_string(),
        in_place: output.in_place,
        catalog_path: loaded
            .catalog_path
            .as_ref()
            .map(|path| path.display().to_string()),
        counts,
        documents: written.iter().map(exported_document).collect(),
        warnings,
    };

    if !manifest.warnings.is_empty() {
        warn!(count = manifest.warnings.len(), "export finished with warnings");
    }
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote export manifest");

    Ok(manifest_path)
}

fn default_manifest_path(
    command: &str,
    output: &OutputArgs,
    written: &[WrittenDocument],
) -> PathBuf {
    let file_name = format!("exambank-{command}-{}.json", utc_compact_string(Utc::now()));
    let dir = match &output.output_dir {
        Some(dir) if !output.in_place => dir.clone(),
        _ => written
            .first()
            .and_then(|document| document.output_path.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    dir.join(file_name)
}

fn exported_document(document: &WrittenDocument) -> ExportedDocument {
    ExportedDocument {
        source_path: document.source_path.display().to_string(),
        output_path: document.output_path.display().to_string(),
        record_count: document.record_count,
        sha256: document.sha256.clone(),
    }
}
