use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Question;
use crate::text::fold_token;

mod parse;

pub use self::parse::parse;

const TAXONOMY_FILE_CANDIDATES: &[&str] = &[
    "topic-tree.json",
    "topic_tree.json",
    "topicTree.json",
    "themen-tree.json",
    "themenbaum.json",
    "topics.json",
];

const TAXONOMY_FILE_PATTERN: &str = r"(?i)(topic|themen?)[-_]?(tree|baum).*\.json$";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCatalog {
    pub super_topics: Vec<String>,
    pub sub_topics_by_super: BTreeMap<String, Vec<String>>,
    pub all_sub_topics: Vec<String>,
}

impl TopicCatalog {
    pub fn is_empty(&self) -> bool {
        self.super_topics.is_empty()
    }

    pub fn sub_topics_for(&self, super_topic: &str) -> &[String] {
        self.sub_topics_by_super
            .get(super_topic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Canonical spelling from `allowed` that matches `value` after folding, or
/// an empty string when nothing matches.
pub fn canonicalize<S: AsRef<str>>(value: &str, allowed: &[S]) -> String {
    let token = fold_token(value);
    if token.is_empty() {
        return String::new();
    }
    allowed
        .iter()
        .find(|entry| fold_token(entry.as_ref()) == token)
        .map(|entry| entry.as_ref().to_string())
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RejectedTopic {
    pub question_id: String,
    pub level: &'static str,
    pub value: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CanonicalizeReport {
    pub checked: usize,
    pub rejected: Vec<RejectedTopic>,
}

/// Snaps every question's topic parts onto the catalog spelling. Values the
/// catalog does not know are blanked and reported.
pub fn apply_catalog<'a>(
    questions: impl IntoIterator<Item = &'a mut Question>,
    catalog: &TopicCatalog,
) -> CanonicalizeReport {
    let mut report = CanonicalizeReport::default();

    for question in questions {
        report.checked += 1;

        let super_topic = canonicalize(&question.super_topic, &catalog.super_topics);
        if super_topic.is_empty() && !question.super_topic.is_empty() {
            report.rejected.push(RejectedTopic {
                question_id: question.id.clone(),
                level: "super",
                value: question.super_topic.clone(),
            });
        }

        let allowed_subs = if super_topic.is_empty() {
            catalog.all_sub_topics.as_slice()
        } else {
            catalog.sub_topics_for(&super_topic)
        };
        let sub_topic = canonicalize(&question.sub_topic, allowed_subs);
        if sub_topic.is_empty() && !question.sub_topic.is_empty() {
            report.rejected.push(RejectedTopic {
                question_id: question.id.clone(),
                level: "sub",
                value: question.sub_topic.clone(),
            });
        }

        question.set_topic_parts(&super_topic, &sub_topic);
    }

    for rejected in &report.rejected {
        warn!(
            id = %rejected.question_id,
            level = rejected.level,
            value = %rejected.value,
            "topic not found in catalog"
        );
    }

    report
}

/// Reads and parses a taxonomy file. A document without any super-topic is
/// treated as no catalog at all.
pub fn load_catalog(path: &Path) -> Result<Option<TopicCatalog>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let catalog = parse(&raw).with_context(|| format!("failed to parse {}", path.display()))?;

    if catalog.is_empty() {
        warn!(path = %path.display(), "taxonomy contains no recognizable topics");
        return Ok(None);
    }

    info!(
        path = %path.display(),
        super_topics = catalog.super_topics.len(),
        sub_topics = catalog.all_sub_topics.len(),
        "loaded topic catalog"
    );
    Ok(Some(catalog))
}

pub fn find_taxonomy_file(dir: &Path) -> Result<Option<PathBuf>> {
    let pattern =
        Regex::new(TAXONOMY_FILE_PATTERN).context("failed to compile taxonomy file regex")?;

    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }
    files.sort();

    for candidate in TAXONOMY_FILE_CANDIDATES {
        if let Some((_, path)) = files
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(candidate))
        {
            return Ok(Some(path.clone()));
        }
    }

    Ok(files
        .into_iter()
        .find(|(name, _)| pattern.is_match(name))
        .map(|(_, path)| path))
}
