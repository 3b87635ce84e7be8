use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::util::{read_json_file, write_json_pretty};

mod audit;
mod keys;
mod legacy_topic;
mod normalize;
mod overrides;
mod question;
mod sync;

pub use self::keys::{KeyDetector, KeyRole};
pub use self::legacy_topic::split_legacy_topic;
pub use self::normalize::normalize_record;
pub use self::question::{Answer, Question, Reason, RecordRef, answer_letter};
pub use self::sync::write_back;

pub const QUESTIONS_FIELD: &str = "questions";

#[derive(Debug, Clone)]
pub struct DatasetDocument {
    pub path: PathBuf,
    pub payload: Value,
}

impl DatasetDocument {
    pub fn new(path: impl Into<PathBuf>, payload: Value) -> Self {
        Self {
            path: path.into(),
            payload,
        }
    }

    /// Records live under `questions`, or the document itself is the list.
    pub fn records(&self) -> Option<&Vec<Value>> {
        match &self.payload {
            Value::Array(records) => Some(records),
            Value::Object(root) => root.get(QUESTIONS_FIELD).and_then(Value::as_array),
            _ => None,
        }
    }

    fn record_mut(&mut self, index: usize) -> Option<&mut Value> {
        let records = match &mut self.payload {
            Value::Array(records) => Some(records),
            Value::Object(root) => root.get_mut(QUESTIONS_FIELD).and_then(Value::as_array_mut),
            _ => None,
        }?;
        records.get_mut(index)
    }
}

#[derive(Debug, Clone)]
pub struct WrittenDocument {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub record_count: usize,
    pub sha256: String,
}

/// Owns every loaded raw document. Questions refer back into it through
/// [`RecordRef`] and only this type mutates the raw records.
#[derive(Debug, Default)]
pub struct Dataset {
    documents: Vec<DatasetDocument>,
}

impl Dataset {
    pub fn from_documents(documents: Vec<DatasetDocument>) -> Self {
        Self { documents }
    }

    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        if paths.is_empty() {
            bail!("no dataset documents given");
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let payload = read_json_file(path)?;
            let document = DatasetDocument::new(path.clone(), payload);
            match document.records() {
                Some(records) => info!(
                    path = %path.display(),
                    records = records.len(),
                    "loaded dataset document"
                ),
                None => warn!(
                    path = %path.display(),
                    field = QUESTIONS_FIELD,
                    "dataset document has no question array"
                ),
            }
            documents.push(document);
        }

        Ok(Self::from_documents(documents))
    }

    pub fn documents(&self) -> &[DatasetDocument] {
        &self.documents
    }

    pub fn normalize(&self, detector: &KeyDetector) -> QuestionSet {
        let mut set = QuestionSet::default();
        for (document_index, document) in self.documents.iter().enumerate() {
            let Some(records) = document.records() else {
                continue;
            };
            for (record_index, record) in records.iter().enumerate() {
                let location = RecordRef {
                    document: document_index,
                    record: record_index,
                };
                match normalize_record(record, location, detector) {
                    Some(question) => set.insert(question),
                    None => {
                        debug!(
                            document = document_index,
                            record = record_index,
                            "skipping record without usable id"
                        );
                        set.skipped_without_id += 1;
                    }
                }
            }
        }
        set
    }

    /// Detached questions and stale handles are ignored.
    pub fn sync_question(&mut self, question: &Question) -> bool {
        let Some(location) = question.source else {
            return false;
        };
        let Some(raw) = self
            .documents
            .get_mut(location.document)
            .and_then(|document| document.record_mut(location.record))
            .and_then(Value::as_object_mut)
        else {
            return false;
        };
        write_back(question, raw);
        true
    }

    pub fn sync_all(&mut self, questions: &QuestionSet) -> usize {
        questions
            .iter()
            .filter(|question| self.sync_question(question))
            .count()
    }

    pub fn write_to_dir(&self, output_dir: &Path) -> Result<Vec<WrittenDocument>> {
        let mut seen = HashMap::new();
        let mut targets = Vec::with_capacity(self.documents.len());
        for document in &self.documents {
            let file_name = document
                .path
                .file_name()
                .with_context(|| {
                    format!("dataset path has no file name: {}", document.path.display())
                })?;
            if let Some(previous) = seen.insert(file_name.to_owned(), document.path.clone()) {
                bail!(
                    "two dataset documents share the output name {}: {} and {}",
                    file_name.to_string_lossy(),
                    previous.display(),
                    document.path.display()
                );
            }
            targets.push(output_dir.join(file_name));
        }

        self.write_documents(targets)
    }

    pub fn write_in_place(&self) -> Result<Vec<WrittenDocument>> {
        let targets = self
            .documents
            .iter()
            .map(|document| document.path.clone())
            .collect();
        self.write_documents(targets)
    }

    fn write_documents(&self, targets: Vec<PathBuf>) -> Result<Vec<WrittenDocument>> {
        let mut written = Vec::with_capacity(targets.len());
        for (document, output_path) in self.documents.iter().zip(targets) {
            let sha256 = write_json_pretty(&output_path, &document.payload)?;
            info!(path = %output_path.display(), "wrote dataset document");
            written.push(WrittenDocument {
                source_path: document.path.clone(),
                output_path,
                record_count: document.records().map(Vec::len).unwrap_or(0),
                sha256,
            });
        }
        Ok(written)
    }
}

/// Canonical questions in load order. A later record with an already seen id
/// replaces the earlier question in its slot.
#[derive(Debug, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
    index: HashMap<String, usize>,
    pub skipped_without_id: usize,
    pub replaced_duplicates: usize,
}

impl QuestionSet {
    pub fn insert(&mut self, question: Question) {
        match self.index.entry(question.id.clone()) {
            Entry::Occupied(slot) => {
                debug!(id = %question.id, "duplicate question id replaces earlier record");
                self.questions[*slot.get()] = question;
                self.replaced_duplicates += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(self.questions.len());
                self.questions.push(question);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|slot| &self.questions[*slot])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Question> {
        let slot = *self.index.get(id)?;
        self.questions.get_mut(slot)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Question> {
        self.questions.iter_mut()
    }
}
