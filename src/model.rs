use std::collections::BTreeMap;

use serde::Serialize;

pub const EXPORT_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct ExportedDocument {
    pub source_path: String,
    pub output_path: String,
    pub record_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportCounts {
    pub document_count: usize,
    pub record_count: usize,
    pub question_count: usize,
    pub synced_count: usize,
    pub skipped_without_id: usize,
    pub replaced_duplicates: usize,
    pub rejected_topic_count: usize,
    pub edited_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportManifest {
    pub manifest_version: u32,
    pub command: String,
    pub started_at: String,
    pub generated_at: String,
    pub in_place: bool,
    pub catalog_path: Option<String>,
    pub counts: ExportCounts,
    pub documents: Vec<ExportedDocument>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrafficCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OverrideCounts {
    pub maintenance: usize,
    pub answer: usize,
    pub topic: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetSummary {
    pub document_count: usize,
    pub question_count: usize,
    pub skipped_without_id: usize,
    pub replaced_duplicates: usize,
    pub with_images: usize,
    pub needs_review: usize,
    pub manual_edited: usize,
    pub traffic: TrafficCounts,
    pub manual_overrides: OverrideCounts,
    pub exams: BTreeMap<String, usize>,
    pub super_topics: BTreeMap<String, usize>,
}
