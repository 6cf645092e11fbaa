use serde::Serialize;

/// Per-file outcome of an upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Indexed { pages: usize, chunks: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub files: Vec<FileReport>,
}

impl UploadReport {
    pub fn indexed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Indexed { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.len() - self.indexed_count()
    }

    pub fn total_chunks(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                FileOutcome::Indexed { chunks, .. } => chunks,
                FileOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    /// One-line confirmation shown after the batch.
    pub fn summary(&self) -> String {
        match (self.indexed_count(), self.failed_count()) {
            (0, failed) => format!("No resumes were indexed ({failed} failed)."),
            (indexed, 0) => format!(
                "Resumes indexed successfully! {indexed} file(s), {} chunks.",
                self.total_chunks()
            ),
            (indexed, failed) => format!(
                "Indexed {indexed} file(s) ({} chunks); {failed} failed.",
                self.total_chunks()
            ),
        }
    }
}
