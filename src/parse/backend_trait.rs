use std::path::Path;

use async_trait::async_trait;

use crate::parse::error::JobError;

/// Markdown produced for one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub job_id: Option<String>,
    pub pages: Vec<String>,
}

impl ParsedDocument {
    pub fn single(job_id: Option<String>, markdown: String) -> Self {
        Self {
            job_id,
            pages: vec![markdown],
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A remote service able to turn one document into markdown.
#[async_trait]
pub trait ParseBackend: Send + Sync {
    fn name(&self) -> &str;

    /// The parameters this backend sends, as saved next to the run outputs.
    fn effective_config(&self) -> serde_json::Value;

    /// Fail fast before a batch when the service is unreachable or misconfigured.
    async fn check_available(&self) -> Result<(), JobError> {
        Ok(())
    }

    async fn parse_file(&self, path: &Path) -> Result<ParsedDocument, JobError>;
}
