use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::parse::backend_trait::{ParseBackend, ParsedDocument};
use crate::parse::error::JobError;
use crate::parse::llamaparse_config::{LlamaCloudSettings, LlamaParseConfig, API_KEY_ENV};

#[derive(Debug, Deserialize)]
struct JobResponse {
    id: String,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonResult {
    #[serde(default)]
    pages: Vec<PageResult>,
}

#[derive(Debug, Deserialize)]
struct PageResult {
    #[serde(default)]
    md: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum JobState {
    Done,
    Pending,
    Failed(String),
}

fn job_state(job: &JobResponse) -> JobState {
    match job.status.as_str() {
        "SUCCESS" | "PARTIAL_SUCCESS" => JobState::Done,
        "PENDING" | "RUNNING" => JobState::Pending,
        "ERROR" | "CANCELED" | "CANCELLED" => JobState::Failed(
            job.error_message
                .clone()
                .unwrap_or_else(|| format!("job {} ended with status {}", job.id, job.status)),
        ),
        other => JobState::Failed(format!("Unknown job status: {other}")),
    }
}

/// Markdown for each page, falling back to plain text when a page has none.
fn page_markdown(result: JsonResult) -> Vec<String> {
    result
        .pages
        .into_iter()
        .map(|page| page.md.or(page.text).unwrap_or_default())
        .collect()
}

pub struct LlamaParseBackend {
    config: LlamaParseConfig,
    settings: LlamaCloudSettings,
    client: reqwest::Client,
    poll_interval: Duration,
    max_poll_attempts: usize,
}

impl LlamaParseBackend {
    pub fn new(
        config: LlamaParseConfig,
        settings: Option<LlamaCloudSettings>,
        poll_interval: Duration,
        max_poll_attempts: usize,
    ) -> Result<Self, JobError> {
        let settings = settings.ok_or(JobError::MissingCredentials(API_KEY_ENV))?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config,
            settings,
            client,
            poll_interval,
            max_poll_attempts,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.settings.api_key)
    }

    async fn upload(&self, path: &Path) -> Result<String, JobError> {
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("input.pdf")
            .to_string();
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let file_part = reqwest::multipart::Part::bytes(content)
            .file_name(filename)
            .mime_str(mime.as_ref())?;
        let mut form = reqwest::multipart::Form::new().part("file", file_part);
        for (key, value) in self.config.build_form_data() {
            form = form.text(key, value);
        }

        let response = self
            .authorized(self.client.post(self.settings.upload_endpoint()))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(JobError::InvalidResponse(format!(
                "LlamaParse upload failed with {status}: {error_text}"
            )));
        }

        let job: JobResponse = response.json().await?;
        Ok(job.id)
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<(), JobError> {
        for attempt in 1..=self.max_poll_attempts {
            let response = self
                .authorized(self.client.get(self.settings.job_endpoint(job_id)))
                .send()
                .await?;

            if !response.status().is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(JobError::InvalidResponse(format!(
                    "Job status polling failed: {error_text}"
                )));
            }

            let job: JobResponse = response.json().await?;
            match job_state(&job) {
                JobState::Done => return Ok(()),
                JobState::Failed(message) => return Err(JobError::Failed(message)),
                JobState::Pending => {
                    if attempt % 10 == 0 {
                        tracing::debug!("Polling job {job_id} (attempt {attempt})");
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        Err(JobError::TimeoutError)
    }

    async fn fetch_pages(&self, job_id: &str) -> Result<Vec<String>, JobError> {
        let response = self
            .authorized(self.client.get(self.settings.result_endpoint(job_id)))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(JobError::InvalidResponse(format!(
                "Failed to get job result: {error_text}"
            )));
        }

        let result: JsonResult = response.json().await?;
        Ok(page_markdown(result))
    }
}

#[async_trait]
impl ParseBackend for LlamaParseBackend {
    fn name(&self) -> &str {
        "llamaparse"
    }

    fn effective_config(&self) -> serde_json::Value {
        self.config.to_value()
    }

    async fn parse_file(&self, path: &Path) -> Result<ParsedDocument, JobError> {
        let job_id = self.upload(path).await?;
        tracing::debug!("Submitted {} as job {job_id}", path.display());

        self.wait_for_job(&job_id).await?;
        let pages = self.fetch_pages(&job_id).await?;

        Ok(ParsedDocument {
            job_id: Some(job_id),
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: &str, error_message: Option<&str>) -> JobResponse {
        JobResponse {
            id: "job-1".to_string(),
            status: status.to_string(),
            error_message: error_message.map(str::to_string),
        }
    }

    #[test]
    fn maps_job_statuses() {
        assert_eq!(job_state(&job("SUCCESS", None)), JobState::Done);
        assert_eq!(job_state(&job("PENDING", None)), JobState::Pending);
        assert_eq!(
            job_state(&job("ERROR", Some("bad pdf"))),
            JobState::Failed("bad pdf".to_string())
        );
        assert_eq!(
            job_state(&job("CANCELED", None)),
            JobState::Failed("job job-1 ended with status CANCELED".to_string())
        );
        assert!(matches!(job_state(&job("WEIRD", None)), JobState::Failed(_)));
    }

    #[test]
    fn pages_prefer_markdown_over_text() {
        let result: JsonResult = serde_json::from_str(
            r##"{
                "pages": [
                    {"page": 1, "md": "# Title", "text": "Title"},
                    {"page": 2, "text": "plain only"},
                    {"page": 3}
                ],
                "job_metadata": {"credits_used": 3}
            }"##,
        )
        .unwrap();

        assert_eq!(page_markdown(result), vec!["# Title", "plain only", ""]);
    }

    #[test]
    fn requires_api_key() {
        let err = LlamaParseBackend::new(
            LlamaParseConfig::default(),
            None,
            Duration::from_secs(1),
            1,
        )
        .err()
        .unwrap();
        assert!(matches!(err, JobError::MissingCredentials(API_KEY_ENV)));
    }
}
