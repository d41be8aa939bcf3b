use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::parse::backend_trait::{ParseBackend, ParsedDocument};
use crate::parse::docling_serve_config::DoclingServeConfig;
use crate::parse::error::JobError;

#[derive(Debug, Deserialize)]
struct TaskStatusResponse {
    task_id: String,
    #[serde(alias = "task_status")]
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Text fields checked in order; the first non-empty one becomes the output.
const CONTENT_FIELDS: &[&str] = &[
    "md_content",
    "markdown",
    "text_content",
    "text",
    "html_content",
    "html",
    "doctags_content",
];

/// Pull the document body out of a conversion response.
///
/// Accepts `{"document": {...}}`, `{"documents": [{...}]}` or a bare document.
/// Falls back to the pretty-printed response when no content field is set.
pub fn extract_markdown(response: &serde_json::Value) -> Result<String, JobError> {
    let document = response
        .get("document")
        .or_else(|| {
            response
                .get("documents")
                .and_then(|d| d.as_array())
                .and_then(|d| d.first())
        })
        .unwrap_or(response);

    let content = CONTENT_FIELDS
        .iter()
        .filter_map(|field| document.get(*field).and_then(|c| c.as_str()))
        .find(|content| !content.trim().is_empty());

    if let Some(content) = content {
        return Ok(content.to_string());
    }

    if let Some(json_content) = document.get("json_content").filter(|c| !c.is_null()) {
        return Ok(serde_json::to_string_pretty(json_content)?);
    }

    Ok(serde_json::to_string_pretty(response)?)
}

pub struct DoclingServeBackend {
    config: DoclingServeConfig,
    client: reqwest::Client,
}

impl DoclingServeBackend {
    pub fn new(config: DoclingServeConfig) -> Result<Self, JobError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { config, client })
    }

    fn authorized(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        request
    }

    async fn build_form(&self, path: &Path) -> Result<reqwest::multipart::Form, JobError> {
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let file_part = reqwest::multipart::Part::bytes(content)
            .file_name(filename)
            .mime_str(mime.as_ref())?;

        let mut form = reqwest::multipart::Form::new().part("files", file_part);
        for (key, value) in self.config.build_form_data() {
            form = form.text(key, value);
        }
        Ok(form)
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<serde_json::Value, JobError> {
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(JobError::InvalidResponse(format!(
                "{context} failed with {status}: {error_text}"
            )));
        }

        Ok(response.json().await?)
    }

    async fn convert_sync(&self, path: &Path) -> Result<serde_json::Value, JobError> {
        let form = self.build_form(path).await?;
        tracing::debug!("Uploading {} to {}", path.display(), self.config.get_convert_endpoint());

        let request = self
            .client
            .post(self.config.get_convert_endpoint())
            .multipart(form);
        self.send_json(request, "Conversion").await
    }

    async fn convert_async(&self, path: &Path) -> Result<(String, serde_json::Value), JobError> {
        let form = self.build_form(path).await?;
        let request = self
            .client
            .post(self.config.get_convert_endpoint())
            .multipart(form);
        let submitted: TaskStatusResponse =
            serde_json::from_value(self.send_json(request, "Task submission").await?)?;

        let task_id = submitted.task_id;
        tracing::debug!("Submitted {} as task {task_id}", path.display());

        let poll_interval = Duration::from_secs(self.config.poll_interval);
        for attempt in 1..=self.config.max_poll_attempts {
            let request = self.client.get(self.config.get_status_endpoint(&task_id));
            let status: TaskStatusResponse =
                serde_json::from_value(self.send_json(request, "Task status polling").await?)?;

            match status.status.as_str() {
                "success" | "completed" => {
                    let request = self.client.get(self.config.get_result_endpoint(&task_id));
                    let result = self.send_json(request, "Fetching task result").await?;
                    return Ok((task_id, result));
                }
                "failure" | "failed" => {
                    return Err(JobError::Failed(
                        status.error.unwrap_or_else(|| "Unknown error".to_string()),
                    ));
                }
                "pending" | "started" | "running" => {
                    if attempt % 5 == 0 {
                        tracing::debug!("Polling task {task_id} (attempt {attempt})");
                    }
                    tokio::time::sleep(poll_interval).await;
                }
                other => {
                    return Err(JobError::InvalidResponse(format!(
                        "Unknown task status: {other}"
                    )));
                }
            }
        }

        Err(JobError::TimeoutError)
    }
}

#[async_trait]
impl ParseBackend for DoclingServeBackend {
    fn name(&self) -> &str {
        "docling_serve"
    }

    fn effective_config(&self) -> serde_json::Value {
        self.config.to_saved_value()
    }

    async fn check_available(&self) -> Result<(), JobError> {
        let endpoint = self.config.get_health_endpoint();
        tracing::debug!("Checking docling-serve availability at: {endpoint}");

        let response = self
            .authorized(self.client.get(&endpoint))
            .send()
            .await
            .map_err(|_| {
                JobError::InvalidResponse(format!(
                    "Docling-serve is not available at {}. Please start the service or check the URL.",
                    self.config.base_url
                ))
            })?;

        if !response.status().is_success() {
            return Err(JobError::InvalidResponse(format!(
                "Docling-serve health check failed with status: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn parse_file(&self, path: &Path) -> Result<ParsedDocument, JobError> {
        let (task_id, response) = if self.config.use_async {
            let (task_id, response) = self.convert_async(path).await?;
            (Some(task_id), response)
        } else {
            (None, self.convert_sync(path).await?)
        };

        Ok(ParsedDocument::single(task_id, extract_markdown(&response)?))
    }
}
