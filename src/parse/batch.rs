use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::parse::backend_trait::ParseBackend;
use crate::parse::error::JobError;
use crate::parse::run_dir::{write_document, RunDirectory};

/// A file that was parsed and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub output_path: PathBuf,
    pub job_id: Option<String>,
    pub page_count: usize,
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub index: usize,
    pub file_path: PathBuf,
    pub elapsed: Duration,
    pub result: Result<ParsedFile, String>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub total_files: usize,
    pub outcomes: Vec<FileOutcome>,
    /// Tasks that panicked and produced no outcome.
    pub exceptions: usize,
    pub total_elapsed: Duration,
}

impl BatchReport {
    pub fn successful(&self) -> impl Iterator<Item = (&FileOutcome, &ParsedFile)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().map(|parsed| (outcome, parsed)))
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn average_success_time(&self) -> Option<Duration> {
        let times: Vec<Duration> = self.successful().map(|(outcome, _)| outcome.elapsed).collect();
        if times.is_empty() {
            return None;
        }
        Some(times.iter().sum::<Duration>() / times.len() as u32)
    }

    pub fn total_pages(&self) -> usize {
        self.successful().map(|(_, parsed)| parsed.page_count).sum()
    }

    pub fn summary(&self) -> String {
        let rule = "=".repeat(60);
        let mut lines = vec![
            String::new(),
            rule.clone(),
            "Parallel Parsing Complete!".to_string(),
            rule,
            format!("Total time: {:.2}s", self.total_elapsed.as_secs_f64()),
            format!("Successful: {}/{}", self.successful().count(), self.total_files),
            format!("Failed: {}/{}", self.failed().count(), self.total_files),
            format!("Exceptions: {}/{}", self.exceptions, self.total_files),
        ];

        if let Some(avg) = self.average_success_time() {
            lines.push(format!("Average parse time: {:.2}s", avg.as_secs_f64()));
            lines.push(format!("Total pages extracted: {}", self.total_pages()));
        }

        lines.join("\n")
    }
}

/// Parse every file with at most `concurrency` requests in flight.
///
/// A failing file is recorded in the report and never stops the others.
pub async fn parse_files_parallel(
    backend: Arc<dyn ParseBackend>,
    files: Vec<PathBuf>,
    run_dir: &RunDirectory,
    base_dir: Option<&Path>,
    concurrency: usize,
) -> BatchReport {
    let total_files = files.len();
    tracing::info!("Starting parallel parsing of {total_files} files...");
    let start = Instant::now();

    for (output, inputs) in run_dir.output_collisions(&files, base_dir) {
        let inputs: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
        tracing::warn!(
            "{} inputs write to {}; only one result will be kept: {}",
            inputs.len(),
            output.display(),
            inputs.join(", ")
        );
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(total_files);

    for (i, file_path) in files.into_iter().enumerate() {
        let index = i + 1;
        let semaphore = Arc::clone(&semaphore);
        let backend = Arc::clone(&backend);
        let output_path = run_dir.output_path_for(&file_path, base_dir);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            parse_single_file(backend.as_ref(), index, file_path, output_path).await
        }));
    }

    let mut report = BatchReport {
        total_files,
        ..Default::default()
    };

    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => {
                tracing::error!("Parse task aborted: {e}");
                report.exceptions += 1;
            }
        }
    }

    report.total_elapsed = start.elapsed();
    report
}

async fn parse_single_file(
    backend: &dyn ParseBackend,
    index: usize,
    file_path: PathBuf,
    output_path: PathBuf,
) -> FileOutcome {
    tracing::info!("[{index}] Starting parse: {}", file_path.display());
    let start = Instant::now();

    let result = parse_and_write(backend, &file_path, &output_path).await;
    let elapsed = start.elapsed();

    match &result {
        Ok(parsed) => tracing::info!(
            "[{index}] Completed: {} ({:.2}s, {} pages) -> {}",
            file_path.display(),
            elapsed.as_secs_f64(),
            parsed.page_count,
            parsed.output_path.display()
        ),
        Err(e) => tracing::warn!(
            "[{index}] Failed: {} - {e} ({:.2}s)",
            file_path.display(),
            elapsed.as_secs_f64()
        ),
    }

    FileOutcome {
        index,
        file_path,
        elapsed,
        result: result.map_err(|e| e.to_string()),
    }
}

async fn parse_and_write(
    backend: &dyn ParseBackend,
    file_path: &Path,
    output_path: &Path,
) -> Result<ParsedFile, JobError> {
    if !file_path.exists() {
        return Err(JobError::InvalidResponse(format!(
            "File not found: {}",
            file_path.display()
        )));
    }

    let document = backend.parse_file(file_path).await?;
    write_document(output_path, &document)?;

    Ok(ParsedFile {
        output_path: output_path.to_path_buf(),
        job_id: document.job_id.clone(),
        page_count: document.page_count(),
    })
}
