use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::parse::backend_trait::ParseBackend;
use crate::parse::batch::{parse_files_parallel, BatchReport};
use crate::parse::inputs::InputSet;
use crate::parse::run_dir::RunDirectory;

/// Flags shared by every provider binary.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// File containing input paths (one per line) OR a directory to search
    pub input: PathBuf,

    /// Name recorded in `_parse_config.json`
    #[arg(long)]
    pub parser_name: Option<String>,

    /// Path to a JSON config file. Uses the provider defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Allowed file extensions, e.g. --extensions .pdf .docx
    #[arg(long, num_args = 1.., default_values_t = [String::from(".pdf")])]
    pub extensions: Vec<String>,

    /// Suffix for the run directory: <output-root>/<YYYYMMDD_HHMMSS>_<suffix>/
    #[arg(long)]
    pub output_suffix: Option<String>,

    /// Search subdirectories and mirror their layout in the output
    #[arg(short, long)]
    pub recursive: bool,

    /// Directory that receives timestamped run directories
    #[arg(long, default_value = "runs")]
    pub output_root: PathBuf,

    /// Maximum number of documents parsed at once
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Verbose output while parsing
    #[arg(short, long)]
    pub verbose: bool,
}

/// Discover inputs, create the run directory, and parse everything with `backend`.
///
/// Returns `None` when nothing matched the input filters.
pub async fn run_provider(
    args: &ProviderArgs,
    backend: Arc<dyn ParseBackend>,
) -> anyhow::Result<Option<BatchReport>> {
    let inputs = InputSet::discover(&args.input, &args.extensions, args.recursive)?;
    if inputs.files.is_empty() {
        println!("No files to process after filtering.");
        return Ok(None);
    }

    backend.check_available().await?;

    let run_dir = RunDirectory::create(&args.output_root, args.output_suffix.as_deref())?;
    println!("Output directory: {}", run_dir.path().display());

    let parser_name = args
        .parser_name
        .clone()
        .unwrap_or_else(|| backend.name().to_string());
    let config = backend.effective_config();
    let saved = run_dir.save_parse_config(&parser_name, &config)?;
    println!("Saved parse config to: {}", saved.display());
    println!("  Parser: {parser_name}");
    if let Some(mode) = config.get("parse_mode").and_then(|m| m.as_str()) {
        println!("  Parse mode: {mode}");
    }

    let report = parse_files_parallel(
        backend,
        inputs.files,
        &run_dir,
        inputs.base_dir.as_deref(),
        args.concurrency,
    )
    .await;

    println!("{}", report.summary());
    for (outcome, parsed) in report.successful() {
        println!("\nFile: {}", outcome.file_path.display());
        println!("  Output: {}", parsed.output_path.display());
        if let Some(ref job_id) = parsed.job_id {
            println!("  Job ID: {job_id}");
        }
        println!("  Pages: {}", parsed.page_count);
        println!("  Time: {:.2}s", outcome.elapsed.as_secs_f64());
    }

    Ok(Some(report))
}
