use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use parsers::parse::{run_provider, LlamaCloudSettings};
use parsers::{LlamaParseBackend, LlamaParseConfig, ProviderArgs};

#[derive(Parser, Debug)]
#[command(version, about = "Parse multiple files in parallel using LlamaParse", long_about = None)]
struct Args {
    #[command(flatten)]
    common: ProviderArgs,

    /// Seconds between job status polls
    #[arg(long, default_value_t = 2)]
    poll_interval: u64,

    /// Give up on a job after this many polls
    #[arg(long, default_value_t = 900)]
    max_poll_attempts: usize,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    parsers::logging::init(args.common.verbose);

    let config = LlamaParseConfig::load(args.common.config.as_deref())?;
    let backend = LlamaParseBackend::new(
        config,
        LlamaCloudSettings::from_env(),
        Duration::from_secs(args.poll_interval),
        args.max_poll_attempts,
    )?;

    let report = run_provider(&args.common, Arc::new(backend)).await?;
    let any_failed = report.is_some_and(|r| r.failed().count() + r.exceptions > 0);

    Ok(if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
