use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use parsers::parse::run_provider;
use parsers::{DoclingServeBackend, DoclingServeConfig, ProviderArgs};

#[derive(Parser, Debug)]
#[command(version, about = "Parse multiple files in parallel using a docling-serve instance", long_about = None)]
struct Args {
    #[command(flatten)]
    common: ProviderArgs,

    /// Override the service URL from the config file
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    parsers::logging::init(args.common.verbose);

    let mut config = DoclingServeConfig::load(args.common.config.as_deref())?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    let backend = DoclingServeBackend::new(config)?;
    let report = run_provider(&args.common, Arc::new(backend)).await?;
    let any_failed = report.is_some_and(|r| r.failed().count() + r.exceptions > 0);

    Ok(if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
