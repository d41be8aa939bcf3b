use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser};

use parsers::{CommonOptions, Invocation, ProviderRegistry, split_known_args};

#[derive(Parser, Debug)]
#[command(version, about = "Run a document parsing provider with a named config", long_about = None)]
struct Args {
    /// Provider to use (a directory under $PARSERS_DIR, default ./parsers)
    provider: String,

    /// Input file or directory to parse
    #[arg(required_unless_present = "list_configs")]
    input: Option<String>,

    /// Config name without .json, looked up in parsers/<provider>/configs/<config>.json
    #[arg(long)]
    config: Option<String>,

    /// List available configs for the provider
    #[arg(long)]
    list_configs: bool,

    /// Suffix for the run output directory
    #[arg(long)]
    output_suffix: Option<String>,

    /// Allowed file extensions, e.g. --extensions .pdf .docx
    #[arg(long, num_args = 1..)]
    extensions: Vec<String>,

    /// Recursively search for files in subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Verbose output while parsing
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let registry = ProviderRegistry::from_env();
    let command = Args::command()
        .override_usage("parse <PROVIDER> <INPUT> [OPTIONS] [PROVIDER ARGS]...")
        .after_help(registry.help_epilog());

    // Anything the dispatcher does not recognise belongs to the provider
    let (known, provider_args) = split_known_args(&command, std::env::args_os());
    let matches = command.get_matches_from(known);
    let args = Args::from_arg_matches(&matches)?;

    parsers::logging::init(args.verbose);

    let provider = registry.provider(&args.provider)?;

    if args.list_configs {
        let configs = registry.configs(&provider.name);
        if configs.is_empty() {
            println!("No configs found for {}", provider.name);
        } else {
            println!("Available configs for {}:", provider.name);
            for config in configs {
                println!("  - {config}");
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = args
        .config
        .as_deref()
        .map(|name| registry.resolve_config(&provider.name, name))
        .transpose()?;

    let Some(input) = args.input else {
        anyhow::bail!("An input file or directory is required");
    };

    let options = CommonOptions {
        config,
        output_suffix: args.output_suffix,
        extensions: args.extensions,
        recursive: args.recursive,
        verbose: args.verbose,
    };
    let invocation = Invocation::build(&provider, &input, &options, &provider_args);

    println!("Running: {}", invocation.display());
    println!("{}", "=".repeat(60));

    let code = invocation.run().await?;
    tracing::debug!(code, "provider finished");

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
