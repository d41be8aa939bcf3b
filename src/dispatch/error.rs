use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown provider '{name}'. Available providers: {}", available.join(", "))]
    UnknownProvider { name: String, available: Vec<String> },

    #[error("Invalid config name '{0}': expected a bare name without path separators or extension")]
    InvalidConfigName(String),

    #[error(
        "Config file not found: {}\nAvailable configs for {provider}: {}",
        path.display(),
        available.join(", ")
    )]
    ConfigNotFound {
        path: PathBuf,
        provider: String,
        available: Vec<String>,
    },

    #[error("Parser entry point not found: {}", .0.display())]
    MissingEntryPoint(PathBuf),

    #[error("Failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
