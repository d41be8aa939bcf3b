use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::dispatch::error::DispatchError;

/// Environment variable that overrides the parsers root.
pub const PARSERS_DIR_ENV: &str = "PARSERS_DIR";

/// File every provider directory must contain to be picked up.
pub const ENTRY_POINT: &str = "parse";

const CONFIGS_DIR: &str = "configs";
const CONFIG_EXTENSION: &str = "json";

/// A provider directory found under the parsers root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub name: String,
    pub dir: PathBuf,
}

impl Provider {
    pub fn entry_point(&self) -> PathBuf {
        self.dir.join(ENTRY_POINT)
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.dir.join(CONFIGS_DIR)
    }
}

/// Directory convention: one subdirectory per provider, each exposing a
/// `parse` entry point and a `configs/` folder of named JSON files.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    root: PathBuf,
}

impl ProviderRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses `$PARSERS_DIR` when set, otherwise `./parsers`.
    pub fn from_env() -> Self {
        let root = std::env::var_os(PARSERS_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("parsers"));
        Self::new(root)
    }

    /// Sorted names of every provider directory under the root.
    pub fn providers(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            tracing::debug!(root = %self.root.display(), "parsers root is not readable");
            return Vec::new();
        };

        let mut providers: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with('_') && !name.starts_with('.'))
            .filter(|name| self.root.join(name).join(ENTRY_POINT).is_file())
            .collect();

        providers.sort();
        providers
    }

    pub fn provider(&self, name: &str) -> Result<Provider, DispatchError> {
        let available = self.providers();
        if !available.iter().any(|p| p == name) {
            return Err(DispatchError::UnknownProvider {
                name: name.to_string(),
                available,
            });
        }

        Ok(Provider {
            name: name.to_string(),
            dir: self.root.join(name),
        })
    }

    /// Sorted config names (file stems) available for a provider.
    pub fn configs(&self, provider: &str) -> Vec<String> {
        let provider = Provider {
            name: provider.to_string(),
            dir: self.root.join(provider),
        };
        let Ok(entries) = fs::read_dir(provider.configs_dir()) else {
            return Vec::new();
        };

        let mut configs: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == CONFIG_EXTENSION))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();

        configs.sort();
        configs
    }

    /// The path a config name maps to, whether or not it exists.
    pub fn config_path(&self, provider: &str, name: &str) -> Result<PathBuf, DispatchError> {
        if !is_bare_config_name(name) {
            return Err(DispatchError::InvalidConfigName(name.to_string()));
        }

        Ok(self
            .root
            .join(provider)
            .join(CONFIGS_DIR)
            .join(format!("{name}.{CONFIG_EXTENSION}")))
    }

    /// Resolve a config name to its file, failing when the file is missing.
    pub fn resolve_config(&self, provider: &str, name: &str) -> Result<PathBuf, DispatchError> {
        let path = self.config_path(provider, name)?;
        if !path.is_file() {
            return Err(DispatchError::ConfigNotFound {
                path,
                provider: provider.to_string(),
                available: self.configs(provider),
            });
        }
        Ok(path)
    }

    /// Epilog for `--help`: usage examples plus the providers found on disk.
    pub fn help_epilog(&self) -> String {
        let providers = self.providers();
        let listed = if providers.is_empty() {
            format!("(none found under {})", self.root.display())
        } else {
            providers.join(", ")
        };

        format!(
            "Examples:\n  \
             # Use llamaparse with a specific config\n  \
             parse llamaparse input_dir --config agent_openai_gpt41mini\n\n  \
             # Use llamaparse with fast_mode config and output suffix\n  \
             parse llamaparse input_dir --config fast_mode --output-suffix my_run\n\n  \
             # Options parse does not know are passed to the provider\n  \
             parse llamaparse input_dir --config fast_mode --poll-interval 5\n\n  \
             # List the configs of a provider\n  \
             parse docling_serve --list-configs\n\n\
             Available providers: {listed}"
        )
    }
}

/// A single plain file name without the `.json` extension.
fn is_bare_config_name(name: &str) -> bool {
    if name.contains('\\') || name.ends_with(".json") {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_provider(root: &Path, name: &str, configs: &[&str]) {
        let dir = root.join(name);
        fs::create_dir_all(dir.join(CONFIGS_DIR)).unwrap();
        fs::write(dir.join(ENTRY_POINT), "#!/bin/sh\n").unwrap();
        for config in configs {
            fs::write(dir.join(CONFIGS_DIR).join(format!("{config}.json")), "{}").unwrap();
        }
    }

    #[test]
    fn lists_only_provider_directories_with_entry_point() {
        let tmp = TempDir::new().unwrap();
        add_provider(tmp.path(), "reducto", &[]);
        add_provider(tmp.path(), "llamaparse", &[]);
        add_provider(tmp.path(), "_shared", &[]);
        add_provider(tmp.path(), ".cache", &[]);
        fs::create_dir_all(tmp.path().join("no_entry")).unwrap();
        fs::write(tmp.path().join("README.md"), "").unwrap();

        let registry = ProviderRegistry::new(tmp.path());
        assert_eq!(registry.providers(), vec!["llamaparse", "reducto"]);
    }

    #[test]
    fn missing_root_has_no_providers() {
        let registry = ProviderRegistry::new("/definitely/not/here");
        assert!(registry.providers().is_empty());
        assert!(registry.configs("llamaparse").is_empty());
    }

    #[test]
    fn unknown_provider_lists_alternatives() {
        let tmp = TempDir::new().unwrap();
        add_provider(tmp.path(), "llamaparse", &[]);

        let registry = ProviderRegistry::new(tmp.path());
        let err = registry.provider("reducto").unwrap_err();
        assert!(matches!(err, DispatchError::UnknownProvider { .. }));
        assert_eq!(
            err.to_string(),
            "Unknown provider 'reducto'. Available providers: llamaparse"
        );
    }

    #[test]
    fn configs_are_sorted_json_stems() {
        let tmp = TempDir::new().unwrap();
        add_provider(tmp.path(), "llamaparse", &["fast_mode", "agent_openai_gpt41mini"]);
        let configs_dir = tmp.path().join("llamaparse").join(CONFIGS_DIR);
        fs::write(configs_dir.join("notes.txt"), "").unwrap();

        let registry = ProviderRegistry::new(tmp.path());
        assert_eq!(
            registry.configs("llamaparse"),
            vec!["agent_openai_gpt41mini", "fast_mode"]
        );
    }

    #[test]
    fn config_name_maps_to_fixed_path() {
        let tmp = TempDir::new().unwrap();
        add_provider(tmp.path(), "llamaparse", &["fast_mode"]);

        let registry = ProviderRegistry::new(tmp.path());
        let resolved = registry.resolve_config("llamaparse", "fast_mode").unwrap();
        assert_eq!(
            resolved,
            tmp.path().join("llamaparse").join("configs").join("fast_mode.json")
        );
    }

    #[test]
    fn missing_config_reports_path_and_alternatives() {
        let tmp = TempDir::new().unwrap();
        add_provider(tmp.path(), "llamaparse", &["fast_mode"]);

        let registry = ProviderRegistry::new(tmp.path());
        let err = registry.resolve_config("llamaparse", "slow_mode").unwrap_err();
        match &err {
            DispatchError::ConfigNotFound { path, available, .. } => {
                assert!(path.ends_with("llamaparse/configs/slow_mode.json"));
                assert_eq!(available, &vec!["fast_mode".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("Config file not found: "));
        assert!(err.to_string().contains("Available configs for llamaparse: fast_mode"));
    }

    #[test]
    fn rejects_names_that_escape_configs_dir() {
        let registry = ProviderRegistry::new("parsers");
        for name in ["../secrets", "..", ".", "a/b", "/etc/passwd", "a\\b", "fast_mode.json", ""] {
            assert!(matches!(
                registry.config_path("llamaparse", name),
                Err(DispatchError::InvalidConfigName(_))
            ));
        }
    }

    #[test]
    fn dots_inside_a_name_are_allowed() {
        let registry = ProviderRegistry::new("parsers");
        assert_eq!(
            registry.config_path("llamaparse", "v1..2").unwrap(),
            Path::new("parsers/llamaparse/configs/v1..2.json")
        );
    }

    #[test]
    fn help_epilog_names_every_provider() {
        let tmp = TempDir::new().unwrap();
        add_provider(tmp.path(), "llamaparse", &[]);
        add_provider(tmp.path(), "docling_serve", &[]);

        let registry = ProviderRegistry::new(tmp.path());
        assert!(
            registry
                .help_epilog()
                .ends_with("Available providers: docling_serve, llamaparse")
        );
    }
}
