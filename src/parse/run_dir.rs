use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::parse::backend_trait::ParsedDocument;
use crate::parse::error::JobError;

pub const PARSE_CONFIG_FILE: &str = "_parse_config.json";

#[derive(Debug, Serialize)]
struct SavedParseConfig<'a> {
    parser: &'a str,
    config: &'a serde_json::Value,
}

/// Timestamped output directory for one provider invocation.
#[derive(Debug, Clone)]
pub struct RunDirectory {
    path: PathBuf,
}

impl RunDirectory {
    /// Create `<output_root>/<YYYYMMDD_HHMMSS>[_<suffix>]`.
    pub fn create(output_root: &Path, suffix: Option<&str>) -> std::io::Result<Self> {
        Self::create_at(output_root, suffix, Local::now())
    }

    pub fn create_at(
        output_root: &Path,
        suffix: Option<&str>,
        now: DateTime<Local>,
    ) -> std::io::Result<Self> {
        let timestamp = now.format("%Y%m%d_%H%M%S").to_string();
        let name = match suffix {
            Some(suffix) if !suffix.is_empty() => format!("{timestamp}_{suffix}"),
            _ => timestamp,
        };

        let path = output_root.join(name);
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the markdown for `file` goes; mirrors its directory under `base_dir` when given.
    pub fn output_path_for(&self, file: &Path, base_dir: Option<&Path>) -> PathBuf {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let filename = format!("{stem}.md");

        let rel_dir = base_dir
            .and_then(|base| file.strip_prefix(base).ok())
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty());

        match rel_dir {
            Some(dir) => self.path.join(dir).join(filename),
            None => self.path.join(filename),
        }
    }

    /// Output paths claimed by more than one input, with the inputs that claim them.
    pub fn output_collisions(
        &self,
        files: &[PathBuf],
        base_dir: Option<&Path>,
    ) -> Vec<(PathBuf, Vec<PathBuf>)> {
        let mut claims: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for file in files {
            claims
                .entry(self.output_path_for(file, base_dir))
                .or_default()
                .push(file.clone());
        }
        claims
            .into_iter()
            .filter(|(_, inputs)| inputs.len() > 1)
            .collect()
    }

    pub fn save_parse_config(
        &self,
        parser: &str,
        config: &serde_json::Value,
    ) -> Result<PathBuf, JobError> {
        let saved = SavedParseConfig { parser, config };
        let path = self.path.join(PARSE_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(&saved)?)?;
        Ok(path)
    }
}

/// Write every page followed by a blank line.
pub fn write_document(path: &Path, document: &ParsedDocument) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut content = String::new();
    for page in &document.pages {
        content.push_str(page);
        content.push_str("\n\n");
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap()
    }

    #[test]
    fn run_directory_name_includes_suffix() {
        let tmp = TempDir::new().unwrap();

        let plain = RunDirectory::create_at(tmp.path(), None, fixed_time()).unwrap();
        assert_eq!(plain.path(), tmp.path().join("20250307_140509"));
        assert!(plain.path().is_dir());

        let named = RunDirectory::create_at(tmp.path(), Some("my_run"), fixed_time()).unwrap();
        assert_eq!(named.path(), tmp.path().join("20250307_140509_my_run"));
    }

    #[test]
    fn output_paths_mirror_relative_directories() {
        let tmp = TempDir::new().unwrap();
        let run = RunDirectory::create_at(tmp.path(), None, fixed_time()).unwrap();
        let base = Path::new("/corpus");

        assert_eq!(
            run.output_path_for(Path::new("/corpus/tables/q3/report.pdf"), Some(base)),
            run.path().join("tables/q3/report.md")
        );
        assert_eq!(
            run.output_path_for(Path::new("/corpus/top.pdf"), Some(base)),
            run.path().join("top.md")
        );
        assert_eq!(
            run.output_path_for(Path::new("/elsewhere/x/report.pdf"), None),
            run.path().join("report.md")
        );
    }

    #[test]
    fn inputs_sharing_a_stem_collide() {
        let tmp = TempDir::new().unwrap();
        let run = RunDirectory::create_at(tmp.path(), None, fixed_time()).unwrap();
        let files = vec![
            PathBuf::from("/x/a.pdf"),
            PathBuf::from("/y/a.pdf"),
            PathBuf::from("/x/a.docx"),
            PathBuf::from("/x/b.pdf"),
        ];

        let collisions = run.output_collisions(&files, None);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].0, run.path().join("a.md"));
        assert_eq!(collisions[0].1, files[..3].to_vec());

        // Mirrored directories keep same-named files apart
        let base = Path::new("/");
        assert!(run.output_collisions(&files[..2], Some(base)).is_empty());
    }

    #[test]
    fn saves_parser_and_config() {
        let tmp = TempDir::new().unwrap();
        let run = RunDirectory::create_at(tmp.path(), None, fixed_time()).unwrap();
        let config = serde_json::json!({ "parse_mode": "parse_page_with_agent" });

        let path = run.save_parse_config("llamaparse", &config).unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(saved["parser"], "llamaparse");
        assert_eq!(saved["config"]["parse_mode"], "parse_page_with_agent");
    }

    #[test]
    fn pages_are_separated_by_blank_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/doc.md");
        let document = ParsedDocument {
            job_id: Some("job-1".to_string()),
            pages: vec!["# Page 1".to_string(), "Body".to_string()],
        };

        write_document(&path, &document).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "# Page 1\n\nBody\n\n");
    }
}
