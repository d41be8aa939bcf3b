use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("File list not found: {}", .0.display())]
    FileListNotFound(PathBuf),

    #[error("Input directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Input '{}' is neither a file nor a directory", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Case-insensitive suffix match against any of the allowed extensions.
pub fn matches_extension(name: &str, extensions: &[String]) -> bool {
    let name = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}

/// Read a file list (one path per line, `#` comments) and keep matching paths.
pub fn load_file_paths(file_list: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, InputError> {
    if !file_list.exists() {
        return Err(InputError::FileListNotFound(file_list.to_path_buf()));
    }

    let contents = fs::read_to_string(file_list)?;
    let listed: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let filtered: Vec<PathBuf> = listed
        .iter()
        .filter(|line| matches_extension(line, extensions))
        .map(|line| PathBuf::from(*line))
        .collect();

    tracing::info!(
        "Loaded {} file paths, {} match extensions {:?}",
        listed.len(),
        filtered.len(),
        extensions
    );
    Ok(filtered)
}

/// Find files in a directory whose names match the extensions.
pub fn find_files_in_dir(
    input_dir: &Path,
    extensions: &[String],
    recursive: bool,
) -> Result<Vec<PathBuf>, InputError> {
    if !input_dir.exists() {
        return Err(InputError::DirectoryNotFound(input_dir.to_path_buf()));
    }
    if !input_dir.is_dir() {
        return Err(InputError::NotADirectory(input_dir.to_path_buf()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut file_paths = Vec::new();
    for entry in WalkDir::new(input_dir).min_depth(1).max_depth(max_depth) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matches_extension(&entry.file_name().to_string_lossy(), extensions) {
            file_paths.push(entry.into_path());
        }
    }
    file_paths.sort();

    let search_type = if recursive { "recursively" } else { "in" };
    tracing::info!(
        "Found {} files matching extensions {:?} {} {}",
        file_paths.len(),
        extensions,
        search_type,
        input_dir.display()
    );
    Ok(file_paths)
}

/// Files selected for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSet {
    pub files: Vec<PathBuf>,
    /// Set for recursive directory input; outputs mirror paths relative to it.
    pub base_dir: Option<PathBuf>,
}

impl InputSet {
    /// A regular file is read as a file list; a directory is searched.
    pub fn discover(input: &Path, extensions: &[String], recursive: bool) -> Result<Self, InputError> {
        if input.is_file() {
            Ok(Self {
                files: load_file_paths(input, extensions)?,
                base_dir: None,
            })
        } else if input.is_dir() {
            Ok(Self {
                files: find_files_in_dir(input, extensions, recursive)?,
                base_dir: recursive.then(|| input.to_path_buf()),
            })
        } else {
            Err(InputError::NotFound(input.to_path_buf()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|e| e.to_string()).collect()
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(matches_extension("Report.PDF", &exts(&[".pdf"])));
        assert!(matches_extension("slides.pptx", &exts(&[".pdf", ".PPTX"])));
        assert!(!matches_extension("notes.txt", &exts(&[".pdf"])));
    }

    #[test]
    fn file_list_skips_comments_and_blank_lines() {
        let tmp = TempDir::new().unwrap();
        let list = tmp.path().join("files.txt");
        fs::write(
            &list,
            "# benchmark set\n/data/a.pdf\n\n  /data/b.PDF  \n/data/c.docx\n#/data/d.pdf\n",
        )
        .unwrap();

        let files = load_file_paths(&list, &exts(&[".pdf"])).unwrap();
        assert_eq!(files, vec![PathBuf::from("/data/a.pdf"), PathBuf::from("/data/b.PDF")]);
    }

    #[test]
    fn missing_file_list_is_reported() {
        let err = load_file_paths(Path::new("/no/such/list.txt"), &exts(&[".pdf"])).unwrap_err();
        assert!(matches!(err, InputError::FileListNotFound(_)));
    }

    #[test]
    fn directory_search_respects_recursion() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a.pdf"));
        touch(&tmp.path().join("b.txt"));
        touch(&tmp.path().join("nested/c.pdf"));
        touch(&tmp.path().join("nested/deeper/d.PDF"));

        let flat = find_files_in_dir(tmp.path(), &exts(&[".pdf"]), false).unwrap();
        assert_eq!(flat, vec![tmp.path().join("a.pdf")]);

        let deep = find_files_in_dir(tmp.path(), &exts(&[".pdf"]), true).unwrap();
        assert_eq!(
            deep,
            vec![
                tmp.path().join("a.pdf"),
                tmp.path().join("nested/c.pdf"),
                tmp.path().join("nested/deeper/d.PDF"),
            ]
        );
    }

    #[test]
    fn directory_search_rejects_files() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.pdf");
        touch(&file);

        assert!(matches!(
            find_files_in_dir(&file, &exts(&[".pdf"]), false),
            Err(InputError::NotADirectory(_))
        ));
        assert!(matches!(
            find_files_in_dir(&tmp.path().join("missing"), &exts(&[".pdf"]), false),
            Err(InputError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn discover_keeps_base_dir_only_for_recursive_runs() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("nested/c.pdf"));

        let flat = InputSet::discover(tmp.path(), &exts(&[".pdf"]), false).unwrap();
        assert!(flat.files.is_empty());
        assert_eq!(flat.base_dir, None);

        let deep = InputSet::discover(tmp.path(), &exts(&[".pdf"]), true).unwrap();
        assert_eq!(deep.files.len(), 1);
        assert_eq!(deep.base_dir.as_deref(), Some(tmp.path()));

        assert!(matches!(
            InputSet::discover(&tmp.path().join("nope"), &exts(&[".pdf"]), true),
            Err(InputError::NotFound(_))
        ));
    }
}
