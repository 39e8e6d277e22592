use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{ConversionConfig, ConversionRequest};
use crate::utils::has_valid_extension;

/// Extensions accepted as HEIC/HEIF input (compared case-insensitively)
pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// File input without a HEIC/HEIF extension
    NotHeif,
    /// Path does not exist or is neither file nor directory
    Missing,
    /// Directory without any HEIC/HEIF file
    NoHeifInDirectory,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::NotHeif => "not a HEIC/HEIF file",
            SkipReason::Missing => "path does not exist",
            SkipReason::NoHeifInDirectory => "no HEIC/HEIF files in directory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Files found for a batch plus the inputs that contributed nothing
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedInput>,
}

pub fn is_heif_file(path: &Path) -> bool {
    has_valid_extension(path, HEIF_EXTENSIONS)
}

/// Collect HEIC/HEIF files from a mix of file and directory inputs
///
/// Files keep the order of `inputs`; each directory contributes its matches
/// sorted by path. A file reached twice is only listed once.
pub fn discover_files(inputs: &[PathBuf], recursive: bool) -> Discovery {
    let mut discovery = Discovery::default();
    let mut seen = HashSet::new();

    for input in inputs {
        if input.is_file() {
            if is_heif_file(input) {
                if seen.insert(input.clone()) {
                    discovery.files.push(input.clone());
                }
            } else {
                tracing::debug!(path = %input.display(), "skipping non-HEIC file");
                discovery.skipped.push(SkippedInput {
                    path: input.clone(),
                    reason: SkipReason::NotHeif,
                });
            }
        } else if input.is_dir() {
            tracing::debug!(dir = %input.display(), recursive, "scanning directory");
            let mut found = scan_directory(input, recursive);
            found.sort();

            if found.is_empty() {
                tracing::debug!(dir = %input.display(), "no HEIC files found in directory");
                discovery.skipped.push(SkippedInput {
                    path: input.clone(),
                    reason: SkipReason::NoHeifInDirectory,
                });
            }

            for path in found {
                if seen.insert(path.clone()) {
                    discovery.files.push(path);
                }
            }
        } else {
            tracing::debug!(path = %input.display(), "input path does not exist");
            discovery.skipped.push(SkippedInput {
                path: input.clone(),
                reason: SkipReason::Missing,
            });
        }
    }

    tracing::debug!(count = discovery.files.len(), "discovery finished");
    discovery
}

fn scan_directory(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir).follow_links(false);
    let walker = if recursive {
        walker
    } else {
        walker.max_depth(1)
    };

    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_heif_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Build one request per file, in the given order
pub fn plan_requests(files: &[PathBuf], config: &ConversionConfig) -> Vec<ConversionRequest> {
    files
        .iter()
        .map(|file| ConversionRequest::new(file.clone(), config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_is_heif_file() {
        assert!(is_heif_file(Path::new("a.heic")));
        assert!(is_heif_file(Path::new("b.HEIC")));
        assert!(is_heif_file(Path::new("c.HeIf")));
        assert!(!is_heif_file(Path::new("d.jpg")));
        assert!(!is_heif_file(Path::new("heic")));
    }

    #[test]
    fn test_directory_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.heic"));
        touch(&dir.path().join("b.HEIC"));
        touch(&dir.path().join("c.txt"));

        let found = discover_files(&[dir.path().to_path_buf()], true);
        let names: Vec<_> = found
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.heic", "b.HEIC"]);
        assert!(found.skipped.is_empty());
    }

    #[test]
    fn test_recursive_and_flat_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("top.heic"));
        touch(&dir.path().join("nested").join("deep.heif"));

        let recursive = discover_files(&[dir.path().to_path_buf()], true);
        assert_eq!(recursive.files.len(), 2);

        let flat = discover_files(&[dir.path().to_path_buf()], false);
        assert_eq!(flat.files, vec![dir.path().join("top.heic")]);
    }

    #[test]
    fn test_file_inputs_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let heic = dir.path().join("one.heic");
        let text = dir.path().join("notes.txt");
        let empty = dir.path().join("empty");
        touch(&heic);
        touch(&text);
        fs::create_dir(&empty).unwrap();
        let missing = dir.path().join("missing.heic");

        let found = discover_files(&[heic.clone(), text.clone(), missing.clone(), empty.clone()], true);
        assert_eq!(found.files, vec![heic]);
        assert_eq!(
            found.skipped,
            vec![
                SkippedInput { path: text, reason: SkipReason::NotHeif },
                SkippedInput { path: missing, reason: SkipReason::Missing },
                SkippedInput { path: empty, reason: SkipReason::NoHeifInDirectory },
            ]
        );
    }

    #[test]
    fn test_duplicates_listed_once() {
        let dir = tempfile::tempdir().unwrap();
        let heic = dir.path().join("one.heic");
        touch(&heic);

        let found = discover_files(&[heic.clone(), dir.path().to_path_buf()], true);
        assert_eq!(found.files, vec![heic]);
    }

    #[test]
    fn test_plan_requests_preserves_order() {
        let files = vec![PathBuf::from("/p/b.heic"), PathBuf::from("/p/a.heic")];
        let config = ConversionConfig {
            output_format: OutputFormat::Png,
            ..Default::default()
        };
        let requests = plan_requests(&files, &config);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].source_path, PathBuf::from("/p/b.heic"));
        assert_eq!(requests[1].output_path(), Some(PathBuf::from("/p/a.png")));
    }
}
