use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::state::data::SourceFile;

/// Result of reading a folder into memory
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Files in path order; content types are sniffed, not trusted from extensions
    pub files: Vec<SourceFile>,
    /// Paths that could not be read
    pub unreadable: Vec<PathBuf>,
}

/// Recursively read every regular file under `folder`
///
/// Files are returned sorted by path so the same folder always stages into the
/// same names. Non-image files are kept; the stager decides what to skip.
pub async fn scan_folder(folder: &Path) -> ScanResult {
    tracing::info!("🔍 Scanning folder: {}", folder.display());

    let root = folder.to_path_buf();
    let paths = tokio::task::spawn_blocking(move || collect_paths(&root))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Folder walk task failed");
            Vec::new()
        });

    let mut result = ScanResult::default();
    for path in paths {
        match SourceFile::read(&path).await {
            Ok(file) => result.files.push(file),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "⚠️  Could not read file");
                result.unreadable.push(path);
            }
        }
    }

    tracing::info!(
        found = result.files.len(),
        unreadable = result.unreadable.len(),
        "Scan complete"
    );
    result
}

fn collect_paths(folder: &Path) -> Vec<PathBuf> {
    // Walk the directory tree recursively
    let mut paths: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !is_hidden(entry.file_name()))
        .map(|entry| entry.into_path())
        .collect();

    paths.sort();
    paths
}

/// Dotfiles like `.DS_Store` are never part of a batch
fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::decode::tests::png_bytes;
    use image::Rgba;

    #[tokio::test]
    async fn test_scan_reads_nested_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("warning");
        std::fs::create_dir_all(&nested).unwrap();

        std::fs::write(dir.path().join("b_stop.png"), png_bytes(4, 4, Rgba([200, 20, 30, 255]))).unwrap();
        std::fs::write(dir.path().join("a_notes.txt"), b"plain text").unwrap();
        std::fs::write(nested.join("curve.png"), png_bytes(4, 4, Rgba([250, 210, 20, 255]))).unwrap();
        std::fs::write(dir.path().join(".DS_Store"), b"junk").unwrap();

        let result = scan_folder(dir.path()).await;

        let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a_notes.txt", "b_stop.png", "curve.png"]);
        assert!(!result.files[0].is_image());
        assert_eq!(result.files[1].content_type, "image/png");
        assert!(result.unreadable.is_empty());
    }

    #[tokio::test]
    async fn test_missing_folder_yields_nothing() {
        let result = scan_folder(Path::new("/nonexistent/sign-library-scan")).await;
        assert!(result.files.is_empty());
    }
}
