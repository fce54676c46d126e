//! Test file discovery
//!
//! Walks a root directory and returns every script with a recognized extension. A
//! subdirectory named after the delegated-runner marker is not descended into: its scripts
//! are driven by a runner script elsewhere in the tree and must not be scheduled twice.

use std::fs;
use std::path::{Path, PathBuf};

/// Discover all scripts under `root`, sorted by path.
///
/// A missing or empty root yields an empty vector.
pub fn discover_scripts(root: &Path, extensions: &[String], delegated_dir: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    discover_recursive(root, extensions, delegated_dir, &mut files);
    files.sort();
    files
}

fn discover_recursive(dir: &Path, extensions: &[String], delegated_dir: &str, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        // Linked directories are not followed; a link back up the tree would never end.
        if file_type.is_symlink() && path.is_dir() {
            tracing::debug!("Skipping linked directory {}", path.display());
            continue;
        }

        if file_type.is_dir() {
            if name == delegated_dir {
                tracing::debug!("Skipping delegated test directory {}", path.display());
                continue;
            }
            discover_recursive(&path, extensions, delegated_dir, files);
        } else if crate::config::has_extension(name, extensions) {
            files.push(path);
        }
    }
}

/// Path of `file` relative to `root`, falling back to the file itself.
pub fn relative_to<'a>(file: &'a Path, root: &Path) -> &'a Path {
    file.strip_prefix(root).unwrap_or(file)
}
