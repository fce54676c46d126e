//! Fixture copying into the test output root
//!
//! Tests never run from their source tree. Before a run the output root is cleared of
//! scripts from the previous run, then resources and test sources are copied in. Script
//! files can have literal strings substituted on the way, e.g. to point an `import` at a
//! different module name in CI.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::has_extension;

/// A filesystem operation that failed while preparing the output root.
#[derive(Debug, Error)]
#[error("failed to {action} {}", path.display())]
pub struct CopyError {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl CopyError {
    fn new(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Copies directory trees, rewriting script files with ordered literal replacements.
#[derive(Debug, Clone, Copy)]
pub struct FixtureCopier<'a> {
    extensions: &'a [String],
    replacements: &'a [(String, String)],
}

impl<'a> FixtureCopier<'a> {
    pub fn new(extensions: &'a [String], replacements: &'a [(String, String)]) -> Self {
        Self {
            extensions,
            replacements,
        }
    }

    /// Recursively delete script files under `root`. Other files are kept.
    ///
    /// Returns the number of deleted files; a missing root deletes nothing.
    pub fn clean_scripts(&self, root: &Path) -> Result<usize, CopyError> {
        if !root.is_dir() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(root).map_err(|e| CopyError::new("list", root, e))? {
            let entry = entry.map_err(|e| CopyError::new("list", root, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| CopyError::new("inspect", &path, e))?;
            if is_linked_dir(file_type, &path) {
                continue;
            }
            if file_type.is_dir() {
                removed += self.clean_scripts(&path)?;
            } else if self.is_script(&path) {
                fs::remove_file(&path).map_err(|e| CopyError::new("delete", &path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Copy everything under `from` into `to`, creating directories as needed.
    ///
    /// Returns the number of files written.
    pub fn copy_tree(&self, from: &Path, to: &Path) -> Result<usize, CopyError> {
        fs::create_dir_all(to).map_err(|e| CopyError::new("create directory", to, e))?;

        let mut copied = 0;
        for entry in fs::read_dir(from).map_err(|e| CopyError::new("list", from, e))? {
            let entry = entry.map_err(|e| CopyError::new("list", from, e))?;
            let source = entry.path();
            let file_type = entry.file_type().map_err(|e| CopyError::new("inspect", &source, e))?;
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = to.join(name);

            if is_linked_dir(file_type, &source) {
                tracing::debug!("Not copying linked directory {}", source.display());
                continue;
            }
            if file_type.is_dir() {
                copied += self.copy_tree(&source, &target)?;
            } else {
                self.copy_file(&source, &target)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    fn copy_file(&self, source: &Path, target: &Path) -> Result<(), CopyError> {
        if self.replacements.is_empty() || !self.is_script(source) {
            fs::copy(source, target).map_err(|e| CopyError::new("copy", source, e))?;
            return Ok(());
        }

        let text = fs::read_to_string(source).map_err(|e| CopyError::new("read", source, e))?;
        let rewritten = replace_literals(&text, self.replacements);
        fs::write(target, rewritten).map_err(|e| CopyError::new("write", target, e))?;
        tracing::debug!("Copied {} with replacements", source.display());
        Ok(())
    }

    fn is_script(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| has_extension(name, self.extensions))
    }
}

/// Linked directories are never descended into, so a link back up the tree cannot loop.
fn is_linked_dir(file_type: fs::FileType, path: &Path) -> bool {
    file_type.is_symlink() && path.is_dir()
}

/// Apply each `(key, value)` pair in order to every line of `text`.
///
/// Keys are literal strings, not patterns. Line endings are preserved.
pub fn replace_literals(text: &str, replacements: &[(String, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let mut line = line.to_string();
        for (key, value) in replacements {
            if !key.is_empty() {
                line = line.replace(key.as_str(), value);
            }
        }
        out.push_str(&line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rhai() -> Vec<String> {
        vec!["rhai".to_string()]
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_replace_is_literal_and_ordered() {
        let replacements = pairs(&[("a.b", "X"), ("X", "Y")]);
        assert_eq!(replace_literals("a.b axb\nkeep\n", &replacements), "Y axb\nkeep\n");
    }

    #[test]
    fn test_replace_keeps_missing_trailing_newline() {
        let replacements = pairs(&[("old", "new")]);
        assert_eq!(replace_literals("old\r\nold", &replacements), "new\r\nnew");
    }

    #[test]
    fn test_copy_rewrites_scripts_only() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(src.path().join("lib_test.rhai"), "import \"OLDLIB\" as lib;\n").unwrap();
        fs::write(src.path().join("data.bin"), [0u8, 159, 146, 150, b'O', b'L', b'D']).unwrap();

        let extensions = rhai();
        let replacements = pairs(&[("OLDLIB", "NEWLIB")]);
        let copied = FixtureCopier::new(&extensions, &replacements)
            .copy_tree(src.path(), out.path())
            .unwrap();

        assert_eq!(copied, 2);
        let script = fs::read_to_string(out.path().join("lib_test.rhai")).unwrap();
        assert_eq!(script, "import \"NEWLIB\" as lib;\n");
        let data = fs::read(out.path().join("data.bin")).unwrap();
        assert_eq!(data, vec![0u8, 159, 146, 150, b'O', b'L', b'D']);
    }

    #[test]
    fn test_copy_is_recursive() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(src.path().join("a").join("b")).unwrap();
        fs::write(src.path().join("a").join("b").join("deep_test.rhai"), "1;").unwrap();

        let extensions = rhai();
        FixtureCopier::new(&extensions, &[]).copy_tree(src.path(), out.path()).unwrap();

        assert!(out.path().join("a").join("b").join("deep_test.rhai").is_file());
    }

    #[test]
    fn test_copy_missing_source_fails_with_path() {
        let out = tempdir().unwrap();
        let missing = out.path().join("missing");
        let extensions = rhai();
        let err = FixtureCopier::new(&extensions, &[])
            .copy_tree(&missing, &out.path().join("to"))
            .unwrap_err();
        assert_eq!(err.path(), missing.as_path());
    }

    #[test]
    fn test_clean_removes_only_scripts() {
        let out = tempdir().unwrap();
        fs::create_dir(out.path().join("nested")).unwrap();
        fs::write(out.path().join("old_test.rhai"), "").unwrap();
        fs::write(out.path().join("nested").join("older_test.rhai"), "").unwrap();
        fs::write(out.path().join("fixture.csv"), "a,b").unwrap();

        let extensions = rhai();
        let removed = FixtureCopier::new(&extensions, &[]).clean_scripts(out.path()).unwrap();

        assert_eq!(removed, 2);
        assert!(!out.path().join("old_test.rhai").exists());
        assert!(!out.path().join("nested").join("older_test.rhai").exists());
        assert!(out.path().join("fixture.csv").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_directories_are_not_followed() {
        let src = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir(src.path().join("sub")).unwrap();
        fs::write(src.path().join("sub").join("a_test.rhai"), "1;").unwrap();
        std::os::unix::fs::symlink(src.path(), src.path().join("sub").join("loop")).unwrap();

        let extensions = rhai();
        let copier = FixtureCopier::new(&extensions, &[]);
        assert_eq!(copier.copy_tree(src.path(), out.path()).unwrap(), 1);
        assert!(!out.path().join("sub").join("loop").exists());

        std::os::unix::fs::symlink(out.path(), out.path().join("sub").join("loop")).unwrap();
        assert_eq!(copier.clean_scripts(out.path()).unwrap(), 1);
    }

    #[test]
    fn test_clean_missing_root() {
        let out = tempdir().unwrap();
        let extensions = rhai();
        let removed = FixtureCopier::new(&extensions, &[])
            .clean_scripts(&out.path().join("none"))
            .unwrap();
        assert_eq!(removed, 0);
    }
}
