use std::path::{Path, PathBuf};

use crate::DocumentKind;

/// Expand command-line inputs into the documents to process.
///
/// Files are taken as given, whatever their extension. Directories are walked
/// recursively for `.pdf`, `.txt` and bundle files, skipping hidden entries.
/// A directory that cannot be read is logged and skipped. The result is
/// sorted and free of duplicates, so runs over the same inputs always see
/// documents in the same order.
pub fn discover_documents(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk(input, &mut found);
        } else {
            found.push(input.clone());
        }
    }
    found.sort();
    found.dedup();
    found
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            walk(&path, found);
        } else if DocumentKind::from_path(&path).is_some() {
            found.push(path);
        }
    }
}
