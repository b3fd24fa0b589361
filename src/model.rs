use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One markdown file seen by a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownFile {
    pub path: PathBuf,
    pub name: String,
    pub folder: String,
    pub last_modified: DateTime<Local>,
    pub tags: BTreeSet<String>,
}

impl MarkdownFile {
    pub fn new(
        path: PathBuf,
        root: &Path,
        last_modified: DateTime<Local>,
        tags: BTreeSet<String>,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = folder_for(&path, root);
        Self { path, name, folder, last_modified, tags }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Grouping key for a file: its directory relative to `root`, or the
/// directory's own name when that is empty or the file lives elsewhere.
pub fn folder_for(path: &Path, root: &Path) -> String {
    let Some(parent) = path.parent() else {
        return String::new();
    };
    match parent.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => {
            rel.to_string_lossy().to_string()
        }
        _ => parent
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    }
}

/// Newest first. Equal timestamps keep their incoming order.
pub fn sort_newest_first(files: &mut [MarkdownFile]) {
    files.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
}
