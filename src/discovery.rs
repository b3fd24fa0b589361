//! Locating markdown files under a root and turning them into
//! [`MarkdownFile`] records.
//!
//! The platform content index is asked first. When it is disabled, missing,
//! slow or failing, the tree is walked instead. Either way every path is
//! stat'ed and tag-scanned, then the pass is sorted newest first.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{MarkdownFile, sort_newest_first};
use crate::tags::extract_tags_from_file;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::process::Command;
use walkdir::WalkDir;

const DEPENDENCY_CACHE_DIR: &str = "node_modules";
const LIBRARY_DIR: &str = "Library";
const EDITOR_HISTORY_MARKER: &str = "Code/User/History";

/// A fast, metadata-indexed search scoped to a directory.
#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// Absolute paths of markdown files under `root`, in index order.
    async fn search(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// macOS Spotlight through `mdfind`.
#[derive(Debug, Clone)]
pub struct Spotlight {
    timeout: Duration,
}

impl Spotlight {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ContentIndex for Spotlight {
    async fn search(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut cmd = Command::new("mdfind");
        cmd.arg("-onlyin")
            .arg(root)
            .arg("kind:markdown")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::ContentIndex(format!("mdfind: {e}")));
            }
            Err(_) => {
                return Err(Error::ContentIndex(format!(
                    "mdfind timed out after {}s",
                    self.timeout.as_secs_f32()
                )));
            }
        };
        if !output.status.success() {
            return Err(Error::ContentIndex(format!(
                "mdfind exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

/// Discovery service for one root.
#[derive(Clone)]
pub struct Discovery {
    root: PathBuf,
    index: Option<Arc<dyn ContentIndex>>,
}

impl Discovery {
    pub fn new(config: &Config) -> Self {
        let index: Option<Arc<dyn ContentIndex>> = if config.use_content_index {
            Some(Arc::new(Spotlight::new(config.search_timeout)) as Arc<dyn ContentIndex>)
        } else {
            None
        };
        Self::with_index(config.root.clone(), index)
    }

    pub fn with_index(
        root: impl Into<PathBuf>,
        index: Option<Arc<dyn ContentIndex>>,
    ) -> Self {
        Self { root: root.into(), index }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run one discovery pass. `limit` caps how many candidate paths are
    /// considered before metadata and tags are attached.
    pub async fn discover(&self, limit: Option<usize>) -> Result<Vec<MarkdownFile>> {
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        let paths = self.candidate_paths(limit).await?;

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(file) = self.describe(path).await {
                files.push(file);
            }
        }
        sort_newest_first(&mut files);

        tracing::debug!(
            "Discovered {} markdown files under {} (limit {:?})",
            files.len(),
            self.root.display(),
            limit
        );
        Ok(files)
    }

    async fn candidate_paths(&self, limit: Option<usize>) -> Result<Vec<PathBuf>> {
        let primary = match &self.index {
            Some(index) => match index.search(&self.root).await {
                Ok(found) => {
                    let mut paths: Vec<PathBuf> = found
                        .into_iter()
                        .filter(|p| !is_noise_path(p, &self.root))
                        .collect();
                    if let Some(limit) = limit {
                        paths.truncate(limit);
                    }
                    return Ok(paths);
                }
                Err(e) => {
                    tracing::warn!("{e}; falling back to directory walk");
                    e.to_string()
                }
            },
            None => "content index disabled".to_string(),
        };

        let root = self.root.clone();
        let walked = tokio::task::spawn_blocking(move || walk_markdown(&root, limit))
            .await
            .map_err(|e| Error::Other(format!("walk task failed: {e}")))
            .and_then(|r| r);

        walked.map_err(|fallback| {
            tracing::error!(
                "Markdown discovery failed under {}: {fallback}",
                self.root.display()
            );
            Error::Discovery {
                root: self.root.clone(),
                primary,
                fallback: fallback.to_string(),
            }
        })
    }

    /// Stat and tag one path. Files that vanished since listing are skipped.
    async fn describe(&self, path: PathBuf) -> Option<MarkdownFile> {
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!("Skipping {}: {e}", path.display());
                return None;
            }
        };
        let modified: DateTime<Local> =
            meta.modified().unwrap_or(SystemTime::UNIX_EPOCH).into();
        let tags = extract_tags_from_file(&path).await;
        Some(MarkdownFile::new(path, &self.root, modified, tags))
    }
}

/// Recursive `.md` search that skips hidden entries, dependency caches and
/// library internals.
fn walk_markdown(root: &Path, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_entry(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Error::Io(e.into())),
            Err(e) => {
                tracing::warn!("Failed to read entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_md_extension(entry.path()) {
            continue;
        }
        if is_noise_path(entry.path(), root) {
            continue;
        }
        files.push(entry.into_path());
        if limit.is_some_and(|limit| files.len() >= limit) {
            break;
        }
    }
    Ok(files)
}

fn is_skipped_entry(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == DEPENDENCY_CACHE_DIR || name == LIBRARY_DIR
}

fn has_md_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

/// Editor history, dependency caches and library internals below `root`.
fn is_noise_path(path: &Path, root: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let in_noise_dir = relative.components().any(|c| match c {
        Component::Normal(name) => name == DEPENDENCY_CACHE_DIR || name == LIBRARY_DIR,
        _ => false,
    });
    in_noise_dir || relative.to_string_lossy().contains(EDITOR_HISTORY_MARKER)
}
