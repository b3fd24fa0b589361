use crate::error::{Error, Result};
use crate::tags::SystemTags;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PAGE_SIZE: usize = 20;
pub const INITIAL_LOAD_LIMIT: usize = 50;
pub const LOAD_INCREMENT: usize = 50;
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings threaded into discovery, cache and query components.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory every discovery pass is scoped to
    pub root: PathBuf,

    /// Where the key-value store keeps cache entries
    pub cache_dir: PathBuf,

    /// Query the platform content index before walking the tree
    pub use_content_index: bool,

    /// Upper bound on a single content index invocation
    pub search_timeout: Duration,

    /// How long an unlimited discovery pass stays fresh
    pub cache_ttl: Duration,

    pub page_size: usize,
    pub initial_load_limit: usize,
    pub load_increment: usize,

    /// Tags promoted ahead of all others when sorting
    pub system_tags: SystemTags,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("md_navigator");
        Self {
            root: root.into(),
            cache_dir,
            use_content_index: true,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            cache_ttl: CACHE_TTL,
            page_size: PAGE_SIZE,
            initial_load_limit: INITIAL_LOAD_LIMIT,
            load_increment: LOAD_INCREMENT,
            system_tags: SystemTags::default(),
        }
    }

    /// Build a config from `MD_NAVIGATOR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(markdown_dir()?);
        if let Ok(dir) = env::var("MD_NAVIGATOR_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if env::var_os("MD_NAVIGATOR_NO_INDEX").is_some() {
            config.use_content_index = false;
        }
        if let Ok(list) = env::var("MD_NAVIGATOR_SYSTEM_TAGS") {
            config.system_tags = SystemTags::parse(&list);
        }
        if let Ok(secs) = env::var("MD_NAVIGATOR_SEARCH_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Other(format!(
                    "MD_NAVIGATOR_SEARCH_TIMEOUT_SECS must be a number of seconds, got {secs:?}"
                ))
            })?;
            config.search_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_content_index(mut self, enabled: bool) -> Self {
        self.use_content_index = enabled;
        self
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn with_system_tags(mut self, tags: SystemTags) -> Self {
        self.system_tags = tags;
        self
    }

    /// Create the root directory when it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        ensure_dir(&self.root)?;
        if !self.root.is_dir() {
            return Err(Error::InvalidRoot(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}

fn markdown_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var("MD_NAVIGATOR_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = env::var("HOME").map_err(|_| {
        Error::InvalidRoot(
            "HOME not set; set MD_NAVIGATOR_DIR explicitly".to_string(),
        )
    })?;
    Ok(PathBuf::from(home).join("Documents").join("Markdown"))
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::new("/notes");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.initial_load_limit, 50);
        assert_eq!(config.load_increment, 50);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert!(config.use_content_index);
        assert!(config.system_tags.contains("draft"));
    }

    #[test]
    fn test_builder_setters() {
        let config = Config::new("/notes")
            .with_content_index(false)
            .with_page_size(0)
            .with_cache_dir("/tmp/cache");
        assert!(!config.use_content_index);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
    }

    #[test]
    fn test_ensure_root_creates_missing_dir() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("nested").join("notes");
        let config = Config::new(&root);
        config.ensure_root().unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_ensure_root_rejects_file() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("not-a-dir.md");
        fs::write(&file, "x").unwrap();
        let err = Config::new(&file).ensure_root().unwrap_err();
        assert!(matches!(err, Error::InvalidRoot(_)));
    }
}
