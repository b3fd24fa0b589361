use crate::discovery::ContentIndex;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

/// Write `content` to `dir/rel`, creating parents, and pin its mtime to
/// `age_secs` seconds in the past.
pub(crate) fn write_md(dir: &Path, rel: &str, content: &str, age_secs: u64) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    path
}

/// Content index double that counts invocations.
pub(crate) struct FakeIndex {
    paths: Option<Vec<PathBuf>>,
    calls: AtomicUsize,
}

impl FakeIndex {
    pub(crate) fn returning(paths: Vec<PathBuf>) -> Self {
        Self { paths: Some(paths), calls: AtomicUsize::new(0) }
    }

    pub(crate) fn failing() -> Self {
        Self { paths: None, calls: AtomicUsize::new(0) }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentIndex for FakeIndex {
    async fn search(&self, _root: &Path) -> Result<Vec<PathBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths
            .clone()
            .ok_or_else(|| Error::ContentIndex("fake index offline".to_string()))
    }
}
