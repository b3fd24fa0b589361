use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The platform content index could not answer (absent, failed, timed out).
    #[error("content index unavailable: {0}")]
    ContentIndex(String),

    /// Both the content index and the directory walk failed.
    #[error(
        "could not discover markdown files under {}: {primary}; fallback: {fallback}",
        .root.display()
    )]
    Discovery {
        root: PathBuf,
        primary: String,
        fallback: String,
    },

    #[error("cache payload error: {0}")]
    Cache(#[from] serde_json::Error),

    #[error("{} already exists", .0.display())]
    FileExists(PathBuf),

    #[error("invalid markdown root: {0}")]
    InvalidRoot(String),

    #[error("{0}")]
    Other(String),
}
