use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Pre-flight failures. Raised before any chapter work or file I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("novel link must start with '{prefix}': {url}")]
    InvalidSourceUrl { url: String, prefix: &'static str },

    #[error("novel link must not carry a query or fragment: {url}")]
    SourceUrlHasQuery { url: String },

    #[error("novel id must be a non-empty directory-safe name: {novel_id:?}")]
    InvalidNovelId { novel_id: String },

    #[error("chapter indices must be positive integers (got {index})")]
    NonPositiveIndex { index: i64 },

    #[error("translation backend credential is missing (set GEMINI_API_KEY)")]
    MissingCredential,
}

/// The Markup Fetcher's single failure kind; status and transport errors are not
/// distinguished by callers.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url}: unexpected status {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url}: read response body")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Why a chapter's markup did not yield a complete chapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("chapter title element not found")]
    MissingTitle,

    #[error("chapter title is empty")]
    EmptyTitle,

    #[error("chapter body container not found")]
    MissingContainer,

    #[error("chapter body has no numbered paragraphs")]
    NoParagraphs,

    #[error("paragraph {id} is empty")]
    EmptyParagraph { id: String },

    #[error("cached extracted text is malformed")]
    MalformedCache,
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("POST {endpoint}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("translation backend error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse translation backend response")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("translation blocked by backend: {reason}")]
    Blocked { reason: String },

    #[error("translation output is empty")]
    EmptyOutput,

    #[error("spawn translator command: {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("translator command i/o: {program}")]
    CommandIo {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("translator command failed: {program} ({status})")]
    CommandFailed { program: String, status: ExitStatus },

    #[error("translator stdout is not valid UTF-8")]
    NonUtf8Output(#[source] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("create artifact dir: {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read artifact: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write artifact: {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("list artifact dir: {}", path.display())]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Chapter-local failure, caught at the pipeline boundary and turned into an outcome.
#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("fetch chapter markup")]
    Fetch(#[from] FetchError),

    #[error("extract chapter text")]
    Extract(#[from] ExtractError),

    #[error("translate chapter")]
    Translate(#[from] TranslateError),

    #[error("persist chapter artifact")]
    Storage(#[from] StorageError),
}

/// Fatal run-level failure; no chapter was attempted.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("prepare novel directories")]
    Storage(#[from] StorageError),
}
