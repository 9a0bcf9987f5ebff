use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::chapter::{ChapterIndex, NovelId};
use crate::error::StorageError;

/// The three per-chapter artifacts, one per pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    RawMarkup,
    ExtractedText,
    TranslatedText,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::RawMarkup, Stage::ExtractedText, Stage::TranslatedText];

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::RawMarkup => "raw_html",
            Self::ExtractedText => "raw_content",
            Self::TranslatedText => "translation",
        }
    }

    fn file_suffix(self) -> &'static str {
        match self {
            Self::RawMarkup => ".html",
            Self::ExtractedText => ".txt",
            Self::TranslatedText => "_translated.txt",
        }
    }

    pub fn file_name(self, index: ChapterIndex) -> String {
        format!("Chapter_{index}{}", self.file_suffix())
    }

    fn parse_file_name(self, file_name: &str) -> Option<ChapterIndex> {
        let digits = file_name
            .strip_prefix("Chapter_")?
            .strip_suffix(self.file_suffix())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        ChapterIndex::new(digits.parse().ok()?)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RawMarkup => "raw markup",
            Self::ExtractedText => "extracted text",
            Self::TranslatedText => "translated text",
        })
    }
}

/// Filesystem layout under the storage root:
///
/// ```text
/// {root}/{novel}/raw_html/Chapter_{n}.html
/// {root}/{novel}/raw_content/Chapter_{n}.txt
/// {root}/{novel}/translation/Chapter_{n}_translated.txt
/// ```
///
/// Artifacts are written once and never rewritten; presence alone marks a stage done.
#[derive(Debug, Clone)]
pub struct ChapterStore {
    root: PathBuf,
}

impl ChapterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn novel_dir(&self, novel: &NovelId) -> PathBuf {
        self.root.join(novel.as_str())
    }

    pub fn stage_dir(&self, novel: &NovelId, stage: Stage) -> PathBuf {
        self.novel_dir(novel).join(stage.dir_name())
    }

    pub fn artifact_path(&self, novel: &NovelId, index: ChapterIndex, stage: Stage) -> PathBuf {
        self.stage_dir(novel, stage).join(stage.file_name(index))
    }

    pub fn ensure_novel_dirs(&self, novel: &NovelId) -> Result<(), StorageError> {
        for stage in Stage::ALL {
            let path = self.stage_dir(novel, stage);
            std::fs::create_dir_all(&path)
                .map_err(|source| StorageError::CreateDir { path, source })?;
        }
        Ok(())
    }

    pub fn exists(&self, novel: &NovelId, index: ChapterIndex, stage: Stage) -> bool {
        self.artifact_path(novel, index, stage).is_file()
    }

    pub fn read(
        &self,
        novel: &NovelId,
        index: ChapterIndex,
        stage: Stage,
    ) -> Result<String, StorageError> {
        let path = self.artifact_path(novel, index, stage);
        std::fs::read_to_string(&path).map_err(|source| StorageError::Read { path, source })
    }

    /// Writes the artifact in full before it becomes visible under its final name.
    pub fn write(
        &self,
        novel: &NovelId,
        index: ChapterIndex,
        stage: Stage,
        contents: &str,
    ) -> Result<PathBuf, StorageError> {
        let path = self.artifact_path(novel, index, stage);
        if path.exists() {
            return Err(StorageError::AlreadyExists { path });
        }

        let dir = self.stage_dir(novel, stage);
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let write_err = |source| StorageError::Write {
            path: path.clone(),
            source,
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&dir)
            .map_err(write_err)?;
        tmp.write_all(contents.as_bytes()).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;

        tmp.persist_noclobber(&path).map_err(|err| {
            if err.error.kind() == std::io::ErrorKind::AlreadyExists {
                StorageError::AlreadyExists { path: path.clone() }
            } else {
                write_err(err.error)
            }
        })?;

        Ok(path)
    }

    /// Chapter indices that have an artifact for `stage`, ascending.
    pub fn chapter_indices(
        &self,
        novel: &NovelId,
        stage: Stage,
    ) -> Result<Vec<ChapterIndex>, StorageError> {
        let dir = self.stage_dir(novel, stage);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::List { path: dir, source }),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::List {
                path: dir.clone(),
                source,
            })?;
            let Some(index) = entry.file_name().to_str().and_then(|n| stage.parse_file_name(n))
            else {
                continue;
            };
            indices.push(index);
        }
        indices.sort_unstable();
        Ok(indices)
    }
}
