use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A chapter split into its title and paragraphs in reading order.
///
/// Both parts are always non-empty and single-line; extraction that cannot fill them
/// yields no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedChapter {
    title: String,
    paragraphs: Vec<String>,
}

impl ExtractedChapter {
    pub fn new(title: impl Into<String>, paragraphs: Vec<String>) -> Option<Self> {
        let title = title.into();
        let usable = |line: &str| !line.trim().is_empty() && !line.contains(['\n', '\r']);
        if !usable(&title) || paragraphs.is_empty() || !paragraphs.iter().all(|p| usable(p)) {
            return None;
        }
        Some(Self { title, paragraphs })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// Cached form: title line, blank line, one paragraph per line.
    pub fn to_cached_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.paragraphs.join("\n"))
    }

    pub fn from_cached_text(text: &str) -> Option<Self> {
        let mut lines = text.trim_end().lines();
        let title = lines.next()?.trim();
        if !lines.next()?.trim().is_empty() {
            return None;
        }
        let paragraphs = lines.map(|line| line.trim().to_owned()).collect();
        Self::new(title, paragraphs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedChapter {
    pub text: String,
}

/// Terminal result of one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChapterOutcome {
    Translated,
    AlreadyTranslated,
    FetchFailed { error: String },
    ExtractFailed { error: String },
    TranslateFailed { error: String },
    StorageFailed { error: String },
}

impl ChapterOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Translated | Self::AlreadyTranslated)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Translated | Self::AlreadyTranslated => None,
            Self::FetchFailed { error }
            | Self::ExtractFailed { error }
            | Self::TranslateFailed { error }
            | Self::StorageFailed { error } => Some(error),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Translated => "translated",
            Self::AlreadyTranslated => "already translated",
            Self::FetchFailed { .. } => "fetch failed",
            Self::ExtractFailed { .. } => "extract failed",
            Self::TranslateFailed { .. } => "translate failed",
            Self::StorageFailed { .. } => "storage failed",
        }
    }
}

impl fmt::Display for ChapterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error() {
            Some(error) => write!(f, "{}: {error}", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterReport {
    pub index: u32,
    #[serde(flatten)]
    pub outcome: ChapterOutcome,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// A fetch or translation call actually ran (cache hits do not count).
    pub network_bound: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub novel_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stopped_early: bool,
    pub reports: Vec<ChapterReport>,
}

impl RunSummary {
    pub fn count(&self, predicate: impl Fn(&ChapterOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn failed(&self) -> usize {
        self.count(|o| !o.is_success())
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
