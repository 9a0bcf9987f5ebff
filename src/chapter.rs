use std::fmt;
use std::num::NonZeroU32;

use url::Url;

use crate::error::ConfigError;

/// Every novel link must live under this prefix.
pub const SOURCE_PREFIX: &str = "https://ncode.syosetu.com/";

/// Directory-safe identifier of a novel under the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NovelId(String);

impl NovelId {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = raw.trim() != raw
            || raw.is_empty()
            || raw == "."
            || raw == ".."
            || raw.contains(['/', '\\', '\0']);
        if invalid {
            return Err(ConfigError::InvalidNovelId {
                novel_id: raw.to_owned(),
            });
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NovelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 1-based chapter number, matching the source's own numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChapterIndex(NonZeroU32);

impl ChapterIndex {
    pub fn new(index: u32) -> Option<Self> {
        NonZeroU32::new(index).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<i64> for ChapterIndex {
    type Error = ConfigError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        u32::try_from(index)
            .ok()
            .and_then(Self::new)
            .ok_or(ConfigError::NonPositiveIndex { index })
    }
}

impl fmt::Display for ChapterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Base URL of a novel on the source site, e.g. `https://ncode.syosetu.com/n1234ab`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl(Url);

impl SourceUrl {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim().trim_end_matches('/');
        let invalid = || ConfigError::InvalidSourceUrl {
            url: raw.to_owned(),
            prefix: SOURCE_PREFIX,
        };

        if !trimmed.starts_with(SOURCE_PREFIX) {
            return Err(invalid());
        }
        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::SourceUrlHasQuery {
                url: raw.to_owned(),
            });
        }

        Ok(Self(url))
    }

    /// `{sourceUrl}/{index}/`
    pub fn chapter_url(&self, index: ChapterIndex) -> Url {
        let mut url = self.0.clone();
        let path = format!("{}/{index}/", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// One chapter of one novel. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    pub novel_id: NovelId,
    pub source: SourceUrl,
    pub index: ChapterIndex,
}

impl ChapterRef {
    pub fn url(&self) -> Url {
        self.source.chapter_url(self.index)
    }
}
