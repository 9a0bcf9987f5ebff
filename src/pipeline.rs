use std::time::Instant;

use crate::chapter::ChapterRef;
use crate::error::{ChapterError, ExtractError};
use crate::extract::ChapterExtractor;
use crate::fetch::MarkupFetcher;
use crate::formats::{ChapterOutcome, ChapterReport, ExtractedChapter, TranslatedChapter};
use crate::store::{ChapterStore, Stage};
use crate::translate::Translator;

enum ChapterState {
    Start,
    HasMarkup(String),
    HasExtracted(ExtractedChapter),
    HasTranslation(TranslatedChapter),
}

impl ChapterState {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::HasMarkup(_) => "has_markup",
            Self::HasExtracted(_) => "has_extracted",
            Self::HasTranslation(_) => "has_translation",
        }
    }
}

/// Drives one chapter through fetch, extract, translate and persist, skipping every
/// stage whose artifact is already on disk.
#[derive(Debug)]
pub struct ChapterPipeline<F, T> {
    store: ChapterStore,
    fetcher: F,
    extractor: ChapterExtractor,
    translator: T,
}

impl<F: MarkupFetcher, T: Translator> ChapterPipeline<F, T> {
    pub fn new(store: ChapterStore, fetcher: F, translator: T) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            fetcher,
            extractor: ChapterExtractor::new()?,
            translator,
        })
    }

    pub fn store(&self) -> &ChapterStore {
        &self.store
    }

    /// Never fails: chapter-local errors become the report's outcome.
    pub fn process(&self, chapter: &ChapterRef) -> ChapterReport {
        let started_at = Instant::now();
        let mut network_bound = false;

        let outcome = match self.advance(chapter, &mut network_bound) {
            Ok(outcome) => outcome,
            Err(err) => {
                let outcome = failure_outcome(err);
                tracing::warn!(
                    novel = %chapter.novel_id,
                    chapter = chapter.index.get(),
                    outcome = %outcome,
                    "chapter failed"
                );
                outcome
            }
        };

        ChapterReport {
            index: chapter.index.get(),
            outcome,
            elapsed: started_at.elapsed(),
            network_bound,
        }
    }

    fn advance(
        &self,
        chapter: &ChapterRef,
        network_bound: &mut bool,
    ) -> Result<ChapterOutcome, ChapterError> {
        let mut state = ChapterState::Start;
        loop {
            state = match state {
                ChapterState::Start => {
                    if self.has(chapter, Stage::TranslatedText) {
                        tracing::debug!(chapter = chapter.index.get(), "translation cached");
                        return Ok(ChapterOutcome::AlreadyTranslated);
                    }
                    ChapterState::HasMarkup(self.load_or_fetch(chapter, network_bound)?)
                }
                ChapterState::HasMarkup(markup) => {
                    ChapterState::HasExtracted(self.load_or_extract(chapter, &markup)?)
                }
                ChapterState::HasExtracted(extracted) => {
                    *network_bound = true;
                    tracing::debug!(
                        chapter = chapter.index.get(),
                        paragraphs = extracted.paragraphs().len(),
                        "translate"
                    );
                    ChapterState::HasTranslation(self.translator.translate(&extracted)?)
                }
                ChapterState::HasTranslation(translated) => {
                    let path = self.store.write(
                        &chapter.novel_id,
                        chapter.index,
                        Stage::TranslatedText,
                        &translated.text,
                    )?;
                    tracing::debug!(
                        chapter = chapter.index.get(),
                        path = %path.display(),
                        "translation written"
                    );
                    return Ok(ChapterOutcome::Translated);
                }
            };
            tracing::debug!(chapter = chapter.index.get(), state = state.name(), "advance");
        }
    }

    fn has(&self, chapter: &ChapterRef, stage: Stage) -> bool {
        self.store.exists(&chapter.novel_id, chapter.index, stage)
    }

    fn load_or_fetch(
        &self,
        chapter: &ChapterRef,
        network_bound: &mut bool,
    ) -> Result<String, ChapterError> {
        if self.has(chapter, Stage::RawMarkup) {
            tracing::debug!(chapter = chapter.index.get(), "markup cached");
            return self
                .store
                .read(&chapter.novel_id, chapter.index, Stage::RawMarkup)
                .map_err(ChapterError::from);
        }

        let url = chapter.url();
        tracing::debug!(chapter = chapter.index.get(), %url, "fetch");
        *network_bound = true;
        let markup = self.fetcher.fetch(&url)?;
        self.store
            .write(&chapter.novel_id, chapter.index, Stage::RawMarkup, &markup)?;
        Ok(markup)
    }

    fn load_or_extract(
        &self,
        chapter: &ChapterRef,
        markup: &str,
    ) -> Result<ExtractedChapter, ChapterError> {
        if self.has(chapter, Stage::ExtractedText) {
            tracing::debug!(chapter = chapter.index.get(), "extracted text cached");
            let cached = self
                .store
                .read(&chapter.novel_id, chapter.index, Stage::ExtractedText)?;
            return ExtractedChapter::from_cached_text(&cached)
                .ok_or(ChapterError::Extract(ExtractError::MalformedCache));
        }

        let extracted = self.extractor.extract(markup)?;
        self.store.write(
            &chapter.novel_id,
            chapter.index,
            Stage::ExtractedText,
            &extracted.to_cached_text(),
        )?;
        Ok(extracted)
    }
}

fn failure_outcome(err: ChapterError) -> ChapterOutcome {
    let outcome: fn(String) -> ChapterOutcome = match &err {
        ChapterError::Fetch(_) => |error| ChapterOutcome::FetchFailed { error },
        ChapterError::Extract(_) => |error| ChapterOutcome::ExtractFailed { error },
        ChapterError::Translate(_) => |error| ChapterOutcome::TranslateFailed { error },
        ChapterError::Storage(_) => |error| ChapterOutcome::StorageFailed { error },
    };
    outcome(format!("{:#}", anyhow::Error::from(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, StorageError};

    #[test]
    fn failure_outcome_keeps_error_chain() {
        let outcome = failure_outcome(ChapterError::Fetch(FetchError::Status {
            url: "https://ncode.syosetu.com/n1/2/".to_owned(),
            status: 503,
        }));
        assert_eq!(
            outcome,
            ChapterOutcome::FetchFailed {
                error: "fetch chapter markup: GET https://ncode.syosetu.com/n1/2/: unexpected status 503"
                    .to_owned()
            }
        );

        let outcome = failure_outcome(ChapterError::Storage(StorageError::AlreadyExists {
            path: "x".into(),
        }));
        assert!(matches!(outcome, ChapterOutcome::StorageFailed { .. }));

        let outcome = failure_outcome(ChapterError::Extract(ExtractError::MissingTitle));
        assert_eq!(outcome.label(), "extract failed");
    }
}
