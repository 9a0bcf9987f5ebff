use std::collections::BTreeMap;
use std::io::Write as _;

use anyhow::Context as _;

use crate::chapter::{ChapterIndex, NovelId};
use crate::cli::StatusArgs;
use crate::error::StorageError;
use crate::store::{ChapterStore, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterStatus {
    pub index: ChapterIndex,
    pub raw_markup: bool,
    pub extracted_text: bool,
    pub translated_text: bool,
}

/// One row per chapter that has at least one artifact, ascending by index.
pub fn novel_status(
    store: &ChapterStore,
    novel: &NovelId,
) -> Result<Vec<ChapterStatus>, StorageError> {
    let mut rows = BTreeMap::<ChapterIndex, ChapterStatus>::new();
    for stage in Stage::ALL {
        for index in store.chapter_indices(novel, stage)? {
            let row = rows.entry(index).or_insert(ChapterStatus {
                index,
                raw_markup: false,
                extracted_text: false,
                translated_text: false,
            });
            match stage {
                Stage::RawMarkup => row.raw_markup = true,
                Stage::ExtractedText => row.extracted_text = true,
                Stage::TranslatedText => row.translated_text = true,
            }
        }
    }
    Ok(rows.into_values().collect())
}

pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    let novel = NovelId::parse(&args.novel_id).context("validate --novel-id")?;
    let store = ChapterStore::new(&args.storage_root);
    let rows = novel_status(&store, &novel).context("read novel artifacts")?;

    let mark = |present: bool| if present { "yes" } else { "-" };
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "{:>8}  {:<8}  {:<11}  {:<11}",
        "chapter",
        Stage::RawMarkup.dir_name(),
        Stage::ExtractedText.dir_name(),
        Stage::TranslatedText.dir_name()
    )?;
    for row in &rows {
        writeln!(
            stdout,
            "{:>8}  {:<8}  {:<11}  {:<11}",
            row.index,
            mark(row.raw_markup),
            mark(row.extracted_text),
            mark(row.translated_text)
        )?;
    }
    stdout.flush().context("flush stdout")?;

    tracing::debug!(novel = %novel, chapters = rows.len(), "status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_merges_stages_per_chapter() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = ChapterStore::new(temp.path());
        let novel = NovelId::parse("novel")?;
        let index = |n| ChapterIndex::new(n).unwrap();

        store.write(&novel, index(1), Stage::RawMarkup, "<html>")?;
        store.write(&novel, index(1), Stage::ExtractedText, "T\n\nA")?;
        store.write(&novel, index(1), Stage::TranslatedText, "T2\nA2")?;
        store.write(&novel, index(3), Stage::RawMarkup, "<html>")?;

        let rows = novel_status(&store, &novel)?;
        assert_eq!(
            rows,
            [
                ChapterStatus {
                    index: index(1),
                    raw_markup: true,
                    extracted_text: true,
                    translated_text: true,
                },
                ChapterStatus {
                    index: index(3),
                    raw_markup: true,
                    extracted_text: false,
                    translated_text: false,
                },
            ]
        );
        Ok(())
    }
}
