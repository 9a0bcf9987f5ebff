use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::formats::ExtractedChapter;

const TITLE_SELECTOR: &str = "h1.p-novel__title";
// Preface and afterword blocks share the body's classes.
const BODY_SELECTOR: &str = "div.js-novel-text.p-novel__text\
:not(.p-novel__text--preface):not(.p-novel__text--afterword)";
const PARAGRAPH_SELECTOR: &str = "p[id]";

/// Parses a chapter page of the source site into title and paragraphs.
#[derive(Debug, Clone)]
pub struct ChapterExtractor {
    title: Selector,
    body: Selector,
    paragraph: Selector,
}

impl ChapterExtractor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            title: parse_selector(TITLE_SELECTOR)?,
            body: parse_selector(BODY_SELECTOR)?,
            paragraph: parse_selector(PARAGRAPH_SELECTOR)?,
        })
    }

    /// Fails closed: a missing element or any empty paragraph rejects the whole chapter.
    pub fn extract(&self, markup: &str) -> Result<ExtractedChapter, ExtractError> {
        let document = Html::parse_document(markup);

        let title = document
            .select(&self.title)
            .next()
            .ok_or(ExtractError::MissingTitle)?;
        let title = single_line(title);
        if title.is_empty() {
            return Err(ExtractError::EmptyTitle);
        }

        let body = document
            .select(&self.body)
            .next()
            .ok_or(ExtractError::MissingContainer)?;

        let mut paragraphs = Vec::new();
        for paragraph in body.select(&self.paragraph) {
            let Some(id) = paragraph.value().id() else {
                continue;
            };
            if !is_line_marker(id) {
                continue;
            }

            let text = single_line(paragraph);
            if text.is_empty() {
                return Err(ExtractError::EmptyParagraph { id: id.to_owned() });
            }
            paragraphs.push(text);
        }

        if paragraphs.is_empty() {
            return Err(ExtractError::NoParagraphs);
        }

        ExtractedChapter::new(title, paragraphs).ok_or(ExtractError::NoParagraphs)
    }
}

fn parse_selector(css: &'static str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse selector {css:?}: {err:?}"))
}

/// Body lines are numbered `L1`, `L2`, ...; preface (`Lp`) and afterword (`La`) are not.
fn is_line_marker(id: &str) -> bool {
    id.strip_prefix('L')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Flattened text of `element` on one line: each source line is trimmed and the
/// non-empty ones are joined with a space.
fn single_line(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    flatten_text(&mut text, element);
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn flatten_text(out: &mut String, element: ElementRef<'_>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        match child.value().name() {
            "ruby" => flatten_ruby(out, child),
            "br" => out.push('\n'),
            "script" | "style" => {}
            _ => flatten_text(out, child),
        }
    }
}

/// `<ruby>base<rp>(</rp><rt>gloss</rt><rp>)</rp></ruby>` becomes `base【gloss】`.
fn flatten_ruby(out: &mut String, ruby: ElementRef<'_>) {
    let mut base = String::new();
    for child in ruby.children() {
        if let Some(text) = child.value().as_text() {
            base.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        match child.value().name() {
            "rp" => {}
            "rt" => {
                let gloss = child.text().collect::<String>();
                out.push_str(&base);
                out.push('【');
                out.push_str(gloss.trim());
                out.push('】');
                base.clear();
            }
            _ => flatten_text(&mut base, child),
        }
    }
    out.push_str(&base);
}
