use std::io::Write as _;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::Context as _;

use crate::error::{ConfigError, TranslateError};
use crate::formats::{ExtractedChapter, TranslatedChapter};
use crate::gemini;

/// Turns one extracted chapter into translated text. Implementations never retry.
pub trait Translator {
    fn translate(&self, chapter: &ExtractedChapter) -> Result<TranslatedChapter, TranslateError>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate(&self, chapter: &ExtractedChapter) -> Result<TranslatedChapter, TranslateError> {
        (**self).translate(chapter)
    }
}

/// Title on the first line, then one paragraph per line.
pub fn chapter_prompt(chapter: &ExtractedChapter) -> String {
    let mut prompt = String::with_capacity(
        chapter.title().len() + chapter.paragraphs().iter().map(|p| p.len() + 1).sum::<usize>(),
    );
    prompt.push_str(chapter.title());
    for paragraph in chapter.paragraphs() {
        prompt.push('\n');
        prompt.push_str(paragraph);
    }
    prompt
}

pub fn instructions(to: &str) -> String {
    format!(
        "You are a translation engine for Japanese web novels.\n\
The input is one chapter: the first line is the chapter title and every following line is one paragraph.\n\
Task: Translate the title and the entire chapter into {to}. Every part of the text must be translated.\n\
\n\
Hard rules:\n\
- Do not leave any characters of the source language in the output.\n\
- Do not add explanations, notes, or commentary.\n\
- Keep one paragraph per line, in the original order, with the translated title on the first line.\n\
- Text written as base【reading】 is an inline reading annotation; translate it as a single term.\n\
\n\
Output:\n\
- Output ONLY the translated text, without any extra formatting or metadata.\n"
    )
}

fn finish(raw: &str) -> Result<TranslatedChapter, TranslateError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TranslateError::EmptyOutput);
    }
    Ok(TranslatedChapter {
        text: text.to_owned(),
    })
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub to: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(Self {
            api_key,
            model: gemini::DEFAULT_MODEL.to_owned(),
            base_url: gemini::DEFAULT_BASE_URL.to_owned(),
            to: "English".to_owned(),
            temperature: 0.3,
            timeout: Duration::from_secs(300),
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeminiTranslator {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    instructions: String,
    temperature: f32,
}

impl GeminiTranslator {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build gemini http client")?;

        tracing::debug!(model = %config.model, to = %config.to, "gemini translator");

        Ok(Self {
            client,
            endpoint: gemini::generate_content_endpoint(&config.base_url, &config.model),
            api_key: config.api_key,
            instructions: instructions(&config.to),
            temperature: config.temperature,
        })
    }
}

impl Translator for GeminiTranslator {
    fn translate(&self, chapter: &ExtractedChapter) -> Result<TranslatedChapter, TranslateError> {
        let raw = gemini::generate_text(
            &self.client,
            &self.endpoint,
            &self.api_key,
            &self.instructions,
            &chapter_prompt(chapter),
            self.temperature,
        )?;
        finish(&raw)
    }
}

/// Pipes the prompt to an external program and reads the translation from its stdout.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
    to: String,
}

impl CommandTranslator {
    pub fn new(program: impl Into<String>, args: Vec<String>, to: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            to: to.into(),
        }
    }
}

impl Translator for CommandTranslator {
    fn translate(&self, chapter: &ExtractedChapter) -> Result<TranslatedChapter, TranslateError> {
        let program = &self.program;
        let io_err = |source| TranslateError::CommandIo {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(program)
            .args(&self.args)
            .env("NOVEL_TRANSLATE_TO", &self.to)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| TranslateError::Spawn {
                program: program.clone(),
                source,
            })?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                io_err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "translator stdin is not piped",
                ))
            })?;
            stdin
                .write_all(chapter_prompt(chapter).as_bytes())
                .map_err(io_err)?;
        }

        let output = child.wait_with_output().map_err(io_err)?;
        if !output.status.success() {
            return Err(TranslateError::CommandFailed {
                program: program.clone(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(TranslateError::NonUtf8Output)?;
        finish(&stdout)
    }
}
