use std::fs::OpenOptions;
use std::io::Write as _;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;

use crate::chapter::{ChapterIndex, ChapterRef, NovelId, SourceUrl};
use crate::cli::{TranslateArgs, TranslateEngine};
use crate::error::{BatchError, ConfigError};
use crate::fetch::{FetchConfig, HttpFetcher, MarkupFetcher};
use crate::formats::{ChapterOutcome, ChapterReport, RunSummary};
use crate::pipeline::ChapterPipeline;
use crate::store::ChapterStore;
use crate::translate::{CommandTranslator, GeminiConfig, GeminiTranslator, Translator};

/// Pause between network-bound chapters.
pub trait Cooldown {
    fn wait(&self, duration: Duration);
}

impl<T: Cooldown + ?Sized> Cooldown for &T {
    fn wait(&self, duration: Duration) {
        (**self).wait(duration);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Cooldown for ThreadSleep {
    fn wait(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Unvalidated input of one run, as handed over by a host.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub novel_id: String,
    pub source_url: String,
    pub indices: Vec<i64>,
    pub cooldown: Duration,
}

impl BatchRequest {
    pub fn validate(&self) -> Result<BatchPlan, ConfigError> {
        let source = SourceUrl::parse(&self.source_url)?;
        let novel_id = NovelId::parse(&self.novel_id)?;
        let indices = self
            .indices
            .iter()
            .map(|&index| ChapterIndex::try_from(index))
            .collect::<Result<Vec<_>, _>>()?;

        let chapters = indices
            .into_iter()
            .map(|index| ChapterRef {
                novel_id: novel_id.clone(),
                source: source.clone(),
                index,
            })
            .collect();

        Ok(BatchPlan {
            novel_id,
            chapters,
            cooldown: self.cooldown,
        })
    }
}

/// A validated run: chapters in the order they will be processed.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub novel_id: NovelId,
    pub chapters: Vec<ChapterRef>,
    pub cooldown: Duration,
}

/// Runs chapters strictly one after another. A failed chapter never stops the run.
#[derive(Debug)]
pub struct BatchRunner<F, T, C = ThreadSleep> {
    pipeline: ChapterPipeline<F, T>,
    cooldown: C,
}

impl<F: MarkupFetcher, T: Translator, C: Cooldown> BatchRunner<F, T, C> {
    pub fn new(pipeline: ChapterPipeline<F, T>, cooldown: C) -> Self {
        Self { pipeline, cooldown }
    }

    pub fn pipeline(&self) -> &ChapterPipeline<F, T> {
        &self.pipeline
    }

    pub fn run(&self, request: &BatchRequest) -> Result<RunSummary, BatchError> {
        self.run_with(request, |_| ControlFlow::Continue(()))
    }

    /// `on_report` sees every chapter as it finishes; `Break` stops before the next one.
    pub fn run_with(
        &self,
        request: &BatchRequest,
        on_report: impl FnMut(&ChapterReport) -> ControlFlow<()>,
    ) -> Result<RunSummary, BatchError> {
        let plan = request.validate()?;
        self.run_plan(&plan, on_report)
    }

    pub fn run_plan(
        &self,
        plan: &BatchPlan,
        mut on_report: impl FnMut(&ChapterReport) -> ControlFlow<()>,
    ) -> Result<RunSummary, BatchError> {
        self.pipeline.store().ensure_novel_dirs(&plan.novel_id)?;

        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(plan.chapters.len());
        let mut stopped_early = false;

        for (position, chapter) in plan.chapters.iter().enumerate() {
            let report = self.pipeline.process(chapter);
            tracing::info!(
                chapter = report.index,
                outcome = report.outcome.label(),
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "chapter finished"
            );

            let is_last = position + 1 == plan.chapters.len();
            let needs_cooldown = report.network_bound && !is_last && !plan.cooldown.is_zero();
            let flow = on_report(&report);
            reports.push(report);

            if flow.is_break() {
                stopped_early = !is_last;
                break;
            }
            if needs_cooldown {
                tracing::debug!(secs = plan.cooldown.as_secs_f64(), "cooldown");
                self.cooldown.wait(plan.cooldown);
            }
        }

        let summary = RunSummary {
            novel_id: plan.novel_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            stopped_early,
            reports,
        };
        tracing::info!(
            novel = %summary.novel_id,
            chapters = summary.reports.len(),
            translated = summary.count(|o| matches!(o, ChapterOutcome::Translated)),
            already_translated = summary.count(|o| matches!(o, ChapterOutcome::AlreadyTranslated)),
            failed = summary.failed(),
            "run finished"
        );
        Ok(summary)
    }
}

pub async fn run(args: TranslateArgs) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || run_blocking(args))
        .await
        .context("join translate task")?
}

fn run_blocking(args: TranslateArgs) -> anyhow::Result<()> {
    let request = BatchRequest {
        novel_id: args.novel_id.clone(),
        source_url: args.novel_link.clone(),
        indices: args.chapters.clone(),
        cooldown: Duration::from_secs(args.cooldown_secs),
    };
    let plan = request.validate().context("validate request")?;

    let store = ChapterStore::new(&args.storage_root);
    let fetcher = HttpFetcher::new(&FetchConfig {
        timeout: Duration::from_secs(args.fetch_timeout_secs),
        ..FetchConfig::default()
    })?;

    let summary = match args.engine {
        TranslateEngine::Gemini => {
            let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
            let mut config = GeminiConfig::new(api_key)?;
            config.model.clone_from(&args.model);
            config.base_url.clone_from(&args.base_url);
            config.to.clone_from(&args.to);

            tracing::info!(engine = "gemini", model = %config.model, "translate");
            execute(store, fetcher, GeminiTranslator::new(config)?, &plan)?
        }
        TranslateEngine::Command => {
            let Some(program) = args.command.as_deref() else {
                anyhow::bail!("missing --command (required when --engine=command)");
            };
            tracing::info!(engine = "command", command = program, "translate");
            let translator = CommandTranslator::new(program, args.command_args.clone(), &args.to);
            execute(store, fetcher, translator, &plan)?
        }
    };

    if let Some(report) = args.report.as_deref() {
        write_report(Path::new(report), &summary)?;
    }
    Ok(())
}

fn execute<T: Translator>(
    store: ChapterStore,
    fetcher: HttpFetcher,
    translator: T,
    plan: &BatchPlan,
) -> anyhow::Result<RunSummary> {
    let pipeline = ChapterPipeline::new(store, fetcher, translator).context("build pipeline")?;
    let runner = BatchRunner::new(pipeline, ThreadSleep);
    let summary = runner
        .run_plan(plan, |_| ControlFlow::Continue(()))
        .context("run chapters")?;
    Ok(summary)
}

fn write_report(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let mut out = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create run report: {}", path.display()))?;
    serde_json::to_writer_pretty(&mut out, summary).context("serialize run report")?;
    out.write_all(b"\n").context("write run report newline")?;
    out.flush().context("flush run report")?;
    Ok(())
}
