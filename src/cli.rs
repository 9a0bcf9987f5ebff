use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::gemini;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// 0: errors only, 1: one line per chapter, 2: every stage transition.
    #[arg(
        short,
        long,
        global = true,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=2)
    )]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, extract and translate chapters, skipping every cached stage.
    Translate(TranslateArgs),
    /// Show which stages are cached for each chapter of a novel.
    Status(StatusArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranslateEngine {
    Gemini,
    Command,
}

#[derive(Debug, Args)]
pub struct TranslateArgs {
    /// Novel name, used as its directory under the storage root.
    #[arg(long)]
    pub novel_id: String,

    /// Novel link on ncode.syosetu.com (e.g. https://ncode.syosetu.com/n1234ab/).
    #[arg(long)]
    pub novel_link: String,

    /// Chapter indices to translate, processed in the given order.
    #[arg(long, num_args = 1.., default_values_t = [1], allow_negative_numbers = true)]
    pub chapters: Vec<i64>,

    /// Pause after each chapter that hit the network.
    #[arg(long, default_value_t = 5)]
    pub cooldown_secs: u64,

    /// Root directory holding `{novel}/raw_html`, `raw_content` and `translation`.
    #[arg(long, default_value = "chapters")]
    pub storage_root: String,

    #[arg(long, value_enum, default_value_t = TranslateEngine::Gemini)]
    pub engine: TranslateEngine,

    /// Target language.
    #[arg(long, default_value = "English")]
    pub to: String,

    /// Gemini model (engine=gemini).
    #[arg(long, default_value = gemini::DEFAULT_MODEL)]
    pub model: String,

    /// Gemini API base URL (engine=gemini).
    #[arg(long, default_value = gemini::DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Write the run summary as JSON to this path (must not exist).
    #[arg(long)]
    pub report: Option<String>,

    /// Translator program (engine=command): reads the chapter on stdin, writes the translation to stdout.
    #[arg(long)]
    pub command: Option<String>,

    /// Arguments passed to `--command`.
    #[arg(last = true)]
    pub command_args: Vec<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long)]
    pub novel_id: String,

    #[arg(long, default_value = "chapters")]
    pub storage_root: String,
}
