//! CLI surface for threadline.

pub mod commands;
pub mod repl;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ThreadlineConfig;

/// threadline CLI
#[derive(Parser, Debug)]
#[command(
    name = "threadline",
    version,
    about = "Chat agents with per-thread JSON memory"
)]
pub struct Cli {
    /// Config file (defaults to threadline.toml in the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with persistent per-thread memory
    Chat(ChatArgs),
    /// One-shot question, optionally about an image
    Ask(AskArgs),
    /// Translate / summarize / analyze router
    Route(ModelArgs),
    /// Print stored turns for a thread
    History(HistoryArgs),
    /// List built-in tools
    Tools,
}

/// Model options shared by commands that call the model.
#[derive(Args, Debug, Default, Clone)]
pub struct ModelArgs {
    /// Model name (e.g. gpt-4o-mini)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,
}

impl ModelArgs {
    /// Overlay command-line values onto `config`.
    pub fn apply(&self, config: &mut ThreadlineConfig) {
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if self.system.is_some() {
            config.system_prompt = self.system.clone();
        }
        if self.max_tokens.is_some() {
            config.max_tokens = self.max_tokens;
        }
        if self.temperature.is_some() {
            config.temperature = self.temperature;
        }
    }
}

/// Arguments for `chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Thread id whose history is loaded and extended
    #[arg(long, default_value = "default")]
    pub thread: String,

    /// JSON memory file
    #[arg(long)]
    pub memory_file: Option<PathBuf>,

    /// Keep this conversation in a `Human:`/`AI:` transcript file instead
    #[arg(long, conflicts_with = "memory_file")]
    pub transcript: Option<PathBuf>,

    /// Do not offer tools to the model
    #[arg(long)]
    pub no_tools: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for `ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question
    pub prompt: String,

    /// Image URL or local image file
    #[arg(long)]
    pub image: Option<String>,

    /// Print the reply as it streams
    #[arg(long)]
    pub stream: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for `history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Thread id (ignored with --transcript)
    #[arg(long, default_value = "default")]
    pub thread: String,

    /// Memory file to read
    #[arg(long)]
    pub memory_file: Option<PathBuf>,

    /// Read the single-conversation transcript format instead
    #[arg(long)]
    pub transcript: bool,
}
