//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for consultation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// All three stages
    Full,
    /// Only the chairman's final answer
    Final,
    /// JSON output
    Json,
}

impl From<council_domain::OutputFormat> for OutputFormat {
    fn from(format: council_domain::OutputFormat) -> Self {
        match format {
            council_domain::OutputFormat::Full => OutputFormat::Full,
            council_domain::OutputFormat::Final => OutputFormat::Final,
            council_domain::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for llm-council
#[derive(Parser, Debug)]
#[command(name = "llm-council")]
#[command(author, version, about = "LLM Council - ask a council of models, get one reviewed answer")]
#[command(long_about = r#"
LLM Council sends your question to a council server where several models
deliberate in three stages:
1. Individual Responses: every council member answers independently
2. Peer Rankings: every member ranks the anonymized answers of its peers
3. Final Council Answer: the chairman synthesizes the final answer

Progress is streamed live. Press Ctrl-C during a consultation to cancel it;
your question is kept and can be retried with /regenerate.

Configuration files are loaded from (in priority order):
1. LLM_COUNCIL_<SECTION>__<KEY>   Environment variables
2. --config <path>                Explicit config file
3. ./council.toml                 Project-level config
4. ~/.config/llm-council/config.toml   Global config

Example:
  llm-council "What's the best way to handle errors in Rust?"
  llm-council --conversation 6f1c "And what about panics?"
  llm-council --set-council openai/gpt-4o ollama/qwen3:1.7b --set-chairman openai/gpt-4o
  llm-council --chat
"#)]
pub struct Cli {
    /// The question to ask the council (not required in chat mode)
    pub question: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Continue an existing conversation
    #[arg(long, value_name = "ID", conflicts_with = "new")]
    pub conversation: Option<String>,

    /// Start a new conversation (default for one-shot questions)
    #[arg(long)]
    pub new: bool,

    /// List conversations and exit
    #[arg(long)]
    pub list: bool,

    /// Delete a conversation and exit
    #[arg(long, value_name = "ID")]
    pub delete: Option<String>,

    /// Show the council composition and exit
    #[arg(long)]
    pub council: bool,

    /// Replace the council members (can be specified multiple times)
    #[arg(long, value_name = "MODEL", num_args = 1..)]
    pub set_council: Vec<String>,

    /// Set the chairman model
    #[arg(long, value_name = "MODEL")]
    pub set_chairman: Option<String>,

    /// Council server URL (overrides server.base_url)
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Write a JSONL transcript of every consultation event to PATH
    #[arg(long, value_name = "PATH")]
    pub log_transcript: Option<PathBuf>,
}
