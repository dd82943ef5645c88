//! CLI entrypoint for LLM Council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use council_application::{
    ChatController, ConsultationObserver, ConsultationOutcome, ConversationLogger,
    ManageCouncilUseCase, NoConversationLogger, NoProgress, SettingsUpdate,
};
use council_domain::{ConversationId, ModelId};
use council_infrastructure::{
    ConfigLoader, FileConfig, HttpCouncilClient, JsonlConversationLogger,
};
use council_presentation::{
    ChatRepl, Cli, ConsoleFormatter, OutputConfig, OutputFormat, ProgressReporter, ReplConfig,
    cancel_on_ctrl_c, last_exchange,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type Controller = ChatController<HttpCouncilClient, HttpCouncilClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }

    let _log_guard = init_logging(cli.verbose, config.logging.file.as_deref())?;
    info!("Starting LLM Council");

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("config: {}", issue);
        }
        bail!("Invalid configuration ({} issues)", issues.len());
    }

    let output_config = OutputConfig {
        format: config.output.format,
        color: config.output.color,
    };
    output_config.apply_color();
    let repl_config = ReplConfig {
        show_progress: config.repl.show_progress,
        history_file: config.repl.history_file.clone(),
        show_reasoning: config.repl.show_reasoning,
    };
    let output = cli
        .output
        .or_else(|| output_config.format.map(OutputFormat::from))
        .unwrap_or(OutputFormat::Final);
    let formatter = ConsoleFormatter::new().with_reasoning(repl_config.show_reasoning);

    // === Dependency Injection ===
    let client = Arc::new(
        HttpCouncilClient::new(&config.server.base_url, config.server.request_timeout())
            .context("Failed to create HTTP client")?,
    );
    let mut controller = ChatController::new(client.clone(), client.clone())
        .with_conversation_logger(transcript_logger(&cli, &config));
    let council = ManageCouncilUseCase::new(client.clone());

    // === Council management ===
    if cli.council || !cli.set_council.is_empty() || cli.set_chairman.is_some() {
        let settings = if cli.set_council.is_empty() && cli.set_chairman.is_none() {
            council.show().await?
        } else {
            let update = SettingsUpdate {
                council_models: if cli.set_council.is_empty() {
                    None
                } else {
                    Some(parse_models(&cli.set_council)?)
                },
                chairman_model: cli
                    .set_chairman
                    .as_deref()
                    .map(ModelId::new)
                    .transpose()?,
            };
            council.execute(update).await?
        };
        println!("{}", ConsoleFormatter::format_settings(&settings));
        return Ok(());
    }

    // === Conversation management ===
    if cli.list {
        controller.refresh_conversations().await?;
        print!(
            "{}",
            ConsoleFormatter::format_conversation_list(controller.store().summaries(), None)
        );
        return Ok(());
    }

    if let Some(id) = &cli.delete {
        let id = ConversationId::new(id.as_str())?;
        controller.delete_conversation(&id).await?;
        println!("Deleted conversation {}", id);
        return Ok(());
    }

    if let Some(id) = &cli.conversation {
        let id = ConversationId::new(id.as_str())?;
        controller
            .select_conversation(&id)
            .await
            .with_context(|| format!("Failed to open conversation {}", id))?;
    } else if cli.new {
        let id = controller.create_conversation().await?;
        info!("Started conversation {}", id);
    }

    // Chat mode
    if cli.chat {
        let mut repl = ChatRepl::new(controller, council)
            .with_formatter(formatter)
            .with_output(output)
            .with_progress(!cli.quiet && repl_config.show_progress)
            .with_history_file(repl_config.history_path());

        repl.run().await?;
        return Ok(());
    }

    // Single question mode - question is required
    let question = match cli.question {
        Some(q) => q,
        None => bail!("Question is required. Use --chat for interactive mode."),
    };

    if controller.selected_id().is_none() {
        let id = controller.create_conversation().await?;
        info!("Asking in new conversation {}", id);
    }

    // Print header
    if !cli.quiet && output != OutputFormat::Json {
        println!();
        println!("+============================================================+");
        println!("|                        LLM Council                         |");
        println!("+============================================================+");
        println!();
        println!("Question: {}", question);
        if let Some(id) = controller.selected_id() {
            println!("Conversation: {}", id);
        }
        println!();
    }

    let outcome = ask(
        &mut controller,
        &question,
        !cli.quiet && output != OutputFormat::Json,
    )
    .await?;

    match outcome {
        ConsultationOutcome::Completed => match controller.active().and_then(last_exchange) {
            Some((question, answer)) => println!("{}", formatter.render(output, question, answer)),
            None => bail!("The council finished without an answer"),
        },
        ConsultationOutcome::Cancelled => {
            eprintln!("Cancelled. Your question was kept in the conversation.");
        }
    }

    Ok(())
}

/// Send one question, cancelling it on Ctrl-C
async fn ask(
    controller: &mut Controller,
    question: &str,
    show_progress: bool,
) -> Result<ConsultationOutcome> {
    let cancellation = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancellation.clone());
    let reporter = ProgressReporter::new();
    let observer: &dyn ConsultationObserver = if show_progress {
        &reporter
    } else {
        &NoProgress
    };

    let result = controller
        .send_message(question, cancellation, observer)
        .await;
    watcher.abort();
    Ok(result?)
}

fn parse_models(ids: &[String]) -> Result<Vec<ModelId>> {
    ids.iter()
        .map(|id| ModelId::new(id.as_str()).map_err(Into::into))
        .collect()
}

/// Transcript logger from `--log-transcript` or `[logging] transcript`
fn transcript_logger(cli: &Cli, config: &FileConfig) -> Arc<dyn ConversationLogger> {
    let path = cli
        .log_transcript
        .clone()
        .or_else(|| config.logging.transcript.as_ref().map(PathBuf::from));
    match path.and_then(JsonlConversationLogger::new) {
        Some(logger) => {
            info!("Writing consultation transcript to {}", logger.path().display());
            Arc::new(logger)
        }
        None => Arc::new(NoConversationLogger),
    }
}

/// Install the tracing subscriber.
///
/// The returned guard flushes the log file and must live until exit.
fn init_logging(verbose: u8, log_file: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("logging.file has no file name: {}", path.display()))?;
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create {}", directory.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
