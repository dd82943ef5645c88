//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use crate::ProgressReporter;
use crate::cli::commands::OutputFormat;
use colored::Colorize;
use council_application::{
    ChatController, ChatError, ConsultationObserver, ConsultationOutcome, ConversationRepository,
    CouncilClient, CouncilSettingsPort, ManageCouncilUseCase, NoProgress, SettingsUpdate,
};
use council_domain::{Conversation, ConversationId, ModelId, PartialResult, Turn};
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Entries kept in the history file
const HISTORY_SIZE: usize = 1000;

/// A parsed REPL input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Help,
    Quit,
    New,
    List,
    /// Conversation id or 1-based position in the list
    Open(String),
    /// Selected conversation when absent
    Delete(Option<String>),
    Regenerate,
    Council,
    SetCouncil(Vec<String>),
    SetChairman(String),
    Usage(&'static str),
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if !line.starts_with('/') {
            return ReplCommand::Ask(line.to_string());
        }
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<String> = words.map(str::to_string).collect();

        match (command, args.as_slice()) {
            ("/quit" | "/exit" | "/q", _) => ReplCommand::Quit,
            ("/help" | "/h" | "/?", _) => ReplCommand::Help,
            ("/new", _) => ReplCommand::New,
            ("/list" | "/ls", _) => ReplCommand::List,
            ("/open", [target]) => ReplCommand::Open(target.clone()),
            ("/open", _) => ReplCommand::Usage("/open <ID|N>"),
            ("/delete", []) => ReplCommand::Delete(None),
            ("/delete", [target]) => ReplCommand::Delete(Some(target.clone())),
            ("/delete", _) => ReplCommand::Usage("/delete [ID|N]"),
            ("/regenerate" | "/retry", _) => ReplCommand::Regenerate,
            ("/council", []) => ReplCommand::Council,
            ("/council", [sub, models @ ..]) if sub == "members" && !models.is_empty() => {
                ReplCommand::SetCouncil(models.to_vec())
            }
            ("/council", [sub, model]) if sub == "chairman" => {
                ReplCommand::SetChairman(model.clone())
            }
            ("/council", _) => {
                ReplCommand::Usage("/council [members <MODEL>... | chairman <MODEL>]")
            }
            _ => ReplCommand::Unknown(command.to_string()),
        }
    }
}

/// Cancel `token` when the user presses Ctrl-C.
///
/// Abort the returned handle once the consultation is over.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

/// The most recent question and the council's answer to it
pub fn last_exchange(conversation: &Conversation) -> Option<(&str, &PartialResult)> {
    let mut turns = conversation.turns.iter().rev();
    let result = turns.next()?.as_assistant()?;
    let question = turns.find_map(Turn::user_content)?;
    Some((question, result))
}

/// Interactive chat REPL
pub struct ChatRepl<C, R, S>
where
    C: CouncilClient + 'static,
    R: ConversationRepository + 'static,
    S: CouncilSettingsPort + 'static,
{
    controller: ChatController<C, R>,
    council: ManageCouncilUseCase<S>,
    formatter: ConsoleFormatter,
    output: OutputFormat,
    show_progress: bool,
    history_path: Option<PathBuf>,
}

impl<C, R, S> ChatRepl<C, R, S>
where
    C: CouncilClient + 'static,
    R: ConversationRepository + 'static,
    S: CouncilSettingsPort + 'static,
{
    pub fn new(controller: ChatController<C, R>, council: ManageCouncilUseCase<S>) -> Self {
        Self {
            controller,
            council,
            formatter: ConsoleFormatter::new(),
            output: OutputFormat::Final,
            show_progress: true,
            history_path: None,
        }
    }

    pub fn with_formatter(mut self, formatter: ConsoleFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Set whether to show progress
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_path = path;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut editor = self.editor();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("council".to_string()),
            DefaultPromptSegment::Empty,
        );

        if let Err(e) = self.controller.refresh_conversations().await {
            eprintln!("{} {}", "Could not reach the council server:".red(), e);
        }
        self.print_welcome();

        loop {
            let line = match editor.read_line(&prompt)? {
                Signal::Success(line) => line,
                Signal::CtrlD => {
                    println!("Bye!");
                    break;
                }
                _ => {
                    println!("^C");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if self.handle(ReplCommand::parse(&line)).await {
                break;
            }
        }

        Ok(())
    }

    fn editor(&self) -> Reedline {
        let mut editor = Reedline::create();
        if let Some(path) = &self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match FileBackedHistory::with_file(HISTORY_SIZE, path.clone()) {
                Ok(history) => editor = editor.with_history(Box::new(history)),
                Err(e) => warn!("History disabled ({}): {}", path.display(), e),
            }
        }
        editor
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│           LLM Council - Chat Mode           │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        match self.controller.active() {
            Some(conversation) => println!(
                "Conversation: {}",
                if conversation.title.is_empty() {
                    conversation.id.as_str()
                } else {
                    conversation.title.as_str()
                }
            ),
            None => println!(
                "{} conversations. Ask a question to start a new one.",
                self.controller.store().summaries().len()
            ),
        }
        println!("Press Ctrl-C during a consultation to cancel it.");
        println!("Type /help for commands.");
        println!();
    }

    fn print_help() {
        println!();
        println!("Commands:");
        println!("  /new                        - Start a new conversation");
        println!("  /list, /ls                  - List conversations");
        println!("  /open <ID|N>                - Open a conversation");
        println!("  /delete [ID|N]              - Delete a conversation (default: current)");
        println!("  /regenerate, /retry         - Ask the last question again");
        println!("  /council                    - Show the council");
        println!("  /council members <MODEL>... - Replace the council members");
        println!("  /council chairman <MODEL>   - Set the chairman");
        println!("  /help, /h, /?               - Show this help");
        println!("  /quit, /exit, /q            - Exit chat");
        println!();
    }

    /// Handle one input line. Returns true if the REPL should exit.
    async fn handle(&mut self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                return true;
            }
            ReplCommand::Help => Self::print_help(),
            ReplCommand::Ask(question) => self.ask(&question).await,
            ReplCommand::Regenerate => self.consult(None).await,
            ReplCommand::New => match self.controller.create_conversation().await {
                Ok(id) => println!("Started conversation {}", id),
                Err(e) => Self::report(&e),
            },
            ReplCommand::List => self.list().await,
            ReplCommand::Open(target) => self.open(&target).await,
            ReplCommand::Delete(target) => self.delete(target.as_deref()).await,
            ReplCommand::Council => match self.council.show().await {
                Ok(settings) => println!("{}", ConsoleFormatter::format_settings(&settings)),
                Err(e) => eprintln!("{} {}", "Error:".red(), e),
            },
            ReplCommand::SetCouncil(models) => {
                self.update_council(models, None).await;
            }
            ReplCommand::SetChairman(model) => {
                self.update_council(Vec::new(), Some(model)).await;
            }
            ReplCommand::Usage(usage) => println!("Usage: {}", usage),
            ReplCommand::Unknown(command) => {
                println!("Unknown command: {}", command);
                println!("Type /help for available commands");
            }
        }
        false
    }

    async fn ask(&mut self, question: &str) {
        if self.controller.selected_id().is_none()
            && let Err(e) = self.controller.create_conversation().await
        {
            Self::report(&e);
            return;
        }
        self.consult(Some(question)).await;
    }

    /// Run one consultation, asking `question` or regenerating the last one
    async fn consult(&mut self, question: Option<&str>) {
        println!();
        let cancellation = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(cancellation.clone());
        let reporter = ProgressReporter::new();
        let observer: &dyn ConsultationObserver = if self.show_progress {
            &reporter
        } else {
            &NoProgress
        };

        let result = match question {
            Some(question) => {
                self.controller
                    .send_message(question, cancellation, observer)
                    .await
            }
            None => self.controller.regenerate(cancellation, observer).await,
        };
        watcher.abort();

        match result {
            Ok(ConsultationOutcome::Completed) => {
                match self.controller.active().and_then(last_exchange) {
                    Some((question, answer)) => {
                        println!("{}", self.formatter.render(self.output, question, answer))
                    }
                    None => warn!("Consultation completed but no answer is loaded"),
                }
            }
            Ok(ConsultationOutcome::Cancelled) => {
                println!(
                    "{} Your question was kept; use /regenerate to ask again.",
                    "Cancelled.".yellow()
                );
            }
            Err(e) => Self::report(&e),
        }
        println!();
    }

    async fn list(&mut self) {
        if let Err(e) = self.controller.refresh_conversations().await {
            Self::report(&e);
            return;
        }
        print!(
            "{}",
            ConsoleFormatter::format_conversation_list(
                self.controller.store().summaries(),
                self.controller.selected_id(),
            )
        );
    }

    async fn open(&mut self, target: &str) {
        let Some(id) = self.resolve_target(target) else {
            return;
        };
        match self.controller.select_conversation(&id).await {
            Ok(()) => {
                if let Some(conversation) = self.controller.active() {
                    println!("{}", self.formatter.format_conversation(conversation));
                }
            }
            Err(e) => Self::report(&e),
        }
    }

    async fn delete(&mut self, target: Option<&str>) {
        let id = match target {
            Some(target) => self.resolve_target(target),
            None => self.controller.selected_id().cloned(),
        };
        let Some(id) = id else {
            println!("No conversation selected");
            return;
        };
        match self.controller.delete_conversation(&id).await {
            Ok(()) => println!("Deleted conversation {}", id),
            Err(e) => Self::report(&e),
        }
    }

    async fn update_council(&mut self, models: Vec<String>, chairman: Option<String>) {
        let parse = |id: String| ModelId::new(id).map_err(|e| e.to_string());
        let update = SettingsUpdate {
            council_models: if models.is_empty() {
                None
            } else {
                match models.into_iter().map(parse).collect::<Result<Vec<_>, _>>() {
                    Ok(models) => Some(models),
                    Err(e) => {
                        eprintln!("{} {}", "Error:".red(), e);
                        return;
                    }
                }
            },
            chairman_model: match chairman.map(parse).transpose() {
                Ok(chairman) => chairman,
                Err(e) => {
                    eprintln!("{} {}", "Error:".red(), e);
                    return;
                }
            },
        };
        match self.council.execute(update).await {
            Ok(settings) => println!("{}", ConsoleFormatter::format_settings(&settings)),
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
    }

    /// Conversation id from an id or a 1-based list position
    fn resolve_target(&self, target: &str) -> Option<ConversationId> {
        let summaries = self.controller.store().summaries();
        if let Ok(position) = target.parse::<usize>()
            && let Some(summary) = position.checked_sub(1).and_then(|i| summaries.get(i))
        {
            return Some(summary.id.clone());
        }
        match ConversationId::new(target) {
            Ok(id) => Some(id),
            Err(e) => {
                eprintln!("{} {}", "Error:".red(), e);
                None
            }
        }
    }

    fn report(error: &ChatError) {
        eprintln!("{} {}", "Error:".red(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question() {
        assert_eq!(
            ReplCommand::parse("  What is Rust?  "),
            ReplCommand::Ask("What is Rust?".to_string())
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("/q"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/new"), ReplCommand::New);
        assert_eq!(ReplCommand::parse("/retry"), ReplCommand::Regenerate);
        assert_eq!(
            ReplCommand::parse("/open 2"),
            ReplCommand::Open("2".to_string())
        );
        assert_eq!(ReplCommand::parse("/delete"), ReplCommand::Delete(None));
        assert_eq!(
            ReplCommand::parse("/delete c1"),
            ReplCommand::Delete(Some("c1".to_string()))
        );
        assert_eq!(
            ReplCommand::parse("/frobnicate"),
            ReplCommand::Unknown("/frobnicate".to_string())
        );
        assert!(matches!(ReplCommand::parse("/open"), ReplCommand::Usage(_)));
    }

    #[test]
    fn test_parse_council_commands() {
        assert_eq!(ReplCommand::parse("/council"), ReplCommand::Council);
        assert_eq!(
            ReplCommand::parse("/council members openai/gpt-4o ollama/qwen3"),
            ReplCommand::SetCouncil(vec![
                "openai/gpt-4o".to_string(),
                "ollama/qwen3".to_string()
            ])
        );
        assert_eq!(
            ReplCommand::parse("/council chairman openai/gpt-4o"),
            ReplCommand::SetChairman("openai/gpt-4o".to_string())
        );
        assert!(matches!(
            ReplCommand::parse("/council members"),
            ReplCommand::Usage(_)
        ));
    }

    #[test]
    fn test_last_exchange() {
        let mut conversation = Conversation::new(ConversationId::new("c1").unwrap());
        assert!(last_exchange(&conversation).is_none());

        conversation.turns.push(Turn::user("First"));
        conversation.turns.push(Turn::placeholder());
        conversation.turns.push(Turn::user("Second"));
        assert!(last_exchange(&conversation).is_none());

        conversation.turns.push(Turn::placeholder());
        let (question, _) = last_exchange(&conversation).unwrap();
        assert_eq!(question, "Second");
    }

    #[tokio::test]
    async fn test_ctrl_c_watcher_can_be_aborted() {
        let token = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(token.clone());
        watcher.abort();
        assert!(watcher.await.unwrap_err().is_cancelled());
        assert!(!token.is_cancelled());
    }
}
