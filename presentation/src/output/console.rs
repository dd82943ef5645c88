//! Console output formatter for council results

use crate::cli::commands::OutputFormat;
use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use council_application::CouncilSettings;
use council_domain::{
    CandidateResponse, Conversation, ConversationId, ConversationSummary, FinalSynthesis,
    LabelMap, PartialResult, PeerEvaluation, Stage, StageMetadata, Turn, extract_reasoning,
    resolve_label, resolve_peer_labels,
};
use serde_json::json;

/// Formats council results for console display
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFormatter {
    show_reasoning: bool,
}

impl ConsoleFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the reasoning segment of responses instead of hiding it
    pub fn with_reasoning(mut self, show: bool) -> Self {
        self.show_reasoning = show;
        self
    }

    /// Format an answer in the requested output format
    pub fn render(&self, format: OutputFormat, question: &str, result: &PartialResult) -> String {
        match format {
            OutputFormat::Full => self.format_full(question, result),
            OutputFormat::Final => self.format_final(question, result),
            OutputFormat::Json => Self::format_json_value(question, result),
        }
    }

    /// Format the complete council result
    pub fn format_full(&self, question: &str, result: &PartialResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("LLM Council Results"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Question:".cyan().bold(), question));

        output.push_str(&Self::section_header(Stage::Stage1));
        match &result.stage1 {
            Some(responses) => output.push_str(&self.stage1(responses)),
            None => output.push_str(&Self::not_available()),
        }

        output.push_str(&Self::section_header(Stage::Stage2));
        match &result.stage2 {
            Some(evaluations) => {
                output.push_str(&self.stage2(evaluations, result.metadata.as_ref()))
            }
            None => output.push_str(&Self::not_available()),
        }

        output.push_str(&Self::section_header(Stage::Stage3));
        match &result.stage3 {
            Some(synthesis) => output.push_str(&self.stage3(synthesis)),
            None => output.push_str(&Self::not_available()),
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json_value(question: &str, result: &PartialResult) -> String {
        let final_answer = result
            .stage3
            .as_ref()
            .map(|s| extract_reasoning(&s.response).content);
        let value = json!({
            "question": question,
            "stage1": &result.stage1,
            "stage2": &result.stage2,
            "stage3": &result.stage3,
            "metadata": &result.metadata,
            "final_answer": final_answer,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the final answer only (concise output)
    pub fn format_final(&self, question: &str, result: &PartialResult) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n\n",
            "=== LLM Council Answer ===".cyan().bold()
        ));
        output.push_str(&format!("{} {}\n\n", "Q:".bold(), question));

        match &result.stage3 {
            Some(synthesis) => {
                output.push_str(&format!(
                    "{} {}\n\n",
                    "Chairman:".dimmed(),
                    synthesis.model.short_name()
                ));
                output.push_str(&self.response_body(&synthesis.response));
            }
            None => output.push_str(
                &"The council did not produce a final answer."
                    .yellow()
                    .to_string(),
            ),
        }
        output.push('\n');
        output
    }

    /// Format a whole conversation: each question with its final answer
    pub fn format_conversation(&self, conversation: &Conversation) -> String {
        let mut output = String::new();
        let title = if conversation.title.is_empty() {
            conversation.id.as_str()
        } else {
            conversation.title.as_str()
        };
        output.push_str(&Self::header(title));
        output.push('\n');

        if conversation.turns.is_empty() {
            output.push_str(&format!("{}\n", "(no messages yet)".dimmed()));
        }
        for turn in &conversation.turns {
            match turn {
                Turn::User { content } => {
                    output.push_str(&format!("\n{} {}\n", "You:".green().bold(), content));
                }
                Turn::Assistant(result) => {
                    let answer = result
                        .stage3
                        .as_ref()
                        .map(|s| self.response_body(&s.response))
                        .unwrap_or_else(|| "(no final answer)".dimmed().to_string());
                    output.push_str(&format!("\n{} {}\n", "Council:".cyan().bold(), answer));
                }
            }
        }
        output
    }

    /// Format the conversation list, marking the selected one
    pub fn format_conversation_list(
        summaries: &[ConversationSummary],
        selected: Option<&ConversationId>,
    ) -> String {
        if summaries.is_empty() {
            return format!("{}\n", "No conversations yet.".dimmed());
        }
        let mut output = String::new();
        for (index, summary) in summaries.iter().enumerate() {
            let marker = if selected == Some(&summary.id) { "*" } else { " " };
            let title = if summary.title.is_empty() {
                "New Conversation"
            } else {
                summary.title.as_str()
            };
            output.push_str(&format!(
                "{} {:>3}. {}  {}  {}\n",
                marker.green().bold(),
                index + 1,
                title.bold(),
                format!("{} messages", summary.message_count).dimmed(),
                summary.id.as_str().dimmed(),
            ));
        }
        output
    }

    /// Format the council composition
    pub fn format_settings(settings: &CouncilSettings) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", "Council members:".cyan().bold()));
        if settings.council_models.is_empty() {
            output.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        let unavailable = settings.unavailable_members();
        for model in &settings.council_models {
            if unavailable.contains(&model) {
                output.push_str(&format!(
                    "  - {} {}\n",
                    model,
                    "(provider not configured)".yellow()
                ));
            } else {
                output.push_str(&format!("  - {}\n", model));
            }
        }
        output.push_str(&format!(
            "{} {}\n",
            "Chairman:".cyan().bold(),
            settings
                .chairman_model
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "(none)".to_string())
        ));
        if !settings.available_providers.is_empty() {
            output.push_str(&format!(
                "{} {}\n",
                "Providers:".cyan().bold(),
                settings.available_providers.join(", ")
            ));
        }
        output
    }

    fn stage1(&self, responses: &[CandidateResponse]) -> String {
        let mut output = String::new();
        for response in responses {
            output.push_str(&format!(
                "\n{}\n{}\n",
                format!("── {} ──", response.model).yellow().bold(),
                self.response_body(&response.response)
            ));
        }
        output
    }

    fn stage2(&self, evaluations: &[PeerEvaluation], metadata: Option<&StageMetadata>) -> String {
        let mapping: Option<&LabelMap> = metadata.map(|m| &m.label_to_model);
        let mut output = String::new();

        for evaluation in evaluations {
            output.push_str(&format!(
                "\n{}\n{}\n",
                format!("── {} ──", evaluation.model).yellow().bold(),
                resolve_peer_labels(&evaluation.ranking, mapping)
            ));
            if !evaluation.parsed_ranking.is_empty() {
                output.push_str(&format!("{}\n", "Extracted ranking:".dimmed()));
                for (position, label) in evaluation.parsed_ranking.iter().enumerate() {
                    output.push_str(&format!(
                        "  {}. {}\n",
                        position + 1,
                        resolve_label(label, mapping)
                    ));
                }
            }
        }

        if let Some(metadata) = metadata
            && !metadata.aggregate_rankings.is_empty()
        {
            output.push_str(&format!(
                "\n{}\n",
                "Aggregate Rankings (Street Cred):".cyan().bold()
            ));
            // Supplied order, never re-sorted
            for (position, ranking) in metadata.aggregate_rankings.iter().enumerate() {
                output.push_str(&format!(
                    "  {}. {} (avg {:.2}, {} votes)\n",
                    position + 1,
                    ranking.model.short_name().bold(),
                    ranking.average_rank,
                    ranking.rankings_count
                ));
            }
        }
        output
    }

    fn stage3(&self, synthesis: &FinalSynthesis) -> String {
        format!(
            "\n{}\n\n{}\n",
            format!("Chairman: {}", synthesis.model).yellow().bold(),
            self.response_body(&synthesis.response)
        )
    }

    /// Response text with its reasoning segment shown or hidden
    fn response_body(&self, text: &str) -> String {
        let split = extract_reasoning(text);
        if !split.has_reasoning {
            return split.content;
        }
        if self.show_reasoning {
            format!(
                "{}\n{}\n\n{}",
                "Reasoning:".dimmed().bold(),
                Self::indent(&split.reasoning, "  ").dimmed(),
                split.content
            )
        } else {
            format!("{}\n{}", "(reasoning hidden)".dimmed(), split.content)
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(stage: Stage) -> String {
        format!("\n{}\n{}\n", stage.to_string().cyan().bold(), "-".repeat(40))
    }

    fn not_available() -> String {
        format!("\n{}\n", "(not available)".dimmed())
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, question: &str, result: &PartialResult) -> String {
        self.format_full(question, result)
    }

    fn format_json(&self, question: &str, result: &PartialResult) -> String {
        Self::format_json_value(question, result)
    }

    fn format_final_only(&self, question: &str, result: &PartialResult) -> String {
        self.format_final(question, result)
    }
}
