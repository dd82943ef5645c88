//! Output formatter trait

use council_domain::PartialResult;

/// Trait for formatting the council's answer to one question
pub trait OutputFormatter {
    /// Format every stage of the answer
    fn format(&self, question: &str, result: &PartialResult) -> String;

    /// Format as JSON
    fn format_json(&self, question: &str, result: &PartialResult) -> String;

    /// Format the chairman's final answer only (concise output)
    fn format_final_only(&self, question: &str, result: &PartialResult) -> String;
}
