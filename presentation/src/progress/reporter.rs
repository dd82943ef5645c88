//! Progress reporting for council consultations

use colored::Colorize;
use council_application::ConsultationObserver;
use council_domain::{ConversationId, PartialResult, Stage};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with one spinner per running stage
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<Stage, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn stage_short_name(stage: Stage) -> String {
        format!("Stage {}", stage.number())
    }

    fn finish_all(&self, message: &str) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        for (_, pb) in bars.drain() {
            pb.abandon_with_message(message.to_string());
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsultationObserver for ProgressReporter {
    fn on_stage_start(&self, stage: Stage) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix(Self::stage_short_name(stage));
        pb.set_message(stage.display_name());
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut bars) = self.bars.lock()
            && let Some(previous) = bars.insert(stage, pb)
        {
            previous.finish_and_clear();
        }
    }

    fn on_stage_complete(&self, stage: Stage, result: &PartialResult) {
        let pb = match self.bars.lock() {
            Ok(mut bars) => bars.remove(&stage),
            Err(_) => None,
        };
        let message = format!("{} {}", "v".green(), stage_summary(stage, result));
        match pb {
            Some(pb) => pb.finish_with_message(message),
            // Result without a preceding start event
            None => {
                let _ = self.multi.println(format!(
                    "  {} {}",
                    Self::stage_short_name(stage).bold().cyan(),
                    message
                ));
            }
        }
    }

    fn on_finished(&self) {
        self.finish_all("stopped");
    }

    fn on_title(&self, _conversation_id: &ConversationId, title: &str) {
        let _ = self
            .multi
            .println(format!("  {} {}", "Title:".dimmed(), title));
    }

    fn on_cancelled(&self) {
        self.finish_all("cancelled");
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ConsultationObserver for SimpleProgress {
    fn on_stage_start(&self, stage: Stage) {
        println!("{} {}", "->".cyan(), stage.to_string().bold());
    }

    fn on_stage_complete(&self, stage: Stage, result: &PartialResult) {
        println!("  {} {}", "v".green(), stage_summary(stage, result));
    }

    fn on_finished(&self) {
        println!();
    }

    fn on_title(&self, _conversation_id: &ConversationId, title: &str) {
        println!("  {} {}", "Title:".dimmed(), title);
    }

    fn on_cancelled(&self) {
        println!("  {} cancelled", "x".red());
    }
}

/// One-line summary of what a completed stage produced
pub fn stage_summary(stage: Stage, result: &PartialResult) -> String {
    match stage {
        Stage::Stage1 => {
            let count = result.stage1.as_ref().map_or(0, Vec::len);
            format!("{} ({} responses)", stage.display_name(), count)
        }
        Stage::Stage2 => {
            let count = result.stage2.as_ref().map_or(0, Vec::len);
            let leader = result
                .metadata
                .as_ref()
                .and_then(|m| m.aggregate_rankings.first())
                .map(|r| format!(", top: {}", r.model.short_name()))
                .unwrap_or_default();
            format!("{} ({} rankings{})", stage.display_name(), count, leader)
        }
        Stage::Stage3 => match &result.stage3 {
            Some(synthesis) => format!(
                "{} (chairman: {})",
                stage.display_name(),
                synthesis.model.short_name()
            ),
            None => stage.display_name().to_string(),
        },
    }
}
