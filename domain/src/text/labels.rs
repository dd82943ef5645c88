//! Peer label resolution.
//!
//! During stage 2 every council member ranks its peers under anonymized
//! labels ("Response A", "Response B", ...). Once stage 2 completes the server
//! reveals which model hides behind each label, and ranking text can be
//! rewritten with readable model names.

use crate::core::model::short_model_name;
use crate::council::label_map::LabelMap;
use regex::{NoExpand, Regex};
use tracing::warn;

/// Replace every anonymized label in `text` with the bolded short name of
/// its model. Labels are replaced one after another in mapping order.
///
/// Without a mapping the text is returned unchanged.
pub fn resolve_peer_labels(text: &str, mapping: Option<&LabelMap>) -> String {
    let Some(mapping) = mapping else {
        return text.to_string();
    };

    let mut resolved = text.to_string();
    for (label, model) in mapping.iter() {
        let Some(pattern) = label_pattern(label) else {
            continue;
        };
        let replacement = format!("**{}**", model.short_name());
        resolved = pattern
            .replace_all(&resolved, NoExpand(&replacement))
            .into_owned();
    }
    resolved
}

/// Short model name behind a parsed-ranking label, or the label itself
/// when the mapping does not know it.
pub fn resolve_label<'a>(label: &'a str, mapping: Option<&'a LabelMap>) -> &'a str {
    mapping
        .and_then(|m| m.get(label))
        .map(|model| short_model_name(model.as_str()))
        .unwrap_or(label)
}

/// Whole-token pattern for a label. Word boundaries are only added on the
/// sides where the label itself starts or ends with a word character.
fn label_pattern(label: &str) -> Option<Regex> {
    let (first, last) = (label.chars().next()?, label.chars().last()?);
    let prefix = if is_word_char(first) { r"\b" } else { "" };
    let suffix = if is_word_char(last) { r"\b" } else { "" };
    let source = format!("{prefix}{}{suffix}", regex::escape(label));
    match Regex::new(&source) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            warn!("Skipping unresolvable peer label {:?}: {}", label, e);
            None
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
