//! Model identifier value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifier of a council member (Value Object)
///
/// Follows the `provider/model-name` convention (e.g. `ollama/qwen3:1.7b`),
/// but any non-empty string is accepted since the server owns the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidModel(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Provider part before the first `/`, if any.
    pub fn provider(&self) -> Option<&str> {
        self.0.split_once('/').map(|(provider, _)| provider)
    }

    /// Name used in compact displays (tabs, bolded peer labels).
    pub fn short_name(&self) -> &str {
        short_model_name(&self.0)
    }
}

/// Short form of a model identifier: the part after the first `/`,
/// or the whole identifier when there is none.
///
/// An identifier ending in `/` keeps its full form.
pub fn short_model_name(model: &str) -> &str {
    match model.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => model,
    }
}

impl FromStr for ModelId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::new(s.trim())
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_strips_provider() {
        let model: ModelId = "ollama/qwen3:1.7b".parse().unwrap();
        assert_eq!(model.short_name(), "qwen3:1.7b");
        assert_eq!(model.provider(), Some("ollama"));
    }

    #[test]
    fn test_short_name_without_provider() {
        let model: ModelId = "gpt-5".parse().unwrap();
        assert_eq!(model.short_name(), "gpt-5");
        assert_eq!(model.provider(), None);
    }

    #[test]
    fn test_short_name_keeps_rest_after_first_separator() {
        assert_eq!(short_model_name("openrouter/meta/llama"), "meta/llama");
        assert_eq!(short_model_name("dangling/"), "dangling/");
    }

    #[test]
    fn test_empty_model_rejected() {
        assert!("   ".parse::<ModelId>().is_err());
    }

    #[test]
    fn test_model_serializes_as_plain_string() {
        let model = ModelId::new("a/x").unwrap();
        assert_eq!(serde_json::to_string(&model).unwrap(), "\"a/x\"");
    }
}
