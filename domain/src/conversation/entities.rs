//! Conversation domain entities

use crate::core::error::DomainError;
use crate::council::label_map::LabelMap;
use crate::council::stage::Stage;
use crate::council::value_objects::{
    CandidateResponse, FinalSynthesis, PeerEvaluation, StageMetadata,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Server-assigned conversation identifier (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() || id.contains('/') {
            return Err(DomainError::InvalidConversationId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ConversationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConversationId::new(s.trim())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-stage "in flight" flags of an assistant turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageLoading {
    pub stage1: bool,
    pub stage2: bool,
    pub stage3: bool,
}

impl StageLoading {
    pub fn get(&self, stage: Stage) -> bool {
        match stage {
            Stage::Stage1 => self.stage1,
            Stage::Stage2 => self.stage2,
            Stage::Stage3 => self.stage3,
        }
    }

    pub fn set(&mut self, stage: Stage, loading: bool) {
        match stage {
            Stage::Stage1 => self.stage1 = loading,
            Stage::Stage2 => self.stage2 = loading,
            Stage::Stage3 => self.stage3 = loading,
        }
    }

    pub fn any(&self) -> bool {
        self.stage1 || self.stage2 || self.stage3
    }

    /// Stages currently flagged, in stage order.
    pub fn active(&self) -> Vec<Stage> {
        Stage::ALL.into_iter().filter(|s| self.get(*s)).collect()
    }
}

/// Council output of one assistant turn, filled in progressively
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialResult {
    pub stage1: Option<Vec<CandidateResponse>>,
    pub stage2: Option<Vec<PeerEvaluation>>,
    pub stage3: Option<FinalSynthesis>,
    pub metadata: Option<StageMetadata>,
    #[serde(skip_serializing_if = "is_idle")]
    pub loading: StageLoading,
}

fn is_idle(loading: &StageLoading) -> bool {
    !loading.any()
}

impl PartialResult {
    /// Empty placeholder created right after the user submits
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.any()
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        match stage {
            Stage::Stage1 => self.stage1.is_some(),
            Stage::Stage2 => self.stage2.is_some(),
            Stage::Stage3 => self.stage3.is_some(),
        }
    }

    /// Stages that never produced a result
    pub fn missing_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|s| !self.has_stage(*s))
            .collect()
    }

    pub fn label_to_model(&self) -> Option<&LabelMap> {
        self.metadata.as_ref().map(|m| &m.label_to_model)
    }
}

/// One entry of a conversation, tagged by role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Turn {
    User { content: String },
    Assistant(PartialResult),
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    pub fn placeholder() -> Self {
        Turn::Assistant(PartialResult::placeholder())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Turn::User { .. })
    }

    pub fn user_content(&self) -> Option<&str> {
        match self {
            Turn::User { content } => Some(content),
            Turn::Assistant(_) => None,
        }
    }

    pub fn as_assistant(&self) -> Option<&PartialResult> {
        match self {
            Turn::Assistant(result) => Some(result),
            Turn::User { .. } => None,
        }
    }

    pub fn as_assistant_mut(&mut self) -> Option<&mut PartialResult> {
        match self {
            Turn::Assistant(result) => Some(result),
            Turn::User { .. } => None,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Turn::User { .. } => "user",
            Turn::Assistant(_) => "assistant",
        }
    }
}

/// Full conversation with all its turns (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "messages", default)]
    pub turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            created_at: None,
            title: String::new(),
            turns: Vec::new(),
        }
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Trailing assistant turn, if the conversation ends with one
    pub fn placeholder(&self) -> Option<&PartialResult> {
        self.turns.last().and_then(Turn::as_assistant)
    }

    /// Text of the trailing user turn, if the conversation ends unanswered
    pub fn trailing_user_text(&self) -> Option<&str> {
        self.turns.last().and_then(Turn::user_content)
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            title: self.title.clone(),
            message_count: self.turns.len(),
        }
    }
}

/// List-view record of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_decodes_server_record() {
        let json = r#"{
            "id": "6f1c",
            "created_at": "2025-12-09T01:47:08",
            "title": "Rust errors",
            "messages": [
                {"role": "user", "content": "How do I handle errors?"},
                {
                    "role": "assistant",
                    "stage1": [{"model": "a/x", "response": "Use Result."}],
                    "stage2": [],
                    "stage3": {"model": "c/z", "response": "Use Result and ?."}
                }
            ]
        }"#;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.turns.len(), 2);
        assert_eq!(
            conversation.turns[0].user_content(),
            Some("How do I handle errors?")
        );
        let assistant = conversation.placeholder().unwrap();
        assert_eq!(assistant.stage1.as_ref().unwrap().len(), 1);
        assert_eq!(assistant.stage2.as_deref(), Some(&[][..]));
        assert!(assistant.metadata.is_none());
        assert!(!assistant.is_loading());
    }

    #[test]
    fn test_turn_serializes_with_role_tag() {
        let json = serde_json::to_value(Turn::user("Hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello");
    }

    #[test]
    fn test_loading_flags() {
        let mut loading = StageLoading::default();
        assert!(!loading.any());
        loading.set(Stage::Stage2, true);
        assert!(loading.get(Stage::Stage2));
        assert_eq!(loading.active(), vec![Stage::Stage2]);
    }

    #[test]
    fn test_missing_stages() {
        let mut result = PartialResult::placeholder();
        result.stage1 = Some(vec![]);
        assert_eq!(result.missing_stages(), vec![Stage::Stage2, Stage::Stage3]);
    }

    #[test]
    fn test_conversation_id_rejects_path_segments() {
        assert!("abc/def".parse::<ConversationId>().is_err());
        assert!("".parse::<ConversationId>().is_err());
        assert_eq!("  abc ".parse::<ConversationId>().unwrap().as_str(), "abc");
    }

    #[test]
    fn test_trailing_user_text() {
        let mut conversation = Conversation::new(ConversationId::new("c1").unwrap());
        assert_eq!(conversation.trailing_user_text(), None);
        conversation.turns.push(Turn::user("Hello"));
        assert_eq!(conversation.trailing_user_text(), Some("Hello"));
        conversation.turns.push(Turn::placeholder());
        assert_eq!(conversation.trailing_user_text(), None);
    }
}
