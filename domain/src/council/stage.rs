//! Council stages

use serde::{Deserialize, Serialize};

/// One of the three stages every consultation goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Every council member answers independently
    Stage1,
    /// Every council member ranks the anonymized answers
    Stage2,
    /// The chairman synthesizes the final answer
    Stage3,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Stage1, Stage::Stage2, Stage::Stage3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Stage1 => "stage1",
            Stage::Stage2 => "stage2",
            Stage::Stage3 => "stage3",
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Stage::Stage1 => 1,
            Stage::Stage2 => 2,
            Stage::Stage3 => 3,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Stage1 => "Individual Responses",
            Stage::Stage2 => "Peer Rankings",
            Stage::Stage3 => "Final Council Answer",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stage {}: {}", self.number(), self.display_name())
    }
}
