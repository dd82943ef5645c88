//! Named, invertible mutations of a conversation's turn list.
//!
//! Every change the consultation state machine makes to a conversation is
//! expressed as a [`TurnCommand`]. Applying a command returns the command
//! that undoes it, so rollback is just "apply the inverse".

use crate::core::error::DomainError;
use crate::council::stage::Stage;
use crate::council::value_objects::{
    CandidateResponse, FinalSynthesis, PeerEvaluation, StageMetadata,
};
use crate::conversation::entities::{PartialResult, Turn};

/// Value of one stage's result fields on the placeholder turn
#[derive(Debug, Clone, PartialEq)]
pub enum StageField {
    Stage1(Option<Vec<CandidateResponse>>),
    Stage2 {
        data: Option<Vec<PeerEvaluation>>,
        metadata: Option<StageMetadata>,
    },
    Stage3(Option<FinalSynthesis>),
}

impl StageField {
    pub fn stage(&self) -> Stage {
        match self {
            StageField::Stage1(_) => Stage::Stage1,
            StageField::Stage2 { .. } => Stage::Stage2,
            StageField::Stage3(_) => Stage::Stage3,
        }
    }

    /// Write this value into `result`, returning the value it replaced.
    fn swap_into(self, result: &mut PartialResult) -> StageField {
        match self {
            StageField::Stage1(data) => {
                StageField::Stage1(std::mem::replace(&mut result.stage1, data))
            }
            StageField::Stage2 { data, metadata } => StageField::Stage2 {
                data: std::mem::replace(&mut result.stage2, data),
                metadata: std::mem::replace(&mut result.metadata, metadata),
            },
            StageField::Stage3(data) => {
                StageField::Stage3(std::mem::replace(&mut result.stage3, data))
            }
        }
    }
}

/// A single atomic mutation of a turn list
#[derive(Debug, Clone, PartialEq)]
pub enum TurnCommand {
    /// Append one turn at the end
    AppendTurn(Turn),
    /// Append several turns at the end (inverse of a drop)
    RestoreTurns(Vec<Turn>),
    /// Remove the last `n` turns
    DropLastTurns(usize),
    /// Set one loading flag on the trailing assistant turn
    SetLoading { stage: Stage, loading: bool },
    /// Set one stage's result on the trailing assistant turn, together
    /// with that stage's loading flag
    SetStageField { field: StageField, loading: bool },
    /// Replace the whole turn list with canonical server state
    ReplaceTurns(Vec<Turn>),
}

impl TurnCommand {
    pub fn name(&self) -> &'static str {
        match self {
            TurnCommand::AppendTurn(_) => "append_turn",
            TurnCommand::RestoreTurns(_) => "restore_turns",
            TurnCommand::DropLastTurns(_) => "drop_last_turns",
            TurnCommand::SetLoading { .. } => "set_loading",
            TurnCommand::SetStageField { .. } => "set_stage_field",
            TurnCommand::ReplaceTurns(_) => "replace_turns",
        }
    }

    /// Apply the command to `turns` and return its inverse.
    ///
    /// On error `turns` is left untouched.
    pub fn apply(self, turns: &mut Vec<Turn>) -> Result<TurnCommand, DomainError> {
        match self {
            TurnCommand::AppendTurn(turn) => {
                turns.push(turn);
                Ok(TurnCommand::DropLastTurns(1))
            }
            TurnCommand::RestoreTurns(restored) => {
                let count = restored.len();
                turns.extend(restored);
                Ok(TurnCommand::DropLastTurns(count))
            }
            TurnCommand::DropLastTurns(n) => {
                if n > turns.len() {
                    return Err(DomainError::NotEnoughTurns {
                        requested: n,
                        available: turns.len(),
                    });
                }
                let dropped = turns.split_off(turns.len() - n);
                Ok(TurnCommand::RestoreTurns(dropped))
            }
            TurnCommand::SetLoading { stage, loading } => {
                let placeholder = trailing_placeholder(turns)?;
                let previous = placeholder.loading.get(stage);
                placeholder.loading.set(stage, loading);
                Ok(TurnCommand::SetLoading {
                    stage,
                    loading: previous,
                })
            }
            TurnCommand::SetStageField { field, loading } => {
                let placeholder = trailing_placeholder(turns)?;
                let stage = field.stage();
                let previous_loading = placeholder.loading.get(stage);
                let previous = field.swap_into(placeholder);
                placeholder.loading.set(stage, loading);
                Ok(TurnCommand::SetStageField {
                    field: previous,
                    loading: previous_loading,
                })
            }
            TurnCommand::ReplaceTurns(replacement) => {
                let previous = std::mem::replace(turns, replacement);
                Ok(TurnCommand::ReplaceTurns(previous))
            }
        }
    }
}

fn trailing_placeholder(turns: &mut [Turn]) -> Result<&mut PartialResult, DomainError> {
    turns
        .last_mut()
        .and_then(Turn::as_assistant_mut)
        .ok_or(DomainError::NoPlaceholder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ModelId;

    fn exchange() -> Vec<Turn> {
        vec![Turn::user("Hello"), Turn::placeholder()]
    }

    #[test]
    fn test_drop_inverse_restores_turns() {
        let mut turns = exchange();
        let original = turns.clone();
        let inverse = TurnCommand::DropLastTurns(2).apply(&mut turns).unwrap();
        assert!(turns.is_empty());
        inverse.apply(&mut turns).unwrap();
        assert_eq!(turns, original);
    }

    #[test]
    fn test_drop_more_than_available_fails_untouched() {
        let mut turns = vec![Turn::user("Hello")];
        let err = TurnCommand::DropLastTurns(2).apply(&mut turns).unwrap_err();
        assert_eq!(
            err,
            DomainError::NotEnoughTurns {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn test_set_loading_requires_placeholder() {
        let mut turns = vec![Turn::user("Hello")];
        let result = TurnCommand::SetLoading {
            stage: Stage::Stage1,
            loading: true,
        }
        .apply(&mut turns);
        assert_eq!(result, Err(DomainError::NoPlaceholder));
    }

    #[test]
    fn test_set_stage_field_inverse_restores_previous_value() {
        let mut turns = exchange();
        TurnCommand::SetLoading {
            stage: Stage::Stage1,
            loading: true,
        }
        .apply(&mut turns)
        .unwrap();
        let before = turns.clone();

        let data = vec![CandidateResponse::new(ModelId::new("a/x").unwrap(), "hi")];
        let inverse = TurnCommand::SetStageField {
            field: StageField::Stage1(Some(data.clone())),
            loading: false,
        }
        .apply(&mut turns)
        .unwrap();

        let placeholder = turns[1].as_assistant().unwrap();
        assert_eq!(placeholder.stage1.as_ref(), Some(&data));
        assert!(!placeholder.loading.stage1);

        inverse.apply(&mut turns).unwrap();
        assert_eq!(turns, before);
    }

    #[test]
    fn test_replace_turns_returns_previous_list() {
        let mut turns = exchange();
        let inverse = TurnCommand::ReplaceTurns(vec![Turn::user("Other")])
            .apply(&mut turns)
            .unwrap();
        assert_eq!(turns, vec![Turn::user("Other")]);
        assert_eq!(inverse, TurnCommand::ReplaceTurns(exchange()));
    }
}
