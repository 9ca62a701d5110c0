//! Inbound game actions.
//!
//! A closed tagged enum rather than string-keyed dispatch, so every
//! handler match is checked exhaustively by the compiler.

use serde::{Deserialize, Serialize};

use crate::ParticipantId;

/// The witch's nightly decision. One potion per night at most; an
/// explicit pass still completes her turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "potion", rename_all = "snake_case")]
pub enum WitchChoice {
    /// Save tonight's wolf-kill target.
    Antidote { target: ParticipantId },
    /// Kill a target outright.
    Poison { target: ParticipantId },
    /// Use nothing tonight.
    Abstain,
}

/// Every action a participant can submit, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Guardian: protect a participant for the night.
    Guard { target: ParticipantId },
    /// Wolf: cast this wolf's individual kill vote.
    WolfVote { target: ParticipantId },
    /// Seer: learn a participant's alignment.
    Inspect { target: ParticipantId },
    /// Witch: antidote, poison, or pass.
    Witch {
        #[serde(flatten)]
        choice: WitchChoice,
    },
    /// Day-phase statement.
    Speech { content: String },
    /// Day vote for elimination.
    Vote { target: ParticipantId },
    /// Hunter's revenge shot.
    Revenge { target: ParticipantId },
    /// A dying participant's final statement.
    LastWords { content: String },
}

impl Action {
    /// Stable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Guard { .. } => "guard",
            Self::WolfVote { .. } => "wolf_vote",
            Self::Inspect { .. } => "inspect",
            Self::Witch { .. } => "witch",
            Self::Speech { .. } => "speech",
            Self::Vote { .. } => "vote",
            Self::Revenge { .. } => "revenge",
            Self::LastWords { .. } => "last_words",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_action_json_format() {
        let action = Action::Guard {
            target: ParticipantId("u-3".into()),
        };
        let json: serde_json::Value = serde_json::to_value(&action).unwrap();

        assert_eq!(json["kind"], "guard");
        assert_eq!(json["target"], "u-3");
    }

    #[test]
    fn witch_antidote_flattens_potion_tag() {
        let action = Action::Witch {
            choice: WitchChoice::Antidote {
                target: ParticipantId("u-1".into()),
            },
        };
        let json: serde_json::Value = serde_json::to_value(&action).unwrap();

        assert_eq!(json["kind"], "witch");
        assert_eq!(json["potion"], "antidote");
        assert_eq!(json["target"], "u-1");
    }

    #[test]
    fn witch_abstain_round_trip() {
        let action = Action::Witch {
            choice: WitchChoice::Abstain,
        };
        let bytes = serde_json::to_vec(&action).unwrap();
        let decoded: Action = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(action, decoded);
    }

    #[test]
    fn vote_action_round_trip() {
        let action = Action::Vote {
            target: ParticipantId("u-9".into()),
        };
        let bytes = serde_json::to_vec(&action).unwrap();
        let decoded: Action = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(action, decoded);
    }

    #[test]
    fn decode_unknown_kind_returns_error() {
        let unknown = r#"{"kind": "fly", "target": "u-1"}"#;
        let result: Result<Action, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn action_names_are_stable() {
        let action = Action::Speech {
            content: "hello".into(),
        };
        assert_eq!(action.name(), "speech");
    }
}
