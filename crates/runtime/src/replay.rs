//! Replay log format and re-execution.

use serde::{Deserialize, Serialize};

use turnflow_core::{ChoiceValue, DecisionId, KernelConfig, Move, ValidatedDef};

use crate::error::{Result, SessionError};
use crate::session::{Session, Step};

/// Answer given to one suspended decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub decision: DecisionId,
    pub value: ChoiceValue,
}

/// One completed move: the submission, the answers it needed, in the order
/// they were asked, and the state root it produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub mv: Move,
    #[serde(default)]
    pub choices: Vec<Answer>,
    /// Hex-encoded root of the settled state after the move.
    pub state_root: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub game: String,
    pub seed: u64,
    pub player_count: u8,
    /// Root of the opening state.
    pub initial_root: String,
    pub entries: Vec<ReplayEntry>,
}

impl ReplayLog {
    pub fn new(game: impl Into<String>, seed: u64, player_count: u8, initial_root: String) -> Self {
        Self {
            game: game.into(),
            seed,
            player_count,
            initial_root,
            entries: Vec::new(),
        }
    }

    /// Root after the last recorded move.
    pub fn final_root(&self) -> &str {
        self.entries
            .last()
            .map_or(self.initial_root.as_str(), |e| e.state_root.as_str())
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Re-executes a log against a definition and checks every recorded root.
/// Returns the session positioned after the last entry.
#[tracing::instrument(skip(def, config, log), fields(game = %log.game, entries = log.entries.len()))]
pub fn replay<'d>(def: &'d ValidatedDef, config: KernelConfig, log: &ReplayLog) -> Result<Session<'d>> {
    let expected = &def.def().id;
    if *expected != log.game {
        return Err(SessionError::GameMismatch {
            expected: expected.clone(),
            found: log.game.clone(),
        });
    }

    let mut session = Session::start(def, config, log.seed, log.player_count)?;
    if session.state_root_hex() != log.initial_root {
        return Err(SessionError::Diverged {
            index: 0,
            reason: "opening state differs".into(),
        });
    }

    for (index, entry) in log.entries.iter().enumerate() {
        let diverged = |reason: String| SessionError::Diverged { index, reason };

        let mut answers = entry.choices.iter();
        let mut step = session.submit(entry.mv.clone())?;
        while let Step::Choice(request) = step {
            let answer = answers
                .next()
                .ok_or_else(|| diverged(format!("no recorded answer for `{}`", request.decision)))?;
            if answer.decision != request.decision {
                return Err(diverged(format!(
                    "expected `{}`, log answers `{}`",
                    request.decision, answer.decision
                )));
            }
            step = session.resolve(&answer.decision, answer.value.clone())?;
        }
        if answers.next().is_some() {
            return Err(diverged("unused recorded answers".into()));
        }

        let root = session.state_root_hex();
        if root != entry.state_root {
            return Err(diverged(format!("state root {root} != {}", entry.state_root)));
        }
    }
    tracing::debug!(root = %log.final_root(), "replay verified");
    Ok(session)
}
