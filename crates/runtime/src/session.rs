//! Session host.

use turnflow_core::{
    ChoiceValue, DecisionId, DeferAll, GameResult, GameState, Kernel, KernelConfig, Move,
    MoveOutcome, PendingChoiceRequest, Slot, Suspended, TraceEntry, ValidatedDef,
    compute_state_root,
};

use crate::error::{Result, SessionError};
use crate::replay::{Answer, ReplayEntry, ReplayLog};

/// What a submission or an answer led to.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// The move completed; the session state moved on.
    Applied { trace: Vec<TraceEntry> },
    /// The move waits on this choice. The session state is unchanged.
    Choice(PendingChoiceRequest),
}

/// A suspended move and the log entry it will become.
struct InFlight {
    suspended: Box<Suspended>,
    entry: ReplayEntry,
}

/// One game in progress.
///
/// The published state only changes when a move completes. While a move is
/// suspended the session accepts answers for it and nothing else.
pub struct Session<'d> {
    kernel: Kernel<'d>,
    state: GameState,
    in_flight: Option<InFlight>,
    log: ReplayLog,
}

impl<'d> Session<'d> {
    #[tracing::instrument(skip(def, config), fields(game = %def.def().id))]
    pub fn start(def: &'d ValidatedDef, config: KernelConfig, seed: u64, player_count: u8) -> Result<Self> {
        let kernel = Kernel::new(def, config);
        let state = kernel.initial_state(seed, player_count)?;
        let root = hex::encode(compute_state_root(&state));
        tracing::info!(%root, "session started");
        Ok(Self {
            kernel,
            state,
            in_flight: None,
            log: ReplayLog::new(def.def().id.clone(), seed, player_count, root),
        })
    }

    pub fn kernel(&self) -> &Kernel<'d> {
        &self.kernel
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn log(&self) -> &ReplayLog {
        &self.log
    }

    pub fn into_log(self) -> ReplayLog {
        self.log
    }

    pub fn state_root(&self) -> [u8; 32] {
        compute_state_root(&self.state)
    }

    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }

    pub fn decision(&self) -> Result<Option<Slot>> {
        Ok(self.kernel.current_decision(&self.state)?)
    }

    pub fn legal_moves(&self) -> Result<Vec<Move>> {
        Ok(self.kernel.enumerate_legal_moves(&self.state)?)
    }

    /// The choice the in-flight move waits on.
    pub fn pending(&self) -> Option<&PendingChoiceRequest> {
        self.in_flight.as_ref().map(|f| f.suspended.request())
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.kernel.result(&self.state)
    }

    pub fn is_over(&self) -> bool {
        self.kernel.is_terminal(&self.state)
    }

    /// Submits a move. Every choice it raises is handed back as
    /// [`Step::Choice`].
    #[tracing::instrument(level = "debug", skip(self), fields(mv = %mv))]
    pub fn submit(&mut self, mv: Move) -> Result<Step> {
        if let Some(request) = self.pending() {
            return Err(SessionError::ChoicePending {
                decision: request.decision.clone(),
            });
        }
        let outcome = self.kernel.apply_move(&self.state, &mv, &mut DeferAll)?;
        let entry = ReplayEntry {
            mv,
            choices: Vec::new(),
            state_root: String::new(),
        };
        Ok(self.absorb(outcome, entry))
    }

    /// Answers the pending choice. A refused answer leaves the move pending.
    #[tracing::instrument(level = "debug", skip(self, value), fields(decision = %decision))]
    pub fn resolve(&mut self, decision: &DecisionId, value: ChoiceValue) -> Result<Step> {
        let Some(in_flight) = self.in_flight.as_ref() else {
            return Err(SessionError::NoPendingChoice);
        };
        let outcome =
            self.kernel
                .resolve_choice(&in_flight.suspended, decision, value.clone(), &mut DeferAll)?;

        let Some(InFlight { mut entry, .. }) = self.in_flight.take() else {
            return Err(SessionError::NoPendingChoice);
        };
        entry.choices.push(Answer {
            decision: decision.clone(),
            value,
        });
        Ok(self.absorb(outcome, entry))
    }

    /// Drops the in-flight move. The published state never saw it.
    pub fn abandon(&mut self) -> Option<PendingChoiceRequest> {
        self.in_flight
            .take()
            .map(|f| f.suspended.request().clone())
    }

    fn absorb(&mut self, outcome: MoveOutcome, mut entry: ReplayEntry) -> Step {
        match outcome {
            MoveOutcome::Applied(applied) => {
                self.state = applied.state;
                entry.state_root = self.state_root_hex();
                tracing::debug!(
                    moves = self.state.progress.moves,
                    root = %entry.state_root,
                    "move applied"
                );
                self.log.entries.push(entry);
                Step::Applied {
                    trace: applied.trace,
                }
            }
            MoveOutcome::Suspended(suspended) => {
                let request = suspended.request().clone();
                tracing::debug!(decision = %request.decision, seat = %request.seat, "awaiting choice");
                self.in_flight = Some(InFlight { suspended, entry });
                Step::Choice(request)
            }
        }
    }
}
