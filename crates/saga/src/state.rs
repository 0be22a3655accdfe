//! Saga instance state and its transitions.

use std::collections::BTreeMap;
use std::str::FromStr;

use common::SagaId;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::status::{SagaStatus, StepStatus, derive_status};
use crate::step::{Step, StepSequence};

/// Opaque business document carried through every step of a saga.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Payload key holding the command kind participants should act on.
pub const PAYLOAD_TYPE_KEY: &str = "type";

/// Kind of command sent to a step's participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Perform the step.
    Request,
    /// Compensate (undo) the step.
    Cancel,
}

impl CommandKind {
    /// Returns the kind name as stored and transmitted.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Request => "REQUEST",
            CommandKind::Cancel => "CANCEL",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUEST" => Ok(CommandKind::Request),
            "CANCEL" => Ok(CommandKind::Cancel),
            other => Err(SagaError::UnknownCommandKind(other.to_string())),
        }
    }
}

/// A command the orchestrator must hand to a step's participant.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCommand {
    pub step: Step,
    pub kind: CommandKind,
    pub payload: Payload,
}

/// Outcome of applying a participant result to a saga.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Moved forward; the next step must be requested.
    Advance(StepCommand),
    /// Moved backward; the previous step must be cancelled.
    Compensate(StepCommand),
    /// No step left in the direction of travel, the saga has terminated.
    Exhausted,
    /// The result was recorded without moving the saga.
    Recorded,
}

impl Transition {
    /// Returns the command to emit, if any.
    pub fn command(&self) -> Option<&StepCommand> {
        match self {
            Transition::Advance(cmd) | Transition::Compensate(cmd) => Some(cmd),
            Transition::Exhausted | Transition::Recorded => None,
        }
    }
}

/// State of one in-flight business transaction.
///
/// `saga_status` is always recomputed from `step_status` and never set on
/// its own once the saga exists. Step status entries are never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct SagaState {
    id: SagaId,
    version: i64,
    saga_type: String,
    payload: Payload,
    current_step: Option<Step>,
    step_status: BTreeMap<Step, StepStatus>,
    saga_status: SagaStatus,
}

impl SagaState {
    /// Starts a new saga at `first_step`.
    pub fn create(saga_type: impl Into<String>, payload: Payload, first_step: Step) -> Self {
        let mut step_status = BTreeMap::new();
        step_status.insert(first_step.clone(), StepStatus::Started);

        Self {
            id: SagaId::new(),
            version: 1,
            saga_type: saga_type.into(),
            payload,
            current_step: Some(first_step),
            step_status,
            saga_status: SagaStatus::Started,
        }
    }

    /// Rebuilds a saga from its persisted columns.
    pub fn restore(
        id: SagaId,
        version: i64,
        saga_type: String,
        payload: Payload,
        current_step: Option<Step>,
        step_status: BTreeMap<Step, StepStatus>,
        saga_status: SagaStatus,
    ) -> Self {
        Self {
            id,
            version,
            saga_type,
            payload,
            current_step,
            step_status,
            saga_status,
        }
    }

    pub fn id(&self) -> SagaId {
        self.id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the step in flight, `None` once the saga has terminated.
    pub fn current_step(&self) -> Option<&Step> {
        self.current_step.as_ref()
    }

    pub fn step_status(&self) -> &BTreeMap<Step, StepStatus> {
        &self.step_status
    }

    /// Returns the last known status of `step`.
    pub fn status_of(&self, step: &Step) -> Option<StepStatus> {
        self.step_status.get(step).copied()
    }

    pub fn saga_status(&self) -> SagaStatus {
        self.saga_status
    }

    /// Bumps the version; called once per persisted mutation.
    pub fn increment_version(&mut self) {
        self.version += 1;
    }

    /// Applies a participant result for the current step.
    ///
    /// Records `result` against the current step, then moves forward on
    /// `SUCCEEDED`, backward on `FAILED`/`COMPENSATED`, and stays put for
    /// any other status. The saga status is recomputed afterwards.
    ///
    /// A terminated saga has no current step. Its result is recorded under
    /// the empty step name; a success restarts it at the first step, and a
    /// failure leaves it terminated.
    pub fn apply_step_result(&mut self, steps: &StepSequence, result: StepStatus) -> Transition {
        let current = self.current_step.clone();
        self.step_status
            .insert(current.clone().unwrap_or_else(|| Step::new("")), result);

        let transition = match result {
            StepStatus::Succeeded => self.advance(steps, current.as_ref()),
            StepStatus::Failed | StepStatus::Compensated => self.compensate(steps, current.as_ref()),
            StepStatus::Started | StepStatus::Compensating => Transition::Recorded,
        };

        self.saga_status = derive_status(self.step_status.values());
        transition
    }

    fn advance(&mut self, steps: &StepSequence, current: Option<&Step>) -> Transition {
        match steps.next_step(current).cloned() {
            None => {
                self.current_step = None;
                Transition::Exhausted
            }
            Some(next) => {
                self.step_status.insert(next.clone(), StepStatus::Started);
                self.current_step = Some(next.clone());
                Transition::Advance(StepCommand {
                    step: next,
                    kind: CommandKind::Request,
                    payload: self.payload.clone(),
                })
            }
        }
    }

    fn compensate(&mut self, steps: &StepSequence, current: Option<&Step>) -> Transition {
        match steps.prev_step(current).cloned() {
            None => {
                self.current_step = None;
                Transition::Exhausted
            }
            Some(prev) => {
                self.step_status.insert(prev.clone(), StepStatus::Compensating);
                self.current_step = Some(prev.clone());
                self.payload.insert(
                    PAYLOAD_TYPE_KEY.to_string(),
                    CommandKind::Cancel.as_str().into(),
                );
                Transition::Compensate(StepCommand {
                    step: prev,
                    kind: CommandKind::Cancel,
                    payload: self.payload.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room_reservation::{self, payment, room_booking};
    use serde_json::json;

    fn payload() -> Payload {
        let mut p = Payload::new();
        p.insert("reservationId".into(), json!("r-1"));
        p.insert(PAYLOAD_TYPE_KEY.into(), json!("REQUEST"));
        p
    }

    fn new_saga() -> (SagaState, StepSequence) {
        let def = room_reservation::definition();
        let saga = SagaState::create(def.saga_type(), payload(), def.steps().first().clone());
        (saga, def.steps().clone())
    }

    #[test]
    fn test_create_seeds_first_step() {
        let (saga, _) = new_saga();
        assert_eq!(saga.version(), 1);
        assert_eq!(saga.saga_type(), "room-reservation");
        assert_eq!(saga.current_step(), Some(&room_booking()));
        assert_eq!(saga.status_of(&room_booking()), Some(StepStatus::Started));
        assert_eq!(saga.step_status().len(), 1);
        assert_eq!(saga.saga_status(), SagaStatus::Started);
    }

    #[test]
    fn test_increment_version() {
        let (mut saga, _) = new_saga();
        saga.increment_version();
        saga.increment_version();
        assert_eq!(saga.version(), 3);
    }

    #[test]
    fn test_success_advances_to_payment() {
        let (mut saga, steps) = new_saga();
        let transition = saga.apply_step_result(&steps, StepStatus::Succeeded);

        let cmd = transition.command().unwrap();
        assert!(matches!(transition, Transition::Advance(_)));
        assert_eq!(cmd.step, payment());
        assert_eq!(cmd.kind, CommandKind::Request);
        assert_eq!(cmd.payload, payload());
        assert_eq!(saga.current_step(), Some(&payment()));
        assert_eq!(saga.status_of(&room_booking()), Some(StepStatus::Succeeded));
        assert_eq!(saga.status_of(&payment()), Some(StepStatus::Started));
        assert_eq!(saga.saga_status(), SagaStatus::Started);
    }

    #[test]
    fn test_last_success_completes() {
        let (mut saga, steps) = new_saga();
        saga.apply_step_result(&steps, StepStatus::Succeeded);
        let transition = saga.apply_step_result(&steps, StepStatus::Succeeded);

        assert_eq!(transition, Transition::Exhausted);
        assert_eq!(saga.current_step(), None);
        assert_eq!(saga.saga_status(), SagaStatus::Completed);
    }

    #[test]
    fn test_payment_failure_compensates_room_booking() {
        let (mut saga, steps) = new_saga();
        saga.apply_step_result(&steps, StepStatus::Succeeded);
        let transition = saga.apply_step_result(&steps, StepStatus::Failed);

        let Transition::Compensate(cmd) = transition else {
            panic!("expected compensation");
        };
        assert_eq!(cmd.step, room_booking());
        assert_eq!(cmd.kind, CommandKind::Cancel);
        assert_eq!(cmd.payload[PAYLOAD_TYPE_KEY], json!("CANCEL"));
        assert_eq!(saga.payload()[PAYLOAD_TYPE_KEY], json!("CANCEL"));
        assert_eq!(saga.current_step(), Some(&room_booking()));
        assert_eq!(saga.status_of(&room_booking()), Some(StepStatus::Compensating));
        assert_eq!(saga.status_of(&payment()), Some(StepStatus::Failed));
        assert_eq!(saga.saga_status(), SagaStatus::Aborting);

        let transition = saga.apply_step_result(&steps, StepStatus::Compensated);
        assert_eq!(transition, Transition::Exhausted);
        assert_eq!(saga.current_step(), None);
        assert_eq!(saga.saga_status(), SagaStatus::Aborted);
    }

    #[test]
    fn test_first_step_failure_aborts_immediately() {
        let (mut saga, steps) = new_saga();
        let transition = saga.apply_step_result(&steps, StepStatus::Failed);

        assert_eq!(transition, Transition::Exhausted);
        assert_eq!(saga.current_step(), None);
        assert_eq!(saga.saga_status(), SagaStatus::Aborted);
    }

    #[test]
    fn test_other_statuses_are_only_recorded() {
        let (mut saga, steps) = new_saga();
        let transition = saga.apply_step_result(&steps, StepStatus::Compensating);

        assert_eq!(transition, Transition::Recorded);
        assert_eq!(saga.current_step(), Some(&room_booking()));
        assert_eq!(saga.status_of(&room_booking()), Some(StepStatus::Compensating));
        assert_eq!(saga.saga_status(), SagaStatus::Aborting);
    }

    #[test]
    fn test_success_on_terminated_saga_restarts_it() {
        let (mut saga, steps) = new_saga();
        saga.apply_step_result(&steps, StepStatus::Failed);
        assert_eq!(saga.current_step(), None);
        assert_eq!(steps.next_step(None), Some(&room_booking()));

        let transition = saga.apply_step_result(&steps, StepStatus::Succeeded);

        let Transition::Advance(cmd) = transition else {
            panic!("expected a new request for the first step");
        };
        assert_eq!(cmd.step, room_booking());
        assert_eq!(cmd.kind, CommandKind::Request);
        assert_eq!(saga.current_step(), Some(&room_booking()));
        assert_eq!(saga.status_of(&Step::new("")), Some(StepStatus::Succeeded));
        assert_eq!(saga.status_of(&room_booking()), Some(StepStatus::Started));
        assert_eq!(saga.saga_status(), SagaStatus::Started);
    }

    #[test]
    fn test_failure_on_terminated_saga_stays_terminated() {
        let (mut saga, steps) = new_saga();
        saga.apply_step_result(&steps, StepStatus::Succeeded);
        saga.apply_step_result(&steps, StepStatus::Succeeded);
        assert_eq!(saga.saga_status(), SagaStatus::Completed);

        let transition = saga.apply_step_result(&steps, StepStatus::Failed);

        assert_eq!(transition, Transition::Exhausted);
        assert_eq!(saga.current_step(), None);
        assert_eq!(saga.status_of(&Step::new("")), Some(StepStatus::Failed));
        assert_eq!(saga.saga_status(), SagaStatus::Aborted);
    }

    #[test]
    fn test_command_kind_strings() {
        assert_eq!("REQUEST".parse::<CommandKind>(), Ok(CommandKind::Request));
        assert_eq!(CommandKind::Cancel.to_string(), "CANCEL");
        assert!("DELETE".parse::<CommandKind>().is_err());
    }
}
