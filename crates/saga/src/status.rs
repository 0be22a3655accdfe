//! Step and saga status vocabulary.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// Last known status of a single saga step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// The step command was issued and no result has arrived yet.
    Started,
    /// The participant rejected or failed the step.
    Failed,
    /// The participant performed the step.
    Succeeded,
    /// A cancel command was issued for the step.
    Compensating,
    /// The participant undid the step.
    Compensated,
}

impl StepStatus {
    /// Returns the status name as stored and transmitted.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Started => "STARTED",
            StepStatus::Failed => "FAILED",
            StepStatus::Succeeded => "SUCCEEDED",
            StepStatus::Compensating => "COMPENSATING",
            StepStatus::Compensated => "COMPENSATED",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTED" => Ok(StepStatus::Started),
            "FAILED" => Ok(StepStatus::Failed),
            "SUCCEEDED" => Ok(StepStatus::Succeeded),
            "COMPENSATING" => Ok(StepStatus::Compensating),
            "COMPENSATED" => Ok(StepStatus::Compensated),
            other => Err(SagaError::UnknownStepStatus(other.to_string())),
        }
    }
}

/// Aggregate status of a saga, derived from its step statuses.
///
/// ```text
/// STARTED ──┬──► COMPLETED
///           └──► ABORTING ──► ABORTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaStatus {
    /// The saga is still moving forward.
    #[default]
    Started,
    /// A compensating step is in flight.
    Aborting,
    /// A failure occurred and no compensation is in flight (terminal).
    Aborted,
    /// Every step succeeded (terminal).
    Completed,
}

impl SagaStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStatus::Aborted | SagaStatus::Completed)
    }

    /// Returns the status name as stored and transmitted.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Started => "STARTED",
            SagaStatus::Aborting => "ABORTING",
            SagaStatus::Aborted => "ABORTED",
            SagaStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SagaStatus {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTED" => Ok(SagaStatus::Started),
            "ABORTING" => Ok(SagaStatus::Aborting),
            "ABORTED" => Ok(SagaStatus::Aborted),
            "COMPLETED" => Ok(SagaStatus::Completed),
            other => Err(SagaError::UnknownSagaStatus(other.to_string())),
        }
    }
}

/// Derives the saga status from the step statuses recorded so far.
///
/// Only the set of distinct values matters, not which step holds them. A
/// single leftover value anywhere in the map changes the outcome for the
/// whole saga, e.g. a stale `STARTED` next to `SUCCEEDED` keeps the saga
/// `STARTED` instead of `COMPLETED`.
///
/// An empty map yields `ABORTED`.
pub fn derive_status<'a, I>(statuses: I) -> SagaStatus
where
    I: IntoIterator<Item = &'a StepStatus>,
{
    let seen: BTreeSet<StepStatus> = statuses.into_iter().copied().collect();
    let only = |values: &[StepStatus]| {
        seen.len() == values.len() && values.iter().all(|v| seen.contains(v))
    };

    if only(&[StepStatus::Succeeded]) {
        SagaStatus::Completed
    } else if only(&[StepStatus::Started]) || only(&[StepStatus::Started, StepStatus::Succeeded]) {
        SagaStatus::Started
    } else if !seen.contains(&StepStatus::Compensating) {
        SagaStatus::Aborted
    } else {
        SagaStatus::Aborting
    }
}
