//! Saga steps and their fixed ordering.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};

/// Name of one participant's unit of work within a saga.
///
/// The step name is also the logical stream a command for this step is
/// routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Step(String);

impl Step {
    /// Creates a step from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the step name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Step {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An ordered, non-empty list of distinct steps. Lookups are positional,
/// there is no branching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSequence {
    steps: Vec<Step>,
}

impl StepSequence {
    /// Builds a sequence, rejecting empty lists and repeated step names.
    pub fn new<I, S>(steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        let steps: Vec<Step> = steps.into_iter().map(Into::into).collect();
        if steps.is_empty() {
            return Err(SagaError::EmptySequence(String::new()));
        }
        for (i, step) in steps.iter().enumerate() {
            if steps[..i].contains(step) {
                return Err(SagaError::DuplicateStep(step.to_string()));
            }
        }
        Ok(Self { steps })
    }

    /// Returns the first step.
    pub fn first(&self) -> &Step {
        &self.steps[0]
    }

    /// Returns all steps in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false, sequences are never empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns true if `step` belongs to this sequence.
    pub fn contains(&self, step: &Step) -> bool {
        self.position(step).is_some()
    }

    fn position(&self, step: &Step) -> Option<usize> {
        self.steps.iter().position(|s| s == step)
    }

    /// Returns the step right after `current`.
    ///
    /// With no current step this is the first step. Returns `None` when
    /// `current` is the last step or not part of the sequence.
    pub fn next_step(&self, current: Option<&Step>) -> Option<&Step> {
        match current {
            None => Some(self.first()),
            Some(step) => self.position(step).and_then(|i| self.steps.get(i + 1)),
        }
    }

    /// Returns the step right before `current`.
    ///
    /// Returns `None` when `current` is the first step, absent, or not part
    /// of the sequence.
    pub fn prev_step(&self, current: Option<&Step>) -> Option<&Step> {
        let i = self.position(current?)?;
        i.checked_sub(1).map(|prev| &self.steps[prev])
    }
}
