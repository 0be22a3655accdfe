//! Saga definitions: a saga type bound to its step sequence.

use crate::error::{Result, SagaError};
use crate::step::{Step, StepSequence};

/// Immutable description of which steps a saga type runs, in order.
///
/// Built once at start-up and handed to whoever drives sagas of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaDefinition {
    saga_type: String,
    steps: StepSequence,
}

impl SagaDefinition {
    /// Creates a definition from a saga type name and its ordered steps.
    pub fn new<I, S>(saga_type: impl Into<String>, steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        let saga_type = saga_type.into();
        let steps = StepSequence::new(steps).map_err(|e| match e {
            SagaError::EmptySequence(_) => SagaError::EmptySequence(saga_type.clone()),
            other => other,
        })?;
        Ok(Self { saga_type, steps })
    }

    /// Returns the saga type name.
    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    /// Returns the step sequence.
    pub fn steps(&self) -> &StepSequence {
        &self.steps
    }
}
