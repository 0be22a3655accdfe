use saga::{SagaDefinition, room_reservation};

/// Orchestrator settings, built once at start-up and shared read-only.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Saga type and step order driven by the controller.
    pub definition: SagaDefinition,
    /// Makes saga updates conditional on the version that was loaded.
    pub optimistic_locking: bool,
    /// Only consumes results for sagas that have no current step, instead
    /// of applying them.
    pub ignore_terminated_results: bool,
    /// Handoff buffer between an ingestion stage and the controller.
    pub ingest_buffer: usize,
}

impl OrchestratorConfig {
    pub fn with_optimistic_locking(mut self, enabled: bool) -> Self {
        self.optimistic_locking = enabled;
        self
    }

    pub fn with_ignore_terminated_results(mut self, enabled: bool) -> Self {
        self.ignore_terminated_results = enabled;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            definition: room_reservation::definition(),
            optimistic_locking: false,
            ignore_terminated_results: false,
            ingest_buffer: 1,
        }
    }
}
