//! Room reservation saga constants.

use crate::definition::SagaDefinition;
use crate::step::Step;

/// The saga type identifier for room reservations.
pub const SAGA_TYPE: &str = "room-reservation";

/// Step name: book the room at the hotel.
pub const STEP_ROOM_BOOKING: &str = "room-booking";

/// Step name: charge the guest.
pub const STEP_PAYMENT: &str = "payment";

/// Returns the room reservation saga: book the room, then take the payment.
pub fn definition() -> SagaDefinition {
    SagaDefinition::new(SAGA_TYPE, [STEP_ROOM_BOOKING, STEP_PAYMENT])
        .unwrap_or_else(|e| unreachable!("static room reservation definition is valid: {e}"))
}

/// Returns the room booking step.
pub fn room_booking() -> Step {
    Step::new(STEP_ROOM_BOOKING)
}

/// Returns the payment step.
pub fn payment() -> Step {
    Step::new(STEP_PAYMENT)
}
