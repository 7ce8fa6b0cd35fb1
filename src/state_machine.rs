//! Core conversation state machine
//!
//! Pure state transitions over the fixed menu tree. The dispatcher owns
//! all I/O and executes the effects returned here.

mod effect;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use state::{ConvState, Conversation, Route};
pub use transition::{transition, TransitionResult};
