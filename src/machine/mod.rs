//! Mode state machine.
//!
//! - [`Mode`]: the bundled mode enumeration ([`Mode::Any`] is the wildcard).
//! - [`MachineState`]: what a state type must provide.
//! - [`StateMachine`]: enter/leave/transition/while callbacks over an observable state.

mod mode;
mod state_machine;

pub use mode::{MachineState, Mode};
pub use state_machine::StateMachine;
