//! Operating modes of a robot program.

use std::fmt::Debug;
use std::hash::Hash;

/// A state usable by [`StateMachine`](crate::StateMachine).
///
/// One value may act as a wildcard: `expand` maps it to every concrete state
/// and maps any other value to itself.
pub trait MachineState: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    fn expand(self) -> Vec<Self>;
}

/// Externally classified mode; [`Mode::Any`] matches every other mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    None,
    Any,
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl Mode {
    /// Every mode except the wildcard.
    pub const CONCRETE: [Mode; 5] = [
        Mode::None,
        Mode::Disabled,
        Mode::Autonomous,
        Mode::Teleop,
        Mode::Test,
    ];
}

impl MachineState for Mode {
    fn expand(self) -> Vec<Self> {
        match self {
            Mode::Any => Mode::CONCRETE.to_vec(),
            mode => vec![mode],
        }
    }
}
