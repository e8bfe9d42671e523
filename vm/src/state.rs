use std::fmt;

/// Whether the [Vm](crate::Vm) can make progress.
///
/// ```text
/// Initialized --run--> Running --halt--> Halted
///                        |  ^
///         empty input    v  |  run
///                   BlockedOnInput
/// ```
///
/// Only [Vm::run](crate::Vm::run) and [Vm::reboot](crate::Vm::reboot) change it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    #[default]
    Initialized,
    Running,
    /// A read-input instruction found the input buffer empty. The PC still points at it.
    BlockedOnInput,
    Halted,
}

impl ExecutionState {
    pub fn is_halted(self) -> bool {
        self == ExecutionState::Halted
    }

    pub fn is_blocked(self) -> bool {
        self == ExecutionState::BlockedOnInput
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionState::Initialized => "initialized",
            ExecutionState::Running => "running",
            ExecutionState::BlockedOnInput => "blocked on input",
            ExecutionState::Halted => "halted",
        };
        f.write_str(name)
    }
}
