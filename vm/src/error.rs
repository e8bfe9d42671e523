use thiserror::Error;

use crate::Word;

/// Failures reported by the [Vm](crate::Vm).
///
/// All of these are fatal for the current call. Memory, PC and buffers may be left mid-instruction,
/// so the only recovery is to [reboot](crate::Vm::reboot) or drop the instance.
///
/// Blocking on input is not an error, see [ExecutionState::BlockedOnInput](crate::ExecutionState).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("invalid program text: token {index} ({token:?}) is not an integer")]
    InvalidProgramText { index: usize, token: String },
    #[error("unknown opcode {opcode} at address {address}")]
    UnknownOpcode { opcode: Word, address: usize },
    #[error("address {address} is outside memory of length {len}")]
    MemoryOutOfBounds { address: Word, len: usize },
    #[error("output buffer is empty")]
    EmptyOutputRead,
}
