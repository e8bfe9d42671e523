//! An interpreter for a small integer-encoded instruction set.
//!
//! Programs are comma separated integers. The low two decimal digits of an instruction word pick
//! the [Opcode](op::Opcode), the higher digits pick an addressing [Mode](op::Mode) per parameter.
//!
//! ```
//! use vm::{ExecutionState, Vm};
//!
//! let mut vm = Vm::new("3,0,4,0,99")?;
//! assert_eq!(vm.run()?, ExecutionState::BlockedOnInput);
//! vm.input(42);
//! assert_eq!(vm.run()?, ExecutionState::Halted);
//! assert_eq!(vm.output()?, 42);
//! # Ok::<(), vm::VmError>(())
//! ```
pub mod bus;
pub mod error;
pub mod interpret;
pub mod memory;
pub mod op;
pub mod program;
pub mod state;

pub use error::VmError;
pub use interpret::Vm;
pub use program::Program;
pub use state::ExecutionState;

/// A memory cell, operand or I/O value
pub type Word = i64;
