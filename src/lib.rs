//! Drivers for running several [vm::Vm]s together.
//!
//! [pipeline::Pipeline] interleaves instances on one thread, pumping each one's output into the
//! next one's input. [threads::VmThread] gives an instance a thread of its own and talks to it over
//! channels.
pub mod pipeline;
pub mod threads;
#[cfg(feature = "tracing")]
pub mod trace;

pub use pipeline::{Pipeline, PipelineError};
pub use threads::{ThreadError, VmComms, VmThread};
pub use vm::{self, ExecutionState, Vm, VmError, Word};
