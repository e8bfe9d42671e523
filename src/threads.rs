use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, trace};
use vm::{Vm, VmError, Word};

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error(transparent)]
    Vm(#[from] VmError),
    #[error("vm thread panicked")]
    Panicked,
}

/// Runs a [Vm] on its own thread, talking over channels.
///
/// Waiting for input turns into a blocking `recv`, so several of these can be chained by handing
/// one thread's output sender to the next as its input.
pub struct VmThread {
    vm: Vm,
}

#[derive(derive_more::Debug)]
pub struct VmComms {
    pub input: Sender<Word>,
    pub output: Receiver<Word>,
    #[debug(ignore)]
    handle: JoinHandle<Result<Vm, VmError>>,
}

impl VmComms {
    /// Wait for the VM to halt and get it back.
    pub fn join(self) -> Result<Vm, ThreadError> {
        let vm = self.handle.join().map_err(|_| ThreadError::Panicked)??;
        Ok(vm)
    }
}

impl VmThread {
    pub fn new(vm: Vm) -> Self {
        Self { vm }
    }

    pub fn spawn(self) -> VmComms {
        let (input, inputs) = unbounded();
        let (outputs, output) = unbounded();
        let handle = self.spawn_with(inputs, outputs);
        VmComms {
            input,
            output,
            handle,
        }
    }

    /// Spawn using channels the caller already owns.
    ///
    /// The thread finishes when the VM halts, or when it is blocked and every input sender is gone.
    pub fn spawn_with(
        mut self,
        inputs: Receiver<Word>,
        outputs: Sender<Word>,
    ) -> JoinHandle<Result<Vm, VmError>> {
        thread::spawn(move || {
            #[cfg(feature = "tracing")]
            tracy_client::set_thread_name!("vm");
            loop {
                let state = self.vm.run()?;
                for value in self.vm.drain_output() {
                    // Nobody listening is fine, the values are dropped
                    let _ = outputs.send(value);
                }
                if state.is_halted() {
                    debug!("vm thread halted");
                    return Ok(self.vm);
                }
                match inputs.recv() {
                    Ok(value) => {
                        trace!(value, "vm thread received input");
                        self.vm.input(value);
                        self.vm.extend_input(inputs.try_iter());
                    }
                    Err(_) => {
                        debug!(pc = self.vm.pc(), "input closed while blocked");
                        return Ok(self.vm);
                    }
                }
            }
        })
    }
}
