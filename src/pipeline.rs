use thiserror::Error;
use tracing::{debug, instrument, trace};
use vm::{Vm, VmError, Word};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage {stage}: {source}")]
    Vm {
        stage: usize,
        #[source]
        source: VmError,
    },
    #[error("every running stage is waiting for input that will never arrive")]
    Stalled,
    #[error("a pipeline needs at least one stage")]
    Empty,
}

/// VMs wired output-to-input, run in lockstep on the calling thread.
///
/// Stage `n`'s output becomes stage `n + 1`'s input. With [Pipeline::with_feedback] the last
/// stage also feeds the first.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Vm>,
    feedback: bool,
}

impl Pipeline {
    pub fn new(stages: impl IntoIterator<Item = Vm>) -> Result<Self, PipelineError> {
        let stages: Vec<Vm> = stages.into_iter().collect();
        if stages.is_empty() {
            return Err(PipelineError::Empty);
        }
        Ok(Self {
            stages,
            feedback: false,
        })
    }

    pub fn with_feedback(mut self) -> Self {
        self.feedback = true;
        self
    }

    /// Queue a value for the first stage.
    pub fn input(&mut self, value: Word) {
        self.stages[0].input(value);
    }

    pub fn stages(&self) -> &[Vm] {
        &self.stages
    }

    pub fn stage_mut(&mut self, index: usize) -> Option<&mut Vm> {
        self.stages.get_mut(index)
    }

    /// Run every stage in turn until the last one halts.
    ///
    /// Returns everything the last stage wrote, in order. When feeding back, those values have
    /// also been handed to the first stage.
    #[instrument(skip(self), fields(stages = self.stages.len(), feedback = self.feedback))]
    pub fn run(&mut self) -> Result<Vec<Word>, PipelineError> {
        let last = self.stages.len() - 1;
        let mut emitted = vec![];
        let mut round = 0usize;
        loop {
            let mut progressed = false;
            for stage in 0..self.stages.len() {
                let vm = &mut self.stages[stage];
                if vm.state().is_halted() || (vm.state().is_blocked() && vm.input_len() == 0) {
                    continue;
                }
                let state = vm
                    .run()
                    .map_err(|source| PipelineError::Vm { stage, source })?;
                let output: Vec<Word> = vm.drain_output().collect();
                trace!(round, stage, %state, values = output.len());
                progressed = true;

                if stage == last {
                    emitted.extend_from_slice(&output);
                    if self.feedback {
                        self.stages[0].extend_input(output);
                    }
                } else {
                    self.stages[stage + 1].extend_input(output);
                }
            }

            if self.stages[last].state().is_halted() {
                debug!(rounds = round + 1, values = emitted.len(), "pipeline finished");
                return Ok(emitted);
            }
            if !progressed {
                return Err(PipelineError::Stalled);
            }
            round += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use vm::{ExecutionState, Vm, VmError};

    use super::{Pipeline, PipelineError};

    fn amplifiers(source: &str, phases: &[i64]) -> Pipeline {
        let stages = phases.iter().map(|&phase| {
            let mut vm = Vm::new(source).unwrap();
            vm.input(phase);
            vm
        });
        Pipeline::new(stages).unwrap()
    }

    #[test]
    fn test_chain() {
        let mut pipeline = amplifiers(
            "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0",
            &[4, 3, 2, 1, 0],
        );
        pipeline.input(0);
        assert_eq!(pipeline.run().unwrap(), vec![43210]);
        assert!(pipeline
            .stages()
            .iter()
            .all(|vm| vm.state() == ExecutionState::Halted));
    }

    #[test]
    fn test_feedback_loop() {
        let mut pipeline = amplifiers(
            "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5",
            &[9, 8, 7, 6, 5],
        )
        .with_feedback();
        pipeline.input(0);
        let emitted = pipeline.run().unwrap();
        assert_eq!(emitted.last(), Some(&139629729));
    }

    #[test]
    fn test_starved_pipeline_stalls() {
        let stages = (0..2).map(|_| Vm::new("3,0,4,0,99").unwrap());
        let mut pipeline = Pipeline::new(stages).unwrap();
        assert!(matches!(pipeline.run(), Err(PipelineError::Stalled)));

        pipeline.input(5);
        assert_eq!(pipeline.run().unwrap(), vec![5]);
    }

    #[test]
    fn test_errors_name_the_stage() {
        let stages = ["3,0,4,0,99", "3,0,1,0,50,0,99"].map(|source| Vm::new(source).unwrap());
        let mut pipeline = Pipeline::new(stages).unwrap();
        pipeline.input(1);
        assert!(matches!(
            pipeline.run(),
            Err(PipelineError::Vm {
                stage: 1,
                source: VmError::MemoryOutOfBounds { address: 50, .. }
            })
        ));
    }

    #[test]
    fn test_empty_pipeline() {
        assert!(matches!(
            Pipeline::new(Vec::new()),
            Err(PipelineError::Empty)
        ));
    }
}
