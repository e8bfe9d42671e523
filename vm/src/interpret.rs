use std::fmt;

use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::{
    bus::Fifo,
    error::VmError,
    memory::Memory,
    op::{Instruction, Mode, Opcode},
    program::Program,
    state::ExecutionState,
    Word,
};

/// A resumable interpreter for one program
///
/// Construct it from program text, feed it with [Vm::input], call [Vm::run] and collect results
/// with [Vm::output]. `run` returns [ExecutionState::BlockedOnInput] instead of waiting when it
/// needs a value nobody has provided yet; calling it again after [Vm::input] picks up at the same
/// instruction.
#[derive(Clone, Debug)]
pub struct Vm {
    program: Program,
    memory: Memory,
    /// Address of the next instruction to decode
    ///
    /// Only valid while running. After a halt it points past the halt instruction.
    pc: usize,
    input: Fifo,
    output: Fifo,
    state: ExecutionState,
}

impl Vm {
    pub fn new(source: &str) -> Result<Self, VmError> {
        Ok(Self::from_program(Program::parse(source)?))
    }

    pub fn from_program(program: Program) -> Self {
        Self {
            memory: program.load(),
            program,
            pc: 0,
            input: Fifo::default(),
            output: Fifo::default(),
            state: ExecutionState::Initialized,
        }
    }

    /// Throw away everything that happened since construction.
    ///
    /// Restores the original memory, empties both buffers and moves the PC back to 0.
    pub fn reboot(&mut self) {
        self.memory = self.program.load();
        self.pc = 0;
        self.input.clear();
        self.output.clear();
        self.state = ExecutionState::Initialized;
        debug!("rebooted");
    }

    /// Queue a value for the next read-input instruction.
    pub fn input(&mut self, value: Word) {
        self.input.push(value);
    }

    pub fn extend_input(&mut self, values: impl IntoIterator<Item = Word>) {
        self.input.extend(values);
    }

    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// Take the oldest value the program wrote.
    pub fn output(&mut self) -> Result<Word, VmError> {
        self.output.pop().ok_or(VmError::EmptyOutputRead)
    }

    /// Everything written so far that hasn't been taken with [Vm::output], oldest first.
    pub fn peek_output(&self) -> impl Iterator<Item = Word> + '_ {
        self.output.iter()
    }

    /// Take all pending output, oldest first.
    pub fn drain_output(&mut self) -> impl Iterator<Item = Word> + '_ {
        self.output.drain()
    }

    pub fn read_memory(&self, address: usize) -> Result<Word, VmError> {
        self.memory.get(address)
    }

    pub fn write_memory(&mut self, address: usize, value: Word) -> Result<(), VmError> {
        self.memory.set(address, value)
    }

    pub fn memory(&self) -> &[Word] {
        self.memory.as_slice()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// The text this VM was built from.
    pub fn source(&self) -> &str {
        self.program.source()
    }

    /// `[pc] v0, v1, ...`, for eyeballing only.
    pub fn debug_dump(&self) -> String {
        self.to_string()
    }

    /// Execute until the program halts or waits for input.
    ///
    /// Running a halted VM is allowed: it decodes whatever the PC points at, which is the cell
    /// after the halt instruction.
    #[instrument(skip(self), fields(pc = self.pc, state = %self.state))]
    pub fn run(&mut self) -> Result<ExecutionState, VmError> {
        self.execute(None)
    }

    /// Like [Vm::run], but gives up after `max_instructions`.
    ///
    /// Returns [ExecutionState::Running] if the budget ran out first. Calling either run method
    /// again continues from the current PC. A budget of 0 leaves the VM as it is.
    #[instrument(skip(self), fields(pc = self.pc, state = %self.state))]
    pub fn run_limited(&mut self, max_instructions: usize) -> Result<ExecutionState, VmError> {
        self.execute(Some(max_instructions))
    }

    fn execute(&mut self, max_instructions: Option<usize>) -> Result<ExecutionState, VmError> {
        if max_instructions == Some(0) {
            return Ok(self.state);
        }
        self.state = ExecutionState::Running;
        let mut total_for_run = 0;
        while self.state == ExecutionState::Running {
            if max_instructions.is_some_and(|max| total_for_run >= max) {
                debug!(total_for_run, "instruction budget exhausted");
                break;
            }
            #[cfg(feature = "tracing")]
            {
                tracy_client::plot!("PC", self.pc as f64);
                tracy_client::plot!("total_for_run", total_for_run as f64);
            }
            self.step()?;
            total_for_run += 1;
        }
        Ok(self.state)
    }

    /// Decode and execute the instruction at the PC.
    fn step(&mut self) -> Result<(), VmError> {
        let instruction = Instruction::decode(self.memory.get(self.pc)?, self.pc)?;
        trace!(pc = self.pc, opcode = ?instruction.opcode);

        match instruction.opcode {
            Opcode::Add => {
                let (a, b) = (self.arg(&instruction, 0)?, self.arg(&instruction, 1)?);
                self.store(2, a.wrapping_add(b))?;
            }
            Opcode::Multiply => {
                let (a, b) = (self.arg(&instruction, 0)?, self.arg(&instruction, 1)?);
                self.store(2, a.wrapping_mul(b))?;
            }
            Opcode::ReadInput => {
                // Leave everything untouched so the same instruction is decoded again on resume
                let Some(value) = self.input.pop() else {
                    debug!(pc = self.pc, "blocked on input");
                    self.state = ExecutionState::BlockedOnInput;
                    return Ok(());
                };
                self.store(0, value)?;
            }
            Opcode::WriteOutput => {
                let a = self.arg(&instruction, 0)?;
                self.output.push(a);
            }
            Opcode::JumpIfNonZero => {
                let a = self.arg(&instruction, 0)?;
                self.jump_if(&instruction, a != 0)?;
            }
            Opcode::JumpIfZero => {
                let a = self.arg(&instruction, 0)?;
                self.jump_if(&instruction, a == 0)?;
            }
            Opcode::LessThan => {
                let (a, b) = (self.arg(&instruction, 0)?, self.arg(&instruction, 1)?);
                self.store(2, Word::from(a < b))?;
            }
            Opcode::Equals => {
                let (a, b) = (self.arg(&instruction, 0)?, self.arg(&instruction, 1)?);
                self.store(2, Word::from(a == b))?;
            }
            Opcode::Halt => {
                debug!(pc = self.pc, "halted");
                self.state = ExecutionState::Halted;
            }
        }

        self.pc += instruction.opcode.word_size();
        Ok(())
    }

    /// The raw cell of parameter `pos`.
    fn param(&self, pos: usize) -> Result<Word, VmError> {
        self.memory.get(self.pc + 1 + pos)
    }

    /// Parameter `pos` resolved through its addressing mode.
    fn arg(&self, instruction: &Instruction, pos: usize) -> Result<Word, VmError> {
        let raw = self.param(pos)?;
        match instruction.mode(pos) {
            Mode::Immediate => Ok(raw),
            Mode::Position => self.memory.get(self.memory.address(raw)?),
        }
    }

    /// Writes to the address held by parameter `pos`. Destinations ignore their flag digit.
    fn store(&mut self, pos: usize, value: Word) -> Result<(), VmError> {
        let address = self.memory.address(self.param(pos)?)?;
        self.memory.set(address, value)
    }

    fn jump_if(&mut self, instruction: &Instruction, condition: bool) -> Result<(), VmError> {
        if condition {
            let target = self.arg(instruction, 1)?;
            self.pc = self.memory.address(target)?;
        } else {
            self.pc += 3;
        }
        Ok(())
    }
}

impl fmt::Display for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pc, self.memory.as_slice().iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::Vm;
    use crate::{error::VmError, state::ExecutionState};

    fn run(source: &str) -> Vm {
        let mut vm = Vm::new(source).unwrap();
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        vm
    }

    #[test]
    fn test_add_in_place() {
        let vm = run("1,0,0,0,99");
        assert_eq!(vm.memory(), &[2, 0, 0, 0, 99]);
    }

    #[test]
    fn test_add_then_multiply() {
        let vm = run("1,9,10,3,2,3,11,0,99,30,40,50");
        assert_eq!(vm.read_memory(0), Ok(3500));
    }

    #[test]
    fn test_echo_input() {
        let mut vm = Vm::new("3,0,4,0,99").unwrap();
        vm.input(42);
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        assert_eq!(vm.output(), Ok(42));
        assert_eq!(vm.output(), Err(VmError::EmptyOutputRead));
    }

    #[test]
    fn test_equals_in_position_mode() {
        let source = "3,9,8,9,10,9,4,9,99,-1,8";
        let mut vm = Vm::new(source).unwrap();
        vm.input(8);
        vm.run().unwrap();
        assert_eq!(vm.output(), Ok(1));

        let mut vm = Vm::new(source).unwrap();
        vm.input(7);
        vm.run().unwrap();
        assert_eq!(vm.output(), Ok(0));
    }

    #[test]
    fn test_less_than_in_immediate_mode() {
        let source = "3,3,1107,-1,8,3,4,3,99";
        for (input, expected) in [(5, 1), (8, 0), (-20, 1)] {
            let mut vm = Vm::new(source).unwrap();
            vm.input(input);
            vm.run().unwrap();
            assert_eq!(vm.output(), Ok(expected));
        }
    }

    #[test]
    fn test_mixed_modes() {
        let mut vm = Vm::new("1002,4,3,4,33").unwrap();
        vm.step().unwrap();
        assert_eq!(vm.read_memory(4), Ok(99));
        assert_eq!(vm.pc(), 4);
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
    }

    #[test]
    fn test_jumping() {
        // Outputs 0 if the input was 0, 1 otherwise
        let source = "3,12,6,12,15,1,13,14,13,4,13,99,-1,0,1,9";
        for (input, expected) in [(0, 0), (5, 1)] {
            let mut vm = Vm::new(source).unwrap();
            vm.input(input);
            vm.run().unwrap();
            assert_eq!(vm.output(), Ok(expected));
        }

        let source = "3,3,1105,-1,9,1101,0,0,12,4,12,99,1";
        for (input, expected) in [(0, 0), (-3, 1)] {
            let mut vm = Vm::new(source).unwrap();
            vm.input(input);
            vm.run().unwrap();
            assert_eq!(vm.output(), Ok(expected));
        }
    }

    #[test]
    fn test_blocking_resumes_at_the_same_instruction() {
        let mut vm = Vm::new("3,11,3,12,1,11,12,13,4,13,99,0,0,0").unwrap();
        assert_eq!(vm.run(), Ok(ExecutionState::BlockedOnInput));
        assert_eq!(vm.pc(), 0);

        vm.input(20);
        assert_eq!(vm.run(), Ok(ExecutionState::BlockedOnInput));
        assert_eq!(vm.pc(), 2);
        assert_eq!(vm.read_memory(11), Ok(20));

        vm.input(22);
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        assert_eq!(vm.output(), Ok(42));
    }

    #[test]
    fn test_blocked_instruction_is_decoded_again() {
        let mut vm = Vm::new("3,5,4,5,99,0").unwrap();
        assert_eq!(vm.run(), Ok(ExecutionState::BlockedOnInput));
        // Patch the blocked instruction into an output of its own parameter
        vm.write_memory(0, 104).unwrap();
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        assert_eq!(vm.drain_output().collect::<Vec<_>>(), vec![5, 0]);
    }

    #[test]
    fn test_input_is_consumed_in_order() {
        let mut vm = Vm::new("3,0,4,0,3,0,4,0,99").unwrap();
        vm.extend_input([7, 9]);
        vm.run().unwrap();
        assert_eq!(vm.input_len(), 0);
        assert_eq!(vm.drain_output().collect::<Vec<_>>(), vec![7, 9]);
    }

    #[test]
    fn test_peek_output_does_not_consume() {
        let mut vm = Vm::new("104,1,104,2,99").unwrap();
        vm.run().unwrap();
        assert_eq!(vm.peek_output().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(vm.peek_output().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(vm.output(), Ok(1));
        assert_eq!(vm.peek_output().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_output_persists_across_runs() {
        let mut vm = Vm::new("104,1,3,0,104,2,99").unwrap();
        assert_eq!(vm.run(), Ok(ExecutionState::BlockedOnInput));
        vm.input(0);
        vm.run().unwrap();
        assert_eq!(vm.peek_output().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_reboot_restores_everything() {
        let mut vm = Vm::new("3,0,4,0,99").unwrap();
        vm.extend_input([5, 6]);
        vm.run().unwrap();
        vm.write_memory(4, 1).unwrap();
        vm.reboot();

        assert_eq!(vm.state(), ExecutionState::Initialized);
        assert_eq!(vm.memory(), &[3, 0, 4, 0, 99]);
        assert_eq!(vm.pc(), 0);
        assert_eq!(vm.input_len(), 0);
        assert_eq!(vm.peek_output().count(), 0);
        assert_eq!(vm.source(), "3,0,4,0,99");
    }

    #[test]
    fn test_running_a_halted_vm_decodes_the_next_cell() {
        let mut vm = Vm::new("104,7,99,99").unwrap();
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        assert_eq!(vm.pc(), 3);
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        assert_eq!(vm.pc(), 4);
        assert_eq!(
            vm.run(),
            Err(VmError::MemoryOutOfBounds { address: 4, len: 4 })
        );
        assert_eq!(vm.output(), Ok(7));
    }

    #[test]
    fn test_memory_access_is_bounds_checked() {
        let mut vm = Vm::new("99").unwrap();
        assert_eq!(
            vm.read_memory(1),
            Err(VmError::MemoryOutOfBounds { address: 1, len: 1 })
        );
        assert!(vm.write_memory(1, 0).is_err());
        vm.write_memory(0, 1).unwrap();
        assert_eq!(vm.read_memory(0), Ok(1));
    }

    #[test]
    fn test_operand_addresses_are_bounds_checked() {
        let mut vm = Vm::new("1,0,50,0,99").unwrap();
        assert_eq!(
            vm.run(),
            Err(VmError::MemoryOutOfBounds { address: 50, len: 5 })
        );

        let mut vm = Vm::new("4,-1,99").unwrap();
        assert_eq!(
            vm.run(),
            Err(VmError::MemoryOutOfBounds { address: -1, len: 3 })
        );
    }

    #[test]
    fn test_jump_targets_are_bounds_checked() {
        let mut vm = Vm::new("1105,1,20,99").unwrap();
        assert_eq!(
            vm.run(),
            Err(VmError::MemoryOutOfBounds { address: 20, len: 4 })
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let mut vm = Vm::new("1101,20,22,4,99").unwrap();
        assert_eq!(
            vm.run(),
            Err(VmError::UnknownOpcode {
                opcode: 42,
                address: 4
            })
        );
        assert_eq!(vm.state(), ExecutionState::Running);
    }

    #[test]
    fn test_invalid_program_text() {
        assert!(matches!(
            Vm::new("1,2,three"),
            Err(VmError::InvalidProgramText { index: 2, .. })
        ));
    }

    #[test]
    fn test_arithmetic_wraps() {
        let mut vm = Vm::new("1102,9223372036854775807,2,5,99,0").unwrap();
        vm.run().unwrap();
        assert_eq!(vm.read_memory(5), Ok(-2));
    }

    #[test]
    fn test_budget_pauses_and_resumes() {
        // Counts down from 3, writing each value
        let source = "4,13,1001,13,-1,13,1005,13,0,99,0,0,0,3";
        let mut vm = Vm::new(source).unwrap();
        assert_eq!(vm.run_limited(2), Ok(ExecutionState::Running));
        assert_eq!(vm.pc(), 6);
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        assert_eq!(vm.drain_output().collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_infinite_loop_is_cut_short_by_budget() {
        let mut vm = Vm::new("1105,1,0").unwrap();
        assert_eq!(vm.run_limited(1000), Ok(ExecutionState::Running));
        assert_eq!(vm.pc(), 0);
    }

    #[test]
    fn test_zero_budget_changes_nothing() {
        let mut vm = Vm::new("99").unwrap();
        assert_eq!(vm.run_limited(0), Ok(ExecutionState::Initialized));
        assert_eq!(vm.run(), Ok(ExecutionState::Halted));
        assert_eq!(vm.run_limited(0), Ok(ExecutionState::Halted));
        assert_eq!(vm.state(), ExecutionState::Halted);
        assert_eq!(vm.pc(), 1);
    }

    #[test]
    fn test_debug_dump() {
        let mut vm = Vm::new("1,0,0,0,99").unwrap();
        assert_eq!(vm.debug_dump(), "[0] 1, 0, 0, 0, 99");
        vm.run().unwrap();
        assert_eq!(vm.debug_dump(), "[5] 2, 0, 0, 0, 99");
    }

    proptest! {
        #[test]
        fn test_never_panics(
            program in prop::collection::vec(-200..20_000i64, 1..64),
            inputs in prop::collection::vec(any::<i64>(), 0..4),
        ) {
            let source = program.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
            let mut vm = Vm::new(&source).unwrap();
            vm.extend_input(inputs);
            let _ = vm.run_limited(512);
        }
    }
}
