use crate::{error::VmError, Word};

/// The instruction set.
///
/// The discriminant is the opcode as it appears in the low two decimal digits of an instruction
/// word. This enum doubles as the dispatch table: [Opcode::parse] is the lookup and
/// [Opcode::word_size] is the amount the PC advances after the handler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Opcode {
    /// `mem[dst] = a + b`
    Add = 1,
    /// `mem[dst] = a * b`
    Multiply = 2,
    /// `mem[dst] = input.pop()`, blocking the VM while the input buffer is empty
    ReadInput = 3,
    /// `output.push(a)`
    WriteOutput = 4,
    /// `pc = if a != 0 { b } else { pc + 3 }`
    JumpIfNonZero = 5,
    /// `pc = if a == 0 { b } else { pc + 3 }`
    JumpIfZero = 6,
    /// `mem[dst] = (a < b) as Word`
    LessThan = 7,
    /// `mem[dst] = (a == b) as Word`
    Equals = 8,
    Halt = 99,
}

impl Opcode {
    pub const ALL: [Opcode; 9] = [
        Opcode::Add,
        Opcode::Multiply,
        Opcode::ReadInput,
        Opcode::WriteOutput,
        Opcode::JumpIfNonZero,
        Opcode::JumpIfZero,
        Opcode::LessThan,
        Opcode::Equals,
        Opcode::Halt,
    ];

    pub fn parse(code: Word) -> Option<Opcode> {
        Some(match code {
            1 => Opcode::Add,
            2 => Opcode::Multiply,
            3 => Opcode::ReadInput,
            4 => Opcode::WriteOutput,
            5 => Opcode::JumpIfNonZero,
            6 => Opcode::JumpIfZero,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            99 => Opcode::Halt,
            _ => return None,
        })
    }

    pub fn code(self) -> Word {
        self as Word
    }

    /// How far the PC moves once the instruction has executed.
    ///
    /// Jumps set the PC themselves and report 0.
    pub const fn word_size(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 4,
            Opcode::ReadInput | Opcode::WriteOutput => 2,
            Opcode::JumpIfNonZero | Opcode::JumpIfZero => 0,
            Opcode::Halt => 1,
        }
    }

    /// Number of parameter cells following the opcode cell.
    pub const fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfNonZero | Opcode::JumpIfZero => 2,
            Opcode::ReadInput | Opcode::WriteOutput => 1,
            Opcode::Halt => 0,
        }
    }

    /// Whether the last parameter is a write destination.
    ///
    /// Destinations are always addresses, regardless of their flag digit.
    pub const fn writes_memory(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Multiply | Opcode::ReadInput | Opcode::LessThan | Opcode::Equals
        )
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Multiply => "mul",
            Opcode::ReadInput => "in",
            Opcode::WriteOutput => "out",
            Opcode::JumpIfNonZero => "jnz",
            Opcode::JumpIfZero => "jz",
            Opcode::LessThan => "lt",
            Opcode::Equals => "eq",
            Opcode::Halt => "hlt",
        }
    }
}

/// How a parameter cell is turned into an operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Mode {
    /// The cell holds the address of the operand
    #[default]
    Position,
    /// The cell is the operand
    Immediate,
}

impl Mode {
    /// Any digit other than `1` falls back to position mode.
    pub fn from_digit(digit: Word) -> Mode {
        if digit == 1 {
            Mode::Immediate
        } else {
            Mode::Position
        }
    }

    pub fn digit(self) -> Word {
        match self {
            Mode::Position => 0,
            Mode::Immediate => 1,
        }
    }
}

/// A decoded instruction word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Everything above the opcode digits, one decimal digit per parameter starting with the first
    flags: Word,
}

impl Instruction {
    /// Decodes `word`, found at `address`.
    pub fn decode(word: Word, address: usize) -> Result<Instruction, VmError> {
        let opcode = Opcode::parse(word % 100).ok_or(VmError::UnknownOpcode {
            opcode: word % 100,
            address,
        })?;
        Ok(Instruction {
            opcode,
            flags: word / 100,
        })
    }

    /// Builds the word for `opcode` with the given parameter modes, first parameter first.
    pub fn encode(opcode: Opcode, modes: &[Mode]) -> Word {
        let flags = modes
            .iter()
            .rev()
            .fold(0, |flags, mode| flags * 10 + mode.digit());
        flags * 100 + opcode.code()
    }

    /// The addressing mode of parameter `pos` (0 is the first parameter).
    pub fn mode(&self, pos: usize) -> Mode {
        let mut flags = self.flags;
        for _ in 0..pos {
            flags /= 10;
        }
        Mode::from_digit(flags % 10)
    }

    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        (0..self.opcode.arity()).map(|pos| self.mode(pos))
    }
}
