use itertools::Itertools;
use vm::{
    op::{Instruction, Mode},
    Word,
};

use crate::parse::{Operand, Stmt};

/// Recover assembly from memory, one statement per instruction.
///
/// Cells that don't form an instruction the assembler would produce are grouped into `data`
/// statements, so [listing] always reassembles to the same words.
pub fn disassemble(words: &[Word]) -> Vec<(usize, Stmt)> {
    let mut lines = vec![];
    let mut data: Option<(usize, Vec<Word>)> = None;
    let mut address = 0;
    while let Some(&word) = words.get(address) {
        match decode_at(words, address) {
            Some((stmt, width)) => {
                if let Some((start, cells)) = data.take() {
                    lines.push((start, Stmt::Data(cells)));
                }
                lines.push((address, stmt));
                address += width;
            }
            None => {
                data.get_or_insert_with(|| (address, vec![])).1.push(word);
                address += 1;
            }
        }
    }
    if let Some((start, cells)) = data {
        lines.push((start, Stmt::Data(cells)));
    }
    lines
}

/// Source text for `words`, one statement per line.
pub fn listing(words: &[Word]) -> String {
    disassemble(words)
        .into_iter()
        .map(|(_, stmt)| stmt)
        .join("\n")
}

/// The instruction at `address` and the number of cells it occupies.
fn decode_at(words: &[Word], address: usize) -> Option<(Stmt, usize)> {
    let word = *words.get(address)?;
    let instruction = Instruction::decode(word, address).ok()?;
    let opcode = instruction.opcode;
    let modes = instruction.modes().collect_vec();
    // Stray flag digits and immediate destinations have no assembly spelling
    if Instruction::encode(opcode, &modes) != word
        || (opcode.writes_memory() && modes.last() == Some(&Mode::Immediate))
    {
        return None;
    }
    let params = words.get(address + 1..address + 1 + opcode.arity())?;
    let stmt = Stmt::Op {
        opcode,
        operands: modes
            .into_iter()
            .zip(params)
            .map(|(mode, &value)| Operand { mode, value })
            .collect(),
    };
    Some((stmt, 1 + params.len()))
}
