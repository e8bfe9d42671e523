use std::ops::Range;

use itertools::Itertools;
use thiserror::Error;
use vm::{
    op::{Instruction, Mode, Opcode},
    Word,
};

use crate::parse::{Spanned, Stmt};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("`{}` takes {} operands, found {found}", .opcode.mnemonic(), .opcode.arity())]
    Arity {
        opcode: Opcode,
        found: usize,
        span: Range<usize>,
    },
    #[error("the destination of `{}` can't be immediate", .opcode.mnemonic())]
    ImmediateDestination { opcode: Opcode, span: Range<usize> },
}

impl AssembleError {
    pub fn span(&self) -> Range<usize> {
        match self {
            AssembleError::Arity { span, .. } | AssembleError::ImmediateDestination { span, .. } => {
                span.clone()
            }
        }
    }
}

/// Lay the statements out in memory, starting at address 0.
///
/// Reports every bad statement rather than stopping at the first.
pub fn assemble<'a>(
    stmts: impl IntoIterator<Item = &'a Spanned<Stmt>>,
) -> Result<Vec<Word>, Vec<AssembleError>> {
    let words = stmts.into_iter().map(|(stmt, span)| match stmt {
        Stmt::Data(words) => Ok(words.clone()),
        Stmt::Op { opcode, operands } => {
            let opcode = *opcode;
            if operands.len() != opcode.arity() {
                return Err(AssembleError::Arity {
                    opcode,
                    found: operands.len(),
                    span: span.clone(),
                });
            }
            if opcode.writes_memory()
                && operands.last().map(|operand| operand.mode) == Some(Mode::Immediate)
            {
                return Err(AssembleError::ImmediateDestination {
                    opcode,
                    span: span.clone(),
                });
            }
            let modes = operands.iter().map(|operand| operand.mode).collect_vec();
            Ok(std::iter::once(Instruction::encode(opcode, &modes))
                .chain(operands.iter().map(|operand| operand.value))
                .collect_vec())
        }
    });
    let (words, errs): (Vec<Vec<Word>>, Vec<AssembleError>) = words.partition_result();
    if !errs.is_empty() {
        return Err(errs);
    }
    Ok(words.into_iter().flatten().collect())
}

/// The comma separated form [vm::Vm::new] loads.
pub fn to_program_text(words: &[Word]) -> String {
    words.iter().join(",")
}
