use std::{fmt, ops::Range};

use chumsky::{prelude::*, span::SimpleSpan};
use itertools::Itertools;
use vm::{
    op::{Mode, Opcode},
    Word,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operand {
    pub mode: Mode,
    pub value: Word,
}

/// One line of assembly
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `add 9 #10 3`: a mnemonic and its parameters, `#` marking immediate mode
    Op {
        opcode: Opcode,
        operands: Vec<Operand>,
    },
    /// `data 30 40 50`: cells copied verbatim
    Data(Vec<Word>),
}

pub type Spanned<T> = (T, Range<usize>);

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Position => write!(f, "{}", self.value),
            Mode::Immediate => write!(f, "#{}", self.value),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Op { opcode, operands } if operands.is_empty() => f.write_str(opcode.mnemonic()),
            Stmt::Op { opcode, operands } => {
                write!(f, "{} {}", opcode.mnemonic(), operands.iter().join(" "))
            }
            Stmt::Data(words) => write!(f, "data {}", words.iter().join(" ")),
        }
    }
}

fn parser<'a>() -> impl Parser<'a, &'a str, Vec<Spanned<Stmt>>, extra::Err<Rich<'a, char>>> {
    let int = just('-')
        .or_not()
        .then(text::int(10))
        .try_map(|(sign, digits): (Option<char>, &str), span| {
            let digits = match sign {
                Some(_) => format!("-{digits}"),
                None => digits.to_string(),
            };
            digits
                .parse::<Word>()
                .map_err(|err| Rich::custom(span, err.to_string()))
        });

    let operand = just('#').or_not().then(int.clone()).map(|(hash, value)| Operand {
        mode: match hash {
            Some(_) => Mode::Immediate,
            None => Mode::Position,
        },
        value,
    });

    let mnemonic = choice((
        just("add").to(Opcode::Add),
        just("mul").to(Opcode::Multiply),
        just("in").to(Opcode::ReadInput),
        just("out").to(Opcode::WriteOutput),
        just("jnz").to(Opcode::JumpIfNonZero),
        just("jz").to(Opcode::JumpIfZero),
        just("lt").to(Opcode::LessThan),
        just("eq").to(Opcode::Equals),
        just("hlt").to(Opcode::Halt),
    ));

    // Operands only eat the whitespace in front of them so statement spans end at their last character
    let op = mnemonic
        .then(
            text::whitespace()
                .at_least(1)
                .ignore_then(operand)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map(|(opcode, operands)| Stmt::Op { opcode, operands });

    let data = just("data")
        .ignore_then(
            text::whitespace()
                .at_least(1)
                .ignore_then(int)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map(Stmt::Data);

    choice((data, op))
        .map_with(|stmt, e| {
            let span: SimpleSpan = e.span();
            (stmt, span.into_range())
        })
        .separated_by(text::whitespace().at_least(1))
        .collect()
        .padded()
        .then_ignore(end())
}

pub fn parse(s: &str) -> Result<Vec<Spanned<Stmt>>, Vec<Rich<'_, char>>> {
    parser().parse(s).into_result()
}
