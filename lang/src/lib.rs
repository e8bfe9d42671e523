//! Assembly language for the [vm] instruction set.
//!
//! ```text
//! in 9
//! eq 9 #8 9
//! out 9
//! hlt
//! data -1
//! ```
//!
//! assembles to `3,9,1008,9,8,9,4,9,99,-1`. Operands are addresses unless prefixed with `#`,
//! which makes them immediate. `data` copies its integers into memory as they are.
use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use thiserror::Error;
use tracing::debug;
use vm::Word;

pub mod assemble;
pub mod disassemble;
pub mod parse;

use assemble::AssembleError;

#[derive(Debug, Error)]
pub enum LangError {
    #[error("{} syntax error(s)", .0.len())]
    Syntax(Vec<Diagnostic>),
    #[error("{} assembly error(s)", .0.len())]
    Assemble(Vec<AssembleError>),
}

/// A message attached to a range of the source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Range<usize>,
}

impl LangError {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            LangError::Syntax(diagnostics) => diagnostics.clone(),
            LangError::Assemble(errs) => errs
                .iter()
                .map(|err| Diagnostic {
                    message: err.to_string(),
                    span: err.span(),
                })
                .collect(),
        }
    }

    /// Human readable reports pointing into `src`.
    pub fn render(&self, src: &str) -> String {
        let mut out = vec![];
        for diagnostic in self.diagnostics() {
            let _ = Report::build(ReportKind::Error, diagnostic.span.clone())
                .with_config(Config::default().with_color(false))
                .with_message(&diagnostic.message)
                .with_label(
                    Label::new(diagnostic.span.clone())
                        .with_message(&diagnostic.message)
                        .with_color(Color::Red),
                )
                .finish()
                .write(Source::from(src), &mut out);
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Parse and assemble `src` into memory words.
pub fn assemble_source(src: &str) -> Result<Vec<Word>, LangError> {
    let stmts = parse::parse(src).map_err(|errs| {
        LangError::Syntax(
            errs.iter()
                .map(|e| Diagnostic {
                    message: e.to_string(),
                    span: e.span().into_range(),
                })
                .collect(),
        )
    })?;
    debug!(statements = stmts.len(), "parsed");
    assemble::assemble(&stmts).map_err(LangError::Assemble)
}
