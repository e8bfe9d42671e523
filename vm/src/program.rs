use std::sync::Arc;

use crate::{error::VmError, memory::Memory, Word};

/// Loaded program text and the memory image it describes.
///
/// Cheap to clone, so every [Vm](crate::Vm) keeps one around for [reboot](crate::Vm::reboot).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    source: Arc<str>,
    image: Arc<[Word]>,
}

impl Program {
    /// Parses comma separated decimal integers, e.g. `"1,0,0,0,99"`.
    ///
    /// Whitespace around a token is ignored, anything else that isn't an integer is rejected.
    pub fn parse(source: &str) -> Result<Program, VmError> {
        let image = source
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                token
                    .trim()
                    .parse::<Word>()
                    .map_err(|_| VmError::InvalidProgramText {
                        index,
                        token: token.to_string(),
                    })
            })
            .collect::<Result<Arc<[Word]>, _>>()?;
        Ok(Program {
            source: source.into(),
            image,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn image(&self) -> &[Word] {
        &self.image
    }

    /// A fresh memory holding the unmodified program.
    pub fn load(&self) -> Memory {
        Memory::new(self.image.to_vec())
    }
}
