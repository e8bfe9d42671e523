use crate::{error::VmError, Word};

/// The VM's cells
///
/// The length is fixed when the program is loaded. Every access is bounds checked and an
/// out-of-range address is an error, never clamped or wrapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    pub fn new(cells: Vec<Word>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    /// Interprets a cell value as an address into this memory.
    pub fn address(&self, raw: Word) -> Result<usize, VmError> {
        usize::try_from(raw)
            .ok()
            .filter(|&address| address < self.cells.len())
            .ok_or(VmError::MemoryOutOfBounds {
                address: raw,
                len: self.cells.len(),
            })
    }

    pub fn get(&self, address: usize) -> Result<Word, VmError> {
        self.cells
            .get(address)
            .copied()
            .ok_or_else(|| self.out_of_bounds(address))
    }

    pub fn set(&mut self, address: usize, value: Word) -> Result<(), VmError> {
        let err = self.out_of_bounds(address);
        let cell = self.cells.get_mut(address).ok_or(err)?;
        *cell = value;
        Ok(())
    }

    fn out_of_bounds(&self, address: usize) -> VmError {
        VmError::MemoryOutOfBounds {
            address: Word::try_from(address).unwrap_or(Word::MAX),
            len: self.cells.len(),
        }
    }
}

impl From<Vec<Word>> for Memory {
    fn from(cells: Vec<Word>) -> Self {
        Self::new(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::Memory;
    use crate::error::VmError;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_get_and_set_with_existing_is_identity(i in 0..10usize, buf in prop::collection::vec(any::<i64>(), 10)) {
            let mut memory = Memory::new(buf);
            let value = memory.get(i).unwrap();
            memory.set(i, value).unwrap();
            prop_assert_eq!(memory.get(i).unwrap(), value);
        }

        #[test]
        fn test_addresses_outside_memory_are_rejected(raw in prop_oneof![i64::MIN..0, 4..i64::MAX]) {
            let memory = Memory::new(vec![0; 4]);
            prop_assert_eq!(
                memory.address(raw),
                Err(VmError::MemoryOutOfBounds { address: raw, len: 4 })
            );
        }
    }

    #[test]
    fn test_set_out_of_bounds_leaves_memory_untouched() {
        let mut memory = Memory::new(vec![1, 2, 3]);
        assert_eq!(
            memory.set(3, 9),
            Err(VmError::MemoryOutOfBounds { address: 3, len: 3 })
        );
        assert_eq!(memory.as_slice(), &[1, 2, 3]);
    }
}
