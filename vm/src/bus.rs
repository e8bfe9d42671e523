use std::collections::{vec_deque, VecDeque};

use crate::Word;

/// One direction of traffic across the VM boundary
///
/// Reads never wait: an empty queue is reported back to the caller, which is what lets the VM
/// suspend itself instead of blocking a thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fifo {
    queue: VecDeque<Word>,
}

impl Fifo {
    pub fn push(&mut self, value: Word) {
        self.queue.push_back(value);
    }

    /// The oldest value, or `None` if nothing is waiting.
    pub fn pop(&mut self) -> Option<Word> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Word> + '_ {
        self.queue.iter().copied()
    }

    pub fn drain(&mut self) -> vec_deque::Drain<'_, Word> {
        self.queue.drain(..)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Extend<Word> for Fifo {
    fn extend<T: IntoIterator<Item = Word>>(&mut self, iter: T) {
        self.queue.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::Fifo;

    #[test]
    fn test_values_come_out_in_order() {
        let mut fifo = Fifo::default();
        fifo.push(3);
        fifo.extend([1, 2]);
        assert_eq!(fifo.iter().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(fifo.pop(), Some(3));
        assert_eq!(fifo.drain().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(fifo.pop(), None);
    }
}
