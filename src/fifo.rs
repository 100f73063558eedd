//! Bounded FIFO used for the capture and schedule queues.
//!
//! Backed by an `rtrb` ring whose producer and consumer halves are both owned
//! by the engine. Storage is allocated once at construction; pushes and pops
//! never allocate. A push into a full queue hands the record back to the
//! caller, which drops it.

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use std::fmt;

pub struct Fifo<T> {
    tx: Producer<T>,
    rx: Consumer<T>,
    depth: usize,
}

impl<T> Fifo<T> {
    pub fn new(depth: usize) -> Self {
        let (tx, rx) = RingBuffer::new(depth);
        Self { tx, rx, depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.rx.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// At least one record can be popped.
    pub fn readable(&self) -> bool {
        !self.rx.is_empty()
    }

    /// At least one record can be pushed.
    pub fn writable(&self) -> bool {
        !self.tx.is_full()
    }

    /// Oldest record, if any.
    pub fn head(&self) -> Option<&T> {
        self.rx.peek().ok()
    }

    /// Append a record. A full queue returns it as `Err`.
    pub fn push(&mut self, record: T) -> Result<(), T> {
        self.tx.push(record).map_err(|PushError::Full(record)| record)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.rx.pop().ok()
    }

    pub fn clear(&mut self) {
        while self.rx.pop().is_ok() {}
    }
}

impl<T: fmt::Debug> fmt::Debug for Fifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fifo")
            .field("depth", &self.depth)
            .field("len", &self.len())
            .field("head", &self.head())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_and_overflow() {
        let mut q = Fifo::new(2);
        assert!(q.writable() && !q.readable());
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert!(!q.writable());
        assert_eq!(q.push(3), Err(3));
        assert_eq!(q.head(), Some(&1));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn fifo_clear_empties() {
        let mut q = Fifo::new(4);
        for i in 0..4 {
            q.push(i).unwrap();
        }
        assert_eq!(q.len(), 4);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.depth(), 4);
    }
}
