//! Fixed-slot circular instruction storage for the resource queue.
//!
//! Slots are recycled as soon as they're popped, which suits a queue that is
//! drained continuously instead of in phases.
//!
//! Deletions that find every slot taken are parked and popped ahead of the
//! slots. Nothing still queued can refer to an object whose handle is gone.

use crate::dispatch::instruction::{INSTRUCTION_SLOT_SIZE, Instruction};
use crate::dispatch::linear_buffer::BufferFull;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct RingBuffer {
    slots: Box<[Option<Instruction>]>,
    parked: VecDeque<Instruction>,
    head: usize,
    len: usize,
    capacity: usize,
}

impl RingBuffer {
    /// Splits `capacity` bytes into as many instruction slots as fit.
    pub fn new(capacity: usize) -> Self {
        let slot_count = capacity / INSTRUCTION_SLOT_SIZE;
        Self {
            slots: std::iter::repeat_with(|| None).take(slot_count).collect(),
            parked: VecDeque::new(),
            head: 0,
            len: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len + self.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    pub fn available(&self) -> usize {
        (self.slots.len() - self.len) * INSTRUCTION_SLOT_SIZE
    }

    pub fn push(&mut self, instruction: Instruction) -> Result<(), BufferFull> {
        if self.len == self.slots.len() {
            return Err(BufferFull {
                required: instruction.encoded_size(),
                instruction,
                available: 0,
            });
        }

        let tail = (self.head + self.len) % self.slots.len();
        self.slots[tail] = Some(instruction);
        self.len += 1;
        Ok(())
    }

    /// Pushes `instruction`, parking it if every slot is taken. Returns
    /// whether it was parked.
    pub fn push_or_park(&mut self, instruction: Instruction) -> bool {
        match self.push(instruction) {
            Ok(()) => false,
            Err(full) => {
                self.parked.push_back(full.instruction);
                true
            }
        }
    }

    pub fn pop(&mut self) -> Option<Instruction> {
        if let Some(parked) = self.parked.pop_front() {
            return Some(parked);
        }
        if self.len == 0 {
            return None;
        }

        let instruction = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        instruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::instruction::OpCode;

    fn opcodes(mut pop: impl FnMut() -> Option<Instruction>) -> Vec<OpCode> {
        std::iter::from_fn(|| pop().map(|i| i.opcode())).collect()
    }

    #[test]
    fn ring_buffer_wraps_around() {
        let mut ring = RingBuffer::new(3 * INSTRUCTION_SLOT_SIZE);
        assert_eq!(ring.slot_count(), 3);

        for round in 0..4 {
            ring.push(Instruction::delete_buffer(round)).unwrap();
            ring.push(Instruction::Quit).unwrap();
            assert_eq!(opcodes(|| ring.pop()), vec![OpCode::DeleteBuffer, OpCode::Quit]);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn ring_buffer_rejects_when_slots_are_taken() {
        let mut ring = RingBuffer::new(2 * INSTRUCTION_SLOT_SIZE + 1);
        ring.push(Instruction::Quit).unwrap();
        ring.push(Instruction::Quit).unwrap();
        assert_eq!(ring.available(), 0);

        let full = ring.push(Instruction::SwapBuffers).unwrap_err();
        assert_eq!(full.instruction.opcode(), OpCode::SwapBuffers);

        let _ = ring.pop();
        ring.push(Instruction::SwapBuffers).unwrap();
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn parked_deletions_skip_the_line() {
        let mut ring = RingBuffer::new(INSTRUCTION_SLOT_SIZE);
        ring.push(Instruction::Quit).unwrap();
        assert!(ring.push_or_park(Instruction::delete_shader(7)));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.parked(), 1);

        assert_eq!(opcodes(|| ring.pop()), vec![OpCode::DeleteShader, OpCode::Quit]);
        assert!(!ring.push_or_park(Instruction::delete_shader(8)));
        assert_eq!(ring.parked(), 0);
    }

    #[test]
    fn ring_buffer_smaller_than_a_slot_holds_nothing() {
        let mut ring = RingBuffer::new(INSTRUCTION_SLOT_SIZE - 1);
        assert_eq!(ring.slot_count(), 0);
        assert!(ring.push(Instruction::Quit).is_err());
        assert!(ring.pop().is_none());
    }
}
