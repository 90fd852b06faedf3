//! Append-only instruction storage for the rendering double buffer.
//!
//! A buffer is filled, handed over and drained in one go, so popped bytes are
//! not reclaimed until the whole buffer is reset.
//!
//! Deletions issued by released handles can't be refused, so the ones that
//! don't fit are parked and popped after everything else in the buffer.

use crate::dispatch::instruction::Instruction;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};

/// Returned by a push that doesn't fit. Hands the instruction back so the
/// caller decides where it gets dropped.
pub struct BufferFull {
    pub instruction: Instruction,
    pub required: usize,
    pub available: usize,
}

impl Debug for BufferFull {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFull")
            .field("instruction", &self.instruction)
            .field("required", &self.required)
            .field("available", &self.available)
            .finish()
    }
}

#[derive(Debug)]
pub struct LinearBuffer {
    instructions: VecDeque<Instruction>,
    parked: VecDeque<Instruction>,
    capacity: usize,
    used: usize,
}

impl LinearBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            instructions: VecDeque::new(),
            parked: VecDeque::new(),
            capacity,
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed since the last reset, including already popped instructions.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.capacity - self.used
    }

    pub fn len(&self) -> usize {
        self.instructions.len() + self.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.parked.is_empty()
    }

    /// Instructions that were pushed past the capacity.
    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    pub fn push(&mut self, instruction: Instruction) -> Result<(), BufferFull> {
        let required = instruction.encoded_size();
        if required > self.available() {
            return Err(BufferFull {
                instruction,
                required,
                available: self.available(),
            });
        }

        self.used += required;
        self.instructions.push_back(instruction);
        Ok(())
    }

    /// Pushes `instruction`, parking it if the buffer is full. Returns whether
    /// it was parked.
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
        self.instructions
            .pop_front()
            .or_else(|| self.parked.pop_front())
    }

    /// Rewinds the buffer and returns whatever was never popped.
    #[must_use]
    pub fn reset(&mut self) -> VecDeque<Instruction> {
        self.used = 0;
        let mut leftovers = std::mem::take(&mut self.instructions);
        leftovers.append(&mut self.parked);
        leftovers
    }
}
