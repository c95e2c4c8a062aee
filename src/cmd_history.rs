//! Command history store.
//!
//! Completed input lines are kept as Z-SCII strings so CURSOR_UP and
//! CURSOR_DOWN during line input can recall them. Entry 1 is the most
//! recent command; index 0 is reserved for the freshly typed (empty) line.

use std::collections::VecDeque;

const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug)]
pub struct CommandHistory {
    commands: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        CommandHistory::new(DEFAULT_CAPACITY)
    }
}

impl CommandHistory {
    pub fn new(capacity: usize) -> CommandHistory {
        CommandHistory {
            commands: VecDeque::new(),
            capacity,
        }
    }

    /// Number of stored commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Store a completed command. Consecutive duplicates are skipped and the
    /// oldest entry is dropped when the store is full.
    pub fn push(&mut self, command: Vec<u8>) {
        if command.is_empty() || self.commands.front() == Some(&command) {
            return;
        }
        if self.commands.len() == self.capacity {
            self.commands.pop_back();
        }
        self.commands.push_front(command);
    }

    /// Get a stored command; 0 is the most recent.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.commands.get(index).map(|c| c.as_slice())
    }
}
