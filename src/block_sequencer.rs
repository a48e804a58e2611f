use crate::models::RoutineBlock;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStep {
    Moved { index: usize, duration_seconds: u32 },
    Unchanged,
    Finished,
}

/// Cursor over a routine's blocks. Never empty.
#[derive(Debug, Clone)]
pub struct BlockSequencer {
    blocks: Arc<[RoutineBlock]>,
    index: usize,
}

impl BlockSequencer {
    pub fn new(blocks: Arc<[RoutineBlock]>) -> Option<Self> {
        if blocks.is_empty() {
            return None;
        }
        Some(Self { blocks, index: 0 })
    }

    pub fn blocks(&self) -> &[RoutineBlock] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.blocks.len()
    }

    pub fn current(&self) -> &RoutineBlock {
        &self.blocks[self.index]
    }

    pub fn current_duration_seconds(&self) -> u32 {
        self.current().duration_seconds()
    }

    pub fn progress_percent(&self) -> f32 {
        (self.index + 1) as f32 / self.blocks.len() as f32 * 100.0
    }

    pub fn go_to_next(&mut self) -> SequenceStep {
        if self.is_last() {
            return SequenceStep::Finished;
        }
        self.index += 1;
        self.moved()
    }

    pub fn go_to_previous(&mut self) -> SequenceStep {
        if self.index == 0 {
            return SequenceStep::Unchanged;
        }
        self.index -= 1;
        self.moved()
    }

    /// Returns `None` when `index` is past the last block.
    pub fn jump_to(&mut self, index: usize) -> Option<SequenceStep> {
        if index >= self.blocks.len() {
            return None;
        }
        self.index = index;
        Some(self.moved())
    }

    pub fn rewind(&mut self) -> u32 {
        self.index = 0;
        self.current_duration_seconds()
    }

    fn moved(&self) -> SequenceStep {
        SequenceStep::Moved {
            index: self.index,
            duration_seconds: self.current_duration_seconds(),
        }
    }
}
