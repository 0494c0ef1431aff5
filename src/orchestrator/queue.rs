//! FIFO of pending dependency updates.
use std::collections::VecDeque;

use crate::package::PackageDescriptor;

/// One dependency scheduled for an update pull request.
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub descriptor: PackageDescriptor,
}

/// Holds update tasks until the orchestrator pops them one at a time.
///
/// All updates share a single git working tree, so a task is only popped
/// after the previous one has finished.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    tasks: VecDeque<UpdateTask>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: PackageDescriptor) {
        self.tasks.push_back(UpdateTask { descriptor });
    }

    pub fn pop(&mut self) -> Option<UpdateTask> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl FromIterator<PackageDescriptor> for UpdateQueue {
    fn from_iter<I: IntoIterator<Item = PackageDescriptor>>(iter: I) -> Self {
        let mut queue = Self::new();
        for descriptor in iter {
            queue.push(descriptor);
        }
        queue
    }
}
