use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::executor::types::TaskSpec;

/// A task waiting for a free concurrency slot.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub task: TaskSpec,
    pub priority: i64,
    pub enqueued_at: DateTime<Utc>,
    seq: u64,
}

/// Unbounded priority queue: highest priority first, FIFO among equals.
///
/// Re-sorted on every push; meant for tens of entries, not thousands.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<QueuedTask>,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: TaskSpec, priority: i64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(QueuedTask {
            task,
            priority,
            enqueued_at: Utc::now(),
            seq,
        });
        self.items
            .make_contiguous()
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
    }

    pub fn pop(&mut self) -> Option<QueuedTask> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_then_fifo() {
        let mut queue = PendingQueue::new();
        queue.push(TaskSpec::new("low", ""), 0);
        queue.push(TaskSpec::new("high-1", ""), 5);
        queue.push(TaskSpec::new("mid", ""), 1);
        queue.push(TaskSpec::new("high-2", ""), 5);
        queue.push(TaskSpec::new("neg", ""), -1);

        assert_eq!(queue.len(), 5);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop().map(|q| q.task.id)).collect();
        assert_eq!(order, vec!["high-1", "high-2", "mid", "low", "neg"]);
        assert!(queue.is_empty());
    }
}
