use std::{collections::VecDeque, fmt};

use parking_lot::{Condvar, Mutex};

/// A single-use deferred call.
///
/// There is no return channel: whatever the call produces is written through
/// an output destination captured when the task was built.
pub struct Task {
    label: String,
    call: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    pub fn new(label: impl Into<String>, call: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            call: Box::new(call),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the call. The task and everything it captured is gone afterwards.
    pub fn execute(self) {
        (self.call)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("label", &self.label).finish()
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded multi-producer, multi-consumer FIFO with a blocking pop.
///
/// There is no backpressure. Every phase submits a bounded batch and then
/// waits for it, so the queue never holds more than one phase worth of work.
pub struct TaskQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Appends an item and wakes one blocked consumer. Never blocks.
    ///
    /// Items pushed after [`close`](Self::close) are handed back.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until an item is available and removes the oldest one.
    ///
    /// Returns `None` only once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Stops accepting items. Consumers drain what is left and then see `None`.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn pops_in_push_order() {
        let queue = TaskQueue::new();
        for i in 0..5 {
            queue.push(i).unwrap();
        }
        assert_eq!(queue.len(), 5);
        let popped: Vec<_> = (0..5).filter_map(|_| queue.pop()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_blocks_until_an_item_arrives() {
        let queue = Arc::new(TaskQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push("late").unwrap();
        assert_eq!(consumer.join().unwrap(), Some("late"));
    }

    #[test]
    fn close_drains_then_ends() {
        let queue = TaskQueue::new();
        queue.push(1).unwrap();
        queue.close();
        assert_eq!(queue.push(2), Err(2));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn close_wakes_blocked_consumers() {
        let queue = Arc::new(TaskQueue::<u32>::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        queue.close();
        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    fn tasks_run_their_captured_call_once() {
        let (sender, receiver) = std::sync::mpsc::channel();
        let task = Task::new("send", move || sender.send(42).unwrap());
        assert_eq!(task.label(), "send");
        task.execute();
        assert_eq!(receiver.recv().unwrap(), 42);
        // The sender was captured by the task and dropped with it.
        assert!(receiver.recv().is_err());
    }
}
