use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::Result;

use super::WorkQueue;

/// In-memory FIFO queue; contents are lost on process exit.
#[derive(Debug, Default)]
pub struct MemoryQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> MemoryQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T: Clone + Send + Sync> WorkQueue<T> for MemoryQueue<T> {
    fn enqueue(&self, item: T) -> Result<()> {
        self.items.lock().unwrap().push_back(item);
        Ok(())
    }

    fn peek(&self) -> Result<Option<T>> {
        Ok(self.items.lock().unwrap().front().cloned())
    }

    fn remove(&self) -> Result<()> {
        self.items.lock().unwrap().pop_front();
        Ok(())
    }

    fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    fn clear(&self) -> Result<()> {
        self.items.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = MemoryQueue::new();
        queue.enqueue("a").unwrap();
        queue.enqueue("b").unwrap();
        queue.enqueue("c").unwrap();

        assert_eq!(queue.peek().unwrap(), Some("a"));
        queue.remove().unwrap();
        assert_eq!(queue.peek().unwrap(), Some("b"));
        queue.remove().unwrap();
        assert_eq!(queue.peek().unwrap(), Some("c"));
    }

    #[test]
    fn test_peek_does_not_remove() {
        let queue = MemoryQueue::new();
        queue.enqueue(1).unwrap();

        assert_eq!(queue.peek().unwrap(), Some(1));
        assert_eq!(queue.peek().unwrap(), Some(1));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_on_empty_is_noop() {
        let queue: MemoryQueue<u32> = MemoryQueue::new();
        queue.remove().unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let queue = MemoryQueue::new();
        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        queue.clear().unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.peek().unwrap(), None);
    }
}
