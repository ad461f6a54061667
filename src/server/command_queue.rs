//! Command Queue
//!
//! MPMC bounded queue for routing commands from network tasks to workers.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::protocol::{Command, Response};

/// Work item sent through the command queue
#[derive(Debug)]
pub struct WorkItem {
    pub command: Command,
    pub request_id: u64,
    /// Channel the worker answers on
    pub response_tx: tokio::sync::oneshot::Sender<Response>,
}

/// Bounded MPMC command queue
///
/// Connection tasks produce, worker threads consume.
#[derive(Clone)]
pub struct CommandQueue {
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = channel::bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    pub fn receiver(&self) -> Receiver<WorkItem> {
        self.receiver.clone()
    }

    /// Enqueue without blocking; fails when the queue is full
    pub fn try_send(&self, item: WorkItem) -> Result<(), TrySendError<WorkItem>> {
        self.sender.try_send(item)
    }

    pub fn recv(&self) -> Result<WorkItem, channel::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<WorkItem, channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Approximate number of pending items
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sender.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn item(command: Command, request_id: u64) -> WorkItem {
        let (tx, _rx) = tokio::sync::oneshot::channel();
        WorkItem {
            command,
            request_id,
            response_tx: tx,
        }
    }

    #[test]
    fn test_queue_send_recv() {
        let queue = CommandQueue::new(10);
        queue.try_send(item(Command::Ping, 1)).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.recv().unwrap().request_id, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_full() {
        let queue = CommandQueue::new(1);
        queue.try_send(item(Command::Ping, 1)).unwrap();
        assert!(queue.is_full());
        assert!(matches!(
            queue.try_send(item(Command::Info, 2)),
            Err(TrySendError::Full(_))
        ));
    }

    #[test]
    fn test_queue_mpmc() {
        let queue = CommandQueue::new(100);

        let producers: Vec<_> = (0..4)
            .map(|i| {
                let q = queue.clone();
                thread::spawn(move || {
                    for j in 0..25 {
                        let command = Command::Get {
                            term: format!("term-{}-{}", i, j),
                        };
                        q.try_send(item(command, (i * 25 + j) as u64)).unwrap();
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let q = queue.clone();
                thread::spawn(move || {
                    let mut count = 0;
                    while count < 50 {
                        if q.try_recv().is_ok() {
                            count += 1;
                        }
                    }
                    count
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }

        let total: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
        assert_eq!(total, 100);
    }
}
