//! Unbounded FIFO line queues
//!
//! One producer (the classifier) and one logical consumer (a protocol
//! layer) per queue. Entries are opaque strings until a protocol layer
//! interprets them.

use std::time::Duration;
use tokio::sync::mpsc;

/// Create a connected sender/queue pair
pub fn line_queue() -> (LineSender, LineQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LineSender { tx }, LineQueue { rx })
}

/// Producer half of a dispatch queue
///
/// Pushing never blocks; the channel is unbounded.
#[derive(Debug, Clone)]
pub struct LineSender {
    tx: mpsc::UnboundedSender<String>,
}

impl LineSender {
    /// Append a line; returns false if the consumer is gone
    pub fn push(&self, line: impl Into<String>) -> bool {
        self.tx.send(line.into()).is_ok()
    }
}

/// Consumer half of a dispatch queue
///
/// Lines come out in exactly the order they were pushed.
#[derive(Debug)]
pub struct LineQueue {
    rx: mpsc::UnboundedReceiver<String>,
}

impl LineQueue {
    /// Pop the next line without waiting
    pub fn try_pop(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Pop the next line, waiting at most `wait`
    ///
    /// Returns None on timeout or if the producer is gone and the queue is
    /// drained.
    pub async fn pop_within(&mut self, wait: Duration) -> Option<String> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(line) => line,
            Err(_) => None,
        }
    }

    /// Pop the next line, waiting until one arrives or the producer is gone
    pub async fn pop(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
