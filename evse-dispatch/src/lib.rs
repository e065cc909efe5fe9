//! Line classification and dispatch queues for the EVSE kiosk
//!
//! A dedicated reader task consumes a relay session's byte stream, splits it
//! into lines, and routes each line by prefix into one of several FIFO
//! queues. Protocol layers drain the queues; the reader never blocks.

pub mod classifier;
pub mod command;
pub mod queue;

pub use classifier::{Classifier, spawn_reader};
pub use command::CommandWriter;
pub use queue::{LineQueue, LineSender, line_queue};
