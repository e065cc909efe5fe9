//! Prefix-based line classifier and reader task

use crate::queue::LineSender;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Line prefix markers spoken by the kiosk's devices
pub mod markers {
    /// Prefix of emergency-vehicle announcements on the scan channel
    pub const EMERGENCY: &str = "Emergency:";
    /// Prefix of bike protocol lines on the scan channel, stripped on routing
    pub const BIKE_EVENT: &str = "EV_Bike:";
}

struct Rule {
    prefix: String,
    strip_prefix: bool,
    sink: LineSender,
}

/// Routes each incoming line to exactly one queue, or discards it
///
/// Rules are evaluated in insertion order, so overlapping prefixes resolve
/// deterministically: register the most specific prefix first. A rule with
/// an empty prefix matches every line and acts as a catch-all.
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Create a classifier with no rules (every line is discarded)
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Route lines starting with `prefix` to `sink`, keeping the line whole
    pub fn route_prefix(mut self, prefix: impl Into<String>, sink: LineSender) -> Self {
        self.rules.push(Rule {
            prefix: prefix.into(),
            strip_prefix: false,
            sink,
        });
        self
    }

    /// Route lines starting with `prefix` to `sink`, with the prefix removed
    pub fn route_prefix_stripped(mut self, prefix: impl Into<String>, sink: LineSender) -> Self {
        self.rules.push(Rule {
            prefix: prefix.into(),
            strip_prefix: true,
            sink,
        });
        self
    }

    /// Route every remaining line to `sink`
    pub fn route_rest(self, sink: LineSender) -> Self {
        self.route_prefix("", sink)
    }

    /// Classifier for the bike-scan channel
    ///
    /// `"Emergency:"` lines go whole to the emergency queue; `"EV_Bike:"`
    /// lines go to the bike queue with the prefix stripped; everything else
    /// is discarded.
    pub fn scan_channel(emergency: LineSender, bike: LineSender) -> Self {
        Self::new()
            .route_prefix(markers::EMERGENCY, emergency)
            .route_prefix_stripped(markers::BIKE_EVENT, bike)
    }

    /// Classifier for the mesh channel: every line is a potential backend
    /// reply and lands on the mesh-reply queue
    pub fn mesh_channel(mesh: LineSender) -> Self {
        Self::new().route_rest(mesh)
    }

    /// Route one line; returns true if a rule matched, false if discarded
    pub fn dispatch(&self, line: &str) -> bool {
        for rule in &self.rules {
            if line.starts_with(&rule.prefix) {
                let routed = if rule.strip_prefix {
                    line[rule.prefix.len()..].trim_start()
                } else {
                    line
                };
                if !rule.sink.push(routed) {
                    log::warn!("Dispatch queue consumer gone, dropping line: {}", routed);
                }
                return true;
            }
        }
        false
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the dedicated reader task for one relay session
///
/// Reads lines from the session's client-side stream, strips terminators,
/// and routes each line through the classifier. Ends when the stream closes
/// or errors; unmatched lines are discarded, never buffered.
pub fn spawn_reader<R>(reader: R, classifier: Classifier) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if !classifier.dispatch(line) {
                        log::debug!("Discarding unclassified line: {}", line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::error!("Dispatch reader error: {}", e);
                    break;
                }
            }
        }
    })
}
