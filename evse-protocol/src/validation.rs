//! RFID validation protocol
//!
//! One identity record is serialized and sent as a single command line over
//! the mesh channel; the backend's verdict comes back as a line containing
//! the `valid` marker. A single attempt per charge session: on timeout the
//! request is not retransmitted.

use evse_core::{IdentityRecord, KioskResult, ValidationOutcome};
use evse_dispatch::{CommandWriter, LineQueue};
use std::time::Duration;
use tokio::io::AsyncWrite;

/// Generic detector: any backend verdict line contains this substring
pub const VALIDATION_MARKER: &str = "valid";

const REPLY_AUTHORIZED: &str = "valid_yes";
const REPLY_REJECTED: &str = "valid_not";
const REPLY_INSUFFICIENT: &str = "valid_insuff";
const REPLY_BACKEND_ERROR: &str = "valid_error";

/// Validation protocol timing
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Overall timeout around the whole exchange
    pub timeout: Duration,
    /// Idle pause between queue polls
    pub poll: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll: Duration::from_millis(100),
        }
    }
}

/// Classify one mesh line
///
/// Returns None for lines without the validation marker (they are not
/// verdicts and the poll continues past them).
pub fn classify_reply(line: &str) -> Option<ValidationOutcome> {
    if !line.contains(VALIDATION_MARKER) {
        return None;
    }
    let outcome = if line.contains(REPLY_AUTHORIZED) {
        ValidationOutcome::Authorized
    } else if line.contains(REPLY_REJECTED) {
        ValidationOutcome::Rejected
    } else if line.contains(REPLY_INSUFFICIENT) {
        ValidationOutcome::InsufficientBalance
    } else if line.contains(REPLY_BACKEND_ERROR) {
        ValidationOutcome::BackendUnavailable
    } else {
        ValidationOutcome::Unrecognized(line.to_string())
    };
    Some(outcome)
}

/// Send the identity record and wait for the backend's verdict
///
/// Polls the mesh-reply queue until a qualifying line appears, bounded by
/// `config.timeout`; overrun yields `ValidationOutcome::Timeout` (treated
/// downstream like a rejection, with its own message).
pub async fn validate<W: AsyncWrite + Unpin + Send>(
    commands: &mut CommandWriter<W>,
    mesh_queue: &mut LineQueue,
    record: &IdentityRecord,
    config: &ValidationConfig,
) -> KioskResult<ValidationOutcome> {
    let command = record.command_line()?;
    commands.send_line(&command).await?;
    log::info!("Validation request sent for tag {}", record.tag);

    let verdict = tokio::time::timeout(config.timeout, async {
        loop {
            if let Some(line) = mesh_queue.pop_within(config.poll).await {
                if let Some(outcome) = classify_reply(&line) {
                    return outcome;
                }
                log::debug!("Validation: skipping non-verdict line: {}", line);
            }
        }
    })
    .await;

    match verdict {
        Ok(outcome) => {
            log::info!("Validation done: {:?}", outcome);
            Ok(outcome)
        }
        Err(_) => {
            log::warn!("Validation timed out after {:?}", config.timeout);
            Ok(ValidationOutcome::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evse_dispatch::line_queue;
    use tokio::io::AsyncReadExt;

    fn quick_config() -> ValidationConfig {
        ValidationConfig {
            timeout: Duration::from_millis(200),
            poll: Duration::from_millis(5),
        }
    }

    fn record() -> IdentityRecord {
        IdentityRecord::new(100, "12345678", "EV-L001-03")
    }

    #[test]
    fn test_classify_recognized_markers() {
        assert_eq!(classify_reply("valid_yes"), Some(ValidationOutcome::Authorized));
        assert_eq!(classify_reply("valid_not"), Some(ValidationOutcome::Rejected));
        assert_eq!(
            classify_reply("reply: valid_insuff"),
            Some(ValidationOutcome::InsufficientBalance)
        );
        assert_eq!(
            classify_reply("valid_error"),
            Some(ValidationOutcome::BackendUnavailable)
        );
    }

    #[test]
    fn test_classify_skips_lines_without_marker() {
        assert_eq!(classify_reply("[INFO] socket data received"), None);
        assert_eq!(classify_reply(""), None);
    }

    #[test]
    fn test_classify_unrecognized_submarker() {
        match classify_reply("valid_maybe").unwrap() {
            ValidationOutcome::Unrecognized(line) => assert_eq!(line, "valid_maybe"),
            other => panic!("expected Unrecognized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_skips_noise_then_classifies() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();

        tx.push("[INFO] mesh chatter");
        tx.push("rx 24 bytes");
        tx.push("valid_insuff");

        let outcome = validate(&mut commands, &mut queue, &record(), &quick_config())
            .await
            .unwrap();
        assert_eq!(outcome, ValidationOutcome::InsufficientBalance);

        drop(commands);
        let mut sent = String::new();
        server.read_to_string(&mut sent).await.unwrap();
        assert!(sent.starts_with("wisun socket_write 4 \""));
        assert!(sent.ends_with("\n"));
    }

    #[tokio::test]
    async fn test_validate_times_out_without_verdict() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();
        tx.push("no verdict here");

        let outcome = validate(&mut commands, &mut queue, &record(), &quick_config())
            .await
            .unwrap();
        assert_eq!(outcome, ValidationOutcome::Timeout);
    }

    #[tokio::test]
    async fn test_validate_returns_on_first_qualifying_line() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();

        tx.push("valid_yes");
        tx.push("valid_not");

        let outcome = validate(&mut commands, &mut queue, &record(), &quick_config())
            .await
            .unwrap();
        assert_eq!(outcome, ValidationOutcome::Authorized);
        // The later verdict stays queued; the protocol returned immediately
        assert_eq!(queue.try_pop().unwrap(), "valid_not");
    }
}
