//! Bike discovery protocol
//!
//! A bounded conversation over the bike-event queue: trigger a scan, wait
//! for the "available" marker, then read one count line and exactly that
//! many device names. The whole conversation runs under one deadline;
//! nothing is retried.

use evse_core::{KioskError, KioskResult};
use evse_dispatch::{CommandWriter, LineQueue};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::Instant;

/// Trigger token for a scan
pub const SCAN_COMMAND: &str = "SCAN";
/// Token releasing the currently connected peripheral
pub const DISCONNECT_COMMAND: &str = "DISCONNECT";

/// Progress marker, ignored
const SCAN_IN_PROGRESS: &str = "Scanning for devices...";
/// Marker announcing that the count and name lines follow
const SCAN_RESULTS_READY: &str = "Bikes are available to connect:";

/// Discovery protocol timing
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Overall deadline for the whole conversation
    pub deadline: Duration,
    /// Settling delay between the "available" marker and the count line
    pub settle: Duration,
    /// Idle pause between queue polls
    pub poll: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(5),
            settle: Duration::from_secs(1),
            poll: Duration::from_millis(50),
        }
    }
}

/// A peripheral the scan microcontroller has connected to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    pub name: String,
    pub address: String,
}

/// Pop the next line before `deadline`, or fail the conversation
async fn next_line(
    queue: &mut LineQueue,
    deadline: Instant,
    poll: Duration,
    what: &str,
) -> KioskResult<String> {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(KioskError::DeviceTimeout(what.to_string()));
        }
        let wait = poll.min(deadline - now);
        if let Some(line) = queue.pop_within(wait).await {
            return Ok(line);
        }
    }
}

/// Run one scan and return the discovered device names in arrival order
///
/// The returned list is indexed 0..N-1; selection over the wire is 1-based
/// (see [`connect`]).
///
/// # Errors
/// * `DeviceTimeout` if no "available" marker (or any expected line) arrives
///   before the deadline
/// * `ProtocolDecode` if the count line does not start with an unsigned
///   integer
pub async fn scan<W: AsyncWrite + Unpin + Send>(
    commands: &mut CommandWriter<W>,
    bike_queue: &mut LineQueue,
    config: &DiscoveryConfig,
) -> KioskResult<Vec<String>> {
    commands.send_line(SCAN_COMMAND).await?;
    let deadline = Instant::now() + config.deadline;

    loop {
        let line = next_line(bike_queue, deadline, config.poll, "bike scan").await?;

        if line.contains(SCAN_IN_PROGRESS) {
            continue;
        }
        if !line.contains(SCAN_RESULTS_READY) {
            // Stray chatter between the trigger and the marker
            log::debug!("Scan: ignoring line: {}", line);
            continue;
        }

        // Give the microcontroller a moment to emit the full result block
        tokio::time::sleep(config.settle).await;

        let count_line = next_line(bike_queue, deadline, config.poll, "bike scan").await?;
        let count: usize = count_line
            .split_whitespace()
            .next()
            .unwrap_or("")
            .parse()
            .map_err(|_| {
                KioskError::ProtocolDecode(format!("Unparsable device count: {:?}", count_line))
            })?;

        let mut devices = Vec::with_capacity(count);
        for _ in 0..count {
            devices.push(next_line(bike_queue, deadline, config.poll, "bike scan").await?);
        }
        log::info!("Scan found {} bikes: {:?}", count, devices);
        return Ok(devices);
    }
}

/// Connect to one discovered bike by its 1-based selection index
///
/// Sends the selection token and reads the peripheral's name and address
/// lines, which the microcontroller reports once the radio link is up.
pub async fn connect<W: AsyncWrite + Unpin + Send>(
    commands: &mut CommandWriter<W>,
    bike_queue: &mut LineQueue,
    selection: usize,
    config: &DiscoveryConfig,
) -> KioskResult<Peripheral> {
    commands.send_line(&selection.to_string()).await?;
    let deadline = Instant::now() + config.deadline;

    let name = next_line(bike_queue, deadline, config.poll, "bike connect").await?;
    let address = next_line(bike_queue, deadline, config.poll, "bike connect").await?;
    log::info!("Connected to peripheral {} at {}", name, address);
    Ok(Peripheral { name, address })
}

/// Release the currently connected bike
pub async fn disconnect<W: AsyncWrite + Unpin + Send>(
    commands: &mut CommandWriter<W>,
) -> KioskResult<()> {
    commands.send_line(DISCONNECT_COMMAND).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use evse_dispatch::line_queue;
    use tokio::io::AsyncReadExt;

    fn quick_config() -> DiscoveryConfig {
        DiscoveryConfig {
            deadline: Duration::from_millis(500),
            settle: Duration::from_millis(1),
            poll: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_scan_yields_names_in_arrival_order() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();

        for line in [
            "Scanning for devices...",
            "Bikes are available to connect:",
            "3",
            "bikeA",
            "bikeB",
            "bikeC",
        ] {
            tx.push(line);
        }

        let devices = scan(&mut commands, &mut queue, &quick_config()).await.unwrap();
        assert_eq!(devices, vec!["bikeA", "bikeB", "bikeC"]);

        drop(commands);
        let mut sent = String::new();
        server.read_to_string(&mut sent).await.unwrap();
        assert_eq!(sent, "SCAN\n");
    }

    #[tokio::test]
    async fn test_scan_parses_leading_count_token() {
        let (client, _server) = tokio::io::duplex(256);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();

        tx.push("Bikes are available to connect:");
        tx.push("2 bikes found");
        tx.push("bikeA");
        tx.push("bikeB");

        let devices = scan(&mut commands, &mut queue, &quick_config()).await.unwrap();
        assert_eq!(devices, vec!["bikeA", "bikeB"]);
    }

    #[tokio::test]
    async fn test_scan_fails_without_available_marker() {
        let (client, _server) = tokio::io::duplex(256);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();
        tx.push("Scanning for devices...");

        let err = scan(&mut commands, &mut queue, &quick_config()).await.unwrap_err();
        assert!(matches!(err, KioskError::DeviceTimeout(what) if what == "bike scan"));
    }

    #[tokio::test]
    async fn test_scan_fails_on_non_numeric_count() {
        let (client, _server) = tokio::io::duplex(256);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();

        tx.push("Bikes are available to connect:");
        tx.push("many");

        let err = scan(&mut commands, &mut queue, &quick_config()).await.unwrap_err();
        assert!(matches!(err, KioskError::ProtocolDecode(_)));
    }

    #[tokio::test]
    async fn test_scan_fails_when_names_run_short() {
        let (client, _server) = tokio::io::duplex(256);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();

        tx.push("Bikes are available to connect:");
        tx.push("3");
        tx.push("bikeA");

        let err = scan(&mut commands, &mut queue, &quick_config()).await.unwrap_err();
        assert!(matches!(err, KioskError::DeviceTimeout(_)));
    }

    #[tokio::test]
    async fn test_connect_sends_selection_and_reads_peripheral() {
        let (client, mut server) = tokio::io::duplex(256);
        let mut commands = CommandWriter::new(client);
        let (tx, mut queue) = line_queue();

        tx.push("EcoBike-07");
        tx.push("C4:F1:22:0A:9B:11");

        let peripheral = connect(&mut commands, &mut queue, 2, &quick_config())
            .await
            .unwrap();
        assert_eq!(peripheral.name, "EcoBike-07");
        assert_eq!(peripheral.address, "C4:F1:22:0A:9B:11");

        drop(commands);
        let mut sent = String::new();
        server.read_to_string(&mut sent).await.unwrap();
        assert_eq!(sent, "2\n");
    }
}
