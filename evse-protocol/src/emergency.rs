//! Emergency announcement forwarding
//!
//! Emergency lines heard on the scan channel are reported to the backend
//! over the mesh channel, tagged with this station's locality note. Repeat
//! announcements inside the suppression window are dropped so a vehicle
//! sitting next to the kiosk does not flood the mesh.

use evse_core::KioskResult;
use evse_dispatch::{CommandWriter, LineQueue};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::Instant;

/// Emergency forwarding configuration
#[derive(Debug, Clone)]
pub struct EmergencyConfig {
    /// Window during which repeat announcements are suppressed
    pub suppress: Duration,
    /// Locality note appended to every forwarded announcement
    pub station_note: String,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            suppress: Duration::from_secs(10),
            station_note: "Near Node 1".to_string(),
        }
    }
}

/// Drain the emergency queue until its producer goes away
///
/// Each announcement outside the suppression window is sent to the backend
/// as a mesh write command.
pub async fn forward_emergencies<W: AsyncWrite + Unpin + Send>(
    mut emergency_queue: LineQueue,
    mut mesh_commands: CommandWriter<W>,
    config: EmergencyConfig,
) -> KioskResult<()> {
    let mut last_report: Option<Instant> = None;

    while let Some(line) = emergency_queue.pop().await {
        let suppressed = last_report
            .map(|at| at.elapsed() < config.suppress)
            .unwrap_or(false);
        if suppressed {
            log::debug!("Emergency suppressed (repeat): {}", line);
            continue;
        }

        log::info!("Emergency vehicle discovered: {}", line);
        let command = format!(
            "wisun socket_write 4 \"{} {}\"",
            line, config.station_note
        );
        mesh_commands.send_line(&command).await?;
        last_report = Some(Instant::now());
    }
    Ok(())
}
