//! Mesh network bring-up
//!
//! The mesh-radio node joins its network through a short CLI conversation:
//! two join commands, a wait for the address confirmation line, then the
//! socket bring-up commands toward the billing backend.

use evse_core::{KioskError, KioskResult};
use evse_dispatch::{CommandWriter, LineQueue};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::Instant;

const JOIN_COMMANDS: [&str; 2] = ["wisun get wisun", "wisun join_fan11"];
const SOCKET_COMMANDS: [&str; 4] = [
    "wisun udp_server 5001",
    "wisun udp_client fd12:3456::1 5005",
    "wisun get wisun",
    "wisun socket_list",
];

/// Markers confirming the node acquired its network address
const JOINED_MARKERS: [&str; 2] = ["IPv6 address", "wisun.border_router"];

/// Mesh bring-up timing
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Deadline for the join confirmation; joining a mesh can take minutes
    pub join_deadline: Duration,
    /// Idle pause between queue polls
    pub poll: Duration,
    /// Gap between consecutive CLI commands
    pub command_gap: Duration,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            join_deadline: Duration::from_secs(600),
            poll: Duration::from_millis(250),
            command_gap: Duration::from_millis(250),
        }
    }
}

/// Join the mesh and open the backend sockets
///
/// # Errors
/// `DeviceTimeout` if no join confirmation line arrives within
/// `config.join_deadline`.
pub async fn join_network<W: AsyncWrite + Unpin + Send>(
    commands: &mut CommandWriter<W>,
    mesh_queue: &mut LineQueue,
    config: &MeshConfig,
) -> KioskResult<()> {
    for command in JOIN_COMMANDS {
        commands.send_line(command).await?;
        tokio::time::sleep(config.command_gap).await;
    }

    let deadline = Instant::now() + config.join_deadline;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(KioskError::DeviceTimeout("mesh join".to_string()));
        }
        let wait = config.poll.min(deadline - now);
        if let Some(line) = mesh_queue.pop_within(wait).await {
            if JOINED_MARKERS.iter().any(|marker| line.contains(marker)) {
                log::info!("Mesh joined: {}", line);
                break;
            }
            log::debug!("Mesh join: waiting, got: {}", line);
        }
    }

    for command in SOCKET_COMMANDS {
        commands.send_line(command).await?;
        tokio::time::sleep(config.command_gap).await;
    }
    Ok(())
}
