//! Relay listener and session forwarding

use evse_core::{KioskError, KioskResult};
use evse_transport::{SerialSettings, open_stream};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Probe command for identifying the scan microcontroller
pub const PROBE_COMMAND: &str = "CHECK_ARDUINO";
/// Expected probe reply from the scan microcontroller
pub const PROBE_REPLY: &str = "ARDUINO_OK";

/// Configuration for one relay instance
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the TCP listener binds to
    pub listen: SocketAddr,
    /// Serial channel this relay owns
    pub serial: SerialSettings,
    /// Upper bound on how long the forwarding loop sleeps between
    /// readiness checks
    pub poll_interval: Duration,
}

impl RelayConfig {
    pub fn new(listen: SocketAddr, serial: SerialSettings) -> Self {
        Self {
            listen,
            serial,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Relay between one serial device and one TCP client at a time
///
/// The listener accepts connections in a loop and serves each accepted
/// session inline, so a new session only starts after the prior session's
/// descriptors are closed. Session failures (device open failure, I/O
/// error) end the session; the listener keeps accepting.
pub struct SerialRelay {
    config: RelayConfig,
}

impl SerialRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Bind the listener and serve sessions until the task is dropped
    ///
    /// # Errors
    /// Returns `ResourceUnavailable` if the listen address cannot be bound;
    /// this aborts only this relay.
    pub async fn run(&self) -> KioskResult<()> {
        let listener = TcpListener::bind(self.config.listen).await.map_err(|e| {
            KioskError::ResourceUnavailable(format!(
                "Failed to bind relay listener on {}: {}",
                self.config.listen, e
            ))
        })?;

        log::info!(
            "Relay for {} listening on {}",
            self.config.serial.device,
            self.config.listen
        );

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    log::info!("Relay: got a connection from {}", peer_addr);
                    if let Err(e) = self.serve_session(stream).await {
                        log::error!(
                            "Relay session on {} ended with error: {}",
                            self.config.serial.device,
                            e
                        );
                    } else {
                        log::info!("Relay session from {} closed", peer_addr);
                    }
                }
                Err(e) => {
                    log::error!("Relay accept error: {}", e);
                }
            }
        }
    }

    /// Serve one accepted session: open the serial device and forward lines
    /// in both directions until either side closes
    async fn serve_session(&self, client: TcpStream) -> KioskResult<()> {
        let serial = open_stream(&self.config.serial)?;
        forward_lines(serial, client, self.config.poll_interval).await
    }
}

/// Forward complete lines between a device stream and a client stream
///
/// A line fully read from the device is written to the client and vice
/// versa, each re-terminated with `\n`. The wait multiplexes both
/// directions and wakes at least every `poll_interval`. Returns when either
/// endpoint reaches EOF; both endpoints drop on return.
pub async fn forward_lines<D, C>(device: D, client: C, poll_interval: Duration) -> KioskResult<()>
where
    D: AsyncRead + AsyncWrite + Unpin,
    C: AsyncRead + AsyncWrite + Unpin,
{
    let (device_rd, mut device_wr) = tokio::io::split(device);
    let (client_rd, mut client_wr) = tokio::io::split(client);
    let mut device_lines = BufReader::new(device_rd).lines();
    let mut client_lines = BufReader::new(client_rd).lines();

    loop {
        tokio::select! {
            line = device_lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        log::debug!("Relay: serial -> socket: {}", line);
                        client_wr.write_all(line.as_bytes()).await?;
                        client_wr.write_all(b"\n").await?;
                        client_wr.flush().await?;
                    }
                }
                None => break,
            },
            line = client_lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        log::debug!("Relay: socket -> serial: {}", line);
                        device_wr.write_all(line.as_bytes()).await?;
                        device_wr.write_all(b"\n").await?;
                        device_wr.flush().await?;
                    }
                }
                None => break,
            },
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    Ok(())
}

/// Run the identification handshake against a candidate serial device
///
/// Sends `command` and waits up to `timeout` for a reply line; the device
/// is a match iff the reply equals `expected`. Used by the bootstrap layer
/// to tell the scan microcontroller apart from the mesh node.
pub async fn probe<S>(stream: S, command: &str, expected: &str, timeout: Duration) -> KioskResult<bool>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (rd, mut wr) = tokio::io::split(stream);

    wr.write_all(command.as_bytes()).await?;
    wr.write_all(b"\n").await?;
    wr.flush().await?;

    let mut lines = BufReader::new(rd).lines();
    match tokio::time::timeout(timeout, lines.next_line()).await {
        Ok(Ok(Some(reply))) => Ok(reply.trim() == expected),
        Ok(Ok(None)) => Ok(false),
        Ok(Err(e)) => Err(KioskError::Connection(e)),
        Err(_) => Ok(false),
    }
}

/// Probe a serial device for the scan microcontroller handshake
pub async fn probe_device(settings: &SerialSettings, timeout: Duration) -> KioskResult<bool> {
    let stream = open_stream(settings)?;
    probe(stream, PROBE_COMMAND, PROBE_REPLY, timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const POLL: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_forwards_device_lines_to_client() {
        let (device_far, device_near) = tokio::io::duplex(256);
        let (client_far, client_near) = tokio::io::duplex(256);

        let relay = tokio::spawn(forward_lines(device_near, client_near, POLL));

        let (mut device, mut client) = (device_far, client_far);
        device.write_all(b"hello from serial\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello from serial\n");

        drop(device);
        relay.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_forwards_client_lines_to_device() {
        let (device_far, device_near) = tokio::io::duplex(256);
        let (client_far, client_near) = tokio::io::duplex(256);

        let relay = tokio::spawn(forward_lines(device_near, client_near, POLL));

        let (mut device, mut client) = (device_far, client_far);
        client.write_all(b"SCAN\n").await.unwrap();

        let mut buf = [0u8; 16];
        let n = device.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"SCAN\n");

        drop(client);
        relay.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_session_ends_on_client_eof() {
        let (_device_far, device_near) = tokio::io::duplex(256);
        let (client_far, client_near) = tokio::io::duplex(256);

        let relay = tokio::spawn(forward_lines(device_near, client_near, POLL));
        drop(client_far);
        relay.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_probe_accepts_matching_reply() {
        let (far, near) = tokio::io::duplex(256);

        let device = tokio::spawn(async move {
            let (rd, mut wr) = tokio::io::split(far);
            let mut lines = BufReader::new(rd).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            assert_eq!(line, PROBE_COMMAND);
            wr.write_all(b"ARDUINO_OK\n").await.unwrap();
        });

        let matched = probe(near, PROBE_COMMAND, PROBE_REPLY, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(matched);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn test_probe_times_out_on_silent_device() {
        let (_far, near) = tokio::io::duplex(256);
        let matched = probe(near, PROBE_COMMAND, PROBE_REPLY, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(!matched);
    }
}
