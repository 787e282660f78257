//! iFacialMocap UDP transport.
//!
//! Each frame becomes one datagram of the form
//! `name-VALUE|name-VALUE|...|=head#RX,RY,RZ,TX,TY,TZ|`.

use crate::{
    config::TransportConfig,
    constants::IFACIALMOCAP_HANDSHAKE,
    tracking_data::TrackingData,
    utils::safe_cast::score_to_percent,
    Error, Result,
};
use log::{debug, info, warn};
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Receives calibrated tracking data once per dispatched frame
pub trait TransportSink: Send {
    /// Send one frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be sent.
    fn send(&mut self, data: &TrackingData) -> Result<()>;
}

/// Encode tracking data in the iFacialMocap text format
#[must_use]
pub fn format_ifacialmocap(data: &TrackingData) -> String {
    let mut message = String::with_capacity(data.blendshapes.len() * 24 + 96);
    for (name, score) in &data.blendshapes {
        let _ = write!(message, "{}-{}|", name, score_to_percent(*score));
    }
    let h = &data.head;
    let _ = write!(
        message,
        "=head#{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}|",
        h[0], h[1], h[2], h[3], h[4], h[5]
    );
    message
}

/// Sends frames over UDP to a fixed or discovered receiver
pub struct UdpTransport {
    socket: UdpSocket,
    target: Option<SocketAddr>,
    discover: bool,
    buffer: [u8; 512],
}

impl UdpTransport {
    /// Create a transport from configuration
    ///
    /// With a configured target the socket binds an ephemeral port. Without
    /// one it binds `listen_address:port` and waits for a receiver to send the
    /// iFacialMocap handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be resolved or the socket
    /// cannot be bound.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        match &config.target {
            Some(target) => {
                let target = resolve(target)?;
                Self::with_target(target)
            }
            None => Self::listen((config.listen_address.as_str(), config.port)),
        }
    }

    /// Send to a fixed receiver from an ephemeral local port
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn with_target(target: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0_u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        info!("Sending iFacialMocap data to {}", target);
        Ok(Self {
            socket,
            target: Some(target),
            discover: false,
            buffer: [0; 512],
        })
    }

    /// Wait for a receiver handshake on `address`
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn listen<A: ToSocketAddrs>(address: A) -> Result<Self> {
        let socket = UdpSocket::bind(address)?;
        socket.set_nonblocking(true)?;
        info!("Waiting for iFacialMocap handshake on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            target: None,
            discover: true,
            buffer: [0; 512],
        })
    }

    /// Current receiver, if known
    #[must_use]
    pub fn target(&self) -> Option<SocketAddr> {
        self.target
    }

    /// Local socket address
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be queried.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Drain pending handshakes; the most recent sender becomes the target
    fn poll_handshake(&mut self) {
        loop {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((len, sender)) => {
                    let payload = String::from_utf8_lossy(&self.buffer[..len]);
                    if payload.trim() == IFACIALMOCAP_HANDSHAKE {
                        if self.target != Some(sender) {
                            info!("iFacialMocap receiver connected from {}", sender);
                        }
                        self.target = Some(sender);
                    } else {
                        debug!("Ignoring {} byte datagram from {}", len, sender);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Failed to poll for handshake: {}", e);
                    break;
                }
            }
        }
    }
}

impl TransportSink for UdpTransport {
    fn send(&mut self, data: &TrackingData) -> Result<()> {
        if self.discover {
            self.poll_handshake();
        }
        let Some(target) = self.target else {
            return Ok(());
        };

        let message = format_ifacialmocap(data);
        self.socket
            .send_to(message.as_bytes(), target)
            .map_err(|e| Error::Transport(format!("Failed to send to {target}: {e}")))?;
        Ok(())
    }
}

fn resolve(target: &str) -> Result<SocketAddr> {
    target
        .to_socket_addrs()
        .map_err(|e| Error::Transport(format!("Invalid target {target}: {e}")))?
        .next()
        .ok_or_else(|| Error::Transport(format!("Target {target} did not resolve")))
}
