use std::{net::SocketAddr, sync::Arc};

use log::{debug, error, info, warn};
use pack::{ArtDmxPacket, PacketError};
use tokio::{net::UdpSocket, task::JoinHandle};

use crate::{
    controls::{ControlValues, SharedControls},
    stop::{StopSignal, StopToken},
};

pub mod pack;

/// Art-Net datagrams top out at 18 header bytes plus 512 channels; leave room
/// for senders that pad.
const RECEIVE_BUFFER: usize = 1024;

/// Listens for ArtDmx packets and writes channels 0..=2 into the shared
/// controls. Lost, late or malformed packets leave the last accepted values
/// in place.
pub struct ArtNetReceiver {
    socket: UdpSocket,
    controls: Arc<SharedControls>,
}

/// A running receiver. Dropping the handle does not stop it; call `stop`.
pub struct ArtNetHandle {
    local_addr: SocketAddr,
    stop: StopSignal,
    task: JoinHandle<()>,
}

impl ArtNetReceiver {
    pub async fn bind(addr: SocketAddr, controls: Arc<SharedControls>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Control-Net: listening on {}", socket.local_addr()?);

        Ok(Self { socket, controls })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the receive loop on its own task.
    pub fn spawn(self) -> std::io::Result<ArtNetHandle> {
        let local_addr = self.local_addr()?;
        let stop = StopSignal::new();
        let token = stop.token();
        let task = tokio::spawn(async move { self.run(token).await });

        Ok(ArtNetHandle {
            local_addr,
            stop,
            task,
        })
    }

    pub async fn run(self, mut stop: StopToken) {
        let mut buffer = [0u8; RECEIVE_BUFFER];

        loop {
            tokio::select! {
                _ = stop.stopped() => break,
                received = self.socket.recv_from(&mut buffer) => match received {
                    Ok((len, from)) => {
                        match handle_datagram(&self.controls, &buffer[..len]) {
                            Ok(values) => debug!("Control-Net: {from} set {values:?}"),
                            Err(PacketError::UnsupportedOpcode(opcode)) => {
                                debug!("Control-Net: {from} sent opcode 0x{opcode:04X}, ignoring")
                            }
                            Err(e) => warn!("Control-Net: dropped packet from {from}: {e}"),
                        }
                    }
                    Err(e) => error!("Control-Net: receive failed: {e}"),
                },
            }
        }

        // The socket is closed when `self` drops here
        info!("Control-Net: receiver stopped");
    }
}

/// Parse one datagram and, if it is a full ArtDmx universe, publish its
/// control channels.
pub fn handle_datagram(
    controls: &SharedControls,
    datagram: &[u8],
) -> Result<ControlValues, PacketError> {
    let packet = ArtDmxPacket::parse(datagram)?;
    let values = packet.control_values();
    controls.store(values);

    Ok(values)
}

impl ArtNetHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop listening and wait for the socket to close.
    pub async fn stop(self) {
        self.stop.stop();
        if let Err(e) = self.task.await {
            error!("Control-Net: receiver task failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pack::{ArtDmxHeaderPack, UNIVERSE_SLOTS};
    use super::*;
    use std::time::Duration;

    fn universe(first: &[u8]) -> Vec<u8> {
        let mut channels = vec![0u8; UNIVERSE_SLOTS];
        channels[..first.len()].copy_from_slice(first);
        channels
    }

    #[test]
    fn test_bad_signature_leaves_controls_alone() {
        let controls = SharedControls::default();
        let before = controls.snapshot();

        let mut datagram = ArtDmxHeaderPack::dmx(0, 512)
            .datagram(&universe(&[1, 2, 3]))
            .unwrap();
        datagram[..8].copy_from_slice(b"Art-Nop\0");

        assert_eq!(
            Err(PacketError::BadSignature),
            handle_datagram(&controls, &datagram)
        );
        assert_eq!(before, controls.snapshot());
    }

    #[test]
    fn test_undersized_packet_leaves_controls_alone() {
        let controls = SharedControls::default();
        let before = controls.snapshot();

        let datagram = ArtDmxHeaderPack::dmx(0, 511)
            .datagram(&[7; 511])
            .unwrap();

        assert!(handle_datagram(&controls, &datagram).is_err());
        assert_eq!(before, controls.snapshot());
    }

    #[test]
    fn test_full_universe_updates_controls() {
        let controls = SharedControls::default();
        let datagram = ArtDmxHeaderPack::dmx(0, 512)
            .datagram(&universe(&[200, 100, 50, 9, 9]))
            .unwrap();

        handle_datagram(&controls, &datagram).unwrap();
        assert_eq!(
            ControlValues {
                intensity: 200,
                rate: 100,
                scale: 50
            },
            controls.snapshot()
        );
    }

    #[tokio::test]
    async fn test_receiver_over_udp() {
        let controls = Arc::new(SharedControls::default());
        let receiver = ArtNetReceiver::bind("127.0.0.1:0".parse().unwrap(), controls.clone())
            .await
            .unwrap();
        let handle = receiver.spawn().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // Junk first; the receiver must survive it
        sender.send_to(b"hello", handle.local_addr()).await.unwrap();

        let datagram = ArtDmxHeaderPack::dmx(1, 512)
            .datagram(&universe(&[200, 100, 50]))
            .unwrap();
        sender.send_to(&datagram, handle.local_addr()).await.unwrap();

        let expected = ControlValues {
            intensity: 200,
            rate: 100,
            scale: 50,
        };
        tokio::time::timeout(Duration::from_secs(2), async {
            while controls.snapshot() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("controls should follow the packet");

        assert!(!handle.is_finished());
        tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("receiver should stop promptly");
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let controls = Arc::new(SharedControls::default());
        let first = ArtNetReceiver::bind("127.0.0.1:0".parse().unwrap(), controls.clone())
            .await
            .unwrap();

        let taken = first.local_addr().unwrap();
        assert!(ArtNetReceiver::bind(taken, controls).await.is_err());
    }
}
