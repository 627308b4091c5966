//! Wake-on-LAN sender
//!
//! Fire-and-forget: a successful return means the datagram left this host,
//! not that the bay woke. Callers re-send freely, the packet is idempotent.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use crate::bays::HardwareAddress;
use crate::common::constants::{DEFAULT_WOL_PORT, MAGIC_PACKET_LEN};
use crate::error::{Error, Result};

/// Wake-on-LAN sender bound to one broadcast target.
#[derive(Debug, Clone, Copy)]
pub struct WakeOnLan {
    broadcast: Ipv4Addr,
    port: u16,
}

impl Default for WakeOnLan {
    fn default() -> Self {
        Self::new(Ipv4Addr::BROADCAST, DEFAULT_WOL_PORT)
    }
}

impl WakeOnLan {
    pub fn new(broadcast: Ipv4Addr, port: u16) -> Self {
        Self { broadcast, port }
    }

    pub fn target(&self) -> SocketAddr {
        SocketAddr::from((self.broadcast, self.port))
    }

    /// Send one magic packet for `mac`.
    pub fn wake(&self, mac: &HardwareAddress) -> Result<()> {
        let packet = build_magic_packet(mac);

        // Bind to any available port
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .map_err(|e| Error::Connection(format!("cannot open wake socket: {e}")))?;

        socket
            .set_broadcast(true)
            .map_err(|e| Error::Connection(format!("cannot enable broadcast: {e}")))?;

        let sent = socket
            .send_to(&packet, self.target())
            .map_err(|e| Error::Connection(format!("wake for {mac} not sent: {e}")))?;

        if sent != packet.len() {
            return Err(Error::Connection(format!(
                "wake for {mac} truncated ({sent} of {} bytes)",
                packet.len()
            )));
        }

        Ok(())
    }
}

/// Build the magic packet
///
/// Magic packet format:
/// - 6 bytes of 0xFF
/// - Target MAC repeated 16 times (96 bytes)
/// - Total: 102 bytes
pub fn build_magic_packet(mac: &HardwareAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];

    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(mac.octets());
    }

    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_magic_packet_format() {
        let mac: HardwareAddress = "11:22:33:44:55:66".parse().unwrap();
        let packet = build_magic_packet(&mac);

        assert_eq!(packet.len(), 102);
        assert_eq!(&packet[0..6], &[0xFF; 6]);

        let octets = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        for i in 0..16 {
            let offset = 6 + (i * 6);
            assert_eq!(&packet[offset..offset + 6], &octets);
        }
    }

    #[test]
    fn test_default_target() {
        let sender = WakeOnLan::default();
        assert_eq!(sender.target(), "255.255.255.255:9".parse().unwrap());
    }

    #[test]
    fn test_wake_reaches_loopback_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        let mac: HardwareAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        WakeOnLan::new(Ipv4Addr::LOCALHOST, port).wake(&mac).unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(len, 102);
        assert_eq!(&buf[6..12], mac.octets());
    }
}
