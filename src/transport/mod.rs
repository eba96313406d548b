use anyhow::{Context, Result, anyhow};
use etherparse::PacketBuilder;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::{debug, info};


/// Largest IP packet a standard (non-jumbo) Ethernet link carries.
pub const STANDARD_MTU: usize = 1500;

pub trait Transport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize>;
}

pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Resolves `destination` (host:port) and connects an ephemeral local socket to it.
    pub fn connect(destination: &str) -> Result<Self> {
        let peer = destination
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve {destination}"))?
            .next()
            .ok_or_else(|| anyhow!("{destination} did not resolve to any address"))?;

        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket =
            UdpSocket::bind(local).with_context(|| format!("Failed to bind UDP socket on {local}"))?;
        socket
            .connect(peer)
            .with_context(|| format!("Failed to connect UDP socket to {peer}"))?;

        info!(peer = %peer, local = ?socket.local_addr().ok(), "UDP transport ready");
        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .context("Failed to read local socket address")
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        let sent = self.socket.send(datagram)?;
        if sent != datagram.len() {
            debug!(sent, expected = datagram.len(), "Short UDP write");
        }
        Ok(sent)
    }
}

/// Size of the IP packet (IP + UDP headers + payload) that carries `payload_len`
/// bytes from `source` to `destination`.
pub fn ip_packet_size(source: SocketAddr, destination: SocketAddr, payload_len: usize) -> usize {
    let builder = match (source.ip(), destination.ip()) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => PacketBuilder::ipv4(src.octets(), dst.octets(), 64),
        (src, dst) => PacketBuilder::ipv6(to_v6(src).octets(), to_v6(dst).octets(), 64),
    };
    builder
        .udp(source.port(), destination.port())
        .size(payload_len)
}

fn to_v6(addr: IpAddr) -> Ipv6Addr {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    }
}

pub fn needs_jumbo_frames(ip_packet_size: usize) -> bool {
    ip_packet_size > STANDARD_MTU
}
