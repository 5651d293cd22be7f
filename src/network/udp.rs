use tokio::net::UdpSocket;
use std::net::SocketAddr;
use std::io::Result;

/// Largest inbound datagram accepted; client messages are tiny.
pub const MAX_CLIENT_DATAGRAM: usize = 1024;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

pub struct UdpServer {
    socket: UdpSocket,
}

impl UdpServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        tracing::info!("UDP server listening on {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn recv(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_CLIENT_DATAGRAM];
        let (len, addr) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, addr))
    }

    pub async fn send(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket.send_to(data, addr).await?;
        Ok(())
    }

    /// Sends `data` to every address, logging failures. Returns how many sends succeeded.
    pub async fn send_to_many(&self, data: &[u8], addrs: &[SocketAddr]) -> usize {
        let mut delivered = 0;
        for addr in addrs {
            match self.socket.send_to(data, addr).await {
                Ok(_) => delivered += 1,
                Err(e) => tracing::warn!("Failed to send to {}: {}", addr, e),
            }
        }
        delivered
    }
}
