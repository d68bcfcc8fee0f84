use super::{DialError, Dialer};
use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// Dials plain TCP streams.
#[derive(Debug, Clone, Default)]
pub struct TcpDialer {
    /// Disable Nagle on new streams
    pub nodelay: bool,
    /// TCP keepalive idle time; `None` leaves the OS default
    pub keepalive: Option<Duration>,
}

impl TcpDialer {
    pub fn new(nodelay: bool, keepalive: Option<Duration>) -> Self {
        Self { nodelay, keepalive }
    }

    fn configure(&self, stream: &TcpStream) -> std::io::Result<()> {
        if self.nodelay {
            stream.set_nodelay(true)?;
        }
        if let Some(idle) = self.keepalive {
            let sock = SockRef::from(stream);
            sock.set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Conn = TcpStream;

    async fn dial(&self, endpoint: &str) -> Result<TcpStream, DialError> {
        let stream = TcpStream::connect(endpoint).await?;
        self.configure(&stream)?;
        trace!(
            "Dialed {} (local {:?})",
            endpoint,
            stream.local_addr().ok()
        );
        Ok(stream)
    }
}
