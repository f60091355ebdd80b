use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};

/// How a TCP three-way handshake attempt ended.
#[derive(Debug)]
pub enum Handshake {
    /// The peer completed the handshake.
    Accepted(Duration),
    /// The peer answered with a reset.
    Refused(Duration),
    /// No answer within the limit.
    TimedOut,
    Failed(io::Error),
}

impl Handshake {
    /// Round-trip time when the peer answered at all.
    pub fn latency(&self) -> Option<Duration> {
        match self {
            Handshake::Accepted(rtt) | Handshake::Refused(rtt) => Some(*rtt),
            _ => None,
        }
    }
}

pub async fn handshake(socket_addr: SocketAddr, limit: Duration) -> Handshake {
    let started = Instant::now();

    match timeout(limit, TcpStream::connect(socket_addr)).await {
        Ok(Ok(_stream)) => Handshake::Accepted(started.elapsed()),
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
            Handshake::Refused(started.elapsed())
        }
        Ok(Err(e)) => Handshake::Failed(e),
        Err(_elapsed) => Handshake::TimedOut,
    }
}

/// Errors that mean "nobody answered" rather than "the probe itself broke".
pub fn is_unreachable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionReset
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
