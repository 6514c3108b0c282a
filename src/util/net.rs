//! Socket setup helpers
//!
//! Both worker sockets are bound with `SO_REUSEADDR` so a restarted worker can
//! take its well-known ports back immediately. tokio exposes the option for
//! TCP sockets; the UDP socket is built with `socket2`.

use socket2::{Domain, Socket, Type};
use std::io;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use tokio::net::{TcpListener, TcpSocket};

/// Create an IPv4 UDP socket with `SO_REUSEADDR` set and bind it to `addr`
///
/// The returned socket is in blocking mode.
pub fn bind_reusable_udp(addr: SocketAddrV4) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::V4(addr).into())?;
    Ok(socket.into())
}

/// Bind a reusable UDP socket and register it with the tokio runtime
///
/// Must be called from within a runtime.
pub fn bind_reusable_udp_async(addr: SocketAddrV4) -> io::Result<tokio::net::UdpSocket> {
    let socket = bind_reusable_udp(addr)?;
    socket.set_nonblocking(true)?;
    tokio::net::UdpSocket::from_std(socket)
}

/// Bind a TCP listener with `SO_REUSEADDR` and the given backlog
///
/// Must be called from within a runtime.
pub fn bind_reusable_tcp(addr: SocketAddrV4, backlog: u32) -> io::Result<TcpListener> {
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr.into())?;
    socket.listen(backlog)
}
