// Layer 1: Standard library imports
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::core::MailboxCore;
use crate::buffer::{MessageBuffer, MAX_MESSAGE_LENGTH};
use crate::error::MsgMgrError;
use crate::factory::MessageFactory;

/// Datagram options for group mailboxes and proxies.
///
/// Loopback decides whether multicast sends are delivered back to sockets
/// on the sending host (required when several processes on one node share
/// a group). TTL bounds how many router hops a multicast datagram may
/// take (1 keeps it on the local subnet).
///
/// For multicast to function at all, the host needs a route for
/// 224.0.0.0/4 on the participating interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOptions {
    pub multicast_loopback: bool,
    pub multicast_ttl: u8,
}

impl GroupOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.multicast_ttl == 0 {
            return Err("multicast_ttl must be in 1..=255".to_string());
        }
        Ok(())
    }
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            multicast_loopback: true,
            multicast_ttl: 1,
        }
    }
}

/// Receiving side of a group mailbox: one datagram socket, one frame per
/// datagram, no reassembly.
///
/// When the address IP falls in 224.0.0.0/4 the socket joins that
/// multicast group; otherwise it receives broadcast datagrams on the
/// port. Decoded frames take the same factory-recreate-and-post path as
/// the distributed mailbox. Malformed datagrams are logged and dropped;
/// there is no peer state to reset.
pub(crate) struct GroupMailbox {
    factory: Arc<MessageFactory>,
    #[allow(dead_code)] // options apply to the send side; kept for symmetry
    options: GroupOptions,
}

impl GroupMailbox {
    pub(crate) fn new(factory: Arc<MessageFactory>, options: GroupOptions) -> Self {
        Self { factory, options }
    }

    pub(crate) async fn bind_and_spawn(&self, core: &Arc<MailboxCore>) -> Result<(), MsgMgrError> {
        let address = core.address().clone();
        let socket = bind_group_socket(address.inet_address).map_err(|source| {
            MsgMgrError::TransportDown {
                address: address.clone(),
                source,
            }
        })?;
        debug!(mailbox = core.name(), group = %address.inet_address, "group mailbox receiving");

        let token = core.reactor_token();
        let core = Arc::clone(core);
        let factory = Arc::clone(&self.factory);
        tokio::spawn(receive_loop(socket, core, factory, token));
        Ok(())
    }
}

/// Bind a reusable datagram socket on the group port and join the
/// multicast group (or enable broadcast reception).
fn bind_group_socket(group: SocketAddr) -> io::Result<UdpSocket> {
    let IpAddr::V4(group_ip) = group.ip() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "group mailboxes require an IPv4 address",
        ));
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    // Several processes on one host share the well-known group port.
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), group.port());
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;

    let socket = UdpSocket::from_std(socket.into())?;
    if group_ip.is_multicast() {
        socket.join_multicast_v4(group_ip, Ipv4Addr::UNSPECIFIED)?;
    }
    Ok(socket)
}

async fn receive_loop(
    socket: UdpSocket,
    core: Arc<MailboxCore>,
    factory: Arc<MessageFactory>,
    token: CancellationToken,
) {
    let mut datagram = vec![0u8; 2 + MAX_MESSAGE_LENGTH];
    loop {
        let (received, peer) = tokio::select! {
            () = token.cancelled() => break,
            received = socket.recv_from(&mut datagram) => match received {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(mailbox = core.name(), %err, "datagram receive failed");
                    continue;
                }
            }
        };

        if received < 4 {
            warn!(mailbox = core.name(), %peer, received, "datagram too short for a frame");
            continue;
        }
        let claimed = u16::from_be_bytes([datagram[0], datagram[1]]) as usize;
        if claimed < 2 || claimed > received - 2 {
            warn!(mailbox = core.name(), %peer, claimed, received, "impossible datagram frame length");
            continue;
        }

        let mut buffer = MessageBuffer::from_bytes(&datagram[2..2 + claimed], true);
        match factory.recreate(&mut buffer) {
            Ok(Some(message)) => {
                if let Err(err) = core.post(message) {
                    warn!(mailbox = core.name(), %peer, %err, "inbound datagram dropped");
                }
            }
            Ok(None) => {
                warn!(mailbox = core.name(), %peer, "unknown message id in datagram");
            }
            Err(err) => {
                warn!(mailbox = core.name(), %peer, %err, "malformed datagram");
            }
        }
    }
    debug!(mailbox = core.name(), "group mailbox receiver stopped");
}
