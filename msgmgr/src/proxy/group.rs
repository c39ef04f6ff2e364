// Layer 1: Standard library imports
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::debug;

// Layer 3: Internal module imports
use super::serialize_frame;
use crate::address::MailboxAddress;
use crate::error::MsgMgrError;
use crate::mailbox::{GroupOptions, MessageSender};
use crate::message::Message;
use crate::opm::Opm;

/// Sending-side stub for a group mailbox.
///
/// Stateless by design: every post is an independent datagram send with no
/// retry (the transport is unreliable anyway). The socket is bound lazily
/// on the first post and configured with the proxy's multicast loopback
/// and TTL options (or broadcast mode for non-multicast groups).
pub struct GroupMailboxProxy {
    address: MailboxAddress,
    options: GroupOptions,
    socket: Mutex<Option<UdpSocket>>,
    opm: Arc<Opm>,
}

impl GroupMailboxProxy {
    pub fn new(address: MailboxAddress, options: GroupOptions, opm: Arc<Opm>) -> Self {
        Self {
            address,
            options,
            socket: Mutex::new(None),
            opm,
        }
    }

    async fn bind(&self) -> Result<UdpSocket, MsgMgrError> {
        let transport_down = |source: std::io::Error| MsgMgrError::TransportDown {
            address: self.address.clone(),
            source,
        };

        let local = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        let socket = UdpSocket::bind(local).await.map_err(transport_down)?;

        match self.address.inet_address.ip() {
            IpAddr::V4(ip) if ip.is_multicast() => {
                socket
                    .set_multicast_loop_v4(self.options.multicast_loopback)
                    .map_err(transport_down)?;
                socket
                    .set_multicast_ttl_v4(u32::from(self.options.multicast_ttl))
                    .map_err(transport_down)?;
            }
            _ => {
                socket.set_broadcast(true).map_err(transport_down)?;
            }
        }
        debug!(group = %self.address.inet_address, "group proxy socket bound");
        Ok(socket)
    }
}

#[async_trait]
impl MessageSender for GroupMailboxProxy {
    async fn post(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        let frame = serialize_frame(message.as_ref(), &self.opm)?;

        let mut socket = self.socket.lock().await;
        if socket.is_none() {
            *socket = Some(self.bind().await?);
        }
        let Some(bound) = socket.as_ref() else {
            unreachable!("socket bound above");
        };

        bound
            .send_to(&frame, self.address.inet_address)
            .await
            .map_err(|source| MsgMgrError::TransportDown {
                address: self.address.clone(),
                source,
            })?;
        Ok(())
    }

    fn target_address(&self) -> &MailboxAddress {
        &self.address
    }
}

impl std::fmt::Debug for GroupMailboxProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupMailboxProxy")
            .field("address", &self.address)
            .field("options", &self.options)
            .finish()
    }
}
