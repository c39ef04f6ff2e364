// Layer 1: Standard library imports
use std::io;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::serialize_frame;
use crate::address::MailboxAddress;
use crate::error::MsgMgrError;
use crate::mailbox::MessageSender;
use crate::message::Message;
use crate::opm::Opm;

/// Sending-side stub for a remote distributed mailbox.
///
/// The TCP connection is established lazily on the first post and retained
/// afterwards. Posts are serialized per proxy (one outstanding write at a
/// time). On a write failure the proxy closes and reopens the connection
/// exactly once within the same post; if the retry also fails the call
/// surfaces `TransportDown` and the caller still owns the unsent message.
// TODO: revisit the single rebuild-and-retry if peers prove flappier than
// a one-shot reconnect can absorb.
pub struct DistributedMailboxProxy {
    address: MailboxAddress,
    connection: Mutex<Option<TcpStream>>,
    opm: Arc<Opm>,
}

impl DistributedMailboxProxy {
    pub fn new(address: MailboxAddress, opm: Arc<Opm>) -> Self {
        Self {
            address,
            connection: Mutex::new(None),
            opm,
        }
    }

    async fn connect(&self) -> Result<TcpStream, MsgMgrError> {
        TcpStream::connect(self.address.inet_address)
            .await
            .map_err(|source| MsgMgrError::TransportDown {
                address: self.address.clone(),
                source,
            })
    }
}

/// Write one frame, surfacing a peer shutdown as an error.
///
/// A closed peer is only visible on the read side until the first failed
/// write, so probe for EOF before writing into a dead connection's send
/// buffer.
async fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> io::Result<()> {
    let mut probe = [0u8; 8];
    match stream.try_read(&mut probe) {
        Ok(0) => {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            ));
        }
        Ok(_) => {
            // The receiving side never sends; discard stray bytes.
        }
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
        Err(err) => return Err(err),
    }

    stream.write_all(frame).await?;
    stream.flush().await
}

#[async_trait]
impl MessageSender for DistributedMailboxProxy {
    async fn post(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        let frame = serialize_frame(message.as_ref(), &self.opm)?;

        let mut connection = self.connection.lock().await;
        if connection.is_none() {
            *connection = Some(self.connect().await?);
            debug!(target_mailbox = %self.address, "proxy connected");
        }

        let Some(stream) = connection.as_mut() else {
            unreachable!("connection established above");
        };
        match write_frame(stream, &frame).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(target_mailbox = %self.address, %err, "proxy write failed; rebuilding connection");
                *connection = None;

                let mut fresh = self.connect().await?;
                write_frame(&mut fresh, &frame)
                    .await
                    .map_err(|source| MsgMgrError::TransportDown {
                        address: self.address.clone(),
                        source,
                    })?;
                *connection = Some(fresh);
                info!(target_mailbox = %self.address, "post succeeded after connection rebuild");
                Ok(())
            }
        }
    }

    fn target_address(&self) -> &MailboxAddress {
        &self.address
    }
}

impl std::fmt::Debug for DistributedMailboxProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedMailboxProxy")
            .field("address", &self.address)
            .finish()
    }
}
