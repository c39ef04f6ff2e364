// Layer 1: Standard library imports
use std::net::SocketAddr;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::core::MailboxCore;
use crate::buffer::MessageBuffer;
use crate::error::MsgMgrError;
use crate::factory::MessageFactory;
use crate::transport::FrameCodec;

/// Receiving side of a distributed mailbox: a TCP listener bound at the
/// mailbox address plus one framed read task per connected peer.
///
/// Every decoded frame is recreated through the message factory and posted
/// onto the owning mailbox's ordinary queue; from the queue's point of
/// view a distributed mailbox is indistinguishable from a local one.
///
/// Malformed frames and unknown message ids reset the offending peer's
/// connection; the listener itself keeps running, and reads are
/// reactor-driven so one slow peer never blocks the others.
pub(crate) struct DistributedMailbox {
    factory: Arc<MessageFactory>,
}

impl DistributedMailbox {
    pub(crate) fn new(factory: Arc<MessageFactory>) -> Self {
        Self { factory }
    }

    /// Bind the listener at the mailbox's address and spawn the accept
    /// loop. Runs during owner activation.
    pub(crate) async fn bind_and_spawn(&self, core: &Arc<MailboxCore>) -> Result<(), MsgMgrError> {
        let address = core.address().clone();
        let listener =
            TcpListener::bind(address.inet_address)
                .await
                .map_err(|source| MsgMgrError::TransportDown {
                    address: address.clone(),
                    source,
                })?;
        debug!(mailbox = core.name(), local = %address.inet_address, "distributed mailbox listening");

        let token = core.reactor_token();
        let core = Arc::clone(core);
        let factory = Arc::clone(&self.factory);
        tokio::spawn(accept_loop(listener, core, factory, token));
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    core: Arc<MailboxCore>,
    factory: Arc<MessageFactory>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(mailbox = core.name(), %peer, "peer connected");
                    tokio::spawn(peer_loop(
                        stream,
                        peer,
                        Arc::clone(&core),
                        Arc::clone(&factory),
                        token.clone(),
                    ));
                }
                Err(err) => {
                    // Transient accept failures (fd pressure etc.) do not
                    // take the listener down.
                    warn!(mailbox = core.name(), %err, "accept failed");
                }
            }
        }
    }
    debug!(mailbox = core.name(), "distributed mailbox listener stopped");
}

async fn peer_loop(
    stream: TcpStream,
    peer: SocketAddr,
    core: Arc<MailboxCore>,
    factory: Arc<MessageFactory>,
    token: CancellationToken,
) {
    let mut framed = FramedRead::new(stream, FrameCodec::new());
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            frame = framed.next() => match frame {
                Some(Ok(frame)) => {
                    let mut buffer = MessageBuffer::from_bytes(&frame, true);
                    match factory.recreate(&mut buffer) {
                        Ok(Some(message)) => {
                            if let Err(err) = core.post(message) {
                                // Delivery failure is local; the peer stream
                                // stays healthy.
                                warn!(mailbox = core.name(), %peer, %err, "inbound message dropped");
                            }
                        }
                        Ok(None) => {
                            warn!(mailbox = core.name(), %peer, "unknown message id; resetting peer");
                            break;
                        }
                        Err(err) => {
                            warn!(mailbox = core.name(), %peer, %err, "malformed frame; resetting peer");
                            break;
                        }
                    }
                }
                Some(Err(err)) => {
                    warn!(mailbox = core.name(), %peer, %err, "framing error; resetting peer");
                    break;
                }
                None => {
                    debug!(mailbox = core.name(), %peer, "peer closed connection");
                    break;
                }
            }
        }
    }
}
