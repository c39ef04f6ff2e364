// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::address::MailboxAddress;
use crate::buffer::MessageBuffer;
use crate::error::MsgMgrError;
use crate::message::{Message, MessageId};

/// Common header carried by every wire message, read by the factory before
/// the registered deserializer runs.
#[derive(Debug, Clone)]
pub struct WireHeader {
    pub message_id: MessageId,
    pub source_address: MailboxAddress,
    pub version: u32,
}

/// Deserializer registered per message id. Receives the already-extracted
/// header and the buffer positioned at the message-specific fields.
pub type MessageDeserializer = Arc<
    dyn Fn(&WireHeader, &mut MessageBuffer) -> Result<Arc<dyn Message>, MsgMgrError>
        + Send
        + Sync,
>;

/// Registry mapping message id to deserializer.
///
/// Explicitly constructed (one per messaging universe) so tests can run in
/// isolation. Registration replaces any prior entry for the id.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use msgmgr::factory::MessageFactory;
/// use msgmgr::message::ids::MSGMGR_TEST1_MSG_ID;
/// # use std::any::Any;
/// # use msgmgr::address::MailboxAddress;
/// # use msgmgr::message::{Message, MessageId};
/// # #[derive(Debug)]
/// # struct TestMessage { source: MailboxAddress, value: u32 }
/// # impl Message for TestMessage {
/// #     fn message_id(&self) -> MessageId { MSGMGR_TEST1_MSG_ID }
/// #     fn source_address(&self) -> &MailboxAddress { &self.source }
/// #     fn version(&self) -> u32 { 1 }
/// #     fn as_any(&self) -> &dyn Any { self }
/// # }
///
/// let factory = MessageFactory::new();
/// factory.register_support(MSGMGR_TEST1_MSG_ID, |header, buffer| {
///     Ok(Arc::new(TestMessage {
///         source: header.source_address.clone(),
///         value: buffer.extract::<u32>(),
///     }))
/// });
/// assert_eq!(factory.registered_ids(), vec![MSGMGR_TEST1_MSG_ID]);
/// ```
#[derive(Default)]
pub struct MessageFactory {
    registry: DashMap<MessageId, MessageDeserializer>,
}

impl MessageFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self {
            registry: DashMap::new(),
        }
    }

    /// Register (or replace) the deserializer for `id`.
    pub fn register_support(
        &self,
        id: MessageId,
        deserializer: impl Fn(&WireHeader, &mut MessageBuffer) -> Result<Arc<dyn Message>, MsgMgrError>
            + Send
            + Sync
            + 'static,
    ) {
        let previous = self.registry.insert(id, Arc::new(deserializer));
        if previous.is_some() {
            warn!(%id, "replacing previously registered deserializer");
        } else {
            debug!(%id, "registered message deserializer");
        }
    }

    /// Reconstruct a typed message from a received frame.
    ///
    /// `buffer` must be positioned at the frame's message id. Returns
    /// `Ok(None)` (logged at WARNING) when no deserializer is registered
    /// for the id; `WireFraming` when the frame's contents run out before
    /// the message is complete.
    pub fn recreate(
        &self,
        buffer: &mut MessageBuffer,
    ) -> Result<Option<Arc<dyn Message>>, MsgMgrError> {
        let id = MessageId::new(buffer.extract::<u16>());
        if buffer.underflowed() {
            return Err(MsgMgrError::WireFraming {
                reason: "frame shorter than a message id".to_string(),
            });
        }

        let Some(deserializer) = self.registry.get(&id).map(|e| Arc::clone(e.value())) else {
            warn!(%id, "no deserializer registered for message id");
            return Ok(None);
        };

        let source_address = buffer.extract::<MailboxAddress>();
        let version = buffer.extract::<u32>();
        if buffer.underflowed() {
            return Err(MsgMgrError::WireFraming {
                reason: format!("truncated wire header for message id {id}"),
            });
        }

        let header = WireHeader {
            message_id: id,
            source_address,
            version,
        };
        let message = deserializer(&header, buffer)?;
        if buffer.underflowed() {
            return Err(MsgMgrError::WireFraming {
                reason: format!("truncated payload for message id {id}"),
            });
        }
        Ok(Some(message))
    }

    /// Ids with a registered deserializer, sorted. Debug aid.
    pub fn registered_ids(&self) -> Vec<MessageId> {
        let mut ids: Vec<MessageId> = self.registry.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for MessageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageFactory")
            .field("registered", &self.registry.len())
            .finish()
    }
}

/// Serialize `message` with its common wire header into `buffer`:
/// `[u16 id][address block][u32 version][message fields]`.
///
/// The enclosing transport frame adds the leading total-length field.
pub fn serialize_for_wire(
    message: &dyn Message,
    buffer: &mut MessageBuffer,
) -> Result<(), MsgMgrError> {
    buffer.insert(&message.message_id().raw());
    buffer.insert(message.source_address());
    buffer.insert(&message.version());
    message.serialize(buffer)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::message::ids::{MSGMGR_TEST1_MSG_ID, MSGMGR_TEST2_MSG_ID};

    #[derive(Debug)]
    struct NumberMessage {
        source: MailboxAddress,
        version: u32,
        value: u32,
    }

    impl Message for NumberMessage {
        fn message_id(&self) -> MessageId {
            MSGMGR_TEST1_MSG_ID
        }

        fn source_address(&self) -> &MailboxAddress {
            &self.source
        }

        fn version(&self) -> u32 {
            self.version
        }

        fn serialize(&self, buffer: &mut MessageBuffer) -> Result<(), MsgMgrError> {
            buffer.insert(&self.value);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn register_number_support(factory: &MessageFactory) {
        factory.register_support(MSGMGR_TEST1_MSG_ID, |header, buffer| {
            Ok(Arc::new(NumberMessage {
                source: header.source_address.clone(),
                version: header.version,
                value: buffer.extract::<u32>(),
            }))
        });
    }

    fn sample_message() -> NumberMessage {
        NumberMessage {
            source: MailboxAddress::distributed(
                "sender",
                "127.0.0.1:12900".parse().unwrap(),
            ),
            version: 3,
            value: 42,
        }
    }

    #[test]
    fn serialize_then_recreate_round_trip() {
        let factory = MessageFactory::new();
        register_number_support(&factory);

        let original = sample_message();
        let mut buffer = MessageBuffer::default();
        serialize_for_wire(&original, &mut buffer).unwrap();

        let mut inbound = MessageBuffer::from_bytes(buffer.raw(), true);
        let recreated = factory.recreate(&mut inbound).unwrap().unwrap();

        let typed = recreated.as_any().downcast_ref::<NumberMessage>().unwrap();
        assert_eq!(typed.value, 42);
        assert_eq!(typed.version, 3);
        assert_eq!(typed.source, original.source);
    }

    #[test]
    fn unknown_id_yields_none() {
        let factory = MessageFactory::new();

        let mut buffer = MessageBuffer::default();
        serialize_for_wire(&sample_message(), &mut buffer).unwrap();

        let mut inbound = MessageBuffer::from_bytes(buffer.raw(), true);
        assert!(factory.recreate(&mut inbound).unwrap().is_none());
    }

    #[test]
    fn truncated_frame_is_wire_framing_error() {
        let factory = MessageFactory::new();
        register_number_support(&factory);

        let mut buffer = MessageBuffer::default();
        serialize_for_wire(&sample_message(), &mut buffer).unwrap();

        let truncated = &buffer.raw()[..buffer.len() - 3];
        let mut inbound = MessageBuffer::from_bytes(truncated, true);
        assert!(matches!(
            factory.recreate(&mut inbound),
            Err(MsgMgrError::WireFraming { .. })
        ));
    }

    #[test]
    fn registration_replaces_prior_entry() {
        let factory = MessageFactory::new();
        register_number_support(&factory);
        register_number_support(&factory);
        assert_eq!(factory.registered_ids().len(), 1);
    }

    #[test]
    fn registered_ids_sorted() {
        let factory = MessageFactory::new();
        factory.register_support(MSGMGR_TEST2_MSG_ID, |_, _| {
            Err(MsgMgrError::WireFraming {
                reason: "unused".to_string(),
            })
        });
        register_number_support(&factory);
        assert_eq!(
            factory.registered_ids(),
            vec![MSGMGR_TEST1_MSG_ID, MSGMGR_TEST2_MSG_ID]
        );
    }
}
