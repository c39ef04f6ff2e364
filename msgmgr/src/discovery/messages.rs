// Layer 1: Standard library imports
use std::any::Any;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::address::MailboxAddress;
use crate::buffer::MessageBuffer;
use crate::error::MsgMgrError;
use crate::factory::MessageFactory;
use crate::message::ids::{MSGMGR_DISCOVERY_LOCAL_MSG_ID, MSGMGR_DISCOVERY_MSG_ID};
use crate::message::{Message, MessageId};

/// Wire layout version for discovery messages.
const DISCOVERY_MESSAGE_VERSION: u32 = 1;

/// Operation carried by fleet-wide discovery gossip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOperation {
    Register,
    Deregister,
}

impl DiscoveryOperation {
    fn wire_value(self) -> u16 {
        match self {
            Self::Register => 1,
            Self::Deregister => 2,
        }
    }

    fn from_wire(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Register),
            2 => Some(Self::Deregister),
            _ => None,
        }
    }
}

/// Operation carried by a local request to the discovery manager's own
/// mailbox. Display dumps the registry contents to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalDiscoveryOperation {
    Register,
    Deregister,
    Display,
}

/// Gossip message exchanged between discovery managers over the group
/// transport: `{operation, originating PID, subject address}`.
///
/// The originating PID is the only defense against multicast loopback
/// duplicates: a message whose source address equals ours but whose PID
/// differs is a different process on the same host and must be accepted.
#[derive(Debug)]
pub struct DiscoveryMessage {
    source_address: MailboxAddress,
    operation: DiscoveryOperation,
    originating_pid: u32,
    subject: MailboxAddress,
}

impl DiscoveryMessage {
    pub fn new(
        source_address: MailboxAddress,
        operation: DiscoveryOperation,
        originating_pid: u32,
        subject: MailboxAddress,
    ) -> Self {
        Self {
            source_address,
            operation,
            originating_pid,
            subject,
        }
    }

    pub fn operation(&self) -> DiscoveryOperation {
        self.operation
    }

    pub fn originating_pid(&self) -> u32 {
        self.originating_pid
    }

    /// The address being registered or deregistered.
    pub fn subject(&self) -> &MailboxAddress {
        &self.subject
    }

    /// Register the wire deserializer with `factory`.
    pub fn register_support(factory: &MessageFactory) {
        factory.register_support(MSGMGR_DISCOVERY_MSG_ID, |header, buffer| {
            let raw_operation = buffer.extract::<u16>();
            let operation =
                DiscoveryOperation::from_wire(raw_operation).ok_or_else(|| {
                    MsgMgrError::WireFraming {
                        reason: format!("invalid discovery operation {raw_operation}"),
                    }
                })?;
            let originating_pid = buffer.extract::<u32>();
            let subject = buffer.extract::<MailboxAddress>();
            Ok(Arc::new(DiscoveryMessage {
                source_address: header.source_address.clone(),
                operation,
                originating_pid,
                subject,
            }))
        });
    }
}

impl Message for DiscoveryMessage {
    fn message_id(&self) -> MessageId {
        MSGMGR_DISCOVERY_MSG_ID
    }

    fn source_address(&self) -> &MailboxAddress {
        &self.source_address
    }

    fn version(&self) -> u32 {
        DISCOVERY_MESSAGE_VERSION
    }

    fn serialize(&self, buffer: &mut MessageBuffer) -> Result<(), MsgMgrError> {
        buffer.insert(&self.operation.wire_value());
        buffer.insert(&self.originating_pid);
        buffer.insert(&self.subject);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Local request posted to the discovery manager's mailbox; never crosses
/// the wire.
#[derive(Debug)]
pub struct DiscoveryLocalMessage {
    source_address: MailboxAddress,
    operation: LocalDiscoveryOperation,
    subject: MailboxAddress,
}

impl DiscoveryLocalMessage {
    pub fn new(
        source_address: MailboxAddress,
        operation: LocalDiscoveryOperation,
        subject: MailboxAddress,
    ) -> Self {
        Self {
            source_address,
            operation,
            subject,
        }
    }

    pub fn operation(&self) -> LocalDiscoveryOperation {
        self.operation
    }

    pub fn subject(&self) -> &MailboxAddress {
        &self.subject
    }
}

impl Message for DiscoveryLocalMessage {
    fn message_id(&self) -> MessageId {
        MSGMGR_DISCOVERY_LOCAL_MSG_ID
    }

    fn source_address(&self) -> &MailboxAddress {
        &self.source_address
    }

    fn version(&self) -> u32 {
        DISCOVERY_MESSAGE_VERSION
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::factory::serialize_for_wire;

    fn discovery_address() -> MailboxAddress {
        MailboxAddress::group(
            "DiscoveryManager",
            "224.9.9.1:12775".parse().unwrap(),
        )
        .with_neid("NE-01")
    }

    fn subject_address() -> MailboxAddress {
        MailboxAddress::distributed("CallProc", "127.0.0.1:12900".parse().unwrap())
    }

    #[test]
    fn discovery_message_round_trip() {
        let factory = MessageFactory::new();
        DiscoveryMessage::register_support(&factory);

        let original = DiscoveryMessage::new(
            discovery_address(),
            DiscoveryOperation::Register,
            4242,
            subject_address(),
        );

        let mut buffer = MessageBuffer::default();
        serialize_for_wire(&original, &mut buffer).unwrap();

        let mut inbound = MessageBuffer::from_bytes(buffer.raw(), true);
        let recreated = factory.recreate(&mut inbound).unwrap().unwrap();
        let typed = recreated
            .as_any()
            .downcast_ref::<DiscoveryMessage>()
            .unwrap();

        assert_eq!(typed.operation(), DiscoveryOperation::Register);
        assert_eq!(typed.originating_pid(), 4242);
        assert_eq!(typed.subject(), &subject_address());
        assert_eq!(typed.source_address(), &discovery_address());
    }

    #[test]
    fn invalid_operation_is_wire_framing() {
        let factory = MessageFactory::new();
        DiscoveryMessage::register_support(&factory);

        let mut buffer = MessageBuffer::default();
        buffer.insert(&MSGMGR_DISCOVERY_MSG_ID.raw());
        buffer.insert(&discovery_address());
        buffer.insert(&DISCOVERY_MESSAGE_VERSION);
        buffer.insert(&99u16); // no such operation
        buffer.insert(&4242u32);
        buffer.insert(&subject_address());

        let mut inbound = MessageBuffer::from_bytes(buffer.raw(), true);
        assert!(matches!(
            factory.recreate(&mut inbound),
            Err(MsgMgrError::WireFraming { .. })
        ));
    }

    #[test]
    fn local_message_has_no_wire_form() {
        let local = DiscoveryLocalMessage::new(
            discovery_address(),
            LocalDiscoveryOperation::Register,
            subject_address(),
        );
        let mut buffer = MessageBuffer::default();
        assert!(local.serialize(&mut buffer).is_err());
    }
}
