//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use msgmgr::buffer::MessageBuffer;
use msgmgr::error::MsgMgrError;
use msgmgr::factory::MessageFactory;
use msgmgr::mailbox::{handler, MessageHandler};
use msgmgr::message::ids::{MSGMGR_TEST1_MSG_ID, MSGMGR_TEST_DISTRIBUTED_MSG_ID};
use msgmgr::prelude::*;

/// Local-only test message carrying a text payload and a priority.
#[derive(Debug)]
pub struct RecordMessage {
    pub source: MailboxAddress,
    pub text: String,
    pub priority: u32,
}

impl RecordMessage {
    pub fn new(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            source: MailboxAddress::local("test-sender"),
            text: text.into(),
            priority: 0,
        })
    }

    pub fn with_priority(text: impl Into<String>, priority: u32) -> Arc<Self> {
        Arc::new(Self {
            source: MailboxAddress::local("test-sender"),
            text: text.into(),
            priority,
        })
    }
}

impl Message for RecordMessage {
    fn message_id(&self) -> MessageId {
        MSGMGR_TEST1_MSG_ID
    }

    fn source_address(&self) -> &MailboxAddress {
        &self.source
    }

    fn version(&self) -> u32 {
        1
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wire-capable test message: one int and one string.
#[derive(Debug)]
pub struct WireValueMessage {
    pub source: MailboxAddress,
    pub int_value: i32,
    pub string_value: String,
}

impl WireValueMessage {
    pub fn new(source: MailboxAddress, int_value: i32, string_value: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            source,
            int_value,
            string_value: string_value.into(),
        })
    }

    pub fn register_support(factory: &MessageFactory) {
        factory.register_support(MSGMGR_TEST_DISTRIBUTED_MSG_ID, |header, buffer| {
            Ok(Arc::new(WireValueMessage {
                source: header.source_address.clone(),
                int_value: buffer.extract::<i32>(),
                string_value: buffer.extract::<String>(),
            }))
        });
    }
}

impl Message for WireValueMessage {
    fn message_id(&self) -> MessageId {
        MSGMGR_TEST_DISTRIBUTED_MSG_ID
    }

    fn source_address(&self) -> &MailboxAddress {
        &self.source
    }

    fn version(&self) -> u32 {
        1
    }

    fn serialize(&self, buffer: &mut MessageBuffer) -> Result<(), MsgMgrError> {
        buffer.insert(&self.int_value);
        buffer.insert(&self.string_value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Messages observed by a capture handler, in dispatch order.
pub type Seen = Arc<Mutex<Vec<Arc<dyn Message>>>>;

/// Handler that records every message it sees.
pub fn capture_handler() -> (MessageHandler, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let h = handler(move |message| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().push(message);
            Ok(())
        }
    });
    (h, seen)
}

/// Poll `condition` until it holds or `deadline_ms` elapses.
pub async fn wait_until(deadline_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(deadline_ms);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// A TCP port that was free a moment ago.
pub fn free_tcp_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral");
    listener.local_addr().expect("local addr").port()
}

/// A UDP port that was free a moment ago.
pub fn free_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind ephemeral");
    socket.local_addr().expect("local addr").port()
}

/// Spawn a single-worker processor for `mailbox`.
pub fn spawn_processor(mailbox: &MailboxOwnerHandle) {
    let processor = MailboxProcessor::new(mailbox);
    tokio::spawn(async move {
        processor.process().await;
    });
}
