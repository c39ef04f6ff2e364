//! Local mailbox behavior: posting, dispatch order, lifecycle.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use common::{capture_handler, spawn_processor, wait_until, RecordMessage};
use msgmgr::error::MsgMgrError;
use msgmgr::message::ids::MSGMGR_TEST1_MSG_ID;
use msgmgr::prelude::*;

async fn system() -> MessagingSystem {
    MessagingSystem::new(SystemConfig::default())
        .await
        .expect("system assembly")
}

#[tokio::test]
async fn local_post_reaches_handler() {
    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("M"))
        .expect("create");

    let (handler, seen) = capture_handler();
    mailbox.add_handler(MSGMGR_TEST1_MSG_ID, handler);
    mailbox.activate().await.expect("activate");
    spawn_processor(&mailbox);

    let sender = system.find(&MailboxAddress::local("M")).expect("find");
    sender
        .post(RecordMessage::new("hello"))
        .await
        .expect("post");

    assert!(wait_until(1000, || seen.lock().len() == 1).await);
    let observed = format!("{:?}", seen.lock()[0]);
    assert!(observed.contains("hello"));

    mailbox.deactivate();
}

#[tokio::test]
async fn priority_overtakes_queued_messages() {
    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("prio"))
        .expect("create");

    let (handler, seen) = capture_handler();
    mailbox.add_handler(MSGMGR_TEST1_MSG_ID, handler);
    mailbox.activate().await.expect("activate");

    // Queue all three before dispatch starts so priority ordering is
    // deterministic.
    mailbox
        .post(RecordMessage::with_priority("first", 0))
        .expect("post");
    mailbox
        .post(RecordMessage::with_priority("urgent", 5))
        .expect("post");
    mailbox
        .post(RecordMessage::with_priority("third", 0))
        .expect("post");

    spawn_processor(&mailbox);
    assert!(wait_until(1000, || seen.lock().len() == 3).await);

    let texts: Vec<String> = seen
        .lock()
        .iter()
        .map(|message| {
            message
                .as_any()
                .downcast_ref::<RecordMessage>()
                .expect("record message")
                .text
                .clone()
        })
        .collect();
    assert_eq!(texts, vec!["urgent", "first", "third"]);

    mailbox.deactivate();
}

#[tokio::test]
async fn fifo_within_one_priority() {
    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("fifo"))
        .expect("create");

    let (handler, seen) = capture_handler();
    mailbox.add_handler(MSGMGR_TEST1_MSG_ID, handler);
    mailbox.activate().await.expect("activate");

    for i in 0..5 {
        mailbox.post(RecordMessage::new(format!("m{i}"))).expect("post");
    }
    spawn_processor(&mailbox);
    assert!(wait_until(1000, || seen.lock().len() == 5).await);

    let texts: Vec<String> = seen
        .lock()
        .iter()
        .map(|m| {
            m.as_any()
                .downcast_ref::<RecordMessage>()
                .expect("record message")
                .text
                .clone()
        })
        .collect();
    assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4"]);

    mailbox.deactivate();
}

#[tokio::test]
async fn post_rejected_before_activation() {
    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("inactive"))
        .expect("create");

    let result = mailbox.post(RecordMessage::new("too early"));
    assert!(matches!(result, Err(MsgMgrError::InactiveMailbox { .. })));
}

#[tokio::test]
async fn post_rejected_after_deactivation() {
    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("deactivated"))
        .expect("create");
    mailbox.activate().await.expect("activate");
    mailbox.deactivate();

    let result = mailbox.post(RecordMessage::new("too late"));
    assert!(matches!(result, Err(MsgMgrError::InactiveMailbox { .. })));
}

#[tokio::test]
async fn queue_full_surfaces_to_the_caller() {
    let config = SystemConfig::default().with_queue_high_water(2);
    let system = MessagingSystem::new(config).await.expect("system");
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("bounded"))
        .expect("create");
    mailbox.activate().await.expect("activate");

    mailbox.post(RecordMessage::new("a")).expect("post");
    mailbox.post(RecordMessage::new("b")).expect("post");
    let result = mailbox.post(RecordMessage::new("c"));
    assert!(matches!(result, Err(MsgMgrError::QueueFull { capacity: 2 })));

    mailbox.deactivate();
}

#[tokio::test]
async fn lookup_miss_for_unknown_name() {
    let system = system().await;
    let result = system.find(&MailboxAddress::local("nobody"));
    assert!(matches!(result, Err(MsgMgrError::LookupMiss(_))));
}

#[tokio::test]
async fn duplicate_local_registration_rejected() {
    let system = system().await;
    let first = system
        .create_local_mailbox(MailboxAddress::local("twin"))
        .expect("create");
    first.activate().await.expect("activate");

    let second = system
        .create_local_mailbox(MailboxAddress::local("twin"))
        .expect("create");
    let result = second.activate().await;
    assert!(matches!(
        result,
        Err(MsgMgrError::DuplicateRegistration { .. })
    ));

    first.deactivate();
}

#[tokio::test]
async fn acquire_release_destroys_on_final_release() {
    let system = system().await;
    let owner = system
        .create_local_mailbox(MailboxAddress::local("counted"))
        .expect("create");
    owner.activate().await.expect("activate");
    assert_eq!(owner.ref_count(), 1);

    let h1 = owner.acquire();
    let h2 = owner.acquire();
    assert_eq!(owner.ref_count(), 3);

    h1.release();
    h2.release();
    assert_eq!(owner.ref_count(), 1);
    assert_eq!(owner.state(), MailboxState::Activated);

    // Keep one poster handle beyond the owner's own release.
    let survivor = owner.acquire();
    owner.release();
    survivor
        .post(RecordMessage::new("still alive"))
        .await
        .expect("post through surviving handle");
    assert!(system.find(&MailboxAddress::local("counted")).is_ok());

    // The final release deactivates, deregisters, and destroys.
    survivor.release();
    // find() acquired (and released) its own handle above; the mailbox is
    // gone once every reference is dropped.
    assert!(wait_until(1000, || {
        matches!(
            system.find(&MailboxAddress::local("counted")),
            Err(MsgMgrError::LookupMiss(_))
        )
    })
    .await);
}

#[tokio::test]
async fn unhandled_message_id_is_consumed() {
    #[derive(Debug)]
    struct StrayMessage {
        source: MailboxAddress,
    }

    impl Message for StrayMessage {
        fn message_id(&self) -> MessageId {
            msgmgr::message::ids::MSGMGR_TEST2_MSG_ID
        }

        fn source_address(&self) -> &MailboxAddress {
            &self.source
        }

        fn version(&self) -> u32 {
            1
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("nohandler"))
        .expect("create");
    let (handler, seen) = capture_handler();
    mailbox.add_handler(MSGMGR_TEST1_MSG_ID, handler);
    mailbox.activate().await.expect("activate");

    // No handler is bound for this id: the message is logged and consumed,
    // and dispatch moves on to handled messages behind it.
    mailbox
        .post(Arc::new(StrayMessage {
            source: MailboxAddress::local("test-sender"),
        }))
        .expect("post");
    mailbox.post(RecordMessage::new("handled")).expect("post");

    spawn_processor(&mailbox);
    assert!(wait_until(1000, || seen.lock().len() == 1).await);
    let observed = format!("{:?}", seen.lock()[0]);
    assert!(observed.contains("handled"));

    mailbox.deactivate();
}

#[tokio::test]
async fn concurrent_workers_drain_the_queue() {
    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("pool"))
        .expect("create");

    let (handler, seen) = capture_handler();
    mailbox.add_handler(MSGMGR_TEST1_MSG_ID, handler);
    mailbox.activate().await.expect("activate");

    for i in 0..50 {
        mailbox.post(RecordMessage::new(format!("m{i}"))).expect("post");
    }

    let processor = MailboxProcessor::new(&mailbox);
    let worker_task = tokio::spawn(async move {
        processor.process_concurrent(4).await;
    });

    assert!(wait_until(2000, || seen.lock().len() == 50).await);
    mailbox.deactivate();
    worker_task.await.expect("workers exit after deactivate");
}

#[tokio::test]
async fn reusable_message_survives_dispatch() {
    #[derive(Debug)]
    struct ReusableNote {
        source: MailboxAddress,
        text: String,
    }

    impl Message for ReusableNote {
        fn message_id(&self) -> MessageId {
            MSGMGR_TEST1_MSG_ID
        }

        fn source_address(&self) -> &MailboxAddress {
            &self.source
        }

        fn version(&self) -> u32 {
            1
        }

        fn is_reusable(&self) -> bool {
            true
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    let system = system().await;
    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("reuse"))
        .expect("create");
    let (handler, seen) = capture_handler();
    mailbox.add_handler(MSGMGR_TEST1_MSG_ID, handler);
    mailbox.activate().await.expect("activate");
    spawn_processor(&mailbox);

    let note = Arc::new(ReusableNote {
        source: MailboxAddress::local("test-sender"),
        text: "again".to_string(),
    });

    // The creator keeps its clone; the dispatcher consumes only its own
    // reference, so the same message can be posted twice.
    mailbox.post(Arc::clone(&note) as Arc<dyn Message>).expect("post");
    assert!(wait_until(1000, || seen.lock().len() == 1).await);
    mailbox.post(Arc::clone(&note) as Arc<dyn Message>).expect("repost");
    assert!(wait_until(1000, || seen.lock().len() == 2).await);

    assert_eq!(note.text, "again");
    mailbox.deactivate();
}
