//! Discovery and the non-proxy registry.
//!
//! The gossip tests need a working multicast route for 224.0.0.0/4
//! (e.g. `route add -net 224.0.0.0 netmask 240.0.0.0 dev eth0`) and are
//! ignored by default; the registry bookkeeping tests run everywhere.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use common::{capture_handler, free_tcp_port, spawn_processor, wait_until};
use msgmgr::message::ids::MSGMGR_DISCOVERY_MSG_ID;
use msgmgr::prelude::*;

fn remote_address(name: &str, port: u16) -> MailboxAddress {
    MailboxAddress::distributed(name, format!("127.0.0.1:{port}").parse().expect("addr"))
}

#[tokio::test]
async fn remote_registration_lands_in_non_proxy_registry() {
    // Without a discovery manager the lookup service keeps the registry
    // correct locally.
    let system = MessagingSystem::new(SystemConfig::default())
        .await
        .expect("system");

    let port = free_tcp_port();
    let address = remote_address("CallProc", port);
    let mailbox = system
        .create_distributed_mailbox(address.clone())
        .expect("create");
    mailbox.activate().await.expect("activate");

    let registry = system.lookup().non_proxy_registry();
    assert!(registry.contains(&address));

    mailbox.deactivate();
    assert!(!registry.contains(&address));
}

#[tokio::test]
async fn local_mailboxes_stay_out_of_the_non_proxy_registry() {
    let system = MessagingSystem::new(SystemConfig::default())
        .await
        .expect("system");

    let mailbox = system
        .create_local_mailbox(MailboxAddress::local("onlylocal"))
        .expect("create");
    mailbox.activate().await.expect("activate");

    assert!(system.lookup().non_proxy_registry().is_empty());
    mailbox.deactivate();
}

#[tokio::test]
async fn register_then_deregister_leaves_registry_unchanged() {
    let system = MessagingSystem::new(SystemConfig::default())
        .await
        .expect("system");
    let registry = system.lookup().non_proxy_registry();

    let before: usize = registry.len();
    let port = free_tcp_port();
    let address = remote_address("Transient", port);

    let mailbox = system
        .create_distributed_mailbox(address.clone())
        .expect("create");
    mailbox.activate().await.expect("activate");
    mailbox.deactivate();

    assert_eq!(registry.len(), before);
}

fn discovery_config(neid: &str) -> SystemConfig {
    SystemConfig::default().with_neid(neid).with_discovery(true)
}

#[tokio::test]
#[ignore = "requires a multicast route for 224.0.0.0/4 on the host"]
async fn discovery_propagates_registration_to_interested_nodes() {
    let node_a = MessagingSystem::new(discovery_config("NE-A"))
        .await
        .expect("node A");
    let node_b = MessagingSystem::new(discovery_config("NE-B"))
        .await
        .expect("node B");

    // Node B subscribes before node A registers.
    let notify = node_b
        .create_local_mailbox(MailboxAddress::local("watcher"))
        .expect("create watcher");
    let (handler, seen) = capture_handler();
    notify.add_handler(MSGMGR_DISCOVERY_MSG_ID, handler);
    notify.activate().await.expect("activate watcher");
    spawn_processor(&notify);

    let mut filter = MailboxAddress::default();
    filter.mailbox_name = "CallProc".to_string();
    let discovery_b = node_b.discovery().expect("discovery B");
    let current = discovery_b.register_for_updates(filter, notify.acquire());
    assert!(current.is_empty());

    // Node A brings up a distributed mailbox named CallProc.
    let port = free_tcp_port();
    let subject = remote_address("CallProc", port);
    let mailbox = node_a
        .create_distributed_mailbox(subject.clone())
        .expect("create subject");
    mailbox.activate().await.expect("activate subject");

    // B's notify mailbox receives the REGISTER gossip for the subject.
    assert!(wait_until(5000, || !seen.lock().is_empty()).await);
    {
        let seen = seen.lock();
        let update = seen[0]
            .as_any()
            .downcast_ref::<DiscoveryMessage>()
            .expect("discovery message");
        assert_eq!(update.operation(), DiscoveryOperation::Register);
        assert_eq!(update.subject(), &subject);
    }

    // Both registries converge on the subject.
    assert!(wait_until(5000, || {
        node_b.lookup().non_proxy_registry().contains(&subject)
    })
    .await);

    // Deregistration converges both registries back.
    mailbox.deactivate();
    assert!(wait_until(5000, || {
        !node_b.lookup().non_proxy_registry().contains(&subject)
            && !node_a.lookup().non_proxy_registry().contains(&subject)
    })
    .await);

    notify.deactivate();
}

#[tokio::test]
#[ignore = "requires a multicast route for 224.0.0.0/4 on the host"]
async fn own_gossip_is_never_reapplied_nor_fanned_out() {
    let node = MessagingSystem::new(discovery_config("NE-SOLO"))
        .await
        .expect("node");

    // Subscribe to everything this node could possibly gossip about.
    let notify = node
        .create_local_mailbox(MailboxAddress::local("self-watcher"))
        .expect("create watcher");
    let (handler, seen) = capture_handler();
    notify.add_handler(MSGMGR_DISCOVERY_MSG_ID, handler);
    notify.activate().await.expect("activate watcher");
    spawn_processor(&notify);

    let mut filter = MailboxAddress::default();
    filter.mailbox_name = "SelfSubject".to_string();
    let discovery = node.discovery().expect("discovery");
    discovery.register_for_updates(filter, notify.acquire());

    let port = free_tcp_port();
    let subject = remote_address("SelfSubject", port);
    let mailbox = node
        .create_distributed_mailbox(subject.clone())
        .expect("create subject");
    mailbox.activate().await.expect("activate subject");

    // The registration is applied locally once (by the local handler); the
    // multicast loopback copy is discarded by the self filter, so the
    // subscriber sees nothing.
    assert!(wait_until(2000, || {
        node.lookup().non_proxy_registry().contains(&subject)
    })
    .await);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(seen.lock().is_empty());

    mailbox.deactivate();
    notify.deactivate();
}

#[tokio::test]
#[ignore = "requires a multicast route for 224.0.0.0/4 on the host"]
async fn update_snapshot_returns_currently_matching_addresses() {
    let node = MessagingSystem::new(discovery_config("NE-SNAP"))
        .await
        .expect("node");

    let port = free_tcp_port();
    let subject = remote_address("Snapshot", port);
    let mailbox = node
        .create_distributed_mailbox(subject.clone())
        .expect("create subject");
    mailbox.activate().await.expect("activate subject");
    assert!(wait_until(2000, || {
        node.lookup().non_proxy_registry().contains(&subject)
    })
    .await);

    let notify = node
        .create_local_mailbox(MailboxAddress::local("snap-watcher"))
        .expect("create watcher");
    notify.activate().await.expect("activate watcher");

    let mut filter = MailboxAddress::default();
    filter.mailbox_name = "Snapshot".to_string();
    let discovery = node.discovery().expect("discovery");
    let current = discovery.register_for_updates(filter, notify.acquire());
    assert_eq!(current, vec![subject]);

    mailbox.deactivate();
    notify.deactivate();
}
