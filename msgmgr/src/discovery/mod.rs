//! Discovery: fleet-wide propagation of remote mailbox registrations.
//!
//! Every node runs a discovery manager bound to the same well-known
//! multicast group. Local registrations and deregistrations of
//! remote-type mailboxes are applied to the node's non-proxy registry and
//! gossiped to the group; incoming gossip (minus the node's own posts,
//! filtered by originating PID) is applied the same way and fanned out to
//! subscribed mailboxes whose address filter matches the subject.

pub mod manager;
pub mod messages;

pub use manager::DiscoveryManager;
pub use messages::{
    DiscoveryLocalMessage, DiscoveryMessage, DiscoveryOperation, LocalDiscoveryOperation,
};
