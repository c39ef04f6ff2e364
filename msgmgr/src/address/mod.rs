//! Mailbox addressing: stable identity for every mailbox in the system.
//!
//! An address names a mailbox, says which transport it speaks
//! (local pointer passing, distributed TCP, group multicast/broadcast),
//! and carries the physical coordinates (NEID, shelf/slot, ip:port) that
//! remote peers need to reach it. Addresses are the keys of the lookup
//! service and the subjects of discovery gossip.

pub mod mailbox_address;
pub mod well_known;

pub use mailbox_address::{
    AddressOrderingKey, MailboxAddress, MailboxAddressType, MailboxLocationType, RedundantRole,
};
pub use well_known::{
    CLIENT_AGENT_MAILBOX_NAME, CLIENT_AGENT_MAILBOX_PORT, DISCOVERY_MANAGER_IP_ADDRESS,
    DISCOVERY_MANAGER_MAILBOX_NAME, DISCOVERY_MANAGER_MAILBOX_PORT, FAULT_MANAGER_MAILBOX_NAME,
    FAULT_MANAGER_MAILBOX_PORT, LOCAL_IP_ADDRESS, LOGGER_MAILBOX_NAME, PROCMGR_MAILBOX_NAME,
    PROCMGR_MAILBOX_PORT, RESOURCE_MONITOR_MAILBOX_NAME, RESOURCE_MONITOR_MAILBOX_PORT,
    UNKNOWN_MAILBOX_NAME,
};
