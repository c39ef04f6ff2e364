//! Well-known mailbox names and ports.
//!
//! Platform services bind these names and ports at startup; applications
//! reach them through the lookup service without further configuration.
//! All same-host distributed communication uses the loopback IP.

/// Loopback IP used for on-host distributed mailboxes.
pub const LOCAL_IP_ADDRESS: &str = "127.0.0.1";

/// Sentinel name carried by default-constructed addresses.
pub const UNKNOWN_MAILBOX_NAME: &str = "UNKNOWN";

/// Logger service mailbox (local transport only).
pub const LOGGER_MAILBOX_NAME: &str = "Logger";

/// Discovery manager group mailbox. Every node joins this multicast group.
pub const DISCOVERY_MANAGER_MAILBOX_NAME: &str = "DiscoveryManager";
/// Discovery manager multicast group address.
pub const DISCOVERY_MANAGER_IP_ADDRESS: &str = "224.9.9.1";
/// Discovery manager multicast port.
pub const DISCOVERY_MANAGER_MAILBOX_PORT: u16 = 12775;

/// Fault manager distributed mailbox.
pub const FAULT_MANAGER_MAILBOX_NAME: &str = "FaultManager";
pub const FAULT_MANAGER_MAILBOX_PORT: u16 = 12776;

/// Process manager distributed mailbox.
pub const PROCMGR_MAILBOX_NAME: &str = "ProcessManager";
pub const PROCMGR_MAILBOX_PORT: u16 = 12777;

/// Resource monitor distributed mailbox.
pub const RESOURCE_MONITOR_MAILBOX_NAME: &str = "ResourceMonitor";
pub const RESOURCE_MONITOR_MAILBOX_PORT: u16 = 12778;

/// EMS client agent distributed mailbox.
pub const CLIENT_AGENT_MAILBOX_NAME: &str = "ClientAgent";
pub const CLIENT_AGENT_MAILBOX_PORT: u16 = 12877;
