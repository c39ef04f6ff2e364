//! System configuration with sensible defaults.

// Layer 1: Standard library imports
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::address::DISCOVERY_MANAGER_MAILBOX_PORT;
use crate::mailbox::GroupOptions;

/// Default queue high-water mark for every mailbox.
pub const DEFAULT_QUEUE_HIGH_WATER: usize = 1000;

/// Default bound on concurrently armed timers per mailbox.
pub const DEFAULT_MAX_ACTIVE_TIMERS: usize = 256;

/// Default pre-allocated serialization buffers in the shared pool.
pub const DEFAULT_BUFFER_POOL_CAPACITY: usize = 32;

/// Per-universe configuration.
///
/// Everything environment-specific is externalized here: the node's NEID,
/// queue and timer bounds, the discovery multicast coordinates, and the
/// datagram options for group communication.
///
/// # Example
///
/// ```rust
/// use msgmgr::system::SystemConfig;
///
/// let config = SystemConfig::default()
///     .with_neid("NE-17")
///     .with_queue_high_water(500);
/// assert_eq!(config.queue_high_water, 500);
/// config.validate().unwrap();
///
/// // Round-trips through JSON for externalized deployment config.
/// let json = serde_json::to_string(&config).unwrap();
/// let parsed = SystemConfig::from_json_str(&json).unwrap();
/// assert_eq!(parsed.neid, "NE-17");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Network element identifier of this node/card.
    pub neid: String,

    /// Queue high-water mark; posts beyond it fail with `QueueFull`.
    pub queue_high_water: usize,

    /// Bound on concurrently armed timers per mailbox.
    pub max_active_timers: usize,

    /// Pre-allocated serialization buffers shared by the proxies.
    pub buffer_pool_capacity: usize,

    /// Whether to start the discovery manager.
    pub enable_discovery: bool,

    /// Multicast group the discovery managers meet on.
    pub discovery_address: SocketAddr,

    /// Datagram options applied to application group mailboxes and
    /// proxies.
    pub group_options: GroupOptions,

    /// Datagram options for the discovery group itself. Loopback stays on
    /// (several processes per host share the group) and the TTL is wide
    /// open so gossip crosses shelf routers.
    pub discovery_group_options: GroupOptions,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            neid: "LOCAL".to_string(),
            queue_high_water: DEFAULT_QUEUE_HIGH_WATER,
            max_active_timers: DEFAULT_MAX_ACTIVE_TIMERS,
            buffer_pool_capacity: DEFAULT_BUFFER_POOL_CAPACITY,
            enable_discovery: false,
            discovery_address: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(224, 9, 9, 1)),
                DISCOVERY_MANAGER_MAILBOX_PORT,
            ),
            group_options: GroupOptions::default(),
            discovery_group_options: GroupOptions {
                multicast_loopback: true,
                multicast_ttl: 255,
            },
        }
    }
}

impl SystemConfig {
    /// Builder-style NEID assignment.
    pub fn with_neid(mut self, neid: impl Into<String>) -> Self {
        self.neid = neid.into();
        self
    }

    /// Builder-style queue bound assignment.
    pub fn with_queue_high_water(mut self, high_water: usize) -> Self {
        self.queue_high_water = high_water;
        self
    }

    /// Builder-style discovery enablement.
    pub fn with_discovery(mut self, enable: bool) -> Self {
        self.enable_discovery = enable;
        self
    }

    /// Builder-style discovery group assignment.
    pub fn with_discovery_address(mut self, address: SocketAddr) -> Self {
        self.discovery_address = address;
        self
    }

    /// Parse a configuration from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check every field for usable values.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_high_water == 0 {
            return Err("queue_high_water must be > 0".to_string());
        }
        if self.max_active_timers == 0 {
            return Err("max_active_timers must be > 0".to_string());
        }
        self.group_options.validate()?;
        self.discovery_group_options.validate()?;
        if self.enable_discovery && !self.discovery_address.ip().is_multicast() {
            return Err(format!(
                "discovery_address {} is not a multicast group",
                self.discovery_address
            ));
        }
        Ok(())
    }
}
