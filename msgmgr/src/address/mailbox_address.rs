// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::well_known::UNKNOWN_MAILBOX_NAME;

/// Transport a mailbox is capable of.
///
/// The location type decides both how messages reach the mailbox (pointer
/// passing, TCP stream, datagram) and how much of the address is carried on
/// the wire when the address itself is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MailboxLocationType {
    /// Sentinel; acts as "don't care" in filter matching.
    Unknown,
    /// Threads within one process exchange messages by pointer. No copy made.
    Local,
    /// Processes on one node exchange copies through shared memory. No
    /// serialization performed, so no byte-order conversion either.
    LocalSharedMemory,
    /// Processes on different nodes exchange serialized messages over TCP.
    Distributed,
    /// Fan-out to multiple nodes at once over multicast (or broadcast)
    /// datagrams.
    Group,
}

impl MailboxLocationType {
    /// Wire discriminant (4 bytes on the wire, network order when enabled).
    pub fn wire_value(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Local => 1,
            Self::LocalSharedMemory => 2,
            Self::Distributed => 3,
            Self::Group => 4,
        }
    }

    /// Decode a wire discriminant; `None` for out-of-range values.
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Local),
            2 => Some(Self::LocalSharedMemory),
            3 => Some(Self::Distributed),
            4 => Some(Self::Group),
            _ => None,
        }
    }

    /// True for transports whose mailboxes are reachable from other
    /// processes (and therefore participate in discovery).
    pub fn is_remote(self) -> bool {
        matches!(self, Self::Distributed | Self::Group)
    }
}

impl Default for MailboxLocationType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Whether the mailbox plays a physical role (tied to a specific card) or a
/// logical role that may float between redundant mates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MailboxAddressType {
    Unknown,
    Physical,
    Logical,
}

impl MailboxAddressType {
    pub fn wire_value(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Physical => 1,
            Self::Logical => 2,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Physical),
            2 => Some(Self::Logical),
            _ => None,
        }
    }
}

impl Default for MailboxAddressType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Redundancy role of the application owning the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RedundantRole {
    Unknown,
    Standby,
    Active,
    LoadShared,
}

impl RedundantRole {
    pub fn wire_value(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Standby => 1,
            Self::Active => 2,
            Self::LoadShared => 3,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Standby),
            2 => Some(Self::Active),
            3 => Some(Self::LoadShared),
            _ => None,
        }
    }
}

impl Default for RedundantRole {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Default inet address carried by unset addresses (`0.0.0.0:0`).
pub const UNKNOWN_INET_ADDRESS: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

/// Stable identity for a mailbox.
///
/// Equality compares every field; set membership in the lookup and
/// discovery registries relies on it. Sorted listings use
/// [`MailboxAddress::ordering_key`], which orders by name, then location,
/// then `ip:port` only, so two addresses can be ordering-equivalent without
/// being equal.
///
/// Default-constructed fields are "unknown" sentinels, which double as
/// wildcards for [`MailboxAddress::matches`].
///
/// # Example
///
/// ```rust
/// use msgmgr::address::{MailboxAddress, MailboxLocationType};
///
/// let addr = MailboxAddress::local("EventRouter");
/// assert_eq!(addr.location_type, MailboxLocationType::Local);
/// assert_eq!(addr.mailbox_name, "EventRouter");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailboxAddress {
    /// Physical or logical role of the owning application.
    pub address_type: MailboxAddressType,

    /// Transport this mailbox is capable of.
    pub location_type: MailboxLocationType,

    /// Geographic shelf number the mailbox resides in (0 = unknown).
    pub shelf_number: u32,

    /// Geographic slot number the mailbox resides in (0 = unknown).
    pub slot_number: u32,

    /// Application-given well-known mailbox name.
    pub mailbox_name: String,

    /// Network element identifier of the hosting node/card.
    pub neid: String,

    /// IP and port for the mailbox. Loopback can be used for applications
    /// that only communicate on-card.
    pub inet_address: SocketAddr,

    /// Redundancy role: active, standby, loadshared.
    pub redundant_role: RedundantRole,
}

impl Default for MailboxAddress {
    fn default() -> Self {
        Self {
            address_type: MailboxAddressType::Unknown,
            location_type: MailboxLocationType::Unknown,
            shelf_number: 0,
            slot_number: 0,
            mailbox_name: UNKNOWN_MAILBOX_NAME.to_string(),
            neid: String::new(),
            inet_address: UNKNOWN_INET_ADDRESS,
            redundant_role: RedundantRole::Unknown,
        }
    }
}

impl MailboxAddress {
    /// Address of an in-process mailbox. Only location and name matter for
    /// local mailboxes.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            location_type: MailboxLocationType::Local,
            mailbox_name: name.into(),
            ..Self::default()
        }
    }

    /// Address of a distributed (TCP) mailbox at `inet`.
    pub fn distributed(name: impl Into<String>, inet: SocketAddr) -> Self {
        Self {
            location_type: MailboxLocationType::Distributed,
            mailbox_name: name.into(),
            inet_address: inet,
            ..Self::default()
        }
    }

    /// Address of a group (multicast/broadcast datagram) mailbox at `inet`.
    pub fn group(name: impl Into<String>, inet: SocketAddr) -> Self {
        Self {
            location_type: MailboxLocationType::Group,
            mailbox_name: name.into(),
            inet_address: inet,
            ..Self::default()
        }
    }

    /// Builder-style NEID assignment.
    pub fn with_neid(mut self, neid: impl Into<String>) -> Self {
        self.neid = neid.into();
        self
    }

    /// Reset every field back to its unknown sentinel.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Ordering key: name, then location, then `ip:port`.
    ///
    /// This is the only ordering defined for addresses. It deliberately
    /// ignores the remaining fields, so it must not be used to test
    /// equality; sorted containers keyed by it collapse addresses that
    /// differ only in shelf/slot/role.
    pub fn ordering_key(&self) -> AddressOrderingKey {
        AddressOrderingKey {
            name: self.mailbox_name.clone(),
            location: self.location_type,
            inet: self.inet_address.to_string(),
        }
    }

    /// Filter matching against non-default fields of `criteria`.
    ///
    /// Any field left at its unknown sentinel in the criteria is "don't
    /// care". At least one field must be non-default for a match to be
    /// possible. Local-type criteria compare only location and name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use msgmgr::address::MailboxAddress;
    ///
    /// let mut filter = MailboxAddress::default();
    /// filter.mailbox_name = "CallProc".to_string();
    ///
    /// let candidate = MailboxAddress::distributed(
    ///     "CallProc",
    ///     "127.0.0.1:12900".parse().unwrap(),
    /// );
    /// assert!(MailboxAddress::matches(&filter, &candidate));
    /// ```
    pub fn matches(criteria: &Self, candidate: &Self) -> bool {
        let defaults = Self::default();
        let mut compared_any = false;

        if criteria.location_type == MailboxLocationType::Local {
            // Local mailboxes carry no meaningful transport coordinates.
            return candidate.location_type == MailboxLocationType::Local
                && criteria.mailbox_name == candidate.mailbox_name;
        }

        if criteria.location_type != defaults.location_type {
            compared_any = true;
            if criteria.location_type != candidate.location_type {
                return false;
            }
        }
        if criteria.address_type != defaults.address_type {
            compared_any = true;
            if criteria.address_type != candidate.address_type {
                return false;
            }
        }
        if criteria.shelf_number != defaults.shelf_number {
            compared_any = true;
            if criteria.shelf_number != candidate.shelf_number {
                return false;
            }
        }
        if criteria.slot_number != defaults.slot_number {
            compared_any = true;
            if criteria.slot_number != candidate.slot_number {
                return false;
            }
        }
        if criteria.mailbox_name != defaults.mailbox_name {
            compared_any = true;
            if criteria.mailbox_name != candidate.mailbox_name {
                return false;
            }
        }
        if criteria.neid != defaults.neid {
            compared_any = true;
            if criteria.neid != candidate.neid {
                return false;
            }
        }
        if criteria.inet_address != defaults.inet_address {
            compared_any = true;
            if criteria.inet_address != candidate.inet_address {
                return false;
            }
        }
        if criteria.redundant_role != defaults.redundant_role {
            compared_any = true;
            if criteria.redundant_role != candidate.redundant_role {
                return false;
            }
        }

        compared_any
    }
}

impl Display for MailboxAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{:?}/{} neid={} shelf={} slot={} type={:?} role={:?}",
            self.mailbox_name,
            self.location_type,
            self.inet_address,
            self.neid,
            self.shelf_number,
            self.slot_number,
            self.address_type,
            self.redundant_role,
        )
    }
}

/// Sort key for address listings: `(name, location, "ip:port")`.
///
/// Ordering-equivalence under this key is coarser than address equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressOrderingKey {
    name: String,
    location: MailboxLocationType,
    inet: String,
}
