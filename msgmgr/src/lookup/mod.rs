//! Mailbox Lookup Service (MLS): address to mailbox-or-proxy resolution.
//!
//! One instance per messaging universe. Three registries live here: the
//! in-process table of owned mailboxes (keyed by name), the outbound proxy
//! table (keyed by full address), and the non-proxy registry of remote-type
//! addresses known to exist anywhere in the fleet, which the discovery
//! manager keeps in sync across nodes.

pub mod registry;
pub mod service;

pub use registry::NonProxyRegistry;
pub use service::MailboxLookupService;
