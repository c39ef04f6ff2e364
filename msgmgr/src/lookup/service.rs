// Layer 1: Standard library imports
use std::sync::{Arc, OnceLock};

// Layer 2: Third-party crate imports
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::registry::NonProxyRegistry;
use crate::address::{MailboxAddress, MailboxLocationType};
use crate::discovery::DiscoveryManager;
use crate::error::MsgMgrError;
use crate::mailbox::{
    GroupOptions, MailboxCore, MailboxHandle, MailboxOwnerHandle, MessageSender,
};
use crate::opm::Opm;
use crate::proxy::{DistributedMailboxProxy, GroupMailboxProxy};

/// Process-wide registry resolving a [`MailboxAddress`] to an in-process
/// mailbox or an outbound proxy.
///
/// - Local addresses resolve against the in-process table by name.
/// - Distributed and group addresses resolve to a proxy, created on first
///   lookup and retained in the proxy registry.
///
/// Registration happens when an owner activates a mailbox; remote-type
/// registrations additionally flow to the discovery manager so every node
/// in the fleet learns the address.
pub struct MailboxLookupService {
    local_registry: DashMap<String, Arc<MailboxCore>>,
    proxy_registry: DashMap<MailboxAddress, Arc<dyn MessageSender>>,
    non_proxy_registry: Arc<NonProxyRegistry>,
    discovery: OnceLock<Arc<DiscoveryManager>>,
    opm: Arc<Opm>,
    group_options: GroupOptions,
}

impl MailboxLookupService {
    pub(crate) fn new(opm: Arc<Opm>, group_options: GroupOptions) -> Arc<Self> {
        Arc::new(Self {
            local_registry: DashMap::new(),
            proxy_registry: DashMap::new(),
            non_proxy_registry: Arc::new(NonProxyRegistry::new()),
            discovery: OnceLock::new(),
            opm,
            group_options,
        })
    }

    /// Resolve `address` to a post-capable handle.
    ///
    /// # Errors
    ///
    /// `LookupMiss` when a local name is unknown, or when the address's
    /// location type has no resolvable transport.
    pub fn find(&self, address: &MailboxAddress) -> Result<MailboxHandle, MsgMgrError> {
        match address.location_type {
            MailboxLocationType::Local => {
                let core = self
                    .local_registry
                    .get(&address.mailbox_name)
                    .map(|entry| Arc::clone(entry.value()))
                    .ok_or_else(|| MsgMgrError::LookupMiss(address.clone()))?;
                core.acquire_ref();
                Ok(MailboxHandle::for_local(core))
            }
            MailboxLocationType::Distributed => {
                let sender = self.proxy_for(address, |address| {
                    Arc::new(DistributedMailboxProxy::new(
                        address,
                        Arc::clone(&self.opm),
                    ))
                });
                Ok(MailboxHandle::for_proxy(sender))
            }
            MailboxLocationType::Group => {
                let sender = self.proxy_for(address, |address| {
                    Arc::new(GroupMailboxProxy::new(
                        address,
                        self.group_options,
                        Arc::clone(&self.opm),
                    ))
                });
                Ok(MailboxHandle::for_proxy(sender))
            }
            MailboxLocationType::Unknown | MailboxLocationType::LocalSharedMemory => {
                warn!(%address, "no resolvable transport for address");
                Err(MsgMgrError::LookupMiss(address.clone()))
            }
        }
    }

    fn proxy_for(
        &self,
        address: &MailboxAddress,
        create: impl FnOnce(MailboxAddress) -> Arc<dyn MessageSender>,
    ) -> Arc<dyn MessageSender> {
        let entry = self
            .proxy_registry
            .entry(address.clone())
            .or_insert_with(|| create(address.clone()));
        Arc::clone(entry.value())
    }

    /// Register a mailbox with the lookup service.
    ///
    /// Activation does this automatically; the explicit form exists for
    /// collaborators that manage registration themselves.
    pub fn register_mailbox(&self, mailbox: &MailboxOwnerHandle) -> Result<(), MsgMgrError> {
        self.register_core(&mailbox.core_arc())
    }

    /// Remove a mailbox from the lookup service (idempotent).
    pub fn deregister_mailbox(&self, mailbox: &MailboxOwnerHandle) {
        self.deregister_core(&mailbox.core_arc());
    }

    /// Add an activated mailbox to the in-process table. Remote-type
    /// addresses are additionally announced through discovery.
    ///
    /// # Errors
    ///
    /// `DuplicateRegistration` when another mailbox already holds the name.
    pub(crate) fn register_core(&self, core: &Arc<MailboxCore>) -> Result<(), MsgMgrError> {
        let name = core.name().to_string();
        match self.local_registry.entry(name.clone()) {
            Entry::Occupied(_) => {
                return Err(MsgMgrError::DuplicateRegistration { name });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(core));
            }
        }
        debug!(mailbox = %name, "mailbox registered");

        if core.address().location_type.is_remote() {
            self.announce_registration(core.address().clone());
        }
        Ok(())
    }

    /// Remove a mailbox from the in-process table (idempotent; called on
    /// deactivate and again on final release).
    pub(crate) fn deregister_core(&self, core: &Arc<MailboxCore>) {
        let removed = self
            .local_registry
            .remove_if(core.name(), |_, registered| Arc::ptr_eq(registered, core));
        if removed.is_none() {
            return;
        }
        debug!(mailbox = core.name(), "mailbox deregistered");

        if core.address().location_type.is_remote() {
            self.announce_deregistration(core.address().clone());
        }
    }

    fn announce_registration(&self, address: MailboxAddress) {
        match self.discovery.get() {
            Some(discovery) => {
                if let Err(err) = discovery.register_local_address(address) {
                    warn!(%err, "discovery registration announcement failed");
                }
            }
            None => {
                // No discovery in this universe; keep the registry correct
                // locally.
                self.non_proxy_registry.insert(address);
            }
        }
    }

    fn announce_deregistration(&self, address: MailboxAddress) {
        match self.discovery.get() {
            Some(discovery) => {
                if let Err(err) = discovery.deregister_local_address(address) {
                    warn!(%err, "discovery deregistration announcement failed");
                }
            }
            None => {
                self.non_proxy_registry.remove(&address);
            }
        }
    }

    /// Attach the discovery manager. Called once during system startup,
    /// after discovery's own mailbox exists.
    pub(crate) fn set_discovery(&self, discovery: Arc<DiscoveryManager>) {
        if self.discovery.set(discovery).is_err() {
            warn!("discovery manager attached twice");
        }
    }

    /// The shared registry of known remote-type addresses.
    pub fn non_proxy_registry(&self) -> &Arc<NonProxyRegistry> {
        &self.non_proxy_registry
    }

    /// Number of in-process mailboxes currently registered.
    pub fn local_count(&self) -> usize {
        self.local_registry.len()
    }

    /// Number of outbound proxies established so far.
    pub fn proxy_count(&self) -> usize {
        self.proxy_registry.len()
    }
}

impl std::fmt::Debug for MailboxLookupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxLookupService")
            .field("local", &self.local_count())
            .field("proxies", &self.proxy_count())
            .field("non_proxy", &self.non_proxy_registry.len())
            .finish()
    }
}
