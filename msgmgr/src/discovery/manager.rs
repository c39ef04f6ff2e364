// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, trace, warn};

// Layer 3: Internal module imports
use super::messages::{
    DiscoveryLocalMessage, DiscoveryMessage, DiscoveryOperation, LocalDiscoveryOperation,
};
use crate::address::{MailboxAddress, DISCOVERY_MANAGER_MAILBOX_NAME};
use crate::error::MsgMgrError;
use crate::lookup::NonProxyRegistry;
use crate::mailbox::{handler, GroupOptions, MailboxHandle, MailboxOwnerHandle, MessageSender};
use crate::message::ids::{MSGMGR_DISCOVERY_LOCAL_MSG_ID, MSGMGR_DISCOVERY_MSG_ID};
use crate::message::Message;
use crate::opm::Opm;
use crate::processor::MailboxProcessor;
use crate::proxy::GroupMailboxProxy;
use crate::system::MessagingSystem;

/// Gossips remote-type mailbox (de)registrations across the fleet.
///
/// One group mailbox on the well-known multicast address receives gossip;
/// one matching group proxy sends it. Local REGISTER/DEREGISTER requests
/// arrive as ordinary messages on the same mailbox, so all registry
/// mutations happen on the discovery processor's thread.
///
/// Self-posts looped back by multicast are discarded by comparing both the
/// source address and the originating PID; the PID comparison is what
/// keeps two processes on one host (identical source addresses) from
/// discarding each other's gossip.
pub struct DiscoveryManager {
    address: MailboxAddress,
    local_pid: u32,
    options: GroupOptions,
    non_proxy: Arc<NonProxyRegistry>,
    opm: Arc<Opm>,
    mailbox: Mutex<Option<MailboxOwnerHandle>>,
    proxy: AsyncMutex<Option<Arc<GroupMailboxProxy>>>,
    update_registry: Mutex<Vec<(MailboxAddress, MailboxHandle)>>,
}

impl DiscoveryManager {
    /// Bring up discovery for `system`: create and activate the group
    /// mailbox, register the gossip deserializer, and start the processor.
    pub(crate) async fn start(system: &MessagingSystem) -> Result<Arc<Self>, MsgMgrError> {
        let config = system.config();
        let address = MailboxAddress::group(
            DISCOVERY_MANAGER_MAILBOX_NAME,
            config.discovery_address,
        )
        .with_neid(config.neid.clone());

        let manager = Arc::new(Self {
            address: address.clone(),
            local_pid: std::process::id(),
            options: config.discovery_group_options,
            non_proxy: Arc::clone(system.lookup().non_proxy_registry()),
            opm: Arc::clone(system.opm()),
            mailbox: Mutex::new(None),
            proxy: AsyncMutex::new(None),
            update_registry: Mutex::new(Vec::new()),
        });

        DiscoveryMessage::register_support(system.factory());

        let mailbox = system.create_group_mailbox(address, Some(manager.options))?;
        {
            let manager = Arc::clone(&manager);
            mailbox.add_handler(
                MSGMGR_DISCOVERY_LOCAL_MSG_ID,
                handler(move |message| {
                    let manager = Arc::clone(&manager);
                    async move { manager.handle_local(message).await }
                }),
            );
        }
        {
            let manager = Arc::clone(&manager);
            mailbox.add_handler(
                MSGMGR_DISCOVERY_MSG_ID,
                handler(move |message| {
                    let manager = Arc::clone(&manager);
                    async move { manager.handle_remote(message).await }
                }),
            );
        }

        mailbox.activate().await?;

        let processor = MailboxProcessor::new(&mailbox);
        tokio::spawn(async move {
            processor.process().await;
        });

        *manager.mailbox.lock() = Some(mailbox);
        debug!(address = %manager.address, pid = manager.local_pid, "discovery manager started");
        Ok(manager)
    }

    /// The discovery manager's own group address.
    pub fn address(&self) -> &MailboxAddress {
        &self.address
    }

    /// Announce a locally-owned remote-type address to the fleet.
    pub fn register_local_address(&self, address: MailboxAddress) -> Result<(), MsgMgrError> {
        self.post_local(LocalDiscoveryOperation::Register, address)
    }

    /// Withdraw a locally-owned remote-type address from the fleet.
    pub fn deregister_local_address(&self, address: MailboxAddress) -> Result<(), MsgMgrError> {
        self.post_local(LocalDiscoveryOperation::Deregister, address)
    }

    /// Dump every known non-proxy address to the log.
    pub fn list_all_mailbox_addresses(&self) -> Result<(), MsgMgrError> {
        self.post_local(LocalDiscoveryOperation::Display, MailboxAddress::default())
    }

    fn post_local(
        &self,
        operation: LocalDiscoveryOperation,
        subject: MailboxAddress,
    ) -> Result<(), MsgMgrError> {
        let message = Arc::new(DiscoveryLocalMessage::new(
            self.address.clone(),
            operation,
            subject,
        ));
        let mailbox = self.mailbox.lock();
        match mailbox.as_ref() {
            Some(owner) => owner.post(message),
            None => Err(MsgMgrError::InactiveMailbox {
                name: DISCOVERY_MANAGER_MAILBOX_NAME.to_string(),
            }),
        }
    }

    /// Subscribe `notify` to discovery updates whose subject matches
    /// `criteria`, and return the currently matching addresses.
    ///
    /// A duplicate (criteria, mailbox) pair is rejected, otherwise that
    /// mailbox would receive the same update twice.
    pub fn register_for_updates(
        &self,
        criteria: MailboxAddress,
        notify: MailboxHandle,
    ) -> Vec<MailboxAddress> {
        {
            let mut registry = self.update_registry.lock();
            let duplicate = registry
                .iter()
                .any(|(existing, mailbox)| *existing == criteria && mailbox.same_target(&notify));
            if duplicate {
                error!(%criteria, "duplicate discovery update registration");
            } else {
                registry.push((criteria.clone(), notify));
            }
        }
        self.non_proxy.snapshot_matching(&criteria)
    }

    /// Drop every update subscription delivered to `notify`.
    pub fn deregister_for_updates(&self, notify: &MailboxHandle) {
        self.update_registry
            .lock()
            .retain(|(_, mailbox)| !mailbox.same_target(notify));
    }

    async fn handle_local(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        let Some(local) = message.as_any().downcast_ref::<DiscoveryLocalMessage>() else {
            warn!("non-local message bound to the local discovery handler");
            return Ok(());
        };
        trace!(operation = ?local.operation(), subject = %local.subject(), "local discovery request");

        match local.operation() {
            LocalDiscoveryOperation::Register => {
                if self.non_proxy.insert(local.subject().clone()) {
                    debug!(subject = %local.subject(), "registered non-proxy address");
                } else {
                    error!(subject = %local.subject(), "non-proxy registry insertion failed");
                }
                self.post_discovery(DiscoveryOperation::Register, local.subject().clone())
                    .await
            }
            LocalDiscoveryOperation::Deregister => {
                if self.non_proxy.remove(local.subject()) {
                    debug!(subject = %local.subject(), "deregistered non-proxy address");
                }
                self.post_discovery(DiscoveryOperation::Deregister, local.subject().clone())
                    .await
            }
            LocalDiscoveryOperation::Display => {
                let addresses = self.non_proxy.sorted();
                debug!(
                    count = addresses.len(),
                    "currently registered non-proxy remote type addresses"
                );
                for address in addresses {
                    debug!("|{address}|");
                }
                Ok(())
            }
        }
    }

    async fn handle_remote(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError> {
        let Some(remote) = message.as_any().downcast_ref::<DiscoveryMessage>() else {
            warn!("non-discovery message bound to the discovery handler");
            return Ok(());
        };

        // Multicast loopback delivers our own gossip back to us. The PID is
        // part of the comparison because another process on this host
        // carries the same source address.
        if remote.source_address() == &self.address && remote.originating_pid() == self.local_pid
        {
            trace!("discarding discovery message from self");
            return Ok(());
        }
        debug!(
            operation = ?remote.operation(),
            subject = %remote.subject(),
            pid = remote.originating_pid(),
            "received discovery message"
        );

        match remote.operation() {
            DiscoveryOperation::Register => {
                if !self.non_proxy.insert(remote.subject().clone()) {
                    trace!(subject = %remote.subject(), "discovery register already known");
                }
            }
            DiscoveryOperation::Deregister => {
                if !self.non_proxy.remove(remote.subject()) {
                    trace!(subject = %remote.subject(), "discovery deregister for unknown address");
                }
            }
        }

        // Snapshot the matching subscribers under the lock, post after.
        let targets: Vec<MailboxHandle> = {
            let registry = self.update_registry.lock();
            registry
                .iter()
                .filter(|(criteria, _)| MailboxAddress::matches(criteria, remote.subject()))
                .map(|(_, mailbox)| mailbox.clone())
                .collect()
        };
        for target in targets {
            if let Err(err) = target.post(Arc::clone(&message)).await {
                warn!(target_mailbox = %target.target_address(), %err, "discovery update fan-out failed");
            }
        }
        Ok(())
    }

    /// Send one gossip message through the group proxy, rebuilding the
    /// proxy once on failure before giving up.
    async fn post_discovery(
        &self,
        operation: DiscoveryOperation,
        subject: MailboxAddress,
    ) -> Result<(), MsgMgrError> {
        let message: Arc<dyn Message> = Arc::new(DiscoveryMessage::new(
            self.address.clone(),
            operation,
            self.local_pid,
            subject,
        ));

        let mut proxy = self.proxy.lock().await;
        if proxy.is_none() {
            *proxy = Some(self.create_proxy());
        }
        let Some(current) = proxy.as_ref().map(Arc::clone) else {
            unreachable!("proxy created above");
        };

        match current.post(Arc::clone(&message)).await {
            Ok(()) => {
                debug!(?operation, "posted discovery message");
                Ok(())
            }
            Err(first_err) => {
                warn!(%first_err, "discovery proxy post failed; rebuilding proxy");
                let fresh = self.create_proxy();
                match fresh.post(message).await {
                    Ok(()) => {
                        *proxy = Some(fresh);
                        warn!(?operation, "discovery post succeeded after proxy rebuild");
                        Ok(())
                    }
                    Err(second_err) => {
                        error!(%second_err, "discovery post failed even after proxy rebuild");
                        *proxy = None;
                        Err(second_err)
                    }
                }
            }
        }
    }

    fn create_proxy(&self) -> Arc<GroupMailboxProxy> {
        debug!("creating discovery manager proxy");
        Arc::new(GroupMailboxProxy::new(
            self.address.clone(),
            self.options,
            Arc::clone(&self.opm),
        ))
    }
}

impl std::fmt::Debug for DiscoveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryManager")
            .field("address", &self.address)
            .field("pid", &self.local_pid)
            .field("subscriptions", &self.update_registry.lock().len())
            .finish()
    }
}
