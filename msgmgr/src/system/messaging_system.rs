// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// Layer 3: Internal module imports
use super::config::SystemConfig;
use crate::address::{MailboxAddress, MailboxLocationType};
use crate::buffer::{MessageBuffer, MAX_MESSAGE_LENGTH};
use crate::discovery::DiscoveryManager;
use crate::error::MsgMgrError;
use crate::factory::MessageFactory;
use crate::lookup::MailboxLookupService;
use crate::mailbox::distributed::DistributedMailbox;
use crate::mailbox::group::GroupMailbox;
use crate::mailbox::handle::MailboxBacking;
use crate::mailbox::{GroupOptions, MailboxCore, MailboxHandle, MailboxOwnerHandle};
use crate::opm::{GrowthPolicy, Opm, MESSAGE_BUFFER_POOL_ID};

/// One messaging universe: pools, factory, lookup, discovery, shutdown.
///
/// Every collaborator plugs into the framework through this object:
/// create a mailbox of the desired class, bind handlers, activate, and
/// post or schedule messages. Tests build as many isolated universes as
/// they need.
///
/// # Example
///
/// ```rust,ignore
/// let system = MessagingSystem::new(SystemConfig::default()).await?;
///
/// let mailbox = system.create_local_mailbox(MailboxAddress::local("EventRouter"))?;
/// mailbox.add_handler(MY_MSG_ID, handler(|msg| async move { Ok(()) }));
/// mailbox.activate().await?;
///
/// let sender = system.find(&MailboxAddress::local("EventRouter"))?;
/// sender.post(Arc::new(my_message)).await?;
/// ```
pub struct MessagingSystem {
    config: SystemConfig,
    opm: Arc<Opm>,
    factory: Arc<MessageFactory>,
    lookup: Arc<MailboxLookupService>,
    discovery: Option<Arc<DiscoveryManager>>,
    shutdown: CancellationToken,
}

impl MessagingSystem {
    /// Assemble a universe from `config`; starts the discovery manager
    /// when enabled.
    pub async fn new(config: SystemConfig) -> Result<Self, MsgMgrError> {
        if let Err(reason) = config.validate() {
            return Err(MsgMgrError::InvalidConfiguration { reason });
        }

        let opm = Arc::new(Opm::new());
        opm.create_pool(
            MESSAGE_BUFFER_POOL_ID,
            config.buffer_pool_capacity,
            GrowthPolicy::Fixed,
            || MessageBuffer::new(MAX_MESSAGE_LENGTH, true),
        )?;

        let factory = Arc::new(MessageFactory::new());
        let lookup = MailboxLookupService::new(Arc::clone(&opm), config.group_options);

        let mut system = Self {
            config,
            opm,
            factory,
            lookup,
            discovery: None,
            shutdown: CancellationToken::new(),
        };

        if system.config.enable_discovery {
            let discovery = DiscoveryManager::start(&system).await?;
            system.lookup.set_discovery(Arc::clone(&discovery));
            system.discovery = Some(discovery);
        }

        info!(neid = %system.config.neid, discovery = system.config.enable_discovery, "messaging system up");
        Ok(system)
    }

    /// Create an in-process mailbox. The returned owner handle must be
    /// activated before the mailbox accepts posts.
    pub fn create_local_mailbox(
        &self,
        address: MailboxAddress,
    ) -> Result<MailboxOwnerHandle, MsgMgrError> {
        self.expect_location(&address, MailboxLocationType::Local)?;
        Ok(MailboxOwnerHandle::new(
            self.new_core(address),
            MailboxBacking::Local,
        ))
    }

    /// Create a distributed (TCP) mailbox; its listener binds at
    /// activation.
    pub fn create_distributed_mailbox(
        &self,
        address: MailboxAddress,
    ) -> Result<MailboxOwnerHandle, MsgMgrError> {
        self.expect_location(&address, MailboxLocationType::Distributed)?;
        let backing = MailboxBacking::Distributed(DistributedMailbox::new(Arc::clone(
            &self.factory,
        )));
        Ok(MailboxOwnerHandle::new(self.new_core(address), backing))
    }

    /// Create a group (multicast/broadcast datagram) mailbox; its socket
    /// binds and joins the group at activation. `options` defaults to the
    /// configured group options.
    pub fn create_group_mailbox(
        &self,
        address: MailboxAddress,
        options: Option<GroupOptions>,
    ) -> Result<MailboxOwnerHandle, MsgMgrError> {
        self.expect_location(&address, MailboxLocationType::Group)?;
        let options = options.unwrap_or(self.config.group_options);
        options
            .validate()
            .map_err(|reason| MsgMgrError::InvalidConfiguration { reason })?;
        let backing =
            MailboxBacking::Group(GroupMailbox::new(Arc::clone(&self.factory), options));
        Ok(MailboxOwnerHandle::new(self.new_core(address), backing))
    }

    /// Resolve an address to a post-capable handle (see
    /// [`MailboxLookupService::find`]).
    pub fn find(&self, address: &MailboxAddress) -> Result<MailboxHandle, MsgMgrError> {
        self.lookup.find(address)
    }

    /// This universe's lookup service.
    pub fn lookup(&self) -> &Arc<MailboxLookupService> {
        &self.lookup
    }

    /// This universe's message factory.
    pub fn factory(&self) -> &Arc<MessageFactory> {
        &self.factory
    }

    /// This universe's object pool manager.
    pub fn opm(&self) -> &Arc<Opm> {
        &self.opm
    }

    /// The discovery manager, when enabled.
    pub fn discovery(&self) -> Option<&Arc<DiscoveryManager>> {
        self.discovery.as_ref()
    }

    /// The configuration this universe was assembled from.
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// True once shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Request process-wide shutdown: reactors and dispatch loops exit
    /// after their current iteration; in-flight handlers complete.
    pub fn shutdown(&self) {
        info!("messaging system shutting down");
        self.shutdown.cancel();
    }

    fn new_core(&self, address: MailboxAddress) -> Arc<MailboxCore> {
        MailboxCore::new(
            address,
            self.config.queue_high_water,
            self.config.max_active_timers,
            Arc::downgrade(&self.lookup),
            &self.shutdown,
        )
    }

    fn expect_location(
        &self,
        address: &MailboxAddress,
        expected: MailboxLocationType,
    ) -> Result<(), MsgMgrError> {
        if address.location_type == expected {
            debug!(%address, "creating mailbox");
            Ok(())
        } else {
            Err(MsgMgrError::LookupMiss(address.clone()))
        }
    }
}

impl std::fmt::Debug for MessagingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingSystem")
            .field("neid", &self.config.neid)
            .field("discovery", &self.discovery.is_some())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
