// Layer 1: Standard library imports
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use crate::address::MailboxAddress;
use crate::error::MsgMgrError;
use crate::message::Message;

/// Future returned by a message handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), MsgMgrError>> + Send>>;

/// Handler bound to a message id in a mailbox's handler table.
///
/// The handler receives its own reference to the message; the dispatcher
/// drops the queue's reference once the handler returns, which is what
/// "consuming" a message means here.
pub type MessageHandler = Arc<dyn Fn(Arc<dyn Message>) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure into a [`MessageHandler`].
///
/// # Example
///
/// ```rust
/// use msgmgr::mailbox::handler;
///
/// let h = handler(|message| async move {
///     tracing::info!(?message, "handled");
///     Ok(())
/// });
/// # let _ = h;
/// ```
pub fn handler<F, Fut>(f: F) -> MessageHandler
where
    F: Fn(Arc<dyn Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), MsgMgrError>> + Send + 'static,
{
    Arc::new(move |message| Box::pin(f(message)))
}

/// Posting seam shared by in-process mailboxes and both proxy kinds.
///
/// Local posts enqueue a pointer and return immediately; proxy posts
/// serialize and may block for the duration of a socket write. Either way
/// a successful post transfers the framework's reference to the receiving
/// side, and a failed post leaves the message owned by the caller.
#[async_trait]
pub trait MessageSender: Debug + Send + Sync {
    /// Post a message toward the target mailbox.
    async fn post(&self, message: Arc<dyn Message>) -> Result<(), MsgMgrError>;

    /// Address of the mailbox this sender delivers to.
    fn target_address(&self) -> &MailboxAddress;
}
