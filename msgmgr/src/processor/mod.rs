//! Mailbox processor: the dispatch loop consuming a mailbox's queue.

pub mod mailbox_processor;

pub use mailbox_processor::MailboxProcessor;
