//! Message factory: the only bridge from received bytes to typed messages.
//!
//! Distributed and group receivers hand every decoded frame to
//! [`MessageFactory::recreate`], which reads the common wire header and
//! dispatches to the deserializer registered under the frame's message id.
//! The outbound twin, [`serialize_for_wire`], writes the same header ahead
//! of the message-specific fields.

pub mod message_factory;

pub use message_factory::{serialize_for_wire, MessageDeserializer, MessageFactory, WireHeader};
