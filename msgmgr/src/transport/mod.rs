//! Wire framing shared by the distributed and group transports.
//!
//! Every message crosses the network as `[u16 total length][payload]`,
//! where the payload starts with the 2-byte message id and the length
//! field counts the payload only. Stream transports accumulate partial
//! reads until a full frame arrives; datagram transports carry exactly one
//! frame per datagram.

pub mod framing;

pub use framing::FrameCodec;
