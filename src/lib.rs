//! An ackable rendezvous channel.
//!
//! Many producers hand values one at a time to a single consumer. The
//! consumer must [`ack`](AckableChannel::ack) a value before it can receive
//! a new one, and receiving again before acking returns the same value.
//!
//! ```no_run
//! # async fn demo() {
//! use ack_chan::{signal, AckableChannel};
//!
//! let mut chan = AckableChannel::new();
//! let tx = chan.sender();
//!
//! tokio::spawn(async move {
//!     tx.send(signal::never(), 42).await.unwrap();
//! });
//!
//! assert_eq!(chan.recv(signal::never()).await, Ok(&42));
//! // not acked yet, so this is the same value
//! assert_eq!(chan.recv(signal::never()).await, Ok(&42));
//! chan.ack();
//! # }
//! ```

mod channel;
pub mod error;
mod loom;
pub mod signal;
mod sink;
mod transport;
mod writer;

pub use channel::{AckableChannel, Sender};
pub use error::{Cause, Error, SendError, TryRecvError};
pub use sink::SendSink;
pub use writer::{byte_channel, ByteWriter};
