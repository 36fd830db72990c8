#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

//! The _dhcpc_ library is a DHCP client lease-acquisition engine for hosted and
//! embedded systems.
//!
//! It drives the RFC 2131 client progression from INIT through offer collection and
//! selection to a bound lease (plus the DHCPINFORM side path) as an explicit state
//! machine. The machine never blocks and never touches the network itself: every
//! handler consumes one event, mutates one lease record, and talks to the outside world
//! through a handful of capability traits.
//!
//! # Layers
//!
//! * The [wire] module parses and emits DHCP/BOOTP messages.
//! * The [lease] module holds the lease record, the per-state handlers and the
//!   capability traits they call ([lease::Transport], [lease::TimerService], ...).
//! * The [timer] module is a deadline table implementing [lease::TimerService].
//! * With the `std` feature, the [monitor] module serializes events from any number of
//!   producers into one decision loop per lease set.
//!
//! # Feature flags
//!
//! * `std` (default): enables the event queue, the lease monitor, the shared status
//!   board and the blocking inform completion. Implies `alloc`.
//! * `alloc`: lease hooks and inform waiters are reference counted.
//! * `log` (default): log state transitions through the `log` crate.

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(not(feature = "alloc"))]
compile_error!("dhcpc needs the `alloc` feature; enable `alloc` or `std`");

use core::fmt;

#[macro_use]
mod macros;

mod config {
    #![allow(unused)]
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}

pub mod lease;
pub mod rand;
pub mod time;
pub mod timer;
pub mod wire;

#[cfg(feature = "std")]
pub mod completion;
#[cfg(feature = "std")]
pub mod event;
#[cfg(feature = "std")]
pub mod monitor;
#[cfg(feature = "std")]
pub mod status;

/// The error type for the lease engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A message could not be parsed because some of its fields were out of bounds
    /// of the received data.
    Truncated,
    /// A message was recognized but contained invalid data,
    /// e.g. an option whose length contradicts its type.
    Malformed,
    /// A message could not be recognized and was dropped,
    /// e.g. a hardware type other than Ethernet.
    Unrecognized,
    /// A buffer or queue is full.
    Exhausted,
    /// The transport refused to send a message.
    Transmit,
    /// The network configuration could not be applied to the interface.
    Apply,
    /// No offer arrived in either message format.
    NoOffer,
    /// The server never answered a DHCPINFORM.
    NoReply,
    /// The lease was released before the exchange completed.
    Released,
    /// An operation is not permitted in the current state.
    Illegal,
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Truncated => write!(f, "truncated message"),
            Error::Malformed => write!(f, "malformed message"),
            Error::Unrecognized => write!(f, "unrecognized message"),
            Error::Exhausted => write!(f, "buffer space exhausted"),
            Error::Transmit => write!(f, "transmit failed"),
            Error::Apply => write!(f, "network configuration could not be applied"),
            Error::NoOffer => write!(f, "no offer received"),
            Error::NoReply => write!(f, "no reply to inform"),
            Error::Released => write!(f, "lease released"),
            Error::Illegal => write!(f, "illegal operation"),
        }
    }
}

/// The result type for the lease engine.
pub type Result<T> = core::result::Result<T, Error>;
