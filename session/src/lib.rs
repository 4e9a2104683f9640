#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Package rtpsession keeps the per-session state an RTP endpoint needs to
//! speak RTCP correctly: reception statistics for every remote source, the
//! randomized report interval, and the member table with its timeouts.
//!
//! Nothing here performs I/O or reads the system clock on its own. Packets
//! leave through a [`transport::Transport`], the time comes from a
//! [`clock::Clock`], and the caller owns the timers: every timer callback on
//! [`session::Session`] returns the delay after which it wants to be called
//! again.

pub mod clock;
pub mod config;
mod error;
pub mod interval;
pub mod members;
pub mod session;
pub mod source;
pub mod transport;

pub use error::{Error, Result};
