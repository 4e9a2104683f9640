#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! RTCP control packets as defined by RFC 3550 section 6.
//!
//! Each packet kind implements the `Marshal`/`Unmarshal` traits from `util`.
//! [`packet::unmarshal`] walks a compound datagram and yields a closed
//! [`packet::Packet`] per entry, keeping unknown packet types as raw bytes.

pub mod application_defined;
pub mod compound_packet;
mod error;
pub mod goodbye;
pub mod header;
pub mod packet;
pub mod raw_packet;
pub mod receiver_report;
pub mod reception_report;
pub mod sender_report;
pub mod source_description;
mod util;

pub use error::{Error, Result};
