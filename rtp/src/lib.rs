#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Package rtp implements the RTP fixed header and packet envelope of RFC 3550 section 5.
//!
//! Only the envelope is handled here: version, padding, the generic header
//! extension, contributing sources and an opaque payload. Payload formats of
//! individual codecs are left to the application.

mod error;
pub mod header;
pub mod packet;
pub mod sequence;

pub use error::{Error, Result};
