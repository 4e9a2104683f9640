#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod cursor;
pub mod marshal;

mod error;
pub use error::{Error, Result};

pub use crate::cursor::{Reader, Writer};
pub use crate::marshal::{Marshal, MarshalSize, Unmarshal};
