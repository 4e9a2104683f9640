
use bytes::{Buf, Bytes};

use crate::cursor::Writer;
use crate::error::{Error, Result};

pub trait MarshalSize {
    fn marshal_size(&self) -> usize;
}

pub trait Marshal: MarshalSize {
    /// Writes the wire form into `writer` and returns how many bytes were written.
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize>;

    fn marshal(&self) -> Result<Bytes> {
        let l = self.marshal_size();
        let mut writer = Writer::with_capacity(l);
        let n = self.marshal_to(&mut writer)?;
        if n != l {
            Err(Error::MarshalSizeMismatch { got: n, want: l })
        } else {
            Ok(writer.freeze())
        }
    }
}

pub trait Unmarshal: Sized + MarshalSize {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf;
}
