
use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::{Reader, Writer};

use crate::error::Error;
use crate::header::*;
use crate::util::*;

type Result<T> = std::result::Result<T, util::Error>;

/// RawPacket represents an unparsed RTCP packet. It's returned by Unmarshal when
/// a packet with an unknown type is encountered.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct RawPacket {
    pub header: Header,
    /// Everything after the common header, padding included.
    pub body: Bytes,
}

impl fmt::Display for RawPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawPacket {}: {:?}", self.header.packet_type, self.body)
    }
}

impl RawPacket {
    /// Header returns the Header associated with this packet.
    pub fn header(&self) -> Result<Header> {
        if get_padding_size(self.body.len()) != 0 {
            return Err(Error::InvalidHeader.into());
        }
        Ok(Header {
            length: header_length(self.marshal_size())?,
            ..self.header.clone()
        })
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![]
    }
}

impl MarshalSize for RawPacket {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + self.body.len()
    }
}

impl Marshal for RawPacket {
    /// Marshal writes the header and body back out unchanged.
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        let n = self.header()?.marshal_to(writer)?;
        writer.put_slice(&self.body)?;

        Ok(n + self.body.len())
    }
}

impl Unmarshal for RawPacket {
    /// Unmarshal decodes the packet from binary.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(raw_packet)?;

        let body_len = header.length as usize * 4;
        if raw_packet.remaining() < body_len {
            return Err(Error::PacketTooShort.into());
        }
        let body = Reader::new(raw_packet).copy_bytes(body_len)?;

        Ok(RawPacket { header, body })
    }
}
