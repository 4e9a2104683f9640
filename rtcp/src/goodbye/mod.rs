
use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::{Reader, Writer};

use crate::error::Error;
use crate::header::*;
use crate::util::*;

type Result<T> = std::result::Result<T, util::Error>;

/// The Goodbye packet indicates that one or more sources are no longer active.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct Goodbye {
    /// The SSRC/CSRC identifiers that are no longer active
    pub sources: Vec<u32>,
    /// Optional text indicating the reason for leaving, e.g., "camera malfunction" or "RTP loop detected"
    pub reason: Bytes,
}

impl fmt::Display for Goodbye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = "Goodbye:\n\tSources:\n".to_string();
        for s in &self.sources {
            out += format!("\t{}\n", *s).as_str();
        }
        out += format!("\tReason: {:?}\n", self.reason).as_str();

        write!(f, "{out}")
    }
}

impl Goodbye {
    /// Header returns the Header associated with this packet.
    pub fn header(&self) -> Result<Header> {
        Ok(Header {
            padding: false,
            count: self.sources.len() as u8,
            packet_type: PacketType::Goodbye,
            length: header_length(self.marshal_size())?,
        })
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        self.sources.to_vec()
    }

    pub fn add_source(&mut self, source: u32) -> std::result::Result<(), Error> {
        if self.sources.len() >= COUNT_MAX {
            return Err(Error::TooManySources);
        }
        self.sources.push(source);
        Ok(())
    }

    /// Removes `source`, keeping the order of the others. Returns whether it was present.
    pub fn remove_source(&mut self, source: u32) -> bool {
        if let Some(index) = self.sources.iter().position(|s| *s == source) {
            self.sources.remove(index);
            true
        } else {
            false
        }
    }

    fn raw_size(&self) -> usize {
        let srcs_length = self.sources.len() * SSRC_LENGTH;
        let reason_length = if self.reason.is_empty() {
            0
        } else {
            self.reason.len() + 1
        };

        HEADER_LENGTH + srcs_length + reason_length
    }
}

impl MarshalSize for Goodbye {
    fn marshal_size(&self) -> usize {
        let l = self.raw_size();
        // align to 32-bit boundary
        l + get_padding_size(l)
    }
}

impl Marshal for Goodbye {
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        /*
         *        0                   1                   2                   3
         *        0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *       |V=2|P|    SC   |   PT=BYE=203  |             length            |
         *       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *       |                           SSRC/CSRC                           |
         *       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *       :                              ...                              :
         *       +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * (opt) |     length    |               reason for leaving            ...
         *       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        if self.sources.len() > COUNT_MAX {
            return Err(Error::TooManySources.into());
        }
        if self.reason.len() > SDES_MAX_OCTET_COUNT {
            return Err(Error::ReasonTooLong.into());
        }

        self.header()?.marshal_to(writer)?;

        for source in &self.sources {
            writer.put_u32(*source)?;
        }

        if !self.reason.is_empty() {
            writer.put_u8(self.reason.len() as u8)?;
            writer.put_slice(&self.reason)?;
        }

        // null octets up to the boundary, not signalled by the P bit
        put_zero_padding(writer, self.raw_size())?;

        Ok(self.marshal_size())
    }
}

impl Unmarshal for Goodbye {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_packet(raw_packet, PacketType::Goodbye)?;

        let sources_len = header.count as usize * SSRC_LENGTH;
        if body.remaining() < sources_len {
            return Err(Error::PacketTooShort.into());
        }

        let mut reader = Reader::new(&mut body);
        let mut sources = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            sources.push(reader.get_u32()?);
        }

        let reason = if reader.has_remaining() {
            let reason_len = reader.get_u8()? as usize;
            if reader.remaining() < reason_len {
                return Err(Error::PacketTooShort.into());
            }
            let reason = reader.copy_bytes(reason_len)?;

            // only the null octets completing the last word may follow
            if reader.remaining() != get_padding_size(1 + reason_len) {
                return Err(Error::InvalidHeader.into());
            }
            reason
        } else {
            Bytes::new()
        };

        Ok(Goodbye { sources, reason })
    }
}
