
use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::{Reader, Writer};

use crate::error::Error;
use crate::header::*;

/// Packet represents an RTP Packet
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
    /// Number of trailing padding octets, including the count octet itself.
    /// Non-zero exactly when `header.padding` is set.
    pub padding_size: u8,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = "RTP PACKET:\n".to_string();

        out += format!("\tVersion: {}\n", self.header.version).as_str();
        out += format!("\tMarker: {}\n", self.header.marker).as_str();
        out += format!("\tPayload Type: {}\n", self.header.payload_type).as_str();
        out += format!("\tSequence Number: {}\n", self.header.sequence_number).as_str();
        out += format!("\tTimestamp: {}\n", self.header.timestamp).as_str();
        out += format!("\tSSRC: {} ({:x})\n", self.header.ssrc, self.header.ssrc).as_str();
        out += format!("\tPayload Length: {}\n", self.payload.len()).as_str();

        write!(f, "{out}")
    }
}

impl Packet {
    /// Creates an empty packet with a random ssrc.
    pub fn new(payload_type: u8) -> Result<Self, Error> {
        if payload_type > PT_MASK {
            return Err(Error::ErrInvalidPayloadType(payload_type));
        }
        Ok(Packet {
            header: Header {
                payload_type,
                ssrc: rand::random::<u32>(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    pub fn set_payload(&mut self, payload: Bytes) {
        self.payload = payload;
    }

    pub fn clear_payload(&mut self) {
        self.payload = Bytes::new();
    }

    /// Pads the packet so its marshaled length is a multiple of 4 octets.
    /// A packet that is already aligned gets a full word, since the pad
    /// count octet itself has to be present.
    pub fn pad_to_alignment(&mut self) {
        let unpadded = self.header.marshal_size() + self.payload.len();
        let padding_size = 4 - unpadded % 4;
        self.header.padding = true;
        self.padding_size = padding_size as u8;
    }

    pub fn clear_padding(&mut self) {
        self.header.padding = false;
        self.padding_size = 0;
    }
}

impl Unmarshal for Packet {
    /// Unmarshal parses the passed byte slice and stores the result in the Packet this method is called upon
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        let header = Header::unmarshal(raw_packet)?;
        let mut reader = Reader::new(raw_packet);
        let mut payload = reader.copy_rest();

        let padding_size = if header.padding {
            let payload_len = payload.len();
            if payload_len == 0 {
                return Err(Error::ErrInvalidPadding.into());
            }
            let padding_size = payload[payload_len - 1];
            if padding_size == 0 || padding_size as usize > payload_len {
                return Err(Error::ErrInvalidPadding.into());
            }
            payload.truncate(payload_len - padding_size as usize);
            padding_size
        } else {
            0
        };

        Ok(Packet {
            header,
            payload,
            padding_size,
        })
    }
}

impl MarshalSize for Packet {
    /// MarshalSize returns the size of the packet once marshaled.
    fn marshal_size(&self) -> usize {
        self.header.marshal_size() + self.payload.len() + self.padding_size as usize
    }
}

impl Marshal for Packet {
    /// MarshalTo serializes the packet and writes to the buffer.
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize, util::Error> {
        if self.header.padding != (self.padding_size > 0) {
            return Err(Error::ErrInvalidPadding.into());
        }

        let n = self.header.marshal_to(writer)?;
        writer.put_slice(&self.payload)?;

        if self.padding_size > 0 {
            writer.put_zeros(self.padding_size as usize - 1)?;
            writer.put_u8(self.padding_size)?;
        }

        Ok(n + self.payload.len() + self.padding_size as usize)
    }
}
