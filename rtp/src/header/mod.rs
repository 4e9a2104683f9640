
use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::{Reader, Writer};

use crate::error::Error;

pub const HEADER_LENGTH: usize = 12;
pub const VERSION: u8 = 2;
pub const VERSION_SHIFT: u8 = 6;
pub const VERSION_MASK: u8 = 0x3;
pub const PADDING_SHIFT: u8 = 5;
pub const PADDING_MASK: u8 = 0x1;
pub const EXTENSION_SHIFT: u8 = 4;
pub const EXTENSION_MASK: u8 = 0x1;
pub const CC_MASK: u8 = 0xF;
pub const MARKER_SHIFT: u8 = 7;
pub const MARKER_MASK: u8 = 0x1;
pub const PT_MASK: u8 = 0x7F;
pub const CSRC_LENGTH: usize = 4;
pub const CSRC_MAX: usize = 15;
pub const EXTENSION_HEADER_LENGTH: usize = 4;

/// Header represents an RTP packet header
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Header {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    /// Profile-defined identifier of the header extension, when `extension` is set.
    pub extension_profile: u16,
    /// Header extension body. Always a whole number of 32-bit words.
    pub extension_payload: Bytes,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            version: VERSION,
            padding: false,
            extension: false,
            marker: false,
            payload_type: 0,
            sequence_number: 0,
            timestamp: 0,
            ssrc: 0,
            csrc: vec![],
            extension_profile: 0,
            extension_payload: Bytes::new(),
        }
    }
}

impl Unmarshal for Header {
    /// Unmarshal parses the fixed header, the csrc list and the extension if present
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self, util::Error>
    where
        Self: Sized,
        B: Buf,
    {
        let raw_packet_len = raw_packet.remaining();
        if raw_packet_len < HEADER_LENGTH {
            return Err(Error::ErrHeaderSizeInsufficient.into());
        }
        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P|X|  CC   |M|     PT      |       sequence number         |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                           timestamp                           |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |           synchronization source (SSRC) identifier            |
         * +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * |            contributing source (CSRC) identifiers             |
         * |                             ....                              |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let mut reader = Reader::new(raw_packet);

        let b0 = reader.get_u8()?;
        let version = b0 >> VERSION_SHIFT & VERSION_MASK;
        if version != VERSION {
            return Err(Error::ErrBadVersion(version).into());
        }
        let padding = (b0 >> PADDING_SHIFT & PADDING_MASK) > 0;
        let extension = (b0 >> EXTENSION_SHIFT & EXTENSION_MASK) > 0;
        let cc = (b0 & CC_MASK) as usize;

        let curr_offset = HEADER_LENGTH + (cc * CSRC_LENGTH);
        if raw_packet_len < curr_offset {
            return Err(Error::ErrHeaderSizeInsufficient.into());
        }

        let b1 = reader.get_u8()?;
        let marker = (b1 >> MARKER_SHIFT & MARKER_MASK) > 0;
        let payload_type = b1 & PT_MASK;

        let sequence_number = reader.get_u16()?;
        let timestamp = reader.get_u32()?;
        let ssrc = reader.get_u32()?;

        let mut csrc = Vec::with_capacity(cc);
        for _ in 0..cc {
            csrc.push(reader.get_u32()?);
        }

        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |      defined by profile       |           length              |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                        header extension                       |
         * |                             ....                              |
         */
        let (extension_profile, extension_payload) = if extension {
            if raw_packet_len < curr_offset + EXTENSION_HEADER_LENGTH {
                return Err(Error::ErrHeaderSizeInsufficientForExtension.into());
            }
            let extension_profile = reader.get_u16()?;
            let extension_length = reader.get_u16()? as usize * 4;

            if reader.remaining() < extension_length {
                return Err(Error::ErrHeaderSizeInsufficientForExtension.into());
            }
            (extension_profile, reader.copy_bytes(extension_length)?)
        } else {
            (0, Bytes::new())
        };

        Ok(Header {
            version,
            padding,
            extension,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension_profile,
            extension_payload,
        })
    }
}

impl MarshalSize for Header {
    /// MarshalSize returns the size of the header once marshaled.
    fn marshal_size(&self) -> usize {
        let mut head_size = HEADER_LENGTH + (self.csrc.len() * CSRC_LENGTH);
        if self.extension {
            head_size += EXTENSION_HEADER_LENGTH + self.extension_payload.len();
        }
        head_size
    }
}

impl Marshal for Header {
    /// Marshal serializes the header and writes to the buffer.
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize, util::Error> {
        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P|X|  CC   |M|     PT      |       sequence number         |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                           timestamp                           |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |           synchronization source (SSRC) identifier            |
         * +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * |            contributing source (CSRC) identifiers             |
         * |                             ....                              |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        if self.version != VERSION {
            return Err(Error::ErrBadVersion(self.version).into());
        }
        if self.payload_type > PT_MASK {
            return Err(Error::ErrInvalidPayloadType(self.payload_type).into());
        }
        if self.csrc.len() > CSRC_MAX {
            return Err(Error::ErrTooManyCsrcs.into());
        }
        if self.extension && self.extension_payload.len() % 4 != 0 {
            return Err(Error::HeaderExtensionPayloadNot32BitWords.into());
        }
        let extension_length = u16::try_from(self.extension_payload.len() / 4)
            .map_err(|_| Error::ErrHeaderExtensionTooLong)?;

        let before = writer.len();

        // The first byte contains the version, padding bit, extension bit, and csrc size
        let mut b0 = (self.version << VERSION_SHIFT) | self.csrc.len() as u8;
        if self.padding {
            b0 |= 1 << PADDING_SHIFT;
        }
        if self.extension {
            b0 |= 1 << EXTENSION_SHIFT;
        }
        writer.put_u8(b0)?;

        // The second byte contains the marker bit and payload type.
        let mut b1 = self.payload_type;
        if self.marker {
            b1 |= 1 << MARKER_SHIFT;
        }
        writer.put_u8(b1)?;

        writer.put_u16(self.sequence_number)?;
        writer.put_u32(self.timestamp)?;
        writer.put_u32(self.ssrc)?;

        for csrc in &self.csrc {
            writer.put_u32(*csrc)?;
        }

        if self.extension {
            writer.put_u16(self.extension_profile)?;
            writer.put_u16(extension_length)?;
            writer.put_slice(&self.extension_payload)?;
        }

        Ok(writer.len() - before)
    }
}

impl Header {
    /// Appends a contributing source, keeping the list within the 4-bit CC field.
    pub fn add_csrc(&mut self, csrc: u32) -> Result<(), Error> {
        if self.csrc.len() >= CSRC_MAX {
            return Err(Error::ErrTooManyCsrcs);
        }
        self.csrc.push(csrc);
        Ok(())
    }

    /// Removes a contributing source, returning whether it was present.
    pub fn remove_csrc(&mut self, csrc: u32) -> bool {
        if let Some(index) = self.csrc.iter().position(|c| *c == csrc) {
            self.csrc.remove(index);
            true
        } else {
            false
        }
    }

    /// Sets the RFC 3550 header extension. The payload must be whole 32-bit words.
    pub fn set_extension(&mut self, profile: u16, payload: Bytes) -> Result<(), Error> {
        if payload.len() % 4 != 0 {
            return Err(Error::HeaderExtensionPayloadNot32BitWords);
        }
        self.extension = true;
        self.extension_profile = profile;
        self.extension_payload = payload;
        Ok(())
    }

    pub fn clear_extension(&mut self) {
        self.extension = false;
        self.extension_profile = 0;
        self.extension_payload = Bytes::new();
    }
}
