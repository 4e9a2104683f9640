
use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::{Reader, Writer};

use crate::error::Error;
use crate::header::*;
use crate::util::*;

type Result<T> = std::result::Result<T, util::Error>;

const SDES_SOURCE_LEN: usize = 4;
const SDES_TYPE_LEN: usize = 1;
const SDES_OCTET_COUNT_LEN: usize = 1;

/// SDESType is the item type used in the RTCP SDES control packet.
/// RTP SDES item types registered with IANA. See: https://www.iana.org/assignments/rtp-parameters/rtp-parameters.xhtml#rtp-parameters-5
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SdesType {
    #[default]
    SdesEnd = 0, // end of SDES list                RFC 3550, 6.5
    SdesCname = 1,    // canonical name                  RFC 3550, 6.5.1
    SdesName = 2,     // user name                       RFC 3550, 6.5.2
    SdesEmail = 3,    // user's electronic mail address  RFC 3550, 6.5.3
    SdesPhone = 4,    // user's phone number             RFC 3550, 6.5.4
    SdesLocation = 5, // geographic user location        RFC 3550, 6.5.5
    SdesTool = 6,     // name of application or tool     RFC 3550, 6.5.6
    SdesNote = 7,     // notice about the source         RFC 3550, 6.5.7
    SdesPrivate = 8,  // private extensions              RFC 3550, 6.5.8
}

impl fmt::Display for SdesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdesType::SdesEnd => "END",
            SdesType::SdesCname => "CNAME",
            SdesType::SdesName => "NAME",
            SdesType::SdesEmail => "EMAIL",
            SdesType::SdesPhone => "PHONE",
            SdesType::SdesLocation => "LOC",
            SdesType::SdesTool => "TOOL",
            SdesType::SdesNote => "NOTE",
            SdesType::SdesPrivate => "PRIV",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<u8> for SdesType {
    type Error = Error;

    fn try_from(b: u8) -> std::result::Result<Self, Self::Error> {
        match b {
            0 => Ok(SdesType::SdesEnd),
            1 => Ok(SdesType::SdesCname),
            2 => Ok(SdesType::SdesName),
            3 => Ok(SdesType::SdesEmail),
            4 => Ok(SdesType::SdesPhone),
            5 => Ok(SdesType::SdesLocation),
            6 => Ok(SdesType::SdesTool),
            7 => Ok(SdesType::SdesNote),
            8 => Ok(SdesType::SdesPrivate),
            _ => Err(Error::SdesMissingType),
        }
    }
}

/// A SourceDescriptionItem is a part of a SourceDescription that describes a stream.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SourceDescriptionItem {
    /// The type identifier for this item. eg, SDESCNAME for canonical name description.
    ///
    /// Type zero or SDESEnd is interpreted as the end of an item list and cannot be used.
    pub sdes_type: SdesType,
    /// Text is a unicode text blob associated with the item. Its meaning varies based on the item's Type.
    pub text: Bytes,
}

impl MarshalSize for SourceDescriptionItem {
    fn marshal_size(&self) -> usize {
        /*
         *   0                   1                   2                   3
         *   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *  |    CNAME=1    |     length    | user and domain name        ...
         *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        SDES_TYPE_LEN + SDES_OCTET_COUNT_LEN + self.text.len()
    }
}

impl Marshal for SourceDescriptionItem {
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        if self.sdes_type == SdesType::SdesEnd {
            return Err(Error::SdesMissingType.into());
        }
        if self.text.len() > SDES_MAX_OCTET_COUNT {
            return Err(Error::SdesTextTooLong.into());
        }

        writer.put_u8(self.sdes_type as u8)?;
        writer.put_u8(self.text.len() as u8)?;
        writer.put_slice(&self.text)?;

        // no padding for each SourceDescriptionItem
        Ok(self.marshal_size())
    }
}

/// A SourceDescriptionChunk contains items describing a single RTP source
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SourceDescriptionChunk {
    /// The source (ssrc) or contributing source (csrc) identifier this packet describes
    pub source: u32,
    pub items: Vec<SourceDescriptionItem>,
}

impl SourceDescriptionChunk {
    fn raw_size(&self) -> usize {
        let mut len = SDES_SOURCE_LEN;
        for it in &self.items {
            len += it.marshal_size();
        }
        len += SDES_TYPE_LEN; // for terminating null octet
        len
    }

    /// The first item of the given type, if any.
    pub fn item(&self, sdes_type: SdesType) -> Option<&Bytes> {
        self.items
            .iter()
            .find(|it| it.sdes_type == sdes_type)
            .map(|it| &it.text)
    }
}

impl MarshalSize for SourceDescriptionChunk {
    fn marshal_size(&self) -> usize {
        let l = self.raw_size();
        // align to 32-bit boundary
        l + get_padding_size(l)
    }
}

impl Marshal for SourceDescriptionChunk {
    /// Marshal encodes the SourceDescriptionChunk in binary
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        /*
         *  +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         *  |                          SSRC/CSRC_1                          |
         *  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *  |                           SDES items                          |
         *  |                              ...                              |
         *  +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         */
        writer.put_u32(self.source)?;

        for it in &self.items {
            it.marshal_to(writer)?;
        }

        // The list of items in each chunk MUST be terminated by one or more null octets
        writer.put_u8(SdesType::SdesEnd as u8)?;

        // additional null octets MUST be included if needed to pad until the next 32-bit boundary
        put_zero_padding(writer, self.raw_size())?;
        Ok(self.marshal_size())
    }
}

impl Unmarshal for SourceDescriptionChunk {
    /// Unmarshal decodes the SourceDescriptionChunk from binary
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        if raw_packet.remaining() < (SDES_SOURCE_LEN + SDES_TYPE_LEN) {
            return Err(Error::PacketTooShort.into());
        }

        let mut reader = Reader::new(raw_packet);
        let source = reader.get_u32()?;

        let mut offset = SDES_SOURCE_LEN;
        let mut items = vec![];
        loop {
            if !reader.has_remaining() {
                // chunk ran out before its terminating null octet
                return Err(Error::PacketTooShort.into());
            }
            let raw_type = reader.get_u8()?;
            offset += SDES_TYPE_LEN;
            if raw_type == SdesType::SdesEnd as u8 {
                // skip the null octets up to the next 32-bit boundary
                reader.skip(get_padding_size(offset))?;
                return Ok(SourceDescriptionChunk { source, items });
            }

            let octet_count = reader.get_u8()? as usize;
            if reader.remaining() < octet_count {
                return Err(Error::PacketTooShort.into());
            }
            let text = reader.copy_bytes(octet_count)?;
            offset += SDES_OCTET_COUNT_LEN + octet_count;

            // items of unknown type are skipped, RFC 3550 6.5
            if let Ok(sdes_type) = SdesType::try_from(raw_type) {
                items.push(SourceDescriptionItem { sdes_type, text });
            }
        }
    }
}

/// A SourceDescription (SDES) packet describes the sources in an RTP stream.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct SourceDescription {
    pub chunks: Vec<SourceDescriptionChunk>,
}

impl fmt::Display for SourceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = "Source Description:\n".to_string();
        for c in &self.chunks {
            out += format!("\t{:x}\n", c.source).as_str();
            for it in &c.items {
                out += format!("\t\t{}: {:?}\n", it.sdes_type, it.text).as_str();
            }
        }
        write!(f, "{out}")
    }
}

impl SourceDescription {
    /// A packet carrying a single chunk with the CNAME item of `source`.
    pub fn with_cname(source: u32, cname: Bytes) -> Self {
        SourceDescription {
            chunks: vec![SourceDescriptionChunk {
                source,
                items: vec![SourceDescriptionItem {
                    sdes_type: SdesType::SdesCname,
                    text: cname,
                }],
            }],
        }
    }

    /// Header returns the Header associated with this packet.
    pub fn header(&self) -> Result<Header> {
        Ok(Header {
            padding: false,
            count: self.chunks.len() as u8,
            packet_type: PacketType::SourceDescription,
            length: header_length(self.marshal_size())?,
        })
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        self.chunks.iter().map(|x| x.source).collect()
    }

    pub fn add_chunk(&mut self, chunk: SourceDescriptionChunk) -> std::result::Result<(), Error> {
        if self.chunks.len() >= COUNT_MAX {
            return Err(Error::TooManyChunks);
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Removes the chunk describing `source`, returning whether one was present.
    pub fn remove_chunk(&mut self, source: u32) -> bool {
        if let Some(index) = self.chunks.iter().position(|c| c.source == source) {
            self.chunks.remove(index);
            true
        } else {
            false
        }
    }

    /// The first CNAME carried by any chunk.
    pub fn cname(&self) -> Option<&Bytes> {
        self.chunks
            .iter()
            .find_map(|c| c.item(SdesType::SdesCname))
    }
}

impl MarshalSize for SourceDescription {
    fn marshal_size(&self) -> usize {
        let mut chunks_length = 0;
        for c in &self.chunks {
            chunks_length += c.marshal_size();
        }

        HEADER_LENGTH + chunks_length
    }
}

impl Marshal for SourceDescription {
    /// Marshal encodes the SourceDescription in binary
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        if self.chunks.len() > COUNT_MAX {
            return Err(Error::TooManyChunks.into());
        }

        /*
         *         0                   1                   2                   3
         *         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * header |V=2|P|    SC   |  PT=SDES=202  |             length            |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * chunk  |                          SSRC/CSRC_1                          |
         *   1    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                           SDES items                          |
         *        |                              ...                              |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * chunk  |                          SSRC/CSRC_2                          |
         *   2    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                           SDES items                          |
         *        |                              ...                              |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         */
        let mut n = self.header()?.marshal_to(writer)?;

        for c in &self.chunks {
            n += c.marshal_to(writer)?;
        }

        Ok(n)
    }
}

impl Unmarshal for SourceDescription {
    /// Unmarshal decodes the SourceDescription from binary
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_packet(raw_packet, PacketType::SourceDescription)?;

        let mut chunks = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            chunks.push(SourceDescriptionChunk::unmarshal(&mut body)?);
        }

        // anything left over means the count and length fields disagree
        if body.has_remaining() {
            return Err(Error::InvalidHeader.into());
        }

        Ok(SourceDescription { chunks })
    }
}
