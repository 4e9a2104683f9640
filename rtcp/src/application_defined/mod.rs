
use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::{Reader, Writer};

use crate::error::Error;
use crate::header::*;
use crate::util::*;

type Result<T> = std::result::Result<T, util::Error>;

const APP_NAME_LENGTH: usize = 4;

/// An ApplicationDefined (APP) packet carries experimental or application
/// specific data, identified by a four character name and a 5-bit subtype.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct ApplicationDefined {
    /// Subtype, sent in the count field of the header.
    pub sub_type: u8,
    /// The synchronization source identifier of the originator.
    pub ssrc: u32,
    /// Four ASCII characters naming the application.
    pub name: [u8; 4],
    /// Application-dependent data, always whole 32-bit words.
    pub data: Bytes,
}

impl fmt::Display for ApplicationDefined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApplicationDefined from {:x}\n\tName: {}\n\tSubType: {}\n\tData: {:?}\n",
            self.ssrc,
            String::from_utf8_lossy(&self.name),
            self.sub_type,
            self.data
        )
    }
}

impl ApplicationDefined {
    /// Header returns the Header associated with this packet.
    pub fn header(&self) -> Result<Header> {
        Ok(Header {
            padding: false,
            count: self.sub_type,
            packet_type: PacketType::ApplicationDefined,
            length: header_length(self.marshal_size())?,
        })
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        vec![self.ssrc]
    }

    pub fn set_data(&mut self, data: Bytes) -> std::result::Result<(), Error> {
        if get_padding_size(data.len()) != 0 {
            return Err(Error::ApplicationDataNot32BitWords);
        }
        self.data = data;
        Ok(())
    }
}

impl MarshalSize for ApplicationDefined {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH + APP_NAME_LENGTH + self.data.len()
    }
}

impl Marshal for ApplicationDefined {
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        /*
         *  0                   1                   2                   3
         *  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |V=2|P| subtype |   PT=APP=204  |             length            |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                           SSRC/CSRC                           |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                          name (ASCII)                         |
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * |                   application-dependent data                ...
         * +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        if self.sub_type as usize > COUNT_MAX {
            return Err(Error::InvalidSubType.into());
        }
        if get_padding_size(self.data.len()) != 0 {
            return Err(Error::ApplicationDataNot32BitWords.into());
        }

        let n = self.header()?.marshal_to(writer)?;
        writer.put_u32(self.ssrc)?;
        writer.put_slice(&self.name)?;
        writer.put_slice(&self.data)?;

        Ok(n + SSRC_LENGTH + APP_NAME_LENGTH + self.data.len())
    }
}

impl Unmarshal for ApplicationDefined {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_packet(raw_packet, PacketType::ApplicationDefined)?;
        if body.remaining() < SSRC_LENGTH + APP_NAME_LENGTH {
            return Err(Error::PacketTooShort.into());
        }

        let mut reader = Reader::new(&mut body);
        let ssrc = reader.get_u32()?;
        let mut name = [0u8; APP_NAME_LENGTH];
        name.copy_from_slice(&reader.copy_bytes(APP_NAME_LENGTH)?);
        let data = reader.copy_rest();
        if get_padding_size(data.len()) != 0 {
            return Err(Error::WrongPadding.into());
        }

        Ok(ApplicationDefined {
            sub_type: header.count,
            ssrc,
            name,
            data,
        })
    }
}
