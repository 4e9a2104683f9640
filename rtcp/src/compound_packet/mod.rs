
use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::Writer;

use crate::error::Error;
use crate::packet::*;
use crate::source_description::*;

type Result<T> = std::result::Result<T, util::Error>;

/// A CompoundPacket is a collection of RTCP packets transmitted as a single packet with
/// the underlying protocol (for example UDP).
///
/// To maximize the resolution of reception statistics, the first Packet in a CompoundPacket
/// must always be either a SenderReport or a ReceiverReport.  This is true even if no data
/// has been sent or received, in which case an empty ReceiverReport must be sent, and even
/// if the only other RTCP packet in the compound packet is a Goodbye.
///
/// Next, a SourceDescription containing a CNAME item must be included in each CompoundPacket
/// to identify the source and to begin associating media for purposes such as lip-sync.
///
/// Other RTCP packet types may follow in any order. Packet types may appear more than once.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct CompoundPacket(pub Vec<Packet>);

impl fmt::Display for CompoundPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompoundPacket [")?;
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p.packet_type())?;
        }
        write!(f, "]")
    }
}

impl MarshalSize for CompoundPacket {
    fn marshal_size(&self) -> usize {
        self.0.iter().map(|p| p.marshal_size()).sum()
    }
}

impl Marshal for CompoundPacket {
    /// Marshal encodes the CompoundPacket as binary.
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        self.validate()?;

        let mut n = 0;
        for packet in &self.0 {
            n += packet.marshal_to(writer)?;
        }

        Ok(n)
    }
}

impl Unmarshal for CompoundPacket {
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let c = CompoundPacket(unmarshal(raw_packet)?);
        c.validate()?;

        Ok(c)
    }
}

impl CompoundPacket {
    /// destination_ssrc returns the synchronization sources associated with this
    /// CompoundPacket's reception report.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        match self.0.first() {
            Some(p) => p.destination_ssrc(),
            None => vec![],
        }
    }

    /// Validate returns an error if this is not an RFC-compliant CompoundPacket.
    pub fn validate(&self) -> Result<()> {
        self.cname().map(|_| ())
    }

    /// CNAME returns the CNAME that *must* be present in every CompoundPacket
    pub fn cname(&self) -> Result<Bytes> {
        let first = match self.0.first() {
            Some(p) => p,
            None => return Err(Error::EmptyCompound.into()),
        };

        // SenderReport and ReceiverReport are the only types that
        // are allowed to be the first packet in a compound datagram
        if !matches!(first, Packet::SenderReport(_) | Packet::ReceiverReport(_)) {
            return Err(Error::BadFirstPacket.into());
        }

        for pkt in &self.0[1..] {
            match pkt {
                // If the number of ReceptionReports exceeds 31 additional ReceiverReports
                // can be included here.
                Packet::ReceiverReport(_) => continue,
                // A SourceDescription containing a CNAME must be included in every
                // CompoundPacket.
                Packet::SourceDescription(sdes) => {
                    return sdes
                        .chunks
                        .iter()
                        .find_map(|c| c.item(SdesType::SdesCname))
                        .cloned()
                        .ok_or_else(|| Error::MissingCname.into());
                }
                // Other packets are not permitted before the CNAME
                _ => return Err(Error::PacketBeforeCname.into()),
            }
        }

        // CNAME never reached
        Err(Error::MissingCname.into())
    }
}
