#[cfg(test)]
mod packet_test;

use std::fmt;

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::Writer;

use crate::application_defined::ApplicationDefined;
use crate::error::Error;
use crate::goodbye::Goodbye;
use crate::header::*;
use crate::raw_packet::RawPacket;
use crate::receiver_report::ReceiverReport;
use crate::sender_report::SenderReport;
use crate::source_description::SourceDescription;

type Result<T> = std::result::Result<T, util::Error>;

/// Packet represents an RTCP packet, a protocol used for out-of-band statistics and control information for an RTP session
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Packet {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    SourceDescription(SourceDescription),
    Goodbye(Goodbye),
    ApplicationDefined(ApplicationDefined),
    /// A packet type this crate does not decode, kept verbatim.
    Raw(RawPacket),
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::SenderReport(p) => p.fmt(f),
            Packet::ReceiverReport(p) => p.fmt(f),
            Packet::SourceDescription(p) => p.fmt(f),
            Packet::Goodbye(p) => p.fmt(f),
            Packet::ApplicationDefined(p) => p.fmt(f),
            Packet::Raw(p) => p.fmt(f),
        }
    }
}

impl Packet {
    pub fn header(&self) -> Result<Header> {
        match self {
            Packet::SenderReport(p) => p.header(),
            Packet::ReceiverReport(p) => p.header(),
            Packet::SourceDescription(p) => p.header(),
            Packet::Goodbye(p) => p.header(),
            Packet::ApplicationDefined(p) => p.header(),
            Packet::Raw(p) => p.header(),
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::SenderReport(_) => PacketType::SenderReport,
            Packet::ReceiverReport(_) => PacketType::ReceiverReport,
            Packet::SourceDescription(_) => PacketType::SourceDescription,
            Packet::Goodbye(_) => PacketType::Goodbye,
            Packet::ApplicationDefined(_) => PacketType::ApplicationDefined,
            Packet::Raw(p) => p.header.packet_type,
        }
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        match self {
            Packet::SenderReport(p) => p.destination_ssrc(),
            Packet::ReceiverReport(p) => p.destination_ssrc(),
            Packet::SourceDescription(p) => p.destination_ssrc(),
            Packet::Goodbye(p) => p.destination_ssrc(),
            Packet::ApplicationDefined(p) => p.destination_ssrc(),
            Packet::Raw(p) => p.destination_ssrc(),
        }
    }
}

impl MarshalSize for Packet {
    fn marshal_size(&self) -> usize {
        match self {
            Packet::SenderReport(p) => p.marshal_size(),
            Packet::ReceiverReport(p) => p.marshal_size(),
            Packet::SourceDescription(p) => p.marshal_size(),
            Packet::Goodbye(p) => p.marshal_size(),
            Packet::ApplicationDefined(p) => p.marshal_size(),
            Packet::Raw(p) => p.marshal_size(),
        }
    }
}

impl Marshal for Packet {
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        match self {
            Packet::SenderReport(p) => p.marshal_to(writer),
            Packet::ReceiverReport(p) => p.marshal_to(writer),
            Packet::SourceDescription(p) => p.marshal_to(writer),
            Packet::Goodbye(p) => p.marshal_to(writer),
            Packet::ApplicationDefined(p) => p.marshal_to(writer),
            Packet::Raw(p) => p.marshal_to(writer),
        }
    }
}

impl Unmarshal for Packet {
    /// Decodes the first packet of `raw_packet`, leaving the rest in place.
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        unmarshaller(raw_packet)
    }
}

/// Unmarshal takes an entire udp datagram (which may consist of multiple RTCP packets) and
/// returns the unmarshaled packets it contains, in wire order.
///
/// A packet with an unknown type comes back as [`Packet::Raw`] and does not stop the walk.
/// A header whose length runs past the end of the datagram fails the whole call.
pub fn unmarshal<B>(raw_data: &mut B) -> Result<Vec<Packet>>
where
    B: Buf,
{
    let mut packets = vec![];

    while raw_data.has_remaining() {
        let p = unmarshaller(raw_data)?;
        packets.push(p);
    }

    match packets.len() {
        // Empty Packet
        0 => Err(Error::InvalidHeader.into()),

        // Multiple Packet
        _ => Ok(packets),
    }
}

/// Marshal takes an array of Packets and serializes them to a single buffer
pub fn marshal(packets: &[Packet]) -> Result<Bytes> {
    let size = packets.iter().map(|p| p.marshal_size()).sum();
    let mut writer = Writer::with_capacity(size);
    for p in packets {
        p.marshal_to(&mut writer)?;
    }
    Ok(writer.freeze())
}

/// unmarshaller is a factory which pulls the first RTCP packet from a bytestream,
/// and returns it's parsed representation. Exactly `(length+1)*4` bytes are consumed.
pub(crate) fn unmarshaller<B>(raw_data: &mut B) -> Result<Packet>
where
    B: Buf,
{
    let h = Header::unmarshal(raw_data)?;

    let length = (h.length as usize) * 4;
    if length > raw_data.remaining() {
        return Err(Error::PacketTooShort.into());
    }

    let mut in_packet = h.marshal()?.chain(raw_data.take(length));

    let p = match h.packet_type {
        PacketType::SenderReport => Packet::SenderReport(SenderReport::unmarshal(&mut in_packet)?),
        PacketType::ReceiverReport => {
            Packet::ReceiverReport(ReceiverReport::unmarshal(&mut in_packet)?)
        }
        PacketType::SourceDescription => {
            Packet::SourceDescription(SourceDescription::unmarshal(&mut in_packet)?)
        }
        PacketType::Goodbye => Packet::Goodbye(Goodbye::unmarshal(&mut in_packet)?),
        PacketType::ApplicationDefined => {
            Packet::ApplicationDefined(ApplicationDefined::unmarshal(&mut in_packet)?)
        }
        PacketType::Unsupported(_) => Packet::Raw(RawPacket::unmarshal(&mut in_packet)?),
    };

    // the decoders read exactly one packet; drop anything they left behind
    let rest = in_packet.remaining();
    in_packet.advance(rest);

    Ok(p)
}
