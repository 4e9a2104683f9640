use bytes::{Buf, Bytes};
use util::marshal::Unmarshal;
use util::{Reader, Writer};

use crate::error::Error;
use crate::header::*;

type Result<T> = std::result::Result<T, util::Error>;

/// How many octets are needed to pad `len` to a 32-bit boundary
pub(crate) fn get_padding_size(len: usize) -> usize {
    if len % 4 == 0 {
        0
    } else {
        4 - (len % 4)
    }
}

/// Length field for a packet of `size` octets: 32-bit words minus one.
pub(crate) fn header_length(size: usize) -> Result<u16> {
    u16::try_from((size / 4).saturating_sub(1)).map_err(|_| Error::PacketTooLong.into())
}

/// Writes null octets up to the next 32-bit boundary. Used for SDES chunks and
/// the BYE reason, whose padding is not signalled by the P bit.
pub(crate) fn put_zero_padding(writer: &mut Writer, len: usize) -> Result<()> {
    writer.put_zeros(get_padding_size(len))
}

/// Reads the common header and returns it along with the packet body, bounded
/// to the declared `length` so decoders never see the next packet of a
/// compound datagram. P bit padding is stripped from the returned body.
pub(crate) fn read_packet<B>(raw_packet: &mut B, want: PacketType) -> Result<(Header, Bytes)>
where
    B: Buf,
{
    let header = Header::unmarshal(raw_packet)?;
    if header.packet_type != want {
        return Err(Error::WrongType.into());
    }

    let body_len = header.length as usize * 4;
    if raw_packet.remaining() < body_len {
        return Err(Error::PacketTooShort.into());
    }
    let mut body = Reader::new(raw_packet).copy_bytes(body_len)?;

    if header.padding {
        let padding_len = body.last().copied().unwrap_or(0) as usize;
        if padding_len == 0 || padding_len > body.len() {
            return Err(Error::WrongPadding.into());
        }
        body.truncate(body.len() - padding_len);
    }

    Ok((header, body))
}
