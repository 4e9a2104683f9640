
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Buf, Bytes};
use util::marshal::{Marshal, MarshalSize, Unmarshal};
use util::{Reader, Writer};

use crate::error::Error;
use crate::header::*;
use crate::reception_report::*;
use crate::util::*;

type Result<T> = std::result::Result<T, util::Error>;

pub(crate) const SR_HEADER_LENGTH: usize = 24;

/// Seconds between the NTP epoch (1900) and the unix epoch (1970)
pub const NTP_UNIX_OFFSET: u64 = 0x83AA7E80;

/// Converts a wall clock reading to a 64-bit NTP timestamp.
pub fn unix2ntp(st: SystemTime) -> u64 {
    let u = st
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_nanos() as u64;
    let mut s = u / 1_000_000_000;
    s += NTP_UNIX_OFFSET;
    let mut f = u % 1_000_000_000;
    f <<= 32;
    f /= 1_000_000_000;
    s <<= 32;

    s | f
}

/// Converts a 64-bit NTP timestamp back to a wall clock reading.
pub fn ntp2unix(t: u64) -> SystemTime {
    let s = (t >> 32).saturating_sub(NTP_UNIX_OFFSET);
    let f = ((t & 0xFFFFFFFF) * 1_000_000_000) >> 32;

    UNIX_EPOCH
        .checked_add(Duration::new(s, f as u32))
        .unwrap_or(UNIX_EPOCH)
}

/// A SenderReport (SR) packet provides reception quality feedback for an RTP stream
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct SenderReport {
    /// The synchronization source identifier for the originator of this SR packet.
    pub ssrc: u32,
    /// The wallclock time when this report was sent so that it may be used in
    /// combination with timestamps returned in reception reports from other
    /// receivers to measure round-trip propagation to those receivers.
    pub ntp_time: u64,
    /// Corresponds to the same time as the NTP timestamp (above), but in
    /// the same units and with the same random offset as the RTP
    /// timestamps in data packets.
    pub rtp_time: u32,
    /// The total number of RTP data packets transmitted by the sender
    /// since starting transmission up until the time this SR packet was
    /// generated.
    pub packet_count: u32,
    /// The total number of payload octets (i.e., not including header or
    /// padding) transmitted in RTP data packets by the sender since
    /// starting transmission up until the time this SR packet was
    /// generated.
    pub octet_count: u32,
    /// Zero or more reception report blocks depending on the number of other
    /// sources heard by this sender since the last report.
    pub reports: Vec<ReceptionReport>,
    /// ProfileExtensions contains additional, payload-specific information that needs to
    /// be reported regularly about the sender.
    pub profile_extensions: Bytes,
}

impl fmt::Display for SenderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = format!("SenderReport from {}\n", self.ssrc);
        out += format!("\tNTPTime:\t{}\n", self.ntp_time).as_str();
        out += format!("\tRTPTIme:\t{}\n", self.rtp_time).as_str();
        out += format!("\tPacketCount:\t{}\n", self.packet_count).as_str();
        out += format!("\tOctetCount:\t{}\n", self.octet_count).as_str();
        out += "\tSSRC    \tLost\tLastSequence\n";
        for rep in &self.reports {
            out += format!(
                "\t{:x}\t{}/{}\t{}\n",
                rep.ssrc, rep.fraction_lost, rep.total_lost, rep.last_sequence_number
            )
            .as_str();
        }
        out += format!("\tProfile Extension Data: {:?}\n", self.profile_extensions).as_str();

        write!(f, "{out}")
    }
}

impl SenderReport {
    /// Header returns the Header associated with this packet.
    pub fn header(&self) -> Result<Header> {
        Ok(Header {
            padding: false,
            count: self.reports.len() as u8,
            packet_type: PacketType::SenderReport,
            length: header_length(self.marshal_size())?,
        })
    }

    /// destination_ssrc returns an array of SSRC values that this packet refers to.
    pub fn destination_ssrc(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self.reports.iter().map(|x| x.ssrc).collect();
        out.push(self.ssrc);
        out
    }

    pub fn ntp_seconds(&self) -> u32 {
        (self.ntp_time >> 32) as u32
    }

    pub fn ntp_fraction(&self) -> u32 {
        self.ntp_time as u32
    }

    /// The middle 32 bits of the NTP timestamp, echoed back as LSR by receivers.
    pub fn ntp_middle32(&self) -> u32 {
        (self.ntp_time >> 16) as u32
    }

    pub fn set_ntp_time(&mut self, now: SystemTime) {
        self.ntp_time = unix2ntp(now);
    }

    pub fn ntp_system_time(&self) -> SystemTime {
        ntp2unix(self.ntp_time)
    }

    pub fn add_report(&mut self, report: ReceptionReport) -> std::result::Result<(), Error> {
        if self.reports.len() >= COUNT_MAX {
            return Err(Error::TooManyReports);
        }
        self.reports.push(report);
        Ok(())
    }

    /// Removes the block about `ssrc`, returning whether one was present.
    pub fn remove_report(&mut self, ssrc: u32) -> bool {
        if let Some(index) = self.reports.iter().position(|r| r.ssrc == ssrc) {
            self.reports.remove(index);
            true
        } else {
            false
        }
    }
}

impl MarshalSize for SenderReport {
    fn marshal_size(&self) -> usize {
        let mut reps_length = 0;
        for rep in &self.reports {
            reps_length += rep.marshal_size();
        }

        HEADER_LENGTH + SR_HEADER_LENGTH + reps_length + self.profile_extensions.len()
    }
}

impl Marshal for SenderReport {
    /// marshal_to encodes the packet in binary.
    fn marshal_to(&self, writer: &mut Writer) -> Result<usize> {
        if self.reports.len() > COUNT_MAX {
            return Err(Error::TooManyReports.into());
        }
        if get_padding_size(self.profile_extensions.len()) != 0 {
            return Err(Error::ProfileExtensionsNot32BitWords.into());
        }

        /*
         *         0                   1                   2                   3
         *         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         * header |V=2|P|    RC   |   PT=SR=200   |             length            |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                         SSRC of sender                        |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * sender |              NTP timestamp, most significant word             |
         * info   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |             NTP timestamp, least significant word             |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                         RTP timestamp                         |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                     sender's packet count                     |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *        |                      sender's octet count                     |
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         * report |                 SSRC_1 (SSRC of first source)                 |
         * block  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         *   1    :                               ...                             :
         *        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
         *        |                  profile-specific extensions                  |
         *        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
         */
        let n = self.header()?.marshal_to(writer)?;

        writer.put_u32(self.ssrc)?;
        writer.put_u64(self.ntp_time)?;
        writer.put_u32(self.rtp_time)?;
        writer.put_u32(self.packet_count)?;
        writer.put_u32(self.octet_count)?;

        let mut reps_length = 0;
        for report in &self.reports {
            reps_length += report.marshal_to(writer)?;
        }

        writer.put_slice(&self.profile_extensions)?;

        Ok(n + SR_HEADER_LENGTH + reps_length + self.profile_extensions.len())
    }
}

impl Unmarshal for SenderReport {
    /// Unmarshal decodes the SenderReport from binary
    fn unmarshal<B>(raw_packet: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf,
    {
        let (header, mut body) = read_packet(raw_packet, PacketType::SenderReport)?;
        if body.remaining() < SR_HEADER_LENGTH {
            return Err(Error::PacketTooShort.into());
        }

        let mut reader = Reader::new(&mut body);
        let ssrc = reader.get_u32()?;
        let ntp_time = reader.get_u64()?;
        let rtp_time = reader.get_u32()?;
        let packet_count = reader.get_u32()?;
        let octet_count = reader.get_u32()?;

        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(&mut body)?);
        }

        let profile_extensions = Reader::new(&mut body).copy_rest();
        if get_padding_size(profile_extensions.len()) != 0 {
            return Err(Error::WrongPadding.into());
        }

        Ok(SenderReport {
            ssrc,
            ntp_time,
            rtp_time,
            packet_count,
            octet_count,
            reports,
            profile_extensions,
        })
    }
}
