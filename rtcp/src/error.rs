use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Packet lost exceeds maximum amount of packets
    /// that can possibly be lost.
    #[error("Invalid total lost count")]
    InvalidTotalLost,
    /// Packet contains an invalid header.
    #[error("Invalid header")]
    InvalidHeader,
    /// Packet contains empty compound.
    #[error("Empty compound packet")]
    EmptyCompound,
    /// Invalid first packet in compound packets. First packet
    /// should either be a SenderReport packet or ReceiverReport
    #[error("First packet in compound must be SR or RR")]
    BadFirstPacket,
    /// CNAME was not defined.
    #[error("Compound missing SourceDescription with CNAME")]
    MissingCname,
    /// Packet was defined before CNAME.
    #[error("Packet seen before CNAME")]
    PacketBeforeCname,
    /// Too many reports.
    #[error("Too many reports")]
    TooManyReports,
    /// Too many chunks.
    #[error("Too many chunks")]
    TooManyChunks,
    /// Too many sources.
    #[error("too many sources")]
    TooManySources,
    /// Packet received is too short.
    #[error("Packet too short to be read")]
    PacketTooShort,
    /// Packet does not fit the 16-bit length field.
    #[error("Packet too long to be written")]
    PacketTooLong,
    /// Wrong packet type.
    #[error("Wrong packet type")]
    WrongType,
    /// SDES received is too long.
    #[error("SDES must be < 255 octets long")]
    SdesTextTooLong,
    /// SDES type is missing.
    #[error("SDES item missing type")]
    SdesMissingType,
    /// Reason is too long.
    #[error("Reason must be < 255 octets long")]
    ReasonTooLong,
    /// Invalid packet version.
    #[error("Invalid packet version")]
    BadVersion,
    /// Invalid padding value.
    #[error("Invalid padding value")]
    WrongPadding,
    /// Profile-specific extensions must fill whole 32-bit words.
    #[error("Profile extensions must be a multiple of 4 octets")]
    ProfileExtensionsNot32BitWords,
    /// Application-dependent data must fill whole 32-bit words.
    #[error("Application data must be a multiple of 4 octets")]
    ApplicationDataNot32BitWords,
    /// APP subtype does not fit the 5-bit count field.
    #[error("Application subtype must be in range [0-31]")]
    InvalidSubType,

    #[error("{0}")]
    Util(util::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Reports whether the error describes bytes that do not form a well
    /// formed control packet. Errors raised while building a packet with
    /// invalid arguments return false.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::InvalidHeader
                | Error::PacketTooShort
                | Error::WrongType
                | Error::BadVersion
                | Error::WrongPadding
                | Error::SdesMissingType
                | Error::Util(util::Error::OutOfBounds { .. })
        )
    }
}

impl From<Error> for util::Error {
    fn from(e: Error) -> Self {
        util::Error::from_std(e)
    }
}

impl From<util::Error> for Error {
    fn from(e: util::Error) -> Self {
        match e.downcast::<Error>() {
            Ok(e) => e,
            Err(e) => Error::Util(e),
        }
    }
}

impl PartialEq<util::Error> for Error {
    fn eq(&self, other: &util::Error) -> bool {
        if let Some(down) = other.downcast_ref::<Error>() {
            self == down
        } else {
            false
        }
    }
}
