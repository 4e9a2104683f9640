use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("RTP header size insufficient")]
    ErrHeaderSizeInsufficient,
    #[error("RTP header size insufficient for extension")]
    ErrHeaderSizeInsufficientForExtension,
    #[error("unsupported RTP version {0}")]
    ErrBadVersion(u8),
    #[error("payload type {0} must be in range [0-127]")]
    ErrInvalidPayloadType(u8),
    #[error("too many contributing sources, at most 15")]
    ErrTooManyCsrcs,
    #[error("invalid padding length")]
    ErrInvalidPadding,
    #[error("extension_payload must be in 32-bit words")]
    HeaderExtensionPayloadNot32BitWords,
    #[error("extension_payload too long for the 16-bit length field")]
    ErrHeaderExtensionTooLong,
    #[error("{0}")]
    Util(util::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Reports whether the error describes bytes that are not a well formed
    /// RTP packet, as opposed to a packet built with invalid arguments.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::ErrHeaderSizeInsufficient
                | Error::ErrHeaderSizeInsufficientForExtension
                | Error::ErrBadVersion(_)
                | Error::ErrInvalidPadding
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
