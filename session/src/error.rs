use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("clock rate must be greater than zero")]
    ErrInvalidClockRate,
    #[error("rtcp bandwidth fraction must be in range (0, 1]")]
    ErrInvalidBandwidthFraction,
    #[error("timeout must span more intervals than sender detection")]
    ErrInvalidTimeoutIntervals,
    #[error("cname must be between 1 and 255 octets")]
    ErrInvalidCname,
    #[error("name must be at most 255 octets")]
    ErrInvalidName,
    #[error("session has already left")]
    ErrSessionClosed,
    #[error("transport: {0}")]
    ErrTransport(String),

    #[error("{0}")]
    Rtcp(#[from] rtcp::Error),
    #[error("{0}")]
    Rtp(#[from] rtp::Error),
    #[error("{0}")]
    Util(util::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Reports whether the error came from undecodable bytes handed to the
    /// session, which the caller usually logs and drops.
    pub fn is_malformed(&self) -> bool {
        match self {
            Error::Rtcp(e) => e.is_malformed(),
            Error::Rtp(e) => e.is_malformed(),
            Error::Util(util::Error::OutOfBounds { .. }) => true,
            _ => false,
        }
    }
}

impl From<util::Error> for Error {
    fn from(e: util::Error) -> Self {
        let e = match e.downcast::<rtcp::Error>() {
            Ok(e) => return Error::Rtcp(e),
            Err(e) => e,
        };
        match e.downcast::<rtp::Error>() {
            Ok(e) => Error::Rtp(e),
            Err(e) => Error::Util(e),
        }
    }
}
