use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A read or write asked for more bytes than the cursor holds.
    #[error("out of bounds: needed {needed} bytes, {remaining} remaining")]
    OutOfBounds { needed: usize, remaining: usize },
    #[error("marshal_to output size {got}, but expect {want}")]
    MarshalSizeMismatch { got: usize, want: usize },
    #[error("{0}")]
    Std(#[source] StdError),
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn from_std<T>(error: T) -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        Error::Std(StdError(Box::new(error)))
    }

    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        if let Error::Std(s) = self {
            return s.0.downcast_ref();
        }

        None
    }

    /// Takes the boxed error back out when it is a `T`.
    pub fn downcast<T: std::error::Error + 'static>(self) -> std::result::Result<T, Self> {
        match self {
            Error::Std(StdError(b)) => match b.downcast::<T>() {
                Ok(e) => Ok(*e),
                Err(b) => Err(Error::Std(StdError(b))),
            },
            e => Err(e),
        }
    }
}

/// An escape hatch to preserve the concrete error of a protocol crate.
///
/// The marshal traits in this crate produce `util::Error`, but the codecs
/// living in the `rtp` and `rtcp` crates fail with their own error types.
/// `util::Error::from_std` boxes those so they survive the trait boundary
/// and can be recovered with `downcast_ref`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StdError(pub Box<dyn std::error::Error + Send + Sync>);

impl PartialEq for StdError {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}
