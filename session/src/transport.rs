use bytes::Bytes;

use crate::error::Result;

/// Transport carries encoded packets to the network. It is the only way a
/// session reaches the outside world; implementations own the sockets.
pub trait Transport {
    fn send_rtp(&mut self, buf: &[u8]) -> Result<()>;
    fn send_rtcp(&mut self, buf: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_rtp(&mut self, buf: &[u8]) -> Result<()> {
        (**self).send_rtp(buf)
    }

    fn send_rtcp(&mut self, buf: &[u8]) -> Result<()> {
        (**self).send_rtcp(buf)
    }
}

/// RecordingTransport keeps every packet handed to it, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    pub rtp: Vec<Bytes>,
    pub rtcp: Vec<Bytes>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        RecordingTransport::default()
    }

    /// Takes the recorded control packets, leaving the list empty.
    pub fn take_rtcp(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.rtcp)
    }

    pub fn take_rtp(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.rtp)
    }
}

impl Transport for RecordingTransport {
    fn send_rtp(&mut self, buf: &[u8]) -> Result<()> {
        self.rtp.push(Bytes::copy_from_slice(buf));
        Ok(())
    }

    fn send_rtcp(&mut self, buf: &[u8]) -> Result<()> {
        self.rtcp.push(Bytes::copy_from_slice(buf));
        Ok(())
    }
}
