use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::members::TimeoutPrune;

/// Gap, in sequence numbers, beyond which a forward jump is treated as a
/// possible restart of the sender rather than loss (RFC 3550 A.1).
pub const MAX_DROPOUT: u16 = 3000;
/// How far behind the highest sequence number a late packet may arrive and
/// still count as reordered (RFC 3550 A.1).
pub const MAX_MISORDER: u16 = 100;

pub const DEFAULT_CLOCK_RATE: u32 = 8000;
/// bits per second
pub const DEFAULT_SESSION_BANDWIDTH: u32 = 64000;
pub const DEFAULT_RTCP_BANDWIDTH_FRACTION: f64 = 0.05;
/// IPv4 + UDP header octets counted against every control packet.
pub const DEFAULT_TRANSPORT_OVERHEAD: usize = 28;
pub const DEFAULT_TIMEOUT_INTERVALS: u32 = 5;
pub const DEFAULT_SENDER_INTERVALS: u32 = 2;

const SDES_TEXT_MAX_LEN: usize = 255;

pub(crate) fn default_cname(ssrc: u32) -> String {
    format!("rtpsession-{ssrc:08x}")
}

/// Resynchronization thresholds of the sequence number tracker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub max_dropout: u16,
    pub max_misorder: u16,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        SequenceConfig {
            max_dropout: MAX_DROPOUT,
            max_misorder: MAX_MISORDER,
        }
    }
}

/// SessionConfig holds everything a [`crate::session::Session`] needs to know up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Our synchronization source. Picked at random when absent.
    pub ssrc: Option<u32>,
    /// Canonical name sent in every SDES chunk. Derived from the ssrc when empty.
    pub cname: String,
    pub name: Option<String>,
    /// RTP timestamp units per second of the media we receive.
    pub clock_rate: u32,
    /// Session bandwidth in bits per second.
    pub session_bandwidth: u32,
    /// Share of the session bandwidth given to RTCP.
    pub rtcp_bandwidth_fraction: f64,
    pub max_dropout: u16,
    pub max_misorder: u16,
    pub transport_overhead: usize,
    /// Silence, in report intervals, after which a member is dropped.
    pub timeout_intervals: u32,
    /// Recency, in report intervals, of RTP that makes a member a sender.
    pub sender_intervals: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ssrc: None,
            cname: String::new(),
            name: None,
            clock_rate: DEFAULT_CLOCK_RATE,
            session_bandwidth: DEFAULT_SESSION_BANDWIDTH,
            rtcp_bandwidth_fraction: DEFAULT_RTCP_BANDWIDTH_FRACTION,
            max_dropout: MAX_DROPOUT,
            max_misorder: MAX_MISORDER,
            transport_overhead: DEFAULT_TRANSPORT_OVERHEAD,
            timeout_intervals: DEFAULT_TIMEOUT_INTERVALS,
            sender_intervals: DEFAULT_SENDER_INTERVALS,
        }
    }
}

impl SessionConfig {
    /// RTCP bandwidth in octets per second.
    pub fn rtcp_bandwidth(&self) -> f64 {
        self.session_bandwidth as f64 * self.rtcp_bandwidth_fraction / 8.0
    }

    pub fn sequence(&self) -> SequenceConfig {
        SequenceConfig {
            max_dropout: self.max_dropout,
            max_misorder: self.max_misorder,
        }
    }

    pub fn prune_policy(&self) -> TimeoutPrune {
        TimeoutPrune {
            timeout_intervals: self.timeout_intervals,
            sender_intervals: self.sender_intervals,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.clock_rate == 0 {
            return Err(Error::ErrInvalidClockRate);
        }
        if !(self.rtcp_bandwidth_fraction > 0.0 && self.rtcp_bandwidth_fraction <= 1.0) {
            return Err(Error::ErrInvalidBandwidthFraction);
        }
        if self.timeout_intervals <= self.sender_intervals {
            return Err(Error::ErrInvalidTimeoutIntervals);
        }
        if self.cname.len() > SDES_TEXT_MAX_LEN {
            return Err(Error::ErrInvalidCname);
        }
        if matches!(&self.name, Some(name) if name.len() > SDES_TEXT_MAX_LEN) {
            return Err(Error::ErrInvalidName);
        }
        Ok(())
    }
}

/// SessionConfigBuilder assembles a [`SessionConfig`] and checks it on `build`.
#[derive(Default, Debug, Clone)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        SessionConfigBuilder::default()
    }

    /// with_ssrc fixes our synchronization source instead of drawing one.
    pub fn with_ssrc(mut self, ssrc: u32) -> Self {
        self.config.ssrc = Some(ssrc);
        self
    }

    pub fn with_cname(mut self, cname: impl Into<String>) -> Self {
        self.config.cname = cname.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    pub fn with_clock_rate(mut self, clock_rate: u32) -> Self {
        self.config.clock_rate = clock_rate;
        self
    }

    /// with_session_bandwidth sets the session bandwidth in bits per second.
    pub fn with_session_bandwidth(mut self, bandwidth: u32) -> Self {
        self.config.session_bandwidth = bandwidth;
        self
    }

    pub fn with_rtcp_bandwidth_fraction(mut self, fraction: f64) -> Self {
        self.config.rtcp_bandwidth_fraction = fraction;
        self
    }

    pub fn with_sequence(mut self, sequence: SequenceConfig) -> Self {
        self.config.max_dropout = sequence.max_dropout;
        self.config.max_misorder = sequence.max_misorder;
        self
    }

    pub fn with_transport_overhead(mut self, overhead: usize) -> Self {
        self.config.transport_overhead = overhead;
        self
    }

    pub fn with_timeouts(mut self, timeout_intervals: u32, sender_intervals: u32) -> Self {
        self.config.timeout_intervals = timeout_intervals;
        self.config.sender_intervals = sender_intervals;
        self
    }

    /// build resolves the ssrc and cname and validates the result.
    pub fn build(self) -> Result<SessionConfig> {
        let mut config = self.config;
        let ssrc = *config.ssrc.get_or_insert_with(rand::random::<u32>);
        if config.cname.is_empty() {
            config.cname = default_cname(ssrc);
        }
        config.validate()?;
        Ok(config)
    }
}
