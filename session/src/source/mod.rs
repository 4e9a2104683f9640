#[cfg(test)]
mod source_test;

use std::fmt;
use std::time::SystemTime;

use bytes::Bytes;
use rtcp::reception_report::{ReceptionReport, MAX_TOTAL_LOST};

use crate::config::SequenceConfig;

const RTP_SEQ_MOD: u32 = 1 << 16;

/// Source is the reception state kept for one remote synchronization source.
///
/// Sequence bookkeeping follows RFC 3550 appendix A.1 and A.3, jitter
/// follows section 6.4.1. A source starts out uninitialized and becomes
/// active with the first media packet it is fed; it is never closed, the
/// member table simply drops it.
#[derive(Debug, Clone)]
pub struct Source {
    ssrc: u32,
    clock_rate: f64,
    config: SequenceConfig,

    started: bool,
    max_seq: u16,
    cycles: u32,
    base_seq: u32,
    // RTP_SEQ_MOD + 1 when no jump is pending confirmation
    bad_seq: u32,
    received: u32,
    expected_prior: u32,
    received_prior: u32,

    fraction_lost: f32,
    total_lost: i32,

    jitter: f64,
    last_arrival: Option<SystemTime>,
    last_rtp_timestamp: u32,

    last_sender_report: u32,
    last_sender_report_arrival: Option<SystemTime>,

    last_rtp: Option<SystemTime>,
    last_rtcp: Option<SystemTime>,
    cname: Option<Bytes>,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Source {:x}: max_seq {} cycles {} received {} expected {} jitter {:.2}",
            self.ssrc,
            self.max_seq,
            self.cycles,
            self.received,
            self.expected(),
            self.jitter
        )
    }
}

impl Source {
    pub fn new(ssrc: u32, clock_rate: u32, config: SequenceConfig) -> Self {
        Source {
            ssrc,
            clock_rate: clock_rate as f64,
            config,

            started: false,
            max_seq: 0,
            cycles: 0,
            base_seq: 0,
            bad_seq: RTP_SEQ_MOD + 1,
            received: 0,
            expected_prior: 0,
            received_prior: 0,

            fraction_lost: 0.0,
            total_lost: 0,

            jitter: 0.0,
            last_arrival: None,
            last_rtp_timestamp: 0,

            last_sender_report: 0,
            last_sender_report_arrival: None,

            last_rtp: None,
            last_rtcp: None,
            cname: None,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    fn init_seq(&mut self, seq: u16) {
        self.base_seq = seq as u32;
        self.max_seq = seq;
        self.bad_seq = RTP_SEQ_MOD + 1;
        self.cycles = 0;
        self.received = 0;
        self.received_prior = 0;
        self.expected_prior = 0;
    }

    /// update_seq feeds the sequence number of a media packet and returns
    /// whether the packet was counted.
    ///
    /// The first packet is always accepted. A jump of `max_dropout` or more
    /// (forward) or `max_misorder` or more (backward) is held back until the
    /// next packet confirms it, at which point the sender is assumed to have
    /// restarted and the statistics start over from that packet.
    pub fn update_seq(&mut self, seq: u16) -> bool {
        if !self.started {
            self.started = true;
            self.init_seq(seq);
            self.received = 1;
            return true;
        }

        let udelta = seq.wrapping_sub(self.max_seq);
        if udelta < self.config.max_dropout {
            // in order, with permissible gap
            if seq < self.max_seq {
                self.cycles = self.cycles.wrapping_add(1);
            }
            self.max_seq = seq;
        } else if udelta as u32 <= RTP_SEQ_MOD - self.config.max_misorder as u32 {
            // the sequence number made a very large jump
            if seq as u32 == self.bad_seq {
                // two sequential packets, the other side restarted
                self.init_seq(seq);
            } else {
                self.bad_seq = (seq as u32 + 1) & (RTP_SEQ_MOD - 1);
                return false;
            }
        } else {
            // duplicate or reordered packet
        }

        self.received = self.received.wrapping_add(1);
        true
    }

    /// Number of times the 16-bit sequence number wrapped.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn max_seq(&self) -> u16 {
        self.max_seq
    }

    pub fn base_seq(&self) -> u16 {
        self.base_seq as u16
    }

    /// Cycle count in the high 16 bits, highest sequence number in the low 16.
    pub fn extended_max_seq(&self) -> u32 {
        self.cycles.wrapping_mul(RTP_SEQ_MOD) | self.max_seq as u32
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn expected(&self) -> u32 {
        if !self.started {
            return 0;
        }
        self.extended_max_seq()
            .wrapping_sub(self.base_seq)
            .wrapping_add(1)
    }

    /// update_lost recomputes the loss figures that go into the next
    /// reception report and starts a new reporting interval (RFC 3550 A.3).
    pub fn update_lost(&mut self) {
        let expected = self.expected();

        let expected_interval = expected.wrapping_sub(self.expected_prior);
        self.expected_prior = expected;
        let received_interval = self.received.wrapping_sub(self.received_prior);
        self.received_prior = self.received;

        let lost_interval = expected_interval as i64 - received_interval as i64;
        self.fraction_lost = if expected_interval == 0 || lost_interval <= 0 {
            0.0
        } else {
            lost_interval as f32 / expected_interval as f32
        };

        let lost = expected as i64 - self.received as i64;
        self.total_lost = lost.clamp(0, MAX_TOTAL_LOST as i64) as i32;
    }

    /// Fraction of packets lost during the last completed interval, in [0, 1].
    pub fn fraction_lost(&self) -> f32 {
        self.fraction_lost
    }

    pub fn total_lost(&self) -> i32 {
        self.total_lost
    }

    /// update_jitter folds one media packet into the interarrival jitter
    /// estimate, `J += (|D| - J) / 16`.
    pub fn update_jitter(&mut self, arrival: SystemTime, rtp_timestamp: u32) {
        if let Some(last_arrival) = self.last_arrival {
            let elapsed = match arrival.duration_since(last_arrival) {
                Ok(d) => d.as_secs_f64(),
                Err(e) => -e.duration().as_secs_f64(),
            };
            let d = elapsed * self.clock_rate
                - rtp_timestamp.wrapping_sub(self.last_rtp_timestamp) as i32 as f64;
            self.jitter += (d.abs() - self.jitter) / 16.0;
        }

        self.last_arrival = Some(arrival);
        self.last_rtp_timestamp = rtp_timestamp;
    }

    /// Interarrival jitter in RTP timestamp units.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// update_lsr remembers the middle 32 bits of a received sender report's
    /// NTP timestamp and when it arrived.
    pub fn update_lsr(&mut self, ntp_seconds: u32, ntp_fraction: u32, arrival: SystemTime) {
        self.last_sender_report = (ntp_seconds << 16) | (ntp_fraction >> 16);
        self.last_sender_report_arrival = Some(arrival);
    }

    pub fn last_sender_report(&self) -> u32 {
        self.last_sender_report
    }

    /// Delay since the last sender report in units of 1/65536 seconds, 0
    /// when none has been received.
    pub fn delay_since_last_sender_report(&self, now: SystemTime) -> u32 {
        match self.last_sender_report_arrival {
            Some(arrival) => match now.duration_since(arrival) {
                Ok(d) => (d.as_secs_f64() * 65536.0) as u32,
                Err(_) => 0,
            },
            None => 0,
        }
    }

    /// to_report snapshots the current statistics into a reception report
    /// block. Loss figures are those of the last [`Source::update_lost`].
    pub fn to_report(&self, now: SystemTime) -> ReceptionReport {
        let mut report = ReceptionReport {
            ssrc: self.ssrc,
            total_lost: self.total_lost,
            last_sequence_number: self.extended_max_seq(),
            jitter: self.jitter as u32,
            last_sender_report: self.last_sender_report,
            delay: self.delay_since_last_sender_report(now),
            ..Default::default()
        };
        report.set_fraction(self.fraction_lost);
        report
    }

    pub fn mark_rtp(&mut self, now: SystemTime) {
        self.last_rtp = Some(now);
    }

    pub fn mark_rtcp(&mut self, now: SystemTime) {
        self.last_rtcp = Some(now);
    }

    /// When the last media packet from this source arrived.
    pub fn last_rtp(&self) -> Option<SystemTime> {
        self.last_rtp
    }

    /// When the last control packet from this source arrived.
    pub fn last_rtcp(&self) -> Option<SystemTime> {
        self.last_rtcp
    }

    pub fn cname(&self) -> Option<&Bytes> {
        self.cname.as_ref()
    }

    pub fn set_cname(&mut self, cname: Bytes) {
        self.cname = Some(cname);
    }
}
