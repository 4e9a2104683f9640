
use std::collections::VecDeque;
use std::time::Duration;

use log::trace;
use rand::Rng;

/// Minimum time between two RTCP reports of the same participant.
pub const RTCP_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// `e - 3/2`. Dividing by it undoes the bias of timer reconsideration,
/// which otherwise makes the randomized interval come out too long on average.
pub const COMPENSATION: f64 = std::f64::consts::E - 1.5;

/// Fraction of the RTCP bandwidth reserved for senders when they are a
/// minority of the session.
pub const SENDER_BANDWIDTH_FRACTION: f64 = 0.25;

const SIZE_HISTORY: usize = 16;
const MAX_INTERVAL_SECS: f64 = u32::MAX as f64;

/// Inputs of the RTCP interval computation of RFC 3550 section 6.3.1.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IntervalParams {
    /// Session members, ourselves included.
    pub members: usize,
    /// Members that sent media recently, ourselves included.
    pub senders: usize,
    /// Bandwidth available to RTCP in octets per second.
    pub rtcp_bandwidth: f64,
    /// Average size of a compound RTCP packet in octets, transport overhead included.
    pub avg_rtcp_size: f64,
    pub we_sent: bool,
    /// True until we have sent our first report.
    pub initial: bool,
}

/// deterministic_interval is the report interval before randomization: the
/// bandwidth share divided by [`COMPENSATION`], floored at the minimum.
/// [`rtcp_interval`] returns a value within half of it either way.
pub fn deterministic_interval(params: &IntervalParams) -> Duration {
    let min_interval = if params.initial {
        RTCP_MIN_INTERVAL / 2
    } else {
        RTCP_MIN_INTERVAL
    };

    let mut n = params.members;
    let mut rtcp_bw = params.rtcp_bandwidth;

    // Senders get a quarter of the bandwidth when they are at most a quarter
    // of the members, so their reports are not starved by a large audience.
    if params.senders as f64 <= params.members as f64 * SENDER_BANDWIDTH_FRACTION {
        if params.we_sent {
            rtcp_bw *= SENDER_BANDWIDTH_FRACTION;
            n = params.senders;
        } else {
            rtcp_bw *= 1.0 - SENDER_BANDWIDTH_FRACTION;
            n = params.members.saturating_sub(params.senders);
        }
    }

    let secs = if rtcp_bw > 0.0 && rtcp_bw.is_finite() {
        params.avg_rtcp_size * n.max(1) as f64 / rtcp_bw / COMPENSATION
    } else {
        0.0
    };

    trace!(
        "rtcp interval: members {} senders {} n {n} bandwidth {rtcp_bw} avg size {} initial {}",
        params.members,
        params.senders,
        params.avg_rtcp_size,
        params.initial
    );

    // The floor applies after compensation, so a randomized report never
    // comes sooner than half the minimum interval.
    if secs.is_finite() && secs > min_interval.as_secs_f64() {
        Duration::from_secs_f64(secs.min(MAX_INTERVAL_SECS))
    } else {
        min_interval
    }
}

/// rtcp_interval returns the delay until the next RTCP report: the
/// deterministic interval scaled by a factor drawn uniformly from [0.5, 1.5).
///
/// It keeps no state, so callers recompute it every cycle as membership and
/// packet sizes drift.
pub fn rtcp_interval<R: Rng + ?Sized>(params: &IntervalParams, rng: &mut R) -> Duration {
    let t = deterministic_interval(params);
    let factor = rng.gen::<f64>() + 0.5;
    t.mul_f64(factor)
}

/// RtcpSizeEstimator tracks the average size of the last 16 compound RTCP
/// packets sent or received, each counted with the lower layer overhead.
#[derive(Debug, Clone)]
pub struct RtcpSizeEstimator {
    overhead: usize,
    sizes: VecDeque<usize>,
    total: usize,
}

impl RtcpSizeEstimator {
    pub fn new(overhead: usize) -> Self {
        RtcpSizeEstimator {
            overhead,
            sizes: VecDeque::with_capacity(SIZE_HISTORY),
            total: 0,
        }
    }

    /// record adds one packet of `size` octets, as seen on the RTCP layer.
    pub fn record(&mut self, size: usize) {
        let size = size + self.overhead;
        if self.sizes.len() == SIZE_HISTORY {
            if let Some(oldest) = self.sizes.pop_front() {
                self.total -= oldest;
            }
        }
        self.sizes.push_back(size);
        self.total += size;
    }

    /// Average size in octets, 0 before anything was recorded.
    pub fn average(&self) -> f64 {
        if self.sizes.is_empty() {
            0.0
        } else {
            self.total as f64 / self.sizes.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}
