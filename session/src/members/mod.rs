#[cfg(test)]
mod members_test;

use std::collections::hash_map::{Entry, Iter, IterMut};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use log::debug;

use crate::config::{SequenceConfig, DEFAULT_SENDER_INTERVALS, DEFAULT_TIMEOUT_INTERVALS};
use crate::source::Source;

/// Origin tells which kind of traffic introduced a source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Origin {
    Rtp,
    Rtcp,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Rtp => "RTP",
            Origin::Rtcp => "RTCP",
        };
        write!(f, "{s}")
    }
}

/// Activity is the verdict of a [`PrunePolicy`] on one source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Activity {
    /// Silent for too long, remove it.
    Expired,
    /// Sent media recently.
    Sender,
    /// Still around, but not sending media.
    Member,
}

/// PrunePolicy decides, once per prune cycle, what each source is.
pub trait PrunePolicy {
    fn classify(&self, source: &Source, now: SystemTime, interval: Duration) -> Activity;
}

/// TimeoutPrune expires a source that sent neither RTP nor RTCP for
/// `timeout_intervals` report intervals, and counts it as a sender when it
/// sent RTP within the last `sender_intervals`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeoutPrune {
    pub timeout_intervals: u32,
    pub sender_intervals: u32,
}

impl Default for TimeoutPrune {
    fn default() -> Self {
        TimeoutPrune {
            timeout_intervals: DEFAULT_TIMEOUT_INTERVALS,
            sender_intervals: DEFAULT_SENDER_INTERVALS,
        }
    }
}

fn elapsed_since(now: SystemTime, then: Option<SystemTime>) -> Option<Duration> {
    // a timestamp from the future counts as just now
    then.map(|t| now.duration_since(t).unwrap_or_default())
}

impl PrunePolicy for TimeoutPrune {
    fn classify(&self, source: &Source, now: SystemTime, interval: Duration) -> Activity {
        let timeout = interval * self.timeout_intervals;
        let sender_window = interval * self.sender_intervals;

        let last_rtp = elapsed_since(now, source.last_rtp());
        let last_rtcp = elapsed_since(now, source.last_rtcp());

        let rtp_silent = last_rtp.map_or(true, |d| d > timeout);
        let rtcp_silent = last_rtcp.map_or(true, |d| d > timeout);

        if rtp_silent && rtcp_silent {
            Activity::Expired
        } else if last_rtp.map_or(false, |d| d < sender_window) {
            Activity::Sender
        } else {
            Activity::Member
        }
    }
}

/// SessionMembers is the table of remote sources of a session.
///
/// The local participant is not part of it; the session adds itself when
/// reporting counts.
#[derive(Debug)]
pub struct SessionMembers {
    clock_rate: u32,
    sequence: SequenceConfig,
    sources: HashMap<u32, Source>,
    senders: usize,
}

impl SessionMembers {
    pub fn new(clock_rate: u32, sequence: SequenceConfig) -> Self {
        SessionMembers {
            clock_rate,
            sequence,
            sources: HashMap::new(),
            senders: 0,
        }
    }

    /// get_or_insert returns the source for `ssrc`, creating it on first contact.
    pub fn get_or_insert(&mut self, ssrc: u32, origin: Origin) -> &mut Source {
        match self.sources.entry(ssrc) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                debug!("new source with ssrc {ssrc:x} ({origin})");
                e.insert(Source::new(ssrc, self.clock_rate, self.sequence))
            }
        }
    }

    pub fn get(&self, ssrc: u32) -> Option<&Source> {
        self.sources.get(&ssrc)
    }

    pub fn get_mut(&mut self, ssrc: u32) -> Option<&mut Source> {
        self.sources.get_mut(&ssrc)
    }

    pub fn contains(&self, ssrc: u32) -> bool {
        self.sources.contains_key(&ssrc)
    }

    pub fn remove(&mut self, ssrc: u32) -> Option<Source> {
        self.sources.remove(&ssrc)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, u32, Source> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, u32, Source> {
        self.sources.iter_mut()
    }

    /// Remote sources counted as senders by the last prune.
    pub fn senders(&self) -> usize {
        self.senders.min(self.sources.len())
    }

    /// prune removes expired sources and recounts the senders. It returns
    /// the ssrcs it removed.
    pub fn prune<P: PrunePolicy + ?Sized>(
        &mut self,
        policy: &P,
        now: SystemTime,
        interval: Duration,
    ) -> Vec<u32> {
        let mut expired = vec![];
        let mut senders = 0;

        for (ssrc, source) in &self.sources {
            match policy.classify(source, now, interval) {
                Activity::Expired => expired.push(*ssrc),
                Activity::Sender => senders += 1,
                Activity::Member => {}
            }
        }

        for ssrc in &expired {
            debug!("source {ssrc:x} timed out");
            self.sources.remove(ssrc);
        }
        self.senders = senders;

        expired
    }
}
