#[cfg(test)]
mod session_test;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtcp::compound_packet::CompoundPacket;
use rtcp::goodbye::Goodbye;
use rtcp::header::COUNT_MAX;
use rtcp::packet::Packet;
use rtcp::receiver_report::ReceiverReport;
use rtcp::reception_report::ReceptionReport;
use rtcp::sender_report::SenderReport;
use rtcp::source_description::{SdesType, SourceDescription, SourceDescriptionItem};
use rtp::sequence::Sequencer;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::clock::Clock;
use crate::config::{default_cname, SessionConfig};
use crate::error::{Error, Result};
use crate::interval::{deterministic_interval, rtcp_interval, IntervalParams, RtcpSizeEstimator};
use crate::members::{Origin, PrunePolicy, SessionMembers};
use crate::source::Source;
use crate::transport::Transport;

/// ReportKind is the first packet of an outgoing compound report.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReportKind {
    Sender,
    Receiver,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportKind::Sender => "SR",
            ReportKind::Receiver => "RR",
        };
        write!(f, "{s}")
    }
}

/// ReportPolicy picks the kind of report to send.
pub trait ReportPolicy {
    fn report_kind(&self, we_sent: bool) -> ReportKind;
}

/// SenderAwareReports sends a sender report while we are sending media and
/// a receiver report otherwise.
#[derive(Debug, Default, Copy, Clone)]
pub struct SenderAwareReports;

impl ReportPolicy for SenderAwareReports {
    fn report_kind(&self, we_sent: bool) -> ReportKind {
        if we_sent {
            ReportKind::Sender
        } else {
            ReportKind::Receiver
        }
    }
}

/// Session ties the member table, the report scheduler and a transport
/// together for one RTP session.
///
/// The session owns no timers. The caller invokes [`Session::on_report_timer`]
/// and [`Session::on_prune_timer`] when its own timers fire and rearms them
/// with the returned delays; dropping the session or not rearming stops it.
pub struct Session<T: Transport> {
    config: SessionConfig,
    ssrc: u32,
    cname: Bytes,

    transport: T,
    clock: Arc<dyn Clock + Send + Sync>,
    rng: StdRng,
    report_policy: Box<dyn ReportPolicy + Send + Sync>,
    prune_policy: Box<dyn PrunePolicy + Send + Sync>,

    members: SessionMembers,
    size_estimator: RtcpSizeEstimator,

    sequencer: Sequencer,
    last_rtp_timestamp: u32,
    packet_count: u32,
    octet_count: u32,
    // media sent since the last report, and in the interval before it
    sent_since_report: bool,
    sent_before_report: bool,
    initial: bool,
    closed: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(
        config: SessionConfig,
        transport: T,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self> {
        config.validate()?;

        let ssrc = config.ssrc.unwrap_or_else(rand::random::<u32>);
        let cname = if config.cname.is_empty() {
            default_cname(ssrc)
        } else {
            config.cname.clone()
        };

        let mut session = Session {
            members: SessionMembers::new(config.clock_rate, config.sequence()),
            size_estimator: RtcpSizeEstimator::new(config.transport_overhead),
            prune_policy: Box::new(config.prune_policy()),
            report_policy: Box::new(SenderAwareReports),
            rng: StdRng::from_entropy(),
            config,
            ssrc,
            cname: Bytes::from(cname),

            transport,
            clock,

            sequencer: Sequencer::new_random(),
            last_rtp_timestamp: 0,
            packet_count: 0,
            octet_count: 0,
            sent_since_report: false,
            sent_before_report: false,
            initial: true,
            closed: false,
        };

        // Until something was sent or received, assume our own first report.
        let first_report = CompoundPacket(vec![
            Packet::ReceiverReport(ReceiverReport {
                ssrc,
                ..Default::default()
            }),
            session.description(),
        ]);
        session.size_estimator.record(first_report.marshal_size());

        Ok(session)
    }

    pub fn with_report_policy(mut self, policy: Box<dyn ReportPolicy + Send + Sync>) -> Self {
        self.report_policy = policy;
        self
    }

    pub fn with_prune_policy(mut self, policy: Box<dyn PrunePolicy + Send + Sync>) -> Self {
        self.prune_policy = policy;
        self
    }

    /// with_rng replaces the generator behind the randomized intervals.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// with_sequencer replaces the source of outgoing sequence numbers.
    pub fn with_sequencer(mut self, sequencer: Sequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn cname(&self) -> &Bytes {
        &self.cname
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The remote sources of the session.
    pub fn sources(&self) -> &SessionMembers {
        &self.members
    }

    pub fn source(&self, ssrc: u32) -> Option<&Source> {
        self.members.get(ssrc)
    }

    /// True while no report has been sent yet.
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether we sent media during the current or the previous report interval.
    pub fn we_sent(&self) -> bool {
        self.sent_since_report || self.sent_before_report
    }

    /// Session members, ourselves included.
    pub fn members(&self) -> usize {
        self.members.len() + 1
    }

    /// Active senders, ourselves included while we are sending.
    pub fn senders(&self) -> usize {
        self.members.senders() + usize::from(self.we_sent())
    }

    pub fn avg_rtcp_size(&self) -> f64 {
        self.size_estimator.average()
    }

    pub fn interval_params(&self) -> IntervalParams {
        IntervalParams {
            members: self.members(),
            senders: self.senders(),
            rtcp_bandwidth: self.config.rtcp_bandwidth(),
            avg_rtcp_size: self.size_estimator.average(),
            we_sent: self.we_sent(),
            initial: self.initial,
        }
    }

    /// interval draws a fresh randomized report interval from the current
    /// session state.
    pub fn interval(&mut self) -> Duration {
        let params = self.interval_params();
        rtcp_interval(&params, &mut self.rng)
    }

    /// send_media wraps `payload` in an RTP packet from our ssrc, sends it
    /// and returns its size on the wire.
    pub fn send_media(
        &mut self,
        payload_type: u8,
        timestamp: u32,
        marker: bool,
        payload: Bytes,
    ) -> Result<usize> {
        if self.closed {
            return Err(Error::ErrSessionClosed);
        }

        let mut packet = rtp::packet::Packet::new(payload_type)?;
        packet.header.ssrc = self.ssrc;
        packet.header.sequence_number = self.sequencer.next_sequence_number();
        packet.header.timestamp = timestamp;
        packet.header.marker = marker;
        let payload_len = payload.len();
        packet.set_payload(payload);

        let raw = packet.marshal()?;
        self.transport.send_rtp(&raw)?;

        self.last_rtp_timestamp = timestamp;
        self.packet_count = self.packet_count.wrapping_add(1);
        self.octet_count = self.octet_count.wrapping_add(payload_len as u32);
        self.sent_since_report = true;

        Ok(raw.len())
    }

    /// handle_rtp accounts a received media packet to its source.
    ///
    /// Undecodable packets are logged and returned as errors; the session
    /// state is left untouched.
    pub fn handle_rtp(&mut self, mut buf: &[u8]) -> Result<()> {
        let now = self.clock.now();

        let packet = match rtp::packet::Packet::unmarshal(&mut buf) {
            Ok(packet) => packet,
            Err(err) => {
                let err = Error::from(err);
                warn!("dropping undecodable RTP packet: {err}");
                return Err(err);
            }
        };

        let header = &packet.header;
        if header.ssrc == self.ssrc {
            warn!("RTP packet with our own ssrc {:x} dropped", self.ssrc);
            return Ok(());
        }

        let source = self.members.get_or_insert(header.ssrc, Origin::Rtp);
        if source.update_seq(header.sequence_number) {
            source.update_jitter(now, header.timestamp);
        }
        source.mark_rtp(now);

        Ok(())
    }

    fn remote_source(&mut self, ssrc: u32) -> Option<&mut Source> {
        if ssrc == self.ssrc {
            None
        } else {
            Some(self.members.get_or_insert(ssrc, Origin::Rtcp))
        }
    }

    /// handle_rtcp processes a received compound control packet: sender
    /// reports update the round trip material of their source, every packet
    /// refreshes its sender's activity and a goodbye removes the sources it
    /// names.
    pub fn handle_rtcp(&mut self, buf: &[u8]) -> Result<()> {
        let now = self.clock.now();

        let mut raw = buf;
        let packets = match rtcp::packet::unmarshal(&mut raw) {
            Ok(packets) => packets,
            Err(err) => {
                let err = Error::from(err);
                warn!("dropping undecodable RTCP packet: {err}");
                return Err(err);
            }
        };
        self.size_estimator.record(buf.len());

        for packet in &packets {
            match packet {
                Packet::SenderReport(sr) => {
                    if let Some(source) = self.remote_source(sr.ssrc) {
                        source.update_lsr(sr.ntp_seconds(), sr.ntp_fraction(), now);
                        source.mark_rtcp(now);
                    }
                }
                Packet::ReceiverReport(rr) => {
                    if let Some(source) = self.remote_source(rr.ssrc) {
                        source.mark_rtcp(now);
                    }
                }
                Packet::SourceDescription(sdes) => {
                    for chunk in &sdes.chunks {
                        if let Some(source) = self.remote_source(chunk.source) {
                            if let Some(cname) = chunk.item(SdesType::SdesCname) {
                                source.set_cname(cname.clone());
                            }
                            source.mark_rtcp(now);
                        }
                    }
                }
                Packet::Goodbye(bye) => {
                    for ssrc in &bye.sources {
                        if self.members.remove(*ssrc).is_some() {
                            debug!(
                                "source {ssrc:x} left: {}",
                                String::from_utf8_lossy(&bye.reason)
                            );
                        }
                    }
                }
                Packet::ApplicationDefined(app) => {
                    if let Some(source) = self.remote_source(app.ssrc) {
                        source.mark_rtcp(now);
                    }
                }
                Packet::Raw(raw) => {
                    trace!("ignoring RTCP packet type {}", raw.header.packet_type);
                }
            }
        }

        Ok(())
    }

    /// on_report_timer sends a compound report and returns the delay until
    /// the next one.
    pub fn on_report_timer(&mut self) -> Result<Duration> {
        if self.closed {
            return Err(Error::ErrSessionClosed);
        }

        let now = self.clock.now();
        let (kind, mut packets) = self.report_packets(now);
        packets.push(self.description());

        let size = self.send_compound(CompoundPacket(packets))?;
        trace!("sent {kind} compound of {size} bytes");

        self.initial = false;
        self.sent_before_report = self.sent_since_report;
        self.sent_since_report = false;

        Ok(self.interval())
    }

    /// on_prune_timer drops sources that went silent, recounts the senders
    /// and returns the delay until the next prune.
    pub fn on_prune_timer(&mut self) -> Duration {
        let now = self.clock.now();

        // timeouts are measured in deterministic, non-initial intervals
        let params = IntervalParams {
            initial: false,
            ..self.interval_params()
        };
        let td = deterministic_interval(&params);

        let removed = self.members.prune(self.prune_policy.as_ref(), now, td);
        if !removed.is_empty() {
            debug!(
                "pruned {} sources, {} members {} senders left",
                removed.len(),
                self.members(),
                self.senders()
            );
        }

        self.interval()
    }

    /// leave announces that we are leaving the session with a final report
    /// followed by a goodbye. The session refuses to send afterwards.
    pub fn leave(&mut self, reason: &str) -> Result<()> {
        if self.closed {
            return Err(Error::ErrSessionClosed);
        }

        let now = self.clock.now();
        let (_, mut packets) = self.report_packets(now);
        packets.push(self.description());
        packets.push(Packet::Goodbye(Goodbye {
            sources: vec![self.ssrc],
            reason: Bytes::copy_from_slice(reason.as_bytes()),
        }));

        let size = self.send_compound(CompoundPacket(packets))?;
        trace!("sent BYE compound of {size} bytes");

        self.closed = true;
        Ok(())
    }

    fn send_compound(&mut self, compound: CompoundPacket) -> Result<usize> {
        let raw = compound.marshal()?;
        self.transport.send_rtcp(&raw)?;
        self.size_estimator.record(raw.len());
        Ok(raw.len())
    }

    /// The SR or RR opening a compound report, followed by as many extra
    /// RRs as it takes to carry a block for every source.
    fn report_packets(&mut self, now: SystemTime) -> (ReportKind, Vec<Packet>) {
        let mut blocks: Vec<ReceptionReport> = self
            .members
            .iter_mut()
            // only sources we received media from get a reception report block
            .filter(|(_, source)| source.expected() > 0)
            .map(|(_, source)| {
                source.update_lost();
                source.to_report(now)
            })
            .collect();
        blocks.sort_unstable_by_key(|r| r.ssrc);

        let mut chunks = blocks.chunks(COUNT_MAX);
        let first = chunks.next().map(|c| c.to_vec()).unwrap_or_default();

        let kind = self.report_policy.report_kind(self.we_sent());
        let mut packets = vec![match kind {
            ReportKind::Sender => {
                let mut sr = SenderReport {
                    ssrc: self.ssrc,
                    rtp_time: self.last_rtp_timestamp,
                    packet_count: self.packet_count,
                    octet_count: self.octet_count,
                    reports: first,
                    ..Default::default()
                };
                sr.set_ntp_time(now);
                Packet::SenderReport(sr)
            }
            ReportKind::Receiver => Packet::ReceiverReport(ReceiverReport {
                ssrc: self.ssrc,
                reports: first,
                ..Default::default()
            }),
        }];

        for chunk in chunks {
            packets.push(Packet::ReceiverReport(ReceiverReport {
                ssrc: self.ssrc,
                reports: chunk.to_vec(),
                ..Default::default()
            }));
        }

        (kind, packets)
    }

    fn description(&self) -> Packet {
        let mut sdes = SourceDescription::with_cname(self.ssrc, self.cname.clone());
        if let Some(name) = &self.config.name {
            if let Some(chunk) = sdes.chunks.first_mut() {
                chunk.items.push(SourceDescriptionItem {
                    sdes_type: SdesType::SdesName,
                    text: Bytes::copy_from_slice(name.as_bytes()),
                });
            }
        }
        Packet::SourceDescription(sdes)
    }
}
