use std::time::UNIX_EPOCH;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rtcp::application_defined::ApplicationDefined;

use super::*;
use crate::clock::MockClock;
use crate::config::SessionConfigBuilder;
use crate::members::{Activity, PrunePolicy};
use crate::transport::RecordingTransport;

const LOCAL_SSRC: u32 = 0x1111;
const REMOTE_SSRC: u32 = 0xbeef;

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_session(clock: &Arc<MockClock>) -> Session<RecordingTransport> {
    init_log();
    let config = SessionConfigBuilder::new()
        .with_ssrc(LOCAL_SSRC)
        .with_cname("local@example.com")
        .build()
        .expect("valid config");

    Session::new(config, RecordingTransport::new(), clock.clone())
        .expect("session")
        .with_rng(StdRng::seed_from_u64(1))
        .with_sequencer(Sequencer::new_fixed(100))
}

fn new_clock() -> Arc<MockClock> {
    Arc::new(MockClock::new(UNIX_EPOCH + Duration::from_secs(1_600_000_000)))
}

fn remote_rtp(ssrc: u32, seq: u16, timestamp: u32) -> Bytes {
    let mut packet = rtp::packet::Packet::new(0).expect("packet");
    packet.header.ssrc = ssrc;
    packet.header.sequence_number = seq;
    packet.header.timestamp = timestamp;
    packet.set_payload(Bytes::from_static(&[0u8; 160]));
    packet.marshal().expect("marshal")
}

fn last_compound(session: &mut Session<RecordingTransport>) -> CompoundPacket {
    let mut sent = session.transport_mut().take_rtcp();
    let mut raw = sent.pop().expect("a control packet was sent");
    CompoundPacket::unmarshal(&mut raw).expect("valid compound")
}

fn assert_in_interval(session: &Session<RecordingTransport>, delay: Duration) {
    let t = deterministic_interval(&session.interval_params());
    assert!(
        delay >= t.mul_f64(0.5) && delay <= t.mul_f64(1.5),
        "delay {delay:?} outside [{:?}, {:?}]",
        t.mul_f64(0.5),
        t.mul_f64(1.5)
    );
}

#[test]
fn test_session_initial_report() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    assert!(session.is_initial());
    assert_eq!(session.members(), 1);
    assert_eq!(session.senders(), 0);
    assert!(session.avg_rtcp_size() > 0.0);

    let delay = session.on_report_timer().expect("report");
    assert!(!session.is_initial());
    assert_in_interval(&session, delay);

    let compound = last_compound(&mut session);
    assert_eq!(
        compound.0[0],
        Packet::ReceiverReport(ReceiverReport {
            ssrc: LOCAL_SSRC,
            ..Default::default()
        })
    );
    assert_eq!(
        compound.cname().expect("cname"),
        Bytes::from_static(b"local@example.com")
    );
}

#[test]
fn test_session_send_media() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    let n = session
        .send_media(96, 1000, true, Bytes::from_static(&[0xaa; 10]))
        .expect("send");
    assert_eq!(n, 22);
    session
        .send_media(96, 1160, false, Bytes::from_static(&[0xbb; 10]))
        .expect("send");

    let mut sent = session.transport_mut().take_rtp();
    assert_eq!(sent.len(), 2);

    let first = rtp::packet::Packet::unmarshal(&mut sent[0]).expect("decode");
    assert_eq!(first.header.payload_type, 96);
    assert_eq!(first.header.ssrc, LOCAL_SSRC);
    assert_eq!(first.header.sequence_number, 100);
    assert!(first.header.marker);
    assert_eq!(first.payload.len(), 10);

    let second = rtp::packet::Packet::unmarshal(&mut sent[1]).expect("decode");
    assert_eq!(second.header.sequence_number, 101);
    assert_eq!(second.header.timestamp, 1160);

    assert!(session.we_sent());
    assert_eq!(session.senders(), 1);
}

#[test]
fn test_session_send_media_invalid_payload_type() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    let result = session.send_media(128, 0, false, Bytes::new());
    assert_eq!(
        result,
        Err(Error::Rtp(rtp::Error::ErrInvalidPayloadType(128)))
    );
    assert!(session.transport().rtp.is_empty());
    assert!(!session.we_sent());
}

#[test]
fn test_session_sender_report_cycle() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    session
        .send_media(0, 8000, false, Bytes::from_static(&[0u8; 160]))
        .expect("send");

    session.on_report_timer().expect("report");
    let compound = last_compound(&mut session);
    match &compound.0[0] {
        Packet::SenderReport(sr) => {
            assert_eq!(sr.ssrc, LOCAL_SSRC);
            assert_eq!(sr.packet_count, 1);
            assert_eq!(sr.octet_count, 160);
            assert_eq!(sr.rtp_time, 8000);
            assert_eq!(sr.ntp_system_time(), clock.now());
        }
        other => panic!("expected a sender report, got {other}"),
    }

    // media from the interval before still counts
    session.on_report_timer().expect("report");
    let compound = last_compound(&mut session);
    assert_eq!(compound.0[0].packet_type(), rtcp::header::PacketType::SenderReport);

    // two quiet intervals turn us into a receiver
    session.on_report_timer().expect("report");
    let compound = last_compound(&mut session);
    assert_eq!(compound.0[0].packet_type(), rtcp::header::PacketType::ReceiverReport);
    assert!(!session.we_sent());
}

struct AlwaysReceiver;

impl ReportPolicy for AlwaysReceiver {
    fn report_kind(&self, _: bool) -> ReportKind {
        ReportKind::Receiver
    }
}

#[test]
fn test_session_custom_report_policy() {
    let clock = new_clock();
    let mut session = new_session(&clock).with_report_policy(Box::new(AlwaysReceiver));

    session
        .send_media(0, 0, false, Bytes::from_static(&[0u8; 4]))
        .expect("send");
    session.on_report_timer().expect("report");

    let compound = last_compound(&mut session);
    assert_eq!(compound.0[0].packet_type(), rtcp::header::PacketType::ReceiverReport);
}

#[test]
fn test_session_reception_report() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    // 100 expected, 90 received
    for seq in (0..100u16).filter(|s| !(10..20).contains(s)) {
        session
            .handle_rtp(&remote_rtp(REMOTE_SSRC, seq, seq as u32 * 160))
            .expect("rtp");
        clock.advance(Duration::from_millis(20));
    }

    assert_eq!(session.members(), 2);
    let source = session.source(REMOTE_SSRC).expect("tracked");
    assert_eq!(source.received(), 90);
    assert_eq!(source.expected(), 100);

    session.on_report_timer().expect("report");
    let compound = last_compound(&mut session);
    let reports = match &compound.0[0] {
        Packet::ReceiverReport(rr) => rr.reports.clone(),
        other => panic!("expected a receiver report, got {other}"),
    };

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].ssrc, REMOTE_SSRC);
    assert_eq!(reports[0].fraction_lost, 25);
    assert_eq!(reports[0].total_lost, 10);
    assert_eq!(reports[0].last_sequence_number, 99);
    assert_eq!(reports[0].last_sender_report, 0);
    assert_eq!(reports[0].delay, 0);
}

#[test]
fn test_session_last_sender_report() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    let sr = SenderReport {
        ssrc: REMOTE_SSRC,
        ntp_time: 0x1234_5678_9abc_def0,
        ..Default::default()
    };
    let raw = rtcp::packet::marshal(&[
        Packet::SenderReport(sr),
        Packet::SourceDescription(SourceDescription::with_cname(
            REMOTE_SSRC,
            Bytes::from_static(b"remote"),
        )),
    ])
    .expect("marshal");
    session.handle_rtcp(&raw).expect("rtcp");

    let source = session.source(REMOTE_SSRC).expect("tracked from RTCP");
    assert_eq!(source.last_sender_report(), 0x5678_9abc);
    assert_eq!(source.cname(), Some(&Bytes::from_static(b"remote")));
    assert_eq!(source.last_rtcp(), Some(clock.now()));
    assert_eq!(source.last_rtp(), None);

    session
        .handle_rtp(&remote_rtp(REMOTE_SSRC, 1, 0))
        .expect("rtp");
    clock.advance(Duration::from_secs(2));
    session.on_report_timer().expect("report");

    let compound = last_compound(&mut session);
    let dest = compound.destination_ssrc();
    assert_eq!(dest, vec![REMOTE_SSRC]);
    match &compound.0[0] {
        Packet::ReceiverReport(rr) => {
            assert_eq!(rr.reports[0].last_sender_report, 0x5678_9abc);
            assert_eq!(rr.reports[0].delay, 2 * 65536);
        }
        other => panic!("expected a receiver report, got {other}"),
    }
}

#[test]
fn test_session_goodbye_removes_source() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    session
        .handle_rtp(&remote_rtp(REMOTE_SSRC, 1, 0))
        .expect("rtp");
    session.handle_rtp(&remote_rtp(0xcafe, 1, 0)).expect("rtp");
    assert_eq!(session.members(), 3);

    let raw = rtcp::packet::marshal(&[
        Packet::ReceiverReport(ReceiverReport {
            ssrc: REMOTE_SSRC,
            ..Default::default()
        }),
        Packet::SourceDescription(SourceDescription::with_cname(
            REMOTE_SSRC,
            Bytes::from_static(b"remote"),
        )),
        Packet::Goodbye(Goodbye {
            sources: vec![REMOTE_SSRC],
            reason: Bytes::from_static(b"done"),
        }),
    ])
    .expect("marshal");
    session.handle_rtcp(&raw).expect("rtcp");

    assert!(session.source(REMOTE_SSRC).is_none());
    assert!(session.source(0xcafe).is_some());
    assert_eq!(session.members(), 2);
}

#[test]
fn test_session_ignores_unknown_and_own_packets() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    session
        .handle_rtp(&remote_rtp(LOCAL_SSRC, 1, 0))
        .expect("own packet is not an error");

    let raw = rtcp::packet::marshal(&[
        Packet::ReceiverReport(ReceiverReport {
            ssrc: LOCAL_SSRC,
            ..Default::default()
        }),
        Packet::ApplicationDefined(ApplicationDefined {
            sub_type: 3,
            ssrc: REMOTE_SSRC,
            name: *b"TEST",
            data: Bytes::new(),
        }),
        Packet::Raw(rtcp::raw_packet::RawPacket {
            header: rtcp::header::Header {
                packet_type: rtcp::header::PacketType::Unsupported(207),
                ..Default::default()
            },
            body: Bytes::from_static(&[1, 2, 3, 4]),
        }),
    ])
    .expect("marshal");
    session.handle_rtcp(&raw).expect("rtcp");

    assert_eq!(session.members(), 2);
    assert!(session.source(LOCAL_SSRC).is_none());
    assert!(session.source(REMOTE_SSRC).is_some());
}

#[test]
fn test_session_malformed_packets() {
    let clock = new_clock();
    let mut session = new_session(&clock);
    let avg = session.avg_rtcp_size();

    let tests: Vec<(&str, bool, &[u8])> = vec![
        ("rtp too short", true, &[0x80, 0x60, 0x00]),
        (
            "rtp bad version",
            true,
            &[0x40, 0x60, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 1],
        ),
        ("rtcp empty", false, &[]),
        ("rtcp length past end", false, &[0x81, 0xcb, 0x00, 0x64]),
        ("rtcp bad version", false, &[0x40, 0xc9, 0x00, 0x00]),
    ];

    for (name, is_rtp, raw) in tests {
        let result = if is_rtp {
            session.handle_rtp(raw)
        } else {
            session.handle_rtcp(raw)
        };
        match result {
            Err(err) => assert!(err.is_malformed(), "{name}: {err} should be malformed"),
            Ok(()) => panic!("{name}: want error"),
        }
    }

    assert_eq!(session.members(), 1);
    assert_eq!(session.avg_rtcp_size(), avg);
}

#[test]
fn test_session_prune() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    session
        .handle_rtp(&remote_rtp(REMOTE_SSRC, 1, 0))
        .expect("rtp");
    let raw = rtcp::packet::marshal(&[Packet::ReceiverReport(ReceiverReport {
        ssrc: 0xcafe,
        ..Default::default()
    })])
    .expect("marshal");
    session.handle_rtcp(&raw).expect("rtcp");

    // senders are only counted by a prune
    assert_eq!(session.senders(), 0);

    clock.advance(Duration::from_secs(1));
    let delay = session.on_prune_timer();
    assert_in_interval(&session, delay);
    assert_eq!(session.members(), 3);
    assert_eq!(session.senders(), 1);

    // well past five intervals of silence
    clock.advance(Duration::from_secs(600));
    session.on_prune_timer();
    assert_eq!(session.members(), 1);
    assert_eq!(session.senders(), 0);
}

struct NeverExpire;

impl PrunePolicy for NeverExpire {
    fn classify(&self, _: &Source, _: SystemTime, _: Duration) -> Activity {
        Activity::Member
    }
}

#[test]
fn test_session_custom_prune_policy() {
    let clock = new_clock();
    let mut session = new_session(&clock).with_prune_policy(Box::new(NeverExpire));

    session
        .handle_rtp(&remote_rtp(REMOTE_SSRC, 1, 0))
        .expect("rtp");
    clock.advance(Duration::from_secs(3600));
    session.on_prune_timer();

    assert_eq!(session.members(), 2);
    assert_eq!(session.senders(), 0);
}

#[test]
fn test_session_many_sources() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    for ssrc in 1..=40u32 {
        session.handle_rtp(&remote_rtp(ssrc, 0, 0)).expect("rtp");
    }

    session.on_report_timer().expect("report");
    let compound = last_compound(&mut session);

    let counts: Vec<usize> = compound
        .0
        .iter()
        .filter_map(|p| match p {
            Packet::ReceiverReport(rr) => Some(rr.reports.len()),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![31, 9]);

    let mut reported: Vec<u32> = compound
        .0
        .iter()
        .flat_map(|p| p.destination_ssrc())
        .filter(|ssrc| *ssrc != LOCAL_SSRC)
        .collect();
    reported.sort_unstable();
    assert_eq!(reported, (1..=40).collect::<Vec<u32>>());
}

#[test]
fn test_session_leave() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    session.leave("shutting down").expect("leave");
    assert!(session.is_closed());

    let compound = last_compound(&mut session);
    match compound.0.last() {
        Some(Packet::Goodbye(bye)) => {
            assert_eq!(bye.sources, vec![LOCAL_SSRC]);
            assert_eq!(bye.reason, Bytes::from_static(b"shutting down"));
        }
        other => panic!("expected a goodbye, got {other:?}"),
    }

    assert_eq!(session.leave("again"), Err(Error::ErrSessionClosed));
    assert_eq!(
        session.send_media(0, 0, false, Bytes::new()),
        Err(Error::ErrSessionClosed)
    );
    assert_eq!(session.on_report_timer(), Err(Error::ErrSessionClosed));
}

#[test]
fn test_session_sdes_name() {
    let clock = new_clock();
    let config = SessionConfigBuilder::new()
        .with_ssrc(LOCAL_SSRC)
        .with_name("Alice")
        .build()
        .expect("valid config");
    let mut session = Session::new(config, RecordingTransport::new(), clock)
        .expect("session");

    session.on_report_timer().expect("report");
    let compound = last_compound(&mut session);

    assert_eq!(
        compound.cname().expect("cname"),
        Bytes::from_static(b"rtpsession-00001111")
    );
    match &compound.0[1] {
        Packet::SourceDescription(sdes) => {
            assert_eq!(
                sdes.chunks[0].item(SdesType::SdesName),
                Some(&Bytes::from_static(b"Alice"))
            );
        }
        other => panic!("expected a source description, got {other}"),
    }
}

#[test]
fn test_session_rejects_long_name() {
    let clock = new_clock();
    let config = SessionConfig {
        ssrc: Some(LOCAL_SSRC),
        name: Some("n".repeat(300)),
        ..Default::default()
    };

    let got = Session::new(config, RecordingTransport::new(), clock);
    assert!(
        matches!(got, Err(Error::ErrInvalidName)),
        "a name that does not fit an SDES item must be refused"
    );
}

#[test]
fn test_session_report_skips_control_only_sources() {
    let clock = new_clock();
    let mut session = new_session(&clock);

    let raw = rtcp::packet::marshal(&[Packet::ReceiverReport(ReceiverReport {
        ssrc: 0xcafe,
        ..Default::default()
    })])
    .expect("marshal");
    session.handle_rtcp(&raw).expect("rtcp");
    session
        .handle_rtp(&remote_rtp(REMOTE_SSRC, 1, 0))
        .expect("rtp");
    assert_eq!(session.members(), 3);

    session.on_report_timer().expect("report");
    let compound = last_compound(&mut session);

    assert_eq!(compound.destination_ssrc(), vec![REMOTE_SSRC]);
}
