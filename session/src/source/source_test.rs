use std::time::{Duration, UNIX_EPOCH};

use super::*;

fn new_source() -> Source {
    Source::new(0x902f9e2e, 8000, SequenceConfig::default())
}

#[test]
fn test_source_sequence_wrap() {
    let mut source = new_source();

    let mut wraps = 0;
    let mut last_cycles = source.cycles();
    for seq in (0..=u16::MAX).chain([0, 1]) {
        assert!(source.update_seq(seq), "seq {seq} should be accepted");
        if source.cycles() != last_cycles {
            wraps += 1;
            assert_eq!(seq, 0, "cycles should only change at the wrap");
            last_cycles = source.cycles();
        }
    }

    assert_eq!(wraps, 1);
    assert_eq!(source.cycles(), 1);
    assert_eq!(source.extended_max_seq(), 65537);
    assert_eq!(source.expected(), 65538);
    assert_eq!(source.received(), source.expected());
}

#[test]
fn test_source_not_started() {
    let source = new_source();
    assert_eq!(source.expected(), 0);
    assert_eq!(source.received(), 0);

    let report = source.to_report(UNIX_EPOCH + Duration::from_secs(10));
    assert_eq!(
        report,
        ReceptionReport {
            ssrc: 0x902f9e2e,
            ..Default::default()
        }
    );
}

#[test]
fn test_source_update_seq() {
    let small_dropout = SequenceConfig {
        max_dropout: 10,
        max_misorder: 100,
    };

    let tests = vec![
        (
            "in order",
            SequenceConfig::default(),
            vec![10u16, 11, 12],
            vec![true, true, true],
            10u16,
            12u16,
            3u32,
        ),
        (
            "gap within dropout",
            SequenceConfig::default(),
            vec![10, 11, 2000],
            vec![true, true, true],
            10,
            2000,
            3,
        ),
        (
            "confirmed jump restarts",
            SequenceConfig::default(),
            vec![100, 101, 10000, 10001],
            vec![true, true, false, true],
            10001,
            10001,
            1,
        ),
        (
            "unconfirmed jump is dropped",
            SequenceConfig::default(),
            vec![100, 101, 10000, 102],
            vec![true, true, false, true],
            100,
            102,
            3,
        ),
        (
            "reordered packet",
            SequenceConfig::default(),
            vec![5000, 4950],
            vec![true, true],
            5000,
            5000,
            2,
        ),
        (
            "late beyond misorder",
            SequenceConfig::default(),
            vec![5000, 4000],
            vec![true, false],
            5000,
            5000,
            1,
        ),
        (
            "duplicate",
            SequenceConfig::default(),
            vec![7, 7],
            vec![true, true],
            7,
            7,
            2,
        ),
        (
            "configured dropout",
            small_dropout,
            vec![0, 20],
            vec![true, false],
            0,
            0,
            1,
        ),
    ];

    for (name, config, seqs, want_accepted, want_base, want_max, want_received) in tests {
        let mut source = Source::new(1, 8000, config);
        let accepted: Vec<bool> = seqs.iter().map(|&s| source.update_seq(s)).collect();

        assert_eq!(accepted, want_accepted, "{name}: accepted");
        assert_eq!(source.base_seq(), want_base, "{name}: base_seq");
        assert_eq!(source.max_seq(), want_max, "{name}: max_seq");
        assert_eq!(source.received(), want_received, "{name}: received");
    }
}

#[test]
fn test_source_update_lost() {
    let mut source = new_source();

    // 100 expected, 90 received
    for seq in (0..100u16).filter(|s| !(40..50).contains(s)) {
        source.update_seq(seq);
    }
    assert_eq!(source.expected(), 100);
    assert_eq!(source.received(), 90);

    source.update_lost();
    assert!((source.fraction_lost() - 0.1).abs() < 1e-6);
    assert_eq!(source.total_lost(), 10);

    let report = source.to_report(UNIX_EPOCH);
    assert_eq!(report.fraction_lost, 25);
    assert_eq!(report.total_lost, 10);
    assert_eq!(report.last_sequence_number, 99);

    // next interval has no loss, the cumulative count stays
    for seq in 100..150u16 {
        source.update_seq(seq);
    }
    source.update_lost();
    assert_eq!(source.fraction_lost(), 0.0);
    assert_eq!(source.total_lost(), 10);

    // an interval with no packets at all
    source.update_lost();
    assert_eq!(source.fraction_lost(), 0.0);
}

#[test]
fn test_source_update_lost_duplicates() {
    let mut source = new_source();
    for seq in [0u16, 1, 1, 2, 2, 3] {
        source.update_seq(seq);
    }

    assert_eq!(source.expected(), 4);
    assert_eq!(source.received(), 6);

    source.update_lost();
    assert_eq!(source.fraction_lost(), 0.0);
    assert_eq!(source.total_lost(), 0);
}

#[test]
fn test_source_jitter() {
    let mut source = new_source();
    let start = UNIX_EPOCH + Duration::from_secs(1_000);

    // 20ms frames at 8kHz, perfectly paced
    for i in 0..10u32 {
        source.update_jitter(start + Duration::from_millis(20 * i as u64), 160 * i);
    }
    assert!(source.jitter().abs() < 1e-9, "jitter = {}", source.jitter());

    // one frame 10ms late is 80 timestamp units of transit difference
    source.update_jitter(start + Duration::from_millis(20 * 10 + 10), 160 * 10);
    assert!(
        (source.jitter() - 5.0).abs() < 1e-6,
        "jitter = {}",
        source.jitter()
    );

    let report = source.to_report(start);
    assert_eq!(report.jitter, 5);
}

#[test]
fn test_source_jitter_timestamp_wrap() {
    let mut source = new_source();
    let start = UNIX_EPOCH + Duration::from_secs(1_000);

    source.update_jitter(start, u32::MAX - 79);
    source.update_jitter(start + Duration::from_millis(20), 80);
    assert!(source.jitter().abs() < 1e-6, "jitter = {}", source.jitter());
}

#[test]
fn test_source_lsr() {
    let mut source = new_source();
    let arrival = UNIX_EPOCH + Duration::from_secs(2_000);

    assert_eq!(source.delay_since_last_sender_report(arrival), 0);

    source.update_lsr(0x12345678, 0x9abcdef0, arrival);
    assert_eq!(source.last_sender_report(), 0x56789abc);

    let report = source.to_report(arrival + Duration::from_millis(1500));
    assert_eq!(report.last_sender_report, 0x56789abc);
    assert_eq!(report.delay, 98304);

    // a clock that went backwards reports no delay
    assert_eq!(
        source.delay_since_last_sender_report(arrival - Duration::from_secs(1)),
        0
    );
}

#[test]
fn test_source_activity() {
    let mut source = new_source();
    assert_eq!(source.last_rtp(), None);
    assert_eq!(source.last_rtcp(), None);

    let now = UNIX_EPOCH + Duration::from_secs(5);
    source.mark_rtp(now);
    source.mark_rtcp(now + Duration::from_secs(1));
    source.set_cname(Bytes::from_static(b"peer"));

    assert_eq!(source.last_rtp(), Some(now));
    assert_eq!(source.last_rtcp(), Some(now + Duration::from_secs(1)));
    assert_eq!(source.cname(), Some(&Bytes::from_static(b"peer")));
}
