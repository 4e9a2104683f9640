use std::time::UNIX_EPOCH;

use super::*;

const INTERVAL: Duration = Duration::from_secs(5);

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_000_000 + secs)
}

fn source(last_rtp: Option<u64>, last_rtcp: Option<u64>) -> Source {
    let mut s = Source::new(1, 8000, SequenceConfig::default());
    if let Some(t) = last_rtp {
        s.mark_rtp(at(t));
    }
    if let Some(t) = last_rtcp {
        s.mark_rtcp(at(t));
    }
    s
}

#[test]
fn test_timeout_prune_classify() {
    let policy = TimeoutPrune::default();
    let now = at(100);

    let tests = vec![
        ("never heard", source(None, None), Activity::Expired),
        ("rtp just now", source(Some(100), None), Activity::Sender),
        ("rtp within two intervals", source(Some(91), None), Activity::Sender),
        ("rtp at two intervals", source(Some(90), Some(95)), Activity::Member),
        ("rtcp only", source(None, Some(99)), Activity::Member),
        ("both silent past timeout", source(Some(74), Some(70)), Activity::Expired),
        ("rtcp keeps it alive", source(Some(10), Some(80)), Activity::Member),
        ("exactly at timeout", source(Some(75), None), Activity::Member),
        ("clock went backwards", source(Some(120), None), Activity::Sender),
    ];

    for (name, s, want) in tests {
        let got = policy.classify(&s, now, INTERVAL);
        assert_eq!(got, want, "{name}: classify = {got:?}, want {want:?}");
    }
}

#[test]
fn test_session_members_get_or_insert() {
    let mut members = SessionMembers::new(8000, SequenceConfig::default());
    assert!(members.is_empty());

    members.get_or_insert(0xa, Origin::Rtp).update_seq(1);
    members.get_or_insert(0xa, Origin::Rtcp).update_seq(2);
    members.get_or_insert(0xb, Origin::Rtcp);

    assert_eq!(members.len(), 2);
    assert!(members.contains(0xb));
    assert_eq!(members.get(0xa).map(|s| s.received()), Some(2));

    assert!(members.remove(0xa).is_some());
    assert!(members.remove(0xa).is_none());
    assert_eq!(members.len(), 1);
}

#[test]
fn test_session_members_prune() {
    let mut members = SessionMembers::new(8000, SequenceConfig::default());

    members.get_or_insert(1, Origin::Rtp).mark_rtp(at(99));
    members.get_or_insert(2, Origin::Rtp).mark_rtp(at(50));
    members.get_or_insert(3, Origin::Rtcp).mark_rtcp(at(98));
    members.get_or_insert(4, Origin::Rtp).mark_rtp(at(96));

    let mut removed = members.prune(&TimeoutPrune::default(), at(100), INTERVAL);
    removed.sort_unstable();

    assert_eq!(removed, vec![2]);
    assert_eq!(members.len(), 3);
    assert_eq!(members.senders(), 2);

    // everything goes quiet
    let removed = members.prune(&TimeoutPrune::default(), at(200), INTERVAL);
    assert_eq!(removed.len(), 3);
    assert!(members.is_empty());
    assert_eq!(members.senders(), 0);
}

struct KeepAll;

impl PrunePolicy for KeepAll {
    fn classify(&self, _: &Source, _: SystemTime, _: Duration) -> Activity {
        Activity::Member
    }
}

#[test]
fn test_session_members_custom_policy() {
    let mut members = SessionMembers::new(8000, SequenceConfig::default());
    members.get_or_insert(1, Origin::Rtcp);

    let removed = members.prune(&KeepAll, at(1_000), INTERVAL);
    assert!(removed.is_empty());
    assert_eq!(members.len(), 1);
    assert_eq!(members.senders(), 0);
}
