use super::*;
use crate::reception_report::ReceptionReport;
use crate::source_description::{SdesType, SourceDescriptionChunk, SourceDescriptionItem};

fn compound_bytes() -> Bytes {
    Bytes::from_static(&[
        // Receiver Report (offset=0)
        0x81, 0xc9, 0x00, 0x07, // v=2, p=0, count=1, RR, len=7
        0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
        0xbc, 0x5e, 0x9a, 0x40, // ssrc=0xbc5e9a40
        0x00, 0x00, 0x00, 0x00, // fracLost=0, totalLost=0
        0x00, 0x00, 0x46, 0xe1, // lastSeq=0x46e1
        0x00, 0x00, 0x01, 0x11, // jitter=273
        0x09, 0xf3, 0x64, 0x32, // lsr=0x9f36432
        0x00, 0x02, 0x4a, 0x79, // delay=150137
        // Source Description (offset=32)
        0x81, 0xca, 0x00, 0x03, // v=2, p=0, count=1, SDES, len=3
        0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
        0x01, 0x03, 0x61, 0x62, // CNAME, len=3, text=ab
        0x63, 0x00, 0x00, 0x00, // text=c, END + padding
        // Goodbye (offset=48)
        0x81, 0xcb, 0x00, 0x01, // v=2, p=0, count=1, BYE, len=1
        0x90, 0x2f, 0x9e, 0x2e, // source=0x902f9e2e
        // Application Defined (offset=56)
        0x81, 0xcc, 0x00, 0x03, // v=2, p=0, subtype=1, APP, len=3
        0x90, 0x2f, 0x9e, 0x2e, // ssrc=0x902f9e2e
        0x54, 0x45, 0x53, 0x54, // name=TEST
        0x01, 0x02, 0x03, 0x04, // data
        // Unknown type 207 (offset=72)
        0x80, 0xcf, 0x00, 0x01, // v=2, p=0, count=0, type=207, len=1
        0xde, 0xad, 0xbe, 0xef, // opaque body
    ])
}

fn compound_packets() -> Vec<Packet> {
    vec![
        Packet::ReceiverReport(ReceiverReport {
            ssrc: 0x902f9e2e,
            reports: vec![ReceptionReport {
                ssrc: 0xbc5e9a40,
                fraction_lost: 0,
                total_lost: 0,
                last_sequence_number: 0x46e1,
                jitter: 273,
                last_sender_report: 0x9f36432,
                delay: 150137,
            }],
            ..Default::default()
        }),
        Packet::SourceDescription(SourceDescription {
            chunks: vec![SourceDescriptionChunk {
                source: 0x902f9e2e,
                items: vec![SourceDescriptionItem {
                    sdes_type: SdesType::SdesCname,
                    text: Bytes::from_static(b"abc"),
                }],
            }],
        }),
        Packet::Goodbye(Goodbye {
            sources: vec![0x902f9e2e],
            ..Default::default()
        }),
        Packet::ApplicationDefined(ApplicationDefined {
            sub_type: 1,
            ssrc: 0x902f9e2e,
            name: *b"TEST",
            data: Bytes::from_static(&[0x01, 0x02, 0x03, 0x04]),
        }),
        Packet::Raw(RawPacket {
            header: Header {
                padding: false,
                count: 0,
                packet_type: PacketType::Unsupported(207),
                length: 1,
            },
            body: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        }),
    ]
}

#[test]
fn test_packet_unmarshal() {
    let mut data = compound_bytes();
    let packets = unmarshal(&mut data).expect("Error unmarshalling packets");

    assert_eq!(packets, compound_packets());
    assert!(!data.has_remaining(), "unmarshal should consume the datagram");
}

#[test]
fn test_packet_unmarshal_empty() {
    let result = unmarshal(&mut Bytes::new());
    if let Err(got) = result {
        let want = Error::InvalidHeader;
        assert_eq!(want, got, "Unmarshal(nil) err = {got}, want {want}");
    } else {
        panic!("want error");
    }
}

#[test]
fn test_packet_invalid_header_length() {
    let mut data = Bytes::from_static(&[
        // v=2, p=0, count=1, BYE, len=100
        0x81, 0xcb, 0x00, 0x64,
    ]);

    let result = unmarshal(&mut data);
    if let Err(got) = result {
        let want = Error::PacketTooShort;
        assert_eq!(
            want, got,
            "Unmarshal(invalid_header_length) err = {got}, want {want}"
        );
    } else {
        panic!("want error");
    }
}

#[test]
fn test_packet_unmarshal_bad_second_packet() {
    let mut data = Bytes::from_static(&[
        0x80, 0xcb, 0x00, 0x00, // v=2, p=0, count=0, BYE, len=0
        0x40, 0xcb, 0x00, 0x00, // v=1, BYE, len=0
    ]);

    let result = unmarshal(&mut data);
    if let Err(got) = result {
        let want = Error::BadVersion;
        assert_eq!(want, got, "Unmarshal(bad version) err = {got}, want {want}");
    } else {
        panic!("want error");
    }
}

#[test]
fn test_packet_unmarshal_single() {
    let mut data = compound_bytes();
    let first = Packet::unmarshal(&mut data).expect("first packet");

    assert_eq!(first.packet_type(), PacketType::ReceiverReport);
    assert_eq!(data.remaining(), 48, "only the first packet is consumed");
}

#[test]
fn test_packet_marshal_round_trip() {
    let packets = compound_packets();
    let raw = marshal(&packets).expect("marshal");

    assert_eq!(raw, compound_bytes());

    let mut buf = raw;
    let decoded = unmarshal(&mut buf).expect("unmarshal");
    assert_eq!(decoded, packets);
}

#[test]
fn test_packet_destination_ssrc() {
    let packets = compound_packets();

    let tests = vec![
        ("receiver report", &packets[0], vec![0xbc5e9a40]),
        ("source description", &packets[1], vec![0x902f9e2e]),
        ("goodbye", &packets[2], vec![0x902f9e2e]),
        ("application defined", &packets[3], vec![0x902f9e2e]),
        ("raw", &packets[4], vec![]),
    ];

    for (name, packet, want) in tests {
        let got = packet.destination_ssrc();
        assert_eq!(got, want, "{name}: destination_ssrc = {got:?}, want {want:?}");
    }
}

#[test]
fn test_packet_header_matches_wire() {
    let packets = compound_packets();
    for packet in &packets {
        let header = packet.header().expect("header");
        assert_eq!(header.packet_type, packet.packet_type());
        assert_eq!(
            (header.length as usize + 1) * 4,
            packet.marshal_size(),
            "{packet}: header length disagrees with marshal size"
        );
    }
}
