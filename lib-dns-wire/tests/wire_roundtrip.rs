use fake::{Fake, Faker};

use dns_wire::protocol::deserialise::ConsumableBuffer;
use dns_wire::protocol::serialise::WritableBuffer;
use dns_wire::protocol::types::*;

#[test]
fn roundtrip_message() {
    for _ in 0..100 {
        let original = arbitrary_message();
        let deserialised = Message::from_octets(&original.clone().into_octets().unwrap());

        assert_eq!(Ok(original), deserialised);
    }
}

#[test]
fn roundtrip_wire_header() {
    for _ in 0..100 {
        let header = arbitrary_header();

        let mut buffer = WritableBuffer::default();
        header.serialise(&mut buffer);
        buffer.write_u16(1);
        buffer.write_u16(2);
        buffer.write_u16(3);
        buffer.write_u16(4);

        let deserialised = WireHeader::deserialise(&mut ConsumableBuffer::new(&buffer.octets));

        assert_eq!(
            Ok(WireHeader {
                header,
                qdcount: 1,
                ancount: 2,
                nscount: 3,
                arcount: 4,
            }),
            deserialised
        );
    }
}

#[test]
fn roundtrip_question() {
    for _ in 0..100 {
        let original = arbitrary_question();

        let mut buffer = WritableBuffer::default();
        original.clone().serialise(&mut buffer);
        let deserialised = Question::deserialise(0, &mut ConsumableBuffer::new(&buffer.octets));

        assert_eq!(Ok(original), deserialised);
    }
}

#[test]
fn roundtrip_resourcerecord() {
    for _ in 0..100 {
        let original = arbitrary_resourcerecord();

        let mut buffer = WritableBuffer::default();
        original.clone().serialise(&mut buffer).unwrap();
        let deserialised =
            ResourceRecord::deserialise(0, &mut ConsumableBuffer::new(&buffer.octets));

        assert_eq!(Ok(original), deserialised);
    }
}

#[test]
fn roundtrip_domainname() {
    for _ in 0..100 {
        let original = arbitrary_domainname();

        let mut buffer = WritableBuffer::default();
        original.clone().serialise(&mut buffer);
        let deserialised = DomainName::deserialise(0, &mut ConsumableBuffer::new(&buffer.octets));

        assert_eq!(Ok(original), deserialised);
    }
}

#[test]
fn roundtrip_message_with_shared_suffixes() {
    // records sharing a suffix compress to pointers: the decoded
    // message must still equal the original, and the encoding must be
    // strictly smaller than the sum of the uncompressed field sizes.
    for _ in 0..100 {
        let suffix = arbitrary_domainname();
        let mut original = arbitrary_message();

        for rr in &mut original.answers {
            let mut labels = rr.name.labels.clone();
            labels.truncate(1);
            labels.extend(suffix.labels.iter().cloned());
            rr.name = DomainName { labels };
        }

        if original.answers.len() < 2 {
            continue;
        }

        let octets = original.clone().into_octets().unwrap();
        assert_eq!(Ok(original.clone()), Message::from_octets(&octets));

        let uncompressed_len = 12
            + original
                .questions
                .iter()
                .map(|q| q.name.wire_len() + 4)
                .sum::<usize>()
            + [
                &original.answers,
                &original.authority,
                &original.additional,
            ]
            .iter()
            .flat_map(|rrs| rrs.iter())
            .map(|rr| rr.name.wire_len() + 10 + uncompressed_rdata_len(&rr.rtype_with_data))
            .sum::<usize>();

        assert!(octets.len() < uncompressed_len);
    }
}

#[test]
fn prefixes_of_valid_messages_fail_to_decode() {
    for _ in 0..10 {
        let original = arbitrary_message();
        let octets = original.into_octets().unwrap();

        for len in 0..octets.len() - 1 {
            assert!(
                Message::from_octets(&octets[..len]).is_err(),
                "prefix of length {len} decoded successfully"
            );
        }
    }
}

fn uncompressed_rdata_len(rtype_with_data: &RecordTypeWithData) -> usize {
    match rtype_with_data {
        RecordTypeWithData::A { .. } => 4,
        RecordTypeWithData::NS { nsdname } => nsdname.wire_len(),
        RecordTypeWithData::CNAME { cname } => cname.wire_len(),
        RecordTypeWithData::PTR { ptrdname } => ptrdname.wire_len(),
        RecordTypeWithData::MX { exchange, .. } => 2 + exchange.wire_len(),
        RecordTypeWithData::Unknown { octets, .. } => octets.len(),
    }
}

fn arbitrary_message() -> Message {
    let qdcount = (0..3).fake::<usize>();
    let ancount = (0..4).fake::<usize>();
    let nscount = (0..4).fake::<usize>();
    let arcount = (0..4).fake::<usize>();

    let mut questions = Vec::with_capacity(qdcount);
    let mut answers = Vec::with_capacity(ancount);
    let mut authority = Vec::with_capacity(nscount);
    let mut additional = Vec::with_capacity(arcount);

    for _ in 0..qdcount {
        questions.push(arbitrary_question());
    }
    for _ in 0..ancount {
        answers.push(arbitrary_resourcerecord());
    }
    for _ in 0..nscount {
        authority.push(arbitrary_resourcerecord());
    }
    for _ in 0..arcount {
        additional.push(arbitrary_resourcerecord());
    }

    Message {
        header: arbitrary_header(),
        questions,
        answers,
        authority,
        additional,
    }
}

fn arbitrary_header() -> Header {
    Header {
        id: Faker.fake(),
        is_response: Faker.fake(),
        opcode: arbitrary_opcode(),
        is_authoritative: Faker.fake(),
        is_truncated: Faker.fake(),
        recursion_desired: Faker.fake(),
        recursion_available: Faker.fake(),
        rcode: arbitrary_rcode(),
    }
}

fn arbitrary_question() -> Question {
    Question {
        name: arbitrary_domainname(),
        qtype: arbitrary_recordtype(),
        qclass: arbitrary_recordclass(),
    }
}

fn arbitrary_resourcerecord() -> ResourceRecord {
    ResourceRecord {
        name: arbitrary_domainname(),
        rtype_with_data: arbitrary_recordtypewithdata(),
        rclass: arbitrary_recordclass(),
        ttl: Faker.fake(),
    }
}

fn arbitrary_recordtypewithdata() -> RecordTypeWithData {
    // this should match the `RecordTypeWithData` deserialisation
    match arbitrary_recordtype() {
        RecordType::A => RecordTypeWithData::A {
            address: std::net::Ipv4Addr::from(Faker.fake::<u32>()),
        },
        RecordType::NS => RecordTypeWithData::NS {
            nsdname: arbitrary_domainname(),
        },
        RecordType::CNAME => RecordTypeWithData::CNAME {
            cname: arbitrary_domainname(),
        },
        RecordType::PTR => RecordTypeWithData::PTR {
            ptrdname: arbitrary_domainname(),
        },
        RecordType::MX => RecordTypeWithData::MX {
            preference: Faker.fake(),
            exchange: arbitrary_domainname(),
        },
        RecordType::Unknown(tag) => RecordTypeWithData::Unknown {
            tag,
            octets: arbitrary_octets((0..64).fake()),
        },
    }
}

fn arbitrary_domainname() -> DomainName {
    let num_labels = (1..5).fake::<usize>();
    let mut labels = Vec::<Vec<u8>>::new();

    for _ in 0..num_labels {
        let label_len = (1..20).fake::<usize>();
        let mut label = Vec::with_capacity(label_len);

        for _ in 0..label_len {
            // lowercase letters and digits
            let octet = if Faker.fake() {
                (97..123).fake::<u8>()
            } else {
                (48..58).fake::<u8>()
            };
            label.push(octet);
        }

        labels.push(label);
    }

    DomainName { labels }
}

fn arbitrary_opcode() -> Opcode {
    // opcode is a 4-bit field
    (Faker.fake::<u8>() & 0b0000_1111).into()
}

fn arbitrary_rcode() -> Rcode {
    // rcode is a 4-bit field
    (Faker.fake::<u8>() & 0b0000_1111).into()
}

fn arbitrary_recordtype() -> RecordType {
    Faker.fake::<u16>().into()
}

fn arbitrary_recordclass() -> RecordClass {
    Faker.fake::<u16>().into()
}

fn arbitrary_octets(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(Faker.fake());
    }
    out
}
