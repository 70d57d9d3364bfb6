//! Serialisation of DNS messages to the wire format, with name
//! compression.  See the `types` module for details of the format.

use std::collections::HashMap;

use crate::protocol::types::*;

impl Message {
    /// # Errors
    ///
    /// If the message is invalid (the `Message` type permits more
    /// states than strictly allowed).
    pub fn into_octets(self) -> Result<Vec<u8>, Error> {
        let mut buffer = WritableBuffer::default();
        self.serialise(&mut buffer)?;
        Ok(buffer.octets)
    }

    /// # Errors
    ///
    /// If the message is invalid (the `Message` type permits more
    /// states than strictly allowed).
    pub fn serialise(self, buffer: &mut WritableBuffer) -> Result<(), Error> {
        let qdcount = usize_to_u16(self.questions.len())?;
        let ancount = usize_to_u16(self.answers.len())?;
        let nscount = usize_to_u16(self.authority.len())?;
        let arcount = usize_to_u16(self.additional.len())?;

        self.header.serialise(buffer);
        buffer.write_u16(qdcount);
        buffer.write_u16(ancount);
        buffer.write_u16(nscount);
        buffer.write_u16(arcount);

        for question in self.questions {
            question.serialise(buffer);
        }
        for rr in self.answers {
            rr.serialise(buffer)?;
        }
        for rr in self.authority {
            rr.serialise(buffer)?;
        }
        for rr in self.additional {
            rr.serialise(buffer)?;
        }

        Ok(())
    }
}

impl Header {
    pub fn serialise(self, buffer: &mut WritableBuffer) {
        // octet 1
        let flag_qr = if self.is_response { HEADER_MASK_QR } else { 0 };
        let field_opcode = HEADER_MASK_OPCODE & (u8::from(self.opcode) << HEADER_OFFSET_OPCODE);
        let flag_aa = if self.is_authoritative {
            HEADER_MASK_AA
        } else {
            0
        };
        let flag_tc = if self.is_truncated { HEADER_MASK_TC } else { 0 };
        let flag_rd = if self.recursion_desired {
            HEADER_MASK_RD
        } else {
            0
        };
        // octet 2
        let flag_ra = if self.recursion_available {
            HEADER_MASK_RA
        } else {
            0
        };
        let field_rcode = HEADER_MASK_RCODE & (u8::from(self.rcode) << HEADER_OFFSET_RCODE);

        buffer.write_u16(self.id);
        buffer.write_u8(flag_qr | field_opcode | flag_aa | flag_tc | flag_rd);
        buffer.write_u8(flag_ra | field_rcode);
    }
}

impl Question {
    pub fn serialise(self, buffer: &mut WritableBuffer) {
        self.name.serialise(buffer);
        buffer.write_u16(self.qtype.into());
        buffer.write_u16(self.qclass.into());
    }
}

impl ResourceRecord {
    /// # Errors
    ///
    /// If the RDATA is too long.
    pub fn serialise(self, buffer: &mut WritableBuffer) -> Result<(), Error> {
        self.name.serialise(buffer);
        buffer.write_u16(self.rtype_with_data.rtype().into());
        buffer.write_u16(self.rclass.into());
        buffer.write_u32(self.ttl);

        // filled in below, once the RDATA size is known
        let rdlength_index = buffer.index();
        buffer.write_u16(0);

        match self.rtype_with_data {
            RecordTypeWithData::A { address } => buffer.write_octets(&address.octets()),
            RecordTypeWithData::NS { nsdname } => nsdname.serialise(buffer),
            RecordTypeWithData::CNAME { cname } => cname.serialise(buffer),
            RecordTypeWithData::PTR { ptrdname } => ptrdname.serialise(buffer),
            RecordTypeWithData::MX {
                preference,
                exchange,
            } => {
                buffer.write_u16(preference);
                exchange.serialise(buffer);
            }
            RecordTypeWithData::Unknown { octets, .. } => buffer.write_octets(&octets),
        }

        // -2 so we don't also include the 2 octets for the rdlength
        let rdlength = usize_to_u16(buffer.index() - rdlength_index - 2)?;
        let [hi, lo] = rdlength.to_be_bytes();
        buffer.octets[rdlength_index] = hi;
        buffer.octets[rdlength_index + 1] = lo;

        Ok(())
    }
}

impl DomainName {
    pub fn serialise(self, buffer: &mut WritableBuffer) {
        for i in 0..self.labels.len() {
            let suffix = &self.labels[i..];

            // the table only ever holds offsets a 14-bit pointer can
            // express, so a hit can always be emitted as-is.
            if let Some(&offset) = buffer.known_names.get(suffix) {
                buffer.write_u16(POINTER_TAG | offset as u16);
                return;
            }

            let offset = buffer.index();
            if offset <= POINTER_MAX_OFFSET {
                buffer.known_names.insert(suffix.to_vec(), offset);
            }

            let label = &self.labels[i];
            buffer.write_u8(label.len() as u8);
            buffer.write_octets(label);
        }

        buffer.write_u8(0);
    }
}

/// The top two bits which mark a length octet as a pointer.
const POINTER_TAG: u16 = 0xC000;

/// The largest offset a 14-bit compression pointer can refer to.
const POINTER_MAX_OFFSET: usize = 0x3FFF;

/// Errors encountered when serialising a message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// A counter does not fit in the desired width.
    CounterTooLarge { counter: usize, bits: u32 },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::CounterTooLarge { counter, bits } => {
                write!(f, "'{counter}' cannot be converted to a u{bits}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A buffer which can be written to, for serialisation purposes.
///
/// Alongside the octets it carries the table of name suffixes already
/// written, keyed by their label sequence, so that later occurrences
/// can be replaced by a pointer to the first.
pub struct WritableBuffer {
    pub octets: Vec<u8>,
    known_names: HashMap<Vec<Vec<u8>>, usize>,
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self {
            octets: Vec::with_capacity(512),
            known_names: HashMap::new(),
        }
    }
}

impl WritableBuffer {
    pub fn index(&self) -> usize {
        self.octets.len()
    }

    pub fn write_u8(&mut self, octet: u8) {
        self.octets.push(octet);
    }

    pub fn write_u16(&mut self, value: u16) {
        for octet in value.to_be_bytes() {
            self.octets.push(octet);
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        for octet in value.to_be_bytes() {
            self.octets.push(octet);
        }
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        for octet in octets {
            self.octets.push(*octet);
        }
    }
}

/// Helper function to convert a `usize` into a `u16` (or return an error).
///
/// # Errors
///
/// If the value cannot be converted.
fn usize_to_u16(counter: usize) -> Result<u16, Error> {
    if let Ok(t) = u16::try_from(counter) {
        Ok(t)
    } else {
        Err(Error::CounterTooLarge {
            counter,
            bits: u16::BITS,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::protocol::types::test_util::*;

    #[test]
    #[rustfmt::skip]
    fn test_sets_rdlength_and_compresses_rdata() {
        let mut buf = WritableBuffer::default();
        buf.write_u8(1);
        buf.write_u8(2);
        buf.write_u8(3);
        buf.write_u8(4);

        let rr = mx_record("www.example.com", 32, "mx.example.com");
        let _ = rr.serialise(&mut buf);

        assert_eq!(
            vec![
                1, 2, 3, 4,
                // NAME
                3, 119, 119, 119, // "www"
                7, 101, 120, 97, 109, 112, 108, 101, // "example"
                3, 99, 111, 109, 0, // "com"
                // TYPE
                0b0000_0000, 0b0000_1111, // MX
                // CLASS
                0b0000_0000, 0b0000_0001, // IN
                // TTL
                0b0000_0000, 0b0000_0000, 0b0000_0000, 0b0011_1100, // 60
                // RDLENGTH
                0b0000_0000, 0b0000_0111, // 7 octets
                // RDATA
                0, 32, // preference
                2, 109, 120, // "mx"
                0xC0, 8, // pointer to "example.com" at offset 8
            ],
            buf.octets,
        );
    }

    #[test]
    fn answer_reuses_question_name() {
        let mut response = Message::from_question(
            1234,
            Question {
                name: domain("www.baidu.com"),
                qtype: RecordType::A,
                qclass: RecordClass::IN,
            },
        )
        .make_response();
        response.questions = vec![Question {
            name: domain("www.baidu.com"),
            qtype: RecordType::A,
            qclass: RecordClass::IN,
        }];
        response
            .answers
            .push(a_record("www.baidu.com", Ipv4Addr::new(14, 215, 177, 38)));

        let octets = response.into_octets().unwrap();

        // the question name starts right after the 12-octet header,
        // so the answer's NAME field is a single pointer to it
        let answer_name = &octets[12 + 15 + 4..12 + 15 + 4 + 2];
        assert_eq!(&[0xC0, 12], answer_name);
    }

    #[test]
    fn compression_shrinks_shared_suffixes() {
        let message = Message {
            header: Message::from_question(
                1,
                Question {
                    name: domain("www.baidu.com"),
                    qtype: RecordType::A,
                    qclass: RecordClass::IN,
                },
            )
            .header,
            questions: vec![Question {
                name: domain("www.baidu.com"),
                qtype: RecordType::A,
                qclass: RecordClass::IN,
            }],
            answers: vec![
                cname_record("www.baidu.com", "www.a.shifen.com"),
                a_record("www.a.shifen.com", Ipv4Addr::new(14, 215, 177, 38)),
                a_record("www.a.shifen.com", Ipv4Addr::new(14, 215, 177, 39)),
            ],
            authority: Vec::new(),
            additional: Vec::new(),
        };

        let uncompressed_len = 12
            + message
                .questions
                .iter()
                .map(|q| q.name.wire_len() + 4)
                .sum::<usize>()
            + message
                .answers
                .iter()
                .map(|rr| {
                    rr.name.wire_len()
                        + 10
                        + match &rr.rtype_with_data {
                            RecordTypeWithData::A { .. } => 4,
                            RecordTypeWithData::CNAME { cname } => cname.wire_len(),
                            _ => panic!("unexpected record type"),
                        }
                })
                .sum::<usize>();

        let octets = message.into_octets().unwrap();

        assert!(
            octets.len() < uncompressed_len,
            "{} >= {uncompressed_len}",
            octets.len()
        );
    }
}
