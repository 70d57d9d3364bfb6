//! Deserialisation of DNS messages from the network.  See the `types`
//! module for details of the format.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::protocol::types::*;

impl Message {
    /// # Errors
    ///
    /// If the message cannot be parsed.
    pub fn from_octets(octets: &[u8]) -> Result<Self, Error> {
        Self::deserialise(&mut ConsumableBuffer::new(octets))
    }

    /// # Errors
    ///
    /// If the message cannot be parsed.
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let wire_header = WireHeader::deserialise(buffer)?;
        let mut questions = Vec::with_capacity(wire_header.qdcount.into());
        let mut answers = Vec::with_capacity(wire_header.ancount.into());
        let mut authority = Vec::with_capacity(wire_header.nscount.into());
        let mut additional = Vec::with_capacity(wire_header.arcount.into());

        for _ in 0..wire_header.qdcount {
            questions.push(Question::deserialise(wire_header.header.id, buffer)?);
        }
        for _ in 0..wire_header.ancount {
            answers.push(ResourceRecord::deserialise(wire_header.header.id, buffer)?);
        }
        for _ in 0..wire_header.nscount {
            authority.push(ResourceRecord::deserialise(wire_header.header.id, buffer)?);
        }
        for _ in 0..wire_header.arcount {
            additional.push(ResourceRecord::deserialise(wire_header.header.id, buffer)?);
        }

        Ok(Self {
            header: wire_header.header,
            questions,
            answers,
            authority,
            additional,
        })
    }
}

impl WireHeader {
    /// # Errors
    ///
    /// If the header is too short.
    pub fn deserialise(buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let id = buffer.next_u16().ok_or(Error::CompletelyBusted)?;
        let flags1 = buffer.next_u8().ok_or(Error::HeaderTooShort(id))?;
        let flags2 = buffer.next_u8().ok_or(Error::HeaderTooShort(id))?;
        let qdcount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;
        let ancount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;
        let nscount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;
        let arcount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;

        Ok(Self {
            header: Header {
                id,
                is_response: flags1 & HEADER_MASK_QR != 0,
                opcode: Opcode::from((flags1 & HEADER_MASK_OPCODE) >> HEADER_OFFSET_OPCODE),
                is_authoritative: flags1 & HEADER_MASK_AA != 0,
                is_truncated: flags1 & HEADER_MASK_TC != 0,
                recursion_desired: flags1 & HEADER_MASK_RD != 0,
                recursion_available: flags2 & HEADER_MASK_RA != 0,
                rcode: Rcode::from((flags2 & HEADER_MASK_RCODE) >> HEADER_OFFSET_RCODE),
            },
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}

impl Question {
    /// # Errors
    ///
    /// If the question cannot be parsed.
    pub fn deserialise(id: u16, buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let name = DomainName::deserialise(id, buffer)?;
        let qtype = RecordType::deserialise(id, buffer).map_err(|_| Error::QuestionTooShort(id))?;
        let qclass =
            RecordClass::deserialise(id, buffer).map_err(|_| Error::QuestionTooShort(id))?;

        Ok(Self {
            name,
            qtype,
            qclass,
        })
    }
}

impl ResourceRecord {
    /// # Errors
    ///
    /// If the record cannot be parsed.
    pub fn deserialise(id: u16, buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let name = DomainName::deserialise(id, buffer)?;
        let rtype = RecordType::deserialise(id, buffer)?;
        let rclass = RecordClass::deserialise(id, buffer)?;
        let ttl = buffer.next_u32().ok_or(Error::ResourceRecordTooShort(id))?;
        let rdlength = buffer.next_u16().ok_or(Error::ResourceRecordTooShort(id))?;

        let rdata_start = buffer.position;

        // record types which carry domain names are expanded here, so
        // that compression pointers are resolved while the message is
        // still at hand.
        let rtype_with_data = match rtype {
            RecordType::A => RecordTypeWithData::A {
                address: Ipv4Addr::from(
                    buffer.next_u32().ok_or(Error::ResourceRecordTooShort(id))?,
                ),
            },
            RecordType::NS => RecordTypeWithData::NS {
                nsdname: DomainName::deserialise(id, buffer)?,
            },
            RecordType::CNAME => RecordTypeWithData::CNAME {
                cname: DomainName::deserialise(id, buffer)?,
            },
            RecordType::PTR => RecordTypeWithData::PTR {
                ptrdname: DomainName::deserialise(id, buffer)?,
            },
            RecordType::MX => RecordTypeWithData::MX {
                preference: buffer.next_u16().ok_or(Error::ResourceRecordTooShort(id))?,
                exchange: DomainName::deserialise(id, buffer)?,
            },
            RecordType::Unknown(tag) => RecordTypeWithData::Unknown {
                tag,
                octets: buffer
                    .take(rdlength as usize)
                    .ok_or(Error::ResourceRecordTooShort(id))?
                    .to_vec(),
            },
        };

        let consumed = buffer.position - rdata_start;
        if consumed != rdlength as usize {
            // keep the framing of the rest of the message intact by
            // trusting the advertised length over the parsed one.
            tracing::warn!(
                id,
                expected = rdlength,
                actual = consumed,
                "RDATA length disagrees with RDLENGTH, repositioning"
            );
            buffer
                .seek(rdata_start + rdlength as usize)
                .ok_or(Error::ResourceRecordTooShort(id))?;
        }

        Ok(Self {
            name,
            rtype_with_data,
            rclass,
            ttl,
        })
    }
}

impl DomainName {
    /// # Errors
    ///
    /// If the domain cannot be parsed.
    pub fn deserialise(id: u16, buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let mut labels = Vec::<Vec<u8>>::with_capacity(5);

        // offsets at which a suffix of this name starts; these are
        // registered in the buffer's name table once the full
        // expansion is known, so a later pointer can land on any
        // label boundary of this name.
        let mut suffix_offsets = Vec::<(usize, usize)>::new();

        loop {
            let offset = buffer.position;
            let size = buffer.next_u8().ok_or(Error::DomainTooShort(id))?;

            match size >> 6 {
                0b00 => {
                    if size == 0 {
                        break;
                    }

                    if let Some(os) = buffer.take(size as usize) {
                        suffix_offsets.push((offset, labels.len()));
                        labels.push(os.to_vec());
                    } else {
                        return Err(Error::DomainTooShort(id));
                    }
                }
                0b11 => {
                    let hi = size & 0b0011_1111;
                    let lo = buffer.next_u8().ok_or(Error::DomainTooShort(id))?;
                    let pointer = usize::from(u16::from_be_bytes([hi, lo]));

                    // only offsets of already-decoded names are in
                    // the table, so a forward or self reference is
                    // simply unknown and cannot loop.
                    if let Some(known) = buffer.known_names.get(&pointer) {
                        labels.extend(known.iter().cloned());
                    } else {
                        tracing::warn!(
                            id,
                            pointer,
                            "compression pointer does not refer to a known name"
                        );
                    }
                    break;
                }
                _ => return Err(Error::DomainLabelInvalid(id)),
            }
        }

        for (offset, index) in suffix_offsets {
            buffer.known_names.insert(offset, labels[index..].to_vec());
        }

        let name = DomainName { labels };
        if name.wire_len() <= DOMAINNAME_MAX_LEN {
            Ok(name)
        } else {
            Err(Error::DomainTooLong(id))
        }
    }
}

impl RecordType {
    /// # Errors
    ///
    /// If the record type is too short.
    pub fn deserialise(id: u16, buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let value = buffer.next_u16().ok_or(Error::ResourceRecordTooShort(id))?;
        Ok(Self::from(value))
    }
}

impl RecordClass {
    /// # Errors
    ///
    /// If the record class is too short.
    pub fn deserialise(id: u16, buffer: &mut ConsumableBuffer) -> Result<Self, Error> {
        let value = buffer.next_u16().ok_or(Error::ResourceRecordTooShort(id))?;
        Ok(Self::from(value))
    }
}

/// Errors encountered when parsing a datagram.  In all the errors
/// which have a `u16` parameter, that is the ID from the header - so
/// that an error response can be sent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// The datagram is not even 2 octets long, so it doesn't even
    /// contain a valid ID.  An error cannot even be sent back to the
    /// client in this case as, without an ID, it cannot be linked
    /// with the correct query.
    CompletelyBusted,

    /// The header is missing one or more required fields.
    HeaderTooShort(u16),

    /// A question ends with an incomplete field.
    QuestionTooShort(u16),

    /// A resource record ends with an incomplete field.
    ResourceRecordTooShort(u16),

    /// A domain is incomplete.
    DomainTooShort(u16),

    /// A domain is over 255 octets in size once expanded.
    DomainTooLong(u16),

    /// A domain label starts with the reserved `01` or `10` bits.
    DomainLabelInvalid(u16),
}

impl Error {
    pub fn id(self) -> Option<u16> {
        match self {
            Error::CompletelyBusted => None,
            Error::HeaderTooShort(id) => Some(id),
            Error::QuestionTooShort(id) => Some(id),
            Error::ResourceRecordTooShort(id) => Some(id),
            Error::DomainTooShort(id) => Some(id),
            Error::DomainTooLong(id) => Some(id),
            Error::DomainLabelInvalid(id) => Some(id),
        }
    }
}

/// A buffer which will be consumed by the parsing process.
///
/// Alongside the read cursor it carries the table of names seen so
/// far, keyed by the absolute offset their label sequence starts at.
/// Compression pointers are resolved against this table.
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    position: usize,
    known_names: HashMap<usize, Vec<Vec<u8>>>,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self {
            octets,
            position: 0,
            known_names: HashMap::new(),
        }
    }

    pub fn next_u8(&mut self) -> Option<u8> {
        if self.octets.len() > self.position {
            let a = self.octets[self.position];
            self.position += 1;
            Some(a)
        } else {
            None
        }
    }

    pub fn next_u16(&mut self) -> Option<u16> {
        if self.octets.len() > self.position + 1 {
            let a = self.octets[self.position];
            let b = self.octets[self.position + 1];
            self.position += 2;
            Some(u16::from_be_bytes([a, b]))
        } else {
            None
        }
    }

    pub fn next_u32(&mut self) -> Option<u32> {
        if self.octets.len() > self.position + 3 {
            let a = self.octets[self.position];
            let b = self.octets[self.position + 1];
            let c = self.octets[self.position + 2];
            let d = self.octets[self.position + 3];
            self.position += 4;
            Some(u32::from_be_bytes([a, b, c, d]))
        } else {
            None
        }
    }

    pub fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        if self.octets.len() >= self.position + size {
            let slice = &self.octets[self.position..self.position + size];
            self.position += size;
            Some(slice)
        } else {
            None
        }
    }

    pub fn seek(&mut self, position: usize) -> Option<()> {
        if position <= self.octets.len() {
            self.position = position;
            Some(())
        } else {
            None
        }
    }
}
