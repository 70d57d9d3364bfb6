use std::fmt;
use std::net::Ipv4Addr;

/// Basic DNS message format, used for both queries and responses.
///
/// ```text
///     +---------------------+
///     |        Header       |
///     +---------------------+
///     |       Question      | the question for the name server
///     +---------------------+
///     |        Answer       | RRs answering the question
///     +---------------------+
///     |      Authority      | RRs pointing toward an authority
///     +---------------------+
///     |      Additional     | RRs holding additional information
///     +---------------------+
/// ```
///
/// See section 4.1 of RFC 1035.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Message {
    /// Start a response to this message: same id, opcode copied, all
    /// of AA / TC / RD / RA cleared.  The question section starts out
    /// empty: the responder copies over each question it actually
    /// processes.
    pub fn make_response(&self) -> Self {
        Self {
            header: Header {
                id: self.header.id,
                is_response: true,
                opcode: self.header.opcode,
                is_authoritative: false,
                is_truncated: false,
                recursion_desired: false,
                recursion_available: false,
                rcode: Rcode::NoError,
            },
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// An empty response carrying only an RCODE, for messages which
    /// could not be decoded beyond their id.
    pub fn make_format_error_response(id: u16) -> Self {
        Self {
            header: Header {
                id,
                is_response: true,
                opcode: Opcode::Standard,
                is_authoritative: false,
                is_truncated: false,
                recursion_desired: false,
                recursion_available: false,
                rcode: Rcode::FormatError,
            },
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn from_question(id: u16, question: Question) -> Self {
        Self {
            header: Header {
                id,
                is_response: false,
                opcode: Opcode::Standard,
                is_authoritative: false,
                is_truncated: false,
                recursion_desired: false,
                recursion_available: false,
                rcode: Rcode::NoError,
            },
            questions: vec![question],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }
}

/// Common header type for all messages.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// The Z bits must be zero and are not represented here.  See section
/// 4.1.1 of RFC 1035.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Header {
    /// A 16 bit identifier assigned by the program that generates any
    /// kind of query.  This identifier is copied into the
    /// corresponding reply so the requester can match up replies to
    /// outstanding queries.
    pub id: u16,

    /// QR - whether this message is a query (0) or a response (1).
    pub is_response: bool,

    /// A four bit field that specifies the kind of query in this
    /// message.  Set by the originator of a query and copied into the
    /// response.
    pub opcode: Opcode,

    /// AA - valid in responses, specifies that the responding name
    /// server is an authority for the domain name in the question
    /// section.
    pub is_authoritative: bool,

    /// TC - specifies that this message was truncated.  Never set by
    /// this implementation.
    pub is_truncated: bool,

    /// RD - may be set in a query and is copied into the response.
    pub recursion_desired: bool,

    /// RA - set or cleared in a response, denotes whether recursive
    /// query support is available.
    pub recursion_available: bool,

    /// Response code, set as part of responses.
    pub rcode: Rcode,
}

/// A `Header` as it appears on the network.  This type is used for
/// serialisation and deserialisation only: keeping the count fields
/// out of the normal `Header` means they cannot disagree with the
/// section lengths.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WireHeader {
    pub header: Header,

    /// Number of entries in the question section.
    pub qdcount: u16,

    /// Number of resource records in the answer section.
    pub ancount: u16,

    /// Number of resource records in the authority section.
    pub nscount: u16,

    /// Number of resource records in the additional section.
    pub arcount: u16,
}

pub const HEADER_MASK_QR: u8 = 0b1000_0000;
pub const HEADER_MASK_OPCODE: u8 = 0b0111_1000;
pub const HEADER_OFFSET_OPCODE: usize = 3;
pub const HEADER_MASK_AA: u8 = 0b0000_0100;
pub const HEADER_MASK_TC: u8 = 0b0000_0010;
pub const HEADER_MASK_RD: u8 = 0b0000_0001;
pub const HEADER_MASK_RA: u8 = 0b1000_0000;
pub const HEADER_MASK_RCODE: u8 = 0b0000_1111;
pub const HEADER_OFFSET_RCODE: usize = 0;

/// A single question from the question section.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                                               |
///     /                     QNAME                     /
///     /                                               /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QTYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QCLASS                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.2 of RFC 1035.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct Question {
    pub name: DomainName,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl Question {
    /// Whether the type or class is outside the set this
    /// implementation can answer.
    pub fn is_unknown(&self) -> bool {
        self.qtype.is_unknown() || self.qclass.is_unknown()
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qclass, self.qtype)
    }
}

/// The answer, authority, and additional sections are all the same
/// format: a variable number of resource records.  This is the
/// structure for a single resource record.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                                               |
///     /                                               /
///     /                      NAME                     /
///     |                                               |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     CLASS                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TTL                      |
///     |                                               |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                   RDLENGTH                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
///     /                     RDATA                     /
///     /                                               /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.3 of RFC 1035.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(any(feature = "test-util", test), derive(arbitrary::Arbitrary))]
pub struct ResourceRecord {
    /// The domain name this record pertains to.
    pub name: DomainName,

    /// The RTYPE and RDATA fields, combined so that the data cannot
    /// disagree with the type.
    pub rtype_with_data: RecordTypeWithData,

    /// The class of the data in the RDATA field.
    pub rclass: RecordClass,

    /// How long (in seconds) the record may be cached.
    pub ttl: u32,
}

impl ResourceRecord {
    pub fn is_unknown(&self) -> bool {
        self.rtype_with_data.is_unknown() || self.rclass.is_unknown()
    }
}

/// A record type with its associated, deserialised, data.  Only the
/// types this system serves get a structured representation; anything
/// else keeps its raw RDATA so that decoding a foreign record does
/// not lose framing.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordTypeWithData {
    /// A 32 bit Internet address.
    A { address: Ipv4Addr },

    /// A domain name which specifies a host which should be
    /// authoritative for the specified class and domain.
    NS { nsdname: DomainName },

    /// A domain name which specifies the canonical or primary name
    /// for the owner.  The owner name is an alias.
    CNAME { cname: DomainName },

    /// A domain name which points to some location in the domain name
    /// space.
    PTR { ptrdname: DomainName },

    /// ```text
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///     |                  PREFERENCE                   |
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///     /                   EXCHANGE                    /
    ///     /                                               /
    ///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    /// ```
    ///
    /// Where `EXCHANGE` is a domain name which specifies a host
    /// willing to act as a mail exchange for the owner name, and
    /// `PREFERENCE` ranks this record among others at the same owner
    /// (lower values preferred).
    MX {
        preference: u16,
        exchange: DomainName,
    },

    /// Any other record, with its RDATA kept as raw octets.
    Unknown {
        tag: RecordTypeUnknown,
        octets: Vec<u8>,
    },
}

impl RecordTypeWithData {
    pub fn is_unknown(&self) -> bool {
        self.rtype().is_unknown()
    }

    pub fn rtype(&self) -> RecordType {
        match self {
            RecordTypeWithData::A { .. } => RecordType::A,
            RecordTypeWithData::NS { .. } => RecordType::NS,
            RecordTypeWithData::CNAME { .. } => RecordType::CNAME,
            RecordTypeWithData::PTR { .. } => RecordType::PTR,
            RecordTypeWithData::MX { .. } => RecordType::MX,
            RecordTypeWithData::Unknown { tag, .. } => RecordType::Unknown(*tag),
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordTypeWithData {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let len = u.int_in_range(0..=128)?;
        let octets = Vec::from(u.bytes(len)?);

        let rtype_with_data = match u.arbitrary::<RecordType>()? {
            RecordType::A => RecordTypeWithData::A {
                address: u.arbitrary()?,
            },
            RecordType::NS => RecordTypeWithData::NS {
                nsdname: u.arbitrary()?,
            },
            RecordType::CNAME => RecordTypeWithData::CNAME {
                cname: u.arbitrary()?,
            },
            RecordType::PTR => RecordTypeWithData::PTR {
                ptrdname: u.arbitrary()?,
            },
            RecordType::MX => RecordTypeWithData::MX {
                preference: u.arbitrary()?,
                exchange: u.arbitrary()?,
            },
            RecordType::Unknown(tag) => RecordTypeWithData::Unknown { tag, octets },
        };
        Ok(rtype_with_data)
    }
}

/// What sort of query this is.  Only standard queries are acted upon;
/// the others decode fine and are treated as standard.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Opcode {
    Standard,
    Inverse,
    Status,
    Reserved(OpcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Opcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OpcodeReserved(u8);

impl From<u8> for Opcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Opcode::Standard,
            1 => Opcode::Inverse,
            2 => Opcode::Status,
            other => Opcode::Reserved(OpcodeReserved(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Standard => 0,
            Opcode::Inverse => 1,
            Opcode::Status => 2,
            Opcode::Reserved(OpcodeReserved(octet)) => octet,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Opcode::Standard => write!(f, "standard query"),
            Opcode::Inverse => write!(f, "inverse query"),
            Opcode::Status => write!(f, "server status"),
            Opcode::Reserved(OpcodeReserved(octet)) => write!(f, "reserved ({octet})"),
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Opcode {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u8>()?))
    }
}

/// What sort of response this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(RcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Rcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RcodeReserved(u8);

impl From<u8> for Rcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(RcodeReserved(other)),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(RcodeReserved(octet)) => octet,
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rcode::NoError => write!(f, "no error"),
            Rcode::FormatError => write!(f, "format error"),
            Rcode::ServerFailure => write!(f, "server failure"),
            Rcode::NameError => write!(f, "name does not exist"),
            Rcode::NotImplemented => write!(f, "not implemented"),
            Rcode::Refused => write!(f, "refused"),
            Rcode::Reserved(RcodeReserved(octet)) => write!(f, "reserved ({octet})"),
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for Rcode {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u8>()?))
    }
}

/// Maximum encoded size of a domain name, including all length octets
/// and the terminating zero.
pub const DOMAINNAME_MAX_LEN: usize = 255;

/// Maximum size of a single label.
pub const LABEL_MAX_LEN: usize = 63;

/// A domain name: a sequence of ASCII labels.  The presentation form
/// is the labels joined with dots and WITHOUT a trailing root dot,
/// matching how names are written in the record store.
///
/// Case is preserved: record lookup is case-sensitive, so `WWW` and
/// `www` are different names.
///
/// A label must be 63 octets or shorter.  A name must be 255 octets
/// or shorter in its encoded form, including length and label octets.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DomainName {
    pub labels: Vec<Vec<u8>>,
}

impl DomainName {
    pub fn from_dotted_string(s: &str) -> Option<Self> {
        let stripped = s.strip_suffix('.').unwrap_or(s);
        if stripped.is_empty() {
            return None;
        }

        Self::from_labels(
            stripped
                .split('.')
                .map(|label| label.as_bytes().to_vec())
                .collect(),
        )
    }

    pub fn from_labels(labels: Vec<Vec<u8>>) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }

        let mut wire_len = 1;
        for label in &labels {
            if label.is_empty() || label.len() > LABEL_MAX_LEN {
                return None;
            }
            if !label.iter().all(u8::is_ascii) {
                return None;
            }
            wire_len += 1 + label.len();
        }

        if wire_len > DOMAINNAME_MAX_LEN {
            return None;
        }

        Some(Self { labels })
    }

    pub fn to_dotted_string(&self) -> String {
        if self.labels.is_empty() {
            return ".".to_string();
        }

        let mut out = String::with_capacity(self.wire_len());
        let mut first = true;
        for label in &self.labels {
            if first {
                first = false;
            } else {
                out.push('.');
            }
            for octet in label {
                out.push(*octet as char);
            }
        }
        out
    }

    /// The size of this name on the wire: a length octet plus the
    /// label octets for each label, plus the terminating zero.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| 1 + l.len()).sum::<usize>() + 1
    }

    /// The name itself, then the name after the first label, and so
    /// on down to the last label.  This is the walk the authoritative
    /// responder uses to find enclosing NS records.
    pub fn suffixes(&self) -> impl Iterator<Item = DomainName> + '_ {
        (0..self.labels.len()).map(move |i| DomainName {
            labels: self.labels[i..].to_vec(),
        })
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_dotted_string())
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainName")
            .field("to_dotted_string()", &self.to_dotted_string())
            .finish()
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for DomainName {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let num_labels = u.int_in_range::<usize>(1..=4)?;
        let mut labels = Vec::with_capacity(num_labels);
        for _ in 0..num_labels {
            let label_len = u.int_in_range::<u8>(1..=20)?;
            let mut label = Vec::with_capacity(label_len.into());
            for b in u.bytes(label_len.into())? {
                let ascii_byte = if b.is_ascii() { *b } else { *b % 128 };
                let octet = if ascii_byte == b'.'
                    || ascii_byte == b'\\'
                    || ascii_byte == 0
                    || (ascii_byte as char).is_whitespace()
                {
                    b'x'
                } else {
                    ascii_byte
                };
                label.push(octet);
            }
            labels.push(label);
        }
        Ok(Self { labels })
    }
}

/// Record types are used by resource records and by questions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    PTR,
    MX,
    Unknown(RecordTypeUnknown),
}

/// A struct with a private constructor, to ensure invalid `RecordType`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordTypeUnknown(u16);

impl RecordType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordType::Unknown(_))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::PTR => write!(f, "PTR"),
            RecordType::MX => write!(f, "MX"),
            RecordType::Unknown(RecordTypeUnknown(n)) => write!(f, "{n}"),
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            12 => RecordType::PTR,
            15 => RecordType::MX,
            _ => RecordType::Unknown(RecordTypeUnknown(value)),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::Unknown(RecordTypeUnknown(value)) => value,
        }
    }
}

impl std::str::FromStr for RecordType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::NS),
            "CNAME" => Ok(RecordType::CNAME),
            "PTR" => Ok(RecordType::PTR),
            "MX" => Ok(RecordType::MX),
            _ => Err(TypeParseError {
                input: s.to_string(),
            }),
        }
    }
}

/// Error from parsing a record type mnemonic.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TypeParseError {
    pub input: String,
}

impl fmt::Display for TypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown record type '{}'", self.input)
    }
}

impl std::error::Error for TypeParseError {}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordType {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

/// Record classes are used by resource records and by questions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordClass {
    IN,
    Unknown(RecordClassUnknown),
}

/// A struct with a private constructor, to ensure invalid
/// `RecordClass`es cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordClassUnknown(u16);

impl RecordClass {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordClass::Unknown(_))
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordClass::IN => write!(f, "IN"),
            RecordClass::Unknown(RecordClassUnknown(n)) => write!(f, "{n}"),
        }
    }
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            _ => RecordClass::Unknown(RecordClassUnknown(value)),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(value: RecordClass) -> Self {
        match value {
            RecordClass::IN => 1,
            RecordClass::Unknown(RecordClassUnknown(value)) => value,
        }
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordClass {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self::from(u.arbitrary::<u16>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn u8_opcode_roundtrip() {
        for i in 0..15 {
            assert_eq!(u8::from(Opcode::from(i)), i);
        }
    }

    #[test]
    fn u8_rcode_roundtrip() {
        for i in 0..15 {
            assert_eq!(u8::from(Rcode::from(i)), i);
        }
    }

    #[test]
    fn u16_recordtype_roundtrip() {
        for i in 0..100 {
            assert_eq!(u16::from(RecordType::from(i)), i);
        }
    }

    #[test]
    fn u16_recordclass_roundtrip() {
        for i in 0..100 {
            assert_eq!(u16::from(RecordClass::from(i)), i);
        }
    }

    #[test]
    fn recordtype_str_roundtrip() {
        for rtype in [
            RecordType::A,
            RecordType::NS,
            RecordType::CNAME,
            RecordType::PTR,
            RecordType::MX,
        ] {
            assert_eq!(Ok(rtype), rtype.to_string().parse());
        }

        assert!("FOO".parse::<RecordType>().is_err());
    }

    #[test]
    fn domainname_dotted_string_roundtrip() {
        for name in ["www.baidu.com", "root.local", "7.0.0.127.in-addr.arpa"] {
            assert_eq!(
                Some(name.to_string()),
                DomainName::from_dotted_string(name).map(|d| d.to_dotted_string())
            );
        }
    }

    #[test]
    fn domainname_strips_trailing_dot() {
        assert_eq!(
            DomainName::from_dotted_string("www.baidu.com"),
            DomainName::from_dotted_string("www.baidu.com.")
        );
    }

    #[test]
    fn domainname_preserves_case() {
        let upper = domain("WWW.Baidu.COM");
        let lower = domain("www.baidu.com");

        assert_eq!("WWW.Baidu.COM", upper.to_dotted_string());
        assert_ne!(upper, lower);
    }

    #[test]
    fn domainname_rejects_invalid() {
        assert_eq!(None, DomainName::from_dotted_string(""));
        assert_eq!(None, DomainName::from_dotted_string("a..b"));
        assert_eq!(None, DomainName::from_dotted_string(&"x".repeat(64)));

        // 4 * (1 + 63) + 1 = 257 octets encoded
        let long = [
            "x".repeat(63),
            "x".repeat(63),
            "x".repeat(63),
            "x".repeat(63),
        ]
        .join(".");
        assert_eq!(None, DomainName::from_dotted_string(&long));
    }

    #[test]
    fn domainname_wire_len() {
        // 3 "www" 5 "baidu" 3 "com" 0
        assert_eq!(15, domain("www.baidu.com").wire_len());
    }

    #[test]
    fn domainname_suffixes_walk_label_boundaries() {
        let suffixes = domain("www.baidu.com")
            .suffixes()
            .collect::<Vec<DomainName>>();

        assert_eq!(
            vec![domain("www.baidu.com"), domain("baidu.com"), domain("com")],
            suffixes
        );
    }

    #[test]
    fn make_response_preserves_id_and_opcode() {
        let mut request = Message::from_question(
            1234,
            Question {
                name: domain("www.baidu.com"),
                qtype: RecordType::A,
                qclass: RecordClass::IN,
            },
        );
        request.header.opcode = Opcode::Inverse;
        request.header.recursion_desired = true;

        let response = request.make_response();

        assert_eq!(1234, response.header.id);
        assert_eq!(Opcode::Inverse, response.header.opcode);
        assert!(response.header.is_response);
        assert!(!response.header.is_authoritative);
        assert!(!response.header.is_truncated);
        assert!(!response.header.recursion_desired);
        assert!(!response.header.recursion_available);
        assert_eq!(Rcode::NoError, response.header.rcode);
        assert!(response.questions.is_empty());
    }
}

#[cfg(any(feature = "test-util", test))]
pub mod test_util {
    use super::*;

    use arbitrary::{Arbitrary, Unstructured};
    use rand::Rng;

    pub fn arbitrary_resourcerecord() -> ResourceRecord {
        for size in [128, 256, 512, 1024, 2048, 4096] {
            let mut buf = vec![0u8; size];
            rand::thread_rng().fill(&mut buf[..]);

            if let Ok(rr) = ResourceRecord::arbitrary(&mut Unstructured::new(&buf)) {
                return rr;
            }
        }

        panic!("could not generate arbitrary value!");
    }

    pub fn domain(name: &str) -> DomainName {
        DomainName::from_dotted_string(name).unwrap()
    }

    pub fn a_record(name: &str, address: Ipv4Addr) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::A { address },
            rclass: RecordClass::IN,
            ttl: 60,
        }
    }

    pub fn ns_record(superdomain_name: &str, nameserver_name: &str) -> ResourceRecord {
        ResourceRecord {
            name: domain(superdomain_name),
            rtype_with_data: RecordTypeWithData::NS {
                nsdname: domain(nameserver_name),
            },
            rclass: RecordClass::IN,
            ttl: 60,
        }
    }

    pub fn cname_record(name: &str, target_name: &str) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::CNAME {
                cname: domain(target_name),
            },
            rclass: RecordClass::IN,
            ttl: 60,
        }
    }

    pub fn ptr_record(name: &str, pointed_name: &str) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::PTR {
                ptrdname: domain(pointed_name),
            },
            rclass: RecordClass::IN,
            ttl: 60,
        }
    }

    pub fn mx_record(name: &str, preference: u16, exchange_name: &str) -> ResourceRecord {
        ResourceRecord {
            name: domain(name),
            rtype_with_data: RecordTypeWithData::MX {
                preference,
                exchange: domain(exchange_name),
            },
            rclass: RecordClass::IN,
            ttl: 60,
        }
    }
}
