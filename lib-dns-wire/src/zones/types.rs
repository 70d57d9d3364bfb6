//! Authoritative zone data.
//!
//! A zone is a flat table of records with a textual RDATA column:
//! dotted-quad for `A`, a domain name for `NS`/`CNAME`/`PTR`, and
//! `"<preference>,<exchange>"` for `MX`.  Each authoritative server
//! role serves exactly one zone table.

use std::collections::HashMap;
use std::fmt;

use crate::protocol::types::*;

/// A set of zone tables, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct ZoneSet {
    zones: HashMap<String, Zone>,
}

impl ZoneSet {
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
        }
    }

    /// Create or replace a zone.
    pub fn insert(&mut self, zone: Zone) {
        self.zones.insert(zone.name().to_string(), zone);
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    /// The zone tables the simulated hierarchy is seeded with: a root
    /// zone delegating to four servers, two referral-only zones, and
    /// two leaf zones with the actual host records.
    pub fn simulation() -> Self {
        let mut zones = Self::new();
        for (name, rows) in [
            ("root", ROOT_ROWS),
            ("s1", S1_ROWS),
            ("s2", S2_ROWS),
            ("s3", S3_ROWS),
            ("s4", S4_ROWS),
        ] {
            // the embedded tables are well-formed by construction
            zones.insert(Zone::from_rows(name, rows).expect("invalid built-in zone table"));
        }
        zones
    }
}

const ROOT_ROWS: &str = "
cn                      60 IN NS    ns1.local
us                      60 IN NS    ns1.local
baidu.com               60 IN NS    ns2.local
code.org                60 IN NS    ns2.local
ns1.local               60 IN A     127.0.0.3
ns2.local               60 IN A     127.0.0.4
in-addr.arpa            60 IN NS    ns4.local
ns4.local               60 IN A     127.0.0.6
";

const S1_ROWS: &str = "
edu.cn                  60 IN NS    ns3.local
co.us                   60 IN NS    ns4.local
ns3.local               60 IN A     127.0.0.5
ns4.local               60 IN A     127.0.0.6
";

const S2_ROWS: &str = "
www.baidu.com           60 IN CNAME www.a.shifen.com
www.a.shifen.com        60 IN A     14.215.177.38
www.a.shifen.com        60 IN A     14.215.177.39
tieba.baidu.com         60 IN CNAME post.n.shifen.com
post.n.shifen.com       60 IN A     14.215.177.221
code.org                60 IN A     99.84.57.215
studio.code.org         60 IN A     13.227.51.203
";

const S3_ROWS: &str = "
bupt.edu.cn             60 IN MX    3,mx.bupt.edu.cn
mx.bupt.edu.cn          60 IN A     183.3.235.87
www.bupt.edu.cn         60 IN CNAME vn64.bupt.edu.cn
vn64.bupt.edu.cn        60 IN A     211.68.69.240
";

const S4_ROWS: &str = "
ci.craig.co.us          60 IN A     50.28.0.27
ci.golden.co.us         60 IN A     66.241.70.19
2.0.0.127.in-addr.arpa  60 IN PTR   local.local
3.0.0.127.in-addr.arpa  60 IN PTR   s1.local
4.0.0.127.in-addr.arpa  60 IN PTR   s2.local
5.0.0.127.in-addr.arpa  60 IN PTR   s3.local
6.0.0.127.in-addr.arpa  60 IN PTR   s4.local
7.0.0.127.in-addr.arpa  60 IN PTR   root.local
";

/// One zone table.  Records keep their insertion order, which is also
/// the order lookups return them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    name: String,
    records: Vec<ResourceRecord>,
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, record: ResourceRecord) {
        self.records.push(record);
    }

    /// Parse a zone table from its row form: one record per line,
    /// whitespace-separated `name ttl class type rdata` fields, `#`
    /// starting a comment.  Types and classes can be given as
    /// mnemonics or as their numeric values.
    pub fn from_rows(name: &str, rows: &str) -> Result<Self, RowError> {
        let mut zone = Self::new(name);

        for (index, full_line) in rows.lines().enumerate() {
            let line = full_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            zone.insert(parse_row(index + 1, line)?);
        }

        Ok(zone)
    }

    /// Every record whose name matches exactly (case matters) and
    /// whose class matches.  The type has to match exactly too,
    /// except that `include_cname` also lets CNAME records through.
    pub fn lookup(
        &self,
        name: &DomainName,
        rtype: RecordType,
        rclass: RecordClass,
        include_cname: bool,
    ) -> Vec<ResourceRecord> {
        self.records
            .iter()
            .filter(|rr| {
                let matches_type = rr.rtype_with_data.rtype() == rtype
                    || (include_cname && rr.rtype_with_data.rtype() == RecordType::CNAME);
                rr.name == *name && rr.rclass == rclass && matches_type
            })
            .cloned()
            .collect()
    }
}

fn parse_row(line: usize, row: &str) -> Result<ResourceRecord, RowError> {
    let fields = row.split_whitespace().collect::<Vec<&str>>();
    let &[name, ttl, rclass, rtype, rdata] = fields.as_slice() else {
        return Err(RowError::Fields { line });
    };

    let name = DomainName::from_dotted_string(name).ok_or(RowError::Name { line })?;
    let ttl = ttl.parse::<u32>().map_err(|_| RowError::Ttl { line })?;

    let rclass = match rclass {
        "IN" => RecordClass::IN,
        _ => RecordClass::from(rclass.parse::<u16>().map_err(|_| RowError::Class { line })?),
    };

    let rtype = match rtype.parse::<RecordType>() {
        Ok(rtype) => rtype,
        Err(_) => RecordType::from(rtype.parse::<u16>().map_err(|_| RowError::Type { line })?),
    };

    let rtype_with_data = parse_rdata(line, rtype, rdata)?;

    Ok(ResourceRecord {
        name,
        rtype_with_data,
        rclass,
        ttl,
    })
}

fn parse_rdata(line: usize, rtype: RecordType, rdata: &str) -> Result<RecordTypeWithData, RowError> {
    match rtype {
        RecordType::A => Ok(RecordTypeWithData::A {
            address: rdata.parse().map_err(|_| RowError::Rdata { line })?,
        }),
        RecordType::NS => Ok(RecordTypeWithData::NS {
            nsdname: DomainName::from_dotted_string(rdata).ok_or(RowError::Rdata { line })?,
        }),
        RecordType::CNAME => Ok(RecordTypeWithData::CNAME {
            cname: DomainName::from_dotted_string(rdata).ok_or(RowError::Rdata { line })?,
        }),
        RecordType::PTR => Ok(RecordTypeWithData::PTR {
            ptrdname: DomainName::from_dotted_string(rdata).ok_or(RowError::Rdata { line })?,
        }),
        RecordType::MX => {
            let (preference, exchange) = rdata.split_once(',').ok_or(RowError::Rdata { line })?;
            Ok(RecordTypeWithData::MX {
                preference: preference.parse().map_err(|_| RowError::Rdata { line })?,
                exchange: DomainName::from_dotted_string(exchange)
                    .ok_or(RowError::Rdata { line })?,
            })
        }
        RecordType::Unknown(_) => Err(RowError::Type { line }),
    }
}

/// The textual RDATA column for a record, the inverse of the row
/// parser.
pub fn rdata_row(rtype_with_data: &RecordTypeWithData) -> String {
    match rtype_with_data {
        RecordTypeWithData::A { address } => address.to_string(),
        RecordTypeWithData::NS { nsdname } => nsdname.to_dotted_string(),
        RecordTypeWithData::CNAME { cname } => cname.to_dotted_string(),
        RecordTypeWithData::PTR { ptrdname } => ptrdname.to_dotted_string(),
        RecordTypeWithData::MX {
            preference,
            exchange,
        } => format!("{preference},{}", exchange.to_dotted_string()),
        RecordTypeWithData::Unknown { octets, .. } => format!("\\# {}", octets.len()),
    }
}

/// Errors encountered when parsing a zone table row.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RowError {
    /// A row does not have exactly five fields.
    Fields { line: usize },

    /// The name field is not a valid domain name.
    Name { line: usize },

    /// The TTL field is not an integer.
    Ttl { line: usize },

    /// The class field is neither a mnemonic nor a number.
    Class { line: usize },

    /// The type field is neither a supported mnemonic nor a number,
    /// or names a type whose RDATA cannot be interpreted.
    Type { line: usize },

    /// The RDATA field does not match the record type.
    Rdata { line: usize },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RowError::Fields { line } => write!(f, "line {line}: expected five fields"),
            RowError::Name { line } => write!(f, "line {line}: invalid domain name"),
            RowError::Ttl { line } => write!(f, "line {line}: invalid TTL"),
            RowError::Class { line } => write!(f, "line {line}: invalid class"),
            RowError::Type { line } => write!(f, "line {line}: unsupported record type"),
            RowError::Rdata { line } => write!(f, "line {line}: invalid RDATA"),
        }
    }
}

impl std::error::Error for RowError {}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::protocol::types::test_util::*;

    #[test]
    fn lookup_matches_name_and_type() {
        let zones = ZoneSet::simulation();
        let s2 = zones.get("s2").unwrap();

        assert_eq!(
            vec![
                a_record("www.a.shifen.com", Ipv4Addr::new(14, 215, 177, 38)),
                a_record("www.a.shifen.com", Ipv4Addr::new(14, 215, 177, 39)),
            ],
            s2.lookup(
                &domain("www.a.shifen.com"),
                RecordType::A,
                RecordClass::IN,
                false
            )
        );

        assert!(s2
            .lookup(&domain("www.baidu.com"), RecordType::A, RecordClass::IN, false)
            .is_empty());
    }

    #[test]
    fn lookup_include_cname() {
        let zones = ZoneSet::simulation();
        let s2 = zones.get("s2").unwrap();

        assert_eq!(
            vec![cname_record("www.baidu.com", "www.a.shifen.com")],
            s2.lookup(&domain("www.baidu.com"), RecordType::A, RecordClass::IN, true)
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let zones = ZoneSet::simulation();
        let s2 = zones.get("s2").unwrap();

        assert!(s2
            .lookup(
                &domain("WWW.BAIDU.COM"),
                RecordType::A,
                RecordClass::IN,
                true
            )
            .is_empty());
    }

    #[test]
    fn parses_mx_rows() {
        let zones = ZoneSet::simulation();
        let s3 = zones.get("s3").unwrap();

        assert_eq!(
            vec![mx_record("bupt.edu.cn", 3, "mx.bupt.edu.cn")],
            s3.lookup(&domain("bupt.edu.cn"), RecordType::MX, RecordClass::IN, false)
        );
    }

    #[test]
    fn parses_numeric_type_and_class() {
        let zone = Zone::from_rows("test", "www.baidu.com 60 1 5 www.a.shifen.com").unwrap();

        assert_eq!(
            vec![cname_record("www.baidu.com", "www.a.shifen.com")],
            zone.lookup(
                &domain("www.baidu.com"),
                RecordType::CNAME,
                RecordClass::IN,
                false
            )
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let zone = Zone::from_rows(
            "test",
            "# a comment\n\nwww.baidu.com 60 IN A 1.2.3.4 # trailing comment\n",
        )
        .unwrap();

        assert_eq!(
            vec![a_record("www.baidu.com", Ipv4Addr::new(1, 2, 3, 4))],
            zone.lookup(&domain("www.baidu.com"), RecordType::A, RecordClass::IN, false)
        );
    }

    #[test]
    fn rejects_malformed_rows() {
        assert_eq!(
            Err(RowError::Fields { line: 1 }),
            Zone::from_rows("test", "www.baidu.com 60 IN A").map(|_| ())
        );
        assert_eq!(
            Err(RowError::Rdata { line: 1 }),
            Zone::from_rows("test", "www.baidu.com 60 IN A not-an-address").map(|_| ())
        );
        assert_eq!(
            Err(RowError::Rdata { line: 1 }),
            Zone::from_rows("test", "bupt.edu.cn 60 IN MX mx.bupt.edu.cn").map(|_| ())
        );
        assert_eq!(
            Err(RowError::Type { line: 1 }),
            Zone::from_rows("test", "www.baidu.com 60 IN TXT hello").map(|_| ())
        );
    }

    #[test]
    fn rdata_row_roundtrip() {
        for (rtype, rdata) in [
            (RecordType::A, "14.215.177.38"),
            (RecordType::NS, "ns2.local"),
            (RecordType::CNAME, "www.a.shifen.com"),
            (RecordType::PTR, "root.local"),
            (RecordType::MX, "3,mx.bupt.edu.cn"),
        ] {
            let parsed = parse_rdata(1, rtype, rdata).unwrap();
            assert_eq!(rdata, rdata_row(&parsed));
        }
    }
}
