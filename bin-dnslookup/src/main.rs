use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::process;

use dns_server::net::query_nameserver_tcp;
use dns_wire::protocol::types::*;
use dns_wire::zones::types::rdata_row;

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// DNS lookup utility for the simulated hierarchy.
///
/// Sends a single question to the local recursive resolver over TCP
/// and prints the sections of its reply.  For PTR queries the name is
/// given as an IPv4 address, which is reversed and suffixed with
/// `.in-addr.arpa` automatically.
struct Args {
    /// Domain name to look up, or an IPv4 address for PTR queries
    #[clap(value_parser)]
    name: String,

    /// Query type: A, NS, MX, CNAME or PTR
    #[clap(value_parser)]
    qtype: RecordType,

    /// Resolver to send the query to
    #[clap(long, value_parser, default_value = "127.0.0.2:53")]
    server: SocketAddr,
}

/// The question name: as given, except that PTR queries take an IPv4
/// address to be reversed into its `in-addr.arpa` form.
fn question_name(args: &Args) -> Option<DomainName> {
    if args.qtype == RecordType::PTR {
        let address: Ipv4Addr = args.name.parse().ok()?;
        let [a, b, c, d] = address.octets();
        DomainName::from_dotted_string(&format!("{d}.{c}.{b}.{a}.in-addr.arpa"))
    } else {
        DomainName::from_dotted_string(&args.name)
    }
}

fn print_rr(rr: &ResourceRecord) {
    let rdata = rdata_row(&rr.rtype_with_data);
    match rr.rtype_with_data.rtype() {
        RecordType::A => println!("{:>16}  internet address = {rdata}", rr.name),
        RecordType::NS => println!("{:>16}  nameserver = {rdata}", rr.name),
        RecordType::CNAME => println!("{:>16}  canonical name = {rdata}", rr.name),
        RecordType::PTR => println!("{:>16}  name = {rdata}", rr.name),
        RecordType::MX => println!("{:>16}  mail exchanger = {rdata}", rr.name),
        RecordType::Unknown(_) => println!("{:>16}  {rdata}", rr.name),
    }
}

fn print_section(heading: &str, rrs: &[ResourceRecord]) {
    if rrs.is_empty() {
        return;
    }

    println!("{heading}:");
    for rr in rrs {
        print_rr(rr);
    }
    println!();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let Some(name) = question_name(&args) else {
        if args.qtype == RecordType::PTR {
            eprintln!("expected an IPv4 address for a PTR query, got '{}'", args.name);
        } else {
            eprintln!("invalid domain name '{}'", args.name);
        }
        process::exit(1);
    };

    println!("Server:          {}", args.server.ip());
    println!("Address:         {}#{}", args.server.ip(), args.server.port());
    println!();

    let question = Question {
        name,
        qtype: args.qtype,
        qclass: RecordClass::IN,
    };

    let Some(response) = query_nameserver_tcp(args.server, &question).await else {
        eprintln!("query failed: no usable reply from {}", args.server);
        process::exit(1);
    };

    if response.header.rcode != Rcode::NoError {
        eprintln!(
            "query failed: {} ({})",
            response.header.rcode,
            u8::from(response.header.rcode)
        );
        process::exit(1);
    }

    print_section("Answers", &response.answers);
    print_section("Authoritative nameservers", &response.authority);
    print_section("Additional records", &response.additional);
}
