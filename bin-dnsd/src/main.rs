use clap::Parser;
use std::env;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use tokio::net::{TcpListener, UdpSocket};
use tracing_subscriber::EnvFilter;

use dns_server::authoritative;
use dns_server::cache::SharedCache;
use dns_server::net::{read_tcp_message, send_tcp_message, MAX_MESSAGE_SIZE};
use dns_server::recursive::{self, ResolverConfig};
use dns_wire::protocol::types::*;
use dns_wire::zones::types::{Zone, ZoneSet};

/// Which server of the simulated hierarchy this process is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Role {
    Local,
    Root,
    S1,
    S2,
    S3,
    S4,
}

impl Role {
    /// The loopback address this role binds.  Each server of the
    /// simulated hierarchy gets its own address so they can all
    /// coexist on one host.
    fn address(self) -> Ipv4Addr {
        match self {
            Role::Local => Ipv4Addr::new(127, 0, 0, 2),
            Role::Root => Ipv4Addr::new(127, 0, 0, 7),
            Role::S1 => Ipv4Addr::new(127, 0, 0, 3),
            Role::S2 => Ipv4Addr::new(127, 0, 0, 4),
            Role::S3 => Ipv4Addr::new(127, 0, 0, 5),
            Role::S4 => Ipv4Addr::new(127, 0, 0, 6),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Role::Local => "local",
            Role::Root => "root",
            Role::S1 => "s1",
            Role::S2 => "s2",
            Role::S3 => "s3",
            Role::S4 => "s4",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Role::Local),
            "root" => Ok(Role::Root),
            "s1" => Ok(Role::S1),
            "s2" => Ok(Role::S2),
            "s3" => Ok(Role::S3),
            "s4" => Ok(Role::S4),
            _ => Err(format!(
                "invalid server role '{s}', supported roles: local, root, s1, s2, s3, s4"
            )),
        }
    }
}

// the doc comments for this struct turn into the CLI help text
#[derive(Debug, Parser)]
/// One server of the simulated DNS hierarchy.
///
/// The `local` role is a recursive resolver: it answers stub queries
/// over TCP, walking the delegation chain from the root server and
/// caching what it learns.  Every other role is an authoritative
/// server answering over UDP, bound to its own loopback address and
/// backed by its own zone table.
///
/// A server handles one request at a time, to completion, before
/// accepting the next.
struct Args {
    /// Server role: local, root, s1, s2, s3 or s4
    #[clap(value_parser)]
    role: Role,

    /// Port to serve DNS on (and to query other servers on)
    #[clap(short, long, value_parser, default_value_t = 53)]
    port: u16,

    /// Address of the root nameserver the local resolver starts its
    /// iteration from
    #[clap(long, value_parser, default_value_t = Ipv4Addr::new(127, 0, 0, 7))]
    root_address: Ipv4Addr,

    /// Upper bound on the nameservers queried for one question
    #[clap(long, value_parser, default_value_t = 16)]
    max_referrals: usize,

    /// How many records to hold in the cache
    #[clap(short = 's', long, value_parser, default_value_t = 512)]
    cache_size: usize,

    /// Path to a zone table to serve instead of the built-in one
    #[clap(short, long, value_parser)]
    zone_file: Option<PathBuf>,
}

fn begin_logging() {
    let log_format = env::var("RUST_LOG_FORMAT").unwrap_or_default();
    let no_ansi = log_format.split(',').any(|s| s == "no-ansi");
    let no_time = log_format.split(',').any(|s| s == "no-time");

    let logger = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(!no_ansi);

    if no_time {
        logger.without_time().init();
    } else {
        logger.init();
    }
}

/// Decode a request, screening out messages this server cannot act
/// on.  `Err` carries the error response to send, if the id could be
/// read.
fn screen_request(octets: &[u8]) -> Result<Message, Option<Message>> {
    match Message::from_octets(octets) {
        Ok(msg) if msg.header.is_response => {
            tracing::warn!(id = msg.header.id, "dropping message with QR set");
            Err(Some(Message::make_format_error_response(msg.header.id)))
        }
        Ok(msg) => {
            if msg.header.opcode != Opcode::Standard {
                // inverse queries and status requests decode fine and
                // are answered as standard queries
                tracing::debug!(opcode = %msg.header.opcode, "treating as standard query");
            }
            Ok(msg)
        }
        Err(error) => {
            tracing::warn!(?error, "could not decode request");
            Err(error.id().map(Message::make_format_error_response))
        }
    }
}

fn load_zone(role: Role, args: &Args) -> Zone {
    if let Some(path) = &args.zone_file {
        let rows = match std::fs::read_to_string(path) {
            Ok(rows) => rows,
            Err(error) => {
                tracing::error!(?error, ?path, "could not read zone file");
                process::exit(1);
            }
        };
        match Zone::from_rows(role.name(), &rows) {
            Ok(zone) => zone,
            Err(error) => {
                tracing::error!(%error, ?path, "could not parse zone file");
                process::exit(1);
            }
        }
    } else {
        let zones = ZoneSet::simulation();
        match zones.get(role.name()) {
            Some(zone) => zone.clone(),
            None => {
                tracing::error!(role = %role, "no built-in zone table for role");
                process::exit(1);
            }
        }
    }
}

async fn serve_authoritative(role: Role, args: &Args) {
    let zone = load_zone(role, args);
    let address = SocketAddr::from((role.address(), args.port));

    tracing::info!(%address, role = %role, "binding DNS UDP socket");
    let socket = match UdpSocket::bind(address).await {
        Ok(socket) => socket,
        Err(error) => {
            tracing::error!(?error, %address, "could not bind DNS UDP socket");
            process::exit(1);
        }
    };

    // one datagram at a time: a request is processed to completion
    // before the next is picked up
    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    loop {
        let (size, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(error) => {
                tracing::debug!(?error, "UDP recv error");
                continue;
            }
        };
        tracing::debug!(?peer, size, "UDP request");

        let response = match screen_request(&buf[..size]) {
            Ok(request) => Some(authoritative::respond(&zone, &request)),
            Err(response) => response,
        };

        if let Some(response) = response {
            match response.into_octets() {
                Ok(octets) => {
                    if octets.len() > MAX_MESSAGE_SIZE {
                        tracing::warn!(
                            length = octets.len(),
                            "response exceeds the transport size limit"
                        );
                    }
                    if let Err(error) = socket.send_to(&octets, peer).await {
                        tracing::debug!(?peer, ?error, "UDP send error");
                    }
                }
                Err(error) => tracing::warn!(?error, "could not serialise response"),
            }
        }
    }
}

async fn serve_local(args: &Args) {
    let config = ResolverConfig {
        root_address: SocketAddr::from((args.root_address, args.port)),
        max_referrals: args.max_referrals,
    };
    let cache = SharedCache::with_desired_size(std::cmp::max(1, args.cache_size));
    let address = SocketAddr::from((Role::Local.address(), args.port));

    tracing::info!(%address, root = %config.root_address, "binding DNS TCP socket");
    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(?error, %address, "could not bind DNS TCP socket");
            process::exit(1);
        }
    };

    // each connection carries exactly one exchange, finished before
    // the next accept
    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::debug!(?error, "TCP accept error");
                continue;
            }
        };
        tracing::debug!(?peer, "TCP request");

        let response = match read_tcp_message(&mut stream).await {
            Ok(bytes) => match screen_request(bytes.as_ref()) {
                Ok(request) => Some(recursive::respond(&config, &cache, &request).await),
                Err(response) => response,
            },
            Err(error) => {
                tracing::debug!(?peer, ?error, "TCP read error");
                error.id().map(Message::make_format_error_response)
            }
        };

        if let Some(response) = response {
            match response.into_octets() {
                Ok(octets) => {
                    if let Err(error) = send_tcp_message(&mut stream, &octets).await {
                        tracing::debug!(?peer, ?error, "TCP send error");
                    }
                }
                Err(error) => tracing::warn!(?error, "could not serialise response"),
            }
        }

        let (expired, evicted, size) = cache.prune();
        if expired > 0 || evicted > 0 {
            tracing::info!(expired, evicted, size, "pruned cache");
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    begin_logging();

    match args.role {
        Role::Local => serve_local(&args).await,
        role => serve_authoritative(role, &args).await,
    }
}
