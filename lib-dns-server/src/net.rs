//! Socket plumbing: length-prefixed TCP framing and the UDP/TCP
//! client sides used to query nameservers.

use bytes::BytesMut;
use rand::Rng;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use dns_wire::protocol::types::*;

/// The largest message this system sends or receives, over either
/// transport.  Larger responses are sent anyway, with a warning: TC
/// is never set.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// How long to wait for a reply from an upstream nameserver before
/// giving up on it.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Read a DNS message from a TCP stream.
///
/// A DNS TCP message is slightly different to a DNS UDP message: it
/// has a big-endian u16 prefix giving the total length of the
/// message.  This is redundant (the header says how many fields
/// there are, and the fields contain length information), but it
/// means the entire message can be read before parsing begins.
pub async fn read_tcp_message(stream: &mut TcpStream) -> Result<BytesMut, TcpError> {
    match stream.read_u16().await {
        Ok(size) => {
            let expected = size as usize;
            let mut bytes = BytesMut::with_capacity(expected);
            while bytes.len() < expected {
                match stream.read_buf(&mut bytes).await {
                    Ok(0) => {
                        return Err(TcpError::TooShort {
                            id: id_from_prefix(&bytes),
                            expected,
                            actual: bytes.len(),
                        });
                    }
                    Err(error) => {
                        return Err(TcpError::IO {
                            id: id_from_prefix(&bytes),
                            error,
                        });
                    }
                    _ => (),
                }
            }
            Ok(bytes)
        }
        Err(error) => Err(TcpError::IO { id: None, error }),
    }
}

/// Write a DNS message to a TCP stream, prefixed with its length as a
/// big-endian u16.
pub async fn send_tcp_message(stream: &mut TcpStream, octets: &[u8]) -> Result<(), io::Error> {
    if octets.len() > MAX_MESSAGE_SIZE {
        tracing::warn!(length = octets.len(), "message exceeds the transport size limit");
    }

    let len = u16::try_from(octets.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "message too long for framing"))?;

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(octets).await?;

    Ok(())
}

/// An error that can occur when reading a DNS TCP message.  The id,
/// when one could be read, lets the server answer with FORMERR.
#[derive(Debug)]
pub enum TcpError {
    TooShort {
        id: Option<u16>,
        expected: usize,
        actual: usize,
    },
    IO {
        id: Option<u16>,
        error: io::Error,
    },
}

impl TcpError {
    pub fn id(&self) -> Option<u16> {
        match self {
            TcpError::TooShort { id, .. } | TcpError::IO { id, .. } => *id,
        }
    }
}

fn id_from_prefix(bytes: &BytesMut) -> Option<u16> {
    if bytes.len() >= 2 {
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    } else {
        None
    }
}

/// Send one question to a nameserver over UDP and wait for its reply.
///
/// Any failure - socket errors, the receive timeout, an undecodable
/// reply, or a reply that does not match the query - comes back as
/// `None`: the caller moves on to its next nameserver.
pub async fn query_nameserver_udp(address: SocketAddr, question: &Question) -> Option<Message> {
    let request = Message::from_question(rand::thread_rng().gen(), question.clone());
    let id = request.header.id;

    let octets = match request.into_octets() {
        Ok(octets) => octets,
        Err(error) => {
            tracing::warn!(?error, "could not serialise query");
            return None;
        }
    };

    match timeout(UPSTREAM_TIMEOUT, exchange_udp(address, &octets)).await {
        Ok(Some(reply)) => {
            if reply_matches(id, &reply) {
                Some(reply)
            } else {
                tracing::warn!(%address, "reply does not match query");
                None
            }
        }
        Ok(None) => None,
        Err(_) => {
            tracing::debug!(%address, "nameserver timed out");
            None
        }
    }
}

async fn exchange_udp(address: SocketAddr, octets: &[u8]) -> Option<Message> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect(address).await.ok()?;
    socket.send(octets).await.ok()?;

    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    let size = socket.recv(&mut buf).await.ok()?;

    match Message::from_octets(&buf[..size]) {
        Ok(reply) => Some(reply),
        Err(error) => {
            tracing::warn!(%address, ?error, "could not decode reply");
            None
        }
    }
}

/// Send one question to a nameserver over TCP and wait for its reply.
/// This is how the lookup client reaches the local resolver; each
/// connection carries exactly one exchange.
pub async fn query_nameserver_tcp(address: SocketAddr, question: &Question) -> Option<Message> {
    let request = Message::from_question(rand::thread_rng().gen(), question.clone());
    let id = request.header.id;

    let octets = match request.into_octets() {
        Ok(octets) => octets,
        Err(error) => {
            tracing::warn!(?error, "could not serialise query");
            return None;
        }
    };

    match timeout(UPSTREAM_TIMEOUT, exchange_tcp(address, &octets)).await {
        Ok(Some(reply)) => {
            if reply_matches(id, &reply) {
                Some(reply)
            } else {
                tracing::warn!(%address, "reply does not match query");
                None
            }
        }
        Ok(None) => None,
        Err(_) => {
            tracing::debug!(%address, "nameserver timed out");
            None
        }
    }
}

async fn exchange_tcp(address: SocketAddr, octets: &[u8]) -> Option<Message> {
    let mut stream = TcpStream::connect(address).await.ok()?;
    send_tcp_message(&mut stream, octets).await.ok()?;
    let bytes = read_tcp_message(&mut stream).await.ok()?;

    match Message::from_octets(bytes.as_ref()) {
        Ok(reply) => Some(reply),
        Err(error) => {
            tracing::warn!(%address, ?error, "could not decode reply");
            None
        }
    }
}

/// A reply is only usable if it is actually a response and carries
/// the transaction id of the query.
fn reply_matches(id: u16, reply: &Message) -> bool {
    reply.header.id == id && reply.header.is_response
}
