//! Low-level DNS wire operations: standard Do53 UDP queries carrying an
//! EDNS0 client-subnet option, and zone transfers (AXFR) over TCP. Built
//! directly against wire-format request/response types rather than a
//! high-level stub resolver, since both need raw Rcode access and (for
//! queries) a hand-attached EDNS0 option the high-level resolver API has no
//! hook for.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use trust_dns_resolver::proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use trust_dns_resolver::proto::rr::rdata::opt::{ClientSubnet, EdnsOption};
use trust_dns_resolver::proto::rr::{DNSClass, Name, RData, Record, RecordType};
use trust_dns_resolver::proto::serialize::binary::{BinDecodable, BinEncodable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use crate::error::{ResolverError, ResolverResult};

/// Read deadline for a single AXFR TCP read, per the wire-protocol section:
/// "AXFR over TCP with a 10s read deadline".
pub const AXFR_READ_DEADLINE: Duration = Duration::from_secs(10);

/// Deadline for a single Do53 UDP exchange.
pub const QUERY_DEADLINE: Duration = Duration::from_secs(1);

/// The EDNS0 client-subnet option this pool always sends: `0.0.0.0/0`, i.e.
/// "don't personalize the answer to a client address" per §4.3/§6.
fn client_subnet_option() -> EdnsOption {
    EdnsOption::Subnet(ClientSubnet::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0, 0))
}

fn build_query(name: &str, qtype: RecordType) -> ResolverResult<Message> {
    let parsed = Name::from_ascii(name).map_err(|e| ResolverError::Other(anyhow::anyhow!(e)))?;
    let mut query = Query::query(parsed, qtype);
    query.set_query_class(DNSClass::IN);

    let mut edns = Edns::new();
    edns.set_max_payload(4096);
    edns.set_version(0);
    edns.options_mut().insert(client_subnet_option());

    let mut message = Message::new();
    message.set_id(rand::random());
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.set_edns(edns);
    message.add_query(query);
    Ok(message)
}

/// Performs a single Do53 UDP query against `server`, returning the string
/// form of every answer RDATA. NXDOMAIN and other non-success Rcodes are
/// classified the same way the resolver's qtype retry table expects: an
/// authoritative negative is terminal, anything else is retryable.
pub async fn resolve(server: SocketAddr, name: &str, qtype: RecordType) -> ResolverResult<Vec<String>> {
    let message = build_query(name, qtype)?;
    let bytes = message
        .to_bytes()
        .map_err(|e| ResolverError::Other(anyhow::anyhow!(e)))?;

    let local_addr: SocketAddr = if server.is_ipv4() {
        "0.0.0.0:0".parse().unwrap()
    } else {
        "[::]:0".parse().unwrap()
    };
    let socket = UdpSocket::bind(local_addr)
        .await
        .map_err(|e| ResolverError::TransientNetwork {
            server: server.to_string(),
            source: e.into(),
        })?;
    socket
        .connect(server)
        .await
        .map_err(|e| ResolverError::TransientNetwork {
            server: server.to_string(),
            source: e.into(),
        })?;
    socket
        .send(&bytes)
        .await
        .map_err(|e| ResolverError::TransientNetwork {
            server: server.to_string(),
            source: e.into(),
        })?;

    let mut buf = [0u8; 4096];
    let n = timeout(QUERY_DEADLINE, socket.recv(&mut buf))
        .await
        .map_err(|_| ResolverError::TransientNetwork {
            server: server.to_string(),
            source: anyhow::anyhow!("query timed out"),
        })?
        .map_err(|e| ResolverError::TransientNetwork {
            server: server.to_string(),
            source: e.into(),
        })?;

    let response = Message::from_bytes(&buf[..n]).map_err(|_| ResolverError::Protocol {
        server: server.to_string(),
    })?;

    match response.response_code() {
        ResponseCode::NoError => Ok(response
            .answers()
            .iter()
            .filter_map(|r| r.data())
            .map(|d| d.to_string())
            .collect()),
        ResponseCode::NXDomain => Err(ResolverError::AuthoritativeNegative {
            name: name.to_string(),
            rcode: "NXDomain".to_string(),
        }),
        other => Err(ResolverError::TransientNetwork {
            server: server.to_string(),
            source: anyhow::anyhow!("server returned {other:?}"),
        }),
    }
}

async fn write_framed(stream: &mut TcpStream, message: &Message) -> ResolverResult<()> {
    let bytes = message
        .to_bytes()
        .map_err(|e| ResolverError::Other(anyhow::anyhow!(e)))?;
    let len = u16::try_from(bytes.len())
        .map_err(|_| ResolverError::Other(anyhow::anyhow!("AXFR query too large to frame")))?;
    stream.write_all(&len.to_be_bytes()).await.map_err(|e| {
        ResolverError::TransientNetwork {
            server: stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_default(),
            source: e.into(),
        }
    })?;
    stream
        .write_all(&bytes)
        .await
        .map_err(|e| ResolverError::TransientNetwork {
            server: stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_default(),
            source: e.into(),
        })
}

async fn read_framed(stream: &mut TcpStream) -> ResolverResult<Option<Message>> {
    let mut len_buf = [0u8; 2];
    let read = timeout(AXFR_READ_DEADLINE, stream.read_exact(&mut len_buf)).await;
    let n = match read {
        Ok(Ok(n)) => n,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Ok(Err(e)) => {
            return Err(ResolverError::TransientNetwork {
                server: stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
                source: e.into(),
            })
        }
        Err(_) => {
            return Err(ResolverError::TransientNetwork {
                server: stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
                source: anyhow::anyhow!("AXFR read timed out"),
            })
        }
    };
    if n == 0 {
        return Ok(None);
    }
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    timeout(AXFR_READ_DEADLINE, stream.read_exact(&mut buf))
        .await
        .map_err(|_| ResolverError::TransientNetwork {
            server: stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_default(),
            source: anyhow::anyhow!("AXFR read timed out"),
        })?
        .map_err(|e| ResolverError::TransientNetwork {
            server: stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_default(),
            source: e.into(),
        })?;
    match Message::from_bytes(&buf) {
        Ok(message) => Ok(Some(message)),
        Err(_) => Err(ResolverError::Protocol {
            server: stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_default(),
        }),
    }
}

/// Performs an AXFR against `server` for `zone`, returning every owner name
/// seen in the transferred records. The transfer ends at the second SOA
/// record per RFC 5936.
pub async fn axfr(server: SocketAddr, zone: &str) -> ResolverResult<Vec<String>> {
    let name = Name::from_ascii(zone).map_err(|e| ResolverError::Other(anyhow::anyhow!(e)))?;

    let mut query = Query::query(name, RecordType::AXFR);
    query.set_query_class(trust_dns_resolver::proto::rr::DNSClass::IN);
    let mut message = Message::new();
    message.set_id(rand::random());
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(false);
    message.add_query(query);

    let mut stream = TcpStream::connect(server)
        .await
        .map_err(|e| ResolverError::TransientNetwork {
            server: server.to_string(),
            source: e.into(),
        })?;

    write_framed(&mut stream, &message).await?;

    let mut names = Vec::new();
    let mut soa_count = 0;
    loop {
        let response = match read_framed(&mut stream).await? {
            Some(m) => m,
            None => break,
        };
        for record in response.answers() {
            names.push(owner_names(record));
            if matches!(record.record_type(), RecordType::SOA) {
                soa_count += 1;
            }
            if let Some(RData::CNAME(target)) = record.data() {
                names.push(target.to_utf8());
            }
        }
        if soa_count >= 2 {
            break;
        }
    }

    Ok(names)
}

fn owner_names(record: &Record) -> String {
    record.name().to_utf8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_names_strips_nothing_unexpected() {
        let name = Name::from_ascii("ns1.example.com.").unwrap();
        let record = Record::from_rdata(name, 300, RData::A(std::net::Ipv4Addr::LOCALHOST.into()));
        assert_eq!(owner_names(&record), "ns1.example.com.");
    }

    #[test]
    fn built_query_carries_the_client_subnet_option() {
        let message = build_query("example.com.", RecordType::A).unwrap();
        let edns = message.edns().expect("edns attached");
        assert!(edns.options().get(trust_dns_resolver::proto::rr::rdata::opt::EdnsCode::Subnet).is_some());
    }
}
