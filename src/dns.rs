//! DNS resolution against explicit upstream servers.
//!
//! Every lookup fans out A and AAAA queries over plain UDP to all configured
//! upstreams at once and unions whatever comes back. An upstream that times
//! out, fails or answers with an error code simply contributes nothing; a
//! domain only resolves to an empty set when no upstream answered.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use hickory_proto::serialize::binary::BinEncodable;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};

/// Quad9 (filtered and unfiltered) and Mullvad.
pub const DEFAULT_UPSTREAMS: &[&str] = &["9.9.9.9:53", "9.9.9.10:53", "194.242.2.2:53"];

/// Default per-query timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// EDNS0-sized receive buffer
const RECV_BUFFER_SIZE: usize = 4096;

/// UDP payload size advertised in the OPT record
const EDNS_PAYLOAD_SIZE: u16 = 4096;

/// Resolves a domain to the set of addresses it currently points at.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `domain`, returning addresses in first-seen order without
    /// duplicates. Never fails: unreachable upstreams yield an empty list.
    async fn resolve(&self, domain: &str) -> Vec<IpAddr>;
}

/// Resolver that queries a fixed list of upstream servers directly.
#[derive(Debug, Clone)]
pub struct UpstreamResolver {
    upstreams: Vec<SocketAddr>,
    timeout: Duration,
}

impl UpstreamResolver {
    pub fn new(upstreams: Vec<SocketAddr>, timeout: Duration) -> Result<Self> {
        if upstreams.is_empty() {
            anyhow::bail!("At least one upstream DNS server is required");
        }
        Ok(Self {
            upstreams,
            timeout,
        })
    }

    pub fn upstreams(&self) -> &[SocketAddr] {
        &self.upstreams
    }

    /// Query one upstream for both address families.
    ///
    /// Succeeds if either the A or the AAAA query got an answer.
    async fn lookup(&self, upstream: SocketAddr, name: &Name) -> ResolveResult<Vec<IpAddr>> {
        let (v4, v6) = futures::join!(
            self.query(upstream, name, RecordType::A),
            self.query(upstream, name, RecordType::AAAA)
        );

        match (v4, v6) {
            (Ok(mut v4), Ok(v6)) => {
                v4.extend(v6);
                Ok(v4)
            }
            (Ok(ips), Err(e)) | (Err(e), Ok(ips)) => {
                debug!("{} partial answer for {}: {}", upstream, name, e);
                Ok(ips)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }

    /// Send a single query and wait for the matching response.
    ///
    /// A truncated UDP answer is retried over TCP. If the TCP exchange fails
    /// the partial answer is kept, since ledger merges only ever add.
    async fn query(
        &self,
        upstream: SocketAddr,
        name: &Name,
        record_type: RecordType,
    ) -> ResolveResult<Vec<IpAddr>> {
        let mut edns = Edns::new();
        edns.set_max_payload(EDNS_PAYLOAD_SIZE);

        let mut query = Message::new();
        query
            .set_id(rand::random())
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(Query::query(name.clone(), record_type))
            .set_edns(edns);
        let bytes = query.to_vec()?;

        let mut response = self.exchange_udp(upstream, &bytes).await?;
        check_response(upstream, &query, &response)?;

        if response.truncated() {
            debug!("{} truncated answer for {}, retrying over TCP", upstream, name);
            match self.exchange_tcp(upstream, &bytes).await {
                Ok(full) => {
                    check_response(upstream, &query, &full)?;
                    response = full;
                }
                Err(e) => debug!("TCP retry to {} failed: {}", upstream, e),
            }
        }

        Ok(response
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::A(a)) => Some(IpAddr::V4(a.0)),
                Some(RData::AAAA(aaaa)) => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            })
            .collect())
    }

    async fn exchange_udp(&self, upstream: SocketAddr, bytes: &[u8]) -> ResolveResult<Message> {
        let bind_addr = if upstream.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let exchange = async {
            let socket = UdpSocket::bind(bind_addr)
                .await
                .map_err(|e| ResolveError::io(upstream, e))?;
            socket
                .send_to(bytes, upstream)
                .await
                .map_err(|e| ResolveError::io(upstream, e))?;

            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            let (len, src) = socket
                .recv_from(&mut buf)
                .await
                .map_err(|e| ResolveError::io(upstream, e))?;
            if src != upstream {
                return Err(ResolveError::Mismatch { upstream });
            }
            Ok::<_, ResolveError>(Message::from_vec(&buf[..len])?)
        };

        self.within_timeout(upstream, exchange).await
    }

    /// DNS over TCP: each message carries a 2-byte big-endian length prefix.
    async fn exchange_tcp(&self, upstream: SocketAddr, bytes: &[u8]) -> ResolveResult<Message> {
        let exchange = async {
            let mut stream = TcpStream::connect(upstream)
                .await
                .map_err(|e| ResolveError::io(upstream, e))?;

            let mut send_buf = Vec::with_capacity(2 + bytes.len());
            send_buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
            send_buf.extend_from_slice(bytes);
            stream
                .write_all(&send_buf)
                .await
                .map_err(|e| ResolveError::io(upstream, e))?;

            let mut len_buf = [0u8; 2];
            stream
                .read_exact(&mut len_buf)
                .await
                .map_err(|e| ResolveError::io(upstream, e))?;
            let mut buf = vec![0u8; u16::from_be_bytes(len_buf) as usize];
            stream
                .read_exact(&mut buf)
                .await
                .map_err(|e| ResolveError::io(upstream, e))?;

            Ok::<_, ResolveError>(Message::from_vec(&buf)?)
        };

        self.within_timeout(upstream, exchange).await
    }

    async fn within_timeout<F>(&self, upstream: SocketAddr, exchange: F) -> ResolveResult<Message>
    where
        F: std::future::Future<Output = ResolveResult<Message>>,
    {
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ResolveError::Timeout {
                upstream,
                timeout: self.timeout,
            })?
    }
}

/// Reject responses to another query and error response codes.
fn check_response(upstream: SocketAddr, query: &Message, response: &Message) -> ResolveResult<()> {
    if !matches_query(query, response) {
        return Err(ResolveError::Mismatch { upstream });
    }
    if response.response_code() != ResponseCode::NoError {
        return Err(ResolveError::Rejected {
            upstream,
            code: response.response_code(),
        });
    }
    Ok(())
}

#[async_trait]
impl HostResolver for UpstreamResolver {
    async fn resolve(&self, domain: &str) -> Vec<IpAddr> {
        let name = match Name::from_ascii(domain) {
            Ok(name) => name,
            Err(e) => {
                let err = ResolveError::InvalidName {
                    domain: domain.to_string(),
                    reason: e.to_string(),
                };
                debug!("{}", err);
                return Vec::new();
            }
        };

        let answers = join_all(
            self.upstreams
                .iter()
                .map(|upstream| self.lookup(*upstream, &name)),
        )
        .await;

        let mut ips: Vec<IpAddr> = Vec::new();
        for (upstream, answer) in self.upstreams.iter().zip(answers) {
            match answer {
                Ok(found) => {
                    for ip in found {
                        if !ips.contains(&ip) {
                            ips.push(ip);
                        }
                    }
                }
                Err(e) if e.is_negative_answer() => {
                    debug!("{} has no record of {}", upstream, domain);
                }
                Err(e) => debug!("No answer for {}: {}", domain, e),
            }
        }
        ips
    }
}

/// Check that a response belongs to the query that was sent.
fn matches_query(query: &Message, response: &Message) -> bool {
    if query.id() != response.id() || response.message_type() != MessageType::Response {
        return false;
    }
    match (query.queries().first(), response.queries().first()) {
        (Some(q), Some(r)) => {
            q.name() == r.name()
                && q.query_type() == r.query_type()
                && q.query_class() == r.query_class()
        }
        _ => false,
    }
}

/// Parse upstream addresses, accepting bare IPs with an implied port 53.
pub fn parse_upstreams<S: AsRef<str>>(upstreams: &[S]) -> Result<Vec<SocketAddr>> {
    upstreams
        .iter()
        .map(|s| {
            let s = s.as_ref().trim();
            s.parse::<SocketAddr>()
                .or_else(|_| s.parse::<IpAddr>().map(|ip| SocketAddr::new(ip, 53)))
                .map_err(|_| anyhow::anyhow!("Invalid upstream DNS server '{}'", s))
        })
        .collect()
}
