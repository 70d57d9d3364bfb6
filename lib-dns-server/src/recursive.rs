//! The recursive resolver: answers a stub's question from the cache
//! when it can, and otherwise walks the delegation chain over UDP,
//! starting at the configured root server and caching everything it
//! learns along the way.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};

use dns_wire::protocol::types::*;

use crate::authoritative::{classify, finalise};
use crate::cache::SharedCache;
use crate::net;
use crate::CNAME_CHASE_LIMIT;

/// How the resolver reaches the rest of the hierarchy.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// The root nameserver iteration starts from.  Servers named in
    /// referrals are assumed to listen on the same port.
    pub root_address: SocketAddr,

    /// Upper bound on the number of nameservers queried for a single
    /// question, so a malicious delegation graph cannot cause
    /// unbounded work.
    pub max_referrals: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_address: SocketAddr::from((Ipv4Addr::new(127, 0, 0, 7), 53)),
            max_referrals: 16,
        }
    }
}

/// Build a response to a stub request.
pub async fn respond(config: &ResolverConfig, cache: &SharedCache, request: &Message) -> Message {
    let mut response = request.make_response();
    let mut unknown_question = false;

    for question in &request.questions {
        if question.is_unknown() {
            tracing::warn!(%question, "unsupported question type or class");
            unknown_question = true;
            continue;
        }

        response.questions.push(question.clone());

        let cached = cache.get(&question.name, question.qtype);
        if cached.is_empty() {
            tracing::debug!(%question, "not in cache, starting iterative query");
            answer_by_iteration(config, cache, question, &mut response).await;
        } else {
            tracing::debug!(%question, "answering from cache");
            answer_from_cache(cache, question, cached, &mut response);
        }
    }

    finalise(&mut response, unknown_question);
    response
}

/// Answer a question entirely from cached records, chasing aliases
/// and attaching MX glue through further cache lookups.  Dead ends
/// are logged and skipped; they never abort the response.
fn answer_from_cache(
    cache: &SharedCache,
    question: &Question,
    cached: Vec<ResourceRecord>,
    response: &mut Message,
) {
    let mut cname_queue = VecDeque::new();
    let mut glue_queue = Vec::new();

    classify(
        cached,
        question.qtype,
        &mut response.answers,
        &mut cname_queue,
        &mut glue_queue,
    );

    let mut chased = 0;
    while let Some(cname_rr) = cname_queue.pop_front() {
        if chased == CNAME_CHASE_LIMIT {
            tracing::warn!(%question, "alias chain too long, giving up");
            break;
        }
        chased += 1;

        let RecordTypeWithData::CNAME { cname } = &cname_rr.rtype_with_data else {
            continue;
        };

        let hits = cache.get(cname, question.qtype);
        if hits.is_empty() {
            tracing::warn!(%cname, "cache has a CNAME record but not its corresponding record");
            continue;
        }

        response.answers.push(cname_rr.clone());
        classify(
            hits,
            question.qtype,
            &mut response.answers,
            &mut cname_queue,
            &mut glue_queue,
        );
    }

    for target in glue_queue {
        // the cache lookup also returns CNAMEs; only addresses are
        // usable as glue
        let hits = cache
            .get(&target, RecordType::A)
            .into_iter()
            .filter(|rr| rr.rtype_with_data.rtype() == RecordType::A)
            .collect::<Vec<ResourceRecord>>();

        if hits.is_empty() {
            tracing::warn!(name = %target, "cache has an MX record but no address for the exchange");
        }
        response.additional.extend(hits);
    }
}

/// Walk the delegation chain: query each pending nameserver in turn,
/// copying and caching answers, and feeding glued referrals back
/// into the pending list.
async fn answer_by_iteration(
    config: &ResolverConfig,
    cache: &SharedCache,
    question: &Question,
    response: &mut Message,
) {
    // the pending list starts with a synthetic entry for the root
    let mut pending = VecDeque::new();
    pending.push_back((
        DomainName {
            labels: vec![b"root".to_vec(), b"local".to_vec()],
        },
        config.root_address,
    ));

    let mut queried = 0;
    while let Some((ns_name, address)) = pending.pop_front() {
        if queried == config.max_referrals {
            tracing::warn!(%question, limit = config.max_referrals, "referral limit reached, giving up");
            break;
        }
        queried += 1;

        tracing::debug!(ns = %ns_name, %address, "sending query to nameserver");
        let Some(reply) = net::query_nameserver_udp(address, question).await else {
            tracing::warn!(ns = %ns_name, %address, "no usable reply from nameserver");
            continue;
        };

        for answer in &reply.answers {
            response.answers.push(answer.clone());
            cache.insert(answer);

            if let RecordTypeWithData::MX { exchange, .. } = &answer.rtype_with_data {
                let glue = exchange_addresses(exchange, &reply.additional);
                if glue.is_empty() {
                    tracing::warn!(%exchange, "no address for the MX exchange in the reply");
                }
                for rr in glue {
                    cache.insert(&rr);
                    response.additional.push(rr);
                }
            }
        }

        for (ns_name, address) in referrals(&reply) {
            pending.push_back((
                ns_name,
                SocketAddr::from((address, config.root_address.port())),
            ));
        }
    }
}

/// The next-level nameservers named by a referral reply: each
/// authority-section NS record whose target has an A record in the
/// additional section.  An NS without glue is logged and dropped; no
/// separate lookup is made for it.
pub fn referrals(reply: &Message) -> Vec<(DomainName, Ipv4Addr)> {
    let mut out = Vec::new();

    for ns_rr in &reply.authority {
        let RecordTypeWithData::NS { nsdname } = &ns_rr.rtype_with_data else {
            continue;
        };

        let mut found = false;
        for glue_rr in &reply.additional {
            if let RecordTypeWithData::A { address } = &glue_rr.rtype_with_data {
                if glue_rr.name == *nsdname {
                    out.push((nsdname.clone(), *address));
                    found = true;
                }
            }
        }

        if !found {
            tracing::warn!(ns = %nsdname, "referral does not include an address for the nameserver");
        }
    }

    out
}

/// A records in the additional section for an MX exchange name.
fn exchange_addresses(
    exchange: &DomainName,
    additional: &[ResourceRecord],
) -> Vec<ResourceRecord> {
    additional
        .iter()
        .filter(|rr| {
            rr.name == *exchange && matches!(rr.rtype_with_data, RecordTypeWithData::A { .. })
        })
        .cloned()
        .collect()
}
