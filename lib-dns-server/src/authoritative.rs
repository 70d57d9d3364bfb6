//! The authoritative responder: answers a request from a single
//! zone's records, with no recursion and no cache.

use std::collections::VecDeque;

use dns_wire::protocol::types::*;
use dns_wire::zones::types::Zone;

use crate::CNAME_CHASE_LIMIT;

/// Build a response to a request from one zone.
///
/// Records matching each question go to the answer section, aliases
/// are chased through the zone, NS records for the question name and
/// every enclosing suffix go to the authority section, and the
/// addresses of MX and NS targets are attached as glue.
pub fn respond(zone: &Zone, request: &Message) -> Message {
    let mut response = request.make_response();
    let mut unknown_question = false;

    for question in &request.questions {
        if question.is_unknown() {
            tracing::warn!(%question, "unsupported question type or class");
            unknown_question = true;
            continue;
        }

        response.questions.push(question.clone());
        answer_question(zone, question, &mut response);
    }

    finalise(&mut response, unknown_question);
    response
}

fn answer_question(zone: &Zone, question: &Question, response: &mut Message) {
    let mut cname_queue = VecDeque::new();
    let mut glue_queue = Vec::new();

    let hits = zone.lookup(&question.name, question.qtype, question.qclass, true);
    classify(
        hits,
        question.qtype,
        &mut response.answers,
        &mut cname_queue,
        &mut glue_queue,
    );

    // chase aliases through the zone.  An alias record is only
    // answered once its target resolves to something; chasing is
    // bounded in case the zone data contains a cycle.
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

        let hits = zone.lookup(cname, question.qtype, question.qclass, true);
        if hits.is_empty() {
            tracing::warn!(%cname, "found CNAME record but not its corresponding record");
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

    // NS records for the question name and each suffix of it
    for suffix in question.name.suffixes() {
        for ns_rr in zone.lookup(&suffix, RecordType::NS, question.qclass, false) {
            if let RecordTypeWithData::NS { nsdname } = &ns_rr.rtype_with_data {
                glue_queue.push(nsdname.clone());
            }
            response.authority.push(ns_rr);
        }
    }

    // glue: addresses for the MX and NS targets collected above
    for target in glue_queue {
        let hits = zone.lookup(&target, RecordType::A, question.qclass, false);
        if hits.is_empty() {
            tracing::warn!(name = %target, "no address record for glue target");
        }
        response.additional.extend(hits);
    }
}

/// Distribute looked-up records: matches go to the answer section,
/// aliases are queued for chasing (unless CNAMEs were asked for
/// directly), MX targets are queued for glue.
pub(crate) fn classify(
    hits: Vec<ResourceRecord>,
    qtype: RecordType,
    answers: &mut Vec<ResourceRecord>,
    cname_queue: &mut VecDeque<ResourceRecord>,
    glue_queue: &mut Vec<DomainName>,
) {
    for rr in hits {
        match &rr.rtype_with_data {
            RecordTypeWithData::CNAME { .. } if qtype != RecordType::CNAME => {
                cname_queue.push_back(rr);
            }
            RecordTypeWithData::MX { exchange, .. } => {
                glue_queue.push(exchange.clone());
                answers.push(rr);
            }
            _ => answers.push(rr),
        }
    }
}

/// Apply the final RCODE rules: a response with nothing in any RR
/// section is a name error, and an unsupported question overrides
/// that.
pub(crate) fn finalise(response: &mut Message, unknown_question: bool) {
    if response.answers.is_empty()
        && response.authority.is_empty()
        && response.additional.is_empty()
    {
        response.header.rcode = Rcode::NameError;
    }

    if unknown_question {
        response.header.rcode = Rcode::NotImplemented;
    }
}
