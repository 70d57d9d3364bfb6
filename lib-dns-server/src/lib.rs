#![warn(clippy::pedantic)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

pub mod authoritative;
pub mod cache;
pub mod net;
pub mod recursive;

/// Maximum number of CNAME records chased while answering one
/// question.  A chain of aliases longer than this cannot be resolved.
///
/// This protects against alias cycles, whether in zone data or fed
/// into the cache by a malicious upstream nameserver.
pub const CNAME_CHASE_LIMIT: usize = 32;
