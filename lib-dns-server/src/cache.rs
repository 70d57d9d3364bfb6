use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dns_wire::protocol::types::*;

/// A convenience wrapper around a `Cache` which lets it be shared
/// between tasks.
///
/// Invoking `clone` on a `SharedCache` gives a new instance which
/// refers to the same underlying `Cache` object.
#[derive(Debug, Clone)]
pub struct SharedCache {
    cache: Arc<Mutex<Cache>>,
}

const MUTEX_POISON_MESSAGE: &str =
    "[INTERNAL ERROR] cache mutex poisoned, cannot recover from this - aborting";

impl SharedCache {
    /// Make a new, empty, shared cache.
    pub fn new() -> Self {
        SharedCache {
            cache: Arc::new(Mutex::new(Cache::new())),
        }
    }

    /// Create a new cache with the given desired size.
    pub fn with_desired_size(desired_size: usize) -> Self {
        SharedCache {
            cache: Arc::new(Mutex::new(Cache::with_desired_size(desired_size))),
        }
    }

    /// Get every live record for a name whose type matches the given
    /// type or is CNAME.
    ///
    /// The TTL in the returned `ResourceRecord`s is relative to the
    /// current time - not to when the record was inserted.
    pub fn get(&self, name: &DomainName, rtype: RecordType) -> Vec<ResourceRecord> {
        let mut rrs = self
            .cache
            .lock()
            .expect(MUTEX_POISON_MESSAGE)
            .get(name, rtype);
        rrs.retain(|rr| rr.ttl > 0);
        rrs
    }

    /// Insert an entry into the cache, tagged with the current time.
    ///
    /// It is not inserted if its TTL is zero.
    ///
    /// This may make the cache grow beyond the desired size.
    pub fn insert(&self, record: &ResourceRecord) {
        if record.ttl > 0 {
            self.cache.lock().expect(MUTEX_POISON_MESSAGE).insert(record);
        }
    }

    /// Atomically clears expired entries and, if the cache has grown
    /// beyond its desired size, evicts entries to get down to size.
    ///
    /// Returns `(num expired, num evicted, current size)`.
    pub fn prune(&self) -> (usize, usize, usize) {
        self.cache.lock().expect(MUTEX_POISON_MESSAGE).prune()
    }
}

impl Default for SharedCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Caching for `ResourceRecord`s.
///
/// Records are stored with the absolute time they expire at, so an
/// entry is live exactly while `now < inserted_at + ttl`.  You
/// probably want to use `SharedCache` instead.
#[derive(Debug, Clone)]
pub struct Cache {
    /// Cached records, indexed by domain name.
    entries: HashMap<DomainName, CachedDomainRecords>,

    /// Domain names ordered by access time, least recently used
    /// first.  Used to pick eviction victims when the cache is full
    /// and nothing has expired.
    ///
    /// INVARIANT: the domains in here are exactly the domains in
    /// `entries`.
    access_priority: PriorityQueue<DomainName, Reverse<Instant>>,

    /// Domain names ordered by expiry time, soonest first.  Expired
    /// records are cleared out before anything is evicted.
    ///
    /// INVARIANT: the domains in here are exactly the domains in
    /// `entries`.
    expiry_priority: PriorityQueue<DomainName, Reverse<Instant>>,

    /// The number of records in the cache.
    ///
    /// INVARIANT: this is the sum of the `size` fields of the
    /// entries.
    current_size: usize,

    /// The desired maximum number of records in the cache.
    desired_size: usize,
}

/// The cached records for a single domain name.
#[derive(Debug, Clone)]
struct CachedDomainRecords {
    /// The time this name was last read at.
    last_read: Instant,

    /// When the next record expires.
    ///
    /// INVARIANT: this is the minimum of the expiry times of the
    /// records.
    next_expiry: Instant,

    /// How many records there are.
    ///
    /// INVARIANT: this is the sum of the vector lengths in `records`.
    size: usize,

    /// The records, divided by record type.
    ///
    /// INVARIANT: the `RecordType` and `RecordTypeWithData` match.
    records: HashMap<RecordType, Vec<(RecordTypeWithData, Instant)>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Create a new cache with a default desired size.
    pub fn new() -> Self {
        Self::with_desired_size(512)
    }

    /// Create a new cache with the given desired size.
    ///
    /// If the number of records exceeds this, expired and then
    /// least-recently-used entries are pruned.
    ///
    /// # Panics
    ///
    /// If called with a `desired_size` of 0.
    pub fn with_desired_size(desired_size: usize) -> Self {
        assert!(desired_size > 0, "cannot create a zero-size cache");

        Self {
            entries: HashMap::with_capacity(desired_size / 2),
            access_priority: PriorityQueue::with_capacity(desired_size),
            expiry_priority: PriorityQueue::with_capacity(desired_size),
            current_size: 0,
            desired_size,
        }
    }

    /// Get every record for a name whose type matches the given type
    /// or is CNAME.
    ///
    /// The TTL in the returned `ResourceRecord`s is relative to the
    /// current time.  A record may have expired: if so, its TTL is 0,
    /// and consumers MUST check this before using it!
    pub fn get(&mut self, name: &DomainName, rtype: RecordType) -> Vec<ResourceRecord> {
        let Some(entry) = self.entries.get_mut(name) else {
            return Vec::new();
        };

        let now = Instant::now();
        let mut rrs = Vec::new();
        if let Some(tuples) = entry.records.get(&rtype) {
            to_rrs(name, now, tuples, &mut rrs);
        }
        if rtype != RecordType::CNAME {
            if let Some(tuples) = entry.records.get(&RecordType::CNAME) {
                to_rrs(name, now, tuples, &mut rrs);
            }
        }

        if !rrs.is_empty() {
            entry.last_read = now;
            self.access_priority.change_priority(name, Reverse(now));
        }

        rrs
    }

    /// Insert a record, expiring its TTL from now.  A record with the
    /// same data replaces the old copy rather than duplicating it.
    pub fn insert(&mut self, record: &ResourceRecord) {
        let now = Instant::now();
        let rtype = record.rtype_with_data.rtype();
        let expiry = now + Duration::from_secs(record.ttl.into());

        let entry = self
            .entries
            .entry(record.name.clone())
            .or_insert_with(|| CachedDomainRecords {
                last_read: now,
                next_expiry: expiry,
                size: 0,
                records: HashMap::new(),
            });

        let tuples = entry.records.entry(rtype).or_default();
        if let Some(duplicate) = tuples
            .iter()
            .position(|(data, _)| *data == record.rtype_with_data)
        {
            tuples.swap_remove(duplicate);
            entry.size -= 1;
            self.current_size -= 1;
        }
        tuples.push((record.rtype_with_data.clone(), expiry));

        entry.size += 1;
        entry.last_read = now;
        entry.next_expiry = entry
            .records
            .values()
            .flatten()
            .map(|(_, e)| *e)
            .min()
            .unwrap_or(expiry);
        self.current_size += 1;

        let next_expiry = entry.next_expiry;
        if self
            .access_priority
            .change_priority(&record.name, Reverse(now))
            .is_none()
        {
            self.access_priority.push(record.name.clone(), Reverse(now));
        }
        if self
            .expiry_priority
            .change_priority(&record.name, Reverse(next_expiry))
            .is_none()
        {
            self.expiry_priority
                .push(record.name.clone(), Reverse(next_expiry));
        }
    }

    /// Delete all expired records.
    ///
    /// Returns the number of records deleted.
    pub fn remove_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        while let Some((name, Reverse(expiry))) = self.expiry_priority.pop() {
            if expiry > now {
                self.expiry_priority.push(name, Reverse(expiry));
                break;
            }

            let Some(entry) = self.entries.get_mut(&name) else {
                self.access_priority.remove(&name);
                continue;
            };

            let before = entry.size;
            for tuples in entry.records.values_mut() {
                tuples.retain(|(_, e)| *e > now);
            }
            entry.records.retain(|_, tuples| !tuples.is_empty());
            entry.size = entry.records.values().map(Vec::len).sum();
            removed += before - entry.size;
            self.current_size -= before - entry.size;

            if let Some(next_expiry) = entry.records.values().flatten().map(|(_, e)| *e).min() {
                entry.next_expiry = next_expiry;
                self.expiry_priority.push(name, Reverse(next_expiry));
            } else {
                self.entries.remove(&name);
                self.access_priority.remove(&name);
            }
        }

        removed
    }

    /// Delete all expired records, and then enough
    /// least-recently-used names to bring the cache back down to the
    /// desired size.
    ///
    /// Returns `(num expired, num evicted, current size)`.
    pub fn prune(&mut self) -> (usize, usize, usize) {
        let expired = self.remove_expired();
        let mut evicted = 0;

        while self.current_size > self.desired_size {
            let removed = self.remove_least_recently_used();
            if removed == 0 {
                break;
            }
            evicted += removed;
        }

        (expired, evicted, self.current_size)
    }

    /// Helper for `prune`: deletes all records associated with the
    /// least recently used name.
    ///
    /// Returns the number of records removed.
    fn remove_least_recently_used(&mut self) -> usize {
        let Some((name, _)) = self.access_priority.pop() else {
            return 0;
        };

        self.expiry_priority.remove(&name);
        if let Some(entry) = self.entries.remove(&name) {
            self.current_size -= entry.size;
            entry.size
        } else {
            0
        }
    }
}

/// Helper for `get`: converts the stored tuples into RRs with the TTL
/// rewritten relative to `now`.
fn to_rrs(
    name: &DomainName,
    now: Instant,
    tuples: &[(RecordTypeWithData, Instant)],
    rrs: &mut Vec<ResourceRecord>,
) {
    for (rtype_with_data, expires) in tuples {
        let ttl = expires
            .saturating_duration_since(now)
            .as_secs()
            .try_into()
            .unwrap_or(u32::MAX);

        rrs.push(ResourceRecord {
            name: name.clone(),
            rtype_with_data: rtype_with_data.clone(),
            rclass: RecordClass::IN,
            ttl,
        });
    }
}

#[cfg(test)]
mod tests {
    use dns_wire::protocol::types::test_util::*;

    use super::*;

    #[test]
    fn cache_put_can_get() {
        for _ in 0..100 {
            let mut cache = Cache::new();
            let mut rr = arbitrary_resourcerecord();
            rr.rclass = RecordClass::IN;
            rr.ttl = 300;
            cache.insert(&rr);

            assert_cache_response(&rr, &cache.get(&rr.name, rr.rtype_with_data.rtype()));
        }
    }

    #[test]
    fn cache_put_deduplicates() {
        let mut cache = Cache::new();
        let mut rr = arbitrary_resourcerecord();
        rr.rclass = RecordClass::IN;
        rr.ttl = 300;

        cache.insert(&rr);
        cache.insert(&rr);

        assert_eq!(1, cache.current_size);
        assert_eq!(1, cache.get(&rr.name, rr.rtype_with_data.rtype()).len());
    }

    #[test]
    fn cache_get_includes_cnames() {
        let cache = SharedCache::new();
        cache.insert(&cname_record("www.baidu.com", "www.a.shifen.com"));
        cache.insert(&a_record(
            "www.a.shifen.com",
            std::net::Ipv4Addr::new(14, 215, 177, 38),
        ));

        let rrs = cache.get(&domain("www.baidu.com"), RecordType::A);
        assert_eq!(1, rrs.len());
        assert_eq!(RecordType::CNAME, rrs[0].rtype_with_data.rtype());

        // asking for CNAME directly doesn't return the records twice
        let rrs = cache.get(&domain("www.baidu.com"), RecordType::CNAME);
        assert_eq!(1, rrs.len());
    }

    #[test]
    fn cache_zero_ttl_is_never_served() {
        let cache = SharedCache::new();
        let mut rr = arbitrary_resourcerecord();
        rr.rclass = RecordClass::IN;
        rr.ttl = 0;
        cache.insert(&rr);

        assert!(cache
            .get(&rr.name, rr.rtype_with_data.rtype())
            .is_empty());
    }

    #[test]
    fn cache_expired_records_are_removed() {
        let mut cache = Cache::new();

        for i in 0..100 {
            let mut rr = arbitrary_resourcerecord();
            rr.rclass = RecordClass::IN;
            rr.ttl = if i % 2 == 0 { 0 } else { 300 };
            cache.insert(&rr);
        }

        assert_eq!(50, cache.remove_expired());
        assert_eq!(50, cache.current_size);
    }

    #[test]
    fn cache_prune_evicts_down_to_size() {
        let mut cache = Cache::with_desired_size(25);

        for _ in 0..100 {
            let mut rr = arbitrary_resourcerecord();
            rr.rclass = RecordClass::IN;
            rr.ttl = 300; // this case isn't testing expiration
            cache.insert(&rr);
        }

        let (expired, evicted, size) = cache.prune();
        assert_eq!(0, expired);
        assert!(evicted >= 75);
        assert!(size <= 25);
        assert_eq!(cache.current_size, size);
    }

    /// Assert that the response has exactly one record matching the
    /// original (all fields equal except TTL, which only counts
    /// down).
    fn assert_cache_response(original: &ResourceRecord, response: &[ResourceRecord]) {
        assert_eq!(1, response.len());
        let cached = response[0].clone();

        assert_eq!(original.name, cached.name);
        assert_eq!(original.rtype_with_data, cached.rtype_with_data);
        assert_eq!(RecordClass::IN, cached.rclass);
        assert!(original.ttl >= cached.ttl);
    }
}
