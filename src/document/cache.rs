//! Bounded cache for values derived from document snapshots.
//!
//! Entries are keyed by `(uri, version)`. A version bump never hits an old
//! entry; stale versions simply age out through LRU order or the TTL.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tower_lsp::lsp_types::Url;

use super::state::CompositeDocument;

/// Default number of cached documents.
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Default idle time after which an entry is recomputed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Identity of one document version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub uri: Url,
    pub version: i32,
}

impl Fingerprint {
    pub fn of(document: &CompositeDocument) -> Self {
        Self {
            uri: document.uri.clone(),
            version: document.version,
        }
    }
}

struct Entry<V> {
    value: V,
    last_access: Instant,
}

struct CacheState<V> {
    entries: HashMap<Fingerprint, Entry<V>>,
    /// Front is most recently used, back is least recently used.
    mru_order: VecDeque<Fingerprint>,
}

impl<V> CacheState<V> {
    fn touch(&mut self, key: &Fingerprint) {
        if let Some(idx) = self.mru_order.iter().position(|k| k == key) {
            if let Some(k) = self.mru_order.remove(idx) {
                self.mru_order.push_front(k);
            }
        }
    }

    fn remove(&mut self, key: &Fingerprint) {
        self.entries.remove(key);
        self.mru_order.retain(|k| k != key);
    }

    fn insert(&mut self, key: Fingerprint, entry: Entry<V>, max_entries: usize) {
        if max_entries == 0 {
            return;
        }
        if self.entries.insert(key.clone(), entry).is_some() {
            self.touch(&key);
            return;
        }
        self.mru_order.push_front(key);
        while self.mru_order.len() > max_entries {
            if let Some(lru) = self.mru_order.pop_back() {
                self.entries.remove(&lru);
            }
        }
    }
}

/// Memoizes a pure derivation over documents with LRU + TTL eviction.
pub struct DerivedCache<V> {
    max_entries: usize,
    ttl: Duration,
    derive: Box<dyn Fn(&CompositeDocument) -> V + Send + Sync>,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> DerivedCache<V> {
    pub fn new(
        max_entries: usize,
        ttl: Duration,
        derive: impl Fn(&CompositeDocument) -> V + Send + Sync + 'static,
    ) -> Self {
        Self {
            max_entries,
            ttl,
            derive: Box::new(derive),
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(max_entries),
                mru_order: VecDeque::with_capacity(max_entries),
            }),
        }
    }

    /// Return the value for this exact document version, deriving it if it
    /// is absent or has been idle for longer than the TTL.
    pub fn get(&self, document: &CompositeDocument) -> V {
        self.get_at(document, Instant::now())
    }

    pub(crate) fn get_at(&self, document: &CompositeDocument, now: Instant) -> V {
        let key = Fingerprint::of(document);
        {
            let mut state = self.state.lock();
            let fresh = state
                .entries
                .get(&key)
                .map(|e| now.saturating_duration_since(e.last_access) <= self.ttl);
            match fresh {
                Some(true) => {
                    state.touch(&key);
                    if let Some(entry) = state.entries.get_mut(&key) {
                        entry.last_access = now;
                        return entry.value.clone();
                    }
                }
                Some(false) => {
                    tracing::debug!(uri = %key.uri, version = key.version, "cache entry expired");
                    state.remove(&key);
                }
                None => {}
            }
        }

        // Derive without holding the lock: derivations may consult other caches.
        let value = (self.derive)(document);
        self.state.lock().insert(
            key,
            Entry {
                value: value.clone(),
                last_access: now,
            },
            self.max_entries,
        );
        value
    }

    /// Drop every cached version of a closed document.
    pub fn on_document_removed(&self, uri: &Url) {
        let mut state = self.state.lock();
        state.entries.retain(|key, _| &key.uri != uri);
        state.mru_order.retain(|key| &key.uri != uri);
    }

    pub fn contains(&self, uri: &Url, version: i32) -> bool {
        self.state.lock().entries.contains_key(&Fingerprint {
            uri: uri.clone(),
            version,
        })
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.mru_order.clear();
    }
}

impl<V> fmt::Debug for DerivedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedCache")
            .field("max_entries", &self.max_entries)
            .field("ttl", &self.ttl)
            .field("len", &self.state.lock().entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn doc(name: &str, version: i32) -> CompositeDocument {
        let uri = Url::parse(&format!("file:///p/{name}.vue")).unwrap();
        CompositeDocument::new(uri, version, format!("{name}@{version}"))
    }

    fn counting_cache(max: usize, ttl: Duration) -> (DerivedCache<String>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = DerivedCache::new(max, ttl, move |d: &CompositeDocument| {
            counter.fetch_add(1, Ordering::SeqCst);
            d.text.to_uppercase()
        });
        (cache, calls)
    }

    #[test]
    fn hit_returns_memoized_value() {
        let (cache, calls) = counting_cache(4, DEFAULT_TTL);
        let a = doc("a", 1);
        assert_eq!(cache.get(&a), "A@1");
        assert_eq!(cache.get(&a), "A@1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn version_bump_is_a_miss() {
        let (cache, calls) = counting_cache(4, DEFAULT_TTL);
        assert_eq!(cache.get(&doc("a", 1)), "A@1");
        assert_eq!(cache.get(&doc("a", 2)), "A@2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // The old version is still around until it ages out.
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn evicts_least_recently_used() {
        let (cache, _) = counting_cache(2, DEFAULT_TTL);
        let (a, b, c) = (doc("a", 1), doc("b", 1), doc("c", 1));
        cache.get(&a);
        cache.get(&b);
        cache.get(&a);
        cache.get(&c);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&a.uri, 1));
        assert!(!cache.contains(&b.uri, 1));
        assert!(cache.contains(&c.uri, 1));
    }

    #[test]
    fn idle_entries_expire() {
        let ttl = Duration::from_secs(60);
        let (cache, calls) = counting_cache(4, ttl);
        let a = doc("a", 1);
        let t0 = Instant::now();

        cache.get_at(&a, t0);
        cache.get_at(&a, t0 + Duration::from_secs(30));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Last access was at t0+30s, so t0+89s is still inside the window.
        cache.get_at(&a, t0 + Duration::from_secs(89));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.get_at(&a, t0 + Duration::from_secs(150));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removing_a_document_drops_all_versions() {
        let (cache, _) = counting_cache(8, DEFAULT_TTL);
        let (a1, a2, b) = (doc("a", 1), doc("a", 2), doc("b", 1));
        cache.get(&a1);
        cache.get(&a2);
        cache.get(&b);

        cache.on_document_removed(&a1.uri);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&b.uri, 1));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let (cache, calls) = counting_cache(0, DEFAULT_TTL);
        let a = doc("a", 1);
        cache.get(&a);
        cache.get(&a);
        assert!(cache.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
