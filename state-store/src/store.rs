//! Keyed state storage with change notification
//!
//! `StateStore<K, V>` maps keys to their last-known value. Updates always
//! overwrite (last write wins); subscribers are notified only when the stored
//! value of a watched key actually changes.
//!
//! Every [`ChangeIterator`] is its own subscription. A change is delivered to
//! all live subscriptions, and nothing is queued while there are none.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{mpsc, Arc, Mutex, RwLock};

use crate::event::ChangeEvent;
use crate::iter::ChangeIterator;

/// Senders of the live subscriptions
struct Subscribers<K, V> {
    senders: Vec<mpsc::Sender<ChangeEvent<K, V>>>,
    closed: bool,
}

// ============================================================================
// StateStore<K, V> - keyed projection of last-known values
// ============================================================================

/// Generic keyed state store with change notification
///
/// Cloning is cheap: clones share the same entries, watch set and
/// subscriptions.
///
/// # Example
///
/// ```rust
/// use state_store::StateStore;
///
/// let store = StateStore::<&'static str, f32>::new();
/// store.watch("driver");
/// let changes = store.iter();
///
/// store.update(&"driver", 23.5);
/// assert_eq!(store.get(&"driver"), Some(23.5));
///
/// let event = changes.try_recv().unwrap();
/// assert_eq!(event.key, "driver");
/// assert_eq!(event.value, 23.5);
/// ```
pub struct StateStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Last-known values
    entries: Arc<RwLock<HashMap<K, V>>>,

    /// Keys with change notification enabled
    watched: Arc<RwLock<HashSet<K>>>,

    /// Live change subscriptions
    subscribers: Arc<Mutex<Subscribers<K, V>>>,
}

impl<K, V> StateStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new empty state store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            watched: Arc::new(RwLock::new(HashSet::new())),
            subscribers: Arc::new(Mutex::new(Subscribers {
                senders: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Last-known value for `key`, `None` before the first update
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().ok()?;
        entries.get(key).cloned()
    }

    /// Store `value` under `key`, replacing whatever was there
    ///
    /// Returns whether the stored value changed. A change of a watched key
    /// emits a [`ChangeEvent`].
    pub fn update(&self, key: &K, value: V) -> bool {
        let changed = {
            let mut entries = match self.entries.write() {
                Ok(e) => e,
                Err(_) => return false,
            };
            let previous = entries.insert(key.clone(), value.clone());
            previous.as_ref() != Some(&value)
        };

        if changed {
            self.maybe_emit_change(key, value);
        }
        changed
    }

    /// Register interest in a key
    ///
    /// After watching, changes to this key will appear in `iter()`.
    pub fn watch(&self, key: K) {
        if let Ok(mut watched) = self.watched.write() {
            watched.insert(key);
        }
    }

    /// Unregister interest in a key
    pub fn unwatch(&self, key: &K) {
        if let Ok(mut watched) = self.watched.write() {
            watched.remove(key);
        }
    }

    /// Check if a key is being watched
    pub fn is_watched(&self, key: &K) -> bool {
        self.watched
            .read()
            .map(|w| w.contains(key))
            .unwrap_or(false)
    }

    /// Subscribe to change events of watched keys
    ///
    /// The subscription sees every change made after this call. It ends when
    /// the iterator is dropped or the store is [closed](Self::close).
    pub fn iter(&self) -> ChangeIterator<K, V> {
        self.subscribe(false)
    }

    /// Subscribe, starting with one event per watched key that has a value
    pub fn iter_with_snapshot(&self) -> ChangeIterator<K, V> {
        self.subscribe(true)
    }

    /// End every subscription
    ///
    /// Iterators return the events already queued, then `None`. Values can
    /// still be updated and read, but no further events are emitted.
    pub fn close(&self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.closed = true;
            subscribers.senders.clear();
        }
    }

    /// Whether [`close`](Self::close) was called
    pub fn is_closed(&self) -> bool {
        self.subscribers.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Number of live subscriptions
    ///
    /// Dropped iterators are pruned on the next emitted event.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.senders.len()).unwrap_or(0)
    }

    /// Number of keys with a known value
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys with a known value
    pub fn keys(&self) -> Vec<K> {
        self.entries
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget the value of a key, returning whether it was known
    pub fn remove(&self, key: &K) -> bool {
        self.entries
            .write()
            .map(|mut e| e.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Clear all values and watches
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        if let Ok(mut watched) = self.watched.write() {
            watched.clear();
        }
    }

    fn subscribe(&self, snapshot: bool) -> ChangeIterator<K, V> {
        let (tx, rx) = mpsc::channel();

        // registered under the lock so no update falls between the
        // snapshot and the subscription
        if let Ok(mut subscribers) = self.subscribers.lock() {
            if !subscribers.closed {
                if snapshot {
                    self.send_snapshot(&tx);
                }
                subscribers.senders.push(tx);
            }
        }
        ChangeIterator::new(rx)
    }

    fn send_snapshot(&self, tx: &mpsc::Sender<ChangeEvent<K, V>>) {
        let (Ok(watched), Ok(entries)) = (self.watched.read(), self.entries.read()) else {
            return;
        };
        for key in watched.iter() {
            if let Some(value) = entries.get(key) {
                let _ = tx.send(ChangeEvent::new(key.clone(), value.clone()));
            }
        }
    }

    /// Emit a change event to every subscription if the key is being watched
    fn maybe_emit_change(&self, key: &K, value: V) {
        if !self.is_watched(key) {
            return;
        }
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        if subscribers.senders.is_empty() {
            return;
        }
        let event = ChangeEvent::new(key.clone(), value);
        subscribers.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<K, V> Default for StateStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for StateStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            watched: Arc::clone(&self.watched),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<K, V> std::fmt::Debug for StateStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("entry_count", &self.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
