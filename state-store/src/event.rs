//! Change events for store updates
//!
//! When the value of a watched key changes, a `ChangeEvent` is emitted
//! carrying the key and the new value.

use std::time::Instant;

/// A change event emitted when a watched key changes value
///
/// # Example
///
/// ```rust,ignore
/// for event in store.iter() {
///     println!("{:?} is now {:?}", event.key, event.value);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChangeEvent<K, V> {
    /// The key whose value changed
    pub key: K,

    /// The value stored by the update
    pub value: V,

    /// When the change was detected
    pub timestamp: Instant,
}

impl<K, V> ChangeEvent<K, V> {
    /// Create a new change event
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            timestamp: Instant::now(),
        }
    }

    /// Create a new change event with a specific timestamp
    pub fn with_timestamp(key: K, value: V, timestamp: Instant) -> Self {
        Self {
            key,
            value,
            timestamp,
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for ChangeEvent<K, V> {
    fn eq(&self, other: &Self) -> bool {
        // Timestamp not included in equality
        self.key == other.key && self.value == other.value
    }
}
