//! Keyed State Projection Library
//!
//! A small, generic store of last-known values with change notification
//! and blocking iteration patterns.
//!
//! # Features
//!
//! - **Last Write Wins**: every update replaces the stored value, unchanged
//! - **Change Detection**: only emit events when values actually change
//! - **Watch Pattern**: register interest in specific keys
//! - **Blocking Iteration**: consume change events via blocking iterators
//! - **Subscriptions**: every iterator sees every change; nothing is queued
//!   without one, and `close()` ends them all
//! - **Generic Keys and Values**: any hashable key, any comparable value
//!
//! # Quick Start
//!
//! ```rust
//! use state_store::StateStore;
//!
//! // Key: (property, zone), value: reading
//! let store = StateStore::<(u32, u32), f32>::new();
//!
//! store.watch((0x503, 1));
//! store.update(&(0x503, 1), 23.5);
//!
//! assert_eq!(store.get(&(0x503, 1)), Some(23.5));
//! assert_eq!(store.get(&(0x503, 4)), None);
//! ```
//!
//! # Iteration Patterns
//!
//! ```rust,ignore
//! let changes = store.iter();
//!
//! // Non-blocking (processes available events)
//! for event in changes.try_iter() {
//!     println!("Event: {:?}", event);
//! }
//!
//! // With timeout
//! if let Some(event) = changes.recv_timeout(Duration::from_secs(1)) {
//!     println!("Got event: {:?}", event);
//! }
//!
//! // Blocking iteration (waits for events until the store is closed)
//! for event in changes {
//!     println!("{:?} -> {:?}", event.key, event.value);
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! StateStore<K, V>
//!     │
//!     ├── entries: HashMap<K, V>
//!     │
//!     ├── watched: HashSet<K>
//!     │
//!     └── subscribers: Vec<mpsc::Sender<ChangeEvent<K, V>>>
//!             │
//!             └── ChangeIterator<K, V> (one per subscription)
//! ```

pub mod event;
pub mod iter;
pub mod store;

pub use event::ChangeEvent;
pub use iter::{ChangeIterator, TimeoutIter, TryIter};
pub use store::StateStore;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::event::ChangeEvent;
    pub use crate::iter::ChangeIterator;
    pub use crate::store::StateStore;
}
