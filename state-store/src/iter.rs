//! Blocking iteration over change events
//!
//! - Blocking: `recv()`, `for event in iter`
//! - Non-blocking: `try_recv()`, `try_iter()`
//! - Timeout: `recv_timeout()`, `timeout_iter()`

use std::sync::mpsc;
use std::time::Duration;

use crate::event::ChangeEvent;

/// Blocking iterator over change events of watched keys
///
/// All methods are synchronous. Each iterator is a separate subscription
/// with its own queue; dropping it unsubscribes.
pub struct ChangeIterator<K, V> {
    rx: mpsc::Receiver<ChangeEvent<K, V>>,
}

impl<K, V> ChangeIterator<K, V> {
    pub(crate) fn new(rx: mpsc::Receiver<ChangeEvent<K, V>>) -> Self {
        Self { rx }
    }

    /// Block until the next event; `None` once the store is closed
    pub fn recv(&self) -> Option<ChangeEvent<K, V>> {
        self.rx.recv().ok()
    }

    /// Block until the next event or until `timeout` expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent<K, V>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Next event if one is already queued
    pub fn try_recv(&self) -> Option<ChangeEvent<K, V>> {
        self.rx.try_recv().ok()
    }

    /// Iterator over the events queued right now
    pub fn try_iter(&self) -> TryIter<'_, K, V> {
        TryIter { inner: self }
    }

    /// Iterator that waits up to `timeout` for each event
    pub fn timeout_iter(&self, timeout: Duration) -> TimeoutIter<'_, K, V> {
        TimeoutIter {
            inner: self,
            timeout,
        }
    }
}

impl<K, V> Iterator for ChangeIterator<K, V> {
    type Item = ChangeEvent<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Non-blocking iterator over currently queued events
pub struct TryIter<'a, K, V> {
    inner: &'a ChangeIterator<K, V>,
}

impl<K, V> Iterator for TryIter<'_, K, V> {
    type Item = ChangeEvent<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Iterator that stops after `timeout` passes without an event
pub struct TimeoutIter<'a, K, V> {
    inner: &'a ChangeIterator<K, V>,
    timeout: Duration,
}

impl<K, V> Iterator for TimeoutIter<'_, K, V> {
    type Item = ChangeEvent<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv_timeout(self.timeout)
    }
}
