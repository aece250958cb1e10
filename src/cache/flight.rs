//! Load Coordination Module
//!
//! Tracks the in-flight load for each key so concurrent misses share a
//! single loader call.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use futures::future::{BoxFuture, Shared};

use crate::error::Result;

/// Handle on a load in progress; every clone resolves to the same outcome.
pub type Flight<V> = Shared<BoxFuture<'static, Result<V>>>;

struct InFlight<V> {
    id: u64,
    flight: Flight<V>,
}

// == Load Table ==
/// Per-key table of in-flight loads.
///
/// A key is present only while its load runs. Each registration gets a fresh
/// id so a finishing load can tell whether the slot is still its own.
pub struct LoadTable<K, V> {
    flights: HashMap<K, InFlight<V>>,
    next_id: u64,
}

impl<K, V> Default for LoadTable<K, V> {
    fn default() -> Self {
        Self {
            flights: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<K, V> fmt::Debug for LoadTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTable")
            .field("in_flight", &self.flights.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<K, V> LoadTable<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the load in flight for `key`, if any.
    pub fn join<Q>(&self, key: &Q) -> Option<Flight<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.flights.get(key).map(|slot| slot.flight.clone())
    }

    /// Reserves an id for the next registration.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Publishes `flight` as the load for `key`.
    pub fn register(&mut self, key: K, id: u64, flight: Flight<V>) {
        self.flights.insert(key, InFlight { id, flight });
    }

    // == Complete ==
    /// Removes the slot for `key` if it still belongs to load `id`.
    ///
    /// Returns false when the slot was dropped or taken over by a newer load.
    pub fn complete<Q>(&mut self, key: &Q, id: u64) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.flights.get(key) {
            Some(slot) if slot.id == id => {
                self.flights.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.flights.clear();
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }
}
