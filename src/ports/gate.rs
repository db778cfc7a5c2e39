use crate::ports::Port;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Tracks recently vended ports so the same port isn't handed out twice before its first
/// recipient has had a chance to bind it.
///
/// Only the `capacity` most recently reserved ports are remembered; older ones age out and may
/// be vended again.
#[derive(Debug)]
pub struct PortGate {
    ports: Mutex<LruCache<Port, ()>>,
}

impl PortGate {
    /// A gate remembering up to `capacity` ports (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PortGate {
            ports: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Reserve `port`, returning `false` if it was reserved recently and must not be vended.
    pub fn reserve(&self, port: Port) -> bool {
        let mut ports = self.ports.lock().unwrap_or_else(PoisonError::into_inner);
        if ports.contains(&port) {
            return false;
        }
        ports.put(port, ());
        true
    }

    /// Whether `port` is currently remembered. Doesn't reserve it.
    #[must_use]
    pub fn is_reserved(&self, port: Port) -> bool {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&port)
    }

    /// The number of ports remembered before the oldest ages out.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
            .get()
    }
}
