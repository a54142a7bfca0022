//! # Synchronous event emitter.
//!
//! [`Emitter`] keeps an ordered list of listeners and invokes the matching ones
//! synchronously, in registration order, on every [`Emitter::emit`].
//!
//! ## Rules
//! - **Wildcard listeners** ([`Emitter::on_any`]) receive every event; the event carries its kind.
//! - **Once listeners** are removed when they fire.
//! - **Re-entrancy**: listeners may add/remove listeners or emit again; dispatch runs over a
//!   snapshot taken before any handler is invoked, and no lock is held while handlers run.
//! - **No bubbling here**: tree owners dispatch the same event on each ancestor's emitter
//!   (see [`TestNode`](crate::TestNode)).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tom_runner::{Emitted, Emitter};
//!
//! #[derive(Debug)]
//! struct Ping(u8);
//! impl Emitted for Ping {
//!     type Kind = u8;
//!     fn kind(&self) -> u8 { self.0 }
//! }
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let emitter = Emitter::<Ping>::new();
//! let h = hits.clone();
//! emitter.once(1, move |_| { h.fetch_add(1, Ordering::SeqCst); });
//!
//! assert_eq!(emitter.emit(&Ping(1)), 1);
//! assert_eq!(emitter.emit(&Ping(1)), 0);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Global listener id counter.
static LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// An event that can be dispatched by an [`Emitter`].
pub trait Emitted {
    /// Event classification used to match listeners.
    type Kind: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned on registration; pass it to [`Emitter::off`] to remove the listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E: Emitted> {
    id: ListenerId,
    /// `None` = wildcard.
    kind: Option<E::Kind>,
    once: bool,
    handler: Handler<E>,
}

/// Ordered listener list with synchronous dispatch.
pub struct Emitter<E: Emitted> {
    listeners: Mutex<Vec<Listener<E>>>,
}

impl<E: Emitted> Emitter<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Registers `handler` for events of `kind`.
    pub fn on<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(Some(kind), false, Arc::new(handler))
    }

    /// Registers `handler` for every event.
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(None, false, Arc::new(handler))
    }

    /// Registers `handler` for the next event of `kind` only.
    pub fn once<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(Some(kind), true, Arc::new(handler))
    }

    /// Registers `handler` for the next event, whatever its kind.
    pub fn once_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(None, true, Arc::new(handler))
    }

    /// Removes a listener. Returns `false` if it was not registered (or already fired once).
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        match listeners.iter().position(|l| l.id == id) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Invokes every matching listener in registration order.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &E) -> usize {
        let kind = event.kind();
        let handlers: Vec<Handler<E>> = {
            let mut listeners = self.lock();
            let handlers = listeners
                .iter()
                .filter(|l| l.kind.is_none_or(|k| k == kind))
                .map(|l| Arc::clone(&l.handler))
                .collect();
            listeners.retain(|l| !(l.once && l.kind.is_none_or(|k| k == kind)));
            handlers
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn register(&self, kind: Option<E::Kind>, once: bool, handler: Handler<E>) -> ListenerId {
        let id = ListenerId(LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Listener {
            id,
            kind,
            once,
            handler,
        });
        id
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener<E>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Emitted> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Emitted> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ev(&'static str);

    impl Emitted for Ev {
        type Kind = &'static str;
        fn kind(&self) -> &'static str {
            self.0
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Emitter<Ev>) {
        (Arc::new(Mutex::new(Vec::new())), Emitter::new())
    }

    #[test]
    fn delivers_in_registration_order() {
        let (log, em) = recorder();
        for tag in ["first", "second", "third"] {
            let log = log.clone();
            em.on("go", move |_| log.lock().unwrap().push(tag.to_string()));
        }
        assert_eq!(em.emit(&Ev("go")), 3);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn wildcard_sees_every_kind() {
        let (log, em) = recorder();
        let l = log.clone();
        em.on_any(move |ev| l.lock().unwrap().push(ev.kind().to_string()));
        em.on("one", |_| {});

        em.emit(&Ev("one"));
        em.emit(&Ev("two"));
        assert_eq!(*log.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn once_and_off() {
        let (log, em) = recorder();
        let l = log.clone();
        em.once("x", move |_| l.lock().unwrap().push("once".into()));
        let l = log.clone();
        let id = em.on("x", move |_| l.lock().unwrap().push("on".into()));

        em.emit(&Ev("y"));
        assert_eq!(em.len(), 2, "non-matching event must not consume a once listener");

        em.emit(&Ev("x"));
        assert!(em.off(id));
        assert!(!em.off(id));
        em.emit(&Ev("x"));

        assert_eq!(*log.lock().unwrap(), vec!["once", "on"]);
        assert!(em.is_empty());
    }

    #[test]
    fn once_any_fires_on_the_next_event_only() {
        let (log, em) = recorder();
        let l = log.clone();
        em.once_any(move |ev| l.lock().unwrap().push(ev.kind().to_string()));

        assert_eq!(em.emit(&Ev("first")), 1);
        assert_eq!(em.emit(&Ev("second")), 0);
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
        assert!(em.is_empty());
    }

    #[test]
    fn handlers_may_register_listeners() {
        let em = Arc::new(Emitter::<Ev>::new());
        let inner = em.clone();
        em.once("x", move |_| {
            inner.on("x", |_| {});
        });
        assert_eq!(em.emit(&Ev("x")), 1);
        assert_eq!(em.emit(&Ev("x")), 1);
    }
}
