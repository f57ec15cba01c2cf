//! Event streaming Relay
//!
//! Relay is the sending half of an unbounded channel. Hosts keep one per
//! observer registration and push mutation batches through it; the receiving
//! half ends up inside a [`Subscription`](super::Subscription).

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
#[cfg(debug_assertions)]
use std::sync::{Arc, OnceLock};

/// Sending side of a single-consumer event stream.
///
/// # Single Source
///
/// In debug builds a relay remembers the first call site that sent through it
/// and panics if another call site sends later. Every host delivers batches
/// from exactly one place, so a second emitter is a wiring bug.
#[derive(Clone, Debug)]
pub struct Relay<T> {
    sender: UnboundedSender<T>,
    #[cfg(debug_assertions)]
    emit_location: Arc<OnceLock<&'static std::panic::Location<'static>>>,
}

/// Relay send called from a second call site (debug builds only)
#[cfg(debug_assertions)]
#[derive(Debug, Clone)]
struct MultipleEmitters {
    previous: &'static std::panic::Location<'static>,
    current: &'static std::panic::Location<'static>,
}

impl<T> Relay<T> {
    /// Create a new Relay with its receiving stream.
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (
            Relay {
                sender,
                #[cfg(debug_assertions)]
                emit_location: Arc::new(OnceLock::new()),
            },
            receiver,
        )
    }

    #[cfg(debug_assertions)]
    #[track_caller]
    fn check_single_source(&self) -> Result<(), MultipleEmitters> {
        let caller = std::panic::Location::caller();
        match self.emit_location.set(caller) {
            Ok(()) => Ok(()),
            Err(previous) if previous == caller => Ok(()),
            Err(previous) => Err(MultipleEmitters {
                previous,
                current: caller,
            }),
        }
    }

    /// Send an event, silently dropping it when the receiver is gone.
    #[track_caller]
    pub fn send(&self, value: T) {
        #[cfg(debug_assertions)]
        if let Err(e) = self.check_single_source() {
            panic!("relay sent from {} after {}", e.current, e.previous);
        }

        let _ = self.sender.unbounded_send(value);
    }

    /// True once the receiving side has been dropped.
    ///
    /// Hosts use this to prune registrations whose subscriber went away
    /// without unsubscribing.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
