//! Consumer side of a relay with an explicit unsubscribe

use futures::channel::mpsc::UnboundedReceiver;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream of events from a host-side source, plus the means to detach from it.
///
/// The stream ends only if the source goes away. Detaching happens either through
/// [`Subscription::unsubscribe`] or when the subscription is dropped.
pub struct Subscription<T> {
    receiver: UnboundedReceiver<T>,
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl<T> Subscription<T> {
    pub fn new(receiver: UnboundedReceiver<T>, disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            receiver,
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// A subscription that never yields, for sources that failed to attach.
    pub fn detached(receiver: UnboundedReceiver<T>) -> Self {
        Self {
            receiver,
            disconnect: None,
        }
    }

    /// Stop receiving events and release the source-side registration.
    ///
    /// Events buffered but not yet taken are discarded, so the stream ends right
    /// away. Calling it again does nothing.
    pub fn unsubscribe(&mut self) {
        self.receiver.close();
        while let Ok(Some(_)) = self.receiver.try_next() {}
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}
