//! Subscriptions that turn the push-style listener registry into futures and
//! streams.
//!
//! # Design
//! - A matcher closure maps each event to `Some(value)` when it is relevant.
//! - One-shot subscriptions resolve at most once: the sender is taken on the
//!   first match and the listener unregisters itself.
//! - Dropping the returned handle unregisters the listener; nothing else about
//!   the underlying session work is cancelled.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tokio_stream::Stream;

use crate::error::SubscriptionClosed;
use crate::payloads::EngineEvent;
use crate::registry::{EngineListener, ListenerId, ListenerRegistry, RegistryInner};

struct Unregister {
    registry: Weak<RegistryInner>,
    id: ListenerId,
}

impl Drop for Unregister {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

struct OnceListener<T, F> {
    matcher: F,
    sender: Mutex<Option<oneshot::Sender<T>>>,
    registry: Weak<RegistryInner>,
    id: ListenerId,
}

impl<T, F> EngineListener for OnceListener<T, F>
where
    T: Send + 'static,
    F: Fn(&EngineEvent) -> Option<T> + Send + Sync + 'static,
{
    fn on_event(&self, event: &EngineEvent) -> anyhow::Result<()> {
        let Some(value) = (self.matcher)(event) else {
            return Ok(());
        };
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(value);
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        Ok(())
    }
}

struct StreamListener<T, F> {
    matcher: F,
    sender: mpsc::UnboundedSender<T>,
}

impl<T, F> EngineListener for StreamListener<T, F>
where
    T: Send + 'static,
    F: Fn(&EngineEvent) -> Option<T> + Send + Sync + 'static,
{
    fn on_event(&self, event: &EngineEvent) -> anyhow::Result<()> {
        if let Some(value) = (self.matcher)(event) {
            let _ = self.sender.send(value);
        }
        Ok(())
    }
}

/// Future resolving with the first value produced by a matcher.
///
/// Resolves with [`SubscriptionClosed`] if the registry goes away first.
#[must_use = "dropping the handle cancels the subscription"]
pub struct Correlated<T> {
    receiver: oneshot::Receiver<T>,
    guard: Unregister,
}

impl<T> Correlated<T> {
    /// Identifier of the transient listener backing this future.
    #[must_use]
    pub const fn listener_id(&self) -> ListenerId {
        self.guard.id
    }
}

impl<T> Future for Correlated<T> {
    type Output = Result<T, SubscriptionClosed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| SubscriptionClosed))
    }
}

/// Stream of every value produced by a matcher until dropped.
#[must_use = "dropping the handle cancels the subscription"]
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    guard: Unregister,
}

impl<T> Subscription<T> {
    /// Identifier of the listener backing this stream.
    #[must_use]
    pub const fn listener_id(&self) -> ListenerId {
        self.guard.id
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl ListenerRegistry {
    /// Wait for the first event accepted by `matcher`.
    pub fn once<T, F>(&self, matcher: F) -> Correlated<T>
    where
        T: Send + 'static,
        F: Fn(&EngineEvent) -> Option<T> + Send + Sync + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let id = self.inner.reserve_id();
        let listener = OnceListener {
            matcher,
            sender: Mutex::new(Some(sender)),
            registry: Arc::downgrade(&self.inner),
            id,
        };
        self.inner.insert(id, Arc::new(listener));
        Correlated {
            receiver,
            guard: self.unregister_guard(id),
        }
    }

    /// Stream every event accepted by `matcher`.
    pub fn stream<T, F>(&self, matcher: F) -> Subscription<T>
    where
        T: Send + 'static,
        F: Fn(&EngineEvent) -> Option<T> + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.reserve_id();
        self.inner
            .insert(id, Arc::new(StreamListener { matcher, sender }));
        Subscription {
            receiver,
            guard: self.unregister_guard(id),
        }
    }

    fn unregister_guard(&self, id: ListenerId) -> Unregister {
        Unregister {
            registry: Arc::downgrade(&self.inner),
            id,
        }
    }
}
