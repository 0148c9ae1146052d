//! Cross-window messaging over the shared store
//!
//! A [`Messenger`] owns one topic key. Events written under the key by any
//! context are fanned out to in-process subscribers. The last stored event is
//! replayed to every new subscriber, and each subscriber sees a given payload
//! at most once and at most one terminal event.

use std::collections::VecDeque;
use std::sync::Arc;

use handoff_domain::constants::SENT_MESSAGE_HISTORY;
use handoff_domain::{AuthError, PubSubEvent, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ports::{KeyValueStore, StorageChange};

/// Identifies one in-process subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a messenger subscription
///
/// The stream ends once the messenger is closed.
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<PubSubEvent>,
}

impl Subscription {
    /// Handle for [`Messenger::unsubscribe`].
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event of any kind, `None` once closed.
    pub async fn next(&mut self) -> Option<PubSubEvent> {
        self.rx.recv().await
    }

    /// Wait for the first `COMPLETE` or `FAILURE`, skipping progress events.
    pub async fn next_terminal(&mut self) -> Option<PubSubEvent> {
        while let Some(event) = self.rx.recv().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    /// Terminal event already delivered to this subscription, if any.
    pub fn try_next_terminal(&mut self) -> Option<PubSubEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }
}

struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<PubSubEvent>,
    last_seen: Option<String>,
    resolved: bool,
}

impl Subscriber {
    fn deliver(&mut self, raw: &str, event: &PubSubEvent) {
        if self.resolved || self.last_seen.as_deref() == Some(raw) {
            return;
        }
        self.last_seen = Some(raw.to_string());
        self.resolved = event.is_terminal();
        // A dropped receiver is pruned after dispatch.
        let _ = self.tx.send(event.clone());
    }
}

#[derive(Default)]
struct TopicState {
    closed: bool,
    terminal: bool,
    sent: VecDeque<String>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

struct Topic {
    key: String,
    store: Arc<dyn KeyValueStore>,
    state: Mutex<TopicState>,
}

impl Topic {
    /// Deliver `raw` to every subscriber, or only to `target`.
    fn dispatch(&self, raw: &str, target: Option<SubscriptionId>) {
        let Some(event) = PubSubEvent::decode(raw) else {
            debug!(topic = %self.key, "Ignoring value that is not an event");
            return;
        };

        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if event.is_terminal() {
            state.terminal = true;
        }

        for subscriber in &mut state.subscribers {
            if target.map_or(true, |id| id == subscriber.id) {
                subscriber.deliver(raw, &event);
            }
        }
        state.subscribers.retain(|s| !s.tx.is_closed());
        debug!(topic = %self.key, event = event.name(), "Dispatched event");
    }

    fn replay(&self, target: Option<SubscriptionId>) {
        match self.store.get(&self.key) {
            Ok(Some(raw)) => self.dispatch(&raw, target),
            Ok(None) => {}
            Err(err) => warn!(topic = %self.key, error = %err, "Failed to read topic for replay"),
        }
    }

    fn on_change(&self, change: StorageChange) {
        if change.key != self.key {
            return;
        }
        let Some(raw) = change.new_value else {
            debug!(topic = %self.key, "Topic removed by another context");
            return;
        };
        if self.state.lock().sent.contains(&raw) {
            debug!(topic = %self.key, "Ignoring echo of a message we sent");
            return;
        }
        self.dispatch(&raw, None);
    }
}

/// Publish/subscribe handle for one topic key
///
/// Listening starts on [`Messenger::open`] and stops on [`Messenger::close`]
/// or drop. Only `close` removes the topic from the store.
pub struct Messenger {
    topic: Arc<Topic>,
    listener: JoinHandle<()>,
    flush_tx: mpsc::UnboundedSender<oneshot::Sender<()>>,
}

impl Messenger {
    /// Start listening on `key`. Must be called from within a Tokio runtime.
    pub fn open(key: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        let changes = store.subscribe();
        let topic = Arc::new(Topic { key: key.into(), store, state: Mutex::default() });
        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(listen(Arc::clone(&topic), changes, flush_rx));

        debug!(topic = %topic.key, "Messenger opened");
        topic.replay(None);

        Self { topic, listener, flush_tx }
    }

    /// Topic key.
    pub fn key(&self) -> &str {
        &self.topic.key
    }

    /// Attach a subscriber. The currently stored event, if any, is replayed
    /// to it immediately.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.topic.state.lock();
            let id = SubscriptionId(state.next_id);
            state.next_id += 1;
            if !state.closed {
                state.subscribers.push(Subscriber { id, tx, last_seen: None, resolved: false });
            }
            id
        };

        self.topic.replay(Some(id));
        Subscription { id, rx }
    }

    /// Detach a subscriber. Returns whether it was attached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.topic.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != id);
        before != state.subscribers.len()
    }

    /// Replay the stored event to every subscriber.
    pub fn replay(&self) {
        self.topic.replay(None);
    }

    /// Write `event` under the topic and dispatch it locally.
    ///
    /// After close, or once a terminal event has been seen, publishing is
    /// logged and ignored.
    pub fn publish(&self, event: &PubSubEvent) -> Result<()> {
        let raw = event
            .encode()
            .map_err(|e| AuthError::Internal(format!("failed to encode event: {e}")))?;

        {
            let mut state = self.topic.state.lock();
            if state.closed {
                warn!(topic = %self.topic.key, event = event.name(), "Publish after close ignored");
                return Ok(());
            }
            if state.terminal {
                warn!(
                    topic = %self.topic.key,
                    event = event.name(),
                    "Topic already has a terminal event, publish ignored"
                );
                return Ok(());
            }
            state.sent.push_back(raw.clone());
            if state.sent.len() > SENT_MESSAGE_HISTORY {
                state.sent.pop_front();
            }
        }

        self.topic.store.set(&self.topic.key, &raw)?;
        debug!(topic = %self.topic.key, event = event.name(), "Published event");
        self.topic.dispatch(&raw, None);
        Ok(())
    }

    /// Process every storage notification already queued for this context.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.flush_tx.send(ack_tx).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// `true` after [`Messenger::close`].
    pub fn is_closed(&self) -> bool {
        self.topic.state.lock().closed
    }

    /// Remove the topic from the store, stop listening and end every
    /// subscription. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.topic.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.subscribers.clear();
        }

        self.listener.abort();
        if let Err(err) = self.topic.store.remove(&self.topic.key) {
            warn!(topic = %self.topic.key, error = %err, "Failed to remove topic");
        }
        debug!(topic = %self.topic.key, "Messenger closed");
    }
}

impl Drop for Messenger {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(
    topic: Arc<Topic>,
    mut changes: broadcast::Receiver<StorageChange>,
    mut flushes: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
) {
    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(change) => topic.on_change(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %topic.key, skipped, "Missed storage notifications, replaying");
                    topic.replay(None);
                }
                Err(RecvError::Closed) => break,
            },
            Some(ack) = flushes.recv() => {
                loop {
                    match changes.try_recv() {
                        Ok(change) => topic.on_change(change),
                        Err(TryRecvError::Lagged(_)) => topic.replay(None),
                        Err(_) => break,
                    }
                }
                let _ = ack.send(());
            }
        }
    }
}
