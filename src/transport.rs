// ==============================================================================
// transport.rs — IN-PROCESS CONTACT TOPICS
// ------------------------------------------------------------------------------
// Topic-keyed pub/sub for ContactBatch messages. The physics loop and the
// WebSocket bridge publish, estimators subscribe.
//
// - subscribe(topic): new unbounded receiver on that topic
// - publish(topic, batch): clone to every live subscriber, prune closed ones
// - spawn_contact_listener(rx, mailbox): delivery task, every received batch
//   is posted into the mailbox (latest wins there)
//
// Topic names follow `~/<scoped collision name>/contacts`.
// ==============================================================================

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::mailbox::ContactMailbox;
use crate::slip_friction::ContactBatch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no subscribers on topic [{0}]")]
    NoSubscribers(String),
}

/// Contact topic for a scoped collision name, e.g. `tire::wheel::tread`.
pub fn contact_topic(scoped_collision: &str) -> String {
    format!("~/{scoped_collision}/contacts")
}

#[derive(Debug, Default)]
pub struct ContactTransport {
    topics: Mutex<HashMap<String, Vec<UnboundedSender<ContactBatch>>>>,
}

impl ContactTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, topic: &str) -> UnboundedReceiver<ContactBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        debug!(topic, "contact subscriber added");
        rx
    }

    /// Deliver `batch` to every subscriber of `topic`.
    /// Returns how many subscribers received it.
    pub fn publish(&self, topic: &str, batch: ContactBatch) -> Result<usize, TransportError> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(subscribers) = topics.get_mut(topic) else {
            return Err(TransportError::NoSubscribers(topic.to_string()));
        };

        subscribers.retain(|tx| tx.send(batch.clone()).is_ok());

        if subscribers.is_empty() {
            topics.remove(topic);
            return Err(TransportError::NoSubscribers(topic.to_string()));
        }
        Ok(subscribers.len())
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }
}

/// Forward every batch arriving on `rx` into `mailbox` until the topic closes.
pub fn spawn_contact_listener(
    mut rx: UnboundedReceiver<ContactBatch>,
    mailbox: ContactMailbox,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(batch) = rx.recv().await {
            if mailbox.post(batch) {
                trace!("unread contact batch replaced");
            }
        }
        debug!("contact listener stopped");
    })
}
