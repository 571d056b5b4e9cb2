//! Change notification streams.
//!
//! A [`Channel`] is an ordered, single-producer observer list. Every
//! subscriber gets its own unbounded receiver; items are delivered in emission
//! order. Dropping a receiver unsubscribes it, and closing the channel ends
//! every receiver's stream. Receivers work synchronously through
//! `try_recv` or asynchronously through `recv().await`.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::field::FieldId;

/// Kind of a [`FieldChange`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ChangeKind {
    /// The field's value changed and was written to the model.
    ValueChanges,
    /// An expression-derived property of the field changed.
    ExpressionChanges { property: String },
}

/// One notification on a form's field-change channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub value: Value,
    pub field: FieldId,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl FieldChange {
    pub fn value_changes(field: FieldId, value: Value) -> Self {
        Self {
            value,
            field,
            kind: ChangeKind::ValueChanges,
        }
    }

    pub fn is_value_change(&self) -> bool {
        self.kind == ChangeKind::ValueChanges
    }
}

/// Ordered broadcast to any number of subscribers.
#[derive(Debug)]
pub struct Channel<T> {
    subscribers: Vec<UnboundedSender<T>>,
    closed: bool,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            closed: false,
        }
    }
}

impl<T: Clone> Channel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber. After [`close`](Self::close) the returned receiver is
    /// already at the end of its stream.
    pub fn subscribe(&mut self) -> UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.closed {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Delivers `item` to every live subscriber and forgets dropped ones.
    pub fn emit(&mut self, item: &T) {
        self.subscribers.retain(|tx| tx.send(item.clone()).is_ok());
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    /// Ends every subscriber's stream and refuses new subscribers.
    pub fn close(&mut self) {
        self.closed = true;
        self.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
