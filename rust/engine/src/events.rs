// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outward notifications for the widget layer.
//!
//! Subscribers get an unbounded receiver. Dropping the receiver
//! unsubscribes; closed subscribers are pruned on the next emit.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use bimtodo_core::{PersistedModelId, SelectionSet};

/// Something the widget layer should redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The annotation list of a model changed.
    AnnotationsChanged(PersistedModelId),
    /// Markers were recomputed or cleared.
    MarkersChanged,
    /// The active selection changed; `None` when it was cleared.
    SelectionChanged(Option<SelectionSet>),
    /// A mutation was stored but re-fetching the list failed, so the list
    /// and markers still show the previous state.
    RefreshFailed {
        model: PersistedModelId,
        retryable: bool,
    },
}

/// Fan-out of [`LifecycleEvent`]s.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<UnboundedSender<LifecycleEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: LifecycleEvent) {
        tracing::trace!(?event, "Emitting lifecycle event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_receivers_unsubscribe() {
        let mut bus = EventBus::new();
        let mut kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.emit(LifecycleEvent::MarkersChanged);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap(), LifecycleEvent::MarkersChanged);
        assert!(kept.try_recv().is_err());
    }
}
