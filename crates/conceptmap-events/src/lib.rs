use conceptmap_core::{GraphMetrics, NodeId};
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Graph
    NodeAdded {
        id: NodeId,
        attached_to: Option<NodeId>,
    },
    EdgeAdded {
        a: NodeId,
        b: NodeId,
    },
    CrosslinkAdded {
        a: NodeId,
        b: NodeId,
    },
    NodeDeleted {
        id: NodeId,
        /// Nodes dropped because they lost their path to the root.
        pruned: Vec<NodeId>,
    },
    CurrentChanged {
        id: Option<NodeId>,
    },
    GraphReset,
    /// Derived metrics were recomputed.
    MetricsUpdated(GraphMetrics),

    // Export
    ImageExported {
        image: PathBuf,
        log: PathBuf,
        snapshot: Option<PathBuf>,
    },
    /// The session moved on to the next image, or ran out of images.
    ImageAdvanced {
        next: Option<PathBuf>,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        publish(&self.tx, event);
    }

    /// Dispatch all pending events to a listener.
    /// Intended to be called from the host's UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Drain pending events without a listener.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

/// Send on a bus sender, ignoring a disconnected receiver.
pub fn publish(tx: &Sender<Event>, event: Event) {
    if tx.send(event).is_err() {
        tracing::trace!("event dropped, no receiver");
    }
}

/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        sender
            .send(Event::NodeAdded {
                id: NodeId(3),
                attached_to: Some(NodeId(1)),
            })
            .unwrap();

        match receiver.recv().unwrap() {
            Event::NodeAdded { id, attached_to } => {
                assert_eq!(id, NodeId(3));
                assert_eq!(attached_to, Some(NodeId(1)));
            }
            other => panic!("Expected NodeAdded, got {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_to_listener() {
        struct Counter {
            metrics_updates: usize,
            last: Option<GraphMetrics>,
        }

        impl EventListener for Counter {
            fn handle_event(&mut self, event: &Event) {
                if let Event::MetricsUpdated(metrics) = event {
                    self.metrics_updates += 1;
                    self.last = Some(*metrics);
                }
            }
        }

        let bus = EventBus::new();
        bus.publish(Event::GraphReset);
        bus.publish(Event::MetricsUpdated(GraphMetrics::default()));
        bus.publish(Event::MetricsUpdated(GraphMetrics {
            num_nodes: 1,
            ..Default::default()
        }));

        let mut counter = Counter {
            metrics_updates: 0,
            last: None,
        };
        bus.dispatch_to(&mut counter);

        assert_eq!(counter.metrics_updates, 2);
        assert_eq!(counter.last.map(|m| m.num_nodes), Some(1));
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_publish_without_receiver_is_silent() {
        let (tx, rx) = unbounded();
        drop(rx);
        publish(&tx, Event::GraphReset);
    }
}
