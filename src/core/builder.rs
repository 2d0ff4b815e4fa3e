use std::sync::Arc;

use crate::{
    core::{
        config::SupervisorConfig,
        fleet::Fleet,
        reporter::{NullSink, StatusSink},
        tracker::StateTracker,
    },
    events::Bus,
    link::Transport,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Fleet`].
pub struct FleetBuilder {
    cfg: SupervisorConfig,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn StatusSink>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl FleetBuilder {
    pub fn new(cfg: SupervisorConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            cfg,
            transport,
            sink: Arc::new(NullSink),
            subscribers: Vec::new(),
        }
    }

    /// Sets where connectivity changes and failure reports go (default: discarded).
    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets runtime event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the fleet and starts its subscriber workers.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Arc<Fleet> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let tracker = Arc::new(StateTracker::new());

        let mut subscribers = self.subscribers;
        subscribers.push(Arc::clone(&tracker) as Arc<dyn Subscribe>);
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));

        let fleet = Arc::new(Fleet::new_internal(
            self.cfg,
            bus,
            subs,
            tracker,
            self.transport,
            self.sink,
        ));
        fleet.subscriber_listener();
        fleet
    }
}
